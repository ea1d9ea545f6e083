//! Three-scope sliding-minute rate gate.
//!
//! Scopes are evaluated global -> IP -> user. The global scope is purely
//! in-process (exceeding it yields 503, never a sticky block). IP and user
//! scopes keep a fast in-memory window and mirror block records to the
//! durable store both ways, so blocks survive a restart. Store errors fail
//! open: the in-memory window still enforces the short-term cap.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use axum::http::{HeaderMap, HeaderValue};
use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use dashmap::DashMap;
use diesel::prelude::*;
use serde::Serialize;

use crate::api::ApiError;
use crate::db::DbPool;
use crate::models::NewRateLimitStat;

/// Stat types for the durable minute-scope rows.
pub const STAT_IP_MINUTE: &str = "ip_minute";
pub const STAT_USER_MINUTE: &str = "user_minute";

#[derive(Debug, Clone, Copy)]
pub struct ScopeConfig {
    pub max_requests: u32,
    pub window: Duration,
    /// `None` for the global scope: denial is 503, not a block.
    pub block_duration: Option<Duration>,
}

#[derive(Debug, Clone, Copy)]
pub struct RateProfile {
    pub user: ScopeConfig,
    pub ip: ScopeConfig,
    pub global: ScopeConfig,
}

impl RateProfile {
    /// Profile for the analysis endpoint.
    pub fn standard() -> Self {
        Self {
            user: ScopeConfig {
                max_requests: 10,
                window: Duration::from_secs(60),
                block_duration: Some(Duration::from_secs(5 * 60)),
            },
            ip: ScopeConfig {
                max_requests: 20,
                window: Duration::from_secs(60),
                block_duration: Some(Duration::from_secs(10 * 60)),
            },
            global: ScopeConfig {
                max_requests: 100,
                window: Duration::from_secs(60),
                block_duration: None,
            },
        }
    }

    /// Stricter profile for the generation endpoint.
    pub fn strict() -> Self {
        Self {
            user: ScopeConfig {
                max_requests: 5,
                window: Duration::from_secs(60),
                block_duration: Some(Duration::from_secs(15 * 60)),
            },
            ip: ScopeConfig {
                max_requests: 10,
                window: Duration::from_secs(60),
                block_duration: Some(Duration::from_secs(15 * 60)),
            },
            global: ScopeConfig {
                max_requests: 50,
                window: Duration::from_secs(60),
                block_duration: None,
            },
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct WindowEntry {
    window_start: Instant,
    count: u32,
    blocked_until: Option<DateTime<Utc>>,
}

impl WindowEntry {
    fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            count: 0,
            blocked_until: None,
        }
    }
}

/// Outcome of the in-memory window step for one scope.
#[derive(Debug, PartialEq)]
enum ScopeOutcome {
    Allowed { remaining: u32, reset_secs: i64 },
    /// The window cap was exceeded on this request.
    Exceeded { retry_after_secs: i64 },
    /// A previously set block is still active.
    Blocked { retry_after_secs: i64 },
}

/// Roll the window, count the request, set the block. Pure with respect to
/// the store; both `check` and the tests drive it directly.
fn check_entry(
    entry: &mut WindowEntry,
    config: &ScopeConfig,
    now: Instant,
    wall_now: DateTime<Utc>,
) -> ScopeOutcome {
    if let Some(blocked_until) = entry.blocked_until {
        if blocked_until > wall_now {
            return ScopeOutcome::Blocked {
                retry_after_secs: (blocked_until - wall_now).num_seconds().max(1),
            };
        }
        entry.blocked_until = None;
    }

    let elapsed = now.duration_since(entry.window_start);
    if elapsed >= config.window {
        entry.window_start = now;
        entry.count = 1;
    } else {
        entry.count += 1;
    }

    if entry.count > config.max_requests {
        return match config.block_duration {
            Some(block) => {
                entry.blocked_until = Some(wall_now + block);
                ScopeOutcome::Exceeded {
                    retry_after_secs: block.as_secs() as i64,
                }
            }
            None => ScopeOutcome::Exceeded {
                retry_after_secs: (config.window - elapsed).as_secs() as i64 + 1,
            },
        };
    }

    ScopeOutcome::Allowed {
        remaining: config.max_requests - entry.count,
        reset_secs: (config.window.saturating_sub(elapsed)).as_secs() as i64,
    }
}

/// User-scope headers emitted on allowed requests.
#[derive(Debug, Clone, Copy)]
pub struct RateHeaders {
    pub limit: u32,
    pub remaining: u32,
    pub reset_secs: i64,
}

impl RateHeaders {
    pub fn apply(&self, headers: &mut HeaderMap) {
        let pairs = [
            ("X-RateLimit-Limit", self.limit.to_string()),
            ("X-RateLimit-Remaining", self.remaining.to_string()),
            ("X-RateLimit-Reset", self.reset_secs.to_string()),
        ];
        for (name, value) in pairs {
            if let Ok(value) = HeaderValue::from_str(&value) {
                headers.insert(name, value);
            }
        }
    }
}

/// Snapshot for the admin endpoint.
#[derive(Debug, Serialize)]
pub struct RateSnapshot {
    pub user_entries: usize,
    pub ip_entries: usize,
    pub global_window_count: u32,
}

pub struct RateGate {
    profile: RateProfile,
    user_entries: DashMap<String, WindowEntry>,
    ip_entries: DashMap<String, WindowEntry>,
    global: Mutex<WindowEntry>,
}

impl RateGate {
    pub fn new(profile: RateProfile) -> Self {
        Self {
            profile,
            user_entries: DashMap::new(),
            ip_entries: DashMap::new(),
            global: Mutex::new(WindowEntry::new(Instant::now())),
        }
    }

    /// Evaluate all three scopes for one request. Returns the user-scope
    /// headers on success.
    pub fn check(&self, pool: &DbPool, user_id: &str, ip: &str) -> Result<RateHeaders, ApiError> {
        let now = Instant::now();
        let wall_now = Utc::now();

        // Global scope first: in-process only, overload semantics.
        {
            let mut global = self.global.lock().expect("rate gate global lock poisoned");
            match check_entry(&mut global, &self.profile.global, now, wall_now) {
                ScopeOutcome::Allowed { .. } => {}
                ScopeOutcome::Exceeded { retry_after_secs }
                | ScopeOutcome::Blocked { retry_after_secs } => {
                    return Err(ApiError::Overloaded { retry_after_secs });
                }
            }
        }

        // IP scope.
        self.check_durable_scope(
            pool,
            &self.ip_entries,
            &self.profile.ip,
            STAT_IP_MINUTE,
            ip,
            now,
            wall_now,
            "IP_RATE_LIMITED",
            "IP_BLOCKED",
        )?;

        // User scope; its outcome carries the response headers.
        let outcome = self.check_durable_scope(
            pool,
            &self.user_entries,
            &self.profile.user,
            STAT_USER_MINUTE,
            user_id,
            now,
            wall_now,
            "RATE_LIMITED",
            "USER_BLOCKED",
        )?;

        Ok(RateHeaders {
            limit: self.profile.user.max_requests,
            remaining: outcome.0,
            reset_secs: outcome.1,
        })
    }

    /// One durable-backed scope: memory block check, durable block lookup,
    /// window roll, durable block upsert on a fresh denial.
    #[allow(clippy::too_many_arguments)]
    fn check_durable_scope(
        &self,
        pool: &DbPool,
        entries: &DashMap<String, WindowEntry>,
        config: &ScopeConfig,
        stat_type: &'static str,
        identifier: &str,
        now: Instant,
        wall_now: DateTime<Utc>,
        exceeded_code: &'static str,
        blocked_code: &'static str,
    ) -> Result<(u32, i64), ApiError> {
        // 1. Fast path: in-memory block.
        let memory_block = entries
            .get(identifier)
            .and_then(|e| e.blocked_until)
            .filter(|blocked_until| *blocked_until > wall_now);
        if let Some(blocked_until) = memory_block {
            return Err(denial(
                blocked_code,
                stat_type,
                (blocked_until - wall_now).num_seconds().max(1),
            ));
        }

        // 2. Durable block lookup; mirror hits into memory. Fail-open.
        if let Some(blocked_until) = lookup_block(pool, stat_type, identifier, wall_now) {
            entries
                .entry(identifier.to_string())
                .or_insert_with(|| WindowEntry::new(now))
                .blocked_until = Some(blocked_until);
            return Err(denial(
                blocked_code,
                stat_type,
                (blocked_until - wall_now).num_seconds().max(1),
            ));
        }

        // 3-5. Window roll and count.
        let (outcome, count, blocked_until) = {
            let mut entry = entries
                .entry(identifier.to_string())
                .or_insert_with(|| WindowEntry::new(now));
            let outcome = check_entry(&mut entry, config, now, wall_now);
            (outcome, entry.count, entry.blocked_until)
        };

        match outcome {
            ScopeOutcome::Allowed {
                remaining,
                reset_secs,
            } => Ok((remaining, reset_secs)),
            ScopeOutcome::Exceeded { retry_after_secs } => {
                upsert_block(pool, stat_type, identifier, wall_now, count, blocked_until);
                Err(denial(exceeded_code, stat_type, retry_after_secs))
            }
            ScopeOutcome::Blocked { retry_after_secs } => {
                Err(denial(blocked_code, stat_type, retry_after_secs))
            }
        }
    }

    /// Drop windows that expired and blocks that elapsed. Run periodically.
    pub fn evict_expired(&self) {
        let now = Instant::now();
        let wall_now = Utc::now();
        let retain = |entry: &WindowEntry| {
            let window_live = now.duration_since(entry.window_start) < self.profile.user.window;
            let block_live = entry.blocked_until.is_some_and(|b| b > wall_now);
            window_live || block_live
        };
        self.user_entries.retain(|_, e| retain(e));
        self.ip_entries.retain(|_, e| retain(e));
    }

    pub fn snapshot(&self) -> RateSnapshot {
        RateSnapshot {
            user_entries: self.user_entries.len(),
            ip_entries: self.ip_entries.len(),
            global_window_count: self
                .global
                .lock()
                .expect("rate gate global lock poisoned")
                .count,
        }
    }
}

fn denial(code: &'static str, stat_type: &str, retry_after_secs: i64) -> ApiError {
    ApiError::RateLimited {
        code,
        message: format!(
            "Too many requests for the {} scope, retry in {}s",
            stat_type, retry_after_secs
        ),
        retry_after_secs,
    }
}

/// Active block row for this scope/identifier, if any. Store errors log and
/// return `None`: the in-memory window still bounds the damage.
fn lookup_block(
    pool: &DbPool,
    stat_type_value: &str,
    identifier_value: &str,
    wall_now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    use crate::schema::rate_limit_stats::dsl::*;

    let mut conn = match pool.get() {
        Ok(conn) => conn,
        Err(e) => {
            tracing::warn!(error = %e, "rate gate block lookup skipped: no connection");
            return None;
        }
    };

    let result = rate_limit_stats
        .filter(stat_type.eq(stat_type_value))
        .filter(identifier.eq(identifier_value))
        .filter(blocked_until.gt(wall_now))
        .order(blocked_until.desc())
        .select(blocked_until)
        .first::<Option<DateTime<Utc>>>(&mut conn)
        .optional();

    match result {
        Ok(row) => row.flatten(),
        Err(e) => {
            tracing::warn!(error = %e, "rate gate block lookup failed");
            None
        }
    }
}

/// Record the window count and block in the durable store. Best-effort.
fn upsert_block(
    pool: &DbPool,
    stat_type_value: &str,
    identifier_value: &str,
    wall_now: DateTime<Utc>,
    window_count: u32,
    blocked_until_value: Option<DateTime<Utc>>,
) {
    use crate::schema::rate_limit_stats::dsl::*;

    let mut conn = match pool.get() {
        Ok(conn) => conn,
        Err(e) => {
            tracing::warn!(error = %e, "rate gate block upsert skipped: no connection");
            return;
        }
    };

    let period = wall_now
        .duration_trunc(TimeDelta::minutes(1))
        .unwrap_or(wall_now);
    let row = NewRateLimitStat {
        stat_type: stat_type_value,
        identifier: identifier_value,
        period_start: period,
        count: window_count as i64,
        blocked_until: blocked_until_value,
    };

    let result = diesel::insert_into(rate_limit_stats)
        .values(&row)
        .on_conflict((stat_type, identifier, period_start))
        .do_update()
        .set((
            count.eq(window_count as i64),
            blocked_until.eq(blocked_until_value),
        ))
        .execute(&mut conn);

    if let Err(e) = result {
        tracing::warn!(error = %e, "rate gate block upsert failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope(max: u32, block_secs: Option<u64>) -> ScopeConfig {
        ScopeConfig {
            max_requests: max,
            window: Duration::from_secs(60),
            block_duration: block_secs.map(Duration::from_secs),
        }
    }

    #[test]
    fn test_allows_up_to_max_then_blocks() {
        let config = scope(3, Some(300));
        let start = Instant::now();
        let wall = Utc::now();
        let mut entry = WindowEntry::new(start);

        for expected_remaining in [2u32, 1, 0] {
            match check_entry(&mut entry, &config, start, wall) {
                ScopeOutcome::Allowed { remaining, .. } => {
                    assert_eq!(remaining, expected_remaining)
                }
                other => panic!("expected Allowed, got {other:?}"),
            }
        }

        // Request max+1 is denied and sets the block.
        match check_entry(&mut entry, &config, start, wall) {
            ScopeOutcome::Exceeded { retry_after_secs } => assert_eq!(retry_after_secs, 300),
            other => panic!("expected Exceeded, got {other:?}"),
        }
        assert!(entry.blocked_until.is_some());

        // Further requests hit the standing block.
        match check_entry(&mut entry, &config, start, wall) {
            ScopeOutcome::Blocked { retry_after_secs } => {
                assert!(retry_after_secs > 0 && retry_after_secs <= 300)
            }
            other => panic!("expected Blocked, got {other:?}"),
        }
    }

    #[test]
    fn test_window_expiry_resets_count() {
        let config = scope(2, Some(300));
        let start = Instant::now();
        let wall = Utc::now();
        let mut entry = WindowEntry::new(start);

        check_entry(&mut entry, &config, start, wall);
        check_entry(&mut entry, &config, start, wall);
        assert_eq!(entry.count, 2);

        // One window later the counter starts over at 1.
        let later = start + Duration::from_secs(61);
        match check_entry(&mut entry, &config, later, wall) {
            ScopeOutcome::Allowed { remaining, .. } => assert_eq!(remaining, 1),
            other => panic!("expected Allowed, got {other:?}"),
        }
        assert_eq!(entry.count, 1);
    }

    #[test]
    fn test_elapsed_block_admits_again() {
        let config = scope(1, Some(300));
        let start = Instant::now();
        let wall = Utc::now();
        let mut entry = WindowEntry::new(start);
        entry.blocked_until = Some(wall - chrono::Duration::seconds(1));

        // Block in the past: cleared, request counted normally.
        match check_entry(&mut entry, &config, start, wall) {
            ScopeOutcome::Allowed { .. } => {}
            other => panic!("expected Allowed, got {other:?}"),
        }
        assert!(entry.blocked_until.is_none());
    }

    #[test]
    fn test_global_scope_denies_without_block() {
        let config = scope(1, None);
        let start = Instant::now();
        let wall = Utc::now();
        let mut entry = WindowEntry::new(start);

        check_entry(&mut entry, &config, start, wall);
        match check_entry(&mut entry, &config, start, wall) {
            ScopeOutcome::Exceeded { retry_after_secs } => {
                assert!(retry_after_secs >= 1 && retry_after_secs <= 61)
            }
            other => panic!("expected Exceeded, got {other:?}"),
        }
        // No sticky block for the global scope.
        assert!(entry.blocked_until.is_none());
    }

    #[test]
    fn test_profiles_match_endpoint_contracts() {
        let standard = RateProfile::standard();
        assert_eq!(standard.user.max_requests, 10);
        assert_eq!(standard.ip.max_requests, 20);
        assert_eq!(standard.global.max_requests, 100);
        assert_eq!(
            standard.ip.block_duration,
            Some(Duration::from_secs(600))
        );
        assert!(standard.global.block_duration.is_none());

        let strict = RateProfile::strict();
        assert_eq!(strict.user.max_requests, 5);
        assert_eq!(
            strict.user.block_duration,
            Some(Duration::from_secs(900))
        );
    }

    #[test]
    fn test_evict_expired_drops_stale_entries() {
        let gate = RateGate::new(RateProfile::standard());
        let stale = WindowEntry {
            window_start: Instant::now() - Duration::from_secs(120),
            count: 5,
            blocked_until: None,
        };
        gate.user_entries.insert("stale-user".to_string(), stale);
        let blocked = WindowEntry {
            window_start: Instant::now() - Duration::from_secs(120),
            count: 20,
            blocked_until: Some(Utc::now() + chrono::Duration::seconds(300)),
        };
        gate.ip_entries.insert("blocked-ip".to_string(), blocked);

        gate.evict_expired();

        // Stale window evicted, live block retained.
        assert_eq!(gate.snapshot().user_entries, 0);
        assert_eq!(gate.snapshot().ip_entries, 1);
    }
}
