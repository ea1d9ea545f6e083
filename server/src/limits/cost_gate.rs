//! Durable daily/hourly cost gate.
//!
//! Three counters per admitted request: `daily_global`, `hourly_global` and
//! `daily_user=<user_id>`. Periods are wall-clock: days start at local
//! midnight, hours at the top of the hour. Counters live in the durable
//! store behind a short-TTL read cache and are incremented atomically in
//! one transaction. The gate fails open on store errors: availability wins
//! over counting, and the rate gate plus quota ledger still bound damage.

use std::time::{Duration, Instant};

use chrono::{DateTime, Local, LocalResult, NaiveDateTime, Timelike, Utc};
use dashmap::DashMap;
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::api::ApiError;
use crate::db::DbPool;
use crate::models::NewRateLimitStat;

pub const STAT_DAILY_GLOBAL: &str = "daily_global";
pub const STAT_HOURLY_GLOBAL: &str = "hourly_global";
pub const STAT_DAILY_USER: &str = "daily_user";

/// How long cached counter reads stay fresh.
const CACHE_TTL: Duration = Duration::from_secs(5);

/// Fraction of the daily global limit that triggers a warning log.
const ALERT_THRESHOLD: f64 = 0.8;

#[derive(Debug, Clone, Copy)]
pub struct CostLimits {
    pub daily_global: i64,
    pub hourly_global: i64,
    pub daily_user: i64,
}

#[derive(Clone, Copy)]
struct CachedCount {
    count: i64,
    fetched_at: Instant,
}

/// Today's counters, for the admin endpoint.
#[derive(Debug, Serialize)]
pub struct CostSnapshot {
    pub daily_global: i64,
    pub daily_global_limit: i64,
    pub hourly_global: i64,
    pub hourly_global_limit: i64,
}

pub struct CostGate {
    limits: CostLimits,
    cache: DashMap<String, CachedCount>,
}

/// One counter to evaluate: stat type, identifier, period, limit, denial code.
struct CounterSpec {
    stat_type: &'static str,
    identifier: String,
    period_start: DateTime<Utc>,
    limit: i64,
    code: &'static str,
}

impl CostGate {
    pub fn new(limits: CostLimits) -> Self {
        Self {
            limits,
            cache: DashMap::new(),
        }
    }

    /// Admit one request: read the three counters, deny on the most
    /// specific exceeded limit (hourly, then daily global, then daily
    /// user), otherwise increment all three atomically.
    ///
    /// Store errors are logged and the request proceeds.
    pub fn admit(&self, pool: &DbPool, user_id: Uuid) -> Result<(), ApiError> {
        let now = Local::now();
        let specs = [
            CounterSpec {
                stat_type: STAT_HOURLY_GLOBAL,
                identifier: String::new(),
                period_start: hour_start(now),
                limit: self.limits.hourly_global,
                code: "HOURLY_LIMIT_REACHED",
            },
            CounterSpec {
                stat_type: STAT_DAILY_GLOBAL,
                identifier: String::new(),
                period_start: day_start(now),
                limit: self.limits.daily_global,
                code: "DAILY_LIMIT_REACHED",
            },
            CounterSpec {
                stat_type: STAT_DAILY_USER,
                identifier: user_id.to_string(),
                period_start: day_start(now),
                limit: self.limits.daily_user,
                code: "USER_DAILY_LIMIT_REACHED",
            },
        ];

        for spec in &specs {
            let count = match self.read_count(pool, spec) {
                Ok(count) => count,
                Err(e) => {
                    tracing::warn!(
                        scope = spec.stat_type,
                        error = %e,
                        "cost gate read failed, failing open"
                    );
                    return Ok(());
                }
            };
            if count >= spec.limit {
                return Err(ApiError::CostLimited {
                    code: spec.code,
                    message: format!("Cost limit reached for the {} scope", spec.stat_type),
                    scope: spec.stat_type,
                    remaining: (spec.limit - count).max(0),
                });
            }
        }

        if let Err(e) = self.increment_all(pool, &specs) {
            tracing::warn!(error = %e, "cost gate increment failed, failing open");
        }
        Ok(())
    }

    fn cache_key(spec: &CounterSpec) -> String {
        format!("{}:{}", spec.stat_type, spec.identifier)
    }

    fn read_count(&self, pool: &DbPool, spec: &CounterSpec) -> QueryResult<i64> {
        use crate::schema::rate_limit_stats::dsl::*;

        let key = Self::cache_key(spec);
        if let Some(cached) = self.cache.get(&key) {
            if cached.fetched_at.elapsed() < CACHE_TTL {
                return Ok(cached.count);
            }
        }

        let mut conn = pool
            .get()
            .map_err(|_| diesel::result::Error::BrokenTransactionManager)?;

        let existing = rate_limit_stats
            .filter(stat_type.eq(spec.stat_type))
            .filter(identifier.eq(&spec.identifier))
            .filter(period_start.eq(spec.period_start))
            .select(count)
            .first::<i64>(&mut conn)
            .optional()?;

        let value = match existing {
            Some(value) => value,
            None => {
                // Create the row at zero so the period exists from first sight.
                let row = NewRateLimitStat {
                    stat_type: spec.stat_type,
                    identifier: &spec.identifier,
                    period_start: spec.period_start,
                    count: 0,
                    blocked_until: None,
                };
                diesel::insert_into(rate_limit_stats)
                    .values(&row)
                    .on_conflict((stat_type, identifier, period_start))
                    .do_nothing()
                    .execute(&mut conn)?;
                0
            }
        };

        self.cache.insert(
            key,
            CachedCount {
                count: value,
                fetched_at: Instant::now(),
            },
        );
        Ok(value)
    }

    /// Upsert-with-increment for all three rows in one transaction.
    fn increment_all(&self, pool: &DbPool, specs: &[CounterSpec; 3]) -> QueryResult<()> {
        use crate::schema::rate_limit_stats::dsl::*;

        let mut conn = pool
            .get()
            .map_err(|_| diesel::result::Error::BrokenTransactionManager)?;

        let daily_global_count = conn.transaction::<i64, diesel::result::Error, _>(|conn| {
            let mut daily_global_count = 0;
            for spec in specs {
                let row = NewRateLimitStat {
                    stat_type: spec.stat_type,
                    identifier: &spec.identifier,
                    period_start: spec.period_start,
                    count: 1,
                    blocked_until: None,
                };
                let new_count: i64 = diesel::insert_into(rate_limit_stats)
                    .values(&row)
                    .on_conflict((stat_type, identifier, period_start))
                    .do_update()
                    .set(count.eq(count + 1))
                    .returning(count)
                    .get_result(conn)?;
                if spec.stat_type == STAT_DAILY_GLOBAL {
                    daily_global_count = new_count;
                }
            }
            Ok(daily_global_count)
        })?;

        for spec in specs {
            self.cache.remove(&Self::cache_key(spec));
        }

        let alert_at = (self.limits.daily_global as f64 * ALERT_THRESHOLD) as i64;
        if daily_global_count >= alert_at {
            tracing::warn!(
                count = daily_global_count,
                limit = self.limits.daily_global,
                "daily global cost counter approaching limit"
            );
        }
        Ok(())
    }

    pub fn snapshot(&self, pool: &DbPool) -> CostSnapshot {
        let now = Local::now();
        let read = |stat: &'static str, period: DateTime<Utc>| -> i64 {
            use crate::schema::rate_limit_stats::dsl::*;
            let Ok(mut conn) = pool.get() else { return 0 };
            rate_limit_stats
                .filter(stat_type.eq(stat))
                .filter(identifier.eq(""))
                .filter(period_start.eq(period))
                .select(count)
                .first::<i64>(&mut conn)
                .optional()
                .ok()
                .flatten()
                .unwrap_or(0)
        };

        CostSnapshot {
            daily_global: read(STAT_DAILY_GLOBAL, day_start(now)),
            daily_global_limit: self.limits.daily_global,
            hourly_global: read(STAT_HOURLY_GLOBAL, hour_start(now)),
            hourly_global_limit: self.limits.hourly_global,
        }
    }
}

/// Local midnight of the current day, in UTC.
pub fn day_start(now: DateTime<Local>) -> DateTime<Utc> {
    let midnight = now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .unwrap_or_else(|| now.naive_local());
    resolve_local(midnight, now)
}

/// Top of the current local hour, in UTC.
pub fn hour_start(now: DateTime<Local>) -> DateTime<Utc> {
    let naive = now.naive_local();
    let truncated = naive
        .with_minute(0)
        .and_then(|n| n.with_second(0))
        .and_then(|n| n.with_nanosecond(0))
        .unwrap_or(naive);
    resolve_local(truncated, now)
}

fn resolve_local(naive: NaiveDateTime, fallback: DateTime<Local>) -> DateTime<Utc> {
    match naive.and_local_timezone(Local) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
        // DST gap: no such local time today, keep the instant itself.
        LocalResult::None => fallback.with_timezone(&Utc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hour_start_truncates_to_hour() {
        let now = Local::now();
        let start = hour_start(now).with_timezone(&Local);
        assert_eq!(start.minute(), 0);
        assert_eq!(start.second(), 0);
        assert!(start <= now);
        assert!(now - start < chrono::Duration::hours(1));
    }

    #[test]
    fn test_day_start_is_before_hour_start() {
        let now = Local::now();
        assert!(day_start(now) <= hour_start(now));
    }

    #[test]
    fn test_period_starts_are_stable_within_period() {
        let now = Local::now();
        assert_eq!(day_start(now), day_start(now));
        assert_eq!(hour_start(now), hour_start(now));
    }
}
