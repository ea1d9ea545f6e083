//! Background maintenance: evict expired in-memory rate entries and delete
//! durable rate rows past the retention window.

use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use diesel::prelude::*;

use crate::state::SharedState;

/// How often the sweep runs.
const SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Durable rate rows older than this are deleted.
const RETENTION_DAYS: i64 = 7;

pub fn spawn(state: SharedState) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        // The first tick fires immediately; skip it.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            state.rate_standard.evict_expired();
            state.rate_strict.evict_expired();
            delete_stale_rows(&state);
        }
    });
}

fn delete_stale_rows(state: &SharedState) {
    use crate::schema::rate_limit_stats::dsl::*;

    let cutoff = Utc::now() - ChronoDuration::days(RETENTION_DAYS);
    let mut conn = match state.pool.get() {
        Ok(conn) => conn,
        Err(e) => {
            tracing::warn!(error = %e, "rate row retention sweep skipped: no connection");
            return;
        }
    };

    match diesel::delete(rate_limit_stats.filter(period_start.lt(cutoff))).execute(&mut conn) {
        Ok(0) => {}
        Ok(deleted) => {
            tracing::info!(deleted = deleted, "rate rows past retention deleted");
        }
        Err(e) => {
            tracing::warn!(error = %e, "rate row retention sweep failed");
        }
    }
}
