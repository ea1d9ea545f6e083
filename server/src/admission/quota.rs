//! Quota ledger: free generations per non-premium user.
//!
//! `debit` never raises; a lost debit degrades revenue protection, not the
//! correctness of the returned recipe, so it logs a compensation warning
//! and moves on.

use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbConn;
use crate::models::Profile;

#[derive(Debug, Clone, Copy)]
pub struct QuotaStatus {
    pub allowed: bool,
    pub is_premium: bool,
    pub free_remaining: i32,
}

/// Read the caller's premium flag and remaining free generations.
/// A missing profile row denies: the identity provider owns creation.
pub fn can_generate(conn: &mut DbConn, user_id: Uuid) -> QueryResult<QuotaStatus> {
    use crate::schema::profiles::dsl::*;

    let profile = profiles
        .find(user_id)
        .select(Profile::as_select())
        .first::<Profile>(conn)
        .optional()?;

    Ok(match profile {
        Some(profile) => QuotaStatus {
            allowed: profile.is_premium || profile.free_generations_remaining > 0,
            is_premium: profile.is_premium,
            free_remaining: profile.free_generations_remaining.max(0),
        },
        None => {
            tracing::warn!(user_id = %user_id, "no profile row for authenticated user");
            QuotaStatus {
                allowed: false,
                is_premium: false,
                free_remaining: 0,
            }
        }
    })
}

/// Debit one free generation. Premium users and exhausted counters are
/// untouched; the counter never goes below zero.
pub fn debit(conn: &mut DbConn, user_id: Uuid) {
    use crate::schema::profiles::dsl::*;

    let result = diesel::update(
        profiles
            .filter(id.eq(user_id))
            .filter(is_premium.eq(false))
            .filter(free_generations_remaining.gt(0)),
    )
    .set(free_generations_remaining.eq(free_generations_remaining - 1))
    .execute(conn);

    match result {
        Ok(0) => {
            tracing::debug!(user_id = %user_id, "quota debit touched no row");
        }
        Ok(_) => {}
        Err(e) => {
            tracing::warn!(
                user_id = %user_id,
                error = %e,
                "quota debit failed; manual compensation required"
            );
        }
    }
}
