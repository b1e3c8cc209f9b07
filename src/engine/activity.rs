//! Best-effort activity logger. Append failures are logged and swallowed;
//! they never alter the primary mutation's outcome.

use crate::db::models::NewActivity;
use crate::db::repos::activities;
use crate::db::DbPool;

pub fn record(pool: &DbPool, entry: NewActivity) {
    if let Err(e) = activities::insert(pool, &entry) {
        tracing::warn!(
            action = entry.action.as_str(),
            user = %entry.user_id,
            "Failed to append activity: {}",
            e
        );
    }
}
