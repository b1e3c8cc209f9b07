use rusqlite::params;

use crate::db::models::NewActivity;
use crate::db::DbPool;
use crate::error::AppError;

/// Append one audit record. Insertion is the whole contract; the activity
/// feed reads live in the transport glue.
pub fn insert(pool: &DbPool, input: &NewActivity) -> Result<String, AppError> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO activities
         (id, user_id, action, task_id, board_id, column_id, team_id, target_user_id, metadata, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            id,
            input.user_id,
            input.action.as_str(),
            input.task_id,
            input.board_id,
            input.column_id,
            input.team_id,
            input.target_user_id,
            input.metadata,
            now
        ],
    )?;
    Ok(id)
}
