use rusqlite::{params, Row};

use crate::db::models::{NewNotification, Notification};
use crate::db::DbPool;
use crate::error::AppError;

fn row_to_notification(row: &Row) -> rusqlite::Result<Notification> {
    Ok(Notification {
        id: row.get("id")?,
        recipient_id: row.get("recipient_id")?,
        notif_type: row.get("notif_type")?,
        message: row.get("message")?,
        read: row.get::<_, i32>("read")? != 0,
        related_task_id: row.get("related_task_id")?,
        related_board_id: row.get("related_board_id")?,
        related_team_id: row.get("related_team_id")?,
        initiator_id: row.get("initiator_id")?,
        created_at: row.get("created_at")?,
    })
}

pub fn get_by_id(pool: &DbPool, id: &str) -> Result<Notification, AppError> {
    let conn = pool.get()?;
    conn.query_row(
        "SELECT * FROM notifications WHERE id = ?1",
        params![id],
        row_to_notification,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => AppError::NotFound(format!("Notification {id}")),
        other => AppError::Database(other),
    })
}

pub fn list_for_recipient(pool: &DbPool, recipient_id: &str) -> Result<Vec<Notification>, AppError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT * FROM notifications WHERE recipient_id = ?1 ORDER BY created_at DESC LIMIT 100",
    )?;
    let rows = stmt.query_map(params![recipient_id], row_to_notification)?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

pub fn insert(pool: &DbPool, input: &NewNotification) -> Result<Notification, AppError> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO notifications
         (id, recipient_id, notif_type, message, read, related_task_id, related_board_id, related_team_id, initiator_id, created_at)
         VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6, ?7, ?8, ?9)",
        params![
            id,
            input.recipient_id,
            input.notif_type.as_str(),
            input.message,
            input.related_task_id,
            input.related_board_id,
            input.related_team_id,
            input.initiator_id,
            now
        ],
    )?;

    get_by_id(pool, &id)
}

pub fn mark_read(pool: &DbPool, id: &str) -> Result<(), AppError> {
    let conn = pool.get()?;
    conn.execute("UPDATE notifications SET read = 1 WHERE id = ?1", params![id])?;
    Ok(())
}

pub fn mark_all_read(pool: &DbPool, recipient_id: &str) -> Result<usize, AppError> {
    let conn = pool.get()?;
    let rows = conn.execute(
        "UPDATE notifications SET read = 1 WHERE recipient_id = ?1 AND read = 0",
        params![recipient_id],
    )?;
    Ok(rows)
}

pub fn delete(pool: &DbPool, id: &str) -> Result<bool, AppError> {
    let conn = pool.get()?;
    let rows = conn.execute("DELETE FROM notifications WHERE id = ?1", params![id])?;
    Ok(rows > 0)
}
