//! Notification maintenance: reading the durable trail, flipping `read`,
//! and recipient-only deletion.

use crate::db::models::Notification;
use crate::db::repos::notifications;
use crate::error::AppError;
use crate::AppState;

pub fn list_notifications(state: &AppState, actor: &str) -> Result<Vec<Notification>, AppError> {
    notifications::list_for_recipient(&state.db, actor)
}

pub fn mark_notification_read(
    state: &AppState,
    actor: &str,
    notification_id: &str,
) -> Result<Notification, AppError> {
    let notification = notifications::get_by_id(&state.db, notification_id)?;
    if notification.recipient_id != actor {
        return Err(AppError::Forbidden(
            "only the recipient can mark a notification read".into(),
        ));
    }
    notifications::mark_read(&state.db, notification_id)?;
    notifications::get_by_id(&state.db, notification_id)
}

pub fn mark_all_notifications_read(state: &AppState, actor: &str) -> Result<usize, AppError> {
    notifications::mark_all_read(&state.db, actor)
}

pub fn delete_notification(
    state: &AppState,
    actor: &str,
    notification_id: &str,
) -> Result<(), AppError> {
    let notification = notifications::get_by_id(&state.db, notification_id)?;
    if notification.recipient_id != actor {
        return Err(AppError::Forbidden(
            "only the recipient can delete a notification".into(),
        ));
    }
    notifications::delete(&state.db, notification_id)?;
    Ok(())
}
