//! Notification dispatcher: the durable record is the source of truth, the
//! real-time push is an optimization on top. Every failure in here is
//! warn-logged and dropped; the primary mutation already succeeded.

use std::collections::BTreeSet;

use crate::db::models::{NewNotification, NotificationType};
use crate::db::repos::notifications;
use crate::db::DbPool;
use crate::engine::bus::{RealtimeChannel, Room};

/// References the dispatcher needs to persist notifications and push
/// events. Constructed once per mutation and reused for every recipient.
pub struct DispatchContext<'a> {
    pub pool: &'a DbPool,
    pub realtime: &'a dyn RealtimeChannel,
    pub actor: &'a str,
}

/// One mutation's fan-out: notification kind, user-facing message, the
/// real-time event name and payload, and the related resource references.
#[derive(Debug, Clone)]
pub struct Fanout {
    pub notif_type: NotificationType,
    pub message: String,
    pub event: &'static str,
    pub payload: serde_json::Value,
    pub task_id: Option<String>,
    pub board_id: Option<String>,
    pub team_id: Option<String>,
}

/// For each recipient: persist a notification, then push to their private
/// room. Afterwards push once to the board/team rooms where applicable.
pub fn dispatch(ctx: &DispatchContext<'_>, recipients: &BTreeSet<String>, fanout: &Fanout) {
    for recipient in recipients {
        let record = NewNotification {
            recipient_id: recipient.clone(),
            notif_type: fanout.notif_type,
            message: fanout.message.clone(),
            related_task_id: fanout.task_id.clone(),
            related_board_id: fanout.board_id.clone(),
            related_team_id: fanout.team_id.clone(),
            initiator_id: ctx.actor.to_string(),
        };
        if let Err(e) = notifications::insert(ctx.pool, &record) {
            tracing::warn!(recipient = %recipient, "Failed to persist notification: {}", e);
        }
        if let Err(e) = ctx.realtime.emit_to_room(
            &Room::User(recipient.clone()),
            fanout.event,
            fanout.payload.clone(),
        ) {
            tracing::warn!(recipient = %recipient, "Failed to push realtime event: {}", e);
        }
    }

    if let Some(board_id) = &fanout.board_id {
        if let Err(e) = ctx.realtime.emit_to_room(
            &Room::Board(board_id.clone()),
            fanout.event,
            fanout.payload.clone(),
        ) {
            tracing::warn!(board = %board_id, "Failed to push realtime event: {}", e);
        }
    }
    if let Some(team_id) = &fanout.team_id {
        if let Err(e) = ctx.realtime.emit_to_room(
            &Room::Team(team_id.clone()),
            fanout.event,
            fanout.payload.clone(),
        ) {
            tracing::warn!(team = %team_id, "Failed to push realtime event: {}", e);
        }
    }
}
