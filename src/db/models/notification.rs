use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ============================================================================
// Notifications
// ============================================================================

/// Per-action notification kinds pushed to recipients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    TaskCreated,
    TaskUpdated,
    TaskDeleted,
    TaskMoved,
    TaskAssigned,
    TaskCompleted,
    TaskReopened,
    ColumnCreated,
    ColumnUpdated,
    ColumnDeleted,
    BoardCreated,
    BoardUpdated,
    BoardDeleted,
    TeamUpdated,
    TeamDeleted,
    MemberAdded,
    MemberRemoved,
    RoleChanged,
    OwnershipTransferred,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::TaskCreated => "task_created",
            NotificationType::TaskUpdated => "task_updated",
            NotificationType::TaskDeleted => "task_deleted",
            NotificationType::TaskMoved => "task_moved",
            NotificationType::TaskAssigned => "task_assigned",
            NotificationType::TaskCompleted => "task_completed",
            NotificationType::TaskReopened => "task_reopened",
            NotificationType::ColumnCreated => "column_created",
            NotificationType::ColumnUpdated => "column_updated",
            NotificationType::ColumnDeleted => "column_deleted",
            NotificationType::BoardCreated => "board_created",
            NotificationType::BoardUpdated => "board_updated",
            NotificationType::BoardDeleted => "board_deleted",
            NotificationType::TeamUpdated => "team_updated",
            NotificationType::TeamDeleted => "team_deleted",
            NotificationType::MemberAdded => "member_added",
            NotificationType::MemberRemoved => "member_removed",
            NotificationType::RoleChanged => "role_changed",
            NotificationType::OwnershipTransferred => "ownership_transferred",
        }
    }
}

/// Durable notification record. The real-time push is an optimization
/// layered over this; a disconnected client polls these rows later.
/// Mutated only to flip `read`; deleted only by its recipient.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Notification {
    pub id: String,
    pub recipient_id: String,
    pub notif_type: String,
    pub message: String,
    pub read: bool,
    pub related_task_id: Option<String>,
    pub related_board_id: Option<String>,
    pub related_team_id: Option<String>,
    pub initiator_id: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub recipient_id: String,
    pub notif_type: NotificationType,
    pub message: String,
    pub related_task_id: Option<String>,
    pub related_board_id: Option<String>,
    pub related_team_id: Option<String>,
    pub initiator_id: String,
}
