use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ============================================================================
// Activity log
// ============================================================================

/// The fixed set of auditable mutation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    TaskCreated,
    TaskUpdated,
    TaskDeleted,
    TaskMoved,
    TaskAssigned,
    TaskCompleted,
    TaskReopened,
    BoardCreated,
    BoardUpdated,
    BoardDeleted,
    ColumnCreated,
    ColumnUpdated,
    ColumnDeleted,
    TeamCreated,
    TeamUpdated,
    TeamDeleted,
    MemberAdded,
    MemberRemoved,
    RoleChanged,
    OwnershipTransferred,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityAction::TaskCreated => "task_created",
            ActivityAction::TaskUpdated => "task_updated",
            ActivityAction::TaskDeleted => "task_deleted",
            ActivityAction::TaskMoved => "task_moved",
            ActivityAction::TaskAssigned => "task_assigned",
            ActivityAction::TaskCompleted => "task_completed",
            ActivityAction::TaskReopened => "task_reopened",
            ActivityAction::BoardCreated => "board_created",
            ActivityAction::BoardUpdated => "board_updated",
            ActivityAction::BoardDeleted => "board_deleted",
            ActivityAction::ColumnCreated => "column_created",
            ActivityAction::ColumnUpdated => "column_updated",
            ActivityAction::ColumnDeleted => "column_deleted",
            ActivityAction::TeamCreated => "team_created",
            ActivityAction::TeamUpdated => "team_updated",
            ActivityAction::TeamDeleted => "team_deleted",
            ActivityAction::MemberAdded => "member_added",
            ActivityAction::MemberRemoved => "member_removed",
            ActivityAction::RoleChanged => "role_changed",
            ActivityAction::OwnershipTransferred => "ownership_transferred",
        }
    }
}

/// Append-only audit record. Never mutated or deleted by normal operation.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Activity {
    pub id: String,
    pub user_id: String,
    pub action: String,
    pub task_id: Option<String>,
    pub board_id: Option<String>,
    pub column_id: Option<String>,
    pub team_id: Option<String>,
    pub target_user_id: Option<String>,
    /// Free-form JSON payload.
    pub metadata: Option<String>,
    pub created_at: String,
}

/// Input for a single append. References default to none.
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub user_id: String,
    pub action: ActivityAction,
    pub task_id: Option<String>,
    pub board_id: Option<String>,
    pub column_id: Option<String>,
    pub team_id: Option<String>,
    pub target_user_id: Option<String>,
    pub metadata: Option<String>,
}

impl NewActivity {
    pub fn new(user_id: impl Into<String>, action: ActivityAction) -> Self {
        Self {
            user_id: user_id.into(),
            action,
            task_id: None,
            board_id: None,
            column_id: None,
            team_id: None,
            target_user_id: None,
            metadata: None,
        }
    }
}
