use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ============================================================================
// Columns
// ============================================================================

/// An ordered lane on a board. `position` is an advisory ordering key:
/// concurrent repositioning can produce duplicates, ties are broken by
/// insertion order.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Column {
    pub id: String,
    pub board_id: String,
    pub title: String,
    pub position: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateColumnInput {
    pub title: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UpdateColumnInput {
    pub title: Option<String>,
    pub position: Option<i64>,
}
