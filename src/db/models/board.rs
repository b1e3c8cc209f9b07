use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::AppError;

// ============================================================================
// Boards
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Board {
    pub id: String,
    /// Optional owning team. A board's member list is its own; the team is
    /// only consulted as a permission fallback.
    pub team_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub visibility: Visibility,
    /// Immutable. The creator is implicitly full-access even when absent
    /// from the member list.
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Private,
    Team,
    Public,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Private => "private",
            Visibility::Team => "team",
            Visibility::Public => "public",
        }
    }

    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "private" => Ok(Visibility::Private),
            "team" => Ok(Visibility::Team),
            "public" => Ok(Visibility::Public),
            other => Err(AppError::Validation(format!(
                "invalid visibility '{other}' (expected private, team or public)"
            ))),
        }
    }
}

impl rusqlite::types::FromSql for Visibility {
    fn column_result(value: rusqlite::types::ValueRef<'_>) -> rusqlite::types::FromSqlResult<Self> {
        match value.as_str()? {
            "private" => Ok(Visibility::Private),
            "team" => Ok(Visibility::Team),
            "public" => Ok(Visibility::Public),
            _ => Err(rusqlite::types::FromSqlError::InvalidType),
        }
    }
}

impl rusqlite::types::ToSql for Visibility {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

/// Membership role on a board. Orthogonal to team roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum BoardRole {
    Admin,
    Editor,
    Viewer,
}

impl BoardRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoardRole::Admin => "admin",
            BoardRole::Editor => "editor",
            BoardRole::Viewer => "viewer",
        }
    }

    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "admin" => Ok(BoardRole::Admin),
            // Legacy records used "member" for edit-capable board members.
            "editor" | "member" => Ok(BoardRole::Editor),
            "viewer" => Ok(BoardRole::Viewer),
            other => Err(AppError::Validation(format!(
                "invalid board role '{other}' (expected admin, editor or viewer)"
            ))),
        }
    }
}

impl rusqlite::types::FromSql for BoardRole {
    fn column_result(value: rusqlite::types::ValueRef<'_>) -> rusqlite::types::FromSqlResult<Self> {
        match value.as_str()? {
            "admin" => Ok(BoardRole::Admin),
            "editor" | "member" => Ok(BoardRole::Editor),
            "viewer" => Ok(BoardRole::Viewer),
            _ => Err(rusqlite::types::FromSqlError::InvalidType),
        }
    }
}

impl rusqlite::types::ToSql for BoardRole {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BoardMember {
    pub id: String,
    pub board_id: String,
    pub user_id: String,
    pub role: BoardRole,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateBoardInput {
    pub name: String,
    pub description: Option<String>,
    pub team_id: Option<String>,
    pub visibility: Option<Visibility>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UpdateBoardInput {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub visibility: Option<Visibility>,
}
