//! Permission resolver: pure functions from hierarchy snapshots to an
//! effective access level. No I/O here; callers load the snapshots.

use crate::db::models::{Board, BoardMember, BoardRole, Team, TeamMember, TeamRole};

/// Effective access level on a resource, totally ordered for gating.
/// `Owner` and `Admin` are both full control; `Owner` additionally cannot
/// be removed or downgraded by another admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AccessLevel {
    None,
    Viewer,
    Editor,
    Admin,
    Owner,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::None => "none",
            AccessLevel::Viewer => "viewer",
            AccessLevel::Editor => "editor",
            AccessLevel::Admin => "admin",
            AccessLevel::Owner => "owner",
        }
    }
}

/// A team with its hydrated member list.
#[derive(Debug, Clone)]
pub struct TeamCtx {
    pub team: Team,
    pub members: Vec<TeamMember>,
}

impl TeamCtx {
    /// The owner counts as admin regardless of their member row.
    pub fn is_admin(&self, user_id: &str) -> bool {
        self.team.owner_id == user_id
            || self
                .members
                .iter()
                .any(|m| m.user_id == user_id && m.role == TeamRole::Admin)
    }

    pub fn is_member(&self, user_id: &str) -> bool {
        self.team.owner_id == user_id || self.members.iter().any(|m| m.user_id == user_id)
    }
}

/// A board with its member list and (when team-owned) the team snapshot.
#[derive(Debug, Clone)]
pub struct BoardCtx {
    pub board: Board,
    pub members: Vec<BoardMember>,
    pub team: Option<TeamCtx>,
}

/// Resolution order for a board:
/// 1. creator → owner (covers legacy records with no membership bookkeeping)
/// 2. board-member entry → its role
/// 3. team owner/admin → admin (escalation fallback)
/// 4. plain team member → viewer
/// 5. otherwise → none
pub fn resolve_board(user_id: &str, ctx: &BoardCtx) -> AccessLevel {
    if ctx.board.created_by == user_id {
        return AccessLevel::Owner;
    }
    if let Some(member) = ctx.members.iter().find(|m| m.user_id == user_id) {
        return match member.role {
            BoardRole::Admin => AccessLevel::Admin,
            BoardRole::Editor => AccessLevel::Editor,
            BoardRole::Viewer => AccessLevel::Viewer,
        };
    }
    if let Some(team) = &ctx.team {
        if team.is_admin(user_id) {
            return AccessLevel::Admin;
        }
        if team.is_member(user_id) {
            return AccessLevel::Viewer;
        }
    }
    AccessLevel::None
}

/// Columns and tasks carry no ACL of their own; they resolve through the
/// owning board's snapshot.
pub fn resolve_team(user_id: &str, ctx: &TeamCtx) -> AccessLevel {
    if ctx.team.owner_id == user_id {
        return AccessLevel::Owner;
    }
    match ctx.members.iter().find(|m| m.user_id == user_id) {
        Some(m) if m.role == TeamRole::Admin => AccessLevel::Admin,
        Some(_) => AccessLevel::Editor,
        None => AccessLevel::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Visibility;

    fn board(created_by: &str, team_id: Option<&str>) -> Board {
        Board {
            id: "b1".into(),
            team_id: team_id.map(Into::into),
            name: "Board".into(),
            description: None,
            visibility: Visibility::Private,
            created_by: created_by.into(),
            created_at: "2026-01-15T10:00:00Z".into(),
            updated_at: "2026-01-15T10:00:00Z".into(),
        }
    }

    fn board_member(user_id: &str, role: BoardRole) -> BoardMember {
        BoardMember {
            id: format!("bm-{user_id}"),
            board_id: "b1".into(),
            user_id: user_id.into(),
            role,
            created_at: "2026-01-15T10:00:00Z".into(),
        }
    }

    fn team(owner_id: &str) -> Team {
        Team {
            id: "t1".into(),
            name: "Team".into(),
            owner_id: owner_id.into(),
            created_at: "2026-01-15T10:00:00Z".into(),
            updated_at: "2026-01-15T10:00:00Z".into(),
        }
    }

    fn team_member(user_id: &str, role: TeamRole) -> TeamMember {
        TeamMember {
            id: format!("tm-{user_id}"),
            team_id: "t1".into(),
            user_id: user_id.into(),
            role,
            created_at: "2026-01-15T10:00:00Z".into(),
        }
    }

    #[test]
    fn creator_is_owner_even_with_empty_member_list() {
        let ctx = BoardCtx { board: board("alice", None), members: vec![], team: None };
        assert_eq!(resolve_board("alice", &ctx), AccessLevel::Owner);
    }

    #[test]
    fn board_member_roles_map_directly() {
        let ctx = BoardCtx {
            board: board("alice", None),
            members: vec![
                board_member("bob", BoardRole::Admin),
                board_member("carol", BoardRole::Editor),
                board_member("dave", BoardRole::Viewer),
            ],
            team: None,
        };
        assert_eq!(resolve_board("bob", &ctx), AccessLevel::Admin);
        assert_eq!(resolve_board("carol", &ctx), AccessLevel::Editor);
        assert_eq!(resolve_board("dave", &ctx), AccessLevel::Viewer);
        assert_eq!(resolve_board("mallory", &ctx), AccessLevel::None);
    }

    #[test]
    fn team_admin_escalates_to_board_admin() {
        let ctx = BoardCtx {
            board: board("alice", Some("t1")),
            members: vec![],
            team: Some(TeamCtx {
                team: team("owen"),
                members: vec![
                    team_member("owen", TeamRole::Admin),
                    team_member("adam", TeamRole::Admin),
                    team_member("mia", TeamRole::Member),
                ],
            }),
        };
        assert_eq!(resolve_board("owen", &ctx), AccessLevel::Admin);
        assert_eq!(resolve_board("adam", &ctx), AccessLevel::Admin);
        // Plain team members get read access, not edit
        assert_eq!(resolve_board("mia", &ctx), AccessLevel::Viewer);
        assert_eq!(resolve_board("stranger", &ctx), AccessLevel::None);
    }

    #[test]
    fn board_membership_wins_over_team_fallback() {
        let ctx = BoardCtx {
            board: board("alice", Some("t1")),
            members: vec![board_member("mia", BoardRole::Editor)],
            team: Some(TeamCtx {
                team: team("owen"),
                members: vec![team_member("mia", TeamRole::Member)],
            }),
        };
        assert_eq!(resolve_board("mia", &ctx), AccessLevel::Editor);
    }

    #[test]
    fn team_owner_without_member_row_is_owner() {
        let ctx = TeamCtx { team: team("owen"), members: vec![] };
        assert_eq!(resolve_team("owen", &ctx), AccessLevel::Owner);
        assert_eq!(resolve_team("mia", &ctx), AccessLevel::None);
    }

    #[test]
    fn team_roles_resolve() {
        let ctx = TeamCtx {
            team: team("owen"),
            members: vec![
                team_member("adam", TeamRole::Admin),
                team_member("mia", TeamRole::Member),
            ],
        };
        assert_eq!(resolve_team("adam", &ctx), AccessLevel::Admin);
        assert_eq!(resolve_team("mia", &ctx), AccessLevel::Editor);
    }

    #[test]
    fn levels_are_totally_ordered() {
        assert!(AccessLevel::None < AccessLevel::Viewer);
        assert!(AccessLevel::Viewer < AccessLevel::Editor);
        assert!(AccessLevel::Editor < AccessLevel::Admin);
        assert!(AccessLevel::Admin < AccessLevel::Owner);
    }
}
