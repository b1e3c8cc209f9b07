//! Recipient set builder: who hears about a mutation. Always a set (no
//! duplicate delivery), always excludes the acting user.

use std::collections::BTreeSet;

use crate::engine::access::{BoardCtx, TeamCtx};

/// Union of the board's members (creator included as implicit member) and,
/// when the board is team-owned, the team's owner and members.
pub fn board_recipients(actor: &str, ctx: &BoardCtx) -> BTreeSet<String> {
    let mut set = BTreeSet::new();
    set.insert(ctx.board.created_by.clone());
    for member in &ctx.members {
        set.insert(member.user_id.clone());
    }
    if let Some(team) = &ctx.team {
        set.insert(team.team.owner_id.clone());
        for member in &team.members {
            set.insert(member.user_id.clone());
        }
    }
    set.remove(actor);
    set
}

/// Team owner plus members, minus the actor.
pub fn team_recipients(actor: &str, ctx: &TeamCtx) -> BTreeSet<String> {
    let mut set = BTreeSet::new();
    set.insert(ctx.team.owner_id.clone());
    for member in &ctx.members {
        set.insert(member.user_id.clone());
    }
    set.remove(actor);
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{
        Board, BoardMember, BoardRole, Team, TeamMember, TeamRole, Visibility,
    };

    fn ctx_with_overlap() -> BoardCtx {
        let board = Board {
            id: "b1".into(),
            team_id: Some("t1".into()),
            name: "Board".into(),
            description: None,
            visibility: Visibility::Team,
            created_by: "alice".into(),
            created_at: "2026-01-15T10:00:00Z".into(),
            updated_at: "2026-01-15T10:00:00Z".into(),
        };
        // bob is both a board member and a team member
        let members = vec![
            BoardMember {
                id: "bm-1".into(),
                board_id: "b1".into(),
                user_id: "bob".into(),
                role: BoardRole::Editor,
                created_at: "2026-01-15T10:00:00Z".into(),
            },
        ];
        let team = TeamCtx {
            team: Team {
                id: "t1".into(),
                name: "Team".into(),
                owner_id: "owen".into(),
                created_at: "2026-01-15T10:00:00Z".into(),
                updated_at: "2026-01-15T10:00:00Z".into(),
            },
            members: vec![
                TeamMember {
                    id: "tm-1".into(),
                    team_id: "t1".into(),
                    user_id: "bob".into(),
                    role: TeamRole::Member,
                    created_at: "2026-01-15T10:00:00Z".into(),
                },
                TeamMember {
                    id: "tm-2".into(),
                    team_id: "t1".into(),
                    user_id: "mia".into(),
                    role: TeamRole::Member,
                    created_at: "2026-01-15T10:00:00Z".into(),
                },
            ],
        };
        BoardCtx { board, members, team: Some(team) }
    }

    #[test]
    fn deduplicates_overlapping_membership_and_excludes_actor() {
        let set = board_recipients("bob", &ctx_with_overlap());
        assert!(!set.contains("bob"));
        let expected: Vec<&str> = vec!["alice", "mia", "owen"];
        assert_eq!(set.iter().map(String::as_str).collect::<Vec<_>>(), expected);
    }

    #[test]
    fn creator_is_included_without_member_row() {
        let mut ctx = ctx_with_overlap();
        ctx.team = None;
        let set = board_recipients("bob", &ctx);
        assert!(set.contains("alice"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn team_recipients_exclude_actor() {
        let ctx = ctx_with_overlap();
        let team = ctx.team.unwrap();
        let set = team_recipients("owen", &team);
        assert!(!set.contains("owen"));
        assert!(set.contains("bob"));
        assert!(set.contains("mia"));
    }
}
