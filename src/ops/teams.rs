use crate::db::models::{
    ActivityAction, CreateTeamInput, NewActivity, NotificationType, Team, TeamMember, TeamRole,
    UpdateTeamInput,
};
use crate::db::repos::teams;
use crate::engine::access::{self, AccessLevel};
use crate::engine::dispatch::{dispatch, Fanout};
use crate::engine::{activity, recipients};
use crate::error::AppError;
use crate::validation::{require_non_empty, require_valid_id};
use crate::AppState;

pub fn get_team(state: &AppState, actor: &str, team_id: &str) -> Result<Team, AppError> {
    let ctx = super::team_ctx(&state.db, team_id)?;
    super::require_level(
        access::resolve_team(actor, &ctx),
        AccessLevel::Editor,
        "viewing a team",
    )?;
    Ok(ctx.team)
}

pub fn list_team_members(
    state: &AppState,
    actor: &str,
    team_id: &str,
) -> Result<Vec<TeamMember>, AppError> {
    let ctx = super::team_ctx(&state.db, team_id)?;
    super::require_level(
        access::resolve_team(actor, &ctx),
        AccessLevel::Editor,
        "viewing team members",
    )?;
    Ok(ctx.members)
}

/// Any authenticated user may create a team; the creator becomes its owner
/// and is recorded as an admin member.
pub fn create_team(state: &AppState, actor: &str, input: CreateTeamInput) -> Result<Team, AppError> {
    require_non_empty("name", &input.name)?;

    let team = teams::create(&state.db, actor, input)?;
    tracing::info!(team = %team.id, actor = %actor, "Team created");

    activity::record(&state.db, NewActivity {
        team_id: Some(team.id.clone()),
        ..NewActivity::new(actor, ActivityAction::TeamCreated)
    });
    // The creator is the only member; nobody else to notify.

    Ok(team)
}

pub fn update_team(
    state: &AppState,
    actor: &str,
    team_id: &str,
    input: UpdateTeamInput,
) -> Result<Team, AppError> {
    let ctx = super::team_ctx(&state.db, team_id)?;
    super::require_level(
        access::resolve_team(actor, &ctx),
        AccessLevel::Admin,
        "updating a team",
    )?;
    if let Some(name) = &input.name {
        require_non_empty("name", name)?;
    }

    let team = teams::update(&state.db, team_id, input)?;

    activity::record(&state.db, NewActivity {
        team_id: Some(team.id.clone()),
        ..NewActivity::new(actor, ActivityAction::TeamUpdated)
    });
    dispatch(
        &state.dispatch_ctx(actor),
        &recipients::team_recipients(actor, &ctx),
        &Fanout {
            notif_type: NotificationType::TeamUpdated,
            message: format!("Team \"{}\" was updated", team.name),
            event: "team-updated",
            payload: serde_json::to_value(&team).unwrap_or_default(),
            task_id: None,
            board_id: None,
            team_id: Some(team.id.clone()),
        },
    );

    Ok(team)
}

/// Owner only. Member rows cascade; boards that referenced the team keep
/// their own ACLs with the team link cleared.
pub fn delete_team(state: &AppState, actor: &str, team_id: &str) -> Result<(), AppError> {
    let ctx = super::team_ctx(&state.db, team_id)?;
    super::require_level(
        access::resolve_team(actor, &ctx),
        AccessLevel::Owner,
        "deleting a team",
    )?;

    let recipient_set = recipients::team_recipients(actor, &ctx);
    let name = ctx.team.name.clone();

    teams::delete(&state.db, team_id)?;
    tracing::info!(team = %team_id, actor = %actor, "Team deleted");

    activity::record(&state.db, NewActivity {
        team_id: Some(team_id.to_string()),
        ..NewActivity::new(actor, ActivityAction::TeamDeleted)
    });
    dispatch(
        &state.dispatch_ctx(actor),
        &recipient_set,
        &Fanout {
            notif_type: NotificationType::TeamDeleted,
            message: format!("Team \"{name}\" was deleted"),
            event: "team-deleted",
            payload: serde_json::json!({ "id": team_id }),
            task_id: None,
            board_id: None,
            team_id: Some(team_id.to_string()),
        },
    );

    Ok(())
}

pub fn add_team_member(
    state: &AppState,
    actor: &str,
    team_id: &str,
    user_id: &str,
    role: TeamRole,
) -> Result<TeamMember, AppError> {
    require_valid_id("user_id", user_id)?;
    let ctx = super::team_ctx(&state.db, team_id)?;
    super::require_level(
        access::resolve_team(actor, &ctx),
        AccessLevel::Admin,
        "adding a team member",
    )?;
    if ctx.members.iter().any(|m| m.user_id == user_id) || ctx.team.owner_id == user_id {
        return Err(AppError::InvalidState(format!(
            "user {user_id} is already a member of this team"
        )));
    }

    let member = teams::add_member(&state.db, team_id, user_id, role)?;

    activity::record(&state.db, NewActivity {
        team_id: Some(team_id.to_string()),
        target_user_id: Some(user_id.to_string()),
        metadata: Some(serde_json::json!({ "role": role }).to_string()),
        ..NewActivity::new(actor, ActivityAction::MemberAdded)
    });
    // Reload so the new member is part of the fan-out
    let ctx = super::team_ctx(&state.db, team_id)?;
    dispatch(
        &state.dispatch_ctx(actor),
        &recipients::team_recipients(actor, &ctx),
        &Fanout {
            notif_type: NotificationType::MemberAdded,
            message: format!("{user_id} joined team \"{}\"", ctx.team.name),
            event: "team-member-added",
            payload: serde_json::to_value(&member).unwrap_or_default(),
            task_id: None,
            board_id: None,
            team_id: Some(team_id.to_string()),
        },
    );

    Ok(member)
}

pub fn remove_team_member(
    state: &AppState,
    actor: &str,
    team_id: &str,
    user_id: &str,
) -> Result<(), AppError> {
    let ctx = super::team_ctx(&state.db, team_id)?;
    super::require_level(
        access::resolve_team(actor, &ctx),
        AccessLevel::Admin,
        "removing a team member",
    )?;
    if user_id == ctx.team.owner_id {
        return Err(AppError::InvalidState(
            "the team owner cannot be removed; transfer ownership first".into(),
        ));
    }
    if !ctx.members.iter().any(|m| m.user_id == user_id) {
        return Err(AppError::NotFound(format!("Team membership for {user_id}")));
    }

    // Pre-removal snapshot so the removed member still hears about it
    let recipient_set = recipients::team_recipients(actor, &ctx);

    teams::remove_member(&state.db, team_id, user_id)?;

    activity::record(&state.db, NewActivity {
        team_id: Some(team_id.to_string()),
        target_user_id: Some(user_id.to_string()),
        ..NewActivity::new(actor, ActivityAction::MemberRemoved)
    });
    dispatch(
        &state.dispatch_ctx(actor),
        &recipient_set,
        &Fanout {
            notif_type: NotificationType::MemberRemoved,
            message: format!("{user_id} was removed from team \"{}\"", ctx.team.name),
            event: "team-member-removed",
            payload: serde_json::json!({ "team_id": team_id, "user_id": user_id }),
            task_id: None,
            board_id: None,
            team_id: Some(team_id.to_string()),
        },
    );

    Ok(())
}

/// Role changes keep the admin invariant: the owner always counts as admin,
/// and demoting the owner hands ownership to another admin. With no such
/// successor the demotion is rejected.
pub fn change_team_member_role(
    state: &AppState,
    actor: &str,
    team_id: &str,
    user_id: &str,
    new_role: TeamRole,
) -> Result<TeamMember, AppError> {
    let ctx = super::team_ctx(&state.db, team_id)?;
    super::require_level(
        access::resolve_team(actor, &ctx),
        AccessLevel::Admin,
        "changing a team member's role",
    )?;
    let member = ctx
        .members
        .iter()
        .find(|m| m.user_id == user_id)
        .ok_or_else(|| AppError::NotFound(format!("Team membership for {user_id}")))?;
    let old_role = member.role;

    let mut successor: Option<String> = None;
    if user_id == ctx.team.owner_id && new_role != TeamRole::Admin {
        successor = ctx
            .members
            .iter()
            .find(|m| m.role == TeamRole::Admin && m.user_id != ctx.team.owner_id)
            .map(|m| m.user_id.clone());
        if successor.is_none() {
            return Err(AppError::InvalidState(
                "demoting the owner would leave the team without an admin".into(),
            ));
        }
    }

    if let Some(new_owner) = &successor {
        teams::set_owner(&state.db, team_id, new_owner)?;
        tracing::info!(team = %team_id, new_owner = %new_owner, "Ownership reassigned on owner demotion");
    }
    teams::update_member_role(&state.db, team_id, user_id, new_role)?;

    activity::record(&state.db, NewActivity {
        team_id: Some(team_id.to_string()),
        target_user_id: Some(user_id.to_string()),
        metadata: Some(
            serde_json::json!({
                "from": old_role,
                "to": new_role,
                "ownership_reassigned_to": successor,
            })
            .to_string(),
        ),
        ..NewActivity::new(actor, ActivityAction::RoleChanged)
    });
    dispatch(
        &state.dispatch_ctx(actor),
        &recipients::team_recipients(actor, &ctx),
        &Fanout {
            notif_type: NotificationType::RoleChanged,
            message: format!(
                "{user_id}'s role in \"{}\" is now {}",
                ctx.team.name,
                new_role.as_str()
            ),
            event: "team-member-role-changed",
            payload: serde_json::json!({ "team_id": team_id, "user_id": user_id, "role": new_role }),
            task_id: None,
            board_id: None,
            team_id: Some(team_id.to_string()),
        },
    );

    teams::find_member(&state.db, team_id, user_id)?
        .ok_or_else(|| AppError::NotFound(format!("Team membership for {user_id}")))
}

/// Current owner only. The target must already be a member and is promoted
/// to admin; the previous owner stays on as an admin member.
pub fn transfer_team_ownership(
    state: &AppState,
    actor: &str,
    team_id: &str,
    new_owner: &str,
) -> Result<Team, AppError> {
    let ctx = super::team_ctx(&state.db, team_id)?;
    if actor != ctx.team.owner_id {
        return Err(AppError::Forbidden(
            "only the current owner can transfer ownership".into(),
        ));
    }
    if new_owner == actor {
        return Err(AppError::InvalidState(format!("{new_owner} already owns this team")));
    }
    if !ctx.members.iter().any(|m| m.user_id == new_owner) {
        return Err(AppError::InvalidState(format!(
            "{new_owner} must already be a team member to receive ownership"
        )));
    }

    teams::set_owner(&state.db, team_id, new_owner)?;
    teams::update_member_role(&state.db, team_id, new_owner, TeamRole::Admin)?;
    // Previous owner stays admin; legacy teams may lack their member row
    if ctx.members.iter().any(|m| m.user_id == actor) {
        teams::update_member_role(&state.db, team_id, actor, TeamRole::Admin)?;
    } else {
        teams::add_member(&state.db, team_id, actor, TeamRole::Admin)?;
    }
    tracing::info!(team = %team_id, from = %actor, to = %new_owner, "Ownership transferred");

    activity::record(&state.db, NewActivity {
        team_id: Some(team_id.to_string()),
        target_user_id: Some(new_owner.to_string()),
        ..NewActivity::new(actor, ActivityAction::OwnershipTransferred)
    });
    dispatch(
        &state.dispatch_ctx(actor),
        &recipients::team_recipients(actor, &ctx),
        &Fanout {
            notif_type: NotificationType::OwnershipTransferred,
            message: format!("{new_owner} now owns team \"{}\"", ctx.team.name),
            event: "team-ownership-transferred",
            payload: serde_json::json!({ "team_id": team_id, "owner_id": new_owner }),
            task_id: None,
            board_id: None,
            team_id: Some(team_id.to_string()),
        },
    );

    teams::get_by_id(&state.db, team_id)
}
