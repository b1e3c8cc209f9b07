use crate::db::models::{
    ActivityAction, Board, BoardMember, BoardRole, CreateBoardInput, NewActivity,
    NotificationType, UpdateBoardInput,
};
use crate::db::repos::boards;
use crate::engine::access::{self, AccessLevel};
use crate::engine::dispatch::{dispatch, Fanout};
use crate::engine::{activity, recipients};
use crate::error::AppError;
use crate::validation::{require_non_empty, require_valid_id};
use crate::AppState;

pub fn get_board(state: &AppState, actor: &str, board_id: &str) -> Result<Board, AppError> {
    let ctx = super::board_ctx(&state.db, board_id)?;
    super::require_level(
        access::resolve_board(actor, &ctx),
        AccessLevel::Viewer,
        "viewing a board",
    )?;
    Ok(ctx.board)
}

pub fn list_board_members(
    state: &AppState,
    actor: &str,
    board_id: &str,
) -> Result<Vec<BoardMember>, AppError> {
    let ctx = super::board_ctx(&state.db, board_id)?;
    super::require_level(
        access::resolve_board(actor, &ctx),
        AccessLevel::Viewer,
        "viewing board members",
    )?;
    Ok(ctx.members)
}

/// Any authenticated user may create a board; the creator becomes its
/// owner. Attaching a team requires being a member of that team.
pub fn create_board(
    state: &AppState,
    actor: &str,
    input: CreateBoardInput,
) -> Result<Board, AppError> {
    require_non_empty("name", &input.name)?;
    if let Some(team_id) = &input.team_id {
        let team = super::team_ctx(&state.db, team_id)?;
        if !team.is_member(actor) {
            return Err(AppError::Forbidden(
                "creating a team board requires team membership".into(),
            ));
        }
    }

    let board = boards::create(&state.db, actor, input)?;
    tracing::info!(board = %board.id, actor = %actor, "Board created");

    activity::record(&state.db, NewActivity {
        board_id: Some(board.id.clone()),
        team_id: board.team_id.clone(),
        ..NewActivity::new(actor, ActivityAction::BoardCreated)
    });

    let ctx = super::board_ctx(&state.db, &board.id)?;
    dispatch(
        &state.dispatch_ctx(actor),
        &recipients::board_recipients(actor, &ctx),
        &Fanout {
            notif_type: NotificationType::BoardCreated,
            message: format!("Board \"{}\" was created", board.name),
            event: "board-created",
            payload: serde_json::to_value(&board).unwrap_or_default(),
            task_id: None,
            board_id: Some(board.id.clone()),
            team_id: board.team_id.clone(),
        },
    );

    Ok(board)
}

/// Only the creator may update a board.
pub fn update_board(
    state: &AppState,
    actor: &str,
    board_id: &str,
    input: UpdateBoardInput,
) -> Result<Board, AppError> {
    let ctx = super::board_ctx(&state.db, board_id)?;
    super::require_level(
        access::resolve_board(actor, &ctx),
        AccessLevel::Owner,
        "updating a board",
    )?;
    if let Some(name) = &input.name {
        require_non_empty("name", name)?;
    }

    let board = boards::update(&state.db, board_id, input)?;

    activity::record(&state.db, NewActivity {
        board_id: Some(board.id.clone()),
        team_id: board.team_id.clone(),
        ..NewActivity::new(actor, ActivityAction::BoardUpdated)
    });
    dispatch(
        &state.dispatch_ctx(actor),
        &recipients::board_recipients(actor, &ctx),
        &Fanout {
            notif_type: NotificationType::BoardUpdated,
            message: format!("Board \"{}\" was updated", board.name),
            event: "board-updated",
            payload: serde_json::to_value(&board).unwrap_or_default(),
            task_id: None,
            board_id: Some(board.id.clone()),
            team_id: board.team_id.clone(),
        },
    );

    Ok(board)
}

/// Only the creator may delete a board. Columns, tasks and memberships go
/// with it.
pub fn delete_board(state: &AppState, actor: &str, board_id: &str) -> Result<(), AppError> {
    let ctx = super::board_ctx(&state.db, board_id)?;
    super::require_level(
        access::resolve_board(actor, &ctx),
        AccessLevel::Owner,
        "deleting a board",
    )?;

    // Recipient set is computed from the pre-delete snapshot
    let recipient_set = recipients::board_recipients(actor, &ctx);
    let name = ctx.board.name.clone();
    let team_id = ctx.board.team_id.clone();

    boards::delete(&state.db, board_id)?;
    tracing::info!(board = %board_id, actor = %actor, "Board deleted");

    activity::record(&state.db, NewActivity {
        board_id: Some(board_id.to_string()),
        team_id: team_id.clone(),
        ..NewActivity::new(actor, ActivityAction::BoardDeleted)
    });
    dispatch(
        &state.dispatch_ctx(actor),
        &recipient_set,
        &Fanout {
            notif_type: NotificationType::BoardDeleted,
            message: format!("Board \"{name}\" was deleted"),
            event: "board-deleted",
            payload: serde_json::json!({ "id": board_id }),
            task_id: None,
            board_id: Some(board_id.to_string()),
            team_id,
        },
    );

    Ok(())
}

/// `admin`+ may manage the member list. The creator's standing is implicit
/// and cannot be granted or revoked through membership rows.
pub fn add_board_member(
    state: &AppState,
    actor: &str,
    board_id: &str,
    user_id: &str,
    role: BoardRole,
) -> Result<BoardMember, AppError> {
    require_valid_id("user_id", user_id)?;
    let ctx = super::board_ctx(&state.db, board_id)?;
    super::require_level(
        access::resolve_board(actor, &ctx),
        AccessLevel::Admin,
        "adding a board member",
    )?;
    if user_id == ctx.board.created_by {
        return Err(AppError::InvalidState(
            "the board creator already has full access".into(),
        ));
    }
    if ctx.members.iter().any(|m| m.user_id == user_id) {
        return Err(AppError::InvalidState(format!(
            "user {user_id} is already a member of this board"
        )));
    }

    let member = boards::add_member(&state.db, board_id, user_id, role)?;

    activity::record(&state.db, NewActivity {
        board_id: Some(board_id.to_string()),
        target_user_id: Some(user_id.to_string()),
        metadata: Some(serde_json::json!({ "role": role }).to_string()),
        ..NewActivity::new(actor, ActivityAction::MemberAdded)
    });
    // Reload so the new member is part of the fan-out
    let ctx = super::board_ctx(&state.db, board_id)?;
    dispatch(
        &state.dispatch_ctx(actor),
        &recipients::board_recipients(actor, &ctx),
        &Fanout {
            notif_type: NotificationType::MemberAdded,
            message: format!("{user_id} was added to board \"{}\"", ctx.board.name),
            event: "board-member-added",
            payload: serde_json::to_value(&member).unwrap_or_default(),
            task_id: None,
            board_id: Some(board_id.to_string()),
            team_id: ctx.board.team_id.clone(),
        },
    );

    Ok(member)
}

pub fn change_board_member_role(
    state: &AppState,
    actor: &str,
    board_id: &str,
    user_id: &str,
    role: BoardRole,
) -> Result<BoardMember, AppError> {
    let ctx = super::board_ctx(&state.db, board_id)?;
    super::require_level(
        access::resolve_board(actor, &ctx),
        AccessLevel::Admin,
        "changing a board member's role",
    )?;
    if user_id == ctx.board.created_by {
        return Err(AppError::InvalidState(
            "the board creator's role cannot be changed".into(),
        ));
    }
    let old = ctx
        .members
        .iter()
        .find(|m| m.user_id == user_id)
        .ok_or_else(|| AppError::NotFound(format!("Board membership for {user_id}")))?
        .role;

    boards::update_member_role(&state.db, board_id, user_id, role)?;

    activity::record(&state.db, NewActivity {
        board_id: Some(board_id.to_string()),
        target_user_id: Some(user_id.to_string()),
        metadata: Some(serde_json::json!({ "from": old, "to": role }).to_string()),
        ..NewActivity::new(actor, ActivityAction::RoleChanged)
    });
    dispatch(
        &state.dispatch_ctx(actor),
        &recipients::board_recipients(actor, &ctx),
        &Fanout {
            notif_type: NotificationType::RoleChanged,
            message: format!("{user_id}'s role on \"{}\" is now {}", ctx.board.name, role.as_str()),
            event: "board-member-role-changed",
            payload: serde_json::json!({ "board_id": board_id, "user_id": user_id, "role": role }),
            task_id: None,
            board_id: Some(board_id.to_string()),
            team_id: ctx.board.team_id.clone(),
        },
    );

    boards::find_member(&state.db, board_id, user_id)?
        .ok_or_else(|| AppError::NotFound(format!("Board membership for {user_id}")))
}

pub fn remove_board_member(
    state: &AppState,
    actor: &str,
    board_id: &str,
    user_id: &str,
) -> Result<(), AppError> {
    let ctx = super::board_ctx(&state.db, board_id)?;
    super::require_level(
        access::resolve_board(actor, &ctx),
        AccessLevel::Admin,
        "removing a board member",
    )?;
    if user_id == ctx.board.created_by {
        return Err(AppError::InvalidState(
            "the board creator cannot be removed".into(),
        ));
    }
    if !ctx.members.iter().any(|m| m.user_id == user_id) {
        return Err(AppError::NotFound(format!("Board membership for {user_id}")));
    }

    // Pre-removal snapshot so the removed member still hears about it
    let recipient_set = recipients::board_recipients(actor, &ctx);

    boards::remove_member(&state.db, board_id, user_id)?;

    activity::record(&state.db, NewActivity {
        board_id: Some(board_id.to_string()),
        target_user_id: Some(user_id.to_string()),
        ..NewActivity::new(actor, ActivityAction::MemberRemoved)
    });
    dispatch(
        &state.dispatch_ctx(actor),
        &recipient_set,
        &Fanout {
            notif_type: NotificationType::MemberRemoved,
            message: format!("{user_id} was removed from board \"{}\"", ctx.board.name),
            event: "board-member-removed",
            payload: serde_json::json!({ "board_id": board_id, "user_id": user_id }),
            task_id: None,
            board_id: Some(board_id.to_string()),
            team_id: ctx.board.team_id.clone(),
        },
    );

    Ok(())
}
