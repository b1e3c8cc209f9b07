use crate::db::models::{
    ActivityAction, CreateTaskInput, NewActivity, NotificationType, Task, UpdateTaskInput,
};
use crate::db::repos::{columns, tasks};
use crate::engine::access::{self, AccessLevel, BoardCtx};
use crate::engine::dispatch::{dispatch, Fanout};
use crate::engine::{activity, recipients};
use crate::error::AppError;
use crate::validation::require_non_empty;
use crate::AppState;

pub fn get_task(state: &AppState, actor: &str, task_id: &str) -> Result<Task, AppError> {
    let (task, _, ctx) = super::task_ctx(&state.db, task_id)?;
    super::require_level(
        access::resolve_board(actor, &ctx),
        AccessLevel::Viewer,
        "viewing a task",
    )?;
    Ok(task)
}

pub fn list_tasks(state: &AppState, actor: &str, column_id: &str) -> Result<Vec<Task>, AppError> {
    let (_, ctx) = super::column_ctx(&state.db, column_id)?;
    super::require_level(
        access::resolve_board(actor, &ctx),
        AccessLevel::Viewer,
        "viewing tasks",
    )?;
    tasks::list_by_column(&state.db, column_id)
}

pub fn create_task(
    state: &AppState,
    actor: &str,
    column_id: &str,
    input: CreateTaskInput,
) -> Result<Task, AppError> {
    let (column, ctx) = super::column_ctx(&state.db, column_id)?;
    super::require_level(
        access::resolve_board(actor, &ctx),
        AccessLevel::Editor,
        "creating a task",
    )?;
    require_non_empty("title", &input.title)?;

    let task = tasks::create(&state.db, column_id, actor, input)?;
    tracing::debug!(task = %task.id, column = %column_id, "Task created");

    activity::record(&state.db, NewActivity {
        task_id: Some(task.id.clone()),
        board_id: Some(ctx.board.id.clone()),
        column_id: Some(column.id.clone()),
        ..NewActivity::new(actor, ActivityAction::TaskCreated)
    });
    dispatch(
        &state.dispatch_ctx(actor),
        &recipients::board_recipients(actor, &ctx),
        &task_fanout(NotificationType::TaskCreated, "task-created", &task, &ctx,
            format!("Task \"{}\" was created", task.title)),
    );

    Ok(task)
}

pub fn update_task(
    state: &AppState,
    actor: &str,
    task_id: &str,
    input: UpdateTaskInput,
) -> Result<Task, AppError> {
    let (_, _, ctx) = super::task_ctx(&state.db, task_id)?;
    super::require_level(
        access::resolve_board(actor, &ctx),
        AccessLevel::Editor,
        "updating a task",
    )?;
    if let Some(title) = &input.title {
        require_non_empty("title", title)?;
    }

    let task = tasks::update(&state.db, task_id, input)?;

    activity::record(&state.db, NewActivity {
        task_id: Some(task.id.clone()),
        board_id: Some(ctx.board.id.clone()),
        column_id: Some(task.column_id.clone()),
        ..NewActivity::new(actor, ActivityAction::TaskUpdated)
    });
    dispatch(
        &state.dispatch_ctx(actor),
        &recipients::board_recipients(actor, &ctx),
        &task_fanout(NotificationType::TaskUpdated, "task-updated", &task, &ctx,
            format!("Task \"{}\" was updated", task.title)),
    );

    Ok(task)
}

pub fn delete_task(state: &AppState, actor: &str, task_id: &str) -> Result<(), AppError> {
    let (task, _, ctx) = super::task_ctx(&state.db, task_id)?;
    super::require_level(
        access::resolve_board(actor, &ctx),
        AccessLevel::Editor,
        "deleting a task",
    )?;

    tasks::delete(&state.db, task_id)?;
    tracing::debug!(task = %task_id, "Task deleted");

    activity::record(&state.db, NewActivity {
        task_id: Some(task_id.to_string()),
        board_id: Some(ctx.board.id.clone()),
        column_id: Some(task.column_id.clone()),
        ..NewActivity::new(actor, ActivityAction::TaskDeleted)
    });
    dispatch(
        &state.dispatch_ctx(actor),
        &recipients::board_recipients(actor, &ctx),
        &Fanout {
            notif_type: NotificationType::TaskDeleted,
            message: format!("Task \"{}\" was deleted", task.title),
            event: "task-deleted",
            payload: serde_json::json!({ "id": task_id, "board_id": ctx.board.id }),
            task_id: Some(task_id.to_string()),
            board_id: Some(ctx.board.id.clone()),
            team_id: ctx.board.team_id.clone(),
        },
    );

    Ok(())
}

/// Move a task to another column on the same board. Column reference and
/// position change in one write.
pub fn move_task(
    state: &AppState,
    actor: &str,
    task_id: &str,
    destination_column_id: &str,
    position: Option<i64>,
) -> Result<Task, AppError> {
    let (task, source, ctx) = super::task_ctx(&state.db, task_id)?;
    super::require_level(
        access::resolve_board(actor, &ctx),
        AccessLevel::Editor,
        "moving a task",
    )?;
    let destination = columns::get_by_id(&state.db, destination_column_id)?;
    if destination.board_id != source.board_id {
        return Err(AppError::Validation(
            "destination column belongs to a different board".into(),
        ));
    }
    let position = match position {
        Some(p) => p,
        None => tasks::next_position(&state.db, destination_column_id)?,
    };

    tasks::relocate(&state.db, task_id, destination_column_id, position)?;
    let task = tasks::get_by_id(&state.db, task_id)?;

    activity::record(&state.db, NewActivity {
        task_id: Some(task.id.clone()),
        board_id: Some(ctx.board.id.clone()),
        column_id: Some(destination.id.clone()),
        metadata: Some(
            serde_json::json!({ "from": source.id, "to": destination.id, "position": position })
                .to_string(),
        ),
        ..NewActivity::new(actor, ActivityAction::TaskMoved)
    });
    dispatch(
        &state.dispatch_ctx(actor),
        &recipients::board_recipients(actor, &ctx),
        &task_fanout(NotificationType::TaskMoved, "task-moved", &task, &ctx,
            format!("Task \"{}\" moved to \"{}\"", task.title, destination.title)),
    );

    Ok(task)
}

/// Assignment is a team-level concern: on a team board both the caller and
/// the assignee must belong to the team. On a personal board the caller
/// needs `editor`+ and the assignee must be on the board.
pub fn assign_task(
    state: &AppState,
    actor: &str,
    task_id: &str,
    assignee: Option<&str>,
) -> Result<Task, AppError> {
    let (task, _, ctx) = super::task_ctx(&state.db, task_id)?;
    match &ctx.team {
        Some(team) => {
            if !team.is_member(actor) {
                return Err(AppError::Forbidden(
                    "assigning tasks requires membership of the board's team".into(),
                ));
            }
            if let Some(user) = assignee {
                if !team.is_member(user) {
                    return Err(AppError::InvalidState(format!(
                        "assignee {user} is not a member of the board's team"
                    )));
                }
            }
        }
        None => {
            super::require_level(
                access::resolve_board(actor, &ctx),
                AccessLevel::Editor,
                "assigning a task",
            )?;
            if let Some(user) = assignee {
                let on_board = user == ctx.board.created_by
                    || ctx.members.iter().any(|m| m.user_id == user);
                if !on_board {
                    return Err(AppError::InvalidState(format!(
                        "assignee {user} is not a member of this board"
                    )));
                }
            }
        }
    }

    tasks::set_assignee(&state.db, task_id, assignee)?;
    let task = tasks::get_by_id(&state.db, &task.id)?;

    activity::record(&state.db, NewActivity {
        task_id: Some(task.id.clone()),
        board_id: Some(ctx.board.id.clone()),
        target_user_id: assignee.map(Into::into),
        ..NewActivity::new(actor, ActivityAction::TaskAssigned)
    });

    // The assignee gets a personal message; everyone else the standard one.
    // Still at most one notification per user for the mutation.
    let mut recipient_set = recipients::board_recipients(actor, &ctx);
    if let Some(user) = assignee {
        recipient_set.remove(user);
    }
    dispatch(
        &state.dispatch_ctx(actor),
        &recipient_set,
        &task_fanout(NotificationType::TaskAssigned, "task-assigned", &task, &ctx,
            match assignee {
                Some(user) => format!("Task \"{}\" was assigned to {user}", task.title),
                None => format!("Task \"{}\" was unassigned", task.title),
            }),
    );
    if let Some(user) = assignee {
        if user != actor {
            let mut direct = std::collections::BTreeSet::new();
            direct.insert(user.to_string());
            dispatch(
                &state.dispatch_ctx(actor),
                &direct,
                &task_fanout(NotificationType::TaskAssigned, "task-assigned", &task, &ctx,
                    format!("{actor} assigned you task \"{}\"", task.title)),
            );
        }
    }

    Ok(task)
}

pub fn complete_task(state: &AppState, actor: &str, task_id: &str) -> Result<Task, AppError> {
    let (task, _, ctx) = super::task_ctx(&state.db, task_id)?;
    require_participant(actor, &ctx, "completing a task")?;
    if task.completed {
        return Err(AppError::InvalidState(format!(
            "task \"{}\" is already completed",
            task.title
        )));
    }

    tasks::set_completed(&state.db, task_id, actor)?;
    let task = tasks::get_by_id(&state.db, task_id)?;

    activity::record(&state.db, NewActivity {
        task_id: Some(task.id.clone()),
        board_id: Some(ctx.board.id.clone()),
        ..NewActivity::new(actor, ActivityAction::TaskCompleted)
    });
    dispatch(
        &state.dispatch_ctx(actor),
        &recipients::board_recipients(actor, &ctx),
        &task_fanout(NotificationType::TaskCompleted, "task-completed", &task, &ctx,
            format!("Task \"{}\" was completed", task.title)),
    );

    Ok(task)
}

pub fn reopen_task(state: &AppState, actor: &str, task_id: &str) -> Result<Task, AppError> {
    let (task, _, ctx) = super::task_ctx(&state.db, task_id)?;
    require_participant(actor, &ctx, "reopening a task")?;
    if !task.completed {
        return Err(AppError::InvalidState(format!(
            "task \"{}\" is already open",
            task.title
        )));
    }

    tasks::set_reopened(&state.db, task_id, actor)?;
    let task = tasks::get_by_id(&state.db, task_id)?;

    activity::record(&state.db, NewActivity {
        task_id: Some(task.id.clone()),
        board_id: Some(ctx.board.id.clone()),
        ..NewActivity::new(actor, ActivityAction::TaskReopened)
    });
    dispatch(
        &state.dispatch_ctx(actor),
        &recipients::board_recipients(actor, &ctx),
        &task_fanout(NotificationType::TaskReopened, "task-reopened", &task, &ctx,
            format!("Task \"{}\" was reopened", task.title)),
    );

    Ok(task)
}

/// Completion state is a collaboration signal: on team boards any team
/// member may flip it; personal boards fall back to `editor`+.
fn require_participant(actor: &str, ctx: &BoardCtx, action: &str) -> Result<(), AppError> {
    match &ctx.team {
        Some(team) => {
            if team.is_member(actor) {
                Ok(())
            } else {
                Err(AppError::Forbidden(format!(
                    "{action} requires membership of the board's team"
                )))
            }
        }
        None => super::require_level(access::resolve_board(actor, ctx), AccessLevel::Editor, action),
    }
}

fn task_fanout(
    notif_type: NotificationType,
    event: &'static str,
    task: &Task,
    ctx: &BoardCtx,
    message: String,
) -> Fanout {
    Fanout {
        notif_type,
        message,
        event,
        payload: serde_json::to_value(task).unwrap_or_default(),
        task_id: Some(task.id.clone()),
        board_id: Some(ctx.board.id.clone()),
        team_id: ctx.board.team_id.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{CreateBoardInput, CreateColumnInput, CreateTeamInput, Priority, TeamRole};
    use crate::ops::boards::create_board;
    use crate::ops::columns::create_column;
    use crate::ops::teams::{add_team_member, create_team};
    use crate::ops::testutil::test_state;

    fn make_task(state: &AppState, actor: &str, column_id: &str, title: &str) -> Task {
        create_task(
            state,
            actor,
            column_id,
            CreateTaskInput {
                title: title.into(),
                description: None,
                priority: None,
                due_date: None,
                labels: None,
            },
        )
        .unwrap()
    }

    fn personal_board(state: &AppState) -> (String, String, String) {
        let board = create_board(
            state,
            "alice",
            CreateBoardInput {
                name: "B".into(),
                description: None,
                team_id: None,
                visibility: None,
            },
        )
        .unwrap();
        let a = create_column(state, "alice", &board.id, CreateColumnInput { title: "Todo".into() })
            .unwrap();
        let b = create_column(state, "alice", &board.id, CreateColumnInput { title: "Done".into() })
            .unwrap();
        (board.id, a.id, b.id)
    }

    #[test]
    fn move_across_boards_is_rejected() {
        let (state, _bus) = test_state();
        let (_, col_a, col_b) = personal_board(&state);
        let other = create_board(
            &state,
            "alice",
            CreateBoardInput {
                name: "Other".into(),
                description: None,
                team_id: None,
                visibility: None,
            },
        )
        .unwrap();
        let foreign =
            create_column(&state, "alice", &other.id, CreateColumnInput { title: "X".into() })
                .unwrap();
        let task = make_task(&state, "alice", &col_a, "T");

        let err = move_task(&state, "alice", &task.id, &foreign.id, None).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        // Same-board move succeeds and appends at the destination tail
        let moved = move_task(&state, "alice", &task.id, &col_b, None).unwrap();
        assert_eq!(moved.column_id, col_b);
        assert_eq!(moved.position, 0);
    }

    #[test]
    fn complete_then_reopen_lifecycle() {
        let (state, _bus) = test_state();
        let (_, col_a, _) = personal_board(&state);
        let task = make_task(&state, "alice", &col_a, "Ship it");

        // Reopening an open task is an invalid transition
        let err = reopen_task(&state, "alice", &task.id).unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));

        let done = complete_task(&state, "alice", &task.id).unwrap();
        assert!(done.completed);
        assert!(done.completed_at.is_some());
        assert_eq!(done.completed_by.as_deref(), Some("alice"));

        let err = complete_task(&state, "alice", &task.id).unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));

        let reopened = reopen_task(&state, "alice", &task.id).unwrap();
        assert!(!reopened.completed);
        assert!(reopened.completed_at.is_none());
        assert!(reopened.reopened_at.is_some());
    }

    #[test]
    fn assignment_on_team_board_requires_team_membership() {
        let (state, _bus) = test_state();
        let team = create_team(&state, "owen", CreateTeamInput { name: "T".into() }).unwrap();
        add_team_member(&state, "owen", &team.id, "mia", TeamRole::Member).unwrap();
        let board = create_board(
            &state,
            "owen",
            CreateBoardInput {
                name: "TB".into(),
                description: None,
                team_id: Some(team.id.clone()),
                visibility: None,
            },
        )
        .unwrap();
        let col = create_column(&state, "owen", &board.id, CreateColumnInput { title: "C".into() })
            .unwrap();
        let task = make_task(&state, "owen", &col.id, "T");

        // Outsider cannot assign
        let err = assign_task(&state, "zara", &task.id, Some("mia")).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        // Assignee must belong to the team
        let err = assign_task(&state, "owen", &task.id, Some("zara")).unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));

        // Plain team members may assign
        let assigned = assign_task(&state, "mia", &task.id, Some("mia")).unwrap();
        assert_eq!(assigned.assigned_to.as_deref(), Some("mia"));

        // Unassign clears the field
        let cleared = assign_task(&state, "owen", &task.id, None).unwrap();
        assert!(cleared.assigned_to.is_none());
    }

    #[test]
    fn assignee_receives_a_single_personal_notification() {
        let (state, _bus) = test_state();
        let team = create_team(&state, "owen", CreateTeamInput { name: "T".into() }).unwrap();
        add_team_member(&state, "owen", &team.id, "mia", TeamRole::Member).unwrap();
        let board = create_board(
            &state,
            "owen",
            CreateBoardInput {
                name: "TB".into(),
                description: None,
                team_id: Some(team.id.clone()),
                visibility: None,
            },
        )
        .unwrap();
        let col = create_column(&state, "owen", &board.id, CreateColumnInput { title: "C".into() })
            .unwrap();
        let task = make_task(&state, "owen", &col.id, "T");

        let before = crate::db::repos::notifications::list_for_recipient(&state.db, "mia")
            .unwrap()
            .iter()
            .filter(|n| n.notif_type == "task_assigned")
            .count();
        assign_task(&state, "owen", &task.id, Some("mia")).unwrap();
        let rows = crate::db::repos::notifications::list_for_recipient(&state.db, "mia").unwrap();
        let assigned: Vec<_> = rows.iter().filter(|n| n.notif_type == "task_assigned").collect();
        assert_eq!(assigned.len(), before + 1);
        assert!(assigned[0].message.contains("assigned you"));
    }

    #[test]
    fn priority_defaults_and_updates() {
        let (state, _bus) = test_state();
        let (_, col_a, _) = personal_board(&state);
        let task = make_task(&state, "alice", &col_a, "T");
        assert_eq!(task.priority, Priority::Medium);

        let updated = update_task(
            &state,
            "alice",
            &task.id,
            UpdateTaskInput { priority: Some(Priority::High), ..Default::default() },
        )
        .unwrap();
        assert_eq!(updated.priority, Priority::High);
    }
}
