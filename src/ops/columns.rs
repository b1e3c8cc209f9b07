use crate::db::models::{
    ActivityAction, Column, CreateColumnInput, NewActivity, NotificationType, UpdateColumnInput,
};
use crate::db::repos::{columns, tasks};
use crate::engine::access::{self, AccessLevel};
use crate::engine::dispatch::{dispatch, Fanout};
use crate::engine::{activity, recipients};
use crate::error::AppError;
use crate::validation::require_non_empty;
use crate::AppState;

pub fn get_column(state: &AppState, actor: &str, column_id: &str) -> Result<Column, AppError> {
    let (column, ctx) = super::column_ctx(&state.db, column_id)?;
    super::require_level(
        access::resolve_board(actor, &ctx),
        AccessLevel::Viewer,
        "viewing a column",
    )?;
    Ok(column)
}

pub fn list_columns(state: &AppState, actor: &str, board_id: &str) -> Result<Vec<Column>, AppError> {
    let ctx = super::board_ctx(&state.db, board_id)?;
    super::require_level(
        access::resolve_board(actor, &ctx),
        AccessLevel::Viewer,
        "viewing board columns",
    )?;
    columns::list_by_board(&state.db, board_id)
}

pub fn create_column(
    state: &AppState,
    actor: &str,
    board_id: &str,
    input: CreateColumnInput,
) -> Result<Column, AppError> {
    let ctx = super::board_ctx(&state.db, board_id)?;
    super::require_level(
        access::resolve_board(actor, &ctx),
        AccessLevel::Editor,
        "creating a column",
    )?;
    require_non_empty("title", &input.title)?;

    let column = columns::create(&state.db, board_id, input)?;
    tracing::debug!(column = %column.id, board = %board_id, "Column created");

    activity::record(&state.db, NewActivity {
        board_id: Some(board_id.to_string()),
        column_id: Some(column.id.clone()),
        ..NewActivity::new(actor, ActivityAction::ColumnCreated)
    });
    dispatch(
        &state.dispatch_ctx(actor),
        &recipients::board_recipients(actor, &ctx),
        &Fanout {
            notif_type: NotificationType::ColumnCreated,
            message: format!("Column \"{}\" was added to \"{}\"", column.title, ctx.board.name),
            event: "column-created",
            payload: serde_json::to_value(&column).unwrap_or_default(),
            task_id: None,
            board_id: Some(board_id.to_string()),
            team_id: ctx.board.team_id.clone(),
        },
    );

    Ok(column)
}

pub fn update_column(
    state: &AppState,
    actor: &str,
    column_id: &str,
    input: UpdateColumnInput,
) -> Result<Column, AppError> {
    let (_, ctx) = super::column_ctx(&state.db, column_id)?;
    super::require_level(
        access::resolve_board(actor, &ctx),
        AccessLevel::Editor,
        "updating a column",
    )?;
    if let Some(title) = &input.title {
        require_non_empty("title", title)?;
    }

    let column = columns::update(&state.db, column_id, input)?;

    activity::record(&state.db, NewActivity {
        board_id: Some(ctx.board.id.clone()),
        column_id: Some(column.id.clone()),
        ..NewActivity::new(actor, ActivityAction::ColumnUpdated)
    });
    dispatch(
        &state.dispatch_ctx(actor),
        &recipients::board_recipients(actor, &ctx),
        &Fanout {
            notif_type: NotificationType::ColumnUpdated,
            message: format!("Column \"{}\" was updated", column.title),
            event: "column-updated",
            payload: serde_json::to_value(&column).unwrap_or_default(),
            task_id: None,
            board_id: Some(ctx.board.id.clone()),
            team_id: ctx.board.team_id.clone(),
        },
    );

    Ok(column)
}

/// Deleting a column that still has tasks requires a relocation target on
/// the same board. Tasks are moved first, then the column goes; a crash in
/// between leaves every task already safe at the destination.
pub fn delete_column(
    state: &AppState,
    actor: &str,
    column_id: &str,
    destination_column_id: Option<&str>,
) -> Result<(), AppError> {
    let (column, ctx) = super::column_ctx(&state.db, column_id)?;
    super::require_level(
        access::resolve_board(actor, &ctx),
        AccessLevel::Editor,
        "deleting a column",
    )?;

    let task_count = tasks::count_by_column(&state.db, column_id)?;
    let mut relocated = 0usize;
    if task_count > 0 {
        let destination = destination_column_id.ok_or_else(|| {
            AppError::InvalidState(format!(
                "column \"{}\" still contains {task_count} task(s); provide a destination column",
                column.title
            ))
        })?;
        if destination == column_id {
            return Err(AppError::Validation(
                "destination column must differ from the column being deleted".into(),
            ));
        }
        let dest = columns::get_by_id(&state.db, destination)?;
        if dest.board_id != column.board_id {
            return Err(AppError::Validation(
                "destination column belongs to a different board".into(),
            ));
        }
        relocated = tasks::relocate_all(&state.db, column_id, destination)?;
    }

    columns::delete(&state.db, column_id)?;
    tracing::debug!(column = %column_id, relocated, "Column deleted");

    activity::record(&state.db, NewActivity {
        board_id: Some(ctx.board.id.clone()),
        column_id: Some(column_id.to_string()),
        metadata: Some(
            serde_json::json!({
                "relocated": relocated,
                "destination": destination_column_id,
            })
            .to_string(),
        ),
        ..NewActivity::new(actor, ActivityAction::ColumnDeleted)
    });
    dispatch(
        &state.dispatch_ctx(actor),
        &recipients::board_recipients(actor, &ctx),
        &Fanout {
            notif_type: NotificationType::ColumnDeleted,
            message: format!("Column \"{}\" was deleted", column.title),
            event: "column-deleted",
            payload: serde_json::json!({ "id": column_id, "board_id": ctx.board.id }),
            task_id: None,
            board_id: Some(ctx.board.id.clone()),
            team_id: ctx.board.team_id.clone(),
        },
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{CreateBoardInput, CreateTaskInput};
    use crate::db::repos;
    use crate::ops::boards::create_board;
    use crate::ops::tasks::create_task;
    use crate::ops::testutil::test_state;

    fn board_with_columns(state: &AppState) -> (String, Column, Column) {
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
        (board.id, a, b)
    }

    #[test]
    fn delete_with_tasks_and_no_destination_is_rejected_and_harmless() {
        let (state, _bus) = test_state();
        let (_, col_a, _) = board_with_columns(&state);
        let task = create_task(
            &state,
            "alice",
            &col_a.id,
            CreateTaskInput {
                title: "T".into(),
                description: None,
                priority: None,
                due_date: None,
                labels: None,
            },
        )
        .unwrap();

        let err = delete_column(&state, "alice", &col_a.id, None).unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));

        // Column and its task are untouched
        assert!(repos::columns::get_by_id(&state.db, &col_a.id).is_ok());
        let t = repos::tasks::get_by_id(&state.db, &task.id).unwrap();
        assert_eq!(t.column_id, col_a.id);
    }

    #[test]
    fn delete_with_destination_relocates_then_removes() {
        let (state, _bus) = test_state();
        let (_, col_a, col_b) = board_with_columns(&state);
        for title in ["T1", "T2"] {
            create_task(
                &state,
                "alice",
                &col_a.id,
                CreateTaskInput {
                    title: title.into(),
                    description: None,
                    priority: None,
                    due_date: None,
                    labels: None,
                },
            )
            .unwrap();
        }

        delete_column(&state, "alice", &col_a.id, Some(&col_b.id)).unwrap();

        assert!(matches!(
            repos::columns::get_by_id(&state.db, &col_a.id),
            Err(AppError::NotFound(_))
        ));
        assert_eq!(repos::tasks::count_by_column(&state.db, &col_b.id).unwrap(), 2);
    }

    #[test]
    fn destination_on_another_board_fails_validation() {
        let (state, _bus) = test_state();
        let (_, col_a, _) = board_with_columns(&state);
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
        create_task(
            &state,
            "alice",
            &col_a.id,
            CreateTaskInput {
                title: "T".into(),
                description: None,
                priority: None,
                due_date: None,
                labels: None,
            },
        )
        .unwrap();

        let err = delete_column(&state, "alice", &col_a.id, Some(&foreign.id)).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn empty_column_deletes_without_destination() {
        let (state, _bus) = test_state();
        let (_, col_a, _) = board_with_columns(&state);
        delete_column(&state, "alice", &col_a.id, None).unwrap();
        assert!(repos::columns::get_by_id(&state.db, &col_a.id).is_err());
    }
}
