//! The mutation pipeline. Every operation follows the same shape:
//! load → authorize → validate → apply → audit → notify/broadcast → respond.
//! Authorization completes before any write; audit and fan-out are
//! best-effort and never change the caller-visible result.

pub mod boards;
pub mod columns;
pub mod notifications;
pub mod tasks;
pub mod teams;

use crate::db::models::{Column, Task};
use crate::db::repos;
use crate::db::DbPool;
use crate::engine::access::{AccessLevel, BoardCtx, TeamCtx};
use crate::error::AppError;

/// Load a team with its member list. Missing team → `NotFound`.
pub(crate) fn team_ctx(pool: &DbPool, team_id: &str) -> Result<TeamCtx, AppError> {
    let team = repos::teams::get_by_id(pool, team_id)?;
    let members = repos::teams::get_members(pool, team_id)?;
    Ok(TeamCtx { team, members })
}

/// Load a board with its member list and owning-team snapshot. A dangling
/// team reference is a broken ownership chain → `NotFound`.
pub(crate) fn board_ctx(pool: &DbPool, board_id: &str) -> Result<BoardCtx, AppError> {
    let board = repos::boards::get_by_id(pool, board_id)?;
    let members = repos::boards::get_members(pool, board_id)?;
    let team = match &board.team_id {
        Some(team_id) => Some(team_ctx(pool, team_id)?),
        None => None,
    };
    Ok(BoardCtx { board, members, team })
}

/// Columns resolve through their board.
pub(crate) fn column_ctx(pool: &DbPool, column_id: &str) -> Result<(Column, BoardCtx), AppError> {
    let column = repos::columns::get_by_id(pool, column_id)?;
    let ctx = board_ctx(pool, &column.board_id)?;
    Ok((column, ctx))
}

/// Tasks resolve through column → board.
pub(crate) fn task_ctx(pool: &DbPool, task_id: &str) -> Result<(Task, Column, BoardCtx), AppError> {
    let task = repos::tasks::get_by_id(pool, task_id)?;
    let (column, ctx) = column_ctx(pool, &task.column_id)?;
    Ok((task, column, ctx))
}

/// The strict precondition gate: nothing past this line runs on denial.
pub(crate) fn require_level(
    level: AccessLevel,
    min: AccessLevel,
    action: &str,
) -> Result<(), AppError> {
    if level >= min {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "{action} requires {} access (caller has {})",
            min.as_str(),
            level.as_str()
        )))
    }
}
