use rusqlite::{params, Row};

use crate::db::models::{Column, CreateColumnInput, UpdateColumnInput};
use crate::db::DbPool;
use crate::error::AppError;

fn row_to_column(row: &Row) -> rusqlite::Result<Column> {
    Ok(Column {
        id: row.get("id")?,
        board_id: row.get("board_id")?,
        title: row.get("title")?,
        position: row.get("position")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub fn get_by_id(pool: &DbPool, id: &str) -> Result<Column, AppError> {
    let conn = pool.get()?;
    conn.query_row(
        "SELECT * FROM board_columns WHERE id = ?1",
        params![id],
        row_to_column,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => AppError::NotFound(format!("Column {id}")),
        other => AppError::Database(other),
    })
}

pub fn list_by_board(pool: &DbPool, board_id: &str) -> Result<Vec<Column>, AppError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT * FROM board_columns WHERE board_id = ?1 ORDER BY position ASC, created_at ASC",
    )?;
    let rows = stmt.query_map(params![board_id], row_to_column)?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

/// Next free position on the board: max + 1, 0 for the first column.
pub fn next_position(pool: &DbPool, board_id: &str) -> Result<i64, AppError> {
    let conn = pool.get()?;
    let max: Option<i64> = conn.query_row(
        "SELECT MAX(position) FROM board_columns WHERE board_id = ?1",
        params![board_id],
        |row| row.get(0),
    )?;
    Ok(max.map_or(0, |m| m + 1))
}

pub fn create(pool: &DbPool, board_id: &str, input: CreateColumnInput) -> Result<Column, AppError> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    let position = next_position(pool, board_id)?;

    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO board_columns (id, board_id, title, position, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![id, board_id, input.title, position, now],
    )?;

    get_by_id(pool, &id)
}

pub fn update(pool: &DbPool, id: &str, input: UpdateColumnInput) -> Result<Column, AppError> {
    get_by_id(pool, id)?;

    let now = chrono::Utc::now().to_rfc3339();
    let conn = pool.get()?;

    let mut sets: Vec<String> = vec!["updated_at = ?1".into()];
    let mut param_idx = 2u32;

    push_field!(input.title, "title", sets, param_idx);
    push_field!(input.position, "position", sets, param_idx);

    let sql = format!(
        "UPDATE board_columns SET {} WHERE id = ?{}",
        sets.join(", "),
        param_idx
    );

    let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = vec![Box::new(now)];
    if let Some(ref v) = input.title {
        param_values.push(Box::new(v.clone()));
    }
    if let Some(v) = input.position {
        param_values.push(Box::new(v));
    }
    param_values.push(Box::new(id.to_string()));

    let params_ref: Vec<&dyn rusqlite::types::ToSql> =
        param_values.iter().map(|p| p.as_ref()).collect();
    conn.execute(&sql, params_ref.as_slice())?;

    get_by_id(pool, id)
}

pub fn delete(pool: &DbPool, id: &str) -> Result<bool, AppError> {
    let conn = pool.get()?;
    let rows = conn.execute("DELETE FROM board_columns WHERE id = ?1", params![id])?;
    Ok(rows > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::CreateBoardInput;
    use crate::db::repos::boards;
    use crate::db::init_test_db;

    #[test]
    fn test_column_positions() {
        let pool = init_test_db().unwrap();
        let board = boards::create(
            &pool,
            "user-a",
            CreateBoardInput {
                name: "B".into(),
                description: None,
                team_id: None,
                visibility: None,
            },
        )
        .unwrap();

        let c0 = create(&pool, &board.id, CreateColumnInput { title: "Todo".into() }).unwrap();
        let c1 = create(&pool, &board.id, CreateColumnInput { title: "Doing".into() }).unwrap();
        assert_eq!(c0.position, 0);
        assert_eq!(c1.position, 1);

        let listed = list_by_board(&pool, &board.id).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].title, "Todo");

        let moved = update(
            &pool,
            &c1.id,
            UpdateColumnInput { title: None, position: Some(0) },
        )
        .unwrap();
        assert_eq!(moved.position, 0);

        assert!(delete(&pool, &c0.id).unwrap());
        assert_eq!(list_by_board(&pool, &board.id).unwrap().len(), 1);
    }
}
