use rusqlite::{params, Row};

use crate::db::models::{
    Board, BoardMember, BoardRole, CreateBoardInput, UpdateBoardInput, Visibility,
};
use crate::db::DbPool;
use crate::error::AppError;

// ============================================================================
// Row mappers
// ============================================================================

fn row_to_board(row: &Row) -> rusqlite::Result<Board> {
    Ok(Board {
        id: row.get("id")?,
        team_id: row.get("team_id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        visibility: row.get("visibility")?,
        created_by: row.get("created_by")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn row_to_member(row: &Row) -> rusqlite::Result<BoardMember> {
    Ok(BoardMember {
        id: row.get("id")?,
        board_id: row.get("board_id")?,
        user_id: row.get("user_id")?,
        role: row.get("role")?,
        created_at: row.get("created_at")?,
    })
}

// ============================================================================
// Board CRUD
// ============================================================================

pub fn get_by_id(pool: &DbPool, id: &str) -> Result<Board, AppError> {
    let conn = pool.get()?;
    conn.query_row("SELECT * FROM boards WHERE id = ?1", params![id], row_to_board)
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => AppError::NotFound(format!("Board {id}")),
            other => AppError::Database(other),
        })
}

pub fn list_by_team(pool: &DbPool, team_id: &str) -> Result<Vec<Board>, AppError> {
    let conn = pool.get()?;
    let mut stmt =
        conn.prepare("SELECT * FROM boards WHERE team_id = ?1 ORDER BY updated_at DESC")?;
    let rows = stmt.query_map(params![team_id], row_to_board)?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

pub fn create(pool: &DbPool, created_by: &str, input: CreateBoardInput) -> Result<Board, AppError> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    let visibility = input.visibility.unwrap_or(Visibility::Private);

    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO boards (id, team_id, name, description, visibility, created_by, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        params![id, input.team_id, input.name, input.description, visibility, created_by, now],
    )?;

    get_by_id(pool, &id)
}

pub fn update(pool: &DbPool, id: &str, input: UpdateBoardInput) -> Result<Board, AppError> {
    get_by_id(pool, id)?;

    let now = chrono::Utc::now().to_rfc3339();
    let conn = pool.get()?;

    let mut sets: Vec<String> = vec!["updated_at = ?1".into()];
    let mut param_idx = 2u32;

    push_field!(input.name, "name", sets, param_idx);
    push_field!(input.description, "description", sets, param_idx);
    push_field!(input.visibility, "visibility", sets, param_idx);

    let sql = format!("UPDATE boards SET {} WHERE id = ?{}", sets.join(", "), param_idx);

    let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = vec![Box::new(now)];
    if let Some(ref v) = input.name {
        param_values.push(Box::new(v.clone()));
    }
    if let Some(ref v) = input.description {
        param_values.push(Box::new(v.clone()));
    }
    if let Some(v) = input.visibility {
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
    let rows = conn.execute("DELETE FROM boards WHERE id = ?1", params![id])?;
    Ok(rows > 0)
}

// ============================================================================
// Members
// ============================================================================

pub fn get_members(pool: &DbPool, board_id: &str) -> Result<Vec<BoardMember>, AppError> {
    let conn = pool.get()?;
    let mut stmt =
        conn.prepare("SELECT * FROM board_members WHERE board_id = ?1 ORDER BY created_at ASC")?;
    let rows = stmt.query_map(params![board_id], row_to_member)?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

pub fn find_member(
    pool: &DbPool,
    board_id: &str,
    user_id: &str,
) -> Result<Option<BoardMember>, AppError> {
    let conn = pool.get()?;
    match conn.query_row(
        "SELECT * FROM board_members WHERE board_id = ?1 AND user_id = ?2",
        params![board_id, user_id],
        row_to_member,
    ) {
        Ok(m) => Ok(Some(m)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(AppError::Database(e)),
    }
}

pub fn add_member(
    pool: &DbPool,
    board_id: &str,
    user_id: &str,
    role: BoardRole,
) -> Result<BoardMember, AppError> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO board_members (id, board_id, user_id, role, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, board_id, user_id, role, now],
    )?;

    Ok(BoardMember {
        id,
        board_id: board_id.to_string(),
        user_id: user_id.to_string(),
        role,
        created_at: now,
    })
}

pub fn update_member_role(
    pool: &DbPool,
    board_id: &str,
    user_id: &str,
    role: BoardRole,
) -> Result<(), AppError> {
    let conn = pool.get()?;
    conn.execute(
        "UPDATE board_members SET role = ?1 WHERE board_id = ?2 AND user_id = ?3",
        params![role, board_id, user_id],
    )?;
    Ok(())
}

pub fn remove_member(pool: &DbPool, board_id: &str, user_id: &str) -> Result<bool, AppError> {
    let conn = pool.get()?;
    let rows = conn.execute(
        "DELETE FROM board_members WHERE board_id = ?1 AND user_id = ?2",
        params![board_id, user_id],
    )?;
    Ok(rows > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_test_db;

    #[test]
    fn test_board_crud() {
        let pool = init_test_db().unwrap();

        let board = create(
            &pool,
            "user-a",
            CreateBoardInput {
                name: "Sprint 12".into(),
                description: Some("Two-week sprint".into()),
                team_id: None,
                visibility: None,
            },
        )
        .unwrap();
        assert_eq!(board.visibility, Visibility::Private);
        assert_eq!(board.created_by, "user-a");

        let updated = update(
            &pool,
            &board.id,
            UpdateBoardInput {
                name: Some("Sprint 13".into()),
                description: None,
                visibility: Some(Visibility::Public),
            },
        )
        .unwrap();
        assert_eq!(updated.name, "Sprint 13");
        assert_eq!(updated.visibility, Visibility::Public);
        // created_by is immutable
        assert_eq!(updated.created_by, "user-a");

        add_member(&pool, &board.id, "user-c", BoardRole::Viewer).unwrap();
        update_member_role(&pool, &board.id, "user-c", BoardRole::Editor).unwrap();
        let m = find_member(&pool, &board.id, "user-c").unwrap().unwrap();
        assert_eq!(m.role, BoardRole::Editor);

        assert!(delete(&pool, &board.id).unwrap());
        assert!(get_by_id(&pool, &board.id).is_err());
        assert!(get_members(&pool, &board.id).unwrap().is_empty());
    }
}
