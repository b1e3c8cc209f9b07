use rusqlite::{params, Row};

use crate::db::models::{CreateTeamInput, Team, TeamMember, TeamRole, UpdateTeamInput};
use crate::db::DbPool;
use crate::error::AppError;

// ============================================================================
// Row mappers
// ============================================================================

fn row_to_team(row: &Row) -> rusqlite::Result<Team> {
    Ok(Team {
        id: row.get("id")?,
        name: row.get("name")?,
        owner_id: row.get("owner_id")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn row_to_member(row: &Row) -> rusqlite::Result<TeamMember> {
    Ok(TeamMember {
        id: row.get("id")?,
        team_id: row.get("team_id")?,
        user_id: row.get("user_id")?,
        role: row.get("role")?,
        created_at: row.get("created_at")?,
    })
}

// ============================================================================
// Team CRUD
// ============================================================================

pub fn get_by_id(pool: &DbPool, id: &str) -> Result<Team, AppError> {
    let conn = pool.get()?;
    conn.query_row("SELECT * FROM teams WHERE id = ?1", params![id], row_to_team)
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => AppError::NotFound(format!("Team {id}")),
            other => AppError::Database(other),
        })
}

/// Creates the team and its owner's admin member row. Two single-row writes;
/// the member insert follows the team insert so a crash in between leaves a
/// team whose owner is still implicitly admin.
pub fn create(pool: &DbPool, owner_id: &str, input: CreateTeamInput) -> Result<Team, AppError> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO teams (id, name, owner_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?4)",
        params![id, input.name, owner_id, now],
    )?;
    conn.execute(
        "INSERT INTO team_members (id, team_id, user_id, role, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            uuid::Uuid::new_v4().to_string(),
            id,
            owner_id,
            TeamRole::Admin,
            now
        ],
    )?;

    get_by_id(pool, &id)
}

pub fn update(pool: &DbPool, id: &str, input: UpdateTeamInput) -> Result<Team, AppError> {
    get_by_id(pool, id)?;

    let now = chrono::Utc::now().to_rfc3339();
    let conn = pool.get()?;

    let mut sets: Vec<String> = vec!["updated_at = ?1".into()];
    let mut param_idx = 2u32;

    push_field!(input.name, "name", sets, param_idx);

    let sql = format!("UPDATE teams SET {} WHERE id = ?{}", sets.join(", "), param_idx);

    let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = vec![Box::new(now)];
    if let Some(ref v) = input.name {
        param_values.push(Box::new(v.clone()));
    }
    param_values.push(Box::new(id.to_string()));

    let params_ref: Vec<&dyn rusqlite::types::ToSql> =
        param_values.iter().map(|p| p.as_ref()).collect();
    conn.execute(&sql, params_ref.as_slice())?;

    get_by_id(pool, id)
}

pub fn delete(pool: &DbPool, id: &str) -> Result<bool, AppError> {
    let conn = pool.get()?;
    let rows = conn.execute("DELETE FROM teams WHERE id = ?1", params![id])?;
    Ok(rows > 0)
}

pub fn set_owner(pool: &DbPool, id: &str, owner_id: &str) -> Result<(), AppError> {
    let now = chrono::Utc::now().to_rfc3339();
    let conn = pool.get()?;
    conn.execute(
        "UPDATE teams SET owner_id = ?1, updated_at = ?2 WHERE id = ?3",
        params![owner_id, now, id],
    )?;
    Ok(())
}

// ============================================================================
// Members
// ============================================================================

pub fn get_members(pool: &DbPool, team_id: &str) -> Result<Vec<TeamMember>, AppError> {
    let conn = pool.get()?;
    let mut stmt =
        conn.prepare("SELECT * FROM team_members WHERE team_id = ?1 ORDER BY created_at ASC")?;
    let rows = stmt.query_map(params![team_id], row_to_member)?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

pub fn find_member(
    pool: &DbPool,
    team_id: &str,
    user_id: &str,
) -> Result<Option<TeamMember>, AppError> {
    let conn = pool.get()?;
    match conn.query_row(
        "SELECT * FROM team_members WHERE team_id = ?1 AND user_id = ?2",
        params![team_id, user_id],
        row_to_member,
    ) {
        Ok(m) => Ok(Some(m)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(AppError::Database(e)),
    }
}

pub fn add_member(
    pool: &DbPool,
    team_id: &str,
    user_id: &str,
    role: TeamRole,
) -> Result<TeamMember, AppError> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO team_members (id, team_id, user_id, role, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, team_id, user_id, role, now],
    )?;

    Ok(TeamMember {
        id,
        team_id: team_id.to_string(),
        user_id: user_id.to_string(),
        role,
        created_at: now,
    })
}

pub fn update_member_role(
    pool: &DbPool,
    team_id: &str,
    user_id: &str,
    role: TeamRole,
) -> Result<(), AppError> {
    let conn = pool.get()?;
    conn.execute(
        "UPDATE team_members SET role = ?1 WHERE team_id = ?2 AND user_id = ?3",
        params![role, team_id, user_id],
    )?;
    Ok(())
}

pub fn remove_member(pool: &DbPool, team_id: &str, user_id: &str) -> Result<bool, AppError> {
    let conn = pool.get()?;
    let rows = conn.execute(
        "DELETE FROM team_members WHERE team_id = ?1 AND user_id = ?2",
        params![team_id, user_id],
    )?;
    Ok(rows > 0)
}
