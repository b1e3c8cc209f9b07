use rusqlite::{params, Row};

use crate::db::models::{CreateTaskInput, Priority, Task, UpdateTaskInput};
use crate::db::DbPool;
use crate::error::AppError;

fn row_to_task(row: &Row) -> rusqlite::Result<Task> {
    let labels: String = row.get("labels")?;
    Ok(Task {
        id: row.get("id")?,
        column_id: row.get("column_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        position: row.get("position")?,
        priority: row.get("priority")?,
        due_date: row.get("due_date")?,
        // Tolerate malformed or legacy label payloads as an empty set
        labels: serde_json::from_str(&labels).unwrap_or_default(),
        assigned_to: row.get("assigned_to")?,
        created_by: row.get("created_by")?,
        completed: row.get::<_, i32>("completed")? != 0,
        completed_at: row.get("completed_at")?,
        completed_by: row.get("completed_by")?,
        reopened_at: row.get("reopened_at")?,
        reopened_by: row.get("reopened_by")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub fn get_by_id(pool: &DbPool, id: &str) -> Result<Task, AppError> {
    let conn = pool.get()?;
    conn.query_row("SELECT * FROM tasks WHERE id = ?1", params![id], row_to_task)
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => AppError::NotFound(format!("Task {id}")),
            other => AppError::Database(other),
        })
}

pub fn list_by_column(pool: &DbPool, column_id: &str) -> Result<Vec<Task>, AppError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT * FROM tasks WHERE column_id = ?1 ORDER BY position ASC, created_at ASC",
    )?;
    let rows = stmt.query_map(params![column_id], row_to_task)?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

pub fn count_by_column(pool: &DbPool, column_id: &str) -> Result<i64, AppError> {
    let conn = pool.get()?;
    let count = conn.query_row(
        "SELECT COUNT(*) FROM tasks WHERE column_id = ?1",
        params![column_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Next free position in the column: max + 1, 0 for the first task.
pub fn next_position(pool: &DbPool, column_id: &str) -> Result<i64, AppError> {
    let conn = pool.get()?;
    let max: Option<i64> = conn.query_row(
        "SELECT MAX(position) FROM tasks WHERE column_id = ?1",
        params![column_id],
        |row| row.get(0),
    )?;
    Ok(max.map_or(0, |m| m + 1))
}

pub fn create(
    pool: &DbPool,
    column_id: &str,
    created_by: &str,
    input: CreateTaskInput,
) -> Result<Task, AppError> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    let priority = input.priority.unwrap_or(Priority::Medium);
    let labels = serde_json::to_string(&input.labels.unwrap_or_default())?;
    let position = next_position(pool, column_id)?;

    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO tasks (id, column_id, title, description, position, priority, due_date, labels, created_by, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
        params![
            id,
            column_id,
            input.title,
            input.description,
            position,
            priority,
            input.due_date,
            labels,
            created_by,
            now
        ],
    )?;

    get_by_id(pool, &id)
}

pub fn update(pool: &DbPool, id: &str, input: UpdateTaskInput) -> Result<Task, AppError> {
    get_by_id(pool, id)?;

    let now = chrono::Utc::now().to_rfc3339();
    let labels_json = match input.labels {
        Some(ref labels) => Some(serde_json::to_string(labels)?),
        None => None,
    };
    let conn = pool.get()?;

    let mut sets: Vec<String> = vec!["updated_at = ?1".into()];
    let mut param_idx = 2u32;

    push_field!(input.title, "title", sets, param_idx);
    push_field!(input.description, "description", sets, param_idx);
    push_field!(input.priority, "priority", sets, param_idx);
    push_field!(input.due_date, "due_date", sets, param_idx);
    push_field!(labels_json, "labels", sets, param_idx);

    let sql = format!("UPDATE tasks SET {} WHERE id = ?{}", sets.join(", "), param_idx);

    let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = vec![Box::new(now)];
    if let Some(ref v) = input.title {
        param_values.push(Box::new(v.clone()));
    }
    if let Some(ref v) = input.description {
        param_values.push(Box::new(v.clone()));
    }
    if let Some(v) = input.priority {
        param_values.push(Box::new(v));
    }
    if let Some(ref v) = input.due_date {
        param_values.push(Box::new(v.clone()));
    }
    if let Some(v) = labels_json {
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
    let rows = conn.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
    Ok(rows > 0)
}

/// Column reference and position change in one statement, so a reader never
/// observes a task halfway between columns.
pub fn relocate(pool: &DbPool, id: &str, column_id: &str, position: i64) -> Result<(), AppError> {
    let now = chrono::Utc::now().to_rfc3339();
    let conn = pool.get()?;
    conn.execute(
        "UPDATE tasks SET column_id = ?1, position = ?2, updated_at = ?3 WHERE id = ?4",
        params![column_id, position, now, id],
    )?;
    Ok(())
}

/// Bulk-move every task of a column to a destination, appending after the
/// destination's current tail.
pub fn relocate_all(pool: &DbPool, from_column: &str, to_column: &str) -> Result<usize, AppError> {
    let base = next_position(pool, to_column)?;
    let now = chrono::Utc::now().to_rfc3339();
    let conn = pool.get()?;
    let moved = conn.execute(
        "UPDATE tasks SET column_id = ?1, position = ?2 + position, updated_at = ?3
         WHERE column_id = ?4",
        params![to_column, base, now, from_column],
    )?;
    Ok(moved)
}

pub fn set_assignee(pool: &DbPool, id: &str, assignee: Option<&str>) -> Result<(), AppError> {
    let now = chrono::Utc::now().to_rfc3339();
    let conn = pool.get()?;
    conn.execute(
        "UPDATE tasks SET assigned_to = ?1, updated_at = ?2 WHERE id = ?3",
        params![assignee, now, id],
    )?;
    Ok(())
}

pub fn set_completed(pool: &DbPool, id: &str, user_id: &str) -> Result<(), AppError> {
    let now = chrono::Utc::now().to_rfc3339();
    let conn = pool.get()?;
    conn.execute(
        "UPDATE tasks SET completed = 1, completed_at = ?1, completed_by = ?2, updated_at = ?1
         WHERE id = ?3",
        params![now, user_id, id],
    )?;
    Ok(())
}

pub fn set_reopened(pool: &DbPool, id: &str, user_id: &str) -> Result<(), AppError> {
    let now = chrono::Utc::now().to_rfc3339();
    let conn = pool.get()?;
    conn.execute(
        "UPDATE tasks SET completed = 0, completed_at = NULL, completed_by = NULL,
                          reopened_at = ?1, reopened_by = ?2, updated_at = ?1
         WHERE id = ?3",
        params![now, user_id, id],
    )?;
    Ok(())
}
