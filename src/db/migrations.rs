use rusqlite::Connection;

use crate::error::AppError;

/// Run the consolidated schema migration. Idempotent.
pub fn run(conn: &Connection) -> Result<(), AppError> {
    tracing::debug!("Running database migrations");

    conn.execute_batch(SCHEMA)?;

    tracing::info!("Database migrations complete");
    Ok(())
}

const SCHEMA: &str = r#"

-- ============================================================================
-- Teams (must precede boards due to FK)
-- ============================================================================

CREATE TABLE IF NOT EXISTS teams (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    owner_id    TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS team_members (
    id          TEXT PRIMARY KEY,
    team_id     TEXT NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
    user_id     TEXT NOT NULL,
    role        TEXT NOT NULL CHECK(role IN ('admin', 'member')),
    created_at  TEXT NOT NULL,
    UNIQUE(team_id, user_id)
);
CREATE INDEX IF NOT EXISTS idx_team_members_team ON team_members(team_id);
CREATE INDEX IF NOT EXISTS idx_team_members_user ON team_members(user_id);

-- ============================================================================
-- Boards
-- ============================================================================

CREATE TABLE IF NOT EXISTS boards (
    id          TEXT PRIMARY KEY,
    team_id     TEXT REFERENCES teams(id) ON DELETE SET NULL,
    name        TEXT NOT NULL,
    description TEXT,
    visibility  TEXT NOT NULL DEFAULT 'private'
                CHECK(visibility IN ('private', 'team', 'public')),
    created_by  TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_boards_team ON boards(team_id);

CREATE TABLE IF NOT EXISTS board_members (
    id          TEXT PRIMARY KEY,
    board_id    TEXT NOT NULL REFERENCES boards(id) ON DELETE CASCADE,
    user_id     TEXT NOT NULL,
    role        TEXT NOT NULL CHECK(role IN ('admin', 'editor', 'viewer')),
    created_at  TEXT NOT NULL,
    UNIQUE(board_id, user_id)
);
CREATE INDEX IF NOT EXISTS idx_board_members_board ON board_members(board_id);
CREATE INDEX IF NOT EXISTS idx_board_members_user  ON board_members(user_id);

-- ============================================================================
-- Columns
-- ============================================================================

CREATE TABLE IF NOT EXISTS board_columns (
    id          TEXT PRIMARY KEY,
    board_id    TEXT NOT NULL REFERENCES boards(id) ON DELETE CASCADE,
    title       TEXT NOT NULL,
    position    INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_columns_board ON board_columns(board_id);

-- ============================================================================
-- Tasks
-- ============================================================================

CREATE TABLE IF NOT EXISTS tasks (
    id           TEXT PRIMARY KEY,
    column_id    TEXT NOT NULL REFERENCES board_columns(id) ON DELETE CASCADE,
    title        TEXT NOT NULL,
    description  TEXT,
    position     INTEGER NOT NULL DEFAULT 0,
    priority     TEXT NOT NULL DEFAULT 'medium'
                 CHECK(priority IN ('low', 'medium', 'high')),
    due_date     TEXT,
    labels       TEXT NOT NULL DEFAULT '[]',
    assigned_to  TEXT,
    created_by   TEXT NOT NULL,
    completed    INTEGER NOT NULL DEFAULT 0,
    completed_at TEXT,
    completed_by TEXT,
    reopened_at  TEXT,
    reopened_by  TEXT,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_tasks_column   ON tasks(column_id);
CREATE INDEX IF NOT EXISTS idx_tasks_assigned ON tasks(assigned_to);

-- ============================================================================
-- Activity log (append-only)
-- ============================================================================

CREATE TABLE IF NOT EXISTS activities (
    id             TEXT PRIMARY KEY,
    user_id        TEXT NOT NULL,
    action         TEXT NOT NULL,
    task_id        TEXT,
    board_id       TEXT,
    column_id      TEXT,
    team_id        TEXT,
    target_user_id TEXT,
    metadata       TEXT,
    created_at     TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_activities_board ON activities(board_id);
CREATE INDEX IF NOT EXISTS idx_activities_team  ON activities(team_id);

-- ============================================================================
-- Notifications (durable trail behind the best-effort real-time push)
-- ============================================================================

CREATE TABLE IF NOT EXISTS notifications (
    id               TEXT PRIMARY KEY,
    recipient_id     TEXT NOT NULL,
    notif_type       TEXT NOT NULL,
    message          TEXT NOT NULL,
    read             INTEGER NOT NULL DEFAULT 0,
    related_task_id  TEXT,
    related_board_id TEXT,
    related_team_id  TEXT,
    initiator_id     TEXT NOT NULL,
    created_at       TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_notifications_recipient ON notifications(recipient_id, read);

"#;
