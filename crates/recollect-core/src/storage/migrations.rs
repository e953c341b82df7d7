//! Database Migrations
//!
//! Schema migration definitions for the SQLite review store.

/// Migration definitions
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Initial schema: cards and versioned SM-2 review states",
        up: MIGRATION_V1_UP,
    },
    Migration {
        version: 2,
        description: "Answer history: lapses, last grade, last review time",
        up: MIGRATION_V2_UP,
    },
];

/// A database migration
#[derive(Debug, Clone)]
pub struct Migration {
    /// Version number
    pub version: u32,
    /// Description
    pub description: &'static str,
    /// SQL to apply
    pub up: &'static str,
}

/// V1: Initial schema
const MIGRATION_V1_UP: &str = r#"
CREATE TABLE IF NOT EXISTS cards (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL,
    deck_id TEXT NOT NULL,
    front TEXT NOT NULL,
    back TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_cards_owner_deck ON cards(owner_id, deck_id);

-- One SM-2 state per (owner, card). Timestamps are fixed-width RFC 3339
-- (microseconds, 'Z'), so text order is time order.
CREATE TABLE IF NOT EXISTS review_states (
    owner_id TEXT NOT NULL,
    card_id TEXT NOT NULL REFERENCES cards(id) ON DELETE CASCADE,

    reps INTEGER NOT NULL DEFAULT 0,
    interval_days INTEGER NOT NULL DEFAULT 0,
    ease REAL NOT NULL DEFAULT 2.5,
    due TEXT NOT NULL,

    -- Compare-and-swap token, bumped on every write
    version INTEGER NOT NULL DEFAULT 1,

    PRIMARY KEY (owner_id, card_id)
);

CREATE INDEX IF NOT EXISTS idx_review_states_owner_due ON review_states(owner_id, due, card_id);

CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);

INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, datetime('now'));
"#;

/// V2: Answer history carried over from the review log of the web service
const MIGRATION_V2_UP: &str = r#"
ALTER TABLE review_states ADD COLUMN lapses INTEGER NOT NULL DEFAULT 0;
ALTER TABLE review_states ADD COLUMN last_quality INTEGER;
ALTER TABLE review_states ADD COLUMN last_reviewed_at TEXT;

CREATE INDEX IF NOT EXISTS idx_review_states_last_reviewed ON review_states(owner_id, last_reviewed_at);

UPDATE schema_version SET version = 2, applied_at = datetime('now');
"#;

/// Get current schema version from database
pub fn get_current_version(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .or(Ok(0))
}

/// Apply pending migrations
pub fn apply_migrations(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    let current_version = get_current_version(conn)?;
    let mut applied = 0;

    for migration in MIGRATIONS {
        if migration.version > current_version {
            tracing::info!(
                "Applying migration v{}: {}",
                migration.version,
                migration.description
            );

            conn.execute_batch(migration.up)?;
            applied += 1;
        }
    }

    Ok(applied)
}
