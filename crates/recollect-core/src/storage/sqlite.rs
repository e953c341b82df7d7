//! SQLite Storage Implementation
//!
//! Review states and the card slice they hang off, in one WAL-mode database.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use directories::ProjectDirs;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};

use super::{Result, ReviewStore, StoreError};
use crate::config::DATABASE_FILE;
use crate::review::{
    CardId, CardRecord, DeckId, DueItem, DueQuery, OwnerId, ResetCounts, ResetDefaults,
    ReviewState,
};
use crate::sm2::{DEFAULT_EASE, Quality, latest_due};

const STATE_COLUMNS: &str =
    "reps, interval_days, ease, due, version, lapses, last_quality, last_reviewed_at";

// ============================================================================
// STORAGE
// ============================================================================

/// SQLite-backed review store
///
/// Uses separate reader/writer connections for interior mutability.
/// All methods take `&self`, so one `Arc<SqliteStore>` can be shared by
/// every request handler.
pub struct SqliteStore {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
    path: PathBuf,
}

impl SqliteStore {
    /// Apply PRAGMAs to a connection
    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA temp_store = MEMORY;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;

        Ok(())
    }

    /// Open (or create) a store. `None` uses the platform data directory.
    pub fn new(db_path: Option<PathBuf>) -> Result<Self> {
        let path = match db_path {
            Some(p) => p,
            None => {
                let proj_dirs = ProjectDirs::from("com", "recollect", "core").ok_or_else(|| {
                    StoreError::Init("Could not determine project directories".to_string())
                })?;

                let data_dir = proj_dirs.data_dir();
                std::fs::create_dir_all(data_dir)?;
                // Restrict directory permissions to owner-only on Unix
                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    let perms = std::fs::Permissions::from_mode(0o700);
                    let _ = std::fs::set_permissions(data_dir, perms);
                }
                data_dir.join(DATABASE_FILE)
            }
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let writer_conn = Connection::open(&path)?;
        Self::configure_connection(&writer_conn)?;

        // Apply migrations on writer only
        let applied = super::migrations::apply_migrations(&writer_conn)?;
        if applied > 0 {
            tracing::info!(applied, path = %path.display(), "Review store schema migrated");
        }

        let reader_conn = Connection::open(&path)?;
        Self::configure_connection(&reader_conn)?;

        Ok(Self {
            writer: Mutex::new(writer_conn),
            reader: Mutex::new(reader_conn),
            path,
        })
    }

    /// Database file location
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn writer(&self) -> Result<MutexGuard<'_, Connection>> {
        self.writer
            .lock()
            .map_err(|_| StoreError::Init("Writer lock poisoned".into()))
    }

    fn reader(&self) -> Result<MutexGuard<'_, Connection>> {
        self.reader
            .lock()
            .map_err(|_| StoreError::Init("Reader lock poisoned".into()))
    }

    // ========================================================================
    // CARDS
    // ========================================================================

    /// Register or replace a card
    pub fn upsert_card(&self, card: &CardRecord) -> Result<()> {
        let now = format_timestamp(Utc::now());
        let writer = self.writer()?;
        writer.execute(
            "INSERT INTO cards (id, owner_id, deck_id, front, back, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
             ON CONFLICT(id) DO UPDATE SET
                owner_id = excluded.owner_id,
                deck_id = excluded.deck_id,
                front = excluded.front,
                back = excluded.back,
                updated_at = excluded.updated_at",
            params![
                card.id.as_str(),
                card.owner.as_str(),
                card.deck_id.as_str(),
                card.front,
                card.back,
                now,
            ],
        )?;
        Ok(())
    }

    /// Delete a card; its review states go with it (ON DELETE CASCADE)
    pub fn remove_card(&self, card: &CardId) -> Result<bool> {
        let writer = self.writer()?;
        let rows = writer.execute("DELETE FROM cards WHERE id = ?1", params![card.as_str()])?;
        Ok(rows > 0)
    }

    /// Number of stored states, across all owners
    pub fn state_count(&self) -> Result<u64> {
        let reader = self.reader()?;
        let count: i64 =
            reader.query_row("SELECT COUNT(*) FROM review_states", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ========================================================================
    // ROW MAPPING
    // ========================================================================

    /// Parse RFC3339 timestamp
    fn parse_timestamp(value: &str, field: &'static str) -> rusqlite::Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|reason| {
                rusqlite::Error::FromSqlConversionFailure(
                    0,
                    rusqlite::types::Type::Text,
                    Box::new(BadTimestamp {
                        field,
                        value: value.to_string(),
                        reason,
                    }),
                )
            })
    }

    /// Convert a row selected with `STATE_COLUMNS` to a ReviewState
    fn row_to_state(row: &rusqlite::Row) -> rusqlite::Result<ReviewState> {
        let due: String = row.get("due")?;
        let last_reviewed_at: Option<String> = row.get("last_reviewed_at")?;
        let last_quality: Option<i64> = row.get("last_quality")?;
        let version: i64 = row.get("version")?;

        Ok(ReviewState {
            reps: row.get("reps")?,
            interval: row.get("interval_days")?,
            ease: row.get("ease")?,
            due: Self::parse_timestamp(&due, "due")?,
            lapses: row.get("lapses")?,
            last_quality: last_quality.map(Quality::new),
            last_reviewed_at: last_reviewed_at
                .map(|s| Self::parse_timestamp(&s, "last_reviewed_at"))
                .transpose()?,
            version: version.max(0) as u64,
        })
    }

    fn row_to_due_item(row: &rusqlite::Row) -> rusqlite::Result<DueItem> {
        let due: String = row.get("due")?;
        Ok(DueItem {
            card_id: CardId::new(row.get::<_, String>("card_id")?),
            deck_id: DeckId::new(row.get::<_, String>("deck_id")?),
            front: row.get("front")?,
            reps: row.get("reps")?,
            interval: row.get("interval_days")?,
            ease: row.get("ease")?,
            due: Self::parse_timestamp(&due, "due")?,
        })
    }

    fn row_to_card(row: &rusqlite::Row) -> rusqlite::Result<CardRecord> {
        Ok(CardRecord {
            id: CardId::new(row.get::<_, String>("id")?),
            owner: OwnerId::new(row.get::<_, String>("owner_id")?),
            deck_id: DeckId::new(row.get::<_, String>("deck_id")?),
            front: row.get("front")?,
            back: row.get("back")?,
        })
    }

    // ========================================================================
    // CONTRACT (synchronous bodies)
    // ========================================================================

    fn get_state(&self, owner: &OwnerId, card: &CardId) -> Result<Option<ReviewState>> {
        let reader = self.reader()?;
        let mut stmt = reader.prepare(&format!(
            "SELECT {} FROM review_states WHERE owner_id = ?1 AND card_id = ?2",
            STATE_COLUMNS
        ))?;
        let state = stmt
            .query_row(params![owner.as_str(), card.as_str()], |row| {
                Self::row_to_state(row)
            })
            .optional()
            .map_err(map_row_error)?;
        Ok(state)
    }

    fn put_state(
        &self,
        owner: &OwnerId,
        card: &CardId,
        state: &ReviewState,
    ) -> Result<ReviewState> {
        let mut writer = self.writer()?;
        let tx = writer.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let owned: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM cards WHERE id = ?1 AND owner_id = ?2",
                params![card.as_str(), owner.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        if owned.is_none() {
            return Err(StoreError::UnknownCard {
                owner: owner.clone(),
                card: card.clone(),
            });
        }

        let found: u64 = tx
            .query_row(
                "SELECT version FROM review_states WHERE owner_id = ?1 AND card_id = ?2",
                params![owner.as_str(), card.as_str()],
                |row| row.get::<_, i64>(0),
            )
            .optional()?
            .map_or(0, |v| v.max(0) as u64);

        if found != state.version {
            return Err(StoreError::Conflict {
                card: card.clone(),
                expected: state.version,
                found,
            });
        }

        let next_version = found + 1;
        let last_quality = state.last_quality.map(|q| i64::from(q.value()));
        let last_reviewed_at = state.last_reviewed_at.map(format_timestamp);

        tx.execute(
            "INSERT INTO review_states
                (owner_id, card_id, reps, interval_days, ease, due, version,
                 lapses, last_quality, last_reviewed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(owner_id, card_id) DO UPDATE SET
                reps = excluded.reps,
                interval_days = excluded.interval_days,
                ease = excluded.ease,
                due = excluded.due,
                version = excluded.version,
                lapses = excluded.lapses,
                last_quality = excluded.last_quality,
                last_reviewed_at = excluded.last_reviewed_at",
            params![
                owner.as_str(),
                card.as_str(),
                state.reps,
                state.interval,
                state.ease,
                format_timestamp(state.due),
                next_version as i64,
                state.lapses,
                last_quality,
                last_reviewed_at,
            ],
        )?;
        tx.commit()?;

        Ok(ReviewState {
            version: next_version,
            ..state.clone()
        })
    }

    fn query_due_items(&self, query: &DueQuery) -> Result<Vec<DueItem>> {
        let reader = self.reader()?;
        let mut stmt = reader.prepare(
            "SELECT r.card_id, c.deck_id, c.front, r.reps, r.interval_days, r.ease, r.due
             FROM review_states r
             JOIN cards c ON c.id = r.card_id AND c.owner_id = r.owner_id
             WHERE r.owner_id = ?1
               AND r.due <= ?2
               AND (?3 IS NULL OR c.deck_id = ?3)
             ORDER BY r.due ASC, r.card_id ASC
             LIMIT ?4",
        )?;

        let rows = stmt.query_map(
            params![
                query.owner.as_str(),
                format_timestamp(query.now),
                query.deck_id.as_ref().map(|d| d.as_str()),
                query.limit,
            ],
            |row| Self::row_to_due_item(row),
        )?;

        let mut result = Vec::new();
        for item in rows {
            result.push(item.map_err(map_row_error)?);
        }
        Ok(result)
    }

    fn reset_deck_states(
        &self,
        owner: &OwnerId,
        deck: &DeckId,
        defaults: &ResetDefaults,
    ) -> Result<ResetCounts> {
        let mut writer = self.writer()?;
        let tx = writer.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let matched: i64 = tx.query_row(
            "SELECT COUNT(*)
             FROM review_states r
             JOIN cards c ON c.id = r.card_id AND c.owner_id = r.owner_id
             WHERE r.owner_id = ?1 AND c.deck_id = ?2",
            params![owner.as_str(), deck.as_str()],
            |row| row.get(0),
        )?;

        // Rows already at the defaults are left alone so a repeat reset
        // reports zero modifications and keeps their versions.
        let modified = tx.execute(
            "UPDATE review_states SET
                reps = ?3,
                interval_days = ?4,
                ease = ?5,
                due = ?6,
                version = version + 1
             WHERE owner_id = ?1
               AND card_id IN (SELECT id FROM cards WHERE owner_id = ?1 AND deck_id = ?2)
               AND NOT (reps = ?3 AND interval_days = ?4 AND ease = ?5 AND due = ?6)",
            params![
                owner.as_str(),
                deck.as_str(),
                defaults.reps,
                defaults.interval,
                defaults.ease,
                format_timestamp(defaults.due),
            ],
        )?;
        tx.commit()?;

        Ok(ResetCounts {
            matched: matched.max(0) as u64,
            modified: modified as u64,
        })
    }

    fn seed_missing_states(
        &self,
        owner: &OwnerId,
        deck: Option<&DeckId>,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let writer = self.writer()?;
        let created = writer.execute(
            "INSERT INTO review_states
                (owner_id, card_id, reps, interval_days, ease, due, version, lapses)
             SELECT c.owner_id, c.id, 0, 0, ?3, ?4, 1, 0
             FROM cards c
             WHERE c.owner_id = ?1
               AND (?2 IS NULL OR c.deck_id = ?2)
               AND NOT EXISTS (
                   SELECT 1 FROM review_states r
                   WHERE r.owner_id = c.owner_id AND r.card_id = c.id
               )",
            params![
                owner.as_str(),
                deck.map(|d| d.as_str()),
                DEFAULT_EASE,
                format_timestamp(now),
            ],
        )?;
        Ok(created as u64)
    }

    fn get_card(&self, owner: &OwnerId, card: &CardId) -> Result<Option<CardRecord>> {
        let reader = self.reader()?;
        let mut stmt = reader.prepare(
            "SELECT id, owner_id, deck_id, front, back FROM cards WHERE id = ?1 AND owner_id = ?2",
        )?;
        let record = stmt
            .query_row(params![card.as_str(), owner.as_str()], |row| {
                Self::row_to_card(row)
            })
            .optional()?;
        Ok(record)
    }
}

/// Fixed-width RFC 3339 (microseconds, `Z`), so stored text sorts by time.
///
/// Instants past [`latest_due`] are written as `latest_due` to keep the
/// four-digit year.
fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.min(latest_due())
        .to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// A stored timestamp column that does not parse
#[derive(Debug, thiserror::Error)]
#[error("{field} '{value}': {reason}")]
struct BadTimestamp {
    field: &'static str,
    value: String,
    reason: chrono::ParseError,
}

/// Lift timestamp failures raised inside row mappers to `InvalidTimestamp`
fn map_row_error(err: rusqlite::Error) -> StoreError {
    match err {
        rusqlite::Error::FromSqlConversionFailure(column, ty, source) => {
            match source.downcast::<BadTimestamp>() {
                Ok(bad) => StoreError::InvalidTimestamp(bad.to_string()),
                Err(source) => StoreError::Database(rusqlite::Error::FromSqlConversionFailure(
                    column, ty, source,
                )),
            }
        }
        other => StoreError::Database(other),
    }
}

#[async_trait]
impl ReviewStore for SqliteStore {
    async fn get(&self, owner: &OwnerId, card: &CardId) -> Result<Option<ReviewState>> {
        self.get_state(owner, card)
    }

    async fn put(
        &self,
        owner: &OwnerId,
        card: &CardId,
        state: &ReviewState,
    ) -> Result<ReviewState> {
        self.put_state(owner, card, state)
    }

    async fn query_due(&self, query: &DueQuery) -> Result<Vec<DueItem>> {
        self.query_due_items(query)
    }

    async fn bulk_reset(
        &self,
        owner: &OwnerId,
        deck: &DeckId,
        defaults: &ResetDefaults,
    ) -> Result<ResetCounts> {
        self.reset_deck_states(owner, deck, defaults)
    }

    async fn seed_missing(
        &self,
        owner: &OwnerId,
        deck: Option<&DeckId>,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        self.seed_missing_states(owner, deck, now)
    }

    async fn card(&self, owner: &OwnerId, card: &CardId) -> Result<Option<CardRecord>> {
        self.get_card(owner, card)
    }
}

// ============================================================================
// TESTS
// ============================================================================
