//! Storage Module
//!
//! The review store contract plus two implementations:
//! - `SqliteStore`: WAL-mode SQLite with versioned migrations
//! - `MemoryStore`: mutex-guarded maps, for tests and embedding
//!
//! Writes to a single state are serialized by compare-and-swap on
//! `ReviewState::version`; a stale write fails with `StoreError::Conflict`.

mod memory;
mod migrations;
mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::review::{
    CardId, CardRecord, DeckId, DueItem, DueQuery, OwnerId, ResetCounts, ResetDefaults,
    ReviewState,
};

pub use memory::MemoryStore;
pub use migrations::MIGRATIONS;
pub use sqlite::SqliteStore;

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Store error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// Compare-and-swap failed: someone else wrote the state first
    #[error("Version conflict on card {card}: expected version {expected}, found {found}")]
    Conflict {
        card: CardId,
        expected: u64,
        found: u64,
    },
    /// The owner has no such card
    #[error("Unknown card {card} for owner {owner}")]
    UnknownCard { owner: OwnerId, card: CardId },
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Invalid timestamp
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
    /// Initialization error
    #[error("Initialization error: {0}")]
    Init(String),
}

/// Store result type
pub type Result<T> = std::result::Result<T, StoreError>;

// ============================================================================
// STORE CONTRACT
// ============================================================================

/// Persistence contract the scheduler runs against.
///
/// Every call is scoped to one owner. Implementations must give
/// read-your-writes consistency per owner and must reject a `put` whose
/// `version` differs from the stored one.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Load one state
    async fn get(&self, owner: &OwnerId, card: &CardId) -> Result<Option<ReviewState>>;

    /// Compare-and-swap write.
    ///
    /// `state.version` must equal the stored version (0 when absent). Returns
    /// the state as stored, with its version bumped.
    async fn put(&self, owner: &OwnerId, card: &CardId, state: &ReviewState)
    -> Result<ReviewState>;

    /// Due states, ordered by due time then card id, at most `query.limit`
    async fn query_due(&self, query: &DueQuery) -> Result<Vec<DueItem>>;

    /// Reset every state of `owner` in `deck` to `defaults`
    async fn bulk_reset(
        &self,
        owner: &OwnerId,
        deck: &DeckId,
        defaults: &ResetDefaults,
    ) -> Result<ResetCounts>;

    /// Create a fresh state, due at `now`, for each owned card lacking one.
    /// Returns how many were created.
    async fn seed_missing(
        &self,
        owner: &OwnerId,
        deck: Option<&DeckId>,
        now: DateTime<Utc>,
    ) -> Result<u64>;

    /// Look up a card the owner holds
    async fn card(&self, owner: &OwnerId, card: &CardId) -> Result<Option<CardRecord>>;
}
