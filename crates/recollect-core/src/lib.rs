//! # Recollect Core
//!
//! SM-2 review scheduling for flashcard decks:
//!
//! - **SM-2 transitions**: pure `advance(state, quality, now)` with ease floor 1.3
//! - **Due queues**: oldest due first, card id tie-break, bounded page size
//! - **Deck resets**: idempotent, reporting matched vs. actually modified states
//! - **Versioned storage**: compare-and-swap writes so concurrent answers
//!   to the same card never silently overwrite each other
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use chrono::Utc;
//! use recollect_core::{AnswerInput, Config, OwnerId, QueueRequest, ReviewScheduler, SqliteStore};
//!
//! let config = Config::from_env();
//! let store = Arc::new(SqliteStore::new(config.db_path())?);
//! let scheduler = ReviewScheduler::from_config(store, &config);
//!
//! let owner = OwnerId::from("alice");
//! scheduler.seed(&owner, None, Utc::now()).await?;
//!
//! for item in scheduler.due_queue(&owner, &QueueRequest::all(), Utc::now()).await? {
//!     let state = scheduler
//!         .answer(&owner, &AnswerInput::new(item.card_id, 4), Utc::now())
//!         .await?;
//!     println!("next review in {} days", state.interval);
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `bundled-sqlite` (default): compile SQLite into the binary

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULES
// ============================================================================

pub mod config;
pub mod review;
pub mod scheduler;
pub mod sm2;
pub mod storage;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

// State model
pub use review::{
    CardId, CardRecord, DeckId, DueItem, DueQuery, OwnerId, QueueRequest, ResetCounts,
    ResetDefaults, ReviewState,
};

// SM-2 algorithm
pub use sm2::{PreviewResults, Quality, Rating, advance, preview};

// Storage layer
pub use storage::{MemoryStore, ReviewStore, SqliteStore, StoreError};

// Scheduler service
pub use scheduler::{AnswerInput, ReviewScheduler, SchedulerError};

pub use config::Config;

// ============================================================================
// VERSION INFO
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// PRELUDE
// ============================================================================

/// Convenient imports for common usage
pub mod prelude {
    pub use crate::{
        AnswerInput, CardId, Config, DeckId, DueItem, OwnerId, Quality, QueueRequest, Rating,
        ResetCounts, ReviewScheduler, ReviewState, ReviewStore, SchedulerError, SqliteStore,
        StoreError,
    };
}
