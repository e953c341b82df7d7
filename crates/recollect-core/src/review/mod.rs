//! Review Module
//!
//! The data model the scheduler works on:
//! - Identifier newtypes (owner, deck, card)
//! - `ReviewState`, the per (owner, card) SM-2 record
//! - Due queue requests and items
//! - Deck reset defaults and counts

mod ids;
mod queue;
mod state;

pub use ids::{CardId, DeckId, OwnerId};
pub use queue::{
    DEFAULT_QUEUE_LIMIT, DueItem, DueQuery, MAX_QUEUE_LIMIT, MIN_QUEUE_LIMIT, QueueRequest,
    clamp_limit,
};
pub use state::{CardRecord, ResetCounts, ResetDefaults, ReviewState};
