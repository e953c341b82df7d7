//! Due queue types
//!
//! A queue request is bounded: whatever limit the caller asks for is clamped
//! into `MIN_QUEUE_LIMIT..=MAX_QUEUE_LIMIT` before it reaches a store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{CardId, DeckId, OwnerId};

/// Smallest page a queue call returns
pub const MIN_QUEUE_LIMIT: u32 = 1;
/// Largest page a queue call returns
pub const MAX_QUEUE_LIMIT: u32 = 50;
/// Page size when the caller gives none
pub const DEFAULT_QUEUE_LIMIT: u32 = 10;

/// Clamp a caller-supplied limit into the allowed range
pub fn clamp_limit(limit: i64) -> u32 {
    limit.clamp(MIN_QUEUE_LIMIT as i64, MAX_QUEUE_LIMIT as i64) as u32
}

/// Queue request as it arrives from a caller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueRequest {
    /// Restrict to one deck
    #[serde(default)]
    pub deck_id: Option<DeckId>,
    /// Requested page size (clamped)
    #[serde(default)]
    pub limit: Option<i64>,
}

impl QueueRequest {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn deck(deck_id: DeckId) -> Self {
        Self {
            deck_id: Some(deck_id),
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Validated query handed to a store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueQuery {
    pub owner: OwnerId,
    pub deck_id: Option<DeckId>,
    /// Already clamped
    pub limit: u32,
    pub now: DateTime<Utc>,
}

/// One entry of the due queue
///
/// Carries the prompt but never the answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DueItem {
    pub card_id: CardId,
    pub deck_id: DeckId,
    pub front: String,
    pub reps: u32,
    pub interval: u32,
    pub ease: f64,
    pub due: DateTime<Utc>,
}
