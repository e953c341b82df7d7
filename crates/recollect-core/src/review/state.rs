//! Review State - per (owner, card) scheduling record
//!
//! Each state carries:
//! - SM-2 scheduling fields (reps, interval, ease, due)
//! - Answer history (lapses, last grade, last review time)
//! - A version counter for compare-and-swap writes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{CardId, DeckId, OwnerId};
use crate::sm2::{DEFAULT_EASE, Quality};

// ============================================================================
// REVIEW STATE
// ============================================================================

/// Scheduling state of one card for one owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewState {
    /// Consecutive successful reviews since the last reset or failure
    pub reps: u32,
    /// Days until the next review
    pub interval: u32,
    /// Ease factor, never below 1.3
    pub ease: f64,
    /// When the card becomes eligible for review
    pub due: DateTime<Utc>,

    /// Failures of a card that had been recalled at least once
    pub lapses: u32,
    /// Grade of the most recent answer
    pub last_quality: Option<Quality>,
    /// Time of the most recent answer
    pub last_reviewed_at: Option<DateTime<Utc>>,

    /// Compare-and-swap token; 0 until first stored
    pub version: u64,
}

impl ReviewState {
    /// Fresh state, due immediately
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            reps: 0,
            interval: 0,
            ease: DEFAULT_EASE,
            due: now,
            lapses: 0,
            last_quality: None,
            last_reviewed_at: None,
            version: 0,
        }
    }

    /// Whether the card may be served at `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due <= now
    }

    /// Whether the scheduling fields already equal `defaults`
    pub fn matches_reset(&self, defaults: &ResetDefaults) -> bool {
        self.reps == defaults.reps
            && self.interval == defaults.interval
            && self.ease == defaults.ease
            && self.due == defaults.due
    }

    /// Overwrite the scheduling fields with `defaults`, keeping history
    pub fn apply_reset(&mut self, defaults: &ResetDefaults) {
        self.reps = defaults.reps;
        self.interval = defaults.interval;
        self.ease = defaults.ease;
        self.due = defaults.due;
    }
}

// ============================================================================
// RESET
// ============================================================================

/// Values written by a deck reset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetDefaults {
    pub reps: u32,
    pub interval: u32,
    pub ease: f64,
    pub due: DateTime<Utc>,
}

impl ResetDefaults {
    /// "Start over" defaults: everything due at `now` with the default ease
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            reps: 0,
            interval: 0,
            ease: DEFAULT_EASE,
            due: now,
        }
    }
}

/// Outcome of a bulk reset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetCounts {
    /// States selected by owner and deck
    pub matched: u64,
    /// States whose values actually changed
    pub modified: u64,
}

// ============================================================================
// CARD RECORD
// ============================================================================

/// The slice of a card the scheduler needs: ownership, deck membership, and
/// the prompt. The answer side is kept for completeness of the store but is
/// never copied into a queue item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardRecord {
    pub id: CardId,
    pub owner: OwnerId,
    pub deck_id: DeckId,
    pub front: String,
    pub back: String,
}

impl CardRecord {
    pub fn new(
        id: CardId,
        owner: OwnerId,
        deck_id: DeckId,
        front: impl Into<String>,
        back: impl Into<String>,
    ) -> Self {
        Self {
            id,
            owner,
            deck_id,
            front: front.into(),
            back: back.into(),
        }
    }
}
