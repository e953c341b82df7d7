//! Review Scheduler
//!
//! The service callers talk to. It owns no state of its own beyond a store
//! handle and a default page size: every decision comes from `sm2::advance`
//! and every fact lives in the store.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::review::{
    CardId, CardRecord, DEFAULT_QUEUE_LIMIT, DeckId, DueItem, DueQuery, OwnerId, QueueRequest,
    ResetCounts, ResetDefaults, ReviewState, clamp_limit,
};
use crate::sm2::{self, PreviewResults, Quality};
use crate::storage::{ReviewStore, StoreError};

// ============================================================================
// ERRORS
// ============================================================================

/// Scheduler error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// The owner has no review state for this card
    #[error("No review state for card {card} (owner {owner})")]
    NotFound { owner: OwnerId, card: CardId },
    /// Store failure, passed through untouched
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Scheduler result type
pub type Result<T> = std::result::Result<T, SchedulerError>;

// ============================================================================
// INPUTS
// ============================================================================

/// One answer, as validated at the service boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerInput {
    pub card_id: CardId,
    /// Integer 0-5 (clamped) or a button label
    pub quality: Quality,
}

impl AnswerInput {
    pub fn new(card_id: CardId, quality: impl Into<Quality>) -> Self {
        Self {
            card_id,
            quality: quality.into(),
        }
    }
}

// ============================================================================
// SCHEDULER
// ============================================================================

/// SM-2 review scheduler over an injected store
pub struct ReviewScheduler<S: ReviewStore + ?Sized> {
    store: Arc<S>,
    default_limit: u32,
}

impl<S: ReviewStore + ?Sized> Clone for ReviewScheduler<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            default_limit: self.default_limit,
        }
    }
}

impl<S: ReviewStore + ?Sized> ReviewScheduler<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            default_limit: DEFAULT_QUEUE_LIMIT,
        }
    }

    pub fn from_config(store: Arc<S>, config: &Config) -> Self {
        Self::new(store).with_default_limit(i64::from(config.default_queue_limit))
    }

    /// Page size used when a queue request names none (clamped like any limit)
    pub fn with_default_limit(mut self, limit: i64) -> Self {
        self.default_limit = clamp_limit(limit);
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Record an answer.
    ///
    /// Loads the current state, applies SM-2, and writes the result back with
    /// compare-and-swap. A missing state is `NotFound`; nothing is created.
    /// A concurrent writer surfaces as `StoreError::Conflict`.
    pub async fn answer(
        &self,
        owner: &OwnerId,
        input: &AnswerInput,
        now: DateTime<Utc>,
    ) -> Result<ReviewState> {
        let current = self
            .store
            .get(owner, &input.card_id)
            .await?
            .ok_or_else(|| SchedulerError::NotFound {
                owner: owner.clone(),
                card: input.card_id.clone(),
            })?;

        let next = sm2::advance(&current, input.quality, now);

        match self.store.put(owner, &input.card_id, &next).await {
            Ok(stored) => {
                debug!(
                    owner = %owner,
                    card = %input.card_id,
                    quality = input.quality.value(),
                    reps = stored.reps,
                    interval = stored.interval,
                    ease = stored.ease,
                    due = %stored.due,
                    "Review recorded"
                );
                Ok(stored)
            }
            Err(e @ StoreError::Conflict { .. }) => {
                warn!(owner = %owner, card = %input.card_id, "Concurrent answer rejected: {}", e);
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Due cards, oldest due first, ties broken by card id
    pub async fn due_queue(
        &self,
        owner: &OwnerId,
        request: &QueueRequest,
        now: DateTime<Utc>,
    ) -> Result<Vec<DueItem>> {
        let limit = request.limit.map_or(self.default_limit, clamp_limit);
        let query = DueQuery {
            owner: owner.clone(),
            deck_id: request.deck_id.clone(),
            limit,
            now,
        };

        let items = self.store.query_due(&query).await?;
        debug!(owner = %owner, limit, returned = items.len(), "Due queue served");
        Ok(items)
    }

    /// Make every card of a deck due now with default ease. Idempotent.
    pub async fn reset_deck(
        &self,
        owner: &OwnerId,
        deck: &DeckId,
        now: DateTime<Utc>,
    ) -> Result<ResetCounts> {
        let counts = self
            .store
            .bulk_reset(owner, deck, &ResetDefaults::at(now))
            .await?;
        info!(
            owner = %owner,
            deck = %deck,
            matched = counts.matched,
            modified = counts.modified,
            "Deck reset"
        );
        Ok(counts)
    }

    /// Create fresh due-now states for owned cards that have none.
    ///
    /// The only way states come into existence through the scheduler;
    /// `due_queue` never does this on its own.
    pub async fn seed(
        &self,
        owner: &OwnerId,
        deck: Option<&DeckId>,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let created = self.store.seed_missing(owner, deck, now).await?;
        info!(owner = %owner, deck = ?deck.map(|d| d.as_str()), created, "Review states seeded");
        Ok(created)
    }

    /// What each answer button would do, without writing anything
    pub async fn preview(
        &self,
        owner: &OwnerId,
        card: &CardId,
        now: DateTime<Utc>,
    ) -> Result<PreviewResults> {
        let current = self
            .store
            .get(owner, card)
            .await?
            .ok_or_else(|| SchedulerError::NotFound {
                owner: owner.clone(),
                card: card.clone(),
            })?;
        Ok(sm2::preview(&current, now))
    }

    /// The full card, answer side included, for "show answer"
    pub async fn card(&self, owner: &OwnerId, card: &CardId) -> Result<CardRecord> {
        self.store
            .card(owner, card)
            .await?
            .ok_or_else(|| SchedulerError::NotFound {
                owner: owner.clone(),
                card: card.clone(),
            })
    }
}

// ============================================================================
// TESTS
// ============================================================================
