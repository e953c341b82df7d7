//! In-memory store
//!
//! Same contract as the SQLite store, held in two maps behind one mutex.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{Result, ReviewStore, StoreError};
use crate::review::{
    CardId, CardRecord, DeckId, DueItem, DueQuery, OwnerId, ResetCounts, ResetDefaults,
    ReviewState,
};

#[derive(Default)]
struct Inner {
    cards: HashMap<CardId, CardRecord>,
    states: HashMap<(OwnerId, CardId), ReviewState>,
}

impl Inner {
    fn owned_card(&self, owner: &OwnerId, card: &CardId) -> Option<&CardRecord> {
        self.cards.get(card).filter(|c| &c.owner == owner)
    }
}

/// Review store kept entirely in process memory
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Init("Memory store lock poisoned".into()))
    }

    /// Register or replace a card
    pub fn upsert_card(&self, card: CardRecord) -> Result<()> {
        let mut inner = self.lock()?;
        inner.cards.insert(card.id.clone(), card);
        Ok(())
    }

    /// Delete a card and, by cascade, every state attached to it
    pub fn remove_card(&self, card: &CardId) -> Result<bool> {
        let mut inner = self.lock()?;
        let removed = inner.cards.remove(card).is_some();
        inner.states.retain(|(_, c), _| c != card);
        Ok(removed)
    }

    /// Number of stored states, across all owners
    pub fn state_count(&self) -> Result<usize> {
        Ok(self.lock()?.states.len())
    }
}

#[async_trait]
impl ReviewStore for MemoryStore {
    async fn get(&self, owner: &OwnerId, card: &CardId) -> Result<Option<ReviewState>> {
        let inner = self.lock()?;
        Ok(inner.states.get(&(owner.clone(), card.clone())).cloned())
    }

    async fn put(
        &self,
        owner: &OwnerId,
        card: &CardId,
        state: &ReviewState,
    ) -> Result<ReviewState> {
        let mut inner = self.lock()?;
        if inner.owned_card(owner, card).is_none() {
            return Err(StoreError::UnknownCard {
                owner: owner.clone(),
                card: card.clone(),
            });
        }

        let key = (owner.clone(), card.clone());
        let found = inner.states.get(&key).map_or(0, |s| s.version);
        if found != state.version {
            return Err(StoreError::Conflict {
                card: card.clone(),
                expected: state.version,
                found,
            });
        }

        let stored = ReviewState {
            version: found + 1,
            ..state.clone()
        };
        inner.states.insert(key, stored.clone());
        Ok(stored)
    }

    async fn query_due(&self, query: &DueQuery) -> Result<Vec<DueItem>> {
        let inner = self.lock()?;
        let mut items: Vec<DueItem> = inner
            .states
            .iter()
            .filter(|((owner, _), state)| owner == &query.owner && state.is_due(query.now))
            .filter_map(|((owner, card_id), state)| {
                let card = inner.owned_card(owner, card_id)?;
                if query.deck_id.as_ref().is_some_and(|d| d != &card.deck_id) {
                    return None;
                }
                Some(DueItem {
                    card_id: card_id.clone(),
                    deck_id: card.deck_id.clone(),
                    front: card.front.clone(),
                    reps: state.reps,
                    interval: state.interval,
                    ease: state.ease,
                    due: state.due,
                })
            })
            .collect();

        items.sort_by(|a, b| a.due.cmp(&b.due).then_with(|| a.card_id.cmp(&b.card_id)));
        items.truncate(query.limit as usize);
        Ok(items)
    }

    async fn bulk_reset(
        &self,
        owner: &OwnerId,
        deck: &DeckId,
        defaults: &ResetDefaults,
    ) -> Result<ResetCounts> {
        let mut guard = self.lock()?;
        let Inner { cards, states } = &mut *guard;
        let mut counts = ResetCounts::default();

        for ((state_owner, card_id), state) in states.iter_mut() {
            let in_deck = cards
                .get(card_id)
                .is_some_and(|c| &c.owner == owner && &c.deck_id == deck);
            if state_owner != owner || !in_deck {
                continue;
            }
            counts.matched += 1;
            if !state.matches_reset(defaults) {
                state.apply_reset(defaults);
                state.version += 1;
                counts.modified += 1;
            }
        }

        Ok(counts)
    }

    async fn seed_missing(
        &self,
        owner: &OwnerId,
        deck: Option<&DeckId>,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let mut guard = self.lock()?;
        let Inner { cards, states } = &mut *guard;
        let mut created = 0;

        for card in cards.values() {
            if &card.owner != owner || deck.is_some_and(|d| d != &card.deck_id) {
                continue;
            }
            let key = (owner.clone(), card.id.clone());
            if states.contains_key(&key) {
                continue;
            }
            states.insert(
                key,
                ReviewState {
                    version: 1,
                    ..ReviewState::new(now)
                },
            );
            created += 1;
        }

        Ok(created)
    }

    async fn card(&self, owner: &OwnerId, card: &CardId) -> Result<Option<CardRecord>> {
        let inner = self.lock()?;
        Ok(inner.owned_card(owner, card).cloned())
    }
}
