//! Test Data Factory
//!
//! Provides utilities for generating realistic review data:
//! - Cards with predictable ids and text
//! - Deterministic answer streams
//! - Pre-built deck scenarios with staggered due times

use chrono::{DateTime, Duration, TimeZone, Utc};
use recollect_core::{CardId, CardRecord, DeckId, OwnerId, Quality, ReviewStore};

use crate::harness::TestDatabaseManager;

/// Factory for creating test data
///
/// # Example
///
/// ```rust,ignore
/// let db = TestDatabaseManager::new_temp();
/// let scenario = TestDataFactory::create_staggered_scenario(&db, now).await;
/// let answers = TestDataFactory::answer_stream(7, 30);
/// ```
pub struct TestDataFactory;

/// Two decks for one owner plus a deck for a second owner, all with states
#[derive(Debug, Clone)]
pub struct DeckScenario {
    pub owner: OwnerId,
    pub other_owner: OwnerId,
    /// Cards due one hour apart, oldest first
    pub primary_deck: DeckId,
    pub primary_cards: Vec<CardId>,
    pub other_deck: DeckId,
    pub other_cards: Vec<CardId>,
    pub foreign_cards: Vec<CardId>,
}

impl TestDataFactory {
    /// Fixed reference time so tests are reproducible
    pub fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 8, 30, 0).unwrap()
    }

    pub fn card(owner: &OwnerId, deck: &DeckId, id: &str) -> CardRecord {
        CardRecord::new(
            CardId::from(id),
            owner.clone(),
            deck.clone(),
            format!("front of {}", id),
            format!("back of {}", id),
        )
    }

    /// Deterministic pseudo-random grades in 0..=5
    pub fn answer_stream(seed: u64, len: usize) -> Vec<Quality> {
        let mut x = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (0..len)
            .map(|_| {
                x = x
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                Quality::new(((x >> 33) % 6) as i64)
            })
            .collect()
    }

    /// Build a `DeckScenario`.
    ///
    /// Primary deck cards are due at `now - 5h, now - 4h, ... now - 1h`, in
    /// reverse id order so due order and id order disagree. The other deck
    /// is due at `now - 30m`. The foreign owner's cards are due long ago.
    pub async fn create_staggered_scenario(
        db: &TestDatabaseManager,
        now: DateTime<Utc>,
    ) -> DeckScenario {
        let owner = OwnerId::from("alice");
        let other_owner = OwnerId::from("bob");
        let primary_deck = DeckId::from("capitals");
        let other_deck = DeckId::from("rivers");
        let foreign_deck = DeckId::from("bobs-deck");

        let primary_cards = db.add_cards(&owner, &primary_deck, 5);
        let other_cards = db.add_cards(&owner, &other_deck, 3);
        let foreign_cards = db.add_cards(&other_owner, &foreign_deck, 4);

        for (i, card) in primary_cards.iter().enumerate() {
            // capitals-000 is due last, capitals-004 first
            let due = now - Duration::hours(i as i64 + 1);
            db.force_state(&owner, card, |s| s.due = due, now).await;
        }
        for card in &other_cards {
            db.force_state(&owner, card, |s| s.due = now - Duration::minutes(30), now)
                .await;
        }
        for card in &foreign_cards {
            db.force_state(&other_owner, card, |s| s.due = now - Duration::days(30), now)
                .await;
        }

        DeckScenario {
            owner,
            other_owner,
            primary_deck,
            primary_cards,
            other_deck,
            other_cards,
            foreign_cards,
        }
    }

    /// Check every state of the owner obeys the ease floor
    pub async fn assert_ease_floor(db: &TestDatabaseManager, owner: &OwnerId, cards: &[CardId]) {
        for card in cards {
            if let Some(state) = db.store.get(owner, card).await.expect("Failed to load state") {
                assert!(state.ease >= 1.3, "ease {} below floor on {}", state.ease, card);
            }
        }
    }
}
