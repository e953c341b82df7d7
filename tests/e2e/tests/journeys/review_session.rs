//! # Review Session Journey Tests
//!
//! A learner's full loop against a real SQLite file:
//! seed -> fetch due queue -> answer -> come back later -> answer again.

use chrono::Duration;
use recollect_core::{
    AnswerInput, CardId, DeckId, OwnerId, Quality, QueueRequest, Rating, ReviewStore,
    SchedulerError, sm2::MAX_INTERVAL_DAYS,
};
use recollect_e2e_tests::{TestDataFactory, TestDatabaseManager};

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

// ============================================================================
// WORKED EXAMPLE
// ============================================================================

/// Good, then Easy a day later, then a miss a week after that
#[tokio::test]
async fn test_three_answer_walkthrough() {
    let db = TestDatabaseManager::new_temp();
    let owner = OwnerId::from("alice");
    let deck = DeckId::from("verbs");
    let now = TestDataFactory::fixed_now();

    let cards = db.add_cards(&owner, &deck, 1);
    let card = cards[0].clone();
    assert_eq!(db.scheduler.seed(&owner, None, now).await.unwrap(), 1);

    let fresh = db.state(&owner, &card).await;
    assert_eq!((fresh.reps, fresh.interval), (0, 0));
    assert!(approx(fresh.ease, 2.5));
    assert_eq!(fresh.due, now);

    let s1 = db
        .scheduler
        .answer(&owner, &AnswerInput::new(card.clone(), 4), now)
        .await
        .unwrap();
    assert_eq!((s1.reps, s1.interval), (1, 1));
    assert!(approx(s1.ease, 2.5));
    assert_eq!(s1.due, now + Duration::days(1));

    let day1 = now + Duration::days(1);
    let s2 = db
        .scheduler
        .answer(&owner, &AnswerInput::new(card.clone(), 5), day1)
        .await
        .unwrap();
    assert_eq!((s2.reps, s2.interval), (2, 6));
    assert!(approx(s2.ease, 2.6));
    assert_eq!(s2.due, now + Duration::days(7));

    let day7 = now + Duration::days(7);
    let s3 = db
        .scheduler
        .answer(&owner, &AnswerInput::new(card.clone(), 1), day7)
        .await
        .unwrap();
    assert_eq!((s3.reps, s3.interval), (0, 1));
    assert!(approx(s3.ease, 2.06));
    assert_eq!(s3.due, now + Duration::days(8));
    assert_eq!(s3.lapses, 1);
    assert_eq!(s3.last_quality, Some(Quality::new(1)));
    assert_eq!(s3.last_reviewed_at, Some(day7));

    // What was written is what a fresh read returns
    assert_eq!(db.state(&owner, &card).await, s3);
}

// ============================================================================
// QUEUE-DRIVEN SESSION
// ============================================================================

/// Work the queue every day for a month with mixed answers
#[tokio::test]
async fn test_month_of_daily_sessions() {
    let mut db = TestDatabaseManager::new_temp();
    let owner = OwnerId::from("alice");
    let deck = DeckId::from("kanji");
    let start = TestDataFactory::fixed_now();

    let cards = db.add_cards(&owner, &deck, 20);
    db.scheduler.seed(&owner, Some(&deck), start).await.unwrap();

    let answers = TestDataFactory::answer_stream(42, 2_000);
    let mut next_answer = answers.iter().cycle();
    let mut reviewed = 0;

    for day in 0..30 {
        let now = start + Duration::days(day);
        loop {
            let due = db
                .scheduler
                .due_queue(&owner, &QueueRequest::deck(deck.clone()), now)
                .await
                .unwrap();
            if due.is_empty() {
                break;
            }
            assert!(due.len() <= 10);
            assert!(due.windows(2).all(|w| (w[0].due, &w[0].card_id) <= (w[1].due, &w[1].card_id)));

            for item in due {
                assert!(item.due <= now);
                let quality = *next_answer.next().unwrap();
                let before = db.state(&owner, &item.card_id).await;
                let after = db
                    .scheduler
                    .answer(&owner, &AnswerInput::new(item.card_id.clone(), quality), now)
                    .await
                    .unwrap();
                reviewed += 1;

                assert!(after.ease >= 1.3);
                assert_eq!(after.version, before.version + 1);
                if quality.is_passing() {
                    assert_eq!(after.reps, before.reps + 1);
                    assert!(after.due > now);
                } else {
                    assert_eq!((after.reps, after.interval), (0, 1));
                    assert_eq!(after.due, now + Duration::days(1));
                }
            }
        }
    }
    assert!(reviewed >= 20);
    TestDataFactory::assert_ease_floor(&db, &owner, &cards).await;

    // Everything survives a reopen
    let mut snapshot = Vec::new();
    for card in &cards {
        snapshot.push(db.state(&owner, card).await);
    }
    db.reopen();
    for (card, expected) in cards.iter().zip(&snapshot) {
        assert_eq!(&db.state(&owner, card).await, expected);
    }
}

/// A card answered Easy every time it comes up, for decades of simulated use
#[tokio::test]
async fn test_long_easy_streak_stays_readable() {
    let mut db = TestDatabaseManager::new_temp();
    let owner = OwnerId::from("alice");
    let deck = DeckId::from("trivia");
    let start = TestDataFactory::fixed_now();

    let cards = db.add_cards(&owner, &deck, 2);
    db.scheduler.seed(&owner, None, start).await.unwrap();
    let (streak, idle) = (&cards[0], &cards[1]);

    let mut now = start;
    let mut previous = 0;
    for _ in 0..30 {
        let state = db
            .scheduler
            .answer(&owner, &AnswerInput::new(streak.clone(), Rating::Easy), now)
            .await
            .unwrap();
        assert!(state.interval >= previous);
        assert!(state.interval <= MAX_INTERVAL_DAYS);
        assert_eq!(db.state(&owner, streak).await, state);
        previous = state.interval;
        now = state.due;
    }
    assert_eq!(previous, MAX_INTERVAL_DAYS);

    // Answering at the same instant over and over also tops out
    for _ in 0..30 {
        db.scheduler
            .answer(&owner, &AnswerInput::new(streak.clone(), 5), start)
            .await
            .unwrap();
    }
    let capped = db.state(&owner, streak).await;
    assert_eq!(capped.interval, MAX_INTERVAL_DAYS);
    assert_eq!(capped.due, start + Duration::days(i64::from(MAX_INTERVAL_DAYS)));

    // The other card is still served, before and after a reopen
    for _ in 0..2 {
        let due = db
            .scheduler
            .due_queue(&owner, &QueueRequest::all(), start)
            .await
            .unwrap();
        let ids: Vec<_> = due.iter().map(|i| &i.card_id).collect();
        assert_eq!(ids, vec![idle]);
        db.reopen();
    }
    assert_eq!(db.state(&owner, streak).await, capped);
}

#[tokio::test]
async fn test_queue_order_across_decks_and_owners() {
    let db = TestDatabaseManager::new_temp();
    let now = TestDataFactory::fixed_now();
    let scenario = TestDataFactory::create_staggered_scenario(&db, now).await;

    let all = db
        .scheduler
        .due_queue(&scenario.owner, &QueueRequest::all(), now)
        .await
        .unwrap();
    let ids: Vec<_> = all.iter().map(|i| i.card_id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "capitals-004",
            "capitals-003",
            "capitals-002",
            "capitals-001",
            "capitals-000",
            "rivers-000",
            "rivers-001",
            "rivers-002",
        ]
    );

    let rivers = db
        .scheduler
        .due_queue(
            &scenario.owner,
            &QueueRequest::deck(scenario.other_deck.clone()).with_limit(1),
            now,
        )
        .await
        .unwrap();
    assert_eq!(rivers.len(), 1);
    assert_eq!(rivers[0].card_id.as_str(), "rivers-000");

    // Bob only ever sees Bob's cards
    let bob = db
        .scheduler
        .due_queue(&scenario.other_owner, &QueueRequest::all().with_limit(50), now)
        .await
        .unwrap();
    assert_eq!(bob.len(), scenario.foreign_cards.len());
    assert!(bob.iter().all(|i| i.deck_id.as_str() == "bobs-deck"));

    // Three and a half hours earlier only the two oldest primary cards were due
    let earlier = db
        .scheduler
        .due_queue(
            &scenario.owner,
            &QueueRequest::all(),
            now - Duration::minutes(210),
        )
        .await
        .unwrap();
    let ids: Vec<_> = earlier.iter().map(|i| i.card_id.as_str()).collect();
    assert_eq!(ids, vec!["capitals-004", "capitals-003"]);
}

// ============================================================================
// PREVIEW AND INPUT HANDLING
// ============================================================================

#[tokio::test]
async fn test_preview_predicts_each_answer() {
    let db = TestDatabaseManager::new_temp();
    let owner = OwnerId::from("alice");
    let deck = DeckId::from("d");
    let now = TestDataFactory::fixed_now();

    let cards = db.add_cards(&owner, &deck, 4);
    db.scheduler.seed(&owner, None, now).await.unwrap();
    // Give every card some history so the outcomes differ
    for card in &cards {
        for day in [0, 1] {
            db.scheduler
                .answer(&owner, &AnswerInput::new(card.clone(), 4), now + Duration::days(day))
                .await
                .unwrap();
        }
    }

    let later = now + Duration::days(7);
    for (card, rating) in cards.iter().zip(Rating::ALL) {
        let preview = db.scheduler.preview(&owner, card, later).await.unwrap();
        let actual = db
            .scheduler
            .answer(&owner, &AnswerInput::new(card.clone(), rating), later)
            .await
            .unwrap();
        let predicted = preview.for_rating(rating);
        assert_eq!(predicted.reps, actual.reps);
        assert_eq!(predicted.interval, actual.interval);
        assert_eq!(predicted.due, actual.due);
        assert!(approx(predicted.ease, actual.ease));
    }
}

#[tokio::test]
async fn test_answer_bodies_from_json() {
    let db = TestDatabaseManager::new_temp();
    let owner = OwnerId::from("alice");
    let deck = DeckId::from("d");
    let now = TestDataFactory::fixed_now();
    let cards = db.add_cards(&owner, &deck, 3);
    db.scheduler.seed(&owner, None, now).await.unwrap();

    // Label, out-of-range integer, fractional
    let bodies = [
        (r#"{"cardId":"d-000","quality":"easy"}"#, 5),
        (r#"{"cardId":"d-001","quality":9}"#, 5),
        (r#"{"cardId":"d-002","quality":2.7}"#, 2),
    ];
    for (body, expected) in bodies {
        let input: AnswerInput = serde_json::from_str(body).unwrap();
        assert_eq!(input.quality.value(), expected);
        db.scheduler.answer(&owner, &input, now).await.unwrap();
    }

    let failed = db.state(&owner, &cards[2]).await;
    assert_eq!(failed.reps, 0);
    assert_eq!(failed.lapses, 0);
}

#[tokio::test]
async fn test_answer_requires_existing_state() {
    let db = TestDatabaseManager::new_temp();
    let owner = OwnerId::from("alice");
    let now = TestDataFactory::fixed_now();
    let cards = db.add_cards(&owner, &DeckId::from("d"), 1);

    let err = db
        .scheduler
        .answer(&owner, &AnswerInput::new(cards[0].clone(), 4), now)
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulerError::NotFound { .. }));
    assert_eq!(db.state_count(), 0);

    // Seeded for alice only: another owner still gets NotFound
    db.scheduler.seed(&owner, None, now).await.unwrap();
    let err = db
        .scheduler
        .answer(
            &OwnerId::from("mallory"),
            &AnswerInput::new(cards[0].clone(), 4),
            now,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulerError::NotFound { .. }));

    let missing = db
        .scheduler
        .preview(&owner, &CardId::from("no-such-card"), now)
        .await;
    assert!(matches!(missing, Err(SchedulerError::NotFound { .. })));

    // Queue never seeds on its own
    let other = OwnerId::from("carol");
    db.add_cards(&other, &DeckId::from("e"), 2);
    let empty = db
        .scheduler
        .due_queue(&other, &QueueRequest::all(), now)
        .await
        .unwrap();
    assert!(empty.is_empty());
    assert!(db.store.get(&other, &CardId::from("e-000")).await.unwrap().is_none());
}
