//! SM-2 transition function
//!
//! Pure functions only: no clock, no storage. `now` is always injected.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::rating::{Quality, Rating};
use crate::review::ReviewState;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Ease factor of a card that has never been answered
pub const DEFAULT_EASE: f64 = 2.5;

/// Ease factor floor
pub const MIN_EASE: f64 = 1.3;

/// Lowest passing grade
pub const PASSING_QUALITY: u8 = 3;

/// Highest grade
pub const MAX_QUALITY: u8 = 5;

/// Interval after the first success
pub const FIRST_INTERVAL_DAYS: u32 = 1;

/// Interval after the second consecutive success
pub const SECOND_INTERVAL_DAYS: u32 = 6;

/// Interval after a failure
pub const RELEARN_INTERVAL_DAYS: u32 = 1;

/// Longest interval ever scheduled (about a century)
pub const MAX_INTERVAL_DAYS: u32 = 36_500;

// ============================================================================
// CORE FUNCTIONS
// ============================================================================

/// SM-2 ease update: `max(1.3, ease + (0.1 - (5-q)(0.08 + (5-q)0.02)))`
pub fn next_ease(ease: f64, quality: Quality) -> f64 {
    let miss = f64::from(MAX_QUALITY - quality.value());
    let updated = ease + (0.1 - miss * (0.08 + miss * 0.02));
    updated.max(MIN_EASE)
}

/// Interval for a successful answer.
///
/// `reps` is the repetition count *after* the answer. Later steps multiply
/// the previous interval by the already-updated ease and round half away
/// from zero, staying within 1..=`MAX_INTERVAL_DAYS`.
pub fn next_interval(reps: u32, prev_interval: u32, ease: f64) -> u32 {
    match reps {
        0 | 1 => FIRST_INTERVAL_DAYS,
        2 => SECOND_INTERVAL_DAYS,
        _ => {
            let scaled = (f64::from(prev_interval) * ease).round();
            // `as` saturates, so absurd eases cannot wrap
            (scaled as u32).clamp(1, MAX_INTERVAL_DAYS)
        }
    }
}

/// Latest due date a store has to represent: the last microsecond of 9999.
///
/// Past this, RFC 3339 needs a signed five-digit year.
pub fn latest_due() -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(9999, 12, 31)
        .and_then(|date| date.and_hms_micro_opt(23, 59, 59, 999_999))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// `now + days`, saturating at [`latest_due`]
pub fn due_after(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    let latest = latest_due();
    now.checked_add_signed(Duration::days(i64::from(days)))
        .map_or(latest, |due| due.min(latest))
}

/// Apply one answer to a state.
///
/// Ease is updated on every answer, including failures. A failure drops
/// `reps` to 0 and reschedules for tomorrow; a success steps through the
/// 1 day, 6 day, then ease-multiplied intervals.
pub fn advance(state: &ReviewState, quality: Quality, now: DateTime<Utc>) -> ReviewState {
    let ease = next_ease(state.ease, quality);

    let (reps, interval, lapses) = if quality.is_passing() {
        let reps = state.reps.saturating_add(1);
        (reps, next_interval(reps, state.interval, ease), state.lapses)
    } else {
        let lapses = if state.reps > 0 {
            state.lapses.saturating_add(1)
        } else {
            state.lapses
        };
        (0, RELEARN_INTERVAL_DAYS, lapses)
    };

    ReviewState {
        reps,
        interval,
        ease,
        due: due_after(now, interval),
        lapses,
        last_quality: Some(quality),
        last_reviewed_at: Some(now),
        version: state.version,
    }
}

// ============================================================================
// PREVIEW
// ============================================================================

/// Projected outcome of each answer button
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResults {
    pub again: ReviewState,
    pub hard: ReviewState,
    pub good: ReviewState,
    pub easy: ReviewState,
}

impl PreviewResults {
    pub fn for_rating(&self, rating: Rating) -> &ReviewState {
        match rating {
            Rating::Again => &self.again,
            Rating::Hard => &self.hard,
            Rating::Good => &self.good,
            Rating::Easy => &self.easy,
        }
    }
}

/// What each button would do to `state` if pressed at `now`
pub fn preview(state: &ReviewState, now: DateTime<Utc>) -> PreviewResults {
    PreviewResults {
        again: advance(state, Rating::Again.quality(), now),
        hard: advance(state, Rating::Hard.quality(), now),
        good: advance(state, Rating::Good.quality(), now),
        easy: advance(state, Rating::Easy.quality(), now),
    }
}
