//! SM-2 (SuperMemo 2) Scheduling Module
//!
//! The classic SuperMemo 2 update rule, as used by most flashcard apps:
//! - Grades 0-2 are failures: repetitions reset, card comes back tomorrow
//! - Grades 3-5 are successes: 1 day, then 6 days, then `interval * ease`
//! - Ease moves on every answer and never drops below 1.3
//!
//! Reference: https://super-memory.com/english/ol/sm2.htm
//!
//! ## Core Formulas:
//! - Ease: EF' = max(1.3, EF + (0.1 - (5 - q) * (0.08 + (5 - q) * 0.02)))
//! - Interval: I(1) = 1, I(2) = 6, I(n) = min(36500, round(I(n-1) * EF'))

mod algorithm;
mod rating;

pub use algorithm::{
    // Core functions
    advance,
    due_after,
    latest_due,
    next_ease,
    next_interval,
    preview,
    PreviewResults,
    // Constants
    DEFAULT_EASE,
    FIRST_INTERVAL_DAYS,
    MAX_INTERVAL_DAYS,
    MAX_QUALITY,
    MIN_EASE,
    PASSING_QUALITY,
    RELEARN_INTERVAL_DAYS,
    SECOND_INTERVAL_DAYS,
};

pub use rating::{Quality, Rating};
