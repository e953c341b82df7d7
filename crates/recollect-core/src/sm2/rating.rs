//! Answer grades
//!
//! The engine runs on the canonical SM-2 0-5 quality scale. The four answer
//! buttons shown to learners are a fixed projection onto that scale:
//!
//! | Button | Quality |
//! |--------|---------|
//! | Again  | 0       |
//! | Hard   | 3       |
//! | Good   | 4       |
//! | Easy   | 5       |

use serde::{Deserialize, Serialize};

use super::algorithm::{MAX_QUALITY, PASSING_QUALITY};

// ============================================================================
// QUALITY
// ============================================================================

/// A recall grade on the 0-5 SM-2 scale
///
/// Construction never fails: out-of-range input is clamped so the transition
/// function stays total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "QualityRepr", into = "u8")]
pub struct Quality(u8);

impl Quality {
    /// Lowest grade (complete blackout)
    pub const MIN: Quality = Quality(0);
    /// Highest grade (perfect response)
    pub const MAX: Quality = Quality(MAX_QUALITY);

    /// Clamp an integer into 0..=5
    pub fn new(value: i64) -> Self {
        Quality(value.clamp(0, MAX_QUALITY as i64) as u8)
    }

    /// Floor then clamp a fractional grade. NaN maps to 0.
    pub fn from_f64(value: f64) -> Self {
        if value.is_nan() {
            return Quality::MIN;
        }
        let floored = value.floor();
        if floored <= 0.0 {
            Quality::MIN
        } else if floored >= MAX_QUALITY as f64 {
            Quality::MAX
        } else {
            Quality(floored as u8)
        }
    }

    /// Raw grade value
    pub fn value(self) -> u8 {
        self.0
    }

    /// Whether this grade counts as a successful recall
    pub fn is_passing(self) -> bool {
        self.0 >= PASSING_QUALITY
    }
}

impl From<i64> for Quality {
    fn from(value: i64) -> Self {
        Quality::new(value)
    }
}

impl From<i32> for Quality {
    fn from(value: i32) -> Self {
        Quality::new(i64::from(value))
    }
}

impl From<Quality> for u8 {
    fn from(quality: Quality) -> Self {
        quality.0
    }
}

impl From<Rating> for Quality {
    fn from(rating: Rating) -> Self {
        rating.quality()
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Wire forms accepted for a quality: an integer, a number, or a button label
#[derive(Deserialize)]
#[serde(untagged)]
enum QualityRepr {
    Score(i64),
    Fractional(f64),
    Label(Rating),
}

impl From<QualityRepr> for Quality {
    fn from(repr: QualityRepr) -> Self {
        match repr {
            QualityRepr::Score(v) => Quality::new(v),
            QualityRepr::Fractional(v) => Quality::from_f64(v),
            QualityRepr::Label(r) => r.quality(),
        }
    }
}

// ============================================================================
// RATING
// ============================================================================

/// The four answer buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    /// Forgot the card
    Again,
    /// Recalled with serious difficulty
    Hard,
    /// Recalled after some hesitation
    Good,
    /// Recalled instantly
    Easy,
}

impl Rating {
    /// All buttons, in display order
    pub const ALL: [Rating; 4] = [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy];

    /// Grade this button stands for
    pub fn quality(self) -> Quality {
        match self {
            Rating::Again => Quality(0),
            Rating::Hard => Quality(3),
            Rating::Good => Quality(4),
            Rating::Easy => Quality(5),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::Again => "again",
            Rating::Hard => "hard",
            Rating::Good => "good",
            Rating::Easy => "easy",
        }
    }

    /// Parse a button label, case-insensitively
    pub fn parse_name(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "again" => Some(Rating::Again),
            "hard" => Some(Rating::Hard),
            "good" => Some(Rating::Good),
            "easy" => Some(Rating::Easy),
            _ => None,
        }
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Rating {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Rating::parse_name(s).ok_or_else(|| format!("unknown rating '{}'", s))
    }
}
