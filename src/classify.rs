use crate::types::StatusSymbol;
use serde::Deserialize;
use thiserror::Error;

/// A single rule: capacities strictly above `above` map to `status`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Tier {
    pub above: f64,
    pub status: StatusSymbol,
}

#[derive(Debug, Error, PartialEq)]
pub enum ClassifierError {
    #[error("tier threshold {0} is not a finite number")]
    NonFinite(f64),
    #[error("tier thresholds must be strictly descending ({prev} then {next})")]
    NotDescending { prev: f64, next: f64 },
}

/// Ordered rule table evaluated top-down; the first tier whose threshold
/// the capacity strictly exceeds wins, otherwise `Empty`.
#[derive(Debug, Clone, PartialEq)]
pub struct Classifier {
    tiers: Vec<Tier>,
}

const REFRESH_TIERS: [Tier; 4] = [
    Tier {
        above: 90.0,
        status: StatusSymbol::Full,
    },
    Tier {
        above: 70.0,
        status: StatusSymbol::MostlyFull,
    },
    Tier {
        above: 50.0,
        status: StatusSymbol::HalfFull,
    },
    Tier {
        above: 9.0,
        status: StatusSymbol::Free,
    },
];

const INITIAL_RENDER_TIERS: [Tier; 4] = [
    Tier {
        above: 89.0,
        status: StatusSymbol::Full,
    },
    Tier {
        above: 69.0,
        status: StatusSymbol::MostlyFull,
    },
    Tier {
        above: 49.0,
        status: StatusSymbol::HalfFull,
    },
    Tier {
        above: 9.0,
        status: StatusSymbol::Free,
    },
];

impl Classifier {
    pub fn new(tiers: Vec<Tier>) -> Result<Self, ClassifierError> {
        for tier in &tiers {
            if !tier.above.is_finite() {
                return Err(ClassifierError::NonFinite(tier.above));
            }
        }
        for pair in tiers.windows(2) {
            if pair[1].above >= pair[0].above {
                return Err(ClassifierError::NotDescending {
                    prev: pair[0].above,
                    next: pair[1].above,
                });
            }
        }
        Ok(Self { tiers })
    }

    /// The thresholds applied on every periodic refresh. Canonical.
    pub fn refresh() -> Self {
        Self { tiers: REFRESH_TIERS.to_vec() }
    }

    /// The one-point-lower thresholds the first page render used to apply.
    pub fn initial_render() -> Self {
        Self { tiers: INITIAL_RENDER_TIERS.to_vec() }
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    pub fn classify(&self, capacity: f64) -> StatusSymbol {
        self.tiers
            .iter()
            .find(|tier| capacity > tier.above)
            .map(|tier| tier.status)
            .unwrap_or(StatusSymbol::Empty)
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::refresh()
    }
}
