//! Award resolution: turning a configured catalog into one outcome per play.
//!
//! Instant-win prizes are trialled independently in list order and the first hit wins. Wheel
//! segments are picked by weight among those with supply left. Consumed counters are owned by the
//! caller; these functions only read them.

use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::catalog::{InstantPrizeRecord, WheelSegmentRecord};

/// How a configured cap of zero is read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZeroCapPolicy {
    /// Zero wins allowed: the outcome is never awarded.
    #[default]
    Disabled,
    /// The cap is switched off: unlimited wins.
    Unlimited,
}

impl FromStr for ZeroCapPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disabled" => Ok(ZeroCapPolicy::Disabled),
            "unlimited" => Ok(ZeroCapPolicy::Unlimited),
            other => Err(format!(
                "unknown zero-cap policy: {other} (expected disabled or unlimited)"
            )),
        }
    }
}

impl fmt::Display for ZeroCapPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZeroCapPolicy::Disabled => f.write_str("disabled"),
            ZeroCapPolicy::Unlimited => f.write_str("unlimited"),
        }
    }
}

/// Supply limit of one outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SupplyCap {
    Unlimited,
    Limited(u64),
    Disabled,
}

impl SupplyCap {
    pub fn from_raw(raw: Option<u64>, policy: ZeroCapPolicy) -> Self {
        match (raw, policy) {
            (None, _) => SupplyCap::Unlimited,
            (Some(0), ZeroCapPolicy::Disabled) => SupplyCap::Disabled,
            (Some(0), ZeroCapPolicy::Unlimited) => SupplyCap::Unlimited,
            (Some(limit), _) => SupplyCap::Limited(limit),
        }
    }

    /// Remaining supply, or `None` when unlimited.
    pub fn remaining(&self, consumed: u64) -> Option<u64> {
        match self {
            SupplyCap::Unlimited => None,
            SupplyCap::Limited(limit) => Some(limit.saturating_sub(consumed)),
            SupplyCap::Disabled => Some(0),
        }
    }

    pub fn is_available(&self, consumed: u64) -> bool {
        self.remaining(consumed).map_or(true, |remaining| remaining > 0)
    }
}

/// Resolves one instant-win entry, returning the index of the awarded prize.
///
/// Prizes are trialled in list order, each with its own odds; the first hit wins and later prizes
/// are not trialled. `None` is a losing play.
pub fn resolve_instant<R: Rng>(
    prizes: &[InstantPrizeRecord],
    policy: ZeroCapPolicy,
    rng: &mut R,
) -> Option<usize> {
    prizes.iter().position(|prize| {
        let cap = SupplyCap::from_raw(prize.quantity_available, policy);
        cap.is_available(prize.quantity_won)
            && prize.odds > 0.0
            && rng.gen_bool(prize.odds.clamp(0.0, 1.0))
    })
}

/// Picks one wheel segment by weight among segments that are enabled and have supply left.
///
/// Exhausted segments are dropped and the remaining weights re-normalized. `None` when nothing
/// can be awarded.
pub fn resolve_wheel<R: Rng>(
    segments: &[WheelSegmentRecord],
    policy: ZeroCapPolicy,
    rng: &mut R,
) -> Option<usize> {
    let candidates: Vec<(usize, f64)> = segments
        .iter()
        .enumerate()
        .filter(|(_, segment)| {
            segment.probability > 0.0
                && SupplyCap::from_raw(segment.max_wins, policy).is_available(segment.current_wins)
        })
        .map(|(index, segment)| (index, segment.probability))
        .collect();
    let distribution = WeightedIndex::new(candidates.iter().map(|(_, weight)| *weight)).ok()?;
    Some(candidates[distribution.sample(rng)].0)
}
