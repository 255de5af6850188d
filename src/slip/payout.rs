//! Payout schedule.
//!
//! The multiplier is determined solely by how many picks are on the slip.
//! This is the product's payout schedule and must not be confused with the
//! fantasy-point scoring table, which is a separate concept.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::fmt;

use super::MAX_PICKS;

/// Multiplier by pick count, index = count.
const MULTIPLIERS: [u32; MAX_PICKS + 1] = [1, 1, 3, 6, 10, 20];

/// Progress-bar percent by pick count, index = count.
const PROGRESS: [u8; MAX_PICKS + 1] = [0, 10, 25, 50, 75, 100];

/// Payout multiplier for a slip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Multiplier(u32);

impl Multiplier {
    /// Multiplier for `count` picks. Counts above the cap use the top tier.
    pub fn for_count(count: usize) -> Self {
        Multiplier(MULTIPLIERS[count.min(MAX_PICKS)])
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    pub fn as_decimal(&self) -> Decimal {
        Decimal::from(self.0)
    }
}

impl fmt::Display for Multiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.0)
    }
}

/// Progress percent shown above the entry form.
pub fn progress_percent(count: usize) -> u8 {
    PROGRESS[count.min(MAX_PICKS)]
}

/// When the multiplier starts applying to the entry amount.
///
/// Below `multiplier_from` picks the payout shows the entry amount as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayoutPolicy {
    pub multiplier_from: usize,
}

impl Default for PayoutPolicy {
    fn default() -> Self {
        Self { multiplier_from: 2 }
    }
}

impl PayoutPolicy {
    /// Payout for an entry at the given pick count; `None` when no entry.
    pub fn payout(&self, entry: Option<u64>, count: usize) -> Option<Decimal> {
        let entry = Decimal::from(entry?);
        if count >= self.multiplier_from {
            Some(entry * Multiplier::for_count(count).as_decimal())
        } else {
            Some(entry)
        }
    }
}

// ---------------------------------------------------------------------------
// Fantasy points
// ---------------------------------------------------------------------------

/// Per-stat weights used for "Fantasy points" lines.
pub const FANTASY_POINT_WEIGHTS: [(&str, Decimal); 6] = [
    ("Point", dec!(1)),
    ("Rebound", dec!(1.2)),
    ("Assist", dec!(1.5)),
    ("Block", dec!(2)),
    ("Steal", dec!(2)),
    ("Turnover", dec!(-1)),
];

/// A box-score line for fantasy-point scoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatLine {
    pub points: u32,
    pub rebounds: u32,
    pub assists: u32,
    pub blocks: u32,
    pub steals: u32,
    pub turnovers: u32,
}

/// Fantasy points for a stat line.
pub fn fantasy_points(stats: &StatLine) -> Decimal {
    let counts = [
        stats.points,
        stats.rebounds,
        stats.assists,
        stats.blocks,
        stats.steals,
        stats.turnovers,
    ];
    FANTASY_POINT_WEIGHTS
        .iter()
        .zip(counts)
        .map(|((_, weight), n)| *weight * Decimal::from(n))
        .sum()
}
