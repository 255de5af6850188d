//! Slip building: pick selection, payout display and submission gating.
//!
//! A [`Slip`] is an immutable value: every command returns a new slip and
//! leaves the receiver untouched, so a rejected command can never corrupt
//! what the user already built. [`builder::SlipBuilder`] owns the current
//! slip, the injected collaborators and the submission state machine.

pub mod builder;
pub mod movement;
pub mod payout;
pub mod validation;

use rust_decimal::Decimal;
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

use crate::types::{Candidate, Direction, Pick, PickInput, SlipError};
use payout::{progress_percent, Multiplier, PayoutPolicy};

/// Maximum number of picks on one slip.
pub const MAX_PICKS: usize = 5;

/// An in-progress slip and its derived display values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Slip {
    picks: Vec<Pick>,
    /// Entry amount exactly as typed (digits only, may be blank).
    entry_text: String,
    entry_amount: Option<u64>,
    payout: Option<Decimal>,
    policy: PayoutPolicy,
}

impl Slip {
    /// An empty slip using the given payout policy.
    pub fn new(policy: PayoutPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn picks(&self) -> &[Pick] {
        &self.picks
    }

    pub fn count(&self) -> usize {
        self.picks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.picks.is_empty()
    }

    pub fn multiplier(&self) -> Multiplier {
        Multiplier::for_count(self.count())
    }

    /// Progress-bar percent for the current pick count.
    pub fn progress(&self) -> u8 {
        progress_percent(self.count())
    }

    pub fn entry_text(&self) -> &str {
        &self.entry_text
    }

    pub fn entry_amount(&self) -> Option<u64> {
        self.entry_amount
    }

    /// `None` renders as a blank payout box.
    pub fn payout(&self) -> Option<Decimal> {
        self.payout
    }

    pub fn policy(&self) -> PayoutPolicy {
        self.policy
    }

    /// The pick for a candidate, if selected.
    pub fn pick(&self, candidate_id: &str) -> Option<&Pick> {
        self.picks.iter().find(|p| p.id() == candidate_id)
    }

    /// Distinct teams represented on the slip.
    pub fn team_count(&self) -> usize {
        self.picks
            .iter()
            .map(|p| p.candidate.team_id())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Serializable `{id, under}` list for submission.
    pub fn to_inputs(&self) -> Vec<PickInput> {
        self.picks.iter().map(Pick::to_input).collect()
    }

    /// Select, flip or deselect a candidate.
    ///
    /// - Already picked in the other direction: flip it in place.
    /// - Already picked in the same direction: remove it.
    /// - Not picked: append, unless the slip is full.
    pub fn toggle_or_update_pick(
        &self,
        candidate: &Candidate,
        direction: Direction,
    ) -> Result<Slip, SlipError> {
        let mut next = self.clone();

        match next.picks.iter().position(|p| p.id() == candidate.id) {
            Some(idx) if next.picks[idx].direction != direction => {
                next.picks[idx].direction = direction;
                debug!(candidate_id = %candidate.id, %direction, "Pick flipped");
            }
            Some(idx) => {
                next.picks.remove(idx);
                debug!(candidate_id = %candidate.id, "Pick removed");
            }
            None => {
                if next.picks.len() >= MAX_PICKS {
                    return Err(SlipError::TooManyPicks);
                }
                next.picks.push(Pick::new(candidate.clone(), direction));
                debug!(candidate_id = %candidate.id, %direction, "Pick added");
            }
        }

        Ok(next.recompute())
    }

    /// Replace the entry amount with raw form input.
    ///
    /// Only digits (or blank) are accepted; anything else is rejected and
    /// the current slip is left as it was.
    pub fn with_entry_amount(&self, raw: &str) -> Result<Slip, SlipError> {
        if !raw.chars().all(|c| c.is_ascii_digit()) {
            return Err(SlipError::InvalidEntryAmount(raw.to_string()));
        }

        let entry_amount = if raw.is_empty() {
            None
        } else {
            // Digits only, so the only failure left is overflow.
            Some(
                raw.parse::<u64>()
                    .map_err(|_| SlipError::InvalidEntryAmount(raw.to_string()))?,
            )
        };

        let mut next = self.clone();
        next.entry_text = raw.to_string();
        next.entry_amount = entry_amount;
        Ok(next.recompute())
    }

    fn recompute(mut self) -> Self {
        self.payout = self.policy.payout(self.entry_amount, self.picks.len());
        self
    }
}

impl fmt::Display for Slip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} picks | {} | {}%",
            self.count(),
            self.multiplier(),
            self.progress(),
        )?;
        if let Some(entry) = self.entry_amount {
            write!(f, " | entry=${entry}")?;
        }
        if let Some(payout) = self.payout {
            write!(f, " | payout=${payout}")?;
        }
        Ok(())
    }
}
