//! Line movements a creator unlocks on individual players.
//!
//! Like [`Slip`], a [`LineMovements`] selection is an immutable value:
//! toggling returns a new selection and a rejected toggle leaves the
//! current one untouched.

use rust_decimal::Decimal;
use tracing::debug;

use super::Slip;
use crate::types::{Candidate, CreatorPickInput, SlipError, Submovement};

/// Players a creator may unlock a line movement on.
pub const MAX_LINE_MOVEMENTS: usize = 4;

/// Progress-bar percent by number of unlocked movements.
const PROGRESS: [u8; MAX_LINE_MOVEMENTS + 1] = [0, 25, 50, 75, 100];

/// A movement applied to one candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct UnlockedMovement {
    pub candidate: Candidate,
    pub submovement: Submovement,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineMovements {
    unlocked: Vec<UnlockedMovement>,
}

impl LineMovements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unlocked(&self) -> &[UnlockedMovement] {
        &self.unlocked
    }

    pub fn count(&self) -> usize {
        self.unlocked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.unlocked.is_empty()
    }

    pub fn progress(&self) -> u8 {
        PROGRESS[self.count().min(MAX_LINE_MOVEMENTS)]
    }

    /// The movement unlocked on a candidate, if any.
    pub fn submovement_for(&self, candidate_id: &str) -> Option<&Submovement> {
        self.unlocked
            .iter()
            .find(|u| u.candidate.id == candidate_id)
            .map(|u| &u.submovement)
    }

    /// The line to display for a candidate: moved when unlocked, projected
    /// otherwise.
    pub fn displayed_value(&self, candidate: &Candidate) -> Decimal {
        match self.submovement_for(&candidate.id) {
            Some(movement) => movement.moved_value(candidate),
            None => candidate.projected_value,
        }
    }

    /// Unlock a movement on a candidate, or remove the one already there.
    pub fn toggle(
        &self,
        candidate: &Candidate,
        submovement: &Submovement,
    ) -> Result<LineMovements, SlipError> {
        let mut next = self.clone();

        match next.unlocked.iter().position(|u| u.candidate.id == candidate.id) {
            Some(idx) => {
                next.unlocked.remove(idx);
                debug!(candidate_id = %candidate.id, "Line movement removed");
            }
            None => {
                if next.unlocked.len() >= MAX_LINE_MOVEMENTS {
                    return Err(SlipError::MovementCapReached);
                }
                next.unlocked.push(UnlockedMovement {
                    candidate: candidate.clone(),
                    submovement: submovement.clone(),
                });
                debug!(candidate_id = %candidate.id, %submovement, "Line movement unlocked");
            }
        }

        Ok(next)
    }

    /// The slip's picks with the movement unlocked on each, if any.
    /// Movements on players that aren't picked are not sent.
    pub fn creator_inputs(&self, slip: &Slip) -> Vec<CreatorPickInput> {
        slip.picks()
            .iter()
            .map(|pick| CreatorPickInput {
                id: pick.id().to_string(),
                under: pick.direction.is_under(),
                submovement_id: self.submovement_for(pick.id()).map(|m| m.id.clone()),
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
