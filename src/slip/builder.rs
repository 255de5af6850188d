//! Slip builder.
//!
//! Owns the current [`Slip`] and the collaborators needed to validate and
//! submit it. Collaborators are injected as trait objects so the builder
//! never reaches for ambient globals.
//!
//! Lifecycle:
//!
//! ```text
//! Empty -> Building -> ReadyToConfirm -> Submitting -> Succeeded
//!                ^                                  \-> Failed --(edit)--> Building
//!                \------------(any edit)-----------/
//! ```
//!
//! `Submitting` only lasts while a submit future is alive. A future dropped
//! before the backend answers leaves the builder `Failed`, since the
//! request may or may not have landed.

use rust_decimal::Decimal;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::movement::LineMovements;
use super::payout::{Multiplier, PayoutPolicy};
use super::{validation, Slip};
use crate::api::PickemApi;
use crate::location::LocationProbe;
use crate::session::SessionStore;
use crate::types::{Candidate, Direction, MovementSet, SlipError, SlipSubmission};

/// Picks a creator must publish at once.
pub const MIN_CREATOR_PICKS: usize = 2;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Client-side rules the builder enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlipRules {
    /// Largest entry amount, whole dollars.
    pub max_entry_amount: u64,
    pub payout: PayoutPolicy,
    /// Query the backend's approved-location check during validation.
    pub check_approved_location: bool,
    /// Daily entry volume the backend enforces, whole dollars.
    pub daily_entry_limit: u64,
}

impl Default for SlipRules {
    fn default() -> Self {
        Self {
            max_entry_amount: 50,
            payout: PayoutPolicy::default(),
            check_approved_location: false,
            daily_entry_limit: 80,
        }
    }
}

// ---------------------------------------------------------------------------
// States & results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlipPhase {
    Empty,
    Building,
    /// Validation passed and nothing changed since; awaiting confirmation.
    ReadyToConfirm,
    Submitting,
    Succeeded { free_to_play: bool },
    Failed,
}

impl fmt::Display for SlipPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlipPhase::Empty => write!(f, "empty"),
            SlipPhase::Building => write!(f, "building"),
            SlipPhase::ReadyToConfirm => write!(f, "ready to confirm"),
            SlipPhase::Submitting => write!(f, "submitting"),
            SlipPhase::Succeeded { .. } => write!(f, "succeeded"),
            SlipPhase::Failed => write!(f, "failed"),
        }
    }
}

/// What the user is asked to confirm after validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Confirmation {
    pub picks: usize,
    pub multiplier: Multiplier,
    pub entry_amount: u64,
    pub payout: Decimal,
    pub creator_code: Option<String>,
    /// Wallet balance, when a session was available to fetch it.
    pub balance: Option<Decimal>,
}

impl fmt::Display for Confirmation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} picks at {}: ${} entry pays ${}",
            self.picks, self.multiplier, self.entry_amount, self.payout,
        )?;
        if let Some(code) = &self.creator_code {
            write!(f, " (creator code: {code})")?;
        }
        Ok(())
    }
}

/// Holds the phase at `Submitting` while a request is out. Dropped without
/// `finish`, the phase becomes `Failed`.
struct InFlight<'a> {
    phase: &'a mut SlipPhase,
}

impl<'a> InFlight<'a> {
    fn start(phase: &'a mut SlipPhase) -> Self {
        *phase = SlipPhase::Submitting;
        Self { phase }
    }

    fn finish(self, outcome: SlipPhase) {
        *self.phase = outcome;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if *self.phase == SlipPhase::Submitting {
            warn!("Submission abandoned before the backend answered");
            *self.phase = SlipPhase::Failed;
        }
    }
}

/// A slip the backend accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Submitted {
    /// The entry was converted to free-to-play (jurisdiction rules).
    pub free_to_play: bool,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

pub struct SlipBuilder {
    api: Arc<dyn PickemApi>,
    session: Arc<dyn SessionStore>,
    location: Arc<dyn LocationProbe>,
    rules: SlipRules,
    slip: Slip,
    movements: LineMovements,
    creator_code: String,
    phase: SlipPhase,
    /// Highlight the entry field; set by amount-related validation failures.
    entry_error: bool,
}

impl SlipBuilder {
    pub fn new(
        api: Arc<dyn PickemApi>,
        session: Arc<dyn SessionStore>,
        location: Arc<dyn LocationProbe>,
        rules: SlipRules,
    ) -> Self {
        Self {
            api,
            session,
            location,
            rules,
            slip: Slip::new(rules.payout),
            movements: LineMovements::new(),
            creator_code: String::new(),
            phase: SlipPhase::Empty,
            entry_error: false,
        }
    }

    pub fn slip(&self) -> &Slip {
        &self.slip
    }

    pub fn movements(&self) -> &LineMovements {
        &self.movements
    }

    pub fn phase(&self) -> SlipPhase {
        self.phase
    }

    pub fn rules(&self) -> &SlipRules {
        &self.rules
    }

    pub fn entry_error(&self) -> bool {
        self.entry_error
    }

    /// Creator code to forward, if one was entered.
    pub fn creator_code(&self) -> Option<String> {
        if self.creator_code.is_empty() {
            None
        } else {
            Some(self.creator_code.clone())
        }
    }

    // -- Editing ---------------------------------------------------------

    /// Select, flip or deselect a candidate (`under` picks the direction).
    pub fn toggle_or_update_pick(
        &mut self,
        candidate: &Candidate,
        under: bool,
    ) -> Result<&Slip, SlipError> {
        match self
            .slip
            .toggle_or_update_pick(candidate, Direction::from_under(under))
        {
            Ok(next) => {
                self.replace(next);
                Ok(&self.slip)
            }
            Err(e) => {
                warn!(candidate_id = %candidate.id, error = %e, "Pick rejected");
                Err(e)
            }
        }
    }

    /// Apply raw entry-amount input. Rejected input leaves everything as is,
    /// including the entry error flag.
    pub fn set_entry_amount(&mut self, raw: &str) -> Result<&Slip, SlipError> {
        let next = self.slip.with_entry_amount(raw)?;
        self.entry_error = false;
        self.replace(next);
        Ok(&self.slip)
    }

    /// Unlock or remove the movement `set` grants for the candidate's
    /// category.
    pub fn toggle_line_movement(
        &mut self,
        candidate: &Candidate,
        set: &MovementSet,
    ) -> Result<&LineMovements, SlipError> {
        let submovement =
            set.for_category(&candidate.category)
                .ok_or_else(|| SlipError::NoLineMovement {
                    category: candidate.category.clone(),
                })?;
        match self.movements.toggle(candidate, submovement) {
            Ok(next) => {
                self.movements = next;
                self.touch();
                Ok(&self.movements)
            }
            Err(e) => {
                warn!(candidate_id = %candidate.id, error = %e, "Line movement rejected");
                Err(e)
            }
        }
    }

    pub fn set_creator_code(&mut self, code: &str) {
        self.creator_code = code.trim().to_string();
        self.touch();
    }

    /// Discard the slip and start over.
    pub fn reset(&mut self) {
        self.slip = Slip::new(self.rules.payout);
        self.movements = LineMovements::new();
        self.phase = SlipPhase::Empty;
        self.entry_error = false;
    }

    fn replace(&mut self, next: Slip) {
        self.slip = next;
        self.touch();
        debug!(slip = %self.slip, phase = %self.phase, "Slip updated");
    }

    /// Any edit invalidates a previous validation.
    fn touch(&mut self) {
        self.phase = if self.slip.is_empty() {
            SlipPhase::Empty
        } else {
            SlipPhase::Building
        };
    }

    // -- Validation ------------------------------------------------------

    /// Run every pre-submission check, stopping at the first failure.
    ///
    /// The slip itself is never modified. On success the builder waits in
    /// `ReadyToConfirm` until `submit` or the next edit.
    pub async fn validate_for_submission(&mut self) -> Result<Confirmation, SlipError> {
        let result = self.run_checks().await;
        match &result {
            Ok(confirmation) => {
                info!(%confirmation, "Slip ready to confirm");
                self.phase = SlipPhase::ReadyToConfirm;
            }
            Err(e) => {
                if matches!(e, SlipError::MissingPayout | SlipError::EntryTooLarge { .. }) {
                    self.entry_error = true;
                }
                warn!(error = %e, "Slip failed validation");
                self.touch();
            }
        }
        result
    }

    async fn run_checks(&self) -> Result<Confirmation, SlipError> {
        let entry = validation::check_local(&self.slip, self.rules.max_entry_amount)?;

        if !self.location.is_available() {
            return Err(SlipError::LocationUnavailable);
        }

        if self.rules.check_approved_location {
            let position = self
                .location
                .current_position()
                .await
                .ok_or(SlipError::LocationUnavailable)?;
            let approved = self
                .api
                .approved_location(position)
                .await
                .map_err(SlipError::backend)?;
            if !approved {
                return Err(SlipError::LocationNotApproved);
            }
        }

        let balance = if self.session.is_active() {
            let profile = self.api.me().await.map_err(SlipError::backend)?;
            validation::check_funds(entry, profile.wallet_balance)?;
            Some(profile.wallet_balance)
        } else {
            debug!("No active session, wallet check skipped");
            None
        };

        Ok(Confirmation {
            picks: self.slip.count(),
            multiplier: self.slip.multiplier(),
            entry_amount: entry,
            payout: self.slip.payout().unwrap_or(Decimal::ZERO),
            creator_code: self.creator_code(),
            balance,
        })
    }

    // -- Submission ------------------------------------------------------

    /// Submit the confirmed slip.
    ///
    /// Success discards the slip. A rejection or transport failure leaves
    /// it intact for the user to adjust; nothing is retried.
    pub async fn submit(&mut self) -> Result<Submitted, SlipError> {
        if self.phase != SlipPhase::ReadyToConfirm {
            return Err(SlipError::NotValidated);
        }
        if !self.session.is_active() {
            return Err(SlipError::NotSignedIn);
        }
        validation::check_team_diversity(&self.slip)?;
        let entry_amount = self.slip.entry_amount().ok_or(SlipError::MissingPayout)?;

        let submission = SlipSubmission {
            picks: self.slip.to_inputs(),
            entry_amount,
            creator_code: self.creator_code(),
        };

        let attempt_id = Uuid::new_v4();
        info!(
            %attempt_id,
            picks = submission.picks.len(),
            entry_amount,
            creator_code = ?submission.creator_code,
            "Submitting slip"
        );

        let in_flight = InFlight::start(&mut self.phase);
        match self.api.create_slip(&submission).await {
            Ok(receipt) if receipt.success => {
                info!(%attempt_id, free_to_play = receipt.free_to_play, "Slip accepted");
                in_flight.finish(SlipPhase::Succeeded {
                    free_to_play: receipt.free_to_play,
                });
                self.slip = Slip::new(self.rules.payout);
                self.entry_error = false;
                Ok(Submitted {
                    free_to_play: receipt.free_to_play,
                })
            }
            Ok(_) => {
                warn!(%attempt_id, "Slip rejected by backend");
                in_flight.finish(SlipPhase::Failed);
                Err(SlipError::SubmissionRejected {
                    daily_limit: self.rules.daily_entry_limit,
                })
            }
            Err(e) => {
                warn!(%attempt_id, error = %e, "Slip submission failed");
                in_flight.finish(SlipPhase::Failed);
                Err(SlipError::backend(e))
            }
        }
    }

    /// Publish the current picks as the creator's own slip.
    ///
    /// No entry amount is involved, so the payout, ceiling and wallet
    /// checks don't apply. Picks carry their unlocked line movements when
    /// there are any.
    pub async fn submit_creator_slip(&mut self) -> Result<(), SlipError> {
        if self.slip.count() < MIN_CREATOR_PICKS {
            return Err(SlipError::NotEnoughPicks {
                required: MIN_CREATOR_PICKS,
            });
        }
        if !self.session.is_active() {
            return Err(SlipError::NotSignedIn);
        }

        info!(
            picks = self.slip.count(),
            movements = self.movements.count(),
            "Publishing creator slip"
        );

        let in_flight = InFlight::start(&mut self.phase);
        let published = if self.movements.is_empty() {
            self.api.create_creator_slip(&self.slip.to_inputs()).await
        } else {
            let picks = self.movements.creator_inputs(&self.slip);
            self.api.create_creator_sublines(&picks).await
        };

        match published {
            Ok(true) => {
                in_flight.finish(SlipPhase::Succeeded {
                    free_to_play: false,
                });
                self.slip = Slip::new(self.rules.payout);
                self.movements = LineMovements::new();
                Ok(())
            }
            Ok(false) => {
                warn!("Creator slip rejected by backend");
                in_flight.finish(SlipPhase::Failed);
                Err(SlipError::PublishRejected)
            }
            Err(e) => {
                warn!(error = %e, "Creator slip submission failed");
                in_flight.finish(SlipPhase::Failed);
                Err(SlipError::backend(e))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
