//! Backend API.
//!
//! Defines the `PickemApi` trait the slip builder and the binary depend on,
//! and provides the GraphQL implementation used against the real backend.

pub mod graphql;

use anyhow::Result;
use async_trait::async_trait;
use secrecy::SecretString;

use crate::types::{
    Board, BoardDate, Coordinates, CreatorPickInput, MovementSet, PickInput, Profile,
    SlipRecord, SlipSubmission, SubmissionReceipt,
};

/// Abstraction over the pick'em backend.
///
/// Implementors attach whatever credentials they hold; callers never pass
/// tokens explicitly.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PickemApi: Send + Sync {
    /// Today's candidates and their categories.
    async fn todays_board(&self) -> Result<Board>;

    /// The backend's current date (drives "today").
    async fn current_date(&self) -> Result<BoardDate>;

    /// The authenticated user's profile and wallet balance.
    async fn me(&self) -> Result<Profile>;

    /// Submit a paid (or free-to-play) entry.
    async fn create_slip(&self, submission: &SlipSubmission) -> Result<SubmissionReceipt>;

    /// Publish a creator's own slip. Returns the backend's success flag.
    async fn create_creator_slip(&self, picks: &[PickInput]) -> Result<bool>;

    /// Line movements the signed-in creator may unlock today, if granted.
    async fn todays_movements(&self) -> Result<Option<MovementSet>>;

    /// Publish a creator slip whose picks may carry line movements.
    async fn create_creator_sublines(&self, picks: &[CreatorPickInput]) -> Result<bool>;

    /// Whether paid entries are allowed at these coordinates.
    async fn approved_location(&self, coordinates: Coordinates) -> Result<bool>;

    /// Slips with unsettled picks.
    async fn active_slips(&self) -> Result<Vec<SlipRecord>>;

    /// Fully settled slips.
    async fn completed_slips(&self) -> Result<Vec<SlipRecord>>;

    /// Exchange credentials for a session token.
    async fn token_auth(&self, email: &str, password: &SecretString) -> Result<SecretString>;
}
