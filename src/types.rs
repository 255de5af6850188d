//! Shared types for the UNDERLINE client.
//!
//! These types form the data model used across all modules. The API
//! layer converts wire responses into them, the slip builder consumes
//! them, and the binary renders them.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

/// A featured player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub name: String,
    pub headshot_url: Option<String>,
    pub team_id: String,
}

/// The game a line belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub starts_at: DateTime<Utc>,
    pub home_team: String,
    pub away_team: String,
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @ {} - {}",
            self.away_team,
            self.home_team,
            self.starts_at.format("%-I:%M%P UTC"),
        )
    }
}

/// A selectable projection line (a "subline" on the backend).
///
/// Immutable once fetched; picks reference it by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub player: Player,
    /// Statistical category, e.g. "Points" or "Fantasy points".
    pub category: String,
    pub projected_value: Decimal,
    pub game: Game,
}

impl Candidate {
    /// Team the candidate's player belongs to.
    pub fn team_id(&self) -> &str {
        &self.player.team_id
    }

    /// Helper to build a test candidate with sensible defaults.
    #[cfg(test)]
    pub fn sample(id: &str, team_id: &str) -> Self {
        use rust_decimal_macros::dec;

        Candidate {
            id: id.to_string(),
            player: Player {
                id: format!("player-{id}"),
                name: format!("Player {id}"),
                headshot_url: None,
                team_id: team_id.to_string(),
            },
            category: "Points".to_string(),
            projected_value: dec!(24.5),
            game: Game {
                starts_at: Utc::now() + chrono::Duration::hours(4),
                home_team: "LAL".to_string(),
                away_team: "BOS".to_string(),
            },
        }
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {}: {:.1} ({})",
            self.id, self.player.name, self.category, self.projected_value, self.game,
        )
    }
}

/// Today's candidates plus the categories they are grouped under.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Board {
    pub candidates: Vec<Candidate>,
    pub categories: Vec<String>,
}

impl Board {
    /// Look up a candidate by id.
    pub fn candidate(&self, id: &str) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.id == id)
    }

    /// Candidates grouped by category, in category order. Categories with
    /// no candidates are kept so a tab can still be rendered for them.
    pub fn by_category(&self) -> Vec<(&str, Vec<&Candidate>)> {
        self.categories
            .iter()
            .map(|cat| {
                let lines = self
                    .candidates
                    .iter()
                    .filter(|c| &c.category == cat)
                    .collect();
                (cat.as_str(), lines)
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Picks
// ---------------------------------------------------------------------------

/// Pick direction relative to the projected value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Over,
    Under,
}

impl Direction {
    /// Wire form: the backend takes a boolean `under` flag.
    pub fn from_under(under: bool) -> Self {
        if under {
            Direction::Under
        } else {
            Direction::Over
        }
    }

    pub fn is_under(&self) -> bool {
        matches!(self, Direction::Under)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Over => write!(f, "Over"),
            Direction::Under => write!(f, "Under"),
        }
    }
}

/// Parse "over"/"under" (case-insensitive, single-letter accepted).
impl std::str::FromStr for Direction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "over" | "o" => Ok(Direction::Over),
            "under" | "u" => Ok(Direction::Under),
            _ => Err(anyhow::anyhow!("Unknown pick direction: {s}")),
        }
    }
}

/// A candidate plus the chosen direction, as held in a slip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pick {
    pub candidate: Candidate,
    pub direction: Direction,
}

impl Pick {
    pub fn new(candidate: Candidate, direction: Direction) -> Self {
        Self {
            candidate,
            direction,
        }
    }

    pub fn id(&self) -> &str {
        &self.candidate.id
    }

    /// Serializable form sent with slip mutations.
    pub fn to_input(&self) -> PickInput {
        PickInput {
            id: self.candidate.id.clone(),
            under: self.direction.is_under(),
        }
    }
}

impl fmt::Display for Pick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {:.1} {}",
            self.candidate.player.name,
            self.direction,
            self.candidate.projected_value,
            self.candidate.category,
        )
    }
}

/// `{id, under}` pair as accepted by `createSlip` / `createCreatorSlip`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickInput {
    pub id: String,
    pub under: bool,
}

/// A creator pick with an optional line movement, as accepted by
/// `createCreatorSublines`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatorPickInput {
    pub id: String,
    pub under: bool,
    pub submovement_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Line movements
// ---------------------------------------------------------------------------

/// A line shift a creator may unlock on players of one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submovement {
    pub id: String,
    pub category: String,
    /// Added to the projected value; negative moves the line down.
    pub swing: Decimal,
    pub minimum: Option<Decimal>,
}

impl Submovement {
    /// The line a candidate shows once this movement is unlocked on it.
    pub fn moved_value(&self, candidate: &Candidate) -> Decimal {
        candidate.projected_value + self.swing
    }
}

impl fmt::Display for Submovement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.swing.is_sign_negative() {
            write!(f, "{} {:.1}", self.category, self.swing)
        } else {
            write!(f, "{} +{:.1}", self.category, self.swing)
        }
    }
}

/// The line movements granted to a creator for today.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementSet {
    pub id: String,
    pub creator_name: Option<String>,
    pub submovements: Vec<Submovement>,
}

impl MovementSet {
    /// The movement available for a category, if any.
    pub fn for_category(&self, category: &str) -> Option<&Submovement> {
        self.submovements.iter().find(|m| m.category == category)
    }
}

// ---------------------------------------------------------------------------
// Account & submission
// ---------------------------------------------------------------------------

/// The authenticated user's profile and wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub first_name: String,
    pub last_name: String,
    pub username: Option<String>,
    pub wallet_balance: Decimal,
}

impl Profile {
    /// "First L." as shown in the navigation menu.
    pub fn short_name(&self) -> String {
        match self.last_name.chars().next() {
            Some(initial) => format!("{} {initial}.", self.first_name),
            None => self.first_name.clone(),
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (balance: ${})", self.short_name(), self.wallet_balance.round())
    }
}

/// Everything `createSlip` needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlipSubmission {
    pub picks: Vec<PickInput>,
    pub entry_amount: u64,
    pub creator_code: Option<String>,
}

/// Result of `createSlip`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub success: bool,
    #[serde(default)]
    pub free_to_play: bool,
}

/// Latitude/longitude pair for the approved-location query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

// ---------------------------------------------------------------------------
// Slip history
// ---------------------------------------------------------------------------

/// A pick on a submitted slip, with its settlement result once known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedPick {
    pub id: String,
    pub player_name: String,
    pub line_value: Decimal,
    pub direction: Direction,
    pub actual_value: Option<Decimal>,
    /// `None` while the game is in progress.
    pub won: Option<bool>,
    #[serde(default)]
    pub invalidated: bool,
}

impl fmt::Display for RecordedPick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = match self.won {
            None => "In progress",
            Some(true) => "Won",
            Some(false) => "Lost",
        };
        write!(
            f,
            "{} {} {:.1} [{result}]",
            self.player_name, self.direction, self.line_value,
        )?;
        if let Some(actual) = self.actual_value {
            write!(f, " ({} scored)", actual.trunc())?;
        }
        Ok(())
    }
}

/// Aggregate settlement state of a submitted slip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlipStatus {
    InProgress,
    Won,
    Lost,
    /// Every pick was invalidated.
    Void,
}

impl fmt::Display for SlipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlipStatus::InProgress => write!(f, "In progress"),
            SlipStatus::Won => write!(f, "Won"),
            SlipStatus::Lost => write!(f, "Lost"),
            SlipStatus::Void => write!(f, "Void"),
        }
    }
}

/// A submitted slip as returned by the active/completed queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlipRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub entry_amount: Option<Decimal>,
    pub payout_amount: Option<Decimal>,
    #[serde(default)]
    pub free_to_play: bool,
    pub creator_code: Option<String>,
    pub picks: Vec<RecordedPick>,
}

impl SlipRecord {
    /// In progress while any pick is unsettled; otherwise won only if every
    /// pick won. Invalidated picks are ignored, and a slip with nothing
    /// else left is void.
    pub fn status(&self) -> SlipStatus {
        let live: Vec<&RecordedPick> = self.picks.iter().filter(|p| !p.invalidated).collect();
        if live.is_empty() {
            SlipStatus::Void
        } else if live.iter().any(|p| p.won.is_none()) {
            SlipStatus::InProgress
        } else if live.iter().all(|p| p.won == Some(true)) {
            SlipStatus::Won
        } else {
            SlipStatus::Lost
        }
    }
}

impl fmt::Display for SlipRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Picks", self.picks.len())?;
        if let Some(payout) = self.payout_amount {
            write!(f, " for ${payout}")?;
        }
        write!(
            f,
            " | {} | {} | {}",
            if self.free_to_play { "Free to Play" } else { "Paid Entry" },
            self.status(),
            self.created_at.format("%B %-d %Y"),
        )
    }
}

/// The backend's notion of "today" for the lobby header.
pub type BoardDate = NaiveDate;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// User-facing slip errors. None are fatal: the builder stays editable
/// after any of them.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SlipError {
    #[error("You can only choose five picks.")]
    TooManyPicks,

    #[error("Entry amount must contain digits only: {0:?}")]
    InvalidEntryAmount(String),

    #[error("Enter an entry amount to see your payout.")]
    MissingPayout,

    #[error("We only allow a maximum of ${ceiling} for entry")]
    EntryTooLarge { ceiling: u64 },

    #[error("You must select picks that span at least two teams.")]
    InsufficientTeamDiversity { teams: usize },

    #[error("We need to verify your location. Please enable location access.")]
    LocationUnavailable,

    #[error("Paid entries are not available in your location.")]
    LocationNotApproved,

    #[error("Insufficient funds: need ${needed}, have ${available}. Please deposit to continue.")]
    InsufficientFunds { needed: Decimal, available: Decimal },

    #[error("You cannot submit wagers over ${daily_limit} for a single day.")]
    SubmissionRejected { daily_limit: u64 },

    #[error("Your slip could not be published.")]
    PublishRejected,

    #[error("You can only unlock line movements on four players.")]
    MovementCapReached,

    #[error("No line movement is available for {category}.")]
    NoLineMovement { category: String },

    #[error("Sign up or log in to submit a slip.")]
    NotSignedIn,

    #[error("Review your slip before submitting.")]
    NotValidated,

    #[error("Select at least {required} picks.")]
    NotEnoughPicks { required: usize },

    #[error("Something went wrong talking to the server: {0}")]
    Backend(String),
}

impl SlipError {
    /// Short heading for the modal that surfaces this error.
    pub fn header(&self) -> String {
        match self {
            SlipError::TooManyPicks => "Too many picks".to_string(),
            SlipError::InvalidEntryAmount(_) | SlipError::MissingPayout => {
                "Check your entry amount".to_string()
            }
            SlipError::EntryTooLarge { ceiling } => format!("Max ${ceiling} entry"),
            SlipError::InsufficientTeamDiversity { .. } => "Two teams must be involved".to_string(),
            SlipError::LocationUnavailable => "Please enable location access".to_string(),
            SlipError::LocationNotApproved => "Location not eligible".to_string(),
            SlipError::InsufficientFunds { .. } => "Insufficient funds".to_string(),
            SlipError::SubmissionRejected { daily_limit } => {
                format!("${daily_limit} daily entry volume limit")
            }
            SlipError::PublishRejected => "Slip not published".to_string(),
            SlipError::MovementCapReached => "You've hit the cap!".to_string(),
            SlipError::NoLineMovement { .. } => "No line movement".to_string(),
            SlipError::NotSignedIn => "Sign up".to_string(),
            SlipError::NotValidated => "Review picks".to_string(),
            SlipError::NotEnoughPicks { .. } => "Not enough picks".to_string(),
            SlipError::Backend(_) => "Something went wrong".to_string(),
        }
    }

    /// Whether the user should be sent to the deposit flow.
    pub fn needs_deposit(&self) -> bool {
        matches!(self, SlipError::InsufficientFunds { .. })
    }

    /// Wrap an infrastructure error, keeping its context chain.
    pub fn backend(err: anyhow::Error) -> Self {
        SlipError::Backend(format!("{err:#}"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
