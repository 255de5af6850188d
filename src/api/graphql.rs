//! GraphQL client for the pick'em backend.
//!
//! Every operation is a POST of `{query, variables}` to a single endpoint.
//! When the session store holds an unexpired token it is sent as
//! `Authorization: JWT <token>`. Wire shapes are deserialized into private
//! structs and converted into `crate::types` before leaving this module.
//!
//! Decimal fields (wallet balance, projected values, amounts) arrive either
//! as JSON strings or numbers depending on the resolver, so they go through
//! [`money`] rather than `rust_decimal`'s own serde impl.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::PickemApi;
use crate::config::ApiConfig;
use crate::session::SessionStore;
use crate::types::{
    Board, BoardDate, Candidate, Coordinates, CreatorPickInput, Direction, Game, MovementSet,
    PickInput, Player, Profile, RecordedPick, SlipRecord, SlipSubmission, Submovement,
    SubmissionReceipt,
};

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

const BOARD_QUERY: &str = r#"
query TodaysBoard($league: String!) {
    todaysSublines {
        id
        projectedValue
        line {
            id
            category { id category }
            player { id name headshotUrl team { id } }
            game { datetime homeTeam { abbreviation } awayTeam { abbreviation } }
        }
    }
    lineCategories(league: $league) { id category }
}"#;

const CURRENT_DATE_QUERY: &str = "query currentDate { currentDate }";

const ME_QUERY: &str = "query { me { firstName lastName username walletBalance } }";

const APPROVED_LOCATION_QUERY: &str = r#"
query ApprovedLocation($lat: Float!, $lng: Float!) {
    approvedLocation(lat: $lat, lng: $lng)
}"#;

const CREATE_SLIP_MUTATION: &str = r#"
mutation CreateSlip($picks: [PickType]!, $entryAmount: Int!, $creatorCode: String) {
    createSlip(picks: $picks, entryAmount: $entryAmount, creatorCode: $creatorCode) {
        success
        freeToPlay
    }
}"#;

const CREATE_CREATOR_SLIP_MUTATION: &str = r#"
mutation CreateCreatorSlip($picks: [PickType]!) {
    createCreatorSlip(picks: $picks) { success }
}"#;

const MOVEMENTS_QUERY: &str = r#"
query MyMovementsForToday {
    myMovementsForToday {
        id
        submovementSet { id swing minimum category { id category } }
        creator { id firstName }
    }
}"#;

const CREATE_CREATOR_SUBLINES_MUTATION: &str = r#"
mutation CreateCreatorSublines($picks: [SuperPickType]!) {
    createCreatorSublines(picks: $picks) { success }
}"#;

const TOKEN_AUTH_MUTATION: &str = r#"
mutation TokenAuth($email: String!, $password: String!) {
    tokenAuth(email: $email, password: $password) { token }
}"#;

/// Selection shared by the active and completed slip queries.
const SLIP_FIELDS: &str = r#"
    id
    datetimeCreated
    entryAmount
    payoutAmount
    freeToPlay
    creatorCode
    picks {
        id
        underNbaPoints
        won
        subline {
            nbaPointsLine
            line { id nbaPointsActual invalidated player { name } }
        }
    }"#;

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct GraphqlRequest<'a> {
    query: &'a str,
    variables: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

impl<T> GraphqlResponse<T> {
    /// Errors win over partial data.
    fn into_data(self, operation: &str) -> Result<T> {
        if !self.errors.is_empty() {
            let messages: Vec<&str> = self.errors.iter().map(|e| e.message.as_str()).collect();
            anyhow::bail!("{operation} failed: {}", messages.join("; "));
        }
        self.data
            .with_context(|| format!("{operation} returned no data"))
    }
}

// ---------------------------------------------------------------------------
// Wire types (backend JSON → Rust)
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(untagged)]
enum WireNumber {
    Text(String),
    Number(f64),
}

impl WireNumber {
    fn into_decimal<E: serde::de::Error>(self) -> Result<Decimal, E> {
        match self {
            WireNumber::Text(s) => s.trim().parse::<Decimal>().map_err(E::custom),
            WireNumber::Number(n) => Decimal::try_from(n).map_err(E::custom),
        }
    }
}

fn money<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
    WireNumber::deserialize(deserializer)?.into_decimal()
}

fn optional_money<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Decimal>, D::Error> {
    Option::<WireNumber>::deserialize(deserializer)?
        .map(WireNumber::into_decimal::<D::Error>)
        .transpose()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BoardData {
    todays_sublines: Vec<WireSubline>,
    line_categories: Vec<WireCategory>,
}

#[derive(Debug, Deserialize)]
struct WireCategory {
    category: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSubline {
    id: String,
    #[serde(deserialize_with = "money")]
    projected_value: Decimal,
    line: WireLine,
}

#[derive(Debug, Deserialize)]
struct WireLine {
    category: WireCategory,
    player: WirePlayer,
    game: WireGame,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePlayer {
    id: String,
    name: String,
    #[serde(default)]
    headshot_url: Option<String>,
    team: WireTeamId,
}

#[derive(Debug, Deserialize)]
struct WireTeamId {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireGame {
    datetime: DateTime<Utc>,
    home_team: WireTeamAbbreviation,
    away_team: WireTeamAbbreviation,
}

#[derive(Debug, Deserialize)]
struct WireTeamAbbreviation {
    abbreviation: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CurrentDateData {
    current_date: String,
}

#[derive(Debug, Deserialize)]
struct MeData {
    me: Option<WireProfile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireProfile {
    first_name: String,
    last_name: String,
    #[serde(default)]
    username: Option<String>,
    #[serde(deserialize_with = "money")]
    wallet_balance: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApprovedLocationData {
    approved_location: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSlipData {
    create_slip: Option<SubmissionReceipt>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateCreatorSlipData {
    create_creator_slip: Option<WireSuccess>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateCreatorSublinesData {
    create_creator_sublines: Option<WireSuccess>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MovementsData {
    #[serde(default)]
    my_movements_for_today: Vec<WireMovement>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMovement {
    id: String,
    #[serde(default)]
    submovement_set: Vec<WireSubmovement>,
    #[serde(default)]
    creator: Option<WireCreator>,
}

#[derive(Debug, Deserialize)]
struct WireSubmovement {
    id: String,
    #[serde(deserialize_with = "money")]
    swing: Decimal,
    #[serde(default, deserialize_with = "optional_money")]
    minimum: Option<Decimal>,
    category: WireCategory,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCreator {
    first_name: String,
}

#[derive(Debug, Deserialize)]
struct WireSuccess {
    success: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenAuthData {
    token_auth: Option<WireToken>,
}

#[derive(Debug, Deserialize)]
struct WireToken {
    token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActiveSlipsData {
    active_slips: Vec<WireSlip>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InactiveSlipsData {
    inactive_slips: Vec<WireSlip>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSlip {
    id: String,
    datetime_created: DateTime<Utc>,
    #[serde(default, deserialize_with = "optional_money")]
    entry_amount: Option<Decimal>,
    #[serde(default, deserialize_with = "optional_money")]
    payout_amount: Option<Decimal>,
    #[serde(default)]
    free_to_play: bool,
    #[serde(default)]
    creator_code: Option<String>,
    picks: Vec<WirePick>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePick {
    id: String,
    under_nba_points: bool,
    #[serde(default)]
    won: Option<bool>,
    subline: WirePickSubline,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePickSubline {
    #[serde(deserialize_with = "money")]
    nba_points_line: Decimal,
    line: WirePickLine,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePickLine {
    #[serde(default, deserialize_with = "optional_money")]
    nba_points_actual: Option<Decimal>,
    #[serde(default)]
    invalidated: bool,
    player: WirePlayerName,
}

#[derive(Debug, Deserialize)]
struct WirePlayerName {
    name: String,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

fn to_board(data: BoardData) -> Board {
    let candidates = data
        .todays_sublines
        .into_iter()
        .map(|s| Candidate {
            id: s.id,
            player: Player {
                id: s.line.player.id,
                name: s.line.player.name,
                headshot_url: s.line.player.headshot_url,
                team_id: s.line.player.team.id,
            },
            category: s.line.category.category,
            projected_value: s.projected_value,
            game: Game {
                starts_at: s.line.game.datetime,
                home_team: s.line.game.home_team.abbreviation,
                away_team: s.line.game.away_team.abbreviation,
            },
        })
        .collect();

    Board {
        candidates,
        categories: data.line_categories.into_iter().map(|c| c.category).collect(),
    }
}

fn to_profile(wire: WireProfile) -> Profile {
    Profile {
        first_name: wire.first_name,
        last_name: wire.last_name,
        username: wire.username,
        wallet_balance: wire.wallet_balance,
    }
}

fn to_slip_record(wire: WireSlip) -> SlipRecord {
    SlipRecord {
        id: wire.id,
        created_at: wire.datetime_created,
        entry_amount: wire.entry_amount,
        payout_amount: wire.payout_amount,
        free_to_play: wire.free_to_play,
        creator_code: wire.creator_code.filter(|c| !c.is_empty()),
        picks: wire
            .picks
            .into_iter()
            .map(|p| RecordedPick {
                id: p.id,
                player_name: p.subline.line.player.name,
                line_value: p.subline.nba_points_line,
                direction: Direction::from_under(p.under_nba_points),
                actual_value: p.subline.line.nba_points_actual,
                won: p.won,
                invalidated: p.subline.line.invalidated,
            })
            .collect(),
    }
}

/// A creator gets at most one movement set per day; the first is used.
fn to_movement_set(data: MovementsData) -> Option<MovementSet> {
    data.my_movements_for_today.into_iter().next().map(|m| MovementSet {
        id: m.id,
        creator_name: m.creator.map(|c| c.first_name),
        submovements: m
            .submovement_set
            .into_iter()
            .map(|s| Submovement {
                id: s.id,
                category: s.category.category,
                swing: s.swing,
                minimum: s.minimum,
            })
            .collect(),
    })
}

/// Accepts `YYYY-MM-DD` or a full ISO timestamp.
fn parse_board_date(raw: &str) -> Result<BoardDate> {
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .with_context(|| format!("Unrecognised currentDate: {raw}"))
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// HTTP client for the backend's GraphQL endpoint.
pub struct GraphqlClient {
    http: Client,
    endpoint: String,
    league: String,
    session: Arc<dyn SessionStore>,
}

impl GraphqlClient {
    pub fn new(config: &ApiConfig, session: Arc<dyn SessionStore>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .build()
            .context("Failed to build HTTP client for the GraphQL API")?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            league: config.league.clone(),
            session,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Run one operation and return its typed `data`.
    async fn execute<T: DeserializeOwned>(
        &self,
        operation: &str,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T> {
        let mut request = self.http.post(&self.endpoint).json(&GraphqlRequest {
            query,
            variables,
        });

        if self.session.is_active() {
            if let Some(token) = self.session.get() {
                request = request.header(
                    reqwest::header::AUTHORIZATION,
                    format!("JWT {}", token.expose_secret()),
                );
            }
        }

        debug!(operation, endpoint = %self.endpoint, "GraphQL request");

        let resp = request
            .send()
            .await
            .with_context(|| format!("{operation} request failed"))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("{operation} HTTP error {status}: {body}");
        }

        let envelope: GraphqlResponse<T> = resp
            .json()
            .await
            .with_context(|| format!("Failed to parse {operation} response"))?;

        envelope.into_data(operation)
    }
}

#[async_trait]
impl PickemApi for GraphqlClient {
    async fn todays_board(&self) -> Result<Board> {
        let data: BoardData = self
            .execute("todaysSublines", BOARD_QUERY, json!({ "league": self.league }))
            .await?;
        let board = to_board(data);
        info!(
            candidates = board.candidates.len(),
            categories = board.categories.len(),
            "Fetched today's board"
        );
        Ok(board)
    }

    async fn current_date(&self) -> Result<BoardDate> {
        let data: CurrentDateData = self
            .execute("currentDate", CURRENT_DATE_QUERY, json!({}))
            .await?;
        parse_board_date(&data.current_date)
    }

    async fn me(&self) -> Result<Profile> {
        let data: MeData = self.execute("me", ME_QUERY, json!({})).await?;
        let profile = data.me.context("me returned null; the session is not signed in")?;
        Ok(to_profile(profile))
    }

    async fn create_slip(&self, submission: &SlipSubmission) -> Result<SubmissionReceipt> {
        let variables = serde_json::to_value(submission).context("Failed to encode slip")?;
        let data: CreateSlipData = self
            .execute("createSlip", CREATE_SLIP_MUTATION, variables)
            .await?;
        let receipt = data
            .create_slip
            .context("createSlip returned null")?;
        info!(
            success = receipt.success,
            free_to_play = receipt.free_to_play,
            "createSlip answered"
        );
        Ok(receipt)
    }

    async fn create_creator_slip(&self, picks: &[PickInput]) -> Result<bool> {
        let data: CreateCreatorSlipData = self
            .execute(
                "createCreatorSlip",
                CREATE_CREATOR_SLIP_MUTATION,
                json!({ "picks": picks }),
            )
            .await?;
        Ok(data.create_creator_slip.is_some_and(|r| r.success))
    }

    async fn todays_movements(&self) -> Result<Option<MovementSet>> {
        let data: MovementsData = self
            .execute("myMovementsForToday", MOVEMENTS_QUERY, json!({}))
            .await?;
        let movements = to_movement_set(data);
        debug!(
            granted = movements.is_some(),
            submovements = movements.as_ref().map_or(0, |m| m.submovements.len()),
            "Fetched line movements"
        );
        Ok(movements)
    }

    async fn create_creator_sublines(&self, picks: &[CreatorPickInput]) -> Result<bool> {
        let data: CreateCreatorSublinesData = self
            .execute(
                "createCreatorSublines",
                CREATE_CREATOR_SUBLINES_MUTATION,
                json!({ "picks": picks }),
            )
            .await?;
        Ok(data.create_creator_sublines.is_some_and(|r| r.success))
    }

    async fn approved_location(&self, coordinates: Coordinates) -> Result<bool> {
        let data: ApprovedLocationData = self
            .execute(
                "approvedLocation",
                APPROVED_LOCATION_QUERY,
                json!({ "lat": coordinates.lat, "lng": coordinates.lng }),
            )
            .await?;
        if !data.approved_location {
            warn!(lat = coordinates.lat, lng = coordinates.lng, "Location not approved");
        }
        Ok(data.approved_location)
    }

    async fn active_slips(&self) -> Result<Vec<SlipRecord>> {
        let query = format!("query {{ activeSlips {{ {SLIP_FIELDS} }} }}");
        let data: ActiveSlipsData = self.execute("activeSlips", &query, json!({})).await?;
        Ok(data.active_slips.into_iter().map(to_slip_record).collect())
    }

    async fn completed_slips(&self) -> Result<Vec<SlipRecord>> {
        let query = format!("query {{ inactiveSlips {{ {SLIP_FIELDS} }} }}");
        let data: InactiveSlipsData = self.execute("inactiveSlips", &query, json!({})).await?;
        Ok(data.inactive_slips.into_iter().map(to_slip_record).collect())
    }

    async fn token_auth(&self, email: &str, password: &SecretString) -> Result<SecretString> {
        let data: TokenAuthData = self
            .execute(
                "tokenAuth",
                TOKEN_AUTH_MUTATION,
                json!({ "email": email, "password": password.expose_secret() }),
            )
            .await?;
        let token = data.token_auth.context("tokenAuth returned null")?;
        info!(email, "Signed in");
        Ok(SecretString::new(token.token))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
