//! UNDERLINE — daily fantasy pick'em slip builder
//!
//! Entry point. Loads configuration, initialises structured logging,
//! wires the API client, session store and location probe, then runs one
//! command: show the board or line movements, list slips, sign in or out,
//! or build and submit a slip.

use anyhow::{Context, Result};
use secrecy::SecretString;
use std::io::{BufRead, Write};
use std::sync::Arc;
use tracing::{info, warn};

use underline::api::graphql::GraphqlClient;
use underline::api::PickemApi;
use underline::cli::{self, Command, PickArg, PublishArgs, SubmitArgs};
use underline::config::AppConfig;
use underline::location::ConfiguredLocation;
use underline::session::{FileSessionStore, SessionStore};
use underline::slip::builder::SlipBuilder;
use underline::slip::payout::FANTASY_POINT_WEIGHTS;
use underline::types::{Board, SlipError};

const CONFIG_ENV: &str = "UNDERLINE_CONFIG";
const DEFAULT_PASSWORD_ENV: &str = "UNDERLINE_PASSWORD";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let config_path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| "config.toml".to_string());
    let cfg = AppConfig::load(&config_path)?;

    init_logging();

    let command = cli::parse(std::env::args().skip(1))?;
    info!(client = %cfg.client.name, endpoint = %cfg.api.endpoint, ?command, "UNDERLINE starting");

    // -- Wire collaborators ----------------------------------------------

    let session_file = FileSessionStore::new(cfg.session.token_file.as_deref());
    let session_path = session_file.path().display().to_string();
    info!(path = %session_path, "Session store ready");
    let session: Arc<dyn SessionStore> = Arc::new(session_file);
    let api: Arc<dyn PickemApi> = Arc::new(GraphqlClient::new(&cfg.api, session.clone())?);

    match command {
        Command::Board => show_board(api.as_ref()).await,
        Command::Slips { completed } => show_slips(api.as_ref(), completed).await,
        Command::Login { email } => login(&cfg, api.as_ref(), session.as_ref(), &email).await,
        Command::Logout => {
            session.clear()?;
            println!("Signed out ({session_path} removed).");
            Ok(())
        }
        Command::Submit(args) => {
            let builder = SlipBuilder::new(
                api.clone(),
                session.clone(),
                Arc::new(ConfiguredLocation::from_config(&cfg.location)),
                cfg.slip.rules(&cfg.location),
            );
            submit(api.as_ref(), builder, args).await
        }
        Command::Movements => show_movements(api.as_ref()).await,
        Command::Publish(args) => {
            let builder = SlipBuilder::new(
                api.clone(),
                session.clone(),
                Arc::new(ConfiguredLocation::from_config(&cfg.location)),
                cfg.slip.rules(&cfg.location),
            );
            publish(api.as_ref(), builder, args).await
        }
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

async fn show_board(api: &dyn PickemApi) -> Result<()> {
    let (board, date) = futures::try_join!(api.todays_board(), api.current_date())?;

    println!("{}", date.format("%B %-d %Y"));
    if board.is_empty() {
        println!("No lines posted yet today.");
        return Ok(());
    }

    for (category, candidates) in board.by_category() {
        println!("\n== {category} ==");
        if category.to_lowercase().contains("fantasy") {
            let legend: Vec<String> = FANTASY_POINT_WEIGHTS
                .iter()
                .map(|(stat, weight)| format!("{stat} {weight}"))
                .collect();
            println!("  scoring: {}", legend.join(", "));
        }
        if candidates.is_empty() {
            println!("  (no lines)");
        }
        for candidate in candidates {
            println!("  {candidate}");
        }
    }
    Ok(())
}

async fn show_movements(api: &dyn PickemApi) -> Result<()> {
    let Some(set) = api.todays_movements().await? else {
        println!("No line movements for you today.");
        return Ok(());
    };

    if let Some(name) = &set.creator_name {
        println!("Line movements for {name}:");
    }
    for movement in &set.submovements {
        match movement.minimum {
            Some(minimum) => println!("  {movement} (minimum {minimum})"),
            None => println!("  {movement}"),
        }
    }
    println!("Unlock them on up to four players with `underline publish --move <candidate>`.");
    Ok(())
}

async fn show_slips(api: &dyn PickemApi, completed: bool) -> Result<()> {
    let slips = if completed {
        api.completed_slips().await?
    } else {
        api.active_slips().await?
    };

    if slips.is_empty() {
        println!("No slips yet. Run `underline board` to make some picks.");
        return Ok(());
    }

    for slip in &slips {
        println!("{slip}");
        for pick in &slip.picks {
            println!("  {pick}");
        }
    }
    Ok(())
}

async fn login(
    cfg: &AppConfig,
    api: &dyn PickemApi,
    session: &dyn SessionStore,
    email: &str,
) -> Result<()> {
    let password_env = cfg
        .session
        .password_env
        .as_deref()
        .unwrap_or(DEFAULT_PASSWORD_ENV);
    let password = SecretString::new(AppConfig::resolve_env(password_env)?);

    let token = api
        .token_auth(email, &password)
        .await
        .context("Sign-in failed")?;
    session.save(token)?;

    match api.me().await {
        Ok(profile) => println!("Signed in as {profile}"),
        Err(e) => warn!(error = %e, "Signed in but could not load profile"),
    }
    Ok(())
}

async fn submit(api: &dyn PickemApi, mut builder: SlipBuilder, args: SubmitArgs) -> Result<()> {
    let board = api.todays_board().await?;
    add_picks(&mut builder, &board, &args.picks)?;
    builder.set_entry_amount(&args.entry).map_err(slip_failure)?;
    if let Some(code) = &args.creator_code {
        builder.set_creator_code(code);
    }

    for pick in builder.slip().picks() {
        println!("  {pick}");
    }

    let confirmation = builder
        .validate_for_submission()
        .await
        .map_err(slip_failure)?;
    println!("{confirmation}");
    if let Some(balance) = confirmation.balance {
        println!("Wallet balance: ${balance}");
    }

    if !args.yes && !confirm("Submit this slip?")? {
        println!("Not submitted.");
        return Ok(());
    }

    let submitted = builder.submit().await.map_err(slip_failure)?;
    if submitted.free_to_play {
        println!("Slip submitted as free to play.");
    } else {
        println!("Slip submitted.");
    }
    Ok(())
}

async fn publish(api: &dyn PickemApi, mut builder: SlipBuilder, args: PublishArgs) -> Result<()> {
    let board = api.todays_board().await?;
    add_picks(&mut builder, &board, &args.picks)?;

    if !args.movements.is_empty() {
        let set = api
            .todays_movements()
            .await?
            .context("No line movements granted for today")?;
        for id in &args.movements {
            let candidate = board
                .candidate(id)
                .with_context(|| format!("No line {id} on today's board"))?;
            builder
                .toggle_line_movement(candidate, &set)
                .map_err(slip_failure)?;
            println!(
                "  {} {} moved to {:.1}",
                candidate.player.name,
                candidate.category,
                builder.movements().displayed_value(candidate),
            );
        }
    }

    builder.submit_creator_slip().await.map_err(slip_failure)?;
    println!("You created your own slip!");
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn add_picks(builder: &mut SlipBuilder, board: &Board, picks: &[PickArg]) -> Result<()> {
    for pick in picks {
        let candidate = board
            .candidate(&pick.candidate_id)
            .with_context(|| format!("No line {} on today's board", pick.candidate_id))?;
        builder
            .toggle_or_update_pick(candidate, pick.direction.is_under())
            .map_err(slip_failure)?;
    }
    Ok(())
}

/// Render a slip error the way the lobby modal does: header, then message.
fn slip_failure(err: SlipError) -> anyhow::Error {
    if err.needs_deposit() {
        anyhow::anyhow!("{}: {err}\nDeposit funds and try again.", err.header())
    } else {
        anyhow::anyhow!("{}: {err}", err.header())
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt} [y/N] ");
    std::io::stdout().flush().context("Failed to flush stdout")?;
    let mut answer = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("Failed to read confirmation")?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

/// Initialise `tracing` with env-filter and optional JSON output.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("underline=info"));

    let json_logging = std::env::var("UNDERLINE_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }
}
