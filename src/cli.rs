//! Command-line parsing for the `underline` binary.

use anyhow::{Context, Result};
use std::str::FromStr;

use crate::types::Direction;

pub const USAGE: &str = "\
Usage: underline <command>

Commands:
  board                                   Show today's board
  slips [--completed]                     List active (or completed) slips
  login <email>                           Sign in (password from the configured env var)
  logout                                  Forget the saved session
  submit --entry <n> [--code <c>] [--yes] <candidate>:<over|under>...
                                          Build, validate and submit a slip
  movements                               Show today's line movements
  publish [--move <candidate>]... <candidate>:<over|under>...
                                          Publish a creator slip, moving the
                                          lines of up to four players";

/// A candidate id plus direction, written `<id>:<over|under>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickArg {
    pub candidate_id: String,
    pub direction: Direction,
}

impl FromStr for PickArg {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (id, direction) = s
            .rsplit_once(':')
            .with_context(|| format!("Expected <candidate>:<over|under>, got {s:?}"))?;
        if id.is_empty() {
            anyhow::bail!("Missing candidate id in {s:?}");
        }
        Ok(Self {
            candidate_id: id.to_string(),
            direction: direction.parse()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitArgs {
    /// Raw entry input; validated by the slip, not here.
    pub entry: String,
    pub creator_code: Option<String>,
    /// Skip the confirmation prompt.
    pub yes: bool,
    pub picks: Vec<PickArg>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishArgs {
    pub picks: Vec<PickArg>,
    /// Candidates to unlock a line movement on.
    pub movements: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Board,
    Slips { completed: bool },
    Login { email: String },
    Logout,
    Submit(SubmitArgs),
    Movements,
    Publish(PublishArgs),
}

/// Parse arguments (without the program name).
pub fn parse<I>(args: I) -> Result<Command>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    match args.next().as_deref() {
        Some("board") => Ok(Command::Board),
        Some("slips") => match args.next().as_deref() {
            None => Ok(Command::Slips { completed: false }),
            Some("--completed") => Ok(Command::Slips { completed: true }),
            Some(other) => anyhow::bail!("Unknown option for slips: {other}"),
        },
        Some("login") => {
            let email = args.next().context("login needs an email address")?;
            Ok(Command::Login { email })
        }
        Some("logout") => Ok(Command::Logout),
        Some("submit") => parse_submit(args).map(Command::Submit),
        Some("movements") => Ok(Command::Movements),
        Some("publish") => parse_publish(args).map(Command::Publish),
        Some(cmd) => anyhow::bail!("Unknown command: {cmd}\n\n{USAGE}"),
        None => anyhow::bail!("{USAGE}"),
    }
}

fn parse_submit(mut args: impl Iterator<Item = String>) -> Result<SubmitArgs> {
    let mut entry = None;
    let mut creator_code = None;
    let mut yes = false;
    let mut picks = Vec::new();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--entry" => entry = Some(args.next().context("--entry needs a value")?),
            "--code" => creator_code = Some(args.next().context("--code needs a value")?),
            "--yes" | "-y" => yes = true,
            _ => picks.push(arg.parse()?),
        }
    }

    Ok(SubmitArgs {
        entry: entry.context("submit needs --entry <amount>")?,
        creator_code,
        yes,
        picks,
    })
}

fn parse_publish(mut args: impl Iterator<Item = String>) -> Result<PublishArgs> {
    let mut picks = Vec::new();
    let mut movements = Vec::new();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--move" => movements.push(args.next().context("--move needs a candidate id")?),
            _ => picks.push(arg.parse()?),
        }
    }

    if picks.is_empty() {
        anyhow::bail!("publish needs at least one pick\n\n{USAGE}");
    }
    Ok(PublishArgs { picks, movements })
}
