//! Local submission checks.
//!
//! These run before anything touches the network, in this order:
//! payout present, entry within the ceiling, at least two teams.
//! Location and wallet checks need collaborators and live in the builder.

use rust_decimal::Decimal;

use super::Slip;
use crate::types::SlipError;

/// Minimum number of distinct teams a slip must span.
pub const MIN_TEAMS: usize = 2;

/// Run the local checks and return the numeric entry amount.
pub fn check_local(slip: &Slip, max_entry_amount: u64) -> Result<u64, SlipError> {
    let entry = check_payout(slip)?;
    check_entry_ceiling(entry, max_entry_amount)?;
    check_team_diversity(slip)?;
    Ok(entry)
}

/// A blank or zero payout means there is nothing to submit.
pub fn check_payout(slip: &Slip) -> Result<u64, SlipError> {
    match (slip.payout(), slip.entry_amount()) {
        (Some(payout), Some(entry)) if payout > Decimal::ZERO => Ok(entry),
        _ => Err(SlipError::MissingPayout),
    }
}

pub fn check_entry_ceiling(entry: u64, max_entry_amount: u64) -> Result<(), SlipError> {
    if entry > max_entry_amount {
        return Err(SlipError::EntryTooLarge {
            ceiling: max_entry_amount,
        });
    }
    Ok(())
}

pub fn check_team_diversity(slip: &Slip) -> Result<(), SlipError> {
    let teams = slip.team_count();
    if teams < MIN_TEAMS {
        return Err(SlipError::InsufficientTeamDiversity { teams });
    }
    Ok(())
}

/// Wallet must cover the entry.
pub fn check_funds(entry: u64, balance: Decimal) -> Result<(), SlipError> {
    let needed = Decimal::from(entry);
    if balance < needed {
        return Err(SlipError::InsufficientFunds {
            needed,
            available: balance,
        });
    }
    Ok(())
}
