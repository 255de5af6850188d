//! End-to-end slip scenarios against the mock backend.
//!
//! Each test wires a `SlipBuilder` to a `MockApi`, a session store and a
//! configured location, then drives it the way the lobby does.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

use underline::api::PickemApi;
use underline::location::ConfiguredLocation;
use underline::session::{MemorySessionStore, SessionStore};
use underline::slip::builder::{SlipBuilder, SlipPhase, SlipRules};
use underline::types::SlipError;

use crate::mock_api::{self, MockApi};

struct Harness {
    api: Arc<MockApi>,
    session: Arc<MemorySessionStore>,
    builder: SlipBuilder,
}

fn harness(api: MockApi, session: MemorySessionStore, rules: SlipRules) -> Harness {
    let api = Arc::new(api);
    let session = Arc::new(session);
    let builder = SlipBuilder::new(
        api.clone(),
        session.clone(),
        Arc::new(ConfiguredLocation::available()),
        rules,
    );
    Harness {
        api,
        session,
        builder,
    }
}

fn signed_in(balance: Decimal) -> Harness {
    harness(
        MockApi::new(balance),
        MemorySessionStore::with_token(&mock_api::live_token()),
        SlipRules::default(),
    )
}

impl Harness {
    fn pick(&mut self, id: &str, under: bool) -> Result<(), SlipError> {
        let candidate = self.api.candidate(id);
        self.builder.toggle_or_update_pick(&candidate, under).map(|_| ())
    }
}

// ---- Pick selection ----

#[tokio::test]
async fn test_sixth_pick_rejected_and_slip_unchanged() {
    let mut h = signed_in(dec!(100));
    for id in ["L1", "B1", "M1", "D1", "P1"] {
        assert_ok!(h.pick(id, false));
    }
    assert_eq!(h.builder.slip().multiplier().value(), 20);
    assert_eq!(h.builder.slip().progress(), 100);

    let before = h.builder.slip().clone();
    let err = assert_err!(h.pick("G1", true));
    assert_eq!(err, SlipError::TooManyPicks);
    assert_eq!(h.builder.slip(), &before);
}

#[tokio::test]
async fn test_flip_keeps_position_and_count() {
    let mut h = signed_in(dec!(100));
    assert_ok!(h.pick("L1", false));
    assert_ok!(h.pick("B1", false));
    assert_ok!(h.pick("M1", false));

    assert_ok!(h.pick("B1", true));
    let slip = h.builder.slip();
    assert_eq!(slip.count(), 3);
    assert_eq!(slip.picks()[1].id(), "B1");
    assert!(slip.picks()[1].direction.is_under());

    // same direction again removes it
    assert_ok!(h.pick("B1", true));
    assert_eq!(h.builder.slip().count(), 2);
}

// ---- Validation ----

#[tokio::test]
async fn test_same_team_slip_fails_diversity() {
    let mut h = signed_in(dec!(100));
    assert_ok!(h.pick("L1", false));
    assert_ok!(h.pick("L2", true));
    assert_ok!(h.builder.set_entry_amount("5"));

    let err = assert_err!(h.builder.validate_for_submission().await);
    assert_eq!(err, SlipError::InsufficientTeamDiversity { teams: 1 });
    assert_eq!(err.header(), "Two teams must be involved");
}

#[tokio::test]
async fn test_entry_over_ceiling() {
    let mut h = harness(
        MockApi::new(dec!(100)),
        MemorySessionStore::with_token(&mock_api::live_token()),
        SlipRules {
            max_entry_amount: 10,
            ..SlipRules::default()
        },
    );
    assert_ok!(h.pick("L1", false));
    assert_ok!(h.pick("B1", false));
    assert_ok!(h.builder.set_entry_amount("15"));
    assert_eq!(h.builder.slip().payout(), Some(dec!(45)));

    let err = assert_err!(h.builder.validate_for_submission().await);
    assert_eq!(err, SlipError::EntryTooLarge { ceiling: 10 });
    assert!(h.builder.entry_error());
}

#[tokio::test]
async fn test_non_digit_entry_keeps_previous_amount() {
    let mut h = signed_in(dec!(100));
    assert_ok!(h.pick("L1", false));
    assert_ok!(h.pick("B1", false));
    assert_ok!(h.builder.set_entry_amount("12"));

    let err = assert_err!(h.builder.set_entry_amount("12.50"));
    assert!(matches!(err, SlipError::InvalidEntryAmount(_)));
    assert_eq!(h.builder.slip().entry_amount(), Some(12));
    assert_eq!(h.builder.slip().payout(), Some(dec!(36)));
}

#[tokio::test]
async fn test_insufficient_funds_points_to_deposit() {
    let mut h = signed_in(dec!(4.99));
    assert_ok!(h.pick("L1", false));
    assert_ok!(h.pick("B1", true));
    assert_ok!(h.builder.set_entry_amount("5"));

    let err = assert_err!(h.builder.validate_for_submission().await);
    assert!(err.needs_deposit());
    assert_eq!(
        err,
        SlipError::InsufficientFunds {
            needed: dec!(5),
            available: dec!(4.99),
        }
    );
}

#[tokio::test]
async fn test_location_checks() {
    let api = Arc::new(MockApi::new(dec!(100)).with_approved_location(false));
    let session = Arc::new(MemorySessionStore::with_token(&mock_api::live_token()));

    // capability missing entirely
    let mut no_location = SlipBuilder::new(
        api.clone(),
        session.clone(),
        Arc::new(ConfiguredLocation::unavailable()),
        SlipRules::default(),
    );
    // position known but not an approved jurisdiction
    let mut not_approved = SlipBuilder::new(
        api.clone(),
        session.clone(),
        Arc::new(ConfiguredLocation::new(
            true,
            Some(underline::types::Coordinates {
                lat: 47.6,
                lng: -122.3,
            }),
        )),
        SlipRules {
            check_approved_location: true,
            ..SlipRules::default()
        },
    );

    for builder in [&mut no_location, &mut not_approved] {
        assert_ok!(builder.toggle_or_update_pick(&api.candidate("L1"), false));
        assert_ok!(builder.toggle_or_update_pick(&api.candidate("B1"), false));
        assert_ok!(builder.set_entry_amount("5"));
    }

    let err = assert_err!(no_location.validate_for_submission().await);
    assert_eq!(err, SlipError::LocationUnavailable);
    let err = assert_err!(not_approved.validate_for_submission().await);
    assert_eq!(err, SlipError::LocationNotApproved);
}

// ---- Submission ----

#[tokio::test]
async fn test_submit_success_clears_slip_and_debits() {
    let mut h = signed_in(dec!(50));
    assert_ok!(h.pick("L1", false));
    assert_ok!(h.pick("B1", true));
    assert_ok!(h.pick("M1", false));
    assert_ok!(h.builder.set_entry_amount("10"));
    h.builder.set_creator_code(" HOOPS ");

    let confirmation = assert_ok!(h.builder.validate_for_submission().await);
    assert_eq!(confirmation.payout, dec!(60));
    assert_eq!(confirmation.balance, Some(dec!(50)));

    let submitted = assert_ok!(h.builder.submit().await);
    assert!(!submitted.free_to_play);
    assert_eq!(h.builder.phase(), SlipPhase::Succeeded { free_to_play: false });
    assert!(h.builder.slip().is_empty());
    assert_eq!(h.api.balance(), dec!(40));

    let sent = h.api.submissions();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].entry_amount, 10);
    assert_eq!(sent[0].creator_code.as_deref(), Some("HOOPS"));
    assert!(sent[0].picks[1].under);

    let active = assert_ok!(h.api.active_slips().await);
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].picks.len(), 3);
}

#[tokio::test]
async fn test_free_to_play_receipt() {
    let mut h = harness(
        MockApi::new(dec!(50)).free_to_play(),
        MemorySessionStore::with_token(&mock_api::live_token()),
        SlipRules::default(),
    );
    assert_ok!(h.pick("L1", false));
    assert_ok!(h.pick("B1", false));
    assert_ok!(h.builder.set_entry_amount("10"));

    assert_ok!(h.builder.validate_for_submission().await);
    let submitted = assert_ok!(h.builder.submit().await);
    assert!(submitted.free_to_play);
    assert_eq!(h.api.balance(), dec!(50));
}

#[tokio::test]
async fn test_daily_limit_rejection_keeps_slip() {
    let mut h = harness(
        MockApi::new(dec!(100)).with_daily_limit(5),
        MemorySessionStore::with_token(&mock_api::live_token()),
        SlipRules::default(),
    );
    assert_ok!(h.pick("L1", false));
    assert_ok!(h.pick("B1", false));
    assert_ok!(h.builder.set_entry_amount("10"));

    assert_ok!(h.builder.validate_for_submission().await);
    let before = h.builder.slip().clone();
    let err = assert_err!(h.builder.submit().await);

    assert_eq!(err, SlipError::SubmissionRejected { daily_limit: 80 });
    assert_eq!(err.header(), "$80 daily entry volume limit");
    assert_eq!(h.builder.phase(), SlipPhase::Failed);
    assert_eq!(h.builder.slip(), &before);
    assert_eq!(h.api.balance(), dec!(100));

    // lower the entry and go again
    assert_ok!(h.builder.set_entry_amount("5"));
    assert_eq!(h.builder.phase(), SlipPhase::Building);
    assert_ok!(h.builder.validate_for_submission().await);
    assert_ok!(h.builder.submit().await);
}

#[tokio::test]
async fn test_backend_outage_surfaces_as_backend_error() {
    let mut h = signed_in(dec!(100));
    assert_ok!(h.pick("L1", false));
    assert_ok!(h.pick("B1", false));
    assert_ok!(h.builder.set_entry_amount("10"));
    assert_ok!(h.builder.validate_for_submission().await);

    h.api.set_error("503 Service Unavailable");
    let err = assert_err!(h.builder.submit().await);
    assert!(matches!(err, SlipError::Backend(ref m) if m.contains("503")));
    assert_eq!(h.builder.slip().count(), 2);

    // nothing is retried; another attempt starts from validation
    h.api.clear_error();
    assert_eq!(assert_err!(h.builder.submit().await), SlipError::NotValidated);
}

#[tokio::test]
async fn test_cancelled_submit_does_not_wedge_the_builder() {
    let mut h = signed_in(dec!(100));
    assert_ok!(h.pick("L1", false));
    assert_ok!(h.pick("B1", false));
    assert_ok!(h.builder.set_entry_amount("10"));
    assert_ok!(h.builder.validate_for_submission().await);

    h.api.set_stalled(true);
    let timed_out = tokio::time::timeout(Duration::from_millis(50), h.builder.submit()).await;
    assert!(timed_out.is_err());

    // outcome unknown: no blind resubmit, but the slip is intact and editable
    assert_eq!(h.builder.phase(), SlipPhase::Failed);
    assert_eq!(h.builder.slip().count(), 2);
    assert_eq!(assert_err!(h.builder.submit().await), SlipError::NotValidated);

    h.api.set_stalled(false);
    assert_ok!(h.builder.set_entry_amount("5"));
    assert_eq!(h.builder.phase(), SlipPhase::Building);
    assert_ok!(h.builder.validate_for_submission().await);
    assert_ok!(h.builder.submit().await);
    assert_eq!(h.api.submissions().len(), 1);
    assert_eq!(h.api.balance(), dec!(95));
}

#[tokio::test]
async fn test_cancelled_submit_allows_revalidation_without_edits() {
    let mut h = signed_in(dec!(100));
    assert_ok!(h.pick("L1", false));
    assert_ok!(h.pick("B1", false));
    assert_ok!(h.builder.set_entry_amount("10"));
    assert_ok!(h.builder.validate_for_submission().await);

    h.api.set_stalled(true);
    assert!(tokio::time::timeout(Duration::from_millis(50), h.builder.submit())
        .await
        .is_err());

    h.api.set_stalled(false);
    assert_ok!(h.builder.validate_for_submission().await);
    assert_eq!(h.builder.phase(), SlipPhase::ReadyToConfirm);
    assert_ok!(h.builder.submit().await);
}

// ---- Sessions ----

#[tokio::test]
async fn test_guest_can_validate_but_not_submit() {
    let mut h = harness(
        MockApi::new(dec!(0)),
        MemorySessionStore::new(),
        SlipRules::default(),
    );
    assert_ok!(h.pick("L1", false));
    assert_ok!(h.pick("B1", false));
    assert_ok!(h.builder.set_entry_amount("10"));

    // no wallet check without a session, so a zero balance passes
    let confirmation = assert_ok!(h.builder.validate_for_submission().await);
    assert_eq!(confirmation.balance, None);
    assert_eq!(assert_err!(h.builder.submit().await), SlipError::NotSignedIn);
    assert!(h.api.submissions().is_empty());
}

#[tokio::test]
async fn test_expired_session_counts_as_guest() {
    let mut h = harness(
        MockApi::new(dec!(0)),
        MemorySessionStore::with_token(&mock_api::token_expiring_in(-2)),
        SlipRules::default(),
    );
    assert!(!h.session.is_active());
    assert_ok!(h.pick("L1", false));
    assert_ok!(h.pick("B1", false));
    assert_ok!(h.builder.set_entry_amount("10"));
    assert_ok!(h.builder.validate_for_submission().await);
    assert_eq!(assert_err!(h.builder.submit().await), SlipError::NotSignedIn);
}

#[tokio::test]
async fn test_login_then_submit() {
    let mut h = harness(
        MockApi::new(dec!(25)),
        MemorySessionStore::new(),
        SlipRules::default(),
    );
    let token = assert_ok!(
        h.api
            .token_auth(mock_api::EMAIL, &SecretString::new(mock_api::PASSWORD.to_string()))
            .await
    );
    assert_ok!(h.session.save(token));
    assert!(h.session.is_active());

    assert_ok!(h.pick("L1", false));
    assert_ok!(h.pick("B1", false));
    assert_ok!(h.builder.set_entry_amount("20"));
    assert_ok!(h.builder.validate_for_submission().await);
    assert_ok!(h.builder.submit().await);
    assert_eq!(h.api.balance(), dec!(5));
}

// ---- Creator slips ----

#[tokio::test]
async fn test_creator_slip_publishing() {
    let mut h = signed_in(dec!(0));
    assert_ok!(h.pick("L1", false));
    let err = assert_err!(h.builder.submit_creator_slip().await);
    assert_eq!(err, SlipError::NotEnoughPicks { required: 2 });

    // same-team picks are fine for a creator slip
    assert_ok!(h.pick("L2", true));
    assert_ok!(h.builder.submit_creator_slip().await);

    let published = h.api.creator_slips();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].len(), 2);
    assert!(h.builder.slip().is_empty());
}

#[tokio::test]
async fn test_creator_slip_with_line_movements() {
    let mut h = harness(
        MockApi::new(dec!(0)).with_movements(),
        MemorySessionStore::with_token(&mock_api::live_token()),
        SlipRules::default(),
    );
    let set = assert_ok!(h.api.todays_movements().await).expect("movements granted");

    assert_ok!(h.pick("L1", false));
    assert_ok!(h.pick("D1", true));
    let lebron = h.api.candidate("L1");
    let jokic = h.api.candidate("D1");
    assert_ok!(h.builder.toggle_line_movement(&lebron, &set));
    assert_ok!(h.builder.toggle_line_movement(&jokic, &set));
    assert_eq!(h.builder.movements().progress(), 50);
    assert_eq!(h.builder.movements().displayed_value(&lebron), dec!(29.5));
    assert_eq!(h.builder.movements().displayed_value(&jokic), dec!(11.5));

    assert_ok!(h.builder.submit_creator_slip().await);

    assert!(h.api.creator_slips().is_empty());
    let published = h.api.creator_sublines();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0][0].submovement_id.as_deref(), Some("SM-PTS"));
    assert_eq!(published[0][1].submovement_id.as_deref(), Some("SM-REB"));
    assert!(published[0][1].under);
    assert!(h.builder.movements().is_empty());
}

#[tokio::test]
async fn test_line_movements_capped_at_four_players() {
    let mut h = harness(
        MockApi::new(dec!(0)).with_movements(),
        MemorySessionStore::with_token(&mock_api::live_token()),
        SlipRules::default(),
    );
    let set = assert_ok!(h.api.todays_movements().await).expect("movements granted");

    for id in ["L1", "B1", "M1", "P1"] {
        assert_ok!(h.builder.toggle_line_movement(&h.api.candidate(id), &set));
    }
    let err = assert_err!(h.builder.toggle_line_movement(&h.api.candidate("G1"), &set));
    assert_eq!(err.header(), "You've hit the cap!");
    assert_eq!(h.builder.movements().count(), 4);
    assert!(h.builder.movements().submovement_for("G1").is_none());

    // removing one frees a slot
    assert_ok!(h.builder.toggle_line_movement(&h.api.candidate("B1"), &set));
    assert_ok!(h.builder.toggle_line_movement(&h.api.candidate("G1"), &set));
    assert_eq!(h.builder.movements().progress(), 100);
}
