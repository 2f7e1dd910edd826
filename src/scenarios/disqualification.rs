/// This scenario drives a bidder through the -1000 qualification threshold
/// and checks that disqualification is re-derived from the live ledger.
///
/// Bidder "big" always bids 5.0 against bidder "small" at 0.5, and the user
/// never clicks. "big" wins every round and pays the 0.5 second price, so
/// after 2000 rounds its ledger sits at exactly -1000. From the next round
/// on it must be excluded, leaving "small" as the sole bidder paying its
/// own bid, while the frozen balance never moves again.

use crate::auction::Auction;
use crate::bidders::{BidderTrait, FixedBidder};
use crate::logger::{LogEvent, Logger};
use crate::logln;
use crate::random::SeededRandom;
use crate::users::User;
use crate::utils::get_seed;

// Register this scenario in the catalog
inventory::submit!(crate::scenarios::ScenarioEntry {
    short_name: "disqualification",
    run,
});

const ROUNDS_TO_THRESHOLD: u64 = 2000;
const ROUNDS_AFTER: u64 = 100;

pub fn run(scenario_name: &str, logger: &mut Logger) -> Result<(), Box<dyn std::error::Error>> {
    let users = vec![User::new(0.0)];
    let bidders: Vec<Box<dyn BidderTrait>> = vec![
        Box::new(FixedBidder::new("big".to_string(), 5.0)),
        Box::new(FixedBidder::new("small".to_string(), 0.5)),
    ];
    let mut auction = Auction::new(users, bidders)?;
    let mut random = SeededRandom::new(get_seed(5111));

    logln!(
        logger,
        LogEvent::Simulation,
        "{}: driving bidder 'big' to the qualification threshold over {} rounds",
        scenario_name,
        ROUNDS_TO_THRESHOLD
    );

    for _ in 0..ROUNDS_TO_THRESHOLD {
        auction.execute_round(&mut random, logger)?;
    }
    let big_at_threshold = auction.balances()[0];
    let small_at_threshold = auction.balances()[1];
    let qualified_after_threshold = auction.qualified_bidders();

    for _ in 0..ROUNDS_AFTER {
        auction.execute_round(&mut random, logger)?;
    }
    let big_final = auction.balances()[0];
    let small_final = auction.balances()[1];

    logln!(logger, LogEvent::Scenario, "");

    let mut errors: Vec<String> = Vec::new();

    let mut check = |passed: bool, msg: String, logger: &mut Logger| {
        if passed {
            logln!(logger, LogEvent::Scenario, "✓ {}", msg);
        } else {
            errors.push(msg.clone());
            logln!(logger, LogEvent::Scenario, "✗ {}", msg);
        }
    };

    // Check: paying 0.5 per round lands 'big' at exactly -1000
    check(
        big_at_threshold == -1000.0,
        format!(
            "'big' at exactly -1000 after {} rounds (got {:.3})",
            ROUNDS_TO_THRESHOLD, big_at_threshold
        ),
        logger,
    );

    // Check: 'small' never paid anything while losing
    check(
        small_at_threshold == 0.0,
        format!(
            "'small' untouched while losing (got {:.3})",
            small_at_threshold
        ),
        logger,
    );

    // Check: qualification is re-derived, 'big' is out the very next round
    check(
        qualified_after_threshold == vec![1],
        format!(
            "only 'small' remains qualified (got {:?})",
            qualified_after_threshold
        ),
        logger,
    );

    // Check: the frozen balance never moves again
    check(
        big_final == -1000.0,
        format!("'big' frozen at -1000 (got {:.3})", big_final),
        logger,
    );

    // Check: 'small' now pays its own 0.5 bid as the sole bidder
    let expected_small = -0.5 * ROUNDS_AFTER as f64;
    check(
        (small_final - expected_small).abs() < 1e-9,
        format!(
            "'small' pays its own bid once alone: {:.3} equals {:.3}",
            small_final, expected_small
        ),
        logger,
    );

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.join("; ").into())
    }
}
