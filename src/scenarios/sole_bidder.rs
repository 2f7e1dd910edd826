/// This scenario exercises the sole-bidder price rule: when the winner was
/// the only bidder in the round, the price equals its own bid.
///
/// Its two variants make the outcome exactly predictable:
///
/// - Variant A: the user never clicks, so the bidder just pays its own bid
///   every round
///
/// - Variant B: the user always clicks, so every round nets bid minus the
///   $1 click revenue

use crate::auction::Auction;
use crate::bidders::{BidderTrait, FixedBidder};
use crate::logger::{LogEvent, Logger};
use crate::logln;
use crate::random::SeededRandom;
use crate::users::User;
use crate::utils::get_seed;

// Register this scenario in the catalog
inventory::submit!(crate::scenarios::ScenarioEntry {
    short_name: "sole_bidder",
    run,
});

const BID: f64 = 0.2;
const NUM_ROUNDS: u64 = 100;

/// Run one variant against a user with the given click probability and
/// return the bidder's final ledger balance
fn run_variant(
    click_probability: f64,
    seed_stream: u64,
    logger: &mut Logger,
) -> Result<f64, Box<dyn std::error::Error>> {
    let users = vec![User::new(click_probability)];
    let bidders: Vec<Box<dyn BidderTrait>> =
        vec![Box::new(FixedBidder::new("solo".to_string(), BID))];
    let mut auction = Auction::new(users, bidders)?;
    let mut random = SeededRandom::new(get_seed(seed_stream));

    for _ in 0..NUM_ROUNDS {
        auction.execute_round(&mut random, logger)?;
    }
    Ok(auction.balances()[0])
}

pub fn run(scenario_name: &str, logger: &mut Logger) -> Result<(), Box<dyn std::error::Error>> {
    logln!(
        logger,
        LogEvent::Simulation,
        "{}: sole bidder at {:.1}, {} rounds per variant",
        scenario_name,
        BID,
        NUM_ROUNDS
    );

    let balance_never = run_variant(0.0, 4111, logger)?;
    let balance_always = run_variant(1.0, 4222, logger)?;

    logln!(logger, LogEvent::Scenario, "");

    let mut errors: Vec<String> = Vec::new();

    // Variant A: pays its own bid every round, no revenue
    let expected_never = -BID * NUM_ROUNDS as f64;
    let msg = format!(
        "never-clicking user: balance {:.3} equals {:.3}",
        balance_never, expected_never
    );
    if (balance_never - expected_never).abs() < 1e-9 {
        logln!(logger, LogEvent::Scenario, "✓ {}", msg);
    } else {
        errors.push(msg.clone());
        logln!(logger, LogEvent::Scenario, "✗ {}", msg);
    }

    // Variant B: every round nets 1 - bid
    let expected_always = (1.0 - BID) * NUM_ROUNDS as f64;
    let msg = format!(
        "always-clicking user: balance {:.3} equals {:.3}",
        balance_always, expected_always
    );
    if (balance_always - expected_always).abs() < 1e-9 {
        logln!(logger, LogEvent::Scenario, "✓ {}", msg);
    } else {
        errors.push(msg.clone());
        logln!(logger, LogEvent::Scenario, "✗ {}", msg);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.join("; ").into())
    }
}
