/// This scenario checks the randomized tie-break: two bidders submit the
/// same fixed bid every round, so every round is a tie and the winner is
/// chosen uniformly at random between them.
///
/// The user never clicks and the tied second price equals the bid, so each
/// win costs the winner exactly the bid amount and win counts can be read
/// off the ledger. Over many rounds the split must be statistically even.

use crate::auction::Auction;
use crate::bidders::{BidderTrait, FixedBidder};
use crate::logger::{LogEvent, Logger};
use crate::logln;
use crate::random::SeededRandom;
use crate::users::User;
use crate::utils::get_seed;

// Register this scenario in the catalog
inventory::submit!(crate::scenarios::ScenarioEntry {
    short_name: "tie_fairness",
    run,
});

const BID: f64 = 0.4;
const NUM_ROUNDS: i64 = 10_000;
// ~6 standard deviations for a fair coin over 10000 trials
const TOLERANCE: i64 = 300;

pub fn run(scenario_name: &str, logger: &mut Logger) -> Result<(), Box<dyn std::error::Error>> {
    let users = vec![User::new(0.0)];
    let bidders: Vec<Box<dyn BidderTrait>> = vec![
        Box::new(FixedBidder::new("tied_a".to_string(), BID)),
        Box::new(FixedBidder::new("tied_b".to_string(), BID)),
    ];
    let mut auction = Auction::new(users, bidders)?;
    let mut random = SeededRandom::new(get_seed(6111));

    logln!(
        logger,
        LogEvent::Simulation,
        "{}: two bidders tied at {:.1} over {} rounds",
        scenario_name,
        BID,
        NUM_ROUNDS
    );

    for _ in 0..NUM_ROUNDS {
        auction.execute_round(&mut random, logger)?;
    }

    let wins_a = (-auction.balances()[0] / BID).round() as i64;
    let wins_b = (-auction.balances()[1] / BID).round() as i64;

    logln!(logger, LogEvent::Scenario, "");

    let mut errors: Vec<String> = Vec::new();

    // Check: every round had exactly one winner
    let msg = format!(
        "win counts {} + {} account for all {} rounds",
        wins_a, wins_b, NUM_ROUNDS
    );
    if wins_a + wins_b == NUM_ROUNDS {
        logln!(logger, LogEvent::Scenario, "✓ {}", msg);
    } else {
        errors.push(msg.clone());
        logln!(logger, LogEvent::Scenario, "✗ {}", msg);
    }

    // Check: the split is statistically even
    let expected = NUM_ROUNDS / 2;
    let msg = format!(
        "win split {}/{} within {} of {}",
        wins_a, wins_b, TOLERANCE, expected
    );
    if (wins_a - expected).abs() <= TOLERANCE {
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
