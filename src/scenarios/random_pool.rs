/// This scenario runs the reference random bidders over a random user pool.
///
/// It does not pin down individual round outcomes (the bids are random); it
/// validates the structural invariants that must hold for any strategy:
///
/// - every round commits (random bids in [0, 1) can never disqualify anyone)
///
/// - after the run, every bidder's mirrored balance equals the ledger
///
/// - ledger balances stay within the bounds a [0, 1) bid range allows

use crate::auction::Auction;
use crate::bidders::{BidderTrait, RandomBidder};
use crate::logger::{LogEvent, Logger};
use crate::logln;
use crate::random::SeededRandom;
use crate::users;
use crate::utils::get_seed;

// Register this scenario in the catalog
inventory::submit!(crate::scenarios::ScenarioEntry {
    short_name: "random_pool",
    run,
});

const NUM_USERS: usize = 20;
const NUM_BIDDERS: usize = 5;
const NUM_ROUNDS: u64 = 10_000;

/// Prepare an auction with a random user pool and the reference bidders
fn prepare_auction() -> Auction {
    let mut pool_random = SeededRandom::new(get_seed(1991));
    let users = users::random_pool(NUM_USERS, &mut pool_random);

    let bidders: Vec<Box<dyn BidderTrait>> = (0..NUM_BIDDERS)
        .map(|i| {
            Box::new(RandomBidder::new(
                format!("bidder_{}", i),
                NUM_USERS,
                NUM_ROUNDS,
            )) as Box<dyn BidderTrait>
        })
        .collect();

    Auction::new(users, bidders).expect("non-empty pool and bidder set")
}

pub fn run(scenario_name: &str, logger: &mut Logger) -> Result<(), Box<dyn std::error::Error>> {
    let mut auction = prepare_auction();
    let mut random = SeededRandom::new(get_seed(2992));

    logln!(
        logger,
        LogEvent::Simulation,
        "{}: {} users, {} random bidders, {} rounds",
        scenario_name,
        auction.num_users(),
        NUM_BIDDERS,
        NUM_ROUNDS
    );

    for _ in 0..NUM_ROUNDS {
        auction.execute_round(&mut random, logger)?;
    }

    for (bidder_id, bidder) in auction.bidders().iter().enumerate() {
        logln!(
            logger,
            LogEvent::Simulation,
            "{}: final balance {:.3}",
            bidder.bidder_name(),
            auction.balances()[bidder_id]
        );
    }

    logln!(logger, LogEvent::Scenario, "");

    let mut errors: Vec<String> = Vec::new();

    // Check: every bidder's mirror equals the ledger
    for (bidder_id, bidder) in auction.bidders().iter().enumerate() {
        let ledger = auction.balances()[bidder_id];
        let mirror = bidder.balance();
        let msg = format!(
            "{} mirror {:.3} equals ledger {:.3}",
            bidder.bidder_name(),
            mirror,
            ledger
        );
        if mirror == ledger {
            logln!(logger, LogEvent::Scenario, "✓ {}", msg);
        } else {
            errors.push(msg.clone());
            logln!(logger, LogEvent::Scenario, "✗ {}", msg);
        }
    }

    // Check: balances bounded by what [0, 1) bids and $1 clicks allow
    for (bidder_id, bidder) in auction.bidders().iter().enumerate() {
        let balance = auction.balances()[bidder_id];
        let bound = NUM_ROUNDS as f64;
        let msg = format!(
            "{} balance {:.3} within [-{}, {}]",
            bidder.bidder_name(),
            balance,
            bound,
            bound
        );
        if balance.abs() <= bound {
            logln!(logger, LogEvent::Scenario, "✓ {}", msg);
        } else {
            errors.push(msg.clone());
            logln!(logger, LogEvent::Scenario, "✗ {}", msg);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.join("; ").into())
    }
}
