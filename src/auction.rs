use std::error::Error;
use std::fmt;
use std::sync::atomic::Ordering;

use crate::bidders::BidderTrait;
use crate::logger::{LogEvent, Logger};
use crate::logln;
use crate::random::RandomSource;
use crate::users::User;
use crate::utils::{TOTAL_AUCTION_ROUNDS, VERBOSE_ROUND};

/// A bidder is qualified for a round iff its ledger balance is strictly
/// greater than this threshold.
pub const QUALIFICATION_THRESHOLD: f64 = -1000.0;

/// Revenue credited to the winner when the shown ad is clicked
pub const CLICK_REVENUE: f64 = 1.0;

/// Errors raised by auction construction and round execution
#[derive(Debug, Clone, PartialEq)]
pub enum AuctionError {
    /// Auction constructed with an empty user pool
    EmptyUserPool,
    /// Auction constructed with no bidders
    EmptyBidderSet,
    /// No bidder was qualified at the start of a round, so there are no bids
    /// to select a winner from. Fatal to the round; the caller decides
    /// whether to terminate the run.
    NoQualifiedBidders,
    /// A strategy returned a negative bid. Surfaced rather than clamped so
    /// that a misbehaving strategy is visible.
    NegativeBid { bidder_id: usize, bid: f64 },
}

impl fmt::Display for AuctionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuctionError::EmptyUserPool => write!(f, "auction requires a non-empty user pool"),
            AuctionError::EmptyBidderSet => write!(f, "auction requires at least one bidder"),
            AuctionError::NoQualifiedBidders => {
                write!(f, "no qualified bidders at the start of the round")
            }
            AuctionError::NegativeBid { bidder_id, bid } => {
                write!(f, "bidder {} returned a negative bid {:.4}", bidder_id, bid)
            }
        }
    }
}

impl Error for AuctionError {}

/// A second-price ad auction over a fixed user pool and bidder set.
///
/// The auction owns the authoritative balance ledger. Bidder ids are the
/// indices into the bidder vector and are stable for the whole run; each
/// bidder's own balance field is only a mirror, pushed to the winner after
/// every committed round.
pub struct Auction {
    users: Vec<User>,
    bidders: Vec<Box<dyn BidderTrait>>,
    /// Ledger of balances, indexed by bidder id. Single source of truth for
    /// qualification.
    balances: Vec<f64>,
}

impl Auction {
    /// Create an auction. Both collections must be non-empty; an empty pool
    /// or bidder set is rejected here rather than on the first round.
    pub fn new(users: Vec<User>, bidders: Vec<Box<dyn BidderTrait>>) -> Result<Self, AuctionError> {
        if users.is_empty() {
            return Err(AuctionError::EmptyUserPool);
        }
        if bidders.is_empty() {
            return Err(AuctionError::EmptyBidderSet);
        }
        let balances = vec![0.0; bidders.len()];
        Ok(Self {
            users,
            bidders,
            balances,
        })
    }

    /// The authoritative ledger, indexed by bidder id
    pub fn balances(&self) -> &[f64] {
        &self.balances
    }

    /// The participating bidders, indexed by bidder id
    pub fn bidders(&self) -> &[Box<dyn BidderTrait>] {
        &self.bidders
    }

    /// Number of users in the pool
    pub fn num_users(&self) -> usize {
        self.users.len()
    }

    /// Ids of the bidders currently qualified to bid. Recomputed from the
    /// live ledger on every call; qualification is never cached, so a bidder
    /// that drifts to or below the threshold is excluded from the very next
    /// round on.
    pub fn qualified_bidders(&self) -> Vec<usize> {
        self.balances
            .iter()
            .enumerate()
            .filter(|(_, &balance)| balance > QUALIFICATION_THRESHOLD)
            .map(|(bidder_id, _)| bidder_id)
            .collect()
    }

    /// Execute a single auction round:
    ///
    /// - select a user uniformly at random
    /// - collect bids from every qualified bidder
    /// - select the winner by maximum bid, ties broken uniformly at random
    /// - settle at the second-highest bid (or the winning bid itself when
    ///   the winner was the sole bidder)
    /// - show the ad and credit the winner if the user clicks
    /// - notify every bidder of the outcome
    ///
    /// The round commits fully or returns an error and is abandoned; there
    /// are no retries.
    pub fn execute_round(
        &mut self,
        random: &mut dyn RandomSource,
        logger: &mut Logger,
    ) -> Result<(), AuctionError> {
        // choose a user at random
        let user_id = random.pick_index(self.users.len());

        // collect bids from every qualified bidder
        let mut bids: Vec<(usize, f64)> = Vec::new();
        for (bidder_id, bidder) in self.bidders.iter_mut().enumerate() {
            if self.balances[bidder_id] > QUALIFICATION_THRESHOLD {
                let bid = bidder.bid(user_id, random);
                if bid < 0.0 {
                    return Err(AuctionError::NegativeBid { bidder_id, bid });
                }
                bids.push((bidder_id, bid));
            }
        }
        if bids.is_empty() {
            return Err(AuctionError::NoQualifiedBidders);
        }

        // select the winning bid, breaking ties uniformly at random
        let winning_bid = bids.iter().map(|&(_, bid)| bid).fold(f64::NEG_INFINITY, f64::max);
        let tied: Vec<usize> = bids
            .iter()
            .filter(|&&(_, bid)| bid == winning_bid)
            .map(|&(bidder_id, _)| bidder_id)
            .collect();
        let winner_id = if tied.len() == 1 {
            tied[0]
        } else {
            tied[random.pick_index(tied.len())]
        };

        // second-price rule: the best of the remaining bids, or the winning
        // bid itself when the winner was the only bidder
        let second_best = bids
            .iter()
            .filter(|&&(bidder_id, _)| bidder_id != winner_id)
            .map(|&(_, bid)| bid)
            .fold(f64::NEG_INFINITY, f64::max);
        let price = if second_best == f64::NEG_INFINITY {
            winning_bid
        } else {
            second_best
        };

        // show the ad and settle
        let clicked = self.users[user_id].show_ad(random);
        self.balances[winner_id] -= price;
        if clicked {
            self.balances[winner_id] += CLICK_REVENUE;
        }

        // push the committed ledger value into the winner's mirror
        self.bidders[winner_id].sync_balance(self.balances[winner_id]);

        // notify every bidder; only the winner learns the click outcome
        for (bidder_id, bidder) in self.bidders.iter_mut().enumerate() {
            let auction_winner = bidder_id == winner_id;
            let click_info = if auction_winner { Some(clicked) } else { None };
            bidder.notify(auction_winner, price, click_info);
        }

        TOTAL_AUCTION_ROUNDS.fetch_add(1, Ordering::Relaxed);

        // Log round data in CSV format
        if VERBOSE_ROUND.load(Ordering::Relaxed) {
            let mut csv_fields = Vec::new();
            csv_fields.push(format!("{}", user_id));
            csv_fields.push(format!("{}", winner_id));
            csv_fields.push(format!("{:.4}", winning_bid));
            csv_fields.push(format!("{:.4}", price));
            csv_fields.push(format!("{}", clicked));
            for bidder_id in 0..self.bidders.len() {
                match bids.iter().find(|&&(id, _)| id == bidder_id) {
                    Some(&(_, bid)) => csv_fields.push(format!("{:.4}", bid)),
                    None => csv_fields.push("".to_string()),
                }
            }
            logln!(logger, LogEvent::Round, "{}", csv_fields.join(","));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bidders::{FixedBidder, RandomBidder};
    use crate::random::SeededRandom;

    /// Strategy returning a pre-scripted sequence of bids
    struct ScriptedBidder {
        bids: Vec<f64>,
        next: usize,
        balance: f64,
    }

    impl ScriptedBidder {
        fn new(bids: Vec<f64>) -> Self {
            Self {
                bids,
                next: 0,
                balance: 0.0,
            }
        }
    }

    impl BidderTrait for ScriptedBidder {
        fn bidder_name(&self) -> &str {
            "scripted"
        }

        fn bid(&mut self, _user_id: usize, _random: &mut dyn RandomSource) -> f64 {
            let bid = self.bids[self.next];
            self.next += 1;
            bid
        }

        fn notify(&mut self, _auction_winner: bool, _price: f64, _clicked: Option<bool>) {}

        fn balance(&self) -> f64 {
            self.balance
        }

        fn sync_balance(&mut self, balance: f64) {
            self.balance = balance;
        }
    }

    /// Strategy with a fixed bid that records every notification it receives
    /// into a log shared with the test
    struct RecordingBidder {
        amount: f64,
        balance: f64,
        notifications: std::rc::Rc<std::cell::RefCell<Vec<(bool, f64, Option<bool>)>>>,
    }

    impl RecordingBidder {
        fn new(
            amount: f64,
            notifications: std::rc::Rc<std::cell::RefCell<Vec<(bool, f64, Option<bool>)>>>,
        ) -> Self {
            Self {
                amount,
                balance: 0.0,
                notifications,
            }
        }
    }

    impl BidderTrait for RecordingBidder {
        fn bidder_name(&self) -> &str {
            "recording"
        }

        fn bid(&mut self, _user_id: usize, _random: &mut dyn RandomSource) -> f64 {
            self.amount
        }

        fn notify(&mut self, auction_winner: bool, price: f64, clicked: Option<bool>) {
            self.notifications
                .borrow_mut()
                .push((auction_winner, price, clicked));
        }

        fn balance(&self) -> f64 {
            self.balance
        }

        fn sync_balance(&mut self, balance: f64) {
            self.balance = balance;
        }
    }

    #[test]
    fn test_construction_rejects_empty_user_pool() {
        let bidders: Vec<Box<dyn BidderTrait>> =
            vec![Box::new(FixedBidder::new("b0".to_string(), 0.1))];
        let result = Auction::new(Vec::new(), bidders);
        assert!(matches!(result, Err(AuctionError::EmptyUserPool)));
    }

    #[test]
    fn test_construction_rejects_empty_bidder_set() {
        let result = Auction::new(vec![User::new(0.5)], Vec::new());
        assert!(matches!(result, Err(AuctionError::EmptyBidderSet)));
    }

    #[test]
    fn test_winner_pays_second_price_and_earns_click_revenue() {
        // 1 user that always clicks, fixed bids 0.5 and 0.3: the 0.5 bidder
        // wins at price 0.3 and ends at -0.3 + 1 = 0.7
        let users = vec![User::new(1.0)];
        let bidders: Vec<Box<dyn BidderTrait>> = vec![
            Box::new(FixedBidder::new("high".to_string(), 0.5)),
            Box::new(FixedBidder::new("low".to_string(), 0.3)),
        ];
        let mut auction = Auction::new(users, bidders).unwrap();
        let mut random = SeededRandom::new(101);
        let mut logger = Logger::new();

        auction.execute_round(&mut random, &mut logger).unwrap();

        assert!((auction.balances()[0] - 0.7).abs() < 1e-12);
        assert_eq!(auction.balances()[1], 0.0);
        assert_eq!(auction.bidders()[0].balance(), auction.balances()[0]);
    }

    #[test]
    fn test_sole_bidder_pays_own_bid() {
        // 1 bidder, bid 0.2, user never clicks: price falls back to the
        // winning bid, balance ends at -0.2
        let users = vec![User::new(0.0)];
        let bidders: Vec<Box<dyn BidderTrait>> =
            vec![Box::new(FixedBidder::new("solo".to_string(), 0.2))];
        let mut auction = Auction::new(users, bidders).unwrap();
        let mut random = SeededRandom::new(102);
        let mut logger = Logger::new();

        auction.execute_round(&mut random, &mut logger).unwrap();

        assert_eq!(auction.balances()[0], -0.2);
    }

    #[test]
    fn test_negative_bid_is_an_error() {
        let users = vec![User::new(0.0)];
        let bidders: Vec<Box<dyn BidderTrait>> = vec![Box::new(ScriptedBidder::new(vec![-1.0]))];
        let mut auction = Auction::new(users, bidders).unwrap();
        let mut random = SeededRandom::new(103);
        let mut logger = Logger::new();

        let result = auction.execute_round(&mut random, &mut logger);
        assert_eq!(
            result,
            Err(AuctionError::NegativeBid {
                bidder_id: 0,
                bid: -1.0
            })
        );
        // the abandoned round must not have touched the ledger
        assert_eq!(auction.balances()[0], 0.0);
    }

    #[test]
    fn test_no_qualified_bidders_is_an_error() {
        // A sole bidder paying its own 2000 bid drops straight through the
        // qualification threshold; the next round has nobody left to bid
        let users = vec![User::new(0.0)];
        let bidders: Vec<Box<dyn BidderTrait>> =
            vec![Box::new(ScriptedBidder::new(vec![2000.0]))];
        let mut auction = Auction::new(users, bidders).unwrap();
        let mut random = SeededRandom::new(104);
        let mut logger = Logger::new();

        auction.execute_round(&mut random, &mut logger).unwrap();
        assert_eq!(auction.balances()[0], -2000.0);
        assert!(auction.qualified_bidders().is_empty());

        let result = auction.execute_round(&mut random, &mut logger);
        assert_eq!(result, Err(AuctionError::NoQualifiedBidders));
    }

    #[test]
    fn test_qualified_loser_at_minus_999_is_not_charged() {
        // Round 1 drives bidder 0 to exactly -999 (still qualified). In
        // round 2 it loses, and non-winners never pay.
        let users = vec![User::new(0.0)];
        let bidders: Vec<Box<dyn BidderTrait>> = vec![
            Box::new(ScriptedBidder::new(vec![1000.0, 0.1])),
            Box::new(ScriptedBidder::new(vec![999.0, 0.2])),
        ];
        let mut auction = Auction::new(users, bidders).unwrap();
        let mut random = SeededRandom::new(105);
        let mut logger = Logger::new();

        auction.execute_round(&mut random, &mut logger).unwrap();
        assert_eq!(auction.balances()[0], -999.0);
        assert_eq!(auction.qualified_bidders(), vec![0, 1]);

        auction.execute_round(&mut random, &mut logger).unwrap();
        assert_eq!(auction.balances()[0], -999.0);
        assert_eq!(auction.balances()[1], -0.1);
    }

    #[test]
    fn test_disqualification_is_rederived_every_round() {
        // Bidder 0 outbids every round and pays bidder 1's 0.5 each time;
        // after 2000 rounds it sits at exactly -1000 and must be excluded
        // from then on, leaving bidder 1 to pay its own bid.
        let users = vec![User::new(0.0)];
        let bidders: Vec<Box<dyn BidderTrait>> = vec![
            Box::new(FixedBidder::new("big".to_string(), 5.0)),
            Box::new(FixedBidder::new("small".to_string(), 0.5)),
        ];
        let mut auction = Auction::new(users, bidders).unwrap();
        let mut random = SeededRandom::new(106);
        let mut logger = Logger::new();

        for _ in 0..2000 {
            auction.execute_round(&mut random, &mut logger).unwrap();
        }
        assert_eq!(auction.balances()[0], -1000.0);
        assert_eq!(auction.balances()[1], 0.0);
        assert_eq!(auction.qualified_bidders(), vec![1]);

        for _ in 0..10 {
            auction.execute_round(&mut random, &mut logger).unwrap();
        }
        assert_eq!(auction.balances()[0], -1000.0);
        assert_eq!(auction.balances()[1], -5.0);
    }

    #[test]
    fn test_only_the_winner_learns_the_click_outcome() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let winner_log = Rc::new(RefCell::new(Vec::new()));
        let loser_log = Rc::new(RefCell::new(Vec::new()));

        let users = vec![User::new(1.0)];
        let bidders: Vec<Box<dyn BidderTrait>> = vec![
            Box::new(RecordingBidder::new(0.6, Rc::clone(&winner_log))),
            Box::new(RecordingBidder::new(0.4, Rc::clone(&loser_log))),
        ];
        let mut auction = Auction::new(users, bidders).unwrap();
        let mut random = SeededRandom::new(107);
        let mut logger = Logger::new();

        let rounds = 20;
        for _ in 0..rounds {
            auction.execute_round(&mut random, &mut logger).unwrap();
        }

        let winner_log = winner_log.borrow();
        let loser_log = loser_log.borrow();
        assert_eq!(winner_log.len(), rounds);
        assert_eq!(loser_log.len(), rounds);

        for round in 0..rounds {
            let (won, price_w, clicked_w) = winner_log[round];
            let (lost, price_l, clicked_l) = loser_log[round];
            // the 0.6 bidder always wins at the 0.4 price, and the user
            // always clicks
            assert!(won);
            assert!(!lost);
            assert_eq!(clicked_w, Some(true));
            assert_eq!(clicked_l, None);
            // both recipients see the same settled price
            assert_eq!(price_w, 0.4);
            assert_eq!(price_l, 0.4);
        }
    }

    #[test]
    fn test_at_most_one_balance_changes_per_round() {
        let mut random = SeededRandom::new(109);
        let users = crate::users::random_pool(5, &mut random);
        let bidders: Vec<Box<dyn BidderTrait>> = (0..4)
            .map(|i| {
                Box::new(RandomBidder::new(format!("bidder_{}", i), 5, 200))
                    as Box<dyn BidderTrait>
            })
            .collect();
        let mut auction = Auction::new(users, bidders).unwrap();
        let mut logger = Logger::new();

        for _ in 0..200 {
            let before = auction.balances().to_vec();
            let qualified = auction.qualified_bidders();
            auction.execute_round(&mut random, &mut logger).unwrap();
            let after = auction.balances();

            let changed: Vec<usize> = (0..before.len())
                .filter(|&i| before[i] != after[i])
                .collect();
            assert!(changed.len() <= 1);
            if let Some(&bidder_id) = changed.first() {
                assert!(qualified.contains(&bidder_id));
            }
            // the mirror of every bidder matches the ledger after the round
            for (bidder_id, bidder) in auction.bidders().iter().enumerate() {
                assert_eq!(bidder.balance(), after[bidder_id]);
            }
        }
    }

    #[test]
    fn test_tie_break_is_statistically_fair() {
        // Two identical fixed bids against a never-clicking user: each loss
        // costs the winner exactly 0.4, so win counts can be read off the
        // ledger. Expect roughly an even split.
        let users = vec![User::new(0.0)];
        let bidders: Vec<Box<dyn BidderTrait>> = vec![
            Box::new(FixedBidder::new("a".to_string(), 0.4)),
            Box::new(FixedBidder::new("b".to_string(), 0.4)),
        ];
        let mut auction = Auction::new(users, bidders).unwrap();
        let mut random = SeededRandom::new(110);
        let mut logger = Logger::new();

        let rounds = 2000;
        for _ in 0..rounds {
            auction.execute_round(&mut random, &mut logger).unwrap();
        }

        let wins_a = (-auction.balances()[0] / 0.4).round() as i64;
        let wins_b = (-auction.balances()[1] / 0.4).round() as i64;
        assert_eq!(wins_a + wins_b, rounds);
        // 1000 +/- 150 is over 6 standard deviations for a fair coin
        assert!((850..=1150).contains(&wins_a), "wins_a = {}", wins_a);
    }

    #[test]
    fn test_price_never_exceeds_winning_bid() {
        // With distinct fixed bids the winner and price are deterministic
        let users = vec![User::new(0.0)];
        let bidders: Vec<Box<dyn BidderTrait>> = vec![
            Box::new(FixedBidder::new("a".to_string(), 0.9)),
            Box::new(FixedBidder::new("b".to_string(), 0.7)),
            Box::new(FixedBidder::new("c".to_string(), 0.2)),
        ];
        let mut auction = Auction::new(users, bidders).unwrap();
        let mut random = SeededRandom::new(111);
        let mut logger = Logger::new();

        for round in 1..=50 {
            auction.execute_round(&mut random, &mut logger).unwrap();
            let paid = -auction.balances()[0];
            assert!((paid - 0.7 * round as f64).abs() < 1e-9);
        }
        assert_eq!(auction.balances()[1], 0.0);
        assert_eq!(auction.balances()[2], 0.0);
    }
}
