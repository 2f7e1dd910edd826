use crate::random::RandomSource;
use crate::utils::round3;

// These are the bidding strategies the auction can drive. The auction only
// depends on the trait, so a new strategy (learning, budget-aware, ...) can
// be added without touching the round execution.

/// Trait for bidder strategies participating in a second-price auction
pub trait BidderTrait {
    /// Human-readable name of this bidder, for logging
    fn bidder_name(&self) -> &str;

    /// Return a bid for the given user. Bids must be non-negative; the
    /// auction surfaces a negative bid as an error rather than clamping it.
    fn bid(&mut self, user_id: usize, random: &mut dyn RandomSource) -> f64;

    /// Receive the outcome of a round. `price` is the settled second price
    /// (the same value for every recipient); `clicked` is Some only for the
    /// auction winner, since non-winners have no click information.
    /// This is the only channel through which a strategy may update its own
    /// internal state.
    fn notify(&mut self, auction_winner: bool, price: f64, clicked: Option<bool>);

    /// The bidder's own view of its balance, mirroring the auction ledger
    fn balance(&self) -> f64;

    /// Called by the auction after settlement to push the authoritative
    /// ledger value into the bidder's mirror
    fn sync_balance(&mut self, balance: f64);
}

/// Reference strategy: bids uniformly at random in [0, 1), rounded to
/// 3 decimal places. Keeps a history of the users it has bid on but does
/// not act on notifications.
pub struct RandomBidder {
    bidder_name: String,
    #[allow(dead_code)]
    num_users: usize,
    #[allow(dead_code)]
    num_rounds: u64,
    balance: f64,
    #[allow(dead_code)]
    history: Vec<usize>,
}

impl RandomBidder {
    /// Create a random bidder. `num_users` and `num_rounds` describe the run
    /// the bidder participates in; the reference strategy only keeps them for
    /// bookkeeping, they are not consulted by the auction.
    pub fn new(bidder_name: String, num_users: usize, num_rounds: u64) -> Self {
        Self {
            bidder_name,
            num_users,
            num_rounds,
            balance: 0.0,
            history: Vec::new(),
        }
    }
}

impl BidderTrait for RandomBidder {
    fn bidder_name(&self) -> &str {
        &self.bidder_name
    }

    fn bid(&mut self, user_id: usize, random: &mut dyn RandomSource) -> f64 {
        self.history.push(user_id);
        round3(random.uniform())
    }

    fn notify(&mut self, _auction_winner: bool, _price: f64, _clicked: Option<bool>) {
        // The reference strategy does not learn from outcomes
    }

    fn balance(&self) -> f64 {
        self.balance
    }

    fn sync_balance(&mut self, balance: f64) {
        self.balance = balance;
    }
}

/// Strategy that always bids the same fixed amount, regardless of the user.
/// Used by scenarios to make round outcomes exactly predictable.
pub struct FixedBidder {
    bidder_name: String,
    amount: f64,
    balance: f64,
}

impl FixedBidder {
    /// Create a bidder that always bids `amount`. Panics on a negative
    /// amount, since a fixed strategy returning negative bids would fail
    /// every round it qualifies for.
    pub fn new(bidder_name: String, amount: f64) -> Self {
        assert!(amount >= 0.0, "fixed bid amount must be non-negative");
        Self {
            bidder_name,
            amount,
            balance: 0.0,
        }
    }
}

impl BidderTrait for FixedBidder {
    fn bidder_name(&self) -> &str {
        &self.bidder_name
    }

    fn bid(&mut self, _user_id: usize, _random: &mut dyn RandomSource) -> f64 {
        self.amount
    }

    fn notify(&mut self, _auction_winner: bool, _price: f64, _clicked: Option<bool>) {}

    fn balance(&self) -> f64 {
        self.balance
    }

    fn sync_balance(&mut self, balance: f64) {
        self.balance = balance;
    }
}
