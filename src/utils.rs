use std::sync::atomic::{AtomicBool, AtomicU64};

/// Base seed for the current iteration, set by main before each run.
/// Individual rng streams derive their seed from this via get_seed().
pub static RAND_SEED: AtomicU64 = AtomicU64::new(0);

/// When enabled, each auction round emits a CSV line at the Round log level.
pub static VERBOSE_ROUND: AtomicBool = AtomicBool::new(false);

/// Total auction rounds executed across all scenarios in this process.
pub static TOTAL_AUCTION_ROUNDS: AtomicU64 = AtomicU64::new(0);

/// Derive a per-stream seed from the global base seed.
/// Different streams must pass different stream ids so that user selection,
/// bidding, and click draws stay independent under the same base seed.
pub fn get_seed(stream: u64) -> u64 {
    let base = RAND_SEED.load(std::sync::atomic::Ordering::Relaxed);
    base.wrapping_mul(0x9E37_79B9_7F4A_7C15).wrapping_add(stream)
}

/// Round a dollar amount to 3 decimal places (the reference bid granularity).
pub fn round3(amount: f64) -> f64 {
    (amount * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    #[test]
    fn test_round3() {
        assert_eq!(round3(0.12349), 0.123);
        assert_eq!(round3(0.12351), 0.124);
        assert_eq!(round3(1.0), 1.0);
        assert_eq!(round3(0.0), 0.0);
    }

    #[test]
    fn test_get_seed_streams_differ() {
        RAND_SEED.store(7, Ordering::Relaxed);
        assert_ne!(get_seed(1001), get_seed(2002));
    }
}
