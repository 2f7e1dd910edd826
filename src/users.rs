use crate::random::RandomSource;

/// A simulated user with a secret probability of clicking an ad.
///
/// The probability is ground truth used only to generate click outcomes.
/// It is never exposed through the public interface, so neither bidders nor
/// the auction can condition on it.
pub struct User {
    probability: f64,
}

impl User {
    /// Create a user with an explicit click probability in [0, 1].
    /// Panics on a probability outside that range.
    pub fn new(probability: f64) -> Self {
        assert!(
            (0.0..=1.0).contains(&probability),
            "click probability must be in [0, 1], got {}",
            probability
        );
        Self { probability }
    }

    /// Create a user with a click probability drawn uniformly from [0, 1)
    pub fn random(random: &mut dyn RandomSource) -> Self {
        Self {
            probability: random.uniform(),
        }
    }

    /// Show an ad to this user; returns true if the user clicks
    pub fn show_ad(&self, random: &mut dyn RandomSource) -> bool {
        random.bernoulli(self.probability)
    }
}

/// Create a pool of users with uniformly random click probabilities
pub fn random_pool(num_users: usize, random: &mut dyn RandomSource) -> Vec<User> {
    (0..num_users).map(|_| User::random(random)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::SeededRandom;

    #[test]
    fn test_always_clicks_at_probability_one() {
        let mut random = SeededRandom::new(11);
        let user = User::new(1.0);
        for _ in 0..100 {
            assert!(user.show_ad(&mut random));
        }
    }

    #[test]
    fn test_never_clicks_at_probability_zero() {
        let mut random = SeededRandom::new(12);
        let user = User::new(0.0);
        for _ in 0..100 {
            assert!(!user.show_ad(&mut random));
        }
    }

    #[test]
    fn test_random_pool_size() {
        let mut random = SeededRandom::new(13);
        assert_eq!(random_pool(25, &mut random).len(), 25);
    }

    #[test]
    #[should_panic]
    fn test_rejects_probability_above_one() {
        User::new(1.5);
    }
}
