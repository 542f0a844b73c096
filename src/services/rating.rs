/// K factor used when none is configured.
pub const DEFAULT_K_FACTOR: f64 = 32.0;

/// Ratings and deltas produced for one finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatingChange {
    /// Winner rating after the game.
    pub winner_rating: i32,
    /// Loser rating after the game.
    pub loser_rating: i32,
    /// Points gained by the winner.
    pub winner_delta: i32,
    /// Points lost by the loser, as a negative number.
    pub loser_delta: i32,
}

/// Elo update for a decisive game.
///
/// Deltas are rounded half away from zero (`f64::round`), so an even match
/// with K = 32 moves both players by exactly 16.
#[derive(Debug, Clone, Copy)]
pub struct RatingCalculator {
    k_factor: f64,
}

impl Default for RatingCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_K_FACTOR)
    }
}

impl RatingCalculator {
    /// Calculator with the given K factor.
    pub fn new(k_factor: f64) -> Self {
        Self { k_factor }
    }

    /// Rating changes after `winner_rating` beat `loser_rating`.
    pub fn calculate(&self, winner_rating: i32, loser_rating: i32) -> RatingChange {
        let expected_winner = expected_score(winner_rating, loser_rating);
        let expected_loser = expected_score(loser_rating, winner_rating);

        let winner_delta = (self.k_factor * (1.0 - expected_winner)).round() as i32;
        let loser_delta = (self.k_factor * (0.0 - expected_loser)).round() as i32;

        RatingChange {
            winner_rating: winner_rating + winner_delta,
            loser_rating: loser_rating + loser_delta,
            winner_delta,
            loser_delta,
        }
    }
}

/// Logistic expectation of `own` scoring against `other`.
fn expected_score(own: i32, other: i32) -> f64 {
    1.0 / (1.0 + 10f64.powf(f64::from(other - own) / 400.0))
}
