//! Elo math.
//!
//! `expected_a = 1 / (1 + 10^((rating_b - rating_a) / 400))`
//! `rating_a' = rating_a + K * (score_a - expected_a)`
//!
//! Pure functions; the rater owns state.

use curia_types::{CuriaError, Result};

/// Rating difference that multiplies the odds by ten.
const ELO_SCALE: f64 = 400.0;

/// Probability that an agent rated `rating_a` beats one rated `rating_b`.
#[must_use]
pub fn expected_score(rating_a: f64, rating_b: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf((rating_b - rating_a) / ELO_SCALE))
}

/// New ratings for both sides given their scores (1, 0.5 or 0).
///
/// # Errors
/// [`CuriaError::InvalidMatch`] when `k` is not a positive finite number or
/// a score is outside `[0, 1]`.
pub fn calculate_ratings(
    rating_a: f64,
    rating_b: f64,
    score_a: f64,
    score_b: f64,
    k: f64,
) -> Result<(f64, f64)> {
    if !k.is_finite() || k <= 0.0 {
        return Err(CuriaError::InvalidMatch {
            reason: format!("K-factor must be positive and finite, got {k}"),
        });
    }
    for score in [score_a, score_b] {
        if !(0.0..=1.0).contains(&score) {
            return Err(CuriaError::InvalidMatch {
                reason: format!("score {score} outside [0, 1]"),
            });
        }
    }
    let expected_a = expected_score(rating_a, rating_b);
    let expected_b = expected_score(rating_b, rating_a);
    Ok((
        rating_a + k * (score_a - expected_a),
        rating_b + k * (score_b - expected_b),
    ))
}
