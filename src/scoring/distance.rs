use std::collections::HashMap;

use crate::models::RealValues;

/// Score one submission against the known real values.
///
/// Accumulates `(prediction - real)^2` over every outcome where both sides
/// carry a finite number and returns the square root of the sum. Outcomes
/// with an unknown real value or a blank prediction simply drop out of the
/// distance; the sum is not divided by the outcome count. When no outcome
/// qualifies at all the submission is unscoreable and the result is
/// `f64::INFINITY`, which sorts after every finite score.
pub fn score(predictions: &HashMap<String, f64>, real: &RealValues, outcomes: &[String]) -> f64 {
    let mut sum_squares = 0.0;
    let mut has_any = false;

    for outcome in outcomes {
        if let (Some(pred), Some(real_val)) = (predictions.get(outcome), real.get(outcome)) {
            if pred.is_finite() && real_val.is_finite() {
                let diff = pred - real_val;
                sum_squares += diff * diff;
                has_any = true;
            }
        }
    }

    if has_any {
        sum_squares.sqrt()
    } else {
        f64::INFINITY
    }
}
