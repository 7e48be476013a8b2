//! Trend score arithmetic.

/// Age after which a post stops trending, in hours.
pub const DECAY_HORIZON_HOURS: f64 = 168.0;

/// Time decay for a record `age_hours` old.
///
/// `1 / sqrt(max(h + 1, 1))` up to [`DECAY_HORIZON_HOURS`], zero after.
#[must_use]
pub fn decay(age_hours: f64) -> f64 {
    if age_hours > DECAY_HORIZON_HOURS {
        return 0.0;
    }
    1.0 / (age_hours + 1.0).max(1.0).sqrt()
}

/// `view_count * decay(age_hours)`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn trend_score(view_count: u64, age_hours: f64) -> f64 {
    view_count as f64 * decay(age_hours)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decay_is_one_for_fresh_records() {
        assert!((decay(0.0) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_decay_clamps_negative_age() {
        assert!((decay(-5.0) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_decay_at_three_hours_is_one_half() {
        assert!((decay(3.0) - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_score_strictly_decreases_with_age() {
        // Arrange
        let ages = [0.0, 0.5, 1.0, 24.0, 100.0, 167.9, 168.0];

        // Act
        let scores: Vec<f64> = ages.iter().map(|h| trend_score(10, *h)).collect();

        // Assert
        for pair in scores.windows(2) {
            assert!(pair[0] > pair[1], "{} should exceed {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_score_is_zero_past_horizon() {
        assert!(trend_score(1_000, 168.01).abs() < f64::EPSILON);
        assert!(trend_score(1_000, 500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_score_scales_with_views() {
        let one = trend_score(1, 8.0);

        let many = trend_score(6, 8.0);

        assert!((many - 6.0 * one).abs() < 1e-12);
    }
}
