//! Pure metric-to-style mappings for map markers.

/// Bucket colors by ascending metric threshold, lowest intensity first.
const COLOR_BASE: &str = "#1f78b4";
const COLOR_LOW: &str = "#a6cee3";
const COLOR_MID: &str = "#fdbf6f";
const COLOR_HIGH: &str = "#fb9a99";
const COLOR_MAX: &str = "#e31a1c";

/// Minimum marker radius in pixels.
const RADIUS_MIN: f64 = 6.0;
/// Maximum marker radius in pixels.
const RADIUS_MAX: f64 = 40.0;

/// Buckets a metric value into one of five fixed colors.
///
/// Non-finite and non-positive values map to the lowest-intensity bucket.
#[must_use]
pub fn color_for_value(value: f64) -> &'static str {
    if !value.is_finite() || value <= 0.0 {
        return COLOR_BASE;
    }
    if value >= 80.0 {
        COLOR_MAX
    } else if value >= 40.0 {
        COLOR_HIGH
    } else if value >= 20.0 {
        COLOR_MID
    } else if value >= 10.0 {
        COLOR_LOW
    } else {
        COLOR_BASE
    }
}

/// Maps a metric value to a marker radius: `min(40, 6 + 6·ln(1+v))` for
/// finite positive values, the minimum radius otherwise.
#[must_use]
pub fn radius_for_value(value: f64) -> f64 {
    if !value.is_finite() || value <= 0.0 {
        return RADIUS_MIN;
    }
    RADIUS_MAX.min(RADIUS_MIN + 6.0 * (1.0 + value).ln())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degenerate_values_share_the_base_bucket() {
        assert_eq!(color_for_value(0.0), color_for_value(-5.0));
        assert_eq!(color_for_value(0.0), color_for_value(f64::NAN));
        assert_eq!(color_for_value(0.0), color_for_value(f64::NEG_INFINITY));
        assert_eq!(color_for_value(0.0), COLOR_BASE);
    }

    #[test]
    fn buckets_cross_at_exact_thresholds() {
        assert_ne!(color_for_value(80.0), color_for_value(79.0));
        assert_ne!(color_for_value(40.0), color_for_value(39.0));
        assert_ne!(color_for_value(20.0), color_for_value(19.0));
        assert_ne!(color_for_value(10.0), color_for_value(9.0));
        assert_eq!(color_for_value(9.0), COLOR_BASE);
        assert_eq!(color_for_value(1e12), COLOR_MAX);
    }

    #[test]
    fn radius_floor_and_ceiling() {
        assert!((radius_for_value(0.0) - 6.0).abs() < f64::EPSILON);
        assert!((radius_for_value(-1.0) - 6.0).abs() < f64::EPSILON);
        assert!((radius_for_value(f64::NAN) - 6.0).abs() < f64::EPSILON);
        assert!((radius_for_value(1e12) - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn radius_is_monotone_on_nonnegatives() {
        let mut prev = radius_for_value(0.0);
        for i in 0..=1000 {
            let v = f64::from(i) * 0.5;
            let r = radius_for_value(v);
            assert!(r >= prev, "radius decreased at v={v}");
            assert!((6.0..=40.0).contains(&r));
            prev = r;
        }
    }
}
