//! Time-window function shared by token issuance and verification.
//!
//! Both sides bucket wall-clock time into the same clock-aligned windows, so
//! they agree on the current window without any synchronization beyond the
//! configured leeway.

/// Map a unix timestamp to the start of its validity window.
///
/// `window_start = floor(now / interval) * interval`, whole seconds.
/// `interval` must be positive (enforced when the config is loaded).
pub fn window_start(now_ts: i64, interval: i64) -> i64 {
    debug_assert!(interval > 0);
    now_ts.div_euclid(interval) * interval
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floors_to_interval_boundary() {
        assert_eq!(window_start(0, 30), 0);
        assert_eq!(window_start(29, 30), 0);
        assert_eq!(window_start(30, 30), 30);
        assert_eq!(window_start(1_731_000_017, 30), 1_731_000_000);
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(window_start(1000, 30), window_start(1000, 30));
    }

    #[test]
    fn test_periodic_across_interval_shifts() {
        // window(t + k*I) == window(t) + k*I
        let interval = 30;
        for t in [0i64, 7, 29, 1000, 1_731_000_011] {
            for k in [-3i64, -1, 0, 1, 2, 100] {
                assert_eq!(
                    window_start(t + k * interval, interval),
                    window_start(t, interval) + k * interval
                );
            }
        }
    }

    #[test]
    fn test_negative_timestamps_floor_downwards() {
        assert_eq!(window_start(-1, 30), -30);
        assert_eq!(window_start(-30, 30), -30);
        assert_eq!(window_start(-31, 30), -60);
    }
}
