//! Request freshness enforcement (clock skew window).

use crate::clock::Clock;
use crate::SealgateError;
use std::time::Duration;

/// Default maximum `|now - timestamp|` in seconds.
pub const DEFAULT_SKEW_SECONDS: u64 = 90;

/// Parse the `x-timestamp` header: decimal Unix seconds.
///
/// Only plain base-10 integers are accepted. Fractional (`1736942400.0`) and
/// exponent (`1e9`) spellings are refused even though a JavaScript
/// `Number()` would take them, because the preimage carries the header's
/// integer form and two spellings must not sign the same instant.
///
/// Zero and non-numeric values are treated as absent, so they surface as
/// `MissingHeaders` like any other unusable header.
pub fn parse_timestamp(header: &str) -> Result<i64, SealgateError> {
    match header.trim().parse::<i64>() {
        Ok(0) | Err(_) => Err(SealgateError::MissingHeaders),
        Ok(ts) => Ok(ts),
    }
}

/// Check that `timestamp` is within `skew` of the clock, in either direction.
///
/// # Errors
/// * `ClockSkew` - `|now - timestamp|` exceeds `skew`
pub fn check_skew<C: Clock + ?Sized>(
    timestamp: i64,
    skew: Duration,
    clock: &C,
) -> Result<(), SealgateError> {
    let skew_seconds = clock.now_unix().saturating_sub(timestamp);
    let allowed = i64::try_from(skew.as_secs()).unwrap_or(i64::MAX);

    if skew_seconds.saturating_abs() > allowed {
        return Err(SealgateError::ClockSkew { skew_seconds });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;

    const NOW: i64 = 1_736_942_400;
    const SKEW: Duration = Duration::from_secs(DEFAULT_SKEW_SECONDS);

    #[test]
    fn test_parse_timestamp_valid() {
        assert_eq!(parse_timestamp("1736942400").unwrap(), NOW);
        assert_eq!(parse_timestamp(" 1736942400 ").unwrap(), NOW);
    }

    #[test]
    fn test_parse_timestamp_unusable() {
        for header in ["", "0", "abc", "17369424.5", "1736942400.0", "1e9", "+1e9", "0x10"] {
            assert!(
                matches!(parse_timestamp(header), Err(SealgateError::MissingHeaders)),
                "{header:?}"
            );
        }
    }

    #[test]
    fn test_skew_within_window() {
        let clock = MockClock::from_unix(NOW);
        assert!(check_skew(NOW, SKEW, &clock).is_ok());
        assert!(check_skew(NOW - 60, SKEW, &clock).is_ok());
        assert!(check_skew(NOW + 60, SKEW, &clock).is_ok());
    }

    #[test]
    fn test_skew_boundary_is_inclusive() {
        let clock = MockClock::from_unix(NOW);
        assert!(check_skew(NOW - 90, SKEW, &clock).is_ok());
        assert!(check_skew(NOW + 90, SKEW, &clock).is_ok());
        assert!(check_skew(NOW - 91, SKEW, &clock).is_err());
        assert!(check_skew(NOW + 91, SKEW, &clock).is_err());
    }

    #[test]
    fn test_skew_stale_request() {
        let clock = MockClock::from_unix(NOW);
        let result = check_skew(NOW - 1000, SKEW, &clock);
        assert!(matches!(
            result,
            Err(SealgateError::ClockSkew { skew_seconds: 1000 })
        ));
    }

    #[test]
    fn test_skew_future_request() {
        let clock = MockClock::from_unix(NOW);
        let result = check_skew(NOW + 500, SKEW, &clock);
        assert!(matches!(
            result,
            Err(SealgateError::ClockSkew { skew_seconds: -500 })
        ));
    }

    #[test]
    fn test_skew_extreme_timestamps_do_not_overflow() {
        let clock = MockClock::from_unix(NOW);
        assert!(check_skew(i64::MIN, SKEW, &clock).is_err());
        assert!(check_skew(i64::MAX, SKEW, &clock).is_err());
    }
}
