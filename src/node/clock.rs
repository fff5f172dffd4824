//! Logical clock for a time node
//!
//! The clock drifts only through explicit ticks and accepts additive
//! corrections. It carries a full timestamp internally but is displayed as a
//! date-independent `HH:MM:SS` string.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use thiserror::Error;

// ============================================================================
// Clock Errors
// ============================================================================

/// Logical clock errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockError {
    /// Correction delta was not a finite number
    #[error("Invalid offset value. It must be a number.")]
    InvalidInput,

    /// Correction delta would move the clock outside the representable range
    #[error("Correction moves the clock out of range")]
    OutOfRange,
}

// ============================================================================
// Logical Clock
// ============================================================================

/// In-memory clock mutated by ticks, a one-time startup skew, and external
/// corrections.
///
/// All mutations happen in whole-operation critical sections behind the
/// owning service's lock, so the value is monotonically non-decreasing except
/// for explicit corrections (which may be negative).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogicalClock {
    value: DateTime<Utc>,
}

impl LogicalClock {
    /// Create a clock starting at the current wall-clock time
    pub fn starting_now() -> Self {
        Self { value: Utc::now() }
    }

    /// Create a clock starting at a fixed instant
    pub fn at(value: DateTime<Utc>) -> Self {
        Self { value }
    }

    /// Advance the clock by exactly one second
    pub fn tick(&mut self) {
        self.value += Duration::seconds(1);
    }

    /// Add a one-time startup skew of whole seconds (may be negative)
    pub fn apply_skew(&mut self, seconds: i64) {
        self.value += Duration::seconds(seconds);
    }

    /// Add `delta_seconds` to the current value, returning the new display
    /// string.
    ///
    /// The delta is applied as whole milliseconds relative to the value at
    /// application time. A non-finite delta leaves the clock untouched and
    /// surfaces [`ClockError::InvalidInput`] to the caller.
    pub fn apply_correction(&mut self, delta_seconds: f64) -> Result<String, ClockError> {
        if !delta_seconds.is_finite() {
            return Err(ClockError::InvalidInput);
        }

        let millis = (delta_seconds * 1000.0).round() as i64;
        self.value = self
            .value
            .checked_add_signed(Duration::milliseconds(millis))
            .ok_or(ClockError::OutOfRange)?;

        Ok(self.formatted())
    }

    /// Current value as a full timestamp
    pub fn value(&self) -> DateTime<Utc> {
        self.value
    }

    /// Current value as a zero-padded `HH:MM:SS` display string
    pub fn formatted(&self) -> String {
        self.value.format("%H:%M:%S").to_string()
    }
}

/// Draw the one-time startup skew, uniform over `[-range_secs, range_secs]`
/// inclusive.
pub fn random_skew(range_secs: i64) -> i64 {
    if range_secs == 0 {
        return 0;
    }
    rand::thread_rng().gen_range(-range_secs..=range_secs)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_clock() -> LogicalClock {
        LogicalClock::at(Utc.with_ymd_and_hms(2024, 1, 15, 9, 5, 3).unwrap())
    }

    #[test]
    fn test_tick_advances_one_second() {
        let mut clock = fixed_clock();
        let before = clock.value();
        clock.tick();
        assert_eq!(clock.value() - before, Duration::seconds(1));
    }

    #[test]
    fn test_formatted_is_zero_padded() {
        let clock = fixed_clock();
        assert_eq!(clock.formatted(), "09:05:03");
    }

    #[test]
    fn test_correction_changes_value_by_exact_delta() {
        let mut clock = fixed_clock();
        let before = clock.value();

        clock.apply_correction(2.5).unwrap();
        assert_eq!(clock.value() - before, Duration::milliseconds(2500));
    }

    #[test]
    fn test_negative_correction() {
        let mut clock = fixed_clock();
        let before = clock.value();

        let display = clock.apply_correction(-3.0).unwrap();
        assert_eq!(clock.value() - before, Duration::seconds(-3));
        assert_eq!(display, "09:05:00");
    }

    #[test]
    fn test_fractional_correction_rounds_to_millis() {
        let mut clock = fixed_clock();
        let before = clock.value();

        clock.apply_correction(-0.667).unwrap();
        assert_eq!(clock.value() - before, Duration::milliseconds(-667));
    }

    #[test]
    fn test_non_finite_correction_leaves_clock_unchanged() {
        let mut clock = fixed_clock();
        let before = clock.value();

        assert_eq!(clock.apply_correction(f64::NAN), Err(ClockError::InvalidInput));
        assert_eq!(clock.apply_correction(f64::INFINITY), Err(ClockError::InvalidInput));
        assert_eq!(clock.value(), before);
    }

    #[test]
    fn test_skew_shifts_whole_seconds() {
        let mut clock = fixed_clock();
        let before = clock.value();

        clock.apply_skew(-42);
        assert_eq!(clock.value() - before, Duration::seconds(-42));
    }

    #[test]
    fn test_random_skew_stays_in_range() {
        for _ in 0..1000 {
            let skew = random_skew(60);
            assert!((-60..=60).contains(&skew), "skew {skew} out of range");
        }
    }

    #[test]
    fn test_random_skew_zero_range() {
        assert_eq!(random_skew(0), 0);
    }

    #[test]
    fn test_ticks_are_monotonic() {
        let mut clock = fixed_clock();
        let mut last = clock.value();
        for _ in 0..10 {
            clock.tick();
            assert!(clock.value() > last);
            last = clock.value();
        }
    }
}
