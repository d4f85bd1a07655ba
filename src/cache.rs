//! Last good reading and the polling rate limit.

use crate::frame::Reading;

/// Cached state of one sensor.
///
/// The reading is only ever replaced as a whole after a checksum-valid frame, and
/// nothing a failed poll does can clear it.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SensorState {
    reading: Reading,
    last_poll_ms: u64,
    has_valid_data: bool,
}

impl SensorState {
    /// Starts from zero: no reading, no valid data, last poll at time 0.
    ///
    /// With the poll time at 0 the sensor is not stale until the poll interval has
    /// passed since the clock's epoch, which gives the sensor its power-up settle
    /// time when the clock counts from boot.
    pub const fn new() -> Self {
        SensorState {
            reading: Reading {
                temperature: 0.0,
                humidity: 0.0,
            },
            last_poll_ms: 0,
            has_valid_data: false,
        }
    }

    /// Last successful reading, or zeros before the first one.
    pub fn reading(&self) -> Reading {
        self.reading
    }

    /// True once any poll has succeeded. Never reverts.
    pub fn has_valid_data(&self) -> bool {
        self.has_valid_data
    }

    /// Start time of the most recent poll attempt, successful or not.
    pub fn last_poll_ms(&self) -> u64 {
        self.last_poll_ms
    }

    /// True once more than `interval_ms` has passed since the last poll attempt.
    ///
    /// # Arguments
    ///
    /// * `now_ms` - Current time in milliseconds on the driver's clock.
    /// * `interval_ms` - Minimum time between polls.
    pub fn is_stale(&self, now_ms: u64, interval_ms: u32) -> bool {
        self.last_poll_ms.saturating_add(u64::from(interval_ms)) < now_ms
    }

    /// Records the start of a poll attempt. The timestamp never moves backwards.
    pub(crate) fn begin_poll(&mut self, now_ms: u64) {
        self.last_poll_ms = self.last_poll_ms.max(now_ms);
    }

    /// Replaces the reading and marks the data valid.
    pub(crate) fn store(&mut self, reading: Reading) {
        self.reading = reading;
        self.has_valid_data = true;
    }
}
