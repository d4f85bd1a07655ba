use core::fmt;

/// Reasons a poll of the DHT11 can fail.
///
/// None of these are fatal. A failed poll leaves the cached reading untouched and
/// the next stale query simply tries again.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, PartialEq, Eq)]
pub enum DhtError<E> {
    /// The sensor did not pull the line low after the start signal.
    NoResponse,
    /// The response preamble edges did not arrive before the response deadline.
    HandshakeTimeout,
    /// A pulse in the 40-bit data phase exceeded its timeout window.
    BitTimeout {
        /// Index of the failing bit, 0..=39 in transmission order.
        bit: u8,
    },
    /// The transmitted checksum byte disagrees with the sum of the data bytes.
    ChecksumMismatch {
        /// Truncated sum of the four data bytes.
        expected: u8,
        /// Checksum byte sent by the sensor.
        actual: u8,
    },
    /// Error from the GPIO pin (input/output).
    PinError(E),
}

impl<E> From<E> for DhtError<E> {
    fn from(value: E) -> Self {
        Self::PinError(value)
    }
}

impl<E: fmt::Debug> fmt::Display for DhtError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DhtError::NoResponse => f.write_str("sensor did not respond to the start signal"),
            DhtError::HandshakeTimeout => f.write_str("timed out waiting for the response preamble"),
            DhtError::BitTimeout { bit } => write!(f, "timed out reading data bit {bit}"),
            DhtError::ChecksumMismatch { expected, actual } => write!(
                f,
                "checksum mismatch (expected {expected:#04x}, got {actual:#04x})"
            ),
            DhtError::PinError(err) => write!(f, "pin error: {err:?}"),
        }
    }
}
