/// What to do when the final data bit times out.
///
/// Some sensors release the line straight after the 40th bit instead of producing
/// a clean trailing edge, so its HIGH pulse never ends inside the timeout window.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LastBitPolicy {
    /// Abort the frame like any other bit timeout.
    #[default]
    Fail,
    /// Record the final bit as `1` and go on to the checksum.
    AssumeOne,
}

/// Protocol timings and polling policy.
///
/// The defaults match the DHT11 datasheet and are what [`Dht11::new`] uses.
///
/// [`Dht11::new`]: crate::Dht11::new
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Minimum time between two physical polls, in milliseconds.
    pub min_poll_interval_ms: u32,
    /// How long the start signal holds the line low, in milliseconds.
    pub start_signal_low_ms: u32,
    /// How long the line is driven high before switching to input, in microseconds.
    pub release_us: u32,
    /// Deadline for the whole response preamble, in milliseconds.
    pub response_timeout_ms: u32,
    /// Timeout for a single pulse during the data phase, in microseconds.
    pub pulse_timeout_us: u32,
    /// HIGH durations strictly greater than this many microseconds decode as `1`.
    pub bit_threshold_us: u32,
    /// Handling of a timeout on the 40th bit.
    pub last_bit: LastBitPolicy,
}

impl Config {
    /// DHT11 datasheet timings: 2 s between polls, 18 ms start signal, 500 ms
    /// response timeout, 200 µs per pulse and a 40 µs bit threshold. A timeout on
    /// the last bit fails the poll.
    pub const fn new() -> Self {
        Config {
            min_poll_interval_ms: 2000,
            start_signal_low_ms: 18,
            release_us: 40,
            response_timeout_ms: 500,
            pulse_timeout_us: 200,
            bit_threshold_us: 40,
            last_bit: LastBitPolicy::Fail,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
