//! The 5-byte DHT11 data frame and the bit/byte decoding rules.

/// Number of data bits the sensor sends per frame.
pub const FRAME_BITS: usize = 40;

/// Reading decoded from a valid frame.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Reading {
    /// Temperature in degrees Celsius.
    pub temperature: f32,
    /// Relative humidity in percent.
    pub humidity: f32,
}

/// Raw frame as transmitted: humidity integer, humidity tenths, temperature
/// integer, temperature tenths, checksum.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RawFrame {
    bytes: [u8; 5],
}

impl RawFrame {
    /// Wraps five bytes as received: humidity, humidity tenths, temperature,
    /// temperature tenths, checksum.
    pub const fn from_bytes(bytes: [u8; 5]) -> Self {
        RawFrame { bytes }
    }

    /// The five bytes in transmission order.
    pub const fn bytes(&self) -> [u8; 5] {
        self.bytes
    }

    /// Shifts `bit` into the byte that owns bit `index`, MSB first.
    ///
    /// Bits must be pushed in transmission order for the bytes to come out right.
    pub fn push_bit(&mut self, index: usize, bit: bool) {
        let byte = &mut self.bytes[index / 8];
        *byte = (*byte << 1) | u8::from(bit);
    }

    pub const fn humidity_int(&self) -> u8 {
        self.bytes[0]
    }

    pub const fn humidity_frac(&self) -> u8 {
        self.bytes[1]
    }

    pub const fn temperature_int(&self) -> u8 {
        self.bytes[2]
    }

    pub const fn temperature_frac(&self) -> u8 {
        self.bytes[3]
    }

    /// Checksum byte sent by the sensor.
    pub const fn checksum(&self) -> u8 {
        self.bytes[4]
    }

    /// Sum of the four data bytes, truncated to 8 bits.
    pub fn computed_checksum(&self) -> u8 {
        self.bytes[..4]
            .iter()
            .fold(0u8, |sum, v| sum.wrapping_add(*v))
    }

    /// True if the checksum byte matches the data bytes.
    pub fn is_valid(&self) -> bool {
        self.computed_checksum() == self.checksum()
    }

    /// Decodes the integer-and-tenths encoding of the data bytes.
    ///
    /// Does not look at the checksum; call [`RawFrame::is_valid`] first.
    pub fn reading(&self) -> Reading {
        Reading {
            temperature: f32::from(self.temperature_int())
                + f32::from(self.temperature_frac()) * 0.1,
            humidity: f32::from(self.humidity_int()) + f32::from(self.humidity_frac()) * 0.1,
        }
    }
}

/// Classifies a HIGH pulse: `1` iff it lasted strictly longer than `threshold_us`.
///
/// A "0" is sent as ~28us and a "1" as ~70us, so a pulse of exactly the
/// threshold decodes as `0`.
pub fn classify_bit(high_us: u32, threshold_us: u32) -> bool {
    high_us > threshold_us
}
