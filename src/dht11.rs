use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin, PinState};

use crate::cache::SensorState;
use crate::config::{Config, LastBitPolicy};
use crate::error::DhtError;
use crate::frame::{FRAME_BITS, RawFrame, Reading, classify_bit};
use crate::interrupt::{InterruptControl, InterruptGuard, NoopInterruptControl};
use crate::pin::{DataLine, is_at};
use crate::sampler::{BusyDelay, Clock, PulseMeasure, Sampler, SoftwarePulse};

/// Driver for the DHT11 temperature and humidity sensor.
///
/// Owns the data line and the cached reading for one sensor. Queries are served
/// from the cache and only trigger a physical poll once the cached data is older
/// than [`Config::min_poll_interval_ms`].
pub struct Dht11<PIN, CLK, M = SoftwarePulse, I = NoopInterruptControl> {
    sampler: Sampler<PIN, CLK, M>,
    interrupts: I,
    config: Config,
    state: SensorState,
}

impl<PIN, CLK> Dht11<PIN, CLK>
where
    PIN: DataLine,
    CLK: Clock,
{
    /// Creates a new instance of the DHT11 driver with the default [`Config`].
    ///
    /// # Arguments
    ///
    /// * `pin` - The GPIO pin connected to the DHT11 data line.
    /// * `clock` - A monotonic microsecond clock used for every delay and timeout.
    pub fn new(pin: PIN, clock: CLK) -> Self {
        Dht11 {
            sampler: Sampler {
                pin,
                clock,
                pulse: SoftwarePulse,
            },
            interrupts: NoopInterruptControl,
            config: Config::new(),
            state: SensorState::new(),
        }
    }
}

impl<PIN, CLK, M, I> Dht11<PIN, CLK, M, I> {
    /// Replaces the timing and policy settings.
    ///
    /// # Arguments
    ///
    /// * `config` - The settings to use from the next poll on.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Replaces the pulse measurement strategy, e.g. with
    /// [`HardwarePulse`](crate::HardwarePulse).
    pub fn with_pulse_measure<M2>(self, pulse: M2) -> Dht11<PIN, CLK, M2, I> {
        let Sampler { pin, clock, .. } = self.sampler;
        Dht11 {
            sampler: Sampler { pin, clock, pulse },
            interrupts: self.interrupts,
            config: self.config,
            state: self.state,
        }
    }

    /// Masks interrupts through `interrupts` while the response and data bits are
    /// sampled.
    pub fn with_interrupt_control<I2>(self, interrupts: I2) -> Dht11<PIN, CLK, M, I2> {
        Dht11 {
            sampler: self.sampler,
            interrupts,
            config: self.config,
            state: self.state,
        }
    }

    /// Current settings.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Cached reading and poll bookkeeping.
    pub fn state(&self) -> &SensorState {
        &self.state
    }

    /// Gives back the pin and clock.
    pub fn release(self) -> (PIN, CLK) {
        (self.sampler.pin, self.sampler.clock)
    }
}

impl<PIN, CLK, M, I> Dht11<PIN, CLK, M, I>
where
    PIN: DataLine,
    CLK: Clock,
    M: PulseMeasure<PIN, CLK>,
    I: InterruptControl,
{
    /// Returns the temperature in degrees Celsius, polling the sensor first if the
    /// cached data is stale.
    ///
    /// Returns `0.0` until a poll has succeeded. A failed poll keeps the previous
    /// value. May block for up to the response timeout when a poll is due.
    pub fn read_temperature(&mut self) -> f32 {
        let _ = self.maybe_poll();
        self.state.reading().temperature
    }

    /// Returns the relative humidity in percent. See [`Dht11::read_temperature`].
    pub fn read_humidity(&mut self) -> f32 {
        let _ = self.maybe_poll();
        self.state.reading().humidity
    }

    /// True once any poll has succeeded.
    pub fn has_valid_data(&self) -> bool {
        self.state.has_valid_data()
    }

    /// True if the next query would poll the sensor.
    pub fn has_stale_data(&self) -> bool {
        self.state
            .is_stale(self.sampler.now_ms(), self.config.min_poll_interval_ms)
    }

    /// The cached reading, if any poll has succeeded. Never polls.
    pub fn reading(&self) -> Option<Reading> {
        self.state.has_valid_data().then(|| self.state.reading())
    }

    /// Polls the sensor if the cached data is stale.
    ///
    /// # Returns
    ///
    /// * `Ok(None)` if the cache is still fresh and nothing was done.
    /// * `Ok(Some(Reading))` if a poll ran and succeeded.
    /// * `Err(DhtError)` if a poll ran and failed; the cache is unchanged.
    pub fn maybe_poll(&mut self) -> Result<Option<Reading>, DhtError<PIN::Error>> {
        if self.has_stale_data() {
            self.poll().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Performs one complete read regardless of staleness.
    ///
    /// The poll timestamp is recorded before anything else, so a failed attempt
    /// still counts against the polling interval. The cache is only updated when
    /// the checksum matches.
    pub fn poll(&mut self) -> Result<Reading, DhtError<PIN::Error>> {
        let now_ms = self.sampler.now_ms();
        self.state.begin_poll(now_ms);

        self.start()?;

        let mut durations = [0u32; FRAME_BITS];
        let received = {
            let _guard = InterruptGuard::new(&mut self.interrupts);
            receive_frame(&mut self.sampler, &self.config, &mut durations)
        };

        #[cfg(feature = "defmt")]
        for (bit, us) in durations.iter().enumerate() {
            defmt::trace!("DHT11: bit {=usize}: {=u32} us", bit, *us);
        }

        let frame = match received {
            Ok(frame) => frame,
            Err(err) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("DHT11: poll failed: {}", defmt::Debug2Format(&err));
                return Err(err);
            }
        };

        #[cfg(feature = "defmt")]
        defmt::debug!("DHT11: raw data: {}", frame.bytes());

        if !frame.is_valid() {
            let expected = frame.computed_checksum();
            let actual = frame.checksum();
            #[cfg(feature = "defmt")]
            defmt::warn!(
                "DHT11: checksum error, expected {=u8}, got {=u8}",
                expected,
                actual
            );
            return Err(DhtError::ChecksumMismatch { expected, actual });
        }

        let reading = frame.reading();
        self.state.store(reading);

        #[cfg(feature = "defmt")]
        defmt::debug!(
            "DHT11: temperature {} C, humidity {} %",
            reading.temperature,
            reading.humidity
        );

        Ok(reading)
    }

    /// Sends the start signal and hands the line over to the sensor.
    ///
    /// The line is held low long enough to wake the sensor, then driven high
    /// briefly before the pin becomes a pulled-up input.
    fn start(&mut self) -> Result<(), DhtError<PIN::Error>> {
        let mut delay = BusyDelay::new(&self.sampler.clock);
        let pin = &mut self.sampler.pin;

        // MCU sends start request
        pin.configure_output()?;
        pin.set_low()?;
        delay.delay_ms(self.config.start_signal_low_ms);
        pin.set_high()?;
        delay.delay_us(self.config.release_us);

        pin.configure_input_pullup()?;
        Ok(())
    }
}

/// Checks the sensor's presence, follows its response preamble and samples the
/// 40 data bits.
///
/// Runs with interrupts masked, so it only records per-bit durations and leaves
/// logging to the caller.
fn receive_frame<PIN, CLK, M>(
    sampler: &mut Sampler<PIN, CLK, M>,
    config: &Config,
    durations: &mut [u32; FRAME_BITS],
) -> Result<RawFrame, DhtError<PIN::Error>>
where
    PIN: InputPin,
    CLK: Clock,
    M: PulseMeasure<PIN, CLK>,
{
    // A sensor that is listening pulls the line low right away
    if is_at(&mut sampler.pin, PinState::High)? {
        return Err(DhtError::NoResponse);
    }

    // Waiting for DHT11 response: ~80us low, then ~80us high
    let deadline = sampler.deadline_us(u64::from(config.response_timeout_ms) * 1000);
    sampler.wait_for_level(PinState::High, &deadline, DhtError::HandshakeTimeout)?;
    sampler.wait_for_level(PinState::Low, &deadline, DhtError::HandshakeTimeout)?;

    let mut frame = RawFrame::default();
    for (index, slot) in durations.iter_mut().enumerate() {
        // ~50us low, then ~28us high for a 0 or ~70us high for a 1. The line is
        // low here, so the measurement starts at this bit's rising edge.
        let high_us = sampler.measure_pulse_width(PinState::High, config.pulse_timeout_us)?;
        *slot = high_us;

        let bit = if high_us > 0 {
            classify_bit(high_us, config.bit_threshold_us)
        } else if index == FRAME_BITS - 1 && config.last_bit == LastBitPolicy::AssumeOne {
            true
        } else {
            return Err(DhtError::BitTimeout { bit: index as u8 });
        };
        frame.push_bit(index, bit);
    }

    Ok(frame)
}
