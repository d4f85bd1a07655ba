//! Busy-wait timing primitives built on a monotonic microsecond clock.
//!
//! Everything here blocks the calling context. The protocol distinguishes pulses
//! that are tens of microseconds apart, which no scheduler tick can resolve, and
//! nothing in this module yields.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, PinState};

use crate::error::DhtError;
use crate::pin::{PulseCapture, is_at};

/// Monotonic microsecond time source.
pub trait Clock {
    /// Microseconds since some fixed point, never decreasing.
    ///
    /// Delays and deadlines use wrapping differences and tolerate a wrap in the
    /// middle of a poll. The poll-interval bookkeeping compares absolute
    /// milliseconds and assumes the counter does not wrap, which a 64-bit
    /// microsecond counter does not do in practice.
    fn now_us(&self) -> u64;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_us(&self) -> u64 {
        (**self).now_us()
    }
}

/// Spins until at least `us` microseconds have passed on `clock`.
pub fn busy_wait_us<C: Clock>(clock: &C, us: u64) {
    let start = clock.now_us();
    while clock.now_us().wrapping_sub(start) < us {
        core::hint::spin_loop();
    }
}

/// [`DelayNs`] implementation that spins on a [`Clock`].
pub struct BusyDelay<C> {
    clock: C,
}

impl<C: Clock> BusyDelay<C> {
    /// Creates a delay provider that spins on `clock`.
    ///
    /// # Arguments
    ///
    /// * `clock` - The time source to measure elapsed time against. A reference
    ///   to a clock works as well.
    pub fn new(clock: C) -> Self {
        BusyDelay { clock }
    }
}

impl<C: Clock> DelayNs for BusyDelay<C> {
    fn delay_ns(&mut self, ns: u32) {
        busy_wait_us(&self.clock, u64::from(ns.div_ceil(1000)));
    }

    fn delay_us(&mut self, us: u32) {
        busy_wait_us(&self.clock, u64::from(us));
    }

    fn delay_ms(&mut self, ms: u32) {
        busy_wait_us(&self.clock, u64::from(ms) * 1000);
    }
}

/// A point in time after which waiting is abandoned.
#[derive(Clone, Copy, Debug)]
pub struct Deadline {
    start_us: u64,
    budget_us: u64,
}

impl Deadline {
    /// Starts a deadline `budget_us` microseconds from now.
    pub fn after<C: Clock>(clock: &C, budget_us: u64) -> Self {
        Deadline {
            start_us: clock.now_us(),
            budget_us,
        }
    }

    /// True once more than the budget has elapsed on `clock`.
    pub fn expired<C: Clock>(&self, clock: &C) -> bool {
        clock.now_us().wrapping_sub(self.start_us) > self.budget_us
    }
}

/// Strategy for measuring how long the line holds a level.
///
/// Both implementations honor the same contract: wait for the next edge into
/// `level`, then time how long the line stays there. A pulse already in progress
/// when the call starts is skipped. The result is the duration in microseconds, or
/// `0` if the edge did not come or the pulse did not end within `timeout_us`.
pub trait PulseMeasure<P: InputPin, C: Clock> {
    fn measure_pulse_width(
        &mut self,
        pin: &mut P,
        clock: &C,
        level: PinState,
        timeout_us: u32,
    ) -> Result<u32, P::Error>;
}

/// Times pulses by polling the pin against the clock.
///
/// The loop body is one pin read and one clock read, which has to stay well
/// under the ~28us "0" pulse for the measurement to be usable.
#[derive(Clone, Copy, Debug, Default)]
pub struct SoftwarePulse;

impl<P: InputPin, C: Clock> PulseMeasure<P, C> for SoftwarePulse {
    fn measure_pulse_width(
        &mut self,
        pin: &mut P,
        clock: &C,
        level: PinState,
        timeout_us: u32,
    ) -> Result<u32, P::Error> {
        let limit = u64::from(timeout_us);

        // let a pulse that is already running finish first
        let sync = clock.now_us();
        while is_at(pin, level)? {
            if clock.now_us().wrapping_sub(sync) > limit {
                return Ok(0);
            }
        }

        let edge = clock.now_us();
        while !is_at(pin, level)? {
            if clock.now_us().wrapping_sub(edge) > limit {
                return Ok(0);
            }
        }

        let start = clock.now_us();
        loop {
            let held = is_at(pin, level)?;
            let elapsed = clock.now_us().wrapping_sub(start);
            if elapsed > limit {
                return Ok(0);
            }
            if !held {
                // zero is reserved for timeouts
                return Ok((elapsed as u32).max(1));
            }
        }
    }
}

/// Delegates to the pin's edge-triggered [`PulseCapture`] hardware.
#[derive(Clone, Copy, Debug, Default)]
pub struct HardwarePulse;

impl<P: InputPin + PulseCapture, C: Clock> PulseMeasure<P, C> for HardwarePulse {
    fn measure_pulse_width(
        &mut self,
        pin: &mut P,
        _clock: &C,
        level: PinState,
        timeout_us: u32,
    ) -> Result<u32, P::Error> {
        pin.measure_pulse(level, timeout_us)
    }
}

/// The pin, clock and pulse strategy used for one sensor.
pub(crate) struct Sampler<P, C, M> {
    pub(crate) pin: P,
    pub(crate) clock: C,
    pub(crate) pulse: M,
}

impl<P, C, M> Sampler<P, C, M>
where
    P: InputPin,
    C: Clock,
    M: PulseMeasure<P, C>,
{
    pub(crate) fn now_ms(&self) -> u64 {
        self.clock.now_us() / 1000
    }

    pub(crate) fn deadline_us(&self, budget_us: u64) -> Deadline {
        Deadline::after(&self.clock, budget_us)
    }

    /// Polls until the pin reads `level`, or returns `on_timeout` once `deadline`
    /// has passed.
    pub(crate) fn wait_for_level(
        &mut self,
        level: PinState,
        deadline: &Deadline,
        on_timeout: DhtError<P::Error>,
    ) -> Result<(), DhtError<P::Error>> {
        loop {
            if is_at(&mut self.pin, level)? {
                return Ok(());
            }
            if deadline.expired(&self.clock) {
                return Err(on_timeout);
            }
        }
    }

    pub(crate) fn measure_pulse_width(
        &mut self,
        level: PinState,
        timeout_us: u32,
    ) -> Result<u32, P::Error> {
        self.pulse
            .measure_pulse_width(&mut self.pin, &self.clock, level, timeout_us)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pin::DataLine;
    use crate::sim::{SimClock, SimLine};
    use embedded_hal_mock::eh1::digital::{Mock as PinMock, State, Transaction as PinTx};

    fn sampler(pin: &PinMock, step: u64) -> Sampler<PinMock, SimClock, SoftwarePulse> {
        Sampler {
            pin: pin.clone(),
            clock: SimClock::new(step),
            pulse: SoftwarePulse,
        }
    }

    #[test]
    fn test_busy_delay_waits_at_least() {
        let clock = SimClock::new(3);
        let start = clock.now_us();
        BusyDelay::new(&clock).delay_us(100);
        assert!(clock.now_us() - start >= 100);

        let start = clock.now_us();
        BusyDelay::new(&clock).delay_ms(18);
        assert!(clock.now_us() - start >= 18_000);
    }

    #[test]
    fn test_deadline_wraps() {
        let clock = SimClock::starting_at(u64::MAX - 5, 1);
        let deadline = Deadline::after(&clock, 10);
        assert!(!deadline.expired(&clock));
        busy_wait_us(&clock, 12);
        assert!(deadline.expired(&clock));
    }

    #[test]
    fn test_wait_for_level() {
        let mut pin = PinMock::new(&[
            PinTx::get(State::Low),
            PinTx::get(State::Low),
            PinTx::get(State::High),
        ]);
        let mut s = sampler(&pin, 1);
        let deadline = s.deadline_us(100);
        s.wait_for_level(PinState::High, &deadline, DhtError::HandshakeTimeout)
            .unwrap();
        pin.done();
    }

    #[test]
    fn test_wait_for_level_timeout() {
        // step 10, budget 50: reads at 10..=60, the sixth check is past the deadline
        let mut pin = PinMock::new(&vec![PinTx::get(State::High); 6]);
        let mut s = sampler(&pin, 10);
        let deadline = s.deadline_us(50);
        assert_eq!(
            s.wait_for_level(PinState::Low, &deadline, DhtError::HandshakeTimeout),
            Err(DhtError::HandshakeTimeout)
        );
        pin.done();
    }

    #[test]
    fn test_measure_short_and_long_pulse() {
        let mut expect = vec![];
        // still low, rising edge, two held reads, falling edge
        expect.extend([PinTx::get(State::Low), PinTx::get(State::High)]);
        expect.extend(vec![PinTx::get(State::High); 2]);
        expect.push(PinTx::get(State::Low));
        // same with six held reads
        expect.extend([PinTx::get(State::Low), PinTx::get(State::High)]);
        expect.extend(vec![PinTx::get(State::High); 6]);
        expect.push(PinTx::get(State::Low));
        let mut pin = PinMock::new(&expect);
        let mut s = sampler(&pin, 10);

        assert_eq!(s.measure_pulse_width(PinState::High, 200).unwrap(), 30);
        assert_eq!(s.measure_pulse_width(PinState::High, 200).unwrap(), 70);
        pin.done();
    }

    #[test]
    fn test_measure_skips_pulse_in_progress() {
        let mut pin = PinMock::new(&[
            // already high: this pulse is not the one to measure
            PinTx::get(State::High),
            PinTx::get(State::High),
            PinTx::get(State::Low),
            // next rising edge
            PinTx::get(State::High),
            PinTx::get(State::High),
            PinTx::get(State::Low),
        ]);
        let mut s = sampler(&pin, 10);
        assert_eq!(s.measure_pulse_width(PinState::High, 200).unwrap(), 20);
        pin.done();
    }

    #[test]
    fn test_measure_timeout_returns_zero() {
        // edge, then 21 held reads: 21 * 10us > 200us
        let mut expect = vec![PinTx::get(State::Low)];
        expect.extend(vec![PinTx::get(State::High); 22]);
        let mut pin = PinMock::new(&expect);
        let mut s = sampler(&pin, 10);
        assert_eq!(s.measure_pulse_width(PinState::High, 200).unwrap(), 0);
        pin.done();
    }

    #[test]
    fn test_measure_never_starts() {
        // step 50, budget 200: gives up on the fifth check for the rising edge
        let mut pin = PinMock::new(&vec![PinTx::get(State::Low); 6]);
        let mut s = sampler(&pin, 50);
        assert_eq!(s.measure_pulse_width(PinState::High, 200).unwrap(), 0);
        pin.done();
    }

    #[test]
    fn test_software_and_hardware_skip_running_pulse() {
        let waveform = vec![(false, 10), (true, 30), (false, 10), (true, 70), (false, 10)];

        let clock = SimClock::new(1);
        let mut line = SimLine::new(&clock, waveform.clone());
        line.configure_input_pullup().unwrap();
        clock.advance(15); // inside the 30us pulse
        let mut software = SoftwarePulse;
        assert_eq!(
            software
                .measure_pulse_width(&mut line, &clock, PinState::High, 200)
                .unwrap(),
            70
        );

        let clock = SimClock::new(1);
        let mut line = SimLine::new(&clock, waveform);
        line.configure_input_pullup().unwrap();
        clock.advance(15);
        let mut hardware = HardwarePulse;
        assert_eq!(
            hardware
                .measure_pulse_width(&mut line, &clock, PinState::High, 200)
                .unwrap(),
            70
        );
    }
}
