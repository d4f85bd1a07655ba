//! Host-side simulation of a DHT11 on a single wire, for tests.

use core::cell::{Cell, RefCell};
use core::convert::Infallible;
use std::rc::Rc;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin, PinState};

use crate::interrupt::InterruptControl;
use crate::pin::{DataLine, PulseCapture};
use crate::sampler::Clock;

/// Clock that advances by a fixed step every time it is read.
///
/// Clones share the same time, so a [`SimLine`] can follow the driver's clock.
#[derive(Clone, Debug)]
pub struct SimClock {
    now: Rc<Cell<u64>>,
    step: u64,
}

impl SimClock {
    pub fn new(step: u64) -> Self {
        Self::starting_at(0, step)
    }

    pub fn starting_at(start: u64, step: u64) -> Self {
        SimClock {
            now: Rc::new(Cell::new(start)),
            step,
        }
    }

    /// Current time without advancing.
    pub fn peek(&self) -> u64 {
        self.now.get()
    }

    pub fn advance(&self, us: u64) {
        self.now.set(self.now.get().wrapping_add(us));
    }
}

impl Clock for SimClock {
    fn now_us(&self) -> u64 {
        self.advance(self.step);
        self.now.get()
    }
}

/// One level held for a number of microseconds.
pub type Segment = (bool, u64);

/// Waveform the sensor sends after the host releases the line: the preamble, 40
/// data bits and the trailing low, after which the line idles high.
pub fn response_waveform(bytes: [u8; 5]) -> Vec<Segment> {
    let mut wave = vec![(false, 80), (true, 80)];
    for byte in bytes {
        for i in 0..8 {
            let one = (byte >> (7 - i)) & 1 == 1;
            wave.push((false, 50));
            wave.push((true, if one { 70 } else { 26 }));
        }
    }
    wave.push((false, 50));
    wave
}

/// Frame for whole-number readings with a correct checksum.
pub fn frame_bytes(humidity: u8, temperature: u8) -> [u8; 5] {
    [
        humidity,
        0,
        temperature,
        0,
        humidity.wrapping_add(temperature),
    ]
}

#[derive(Debug)]
struct Line {
    waveform: Vec<Segment>,
    output: bool,
    driven_high: bool,
    released_at: Option<u64>,
    handshakes: u32,
}

/// Simulated data line. Clones share state, like the embedded-hal-mock pins.
#[derive(Clone, Debug)]
pub struct SimLine {
    clock: SimClock,
    line: Rc<RefCell<Line>>,
}

impl SimLine {
    pub fn new(clock: &SimClock, waveform: Vec<Segment>) -> Self {
        SimLine {
            clock: clock.clone(),
            line: Rc::new(RefCell::new(Line {
                waveform,
                output: false,
                driven_high: true,
                released_at: None,
                handshakes: 0,
            })),
        }
    }

    /// Number of start signals the driver has sent.
    pub fn handshakes(&self) -> u32 {
        self.line.borrow().handshakes
    }

    /// Replaces what the sensor answers to the next start signal.
    pub fn set_waveform(&self, waveform: Vec<Segment>) {
        self.line.borrow_mut().waveform = waveform;
    }

    fn since_release(&self) -> Option<u64> {
        let line = self.line.borrow();
        if line.output {
            return None;
        }
        line.released_at.map(|at| self.clock.peek() - at)
    }

    fn level(&self) -> bool {
        let line = self.line.borrow();
        if line.output {
            return line.driven_high;
        }
        let Some(t) = self.since_release() else {
            return true;
        };
        let mut start = 0;
        for &(high, len) in &line.waveform {
            if t < start + len {
                return high;
            }
            start += len;
        }
        true
    }
}

impl ErrorType for SimLine {
    type Error = Infallible;
}

impl InputPin for SimLine {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.level())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.level())
    }
}

impl OutputPin for SimLine {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.line.borrow_mut().driven_high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.line.borrow_mut().driven_high = true;
        Ok(())
    }
}

impl DataLine for SimLine {
    fn configure_output(&mut self) -> Result<(), Self::Error> {
        let mut line = self.line.borrow_mut();
        line.output = true;
        line.handshakes += 1;
        Ok(())
    }

    fn configure_input_pullup(&mut self) -> Result<(), Self::Error> {
        let mut line = self.line.borrow_mut();
        line.output = false;
        line.released_at = Some(self.clock.peek());
        Ok(())
    }
}

impl PulseCapture for SimLine {
    fn measure_pulse(&mut self, level: PinState, timeout_us: u32) -> Result<u32, Self::Error> {
        let want = level == PinState::High;
        let timeout = u64::from(timeout_us);
        let Some(t) = self.since_release() else {
            self.clock.advance(timeout);
            return Ok(0);
        };

        // edge-triggered: a pulse that began before `t` is skipped
        let mut pulse = None;
        let mut start = 0;
        for &(high, len) in &self.line.borrow().waveform {
            let end = start + len;
            if high == want && start >= t {
                pulse = Some((start, end));
                break;
            }
            start = end;
        }

        match pulse {
            Some((from, end)) if from - t <= timeout && end - from <= timeout => {
                self.clock.advance(end - t);
                Ok((end - from) as u32)
            }
            _ => {
                self.clock.advance(timeout);
                Ok(0)
            }
        }
    }
}

/// Interrupt control that counts calls. Clones share the counters.
#[derive(Clone, Debug, Default)]
pub struct CountingInterrupts {
    disabled: Rc<Cell<u32>>,
    enabled: Rc<Cell<u32>>,
}

impl CountingInterrupts {
    pub fn disabled(&self) -> u32 {
        self.disabled.get()
    }

    pub fn enabled(&self) -> u32 {
        self.enabled.get()
    }
}

impl InterruptControl for CountingInterrupts {
    fn disable_interrupts(&mut self) {
        self.disabled.set(self.disabled.get() + 1);
    }

    fn enable_interrupts(&mut self) {
        self.enabled.set(self.enabled.get() + 1);
    }
}
