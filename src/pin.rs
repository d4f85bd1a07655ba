//! Pin capabilities the driver needs beyond plain embedded-hal digital I/O.

use embedded_hal::digital::{ErrorType, InputPin, OutputPin, PinState};

/// A bidirectional data line.
///
/// The single wire is driven by the MCU during the start signal and then handed
/// over to the sensor, so the pin has to switch modes during every poll.
pub trait DataLine: InputPin + OutputPin {
    /// Switches the pin to push-pull (or open-drain) output.
    fn configure_output(&mut self) -> Result<(), Self::Error>;

    /// Switches the pin to input with the pull-up enabled.
    fn configure_input_pullup(&mut self) -> Result<(), Self::Error>;
}

/// Hardware-assisted pulse measurement.
pub trait PulseCapture: ErrorType {
    /// Waits for the next edge into `level` and returns how long the line stayed
    /// there in microseconds, or `0` if the edge did not come or the pulse did not
    /// end within `timeout_us`.
    ///
    /// A pulse already in progress when the call starts is skipped, the way
    /// capture units armed on an edge behave.
    fn measure_pulse(&mut self, level: PinState, timeout_us: u32) -> Result<u32, Self::Error>;
}

/// Adapter for pins already configured as open-drain with a pull-up on the line.
///
/// Such a pin can drive low and read the line at the same time, so mode switches
/// are no-ops and setting it high releases the line to the pull-up.
pub struct OpenDrain<P>(pub P);

impl<P> OpenDrain<P> {
    /// Gives back the wrapped pin.
    pub fn into_inner(self) -> P {
        self.0
    }
}

impl<P: ErrorType> ErrorType for OpenDrain<P> {
    type Error = P::Error;
}

impl<P: InputPin> InputPin for OpenDrain<P> {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.0.is_high()
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.0.is_low()
    }
}

impl<P: OutputPin> OutputPin for OpenDrain<P> {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.set_low()
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.set_high()
    }
}

impl<P: InputPin + OutputPin> DataLine for OpenDrain<P> {
    fn configure_output(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn configure_input_pullup(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl<P: PulseCapture> PulseCapture for OpenDrain<P> {
    fn measure_pulse(&mut self, level: PinState, timeout_us: u32) -> Result<u32, Self::Error> {
        self.0.measure_pulse(level, timeout_us)
    }
}

/// Reads the pin and reports whether it is at `level`.
pub(crate) fn is_at<P: InputPin>(pin: &mut P, level: PinState) -> Result<bool, P::Error> {
    Ok(PinState::from(pin.is_high()?) == level)
}
