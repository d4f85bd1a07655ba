//! DHT11 Sensor Driver for Embedded Rust
//!
//! This crate provides a platform-agnostic driver for the DHT11 temperature and
//! humidity sensor, built on top of the [`embedded-hal`] traits.
//!
//! The DHT11 talks over a single wire: the MCU wakes it with a long low pulse, the
//! sensor answers with a short preamble and then sends 40 bits, each encoded in
//! the width of a HIGH pulse. The driver decodes those pulses into a
//! temperature/humidity [`Reading`], validates the checksum and caches the result.
//! The sensor is physically polled at most once per [`Config::min_poll_interval_ms`],
//! however often it is queried.
//!
//! # Features
//! - Blocking synchronous API; all timing is busy-waited against a [`Clock`]
//! - Software-polled or hardware-captured pulse measurement ([`SoftwarePulse`],
//!   [`HardwarePulse`])
//! - Optional interrupt masking around the timing-critical phase ([`InterruptControl`])
//! - Designed for `no_std` environments
//!
//! # Dependencies
//! This driver depends on the following `embedded-hal` traits:
//! - [`InputPin`] and [`OutputPin`] for GPIO access, extended by [`DataLine`]
//! - [`DelayNs`], implemented by [`BusyDelay`] on top of a [`Clock`]
//!
//! # Optional Features
//! - `defmt`: Implements `defmt::Format` and logs poll diagnostics
//! - `critical-section`: [`CriticalSectionControl`] and [`SharedDht11`]
//!
//! [`embedded-hal`]: https://docs.rs/embedded-hal
//! [`InputPin`]: embedded_hal::digital::InputPin
//! [`OutputPin`]: embedded_hal::digital::OutputPin
//! [`DelayNs`]: embedded_hal::delay::DelayNs

#![cfg_attr(not(test), no_std)]

pub mod cache;
pub mod config;
pub mod dht11;
pub mod error;
pub mod frame;
pub mod interrupt;
pub mod pin;
pub mod sampler;
#[cfg(any(test, feature = "critical-section"))]
pub mod shared;

#[cfg(test)]
mod sim;

pub use cache::SensorState;
pub use config::{Config, LastBitPolicy};
pub use dht11::Dht11;
pub use error::DhtError;
pub use frame::{RawFrame, Reading};
#[cfg(any(test, feature = "critical-section"))]
pub use interrupt::CriticalSectionControl;
pub use interrupt::{InterruptControl, InterruptGuard, NoopInterruptControl};
pub use pin::{DataLine, OpenDrain, PulseCapture};
pub use sampler::{BusyDelay, Clock, HardwarePulse, PulseMeasure, SoftwarePulse};
#[cfg(any(test, feature = "critical-section"))]
pub use shared::SharedDht11;
