//! A sensor shared between execution contexts.

use core::cell::{Cell, RefCell};

use critical_section::Mutex;

use crate::cache::SensorState;
use crate::dht11::Dht11;
use crate::interrupt::InterruptControl;
use crate::pin::DataLine;
use crate::sampler::{Clock, PulseMeasure};

/// [`Dht11`] shared between contexts that may query the sensor concurrently.
///
/// A query that finds the data stale claims the driver inside a short critical
/// section and polls with interrupts enabled. Queries arriving while the driver is
/// claimed answer from the last published state and never start a second poll.
/// To mask interrupts during bit sampling only, give the driver a
/// [`CriticalSectionControl`](crate::CriticalSectionControl).
pub struct SharedDht11<PIN, CLK, M, I> {
    driver: Mutex<RefCell<Option<Dht11<PIN, CLK, M, I>>>>,
    state: Mutex<Cell<SensorState>>,
}

impl<PIN, CLK, M, I> SharedDht11<PIN, CLK, M, I>
where
    PIN: DataLine,
    CLK: Clock,
    M: PulseMeasure<PIN, CLK>,
    I: InterruptControl,
{
    /// Wraps a driver for shared use.
    ///
    /// # Arguments
    ///
    /// * `dht` - The driver; its cached state is published as is.
    pub fn new(dht: Dht11<PIN, CLK, M, I>) -> Self {
        let state = *dht.state();
        SharedDht11 {
            driver: Mutex::new(RefCell::new(Some(dht))),
            state: Mutex::new(Cell::new(state)),
        }
    }

    /// Temperature in degrees Celsius. See [`Dht11::read_temperature`].
    pub fn read_temperature(&self) -> f32 {
        self.refresh().reading().temperature
    }

    /// Relative humidity in percent. See [`Dht11::read_humidity`].
    pub fn read_humidity(&self) -> f32 {
        self.refresh().reading().humidity
    }

    /// True once any poll has succeeded.
    pub fn has_valid_data(&self) -> bool {
        critical_section::with(|cs| self.state.borrow(cs).get().has_valid_data())
    }

    /// True if the next query would poll the sensor. False while a poll is running.
    pub fn has_stale_data(&self) -> bool {
        critical_section::with(|cs| {
            self.driver
                .borrow_ref(cs)
                .as_ref()
                .is_some_and(|dht| dht.has_stale_data())
        })
    }

    /// Gives back the driver, or `None` if a poll panicked while it was claimed.
    pub fn into_inner(self) -> Option<Dht11<PIN, CLK, M, I>> {
        self.driver.into_inner().into_inner()
    }

    /// Polls if the data is stale and nobody else is polling, then returns the
    /// published state.
    fn refresh(&self) -> SensorState {
        let Some(mut dht) = self.claim() else {
            return critical_section::with(|cs| self.state.borrow(cs).get());
        };

        let _ = dht.maybe_poll();
        let state = *dht.state();
        self.restore(dht);
        state
    }

    fn claim(&self) -> Option<Dht11<PIN, CLK, M, I>> {
        critical_section::with(|cs| self.driver.borrow_ref_mut(cs).take())
    }

    fn restore(&self, dht: Dht11<PIN, CLK, M, I>) {
        critical_section::with(|cs| {
            self.state.borrow(cs).set(*dht.state());
            *self.driver.borrow_ref_mut(cs) = Some(dht);
        });
    }
}
