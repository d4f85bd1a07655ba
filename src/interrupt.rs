//! Interrupt masking around the timing-critical part of a poll.

/// Lets the driver mask interrupts while it samples the line.
///
/// A preemption in the middle of a pulse stretches the measured width and turns a
/// `0` into a `1`.
pub trait InterruptControl {
    fn disable_interrupts(&mut self);
    fn enable_interrupts(&mut self);
}

/// Leaves interrupts alone.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopInterruptControl;

impl InterruptControl for NoopInterruptControl {
    fn disable_interrupts(&mut self) {}
    fn enable_interrupts(&mut self) {}
}

/// Masks interrupts for as long as it is alive.
pub struct InterruptGuard<'a, I: InterruptControl> {
    control: &'a mut I,
}

impl<'a, I: InterruptControl> InterruptGuard<'a, I> {
    pub fn new(control: &'a mut I) -> Self {
        control.disable_interrupts();
        InterruptGuard { control }
    }
}

impl<I: InterruptControl> Drop for InterruptGuard<'_, I> {
    fn drop(&mut self) {
        self.control.enable_interrupts();
    }
}

/// Masks interrupts through the `critical-section` crate.
#[cfg(any(test, feature = "critical-section"))]
#[derive(Debug, Default)]
pub struct CriticalSectionControl {
    restore: Option<critical_section::RestoreState>,
}

#[cfg(any(test, feature = "critical-section"))]
impl InterruptControl for CriticalSectionControl {
    fn disable_interrupts(&mut self) {
        if self.restore.is_none() {
            // SAFETY: released exactly once in `enable_interrupts`, which the
            // guard calls on drop before any other critical section is taken here.
            self.restore = Some(unsafe { critical_section::acquire() });
        }
    }

    fn enable_interrupts(&mut self) {
        if let Some(restore) = self.restore.take() {
            // SAFETY: `restore` came from the matching `acquire` above.
            unsafe { critical_section::release(restore) };
        }
    }
}
