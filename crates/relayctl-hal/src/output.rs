//! Generic `GpioOutput` capability for digital output pins.
//!
//! This is the only point where the crate touches hardware. A
//! [`RelayBank`][crate::bank::RelayBank] owns one implementation and never
//! caches what it wrote: every relay query goes back through
//! [`GpioOutput::read_output`].

use relayctl_types::{Level, PinId, RelayError};

/// A set of digital output pins that can be driven and read back.
///
/// Implementations block until the level has been applied. Retrying on
/// failure is the caller's decision, never the implementation's.
pub trait GpioOutput: Send {
    /// Drive `pin` to `level`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::HardwareFault`] if the pin is unavailable or the
    /// write fails.
    fn set_output(&mut self, pin: PinId, level: Level) -> Result<(), RelayError>;

    /// Read the level currently driven on `pin`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::HardwareFault`] if the pin cannot be read.
    fn read_output(&self, pin: PinId) -> Result<Level, RelayError>;
}

impl<T: GpioOutput + ?Sized> GpioOutput for Box<T> {
    fn set_output(&mut self, pin: PinId, level: Level) -> Result<(), RelayError> {
        (**self).set_output(pin, level)
    }

    fn read_output(&self, pin: PinId) -> Result<Level, RelayError> {
        (**self).read_output(pin)
    }
}
