//! [`RelayBank`] – a fixed, ordered set of independently addressable relays.
//!
//! Relay `i` is driven through pin `pins[i]`. Every indexed operation is
//! range-checked before any hardware call is issued, and bulk operations walk
//! the bank in ascending index order one relay at a time, so a failure
//! partway leaves every lower index applied and every higher index untouched.

use std::collections::HashSet;

use relayctl_types::{ConfigError, PinId, Polarity, RelayError};
use tracing::{debug, info};

use crate::output::GpioOutput;

/// An ordered bank of `N` relays driven through a [`GpioOutput`].
///
/// `N` is fixed at construction. A freshly constructed bank has every relay
/// open.
///
/// # Example
///
/// ```
/// use relayctl_hal::{RelayBank, SimGpio};
///
/// let mut bank = RelayBank::new(vec![22, 23, 24, 25], SimGpio::new()).unwrap();
/// assert!(!bank.get_state(0).unwrap());
///
/// bank.close(0).unwrap();
/// assert!(bank.get_state(0).unwrap());
/// assert!(bank.close(4).is_err());
/// ```
pub struct RelayBank<O> {
    pins: Vec<PinId>,
    polarity: Polarity,
    recorded: Vec<bool>,
    output: O,
}

impl<O: GpioOutput> RelayBank<O> {
    /// Create an active-high bank over `pins` and open every relay.
    ///
    /// # Errors
    ///
    /// [`ConfigError::DuplicatePin`] if a pin appears twice, or the first
    /// hardware fault raised while opening the relays.
    pub fn new(pins: impl Into<Vec<PinId>>, output: O) -> Result<Self, RelayError> {
        Self::with_polarity(pins, Polarity::default(), output)
    }

    /// Create a bank with an explicit pin [`Polarity`] and open every relay.
    pub fn with_polarity(
        pins: impl Into<Vec<PinId>>,
        polarity: Polarity,
        output: O,
    ) -> Result<Self, RelayError> {
        let pins = pins.into();
        let mut seen = HashSet::with_capacity(pins.len());
        for &pin in &pins {
            if !seen.insert(pin) {
                return Err(ConfigError::DuplicatePin { pin }.into());
            }
        }

        let mut bank = Self {
            recorded: vec![false; pins.len()],
            pins,
            polarity,
            output,
        };
        bank.open_all()?;
        info!(relays = bank.len(), pins = ?bank.pins, ?polarity, "relay bank initialised");
        Ok(bank)
    }

    /// Number of relays in the bank.
    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    /// Pin identifiers in relay-index order.
    pub fn pins(&self) -> &[PinId] {
        &self.pins
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    /// The underlying output capability.
    pub fn output(&self) -> &O {
        &self.output
    }

    /// Mutable access to the output capability. Writes made through it
    /// bypass the bank and are not reflected in [`recorded_states`].
    ///
    /// [`recorded_states`]: Self::recorded_states
    pub fn output_mut(&mut self) -> &mut O {
        &mut self.output
    }

    /// Close (energise) relay `index`.
    pub fn close(&mut self, index: usize) -> Result<(), RelayError> {
        self.set(index, true)
    }

    /// Open (de-energise) relay `index`.
    pub fn open(&mut self, index: usize) -> Result<(), RelayError> {
        self.set(index, false)
    }

    /// Drive relay `index` closed (`true`) or open (`false`).
    ///
    /// # Errors
    ///
    /// [`RelayError::OutOfRange`] before touching hardware if `index >= len()`,
    /// otherwise any fault raised by the output.
    pub fn set(&mut self, index: usize, closed: bool) -> Result<(), RelayError> {
        self.validate(index)?;
        let pin = self.pins[index];
        self.output.set_output(pin, self.polarity.level_for(closed))?;
        self.recorded[index] = closed;
        debug!(index, pin, closed, "relay driven");
        Ok(())
    }

    /// Close every relay, lowest index first.
    pub fn close_all(&mut self) -> Result<(), RelayError> {
        for index in 0..self.len() {
            self.close(index)?;
        }
        info!(relays = self.len(), "all relays closed");
        Ok(())
    }

    /// Open every relay, lowest index first.
    pub fn open_all(&mut self) -> Result<(), RelayError> {
        for index in 0..self.len() {
            self.open(index)?;
        }
        info!(relays = self.len(), "all relays opened");
        Ok(())
    }

    /// `true` if relay `index` is closed, read back from the hardware.
    pub fn get_state(&self, index: usize) -> Result<bool, RelayError> {
        self.validate(index)?;
        let level = self.output.read_output(self.pins[index])?;
        Ok(self.polarity.is_closed(level))
    }

    /// Read back every relay in index order.
    pub fn states(&self) -> Result<Vec<bool>, RelayError> {
        (0..self.len()).map(|i| self.get_state(i)).collect()
    }

    /// The state each relay was last successfully driven to by this bank.
    pub fn recorded_states(&self) -> &[bool] {
        &self.recorded
    }

    fn validate(&self, index: usize) -> Result<(), RelayError> {
        if index < self.len() {
            Ok(())
        } else {
            Err(RelayError::OutOfRange {
                index,
                count: self.len(),
            })
        }
    }

    /// Consume the bank and hand back the output capability.
    pub fn into_output(self) -> O {
        self.output
    }
}
