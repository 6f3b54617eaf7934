//! In-process GPIO simulation for tests and hardware-free runs.
//!
//! [`SimGpio`] records every write, answers reads from the last written
//! level, and can be told to fail writes on specific pins or to fail all
//! reads so that partial-transition behaviour can be exercised without a
//! physical relay board.
//!
//! # Example
//!
//! ```rust
//! use relayctl_hal::{GpioOutput, SimGpio};
//! use relayctl_types::Level;
//!
//! let mut gpio = SimGpio::new();
//! gpio.set_output(22, Level::High).unwrap();
//! assert_eq!(gpio.read_output(22).unwrap(), Level::High);
//! assert_eq!(gpio.writes(), &[(22, Level::High)]);
//! ```

use std::collections::{HashMap, HashSet};

use relayctl_types::{Level, PinId, RelayError};

use crate::output::GpioOutput;

/// A simulated bank of output pins. Always succeeds unless a fault has been
/// injected.
#[derive(Debug, Default, Clone)]
pub struct SimGpio {
    levels: HashMap<PinId, Level>,
    writes: Vec<(PinId, Level)>,
    failing_pins: HashSet<PinId>,
    fail_reads: bool,
}

impl SimGpio {
    /// Create a simulator with no pins configured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write to `pin` fail with a hardware fault.
    pub fn fail_writes_on(&mut self, pin: PinId) -> &mut Self {
        self.failing_pins.insert(pin);
        self
    }

    /// Make every subsequent read fail with a hardware fault.
    pub fn fail_reads(&mut self) -> &mut Self {
        self.fail_reads = true;
        self
    }

    /// Clear all injected faults.
    pub fn heal(&mut self) -> &mut Self {
        self.failing_pins.clear();
        self.fail_reads = false;
        self
    }

    /// Change a pin's level without recording a write, as if something
    /// outside the controller had toggled it.
    pub fn force_level(&mut self, pin: PinId, level: Level) {
        self.levels.insert(pin, level);
    }

    /// Last level written to `pin`, if any.
    pub fn level(&self, pin: PinId) -> Option<Level> {
        self.levels.get(&pin).copied()
    }

    /// Every successful write in the order it was issued.
    pub fn writes(&self) -> &[(PinId, Level)] {
        &self.writes
    }

    /// Forget the recorded write history (levels are kept).
    pub fn clear_writes(&mut self) {
        self.writes.clear();
    }
}

impl GpioOutput for SimGpio {
    fn set_output(&mut self, pin: PinId, level: Level) -> Result<(), RelayError> {
        if self.failing_pins.contains(&pin) {
            return Err(RelayError::HardwareFault {
                pin,
                details: "simulated write failure".to_string(),
            });
        }
        self.levels.insert(pin, level);
        self.writes.push((pin, level));
        Ok(())
    }

    fn read_output(&self, pin: PinId) -> Result<Level, RelayError> {
        if self.fail_reads {
            return Err(RelayError::HardwareFault {
                pin,
                details: "simulated read failure".to_string(),
            });
        }
        self.levels
            .get(&pin)
            .copied()
            .ok_or_else(|| RelayError::HardwareFault {
                pin,
                details: "pin is not configured as an output".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_records_writes_in_order() {
        let mut gpio = SimGpio::new();
        gpio.set_output(1, Level::High).unwrap();
        gpio.set_output(2, Level::Low).unwrap();
        gpio.set_output(1, Level::Low).unwrap();
        assert_eq!(
            gpio.writes(),
            &[(1, Level::High), (2, Level::Low), (1, Level::Low)]
        );
        assert_eq!(gpio.level(1), Some(Level::Low));
    }

    #[test]
    fn unwritten_pin_cannot_be_read() {
        let gpio = SimGpio::new();
        assert!(matches!(
            gpio.read_output(4),
            Err(RelayError::HardwareFault { pin: 4, .. })
        ));
    }

    #[test]
    fn injected_write_fault_leaves_level_untouched() {
        let mut gpio = SimGpio::new();
        gpio.set_output(3, Level::Low).unwrap();
        gpio.fail_writes_on(3);

        assert!(gpio.set_output(3, Level::High).is_err());
        assert_eq!(gpio.level(3), Some(Level::Low));
        assert_eq!(gpio.writes().len(), 1);

        gpio.heal();
        gpio.set_output(3, Level::High).unwrap();
        assert_eq!(gpio.level(3), Some(Level::High));
    }

    #[test]
    fn injected_read_fault() {
        let mut gpio = SimGpio::new();
        gpio.set_output(9, Level::High).unwrap();
        gpio.fail_reads();
        assert!(gpio.read_output(9).is_err());
    }

    #[test]
    fn force_level_is_not_a_recorded_write() {
        let mut gpio = SimGpio::new();
        gpio.force_level(5, Level::High);
        assert_eq!(gpio.read_output(5).unwrap(), Level::High);
        assert!(gpio.writes().is_empty());
    }
}
