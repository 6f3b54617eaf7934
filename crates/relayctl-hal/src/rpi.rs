//! Raspberry Pi GPIO backend built on `rppal`.
//!
//! Only compiled with the `rppal` feature. Pins are claimed as outputs when
//! the backend is created and are pre-set to the level that keeps their relay
//! open, so no relay is energised between claiming the pin and the bank's own
//! open-all.

use std::collections::HashMap;

use relayctl_types::{Level, PinId, Polarity, RelayError};
use rppal::gpio::{Gpio, OutputPin};
use tracing::debug;

use crate::output::GpioOutput;

pub struct RppalOutput {
    pins: HashMap<PinId, OutputPin>,
}

impl RppalOutput {
    /// Claim every pin in `pins` as an output held at the open level for
    /// `polarity`.
    pub fn new(pins: &[PinId], polarity: Polarity) -> Result<Self, RelayError> {
        let Some(&first) = pins.first() else {
            return Ok(Self {
                pins: HashMap::new(),
            });
        };
        let gpio = Gpio::new().map_err(|e| fault(first, e))?;

        let mut claimed = HashMap::with_capacity(pins.len());
        for &pin in pins {
            let raw = gpio.get(pin).map_err(|e| fault(pin, e))?;
            let output = match polarity.level_for(false) {
                Level::High => raw.into_output_high(),
                Level::Low => raw.into_output_low(),
            };
            debug!(pin, "claimed gpio output");
            claimed.insert(pin, output);
        }
        Ok(Self { pins: claimed })
    }

    fn pin(&self, pin: PinId) -> Result<&OutputPin, RelayError> {
        self.pins.get(&pin).ok_or_else(|| unclaimed(pin))
    }
}

impl GpioOutput for RppalOutput {
    fn set_output(&mut self, pin: PinId, level: Level) -> Result<(), RelayError> {
        let output = self.pins.get_mut(&pin).ok_or_else(|| unclaimed(pin))?;
        match level {
            Level::High => output.set_high(),
            Level::Low => output.set_low(),
        }
        Ok(())
    }

    fn read_output(&self, pin: PinId) -> Result<Level, RelayError> {
        let output = self.pin(pin)?;
        Ok(if output.is_set_high() {
            Level::High
        } else {
            Level::Low
        })
    }
}

fn fault(pin: PinId, e: rppal::gpio::Error) -> RelayError {
    RelayError::HardwareFault {
        pin,
        details: e.to_string(),
    }
}

fn unclaimed(pin: PinId) -> RelayError {
    RelayError::HardwareFault {
        pin,
        details: "pin was not claimed by this backend".to_string(),
    }
}
