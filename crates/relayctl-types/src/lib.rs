use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of a physical output pin (BCM numbering on a Raspberry Pi).
pub type PinId = u8;

/// Logic level of a digital output pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Low,
    High,
}

impl Level {
    /// `true` when the level is [`Level::High`].
    pub fn is_high(self) -> bool {
        self == Level::High
    }
}

/// How a relay's closed/open state maps onto the logic level of its pin.
///
/// Most opto-isolated relay boards are active-low: the coil is energised when
/// the input pin is pulled LOW.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    #[default]
    ActiveHigh,
    ActiveLow,
}

impl Polarity {
    /// Logic level that drives a relay to `closed`.
    pub fn level_for(self, closed: bool) -> Level {
        match (self, closed) {
            (Polarity::ActiveHigh, true) | (Polarity::ActiveLow, false) => Level::High,
            (Polarity::ActiveHigh, false) | (Polarity::ActiveLow, true) => Level::Low,
        }
    }

    /// Interpret a read-back logic level as a closed (`true`) / open relay.
    pub fn is_closed(self, level: Level) -> bool {
        match self {
            Polarity::ActiveHigh => level == Level::High,
            Polarity::ActiveLow => level == Level::Low,
        }
    }
}

/// Read-only report of a state machine's logical state and the relay levels
/// actually observed on the hardware.
///
/// `configuration` is the target vector of `current_state`; `relay_states`
/// is read back from the bank (1 = closed) and may differ from it when a
/// relay was toggled out-of-band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StateSnapshot {
    pub current_state: String,
    pub configuration: Vec<u8>,
    pub relay_states: Vec<u8>,
    pub pins: Vec<PinId>,
}

impl StateSnapshot {
    /// `true` when every observed relay matches the labelled configuration.
    pub fn is_consistent(&self) -> bool {
        self.configuration == self.relay_states
    }

    /// Indices whose observed state differs from the labelled configuration.
    pub fn diverging_relays(&self) -> Vec<usize> {
        self.configuration
            .iter()
            .zip(&self.relay_states)
            .enumerate()
            .filter(|(_, (want, got))| want != got)
            .map(|(i, _)| i)
            .collect()
    }
}

/// Problems detected while validating a relay bank or its state table.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigError {
    #[error("at least one relay is required")]
    NoRelays,

    #[error("pin {pin} is assigned to more than one relay")]
    DuplicatePin { pin: PinId },

    #[error("state name must not be empty")]
    EmptyStateName,

    #[error("state '{0}' is defined more than once")]
    DuplicateState(String),

    #[error("state '{0}' is reserved and always means all relays open")]
    ReservedState(String),

    #[error("state '{state}' has {actual} entries but the bank has {expected} relays")]
    LengthMismatch {
        state: String,
        expected: usize,
        actual: usize,
    },

    #[error("state '{state}' has invalid value {value} at position {position} (expected 0 or 1)")]
    InvalidEntry {
        state: String,
        position: usize,
        value: u8,
    },

    #[error("{0}")]
    Invalid(String),
}

/// Error type shared by the relay bank, the state machine and GPIO backends.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelayError {
    #[error("Configuration Error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Relay index {index} out of range (bank has {count} relays)")]
    OutOfRange { index: usize, count: usize },

    #[error("Unknown state: '{0}'")]
    UnknownState(String),

    #[error("Hardware Fault on pin {pin}: {details}")]
    HardwareFault { pin: PinId, details: String },
}
