//! [`StateMachine`] – named multi-relay configurations over a [`RelayBank`].
//!
//! Each named state binds a target vector (one `0`/`1` per relay) to a
//! case-insensitive name. The implicit state `"null"` opens every relay and
//! is always defined. Applying a state walks the bank from index `0` upward
//! and issues exactly one open or close per relay; the order never changes
//! between transitions.
//!
//! The machine keeps only a label for the last state that applied cleanly.
//! Relay levels are always read back from the bank, so the label can go
//! stale if relays are toggled through [`StateMachine::bank_mut`] or a
//! transition fails partway. Compare the two with
//! [`StateSnapshot::is_consistent`].

use relayctl_types::{ConfigError, PinId, Polarity, RelayError, StateSnapshot};
use tracing::{info, instrument, warn};

use crate::bank::RelayBank;
use crate::output::GpioOutput;

/// Name of the implicit all-open state.
pub const NULL_STATE: &str = "null";

fn normalize(name: &str) -> String {
    name.to_lowercase()
}

/// A named target vector. Names are stored lower-cased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateDefinition {
    name: String,
    configuration: Vec<u8>,
}

impl StateDefinition {
    pub fn new(name: &str, configuration: impl Into<Vec<u8>>) -> Self {
        Self {
            name: normalize(name),
            configuration: configuration.into(),
        }
    }

    fn null(relays: usize) -> Self {
        Self::new(NULL_STATE, vec![0; relays])
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn configuration(&self) -> &[u8] {
        &self.configuration
    }

    /// Shape check against a bank of `relays` relays: exact length, then
    /// every entry `0` or `1`.
    fn validate(&self, relays: usize) -> Result<(), ConfigError> {
        if self.configuration.len() != relays {
            return Err(ConfigError::LengthMismatch {
                state: self.name.clone(),
                expected: relays,
                actual: self.configuration.len(),
            });
        }
        if let Some((position, &value)) = self
            .configuration
            .iter()
            .enumerate()
            .find(|(_, v)| **v > 1)
        {
            return Err(ConfigError::InvalidEntry {
                state: self.name.clone(),
                position,
                value,
            });
        }
        Ok(())
    }
}

/// Switches a [`RelayBank`] between a fixed table of named configurations.
///
/// # Example
///
/// ```
/// use relayctl_hal::{SimGpio, StateMachine};
///
/// let mut machine = StateMachine::builder(vec![22, 23, 24, 25], SimGpio::new())
///     .state("charge", vec![1, 1, 0, 0])
///     .state("dump", vec![0, 0, 1, 1])
///     .build()
///     .unwrap();
/// assert_eq!(machine.current_state(), "null");
///
/// let snap = machine.set_state("Charge").unwrap();
/// assert_eq!(snap.current_state, "charge");
/// assert_eq!(snap.relay_states, vec![1, 1, 0, 0]);
/// ```
pub struct StateMachine<O> {
    bank: RelayBank<O>,
    // `states[0]` is always the null state.
    states: Vec<StateDefinition>,
    current: usize,
}

impl<O: GpioOutput> StateMachine<O> {
    /// Start building a machine over `pins` driven through `output`.
    pub fn builder(pins: impl Into<Vec<PinId>>, output: O) -> StateMachineBuilder<O> {
        StateMachineBuilder::new(pins, output)
    }

    /// Take ownership of `bank`, validate `definitions` against its size and
    /// apply the null state.
    ///
    /// # Errors
    ///
    /// A [`RelayError::Configuration`] for an empty, duplicate or reserved
    /// name, a vector of the wrong length or a value other than `0`/`1`.
    /// Hardware faults raised while applying the null state are propagated.
    pub fn new(
        bank: RelayBank<O>,
        definitions: impl IntoIterator<Item = StateDefinition>,
    ) -> Result<Self, RelayError> {
        let relays = bank.len();
        let mut states = vec![StateDefinition::null(relays)];
        for def in definitions {
            if def.name.is_empty() {
                return Err(ConfigError::EmptyStateName.into());
            }
            if def.name == NULL_STATE {
                return Err(ConfigError::ReservedState(def.name).into());
            }
            if states.iter().any(|s| s.name == def.name) {
                return Err(ConfigError::DuplicateState(def.name).into());
            }
            def.validate(relays)?;
            states.push(def);
        }

        let mut machine = Self {
            bank,
            states,
            current: 0,
        };
        machine.set_state(NULL_STATE)?;
        info!(
            relays,
            states = ?machine.state_names().collect::<Vec<_>>(),
            "state machine initialised"
        );
        Ok(machine)
    }

    /// Apply the named state and report the result.
    ///
    /// Relays are driven in ascending index order. If any relay fails, the
    /// error is returned, relays already driven stay where they are and the
    /// current state label is left unchanged. Call
    /// [`get_state_info`][Self::get_state_info] afterwards to see what the
    /// hardware actually holds.
    ///
    /// # Errors
    ///
    /// [`RelayError::UnknownState`] if `name` is not defined (nothing is
    /// driven), or the first fault raised by the bank.
    #[instrument(skip(self))]
    pub fn set_state(&mut self, name: &str) -> Result<StateSnapshot, RelayError> {
        let key = normalize(name);
        let target = self
            .states
            .iter()
            .position(|s| s.name == key)
            .ok_or_else(|| RelayError::UnknownState(name.to_string()))?;

        for (index, &value) in self.states[target].configuration.iter().enumerate() {
            let result = if value == 1 {
                self.bank.close(index)
            } else {
                self.bank.open(index)
            };
            if let Err(e) = result {
                warn!(
                    index,
                    error = %e,
                    kept = %self.states[self.current].name,
                    "transition aborted; relays below index left as driven"
                );
                return Err(e);
            }
        }

        self.current = target;
        let snapshot = self.get_state_info()?;
        info!(configuration = ?snapshot.configuration, "switched state");
        Ok(snapshot)
    }

    /// Report the current state label together with a fresh read-back of
    /// every relay.
    pub fn get_state_info(&self) -> Result<StateSnapshot, RelayError> {
        let relay_states = self
            .bank
            .states()?
            .into_iter()
            .map(u8::from)
            .collect();
        let current = &self.states[self.current];
        Ok(StateSnapshot {
            current_state: current.name.clone(),
            configuration: current.configuration.clone(),
            relay_states,
            pins: self.bank.pins().to_vec(),
        })
    }

    /// Label of the last state applied without error.
    pub fn current_state(&self) -> &str {
        &self.states[self.current].name
    }

    /// Every defined state name, `"null"` first, then in definition order.
    pub fn state_names(&self) -> impl Iterator<Item = &str> {
        self.states.iter().map(|s| s.name.as_str())
    }

    /// Look up a state by name, ignoring case.
    pub fn definition(&self, name: &str) -> Option<&StateDefinition> {
        let key = normalize(name);
        self.states.iter().find(|s| s.name == key)
    }

    pub fn relay_count(&self) -> usize {
        self.bank.len()
    }

    pub fn bank(&self) -> &RelayBank<O> {
        &self.bank
    }

    /// Direct access to the bank. Operations made through it do not change
    /// the current state label.
    pub fn bank_mut(&mut self) -> &mut RelayBank<O> {
        &mut self.bank
    }

    pub fn into_bank(self) -> RelayBank<O> {
        self.bank
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Builder
// ────────────────────────────────────────────────────────────────────────────

/// Collects pins, polarity and state definitions, then constructs the
/// [`RelayBank`] and [`StateMachine`] in one step.
pub struct StateMachineBuilder<O> {
    pins: Vec<PinId>,
    polarity: Polarity,
    states: Vec<StateDefinition>,
    output: O,
}

impl<O: GpioOutput> StateMachineBuilder<O> {
    pub fn new(pins: impl Into<Vec<PinId>>, output: O) -> Self {
        Self {
            pins: pins.into(),
            polarity: Polarity::default(),
            states: Vec::new(),
            output,
        }
    }

    pub fn polarity(mut self, polarity: Polarity) -> Self {
        self.polarity = polarity;
        self
    }

    /// Add a named state. Validation happens in [`build`][Self::build].
    pub fn state(mut self, name: &str, configuration: impl Into<Vec<u8>>) -> Self {
        self.states.push(StateDefinition::new(name, configuration));
        self
    }

    pub fn states(mut self, definitions: impl IntoIterator<Item = StateDefinition>) -> Self {
        self.states.extend(definitions);
        self
    }

    /// Open every relay and validate the state table.
    pub fn build(self) -> Result<StateMachine<O>, RelayError> {
        let bank = RelayBank::with_polarity(self.pins, self.polarity, self.output)?;
        StateMachine::new(bank, self.states)
    }
}
