//! Bench configuration – reads `relayctl.toml`.
//!
//! ```toml
//! pins = [22, 23, 24, 25]
//! polarity = "active_high"
//! backend = "sim"
//! step_delay_ms = 1000
//! sequence = ["charge", "dump", "null", "close_all"]
//!
//! [states]
//! charge = [1, 1, 0, 0]
//! dump = [0, 0, 1, 1]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use relayctl_hal::{GpioOutput, StateDefinition, StateMachine};
use relayctl_types::{ConfigError, PinId, Polarity, RelayError};

use crate::runner::Step;

/// Which [`GpioOutput`] drives the pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Sim,
    Rppal,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Sim => write!(f, "sim"),
            Backend::Rppal => write!(f, "rppal"),
        }
    }
}

impl std::str::FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sim" => Ok(Backend::Sim),
            "rppal" => Ok(Backend::Rppal),
            other => Err(format!("unknown backend '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Relay pins in relay-index order.
    #[serde(default = "default_pins")]
    pub pins: Vec<PinId>,

    #[serde(default)]
    pub polarity: Polarity,

    #[serde(default)]
    pub backend: Backend,

    /// Pause between sequence steps.
    #[serde(default = "default_step_delay_ms")]
    pub step_delay_ms: u64,

    /// Steps to run: a state name, `open_all`, `close_all`, `open:<i>` or
    /// `close:<i>`.
    #[serde(default = "default_sequence")]
    pub sequence: Vec<String>,

    /// Named target vectors, one 0/1 entry per pin.
    #[serde(default = "default_states")]
    pub states: BTreeMap<String, Vec<u8>>,
}

fn default_pins() -> Vec<PinId> {
    vec![22, 23, 24, 25]
}
fn default_step_delay_ms() -> u64 {
    1000
}
fn default_sequence() -> Vec<String> {
    ["charge", "dump", "null", "close_all"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_states() -> BTreeMap<String, Vec<u8>> {
    BTreeMap::from([
        ("charge".to_string(), vec![1, 1, 0, 0]),
        ("dump".to_string(), vec![0, 0, 1, 1]),
    ])
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pins: default_pins(),
            polarity: Polarity::default(),
            backend: Backend::default(),
            step_delay_ms: default_step_delay_ms(),
            sequence: default_sequence(),
            states: default_states(),
        }
    }
}

impl Config {
    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }

    /// Parse the configured sequence.
    pub fn steps(&self) -> Result<Vec<Step>, ConfigError> {
        self.sequence.iter().map(|s| s.parse()).collect()
    }

    /// Build the state machine this config describes on top of `output`.
    ///
    /// The bench always needs at least one relay; every other shape check is
    /// left to [`StateMachine`].
    pub fn build_machine<O: GpioOutput>(&self, output: O) -> Result<StateMachine<O>, RelayError> {
        if self.pins.is_empty() {
            return Err(ConfigError::NoRelays.into());
        }
        StateMachine::builder(self.pins.clone(), output)
            .polarity(self.polarity)
            .states(
                self.states
                    .iter()
                    .map(|(name, vector)| StateDefinition::new(name, vector.clone())),
            )
            .build()
    }
}

/// Resolve the config path: explicit argument, then `RELAYCTL_CONFIG`, then
/// `./relayctl.toml`.
pub fn config_path(arg: Option<String>) -> PathBuf {
    arg.or_else(|| std::env::var("RELAYCTL_CONFIG").ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("relayctl.toml"))
}

/// Load the config from `path`.  Returns `None` if the file does not exist.
pub fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `RELAYCTL_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `RELAYCTL_BACKEND` | `backend` |
/// | `RELAYCTL_STEP_DELAY_MS` | `step_delay_ms` |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("RELAYCTL_BACKEND")
        && let Ok(backend) = v.parse::<Backend>() {
            cfg.backend = backend;
        }
    if let Ok(v) = std::env::var("RELAYCTL_STEP_DELAY_MS")
        && let Ok(ms) = v.parse::<u64>() {
            cfg.step_delay_ms = ms;
        }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relayctl_hal::SimGpio;

    fn write_config(raw: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("relayctl.toml");
        fs::write(&path, raw).expect("write config");
        (dir, path)
    }

    #[test]
    fn defaults_reproduce_the_bench() {
        let cfg = Config::default();
        assert_eq!(cfg.pins, vec![22, 23, 24, 25]);
        assert_eq!(cfg.states["charge"], vec![1, 1, 0, 0]);
        assert_eq!(cfg.states["dump"], vec![0, 0, 1, 1]);
        assert_eq!(cfg.backend, Backend::Sim);
        assert_eq!(cfg.polarity, Polarity::ActiveHigh);
        assert_eq!(cfg.steps().unwrap().len(), 4);
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let result = load_from(&dir.path().join("relayctl.toml")).expect("no error");
        assert!(result.is_none());
    }

    #[test]
    fn load_full_config() {
        let (_dir, path) = write_config(
            r#"
pins = [5, 6, 13]
polarity = "active_low"
step_delay_ms = 0
sequence = ["Fill", "close:2", "open_all"]

[states]
fill = [1, 0, 1]
"#,
        );
        let cfg = load_from(&path).expect("load ok").expect("some");
        assert_eq!(cfg.pins, vec![5, 6, 13]);
        assert_eq!(cfg.polarity, Polarity::ActiveLow);
        assert_eq!(cfg.step_delay(), Duration::ZERO);
        assert_eq!(
            cfg.steps().unwrap(),
            vec![
                Step::State("Fill".to_string()),
                Step::Close(2),
                Step::OpenAll
            ]
        );
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let (_dir, path) = write_config("pins = [1, 2, 3, 4]\n");
        let cfg = load_from(&path).expect("load ok").expect("some");
        assert_eq!(cfg.pins, vec![1, 2, 3, 4]);
        assert_eq!(cfg.states, default_states());
        assert_eq!(cfg.sequence, default_sequence());
    }

    #[test]
    fn malformed_toml_is_an_error() {
        let (_dir, path) = write_config("pins = [1, 2,\n");
        let err = load_from(&path).unwrap_err();
        assert!(err.contains("Failed to parse config"));
    }

    #[test]
    fn build_machine_requires_a_relay() {
        let cfg = Config {
            pins: Vec::new(),
            states: BTreeMap::new(),
            ..Config::default()
        };
        assert!(matches!(
            cfg.build_machine(SimGpio::new()),
            Err(RelayError::Configuration(ConfigError::NoRelays))
        ));
    }

    #[test]
    fn build_machine_reports_shape_errors() {
        let mut cfg = Config::default();
        cfg.states.insert("vent".to_string(), vec![1, 0]);
        assert!(matches!(
            cfg.build_machine(SimGpio::new()),
            Err(RelayError::Configuration(ConfigError::LengthMismatch { .. }))
        ));
    }

    #[test]
    fn build_machine_from_defaults() {
        let machine = Config::default().build_machine(SimGpio::new()).unwrap();
        assert_eq!(machine.current_state(), "null");
        assert_eq!(machine.relay_count(), 4);
    }

    #[test]
    fn apply_env_overrides_changes_backend() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("RELAYCTL_BACKEND", "RPPAL") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.backend, Backend::Rppal);
        unsafe { std::env::remove_var("RELAYCTL_BACKEND") };
    }

    #[test]
    fn apply_env_overrides_ignores_invalid_delay() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("RELAYCTL_STEP_DELAY_MS", "soon") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.step_delay_ms, default_step_delay_ms());
        unsafe { std::env::remove_var("RELAYCTL_STEP_DELAY_MS") };
    }
}
