//! Sequence runner – drives a [`StateMachine`] through configured steps.

use std::str::FromStr;
use std::thread;
use std::time::Duration;

use relayctl_hal::{GpioOutput, StateMachine};
use relayctl_types::{ConfigError, RelayError, StateSnapshot};
use tracing::{info, warn};

/// One entry of the configured sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Switch to a named state.
    State(String),
    OpenAll,
    CloseAll,
    Open(usize),
    Close(usize),
}

impl FromStr for Step {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let s = raw.trim();
        let index = |arg: &str| {
            arg.trim().parse::<usize>().map_err(|_| {
                ConfigError::Invalid(format!("invalid relay index in step '{raw}'"))
            })
        };
        match s.to_ascii_lowercase().as_str() {
            "" => Err(ConfigError::Invalid("empty sequence step".to_string())),
            "open_all" => Ok(Step::OpenAll),
            "close_all" => Ok(Step::CloseAll),
            lower => {
                if let Some(arg) = lower.strip_prefix("open:") {
                    Ok(Step::Open(index(arg)?))
                } else if let Some(arg) = lower.strip_prefix("close:") {
                    Ok(Step::Close(index(arg)?))
                } else {
                    Ok(Step::State(s.to_string()))
                }
            }
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Step::State(name) => write!(f, "{name}"),
            Step::OpenAll => write!(f, "open_all"),
            Step::CloseAll => write!(f, "close_all"),
            Step::Open(i) => write!(f, "open:{i}"),
            Step::Close(i) => write!(f, "close:{i}"),
        }
    }
}

/// Apply a single step and return the resulting snapshot.
///
/// Bank-level steps do not change the machine's state label.
pub fn apply<O: GpioOutput>(
    machine: &mut StateMachine<O>,
    step: &Step,
) -> Result<StateSnapshot, RelayError> {
    match step {
        Step::State(name) => return machine.set_state(name),
        Step::OpenAll => machine.bank_mut().open_all()?,
        Step::CloseAll => machine.bank_mut().close_all()?,
        Step::Open(i) => machine.bank_mut().open(*i)?,
        Step::Close(i) => machine.bank_mut().close(*i)?,
    }
    machine.get_state_info()
}

/// Run `steps` in order, pausing `delay` between them and handing every
/// snapshot to `report`.
///
/// Stops at the first failing step. Before returning the error, the actual
/// relay read-back is reported when the hardware still answers.
pub fn run<O: GpioOutput>(
    machine: &mut StateMachine<O>,
    steps: &[Step],
    delay: Duration,
    mut report: impl FnMut(&StateSnapshot),
) -> Result<(), RelayError> {
    for (n, step) in steps.iter().enumerate() {
        if n > 0 && !delay.is_zero() {
            thread::sleep(delay);
        }
        match apply(machine, step) {
            Ok(snapshot) => {
                info!(step = %step, state = %snapshot.current_state, "step applied");
                report(&snapshot);
            }
            Err(e) => {
                warn!(step = %step, error = %e, "step failed");
                match machine.get_state_info() {
                    Ok(snapshot) => report(&snapshot),
                    Err(read_err) => warn!(error = %read_err, "relay read-back unavailable"),
                }
                return Err(e);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use relayctl_hal::SimGpio;

    fn bench() -> StateMachine<SimGpio> {
        StateMachine::builder(vec![22, 23, 24, 25], SimGpio::new())
            .state("charge", vec![1, 1, 0, 0])
            .state("dump", vec![0, 0, 1, 1])
            .build()
            .unwrap()
    }

    fn steps(raw: &[&str]) -> Vec<Step> {
        raw.iter().map(|s| s.parse().unwrap()).collect()
    }

    #[test]
    fn parse_steps() {
        assert_eq!("Charge".parse::<Step>().unwrap(), Step::State("Charge".into()));
        assert_eq!("CLOSE_ALL".parse::<Step>().unwrap(), Step::CloseAll);
        assert_eq!(" open:3 ".parse::<Step>().unwrap(), Step::Open(3));
        assert_eq!("close: 0".parse::<Step>().unwrap(), Step::Close(0));
        assert!("open:-1".parse::<Step>().is_err());
        assert!("close:x".parse::<Step>().is_err());
        assert!("  ".parse::<Step>().is_err());
    }

    #[test]
    fn step_display_parses_back() {
        for step in [Step::OpenAll, Step::Close(2), Step::State("dump".into())] {
            assert_eq!(step.to_string().parse::<Step>().unwrap(), step);
        }
    }

    #[test]
    fn runs_the_bench_sequence() {
        let mut machine = bench();
        let mut seen = Vec::new();
        run(
            &mut machine,
            &steps(&["charge", "dump", "null", "close_all"]),
            Duration::ZERO,
            |s| seen.push((s.current_state.clone(), s.relay_states.clone())),
        )
        .unwrap();

        assert_eq!(
            seen,
            vec![
                ("charge".to_string(), vec![1, 1, 0, 0]),
                ("dump".to_string(), vec![0, 0, 1, 1]),
                ("null".to_string(), vec![0, 0, 0, 0]),
                ("null".to_string(), vec![1, 1, 1, 1]),
            ]
        );
    }

    #[test]
    fn stops_at_first_failure_and_reports_read_back() {
        let mut machine = bench();
        let mut seen = Vec::new();
        let err = run(
            &mut machine,
            &steps(&["charge", "bogus", "dump"]),
            Duration::ZERO,
            |s| seen.push(s.clone()),
        )
        .unwrap_err();

        assert_eq!(err, RelayError::UnknownState("bogus".to_string()));
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].current_state, "charge");
        assert_eq!(seen[1].relay_states, vec![1, 1, 0, 0]);
        assert_eq!(machine.current_state(), "charge");
    }

    #[test]
    fn out_of_range_step_is_reported() {
        let mut machine = bench();
        let err = run(&mut machine, &steps(&["close:4"]), Duration::ZERO, |_| {}).unwrap_err();
        assert!(matches!(err, RelayError::OutOfRange { index: 4, count: 4 }));
    }
}
