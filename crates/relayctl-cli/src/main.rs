//! `relayctl` – bench harness for the relay state machine
//!
//! Loads `relayctl.toml` (path from the first argument, `RELAYCTL_CONFIG`, or
//! the working directory; built-in defaults when absent), builds the relay
//! bank and state machine on the configured backend, then runs the configured
//! sequence. Every resulting [`StateSnapshot`] is printed to stdout as one
//! JSON line. Exits with status 1 on the first failure.
//!
//! [`StateSnapshot`]: relayctl_types::StateSnapshot

mod config;
mod runner;

use tracing::info;

use relayctl_hal::{GpioOutput, SimGpio};

use crate::config::{Backend, Config};
use crate::runner::Step;

fn main() {
    // ── Structured logging ────────────────────────────────────────────────
    // RUST_LOG selects the filter (default "info"); RELAYCTL_LOG_FORMAT=json
    // switches to newline-delimited JSON. Logs go to stderr so stdout only
    // carries snapshots.
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    if std::env::var("RELAYCTL_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .compact()
            .init();
    }

    if let Err(e) = run() {
        eprintln!("relayctl: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let path = config::config_path(std::env::args().nth(1));
    let cfg = match config::load_from(&path)? {
        Some(cfg) => {
            info!(path = %path.display(), "config loaded");
            cfg
        }
        None => {
            info!(path = %path.display(), "no config file; using built-in bench defaults");
            let mut cfg = Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
    };
    let steps = cfg.steps().map_err(|e| e.to_string())?;
    info!(backend = %cfg.backend, steps = steps.len(), "starting sequence");

    match cfg.backend {
        Backend::Sim => drive(&cfg, &steps, SimGpio::new()),
        #[cfg(feature = "rppal")]
        Backend::Rppal => {
            let output = relayctl_hal::RppalOutput::new(&cfg.pins, cfg.polarity)
                .map_err(|e| e.to_string())?;
            drive(&cfg, &steps, output)
        }
        #[cfg(not(feature = "rppal"))]
        Backend::Rppal => Err("backend 'rppal' requires building with `--features rppal`".to_string()),
    }
}

fn drive<O: GpioOutput>(cfg: &Config, steps: &[Step], output: O) -> Result<(), String> {
    let mut machine = cfg.build_machine(output).map_err(|e| e.to_string())?;
    runner::run(&mut machine, steps, cfg.step_delay(), |snapshot| {
        match serde_json::to_string(snapshot) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::warn!(error = %e, "failed to serialise snapshot"),
        }
    })
    .map_err(|e| e.to_string())
}
