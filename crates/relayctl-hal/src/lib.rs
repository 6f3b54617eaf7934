//! `relayctl-hal` – relay bank and named-state engine
//!
//! # Modules
//!
//! - [`output`] – [`GpioOutput`][output::GpioOutput]: the injected
//!   capability that drives and reads back digital output pins.
//! - [`bank`] – [`RelayBank`][bank::RelayBank]: `N` independently
//!   addressable relays with range-checked open/close/query and ascending
//!   bulk operations.
//! - [`state_machine`] – [`StateMachine`][state_machine::StateMachine]:
//!   maps case-insensitive state names onto whole-bank target vectors and
//!   applies them in ascending relay order.
//! - [`sim`] – [`SimGpio`][sim::SimGpio]: in-memory pins with fault
//!   injection for hardware-free runs and tests.
//! - `rpi` (feature `rppal`) – `RppalOutput`, a Raspberry Pi backend.

pub mod bank;
pub mod output;
#[cfg(feature = "rppal")]
pub mod rpi;
pub mod sim;
pub mod state_machine;

pub use bank::RelayBank;
pub use output::GpioOutput;
#[cfg(feature = "rppal")]
pub use rpi::RppalOutput;
pub use sim::SimGpio;
pub use state_machine::{NULL_STATE, StateDefinition, StateMachine, StateMachineBuilder};
