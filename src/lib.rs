//! Climate controller application for myco-rs
//!
//! Sits on top of the decoders in [`myco_core`]: filters and queues remote
//! commands, dispatches them to the backlight and relays, and schedules
//! climate readings. Hardware is reached only through traits, so everything
//! here runs unchanged under the simulator and host tests.

#![no_std]

pub mod app;
pub mod command_filter;
pub mod commands;
pub mod config;
pub mod controller;
pub mod monitor;
pub mod shared;

pub use app::App;
pub use command_filter::{COMMAND_CHANNEL, CommandFilter, CommandQueue};
pub use commands::Command;
pub use config::{Config, ConfigError};
pub use controller::{Backlight, ControlOutcome, Controller, Relay, Relays};
pub use monitor::{Monitor, ReadingSink};
pub use shared::Shared;
