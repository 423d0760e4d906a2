//! Dispatches remote commands to the backlight and relay outputs

use log::{debug, info};

use crate::commands::Command;

/// Highest backlight step
pub const MAX_BACKLIGHT: u8 = 15;

/// Level restored by the power key
pub const POWER_ON_LEVEL: u8 = 7;

/// PWM-dimmed display backlight, `0` is off
pub trait Backlight {
    fn set_level(&mut self, level: u8);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relay {
    A,
    B,
}

/// The two switched outputs
pub trait Relays {
    fn toggle(&mut self, relay: Relay);
}

/// What the foreground loop still has to do after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlOutcome {
    Handled,
    /// Start a climate reading now instead of waiting for the schedule
    AcquireClimate,
    Ignored,
}

pub struct Controller<B, R> {
    backlight: B,
    relays: R,
    level: u8,
}

impl<B: Backlight, R: Relays> Controller<B, R> {
    /// Takes over the outputs and applies the initial backlight level
    pub fn new(mut backlight: B, relays: R, level: u8) -> Self {
        let level = level.min(MAX_BACKLIGHT);
        backlight.set_level(level);
        Self {
            backlight,
            relays,
            level,
        }
    }

    pub fn dispatch(&mut self, command: Command) -> ControlOutcome {
        match command {
            Command::ChannelUp => {
                if self.level < MAX_BACKLIGHT {
                    self.set_backlight(self.level + 1);
                }
            }
            Command::ChannelDown => {
                if self.level > 0 {
                    self.set_backlight(self.level - 1);
                }
            }
            Command::Power => {
                let level = if self.level > 0 { 0 } else { POWER_ON_LEVEL };
                self.set_backlight(level);
            }
            Command::Digit2 => self.toggle_relay(Relay::A),
            Command::Digit3 => self.toggle_relay(Relay::B),
            Command::Digit1 => return ControlOutcome::AcquireClimate,
            other => {
                debug!("controller: no action for {:?}", other);
                return ControlOutcome::Ignored;
            }
        }
        ControlOutcome::Handled
    }

    pub fn backlight_level(&self) -> u8 {
        self.level
    }

    pub fn backlight(&self) -> &B {
        &self.backlight
    }

    pub fn relays(&self) -> &R {
        &self.relays
    }

    fn set_backlight(&mut self, level: u8) {
        self.level = level;
        self.backlight.set_level(level);
        debug!("controller: backlight {}", level);
    }

    fn toggle_relay(&mut self, relay: Relay) {
        self.relays.toggle(relay);
        info!("controller: relay {:?} toggled", relay);
    }
}
