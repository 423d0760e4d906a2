//! Auto-repeat filtering between the remote decoder and the foreground loop
//!
//! A held key makes the remote resend the same frame about every 114 ms with
//! the toggle bit unchanged; a new press flips it. The filter passes one
//! command per press, except for continuous keys which pass every repeat.
//! Accepted codes are queued for the foreground loop.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::{debug, warn};
use myco_core::remote::{FrameSink, RemoteMessage};

use crate::commands::Command;

/// Commands waiting for the foreground loop
pub const COMMAND_QUEUE_CAPACITY: usize = 5;

pub type CommandQueue = Channel<CriticalSectionRawMutex, u8, COMMAND_QUEUE_CAPACITY>;

/// Global queue between the remote interrupt and the foreground loop
pub static COMMAND_CHANNEL: CommandQueue = Channel::new();

/// Frame handler for the remote decoder. Runs in interrupt context.
pub struct CommandFilter<'q> {
    queue: &'q CommandQueue,
    last_toggle: Option<bool>,
    dropped: u32,
}

impl<'q> CommandFilter<'q> {
    pub const fn new(queue: &'q CommandQueue) -> Self {
        Self {
            queue,
            last_toggle: None,
            dropped: 0,
        }
    }

    /// Commands lost to a full queue
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

impl FrameSink for CommandFilter<'_> {
    fn on_frame(&mut self, message: RemoteMessage) {
        let code = message.command();

        if !Command::from_code(code).is_continuous() {
            let toggle = message.toggle_bit();
            if self.last_toggle == Some(toggle) {
                debug!("remote: repeat of {} ignored", code);
                return;
            }
            self.last_toggle = Some(toggle);
        }

        if self.queue.try_send(code).is_err() {
            self.dropped = self.dropped.wrapping_add(1);
            warn!("remote: command queue full, {} dropped", code);
        }
    }
}
