use serde::{Deserialize, Serialize};

/// Number of bits in one frame
pub const MESSAGE_BITS: u8 = 14;

const START_BIT: u16 = 13;
const FIELD_BIT: u16 = 12;
const TOGGLE_BIT: u16 = 11;
const ADDRESS_SHIFT: u16 = 6;
const ADDRESS_MASK: u16 = 0x1F;
const COMMAND_MASK: u16 = 0x3F;

/// One decoded 14-bit remote-control frame.
///
/// ```text
///  13   12   11   10..6     5..0
///  S1 | S2 | T  | address | command
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteMessage(u16);

impl RemoteMessage {
    /// Wraps a raw frame. Bits above the frame are dropped.
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw & ((1 << MESSAGE_BITS) - 1))
    }

    /// Builds a frame with the start bit set
    pub const fn from_fields(field: bool, toggle: bool, address: u8, command: u8) -> Self {
        Self(
            1 << START_BIT
                | (field as u16) << FIELD_BIT
                | (toggle as u16) << TOGGLE_BIT
                | (address as u16 & ADDRESS_MASK) << ADDRESS_SHIFT
                | (command as u16 & COMMAND_MASK),
        )
    }

    pub const fn raw(self) -> u16 {
        self.0
    }

    pub const fn start_bit(self) -> bool {
        (self.0 >> START_BIT) & 1 != 0
    }

    /// S2. Transmitters that use it as a seventh command bit send it inverted.
    pub const fn field_bit(self) -> bool {
        (self.0 >> FIELD_BIT) & 1 != 0
    }

    /// Flips on every new key press and stays put while a key is held
    pub const fn toggle_bit(self) -> bool {
        (self.0 >> TOGGLE_BIT) & 1 != 0
    }

    pub const fn address(self) -> u8 {
        ((self.0 >> ADDRESS_SHIFT) & ADDRESS_MASK) as u8
    }

    pub const fn command(self) -> u8 {
        (self.0 & COMMAND_MASK) as u8
    }

    /// Seven-bit command with the field bit on top
    pub const fn extended_command(self) -> u8 {
        self.command() | (self.field_bit() as u8) << 6
    }
}

impl From<RemoteMessage> for u16 {
    fn from(message: RemoteMessage) -> Self {
        message.raw()
    }
}
