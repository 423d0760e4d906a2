//! Remote-control key codes and what the controller does with them.
//!
//! Codes are the 6-bit command field of a decoded RC-5 frame, as sent by a
//! standard TV remote:
//!
//! ```text
//!   [POWER] 12          [MENU] 18    [AV] 56
//!   [ 1 ] 1   [ 2 ] 2   [ 3 ] 3
//!            [ ^ ] 16
//!   [ < ] 21          [ > ] 22       [CH+] 32
//!            [ v ] 17                [CH-] 33
//! ```

/// Keys the controller understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Up,
    Down,
    Left,
    Right,
    /// Backlight on/off
    Power,
    Menu,
    /// Backlight one step brighter
    ChannelUp,
    /// Backlight one step dimmer
    ChannelDown,
    Av,
    /// Immediate climate reading
    Digit1,
    /// Toggle relay A
    Digit2,
    /// Toggle relay B
    Digit3,
    /// Any other code
    Unknown(u8),
}

impl Command {
    pub const fn from_code(code: u8) -> Self {
        match code {
            16 => Self::Up,
            17 => Self::Down,
            21 => Self::Left,
            22 => Self::Right,
            12 => Self::Power,
            18 => Self::Menu,
            32 => Self::ChannelUp,
            33 => Self::ChannelDown,
            56 => Self::Av,
            1 => Self::Digit1,
            2 => Self::Digit2,
            3 => Self::Digit3,
            other => Self::Unknown(other),
        }
    }

    pub const fn to_code(self) -> u8 {
        match self {
            Self::Up => 16,
            Self::Down => 17,
            Self::Left => 21,
            Self::Right => 22,
            Self::Power => 12,
            Self::Menu => 18,
            Self::ChannelUp => 32,
            Self::ChannelDown => 33,
            Self::Av => 56,
            Self::Digit1 => 1,
            Self::Digit2 => 2,
            Self::Digit3 => 3,
            Self::Unknown(code) => code,
        }
    }

    /// Keys that act on every repeat while held
    pub const fn is_continuous(self) -> bool {
        matches!(self, Self::ChannelUp | Self::ChannelDown)
    }
}

impl From<u8> for Command {
    fn from(code: u8) -> Self {
        Self::from_code(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_map_both_ways() {
        for code in 0..64 {
            assert_eq!(Command::from_code(code).to_code(), code);
        }
        assert_eq!(Command::from_code(12), Command::Power);
        assert_eq!(Command::from_code(40), Command::Unknown(40));
    }

    #[test]
    fn test_only_channel_keys_are_continuous() {
        assert!(Command::ChannelUp.is_continuous());
        assert!(Command::ChannelDown.is_continuous());
        assert!(!Command::Power.is_continuous());
        assert!(!Command::Digit1.is_continuous());
    }
}
