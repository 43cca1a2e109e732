//! Command frames written to the Bot.
//!
//! Every request starts with the magic byte `0x57` followed by a command byte:
//! - Query status: `0x57 0x02`
//! - Action: `0x57 0x01` + selector (`0x00` press, `0x01` switch on, `0x02` switch off)

use bytes::Bytes;

/// Leading byte of every command frame.
pub const COMMAND_MAGIC: u8 = 0x57;
/// Command byte for an action request.
pub const ACTION_COMMAND: u8 = 0x01;
/// Command byte for a status query.
pub const QUERY_COMMAND: u8 = 0x02;

/// Action performed by the Bot arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum BotAction {
    /// Press and release (press mode).
    Press = 0x00,
    /// Move to the "on" position (switch mode).
    TurnOn = 0x01,
    /// Move to the "off" position (switch mode).
    TurnOff = 0x02,
}

impl BotAction {
    /// Select an action from the advertised mode and desired state.
    ///
    /// `mode = true` is press mode and ignores `state`; otherwise `state`
    /// selects between switching on and off.
    pub fn from_flags(mode: bool, state: bool) -> Self {
        match (mode, state) {
            (true, _) => Self::Press,
            (false, true) => Self::TurnOn,
            (false, false) => Self::TurnOff,
        }
    }

    /// Selector byte placed after the action opcode.
    pub fn selector(&self) -> u8 {
        *self as u8
    }
}

impl std::fmt::Display for BotAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Press => write!(f, "press"),
            Self::TurnOn => write!(f, "turn on"),
            Self::TurnOff => write!(f, "turn off"),
        }
    }
}

/// An immutable command frame, built fresh for every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFrame(Bytes);

impl CommandFrame {
    /// Frame requesting the device status.
    pub fn query() -> Self {
        Self(Bytes::from_static(&[COMMAND_MAGIC, QUERY_COMMAND]))
    }

    /// Frame requesting an action.
    pub fn action(action: BotAction) -> Self {
        Self(Bytes::copy_from_slice(&[
            COMMAND_MAGIC,
            ACTION_COMMAND,
            action.selector(),
        ]))
    }

    /// The raw frame bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Frame length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the frame is empty (never true for built frames).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CommandFrame {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

/// Encode the status query command.
pub fn encode_query() -> CommandFrame {
    CommandFrame::query()
}

/// Encode an action command from mode/state flags.
pub fn encode_action(mode: bool, state: bool) -> CommandFrame {
    CommandFrame::action(BotAction::from_flags(mode, state))
}
