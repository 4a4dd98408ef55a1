//! Mackie Control note and controller numbers used by the X-Touch
//!
//! Channel-relative controls are given as the number of channel 0 of a unit;
//! add the local channel index (0-7).

pub const REC: u8 = 0x00;
pub const SOLO: u8 = 0x08;
pub const MUTE: u8 = 0x10;
pub const SELECT: u8 = 0x18;
pub const ENCODER_PUSH: u8 = 0x20;

pub const ASSIGN_TRACK: u8 = 0x28;
pub const ASSIGN_SEND: u8 = 0x29;
pub const ASSIGN_PAN: u8 = 0x2A;
pub const ASSIGN_PLUGIN: u8 = 0x2B;
pub const ASSIGN_EQ: u8 = 0x2C;
pub const ASSIGN_INSTRUMENT: u8 = 0x2D;

pub const BANK_LEFT: u8 = 0x2E;
pub const BANK_RIGHT: u8 = 0x2F;
pub const CHANNEL_LEFT: u8 = 0x30;
pub const CHANNEL_RIGHT: u8 = 0x31;
pub const FLIP: u8 = 0x32;
pub const GLOBAL_VIEW: u8 = 0x33;
pub const NAME_VALUE: u8 = 0x34;
pub const SMPTE_BEATS: u8 = 0x35;

pub const REWIND: u8 = 0x5B;
pub const FORWARD: u8 = 0x5C;
pub const STOP: u8 = 0x5D;
pub const PLAY: u8 = 0x5E;
pub const RECORD: u8 = 0x5F;

pub const FADER_TOUCH: u8 = 0x68;
pub const MASTER_FADER_TOUCH: u8 = 0x70;
pub const SMPTE_LED: u8 = 0x71;
pub const BEATS_LED: u8 = 0x72;

/// Controller numbers (CC, channel 0)
pub mod cc {
    pub const ENCODER_ROTATE: u8 = 0x10;
    pub const ENCODER_RING: u8 = 0x30;
    pub const JOG: u8 = 0x3C;
    pub const SEGMENT: u8 = 0x40;
}

/// Pitch-bend channel of the master fader
pub const MASTER_FADER_CHANNEL: u8 = 8;

/// Channel-relative button rows, in note order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelButton {
    Rec,
    Solo,
    Mute,
    Select,
}

impl ChannelButton {
    pub const ALL: [ChannelButton; 4] = [Self::Rec, Self::Solo, Self::Mute, Self::Select];

    pub fn base_note(self) -> u8 {
        match self {
            Self::Rec => REC,
            Self::Solo => SOLO,
            Self::Mute => MUTE,
            Self::Select => SELECT,
        }
    }

    pub fn note(self, channel: u8) -> u8 {
        self.base_note() + (channel & 0x07)
    }

    /// Decode a note below `ENCODER_PUSH` into button row and local channel
    pub fn from_note(note: u8) -> Option<(Self, u8)> {
        let row = match note & 0xF8 {
            REC => Self::Rec,
            SOLO => Self::Solo,
            MUTE => Self::Mute,
            SELECT => Self::Select,
            _ => return None,
        };
        Some((row, note & 0x07))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_button_notes() {
        assert_eq!(ChannelButton::Mute.note(3), 0x13);
        assert_eq!(ChannelButton::from_note(0x1A), Some((ChannelButton::Select, 2)));
        assert_eq!(ChannelButton::from_note(0x07), Some((ChannelButton::Rec, 7)));
        assert_eq!(ChannelButton::from_note(ENCODER_PUSH), None);
    }
}
