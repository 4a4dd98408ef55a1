//! MIDI utilities and message types
//!
//! Provides MIDI message parsing, encoding, and value conversions for the
//! subset of messages a Mackie Control surface exchanges.

use std::fmt;

/// MIDI message types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MidiMessage {
    /// Note Off: channel (0-15), note (0-127), velocity (0-127)
    NoteOff { channel: u8, note: u8, velocity: u8 },

    /// Note On: channel (0-15), note (0-127), velocity (0-127)
    NoteOn { channel: u8, note: u8, velocity: u8 },

    /// Control Change: channel (0-15), cc (0-127), value (0-127)
    ControlChange { channel: u8, cc: u8, value: u8 },

    /// Channel Pressure: channel (0-15), pressure (0-127)
    ChannelPressure { channel: u8, pressure: u8 },

    /// Pitch Bend: channel (0-15), value (0-16383, 14-bit)
    PitchBend { channel: u8, value: u16 },

    /// System Exclusive: payload between 0xF0 and 0xF7
    SysEx { data: Vec<u8> },
}

impl MidiMessage {
    /// Parse a MIDI message from raw bytes
    pub fn parse(data: &[u8]) -> Option<Self> {
        let (&status, rest) = data.split_first()?;

        // Running status is never used by the surface
        if status < 0x80 {
            return None;
        }

        if status == 0xF0 {
            let end = data.iter().position(|&b| b == 0xF7)?;
            return Some(MidiMessage::SysEx {
                data: data[1..end].to_vec(),
            });
        }

        let channel = status & 0x0F;
        match status & 0xF0 {
            0x80 => {
                let [note, velocity, ..] = *rest else { return None };
                Some(MidiMessage::NoteOff {
                    channel,
                    note: note & 0x7F,
                    velocity: velocity & 0x7F,
                })
            }
            0x90 => {
                // Note On with velocity 0 = Note Off
                let [note, velocity, ..] = *rest else { return None };
                let note = note & 0x7F;
                let velocity = velocity & 0x7F;
                if velocity == 0 {
                    Some(MidiMessage::NoteOff { channel, note, velocity: 0 })
                } else {
                    Some(MidiMessage::NoteOn { channel, note, velocity })
                }
            }
            0xB0 => {
                let [cc, value, ..] = *rest else { return None };
                Some(MidiMessage::ControlChange {
                    channel,
                    cc: cc & 0x7F,
                    value: value & 0x7F,
                })
            }
            0xD0 => {
                let [pressure, ..] = *rest else { return None };
                Some(MidiMessage::ChannelPressure {
                    channel,
                    pressure: pressure & 0x7F,
                })
            }
            0xE0 => {
                let [lsb, msb, ..] = *rest else { return None };
                let value = (((msb & 0x7F) as u16) << 7) | (lsb & 0x7F) as u16;
                Some(MidiMessage::PitchBend { channel, value })
            }
            _ => None,
        }
    }

    /// Encode the message to MIDI bytes
    pub fn encode(&self) -> Vec<u8> {
        match *self {
            MidiMessage::NoteOff { channel, note, velocity } => {
                vec![0x80 | (channel & 0x0F), note & 0x7F, velocity & 0x7F]
            }
            MidiMessage::NoteOn { channel, note, velocity } => {
                vec![0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F]
            }
            MidiMessage::ControlChange { channel, cc, value } => {
                vec![0xB0 | (channel & 0x0F), cc & 0x7F, value & 0x7F]
            }
            MidiMessage::ChannelPressure { channel, pressure } => {
                vec![0xD0 | (channel & 0x0F), pressure & 0x7F]
            }
            MidiMessage::PitchBend { channel, value } => {
                let lsb = (value & 0x7F) as u8;
                let msb = ((value >> 7) & 0x7F) as u8;
                vec![0xE0 | (channel & 0x0F), lsb, msb]
            }
            MidiMessage::SysEx { ref data } => {
                let mut result = Vec::with_capacity(data.len() + 2);
                result.push(0xF0);
                result.extend(data.iter().map(|b| b & 0x7F));
                result.push(0xF7);
                result
            }
        }
    }
}

impl fmt::Display for MidiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MidiMessage::NoteOff { channel, note, velocity } => {
                write!(f, "NoteOff ch:{} n:{} v:{}", channel + 1, note, velocity)
            }
            MidiMessage::NoteOn { channel, note, velocity } => {
                write!(f, "NoteOn ch:{} n:{} v:{}", channel + 1, note, velocity)
            }
            MidiMessage::ControlChange { channel, cc, value } => {
                write!(f, "CC ch:{} cc:{} v:{}", channel + 1, cc, value)
            }
            MidiMessage::ChannelPressure { channel, pressure } => {
                write!(f, "ChannelPressure ch:{} p:{}", channel + 1, pressure)
            }
            MidiMessage::PitchBend { channel, value } => {
                write!(f, "PitchBend ch:{} v:{}", channel + 1, value)
            }
            MidiMessage::SysEx { ref data } => {
                write!(f, "SysEx {} bytes", data.len())
            }
        }
    }
}

/// MIDI value conversion utilities
pub mod convert {
    pub const MAX_14BIT: u16 = 16383;

    /// Convert a normalized value (0.0-1.0) to 14-bit
    pub fn to_14bit(normalized: f64) -> u16 {
        (normalized.clamp(0.0, 1.0) * MAX_14BIT as f64).round() as u16
    }

    /// Convert a 14-bit value to normalized (0.0-1.0)
    pub fn from_14bit(value: u16) -> f64 {
        value.min(MAX_14BIT) as f64 / MAX_14BIT as f64
    }

    /// Decode a Mackie relative CC value into signed ticks
    ///
    /// Bit 6 carries the direction (set = counter-clockwise), the low six bits
    /// the tick count.
    pub fn relative_ticks(value: u8) -> i32 {
        let ticks = (value & 0x3F) as i32;
        if value & 0x40 != 0 {
            -ticks
        } else {
            ticks
        }
    }
}

/// Format MIDI bytes as hex string for debugging
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
