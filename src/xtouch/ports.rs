//! MIDI port pair and wire framing
//!
//! Every unit of the surface talks over one input/output pair. Outgoing frames
//! are not written directly: they go into the callback's outbox tagged with the
//! pair's `PortId`, and the connection layer flushes them afterwards.

use std::sync::atomic::{AtomicUsize, Ordering};

use super::device::DeviceKind;
use crate::context::{Context, PortId};
use crate::midi::MidiMessage;

static NEXT_PORT_PAIR: AtomicUsize = AtomicUsize::new(1);

/// Mackie Control SysEx header without the unit byte
const SYSEX_HEADER: [u8; 3] = [0x00, 0x00, 0x66];

/// Input/output identity of one unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortPair {
    index: usize,
    kind: DeviceKind,
    input_name: String,
    output_name: String,
    detection_pattern: Option<String>,
}

impl PortPair {
    /// Create a pair; unnamed ports get `"<unit> In <n>"` / `"<unit> Out <n>"`
    pub fn new(kind: DeviceKind, input_name: Option<String>, output_name: Option<String>) -> Self {
        let index = NEXT_PORT_PAIR.fetch_add(1, Ordering::Relaxed);
        let base = kind.port_base_name();

        Self {
            index,
            kind,
            input_name: input_name.unwrap_or_else(|| format!("{} In {}", base, index)),
            output_name: output_name.unwrap_or_else(|| format!("{} Out {}", base, index)),
            detection_pattern: None,
        }
    }

    /// Match both ports by a case-insensitive name pattern instead of the names
    pub fn with_detection_pattern(mut self, pattern: &str) -> Self {
        self.detection_pattern = Some(pattern.to_string());
        self
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn id(&self) -> PortId {
        PortId(self.index)
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    pub fn input_name(&self) -> &str {
        &self.input_name
    }

    pub fn output_name(&self) -> &str {
        &self.output_name
    }

    pub fn detection_pattern(&self) -> Option<&str> {
        self.detection_pattern.as_deref()
    }

    /// LED/button state on channel 0; any non-zero velocity lights the LED fully
    pub fn send_note_on(&self, ctx: &mut Context<'_>, pitch: u8, velocity: u8) {
        let velocity = if velocity == 0 { 0 } else { 0x7F };
        self.send(ctx, MidiMessage::NoteOn {
            channel: 0,
            note: pitch,
            velocity,
        });
    }

    pub fn send_control_change(&self, ctx: &mut Context<'_>, cc: u8, value: u8) {
        self.send(ctx, MidiMessage::ControlChange {
            channel: 0,
            cc,
            value,
        });
    }

    /// 14-bit motor position for `channel` (8 = master fader)
    pub fn send_pitch_bend(&self, ctx: &mut Context<'_>, channel: u8, value: u16) {
        self.send(ctx, MidiMessage::PitchBend { channel, value });
    }

    pub fn send_channel_pressure(&self, ctx: &mut Context<'_>, pressure: u8) {
        self.send(ctx, MidiMessage::ChannelPressure {
            channel: 0,
            pressure,
        });
    }

    /// Wrap `body` in the Mackie header for this unit and the terminator
    pub fn send_sysex(&self, ctx: &mut Context<'_>, body: &[u8]) {
        let mut data = Vec::with_capacity(SYSEX_HEADER.len() + 1 + body.len());
        data.extend_from_slice(&SYSEX_HEADER);
        data.push(self.kind.sysex_unit());
        data.extend_from_slice(body);
        self.send(ctx, MidiMessage::SysEx { data });
    }

    fn send(&self, ctx: &mut Context<'_>, message: MidiMessage) {
        ctx.send_midi(self.id(), message.encode());
    }
}
