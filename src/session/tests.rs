//! Wiring-level tests for the surface session

use super::*;
use crate::config::DeviceConfig;
use crate::context::{HostCommand, MemoryStore, OutgoingFrame, Outbox};
use crate::midi::convert;
use crate::text::format_cell;
use crate::timer::ManualClock;
use crate::xtouch::notes::{self, cc};
use crate::xtouch::DeviceKind;

struct Harness {
    session: Arc<Session>,
    clock: Arc<ManualClock>,
    store: MemoryStore,
}

impl Harness {
    fn new(config: AppConfig) -> Self {
        let clock = Arc::new(ManualClock::new());
        let session = Session::new(&config, clock.clone()).unwrap();
        Self {
            session,
            clock,
            store: MemoryStore::new(),
        }
    }

    /// Run one host callback and return what it produced
    fn run<F>(&mut self, f: F) -> Outbox
    where
        F: for<'c> FnOnce(&Session, &mut Context<'c>),
    {
        let mut outbox = Outbox::new();
        {
            let mut ctx = Context::new(&mut self.store, &mut outbox);
            f(&self.session, &mut ctx);
        }
        outbox
    }

    fn read<T, F>(&mut self, f: F) -> T
    where
        F: for<'c> FnOnce(&Session, &Context<'c>) -> T,
    {
        let mut outbox = Outbox::new();
        let ctx = Context::new(&mut self.store, &mut outbox);
        f(&self.session, &ctx)
    }

    fn port(&self, device: usize) -> PortId {
        self.session.devices()[device].port_id()
    }

    fn midi(&mut self, device: usize, data: &[u8]) -> Outbox {
        let port = self.port(device);
        let data = data.to_vec();
        self.run(move |s, ctx| s.handle_midi(ctx, port, &data))
    }

    fn press(&mut self, note: u8) -> Outbox {
        self.midi(0, &[0x90, note, 0x7F])
    }

    fn title(&mut self, id: &str, title: &str) -> Outbox {
        let (id, title) = (id.to_string(), title.to_string());
        self.run(move |s, ctx| s.on_parameter_title(ctx, &id, &title))
    }

    fn value(&mut self, id: &str, value: f64, display: &str) -> Outbox {
        let (id, display) = (id.to_string(), display.to_string());
        self.run(move |s, ctx| s.on_parameter_value(ctx, &id, value, &display))
    }

    /// Tick every 100 ms for `ms`
    fn advance(&mut self, ms: u64) -> Vec<OutgoingFrame> {
        let mut frames = Vec::new();
        for _ in 0..ms / 100 {
            self.clock.advance(100);
            frames.extend(self.run(|s, ctx| s.tick(ctx)).frames);
        }
        frames
    }
}

fn pitch_bends(frames: &[OutgoingFrame], channel: u8) -> Vec<u16> {
    frames
        .iter()
        .filter(|f| f.bytes.len() == 3 && f.bytes[0] == 0xE0 | channel)
        .map(|f| f.bytes[1] as u16 | (f.bytes[2] as u16) << 7)
        .collect()
}

fn leds(frames: &[OutgoingFrame], note: u8) -> Vec<u8> {
    frames
        .iter()
        .filter(|f| f.bytes.len() == 3 && f.bytes[0] == 0x90 && f.bytes[1] == note)
        .map(|f| f.bytes[2])
        .collect()
}

/// Texts written to one scribble-strip cell, in order
fn lcd_writes(frames: &[OutgoingFrame], row: usize, channel: usize) -> Vec<String> {
    let offset = (row * 56 + channel * 7) as u8;
    frames
        .iter()
        .filter(|f| f.bytes.first() == Some(&0xF0) && f.bytes.get(5) == Some(&0x12) && f.bytes.get(6) == Some(&offset))
        .map(|f| String::from_utf8_lossy(&f.bytes[7..f.bytes.len() - 1]).into_owned())
        .collect()
}

fn two_unit_config() -> AppConfig {
    AppConfig {
        devices: vec![
            DeviceConfig {
                kind: DeviceKind::Main,
                input_port: Some("X-Touch INT".to_string()),
                output_port: Some("X-Touch INT".to_string()),
            },
            DeviceConfig {
                kind: DeviceKind::Extender,
                input_port: Some("X-Touch-Ext".to_string()),
                output_port: Some("X-Touch-Ext".to_string()),
            },
        ],
        ..AppConfig::default()
    }
}

#[test]
fn test_invalid_config_is_rejected() {
    let config = AppConfig {
        encoder_banks: Vec::new(),
        ..AppConfig::default()
    };
    let err = Session::new(&config, Arc::new(ManualClock::new())).unwrap_err();
    assert_eq!(err, ConfigError::NoEncoderBanks);
}

#[test]
fn test_initialize_activates_first_bank() {
    let mut h = Harness::new(AppConfig::default());
    h.title("volume/1", "Kick");
    h.value("volume/1", 0.5, "-6.0dB");

    let out = h.run(|s, ctx| s.initialize(ctx));

    let active = h.read(|s, ctx| s.paging().active(ctx)).unwrap();
    assert_eq!(active.page, 0);
    assert!(!active.flipped);

    assert_eq!(leds(&out.frames, notes::ASSIGN_TRACK), vec![0x7F]);
    assert_eq!(leds(&out.frames, notes::ASSIGN_PAN), vec![0x00]);
    assert_eq!(leds(&out.frames, notes::FLIP), vec![0x00]);
    assert_eq!(lcd_writes(&out.frames, 0, 0).last(), Some(&format_cell("Kick")));
    assert_eq!(pitch_bends(&out.frames, 0), vec![convert::to_14bit(0.5)]);
}

#[test]
fn test_touched_fader_is_left_alone_and_shows_value() {
    let mut h = Harness::new(AppConfig::default());
    h.title("volume/1", "Kick");
    h.value("volume/1", 0.5, "-6.0dB");
    h.run(|s, ctx| s.initialize(ctx));

    let out = h.midi(0, &[0x90, notes::FADER_TOUCH, 0x7F]);
    assert_eq!(lcd_writes(&out.frames, 0, 0), vec![format_cell("-6.0dB")]);

    // Moving the fader goes to the host, the echo must not drive the motor
    let out = h.midi(0, &[0xE0, 0x00, 0x60]);
    assert!(matches!(
        out.commands.as_slice(),
        [HostCommand::SetValue { parameter, .. }] if parameter == "volume/1"
    ));
    let out = h.value("volume/1", 0.75, "-2.5dB");
    assert!(pitch_bends(&out.frames, 0).is_empty());
    assert_eq!(lcd_writes(&out.frames, 0, 0), vec![format_cell("-2.5dB")]);

    // Release resends the host value even though it was the last one seen
    let out = h.midi(0, &[0x90, notes::FADER_TOUCH, 0x00]);
    assert_eq!(pitch_bends(&out.frames, 0), vec![convert::to_14bit(0.75)]);
    assert!(h.read(|s, _| s.timer().is_armed("lcd-revert-0")));

    let frames = h.advance(3000);
    assert_eq!(lcd_writes(&frames, 0, 0), vec![format_cell("Kick")]);
    assert_eq!(h.read(|s, _| s.timer().pending()), 0);
}

#[test]
fn test_revert_skipped_while_touched_again() {
    let mut h = Harness::new(AppConfig::default());
    h.title("volume/2", "Snare");
    h.value("volume/2", 0.3, "-12dB");
    h.run(|s, ctx| s.initialize(ctx));

    h.midi(0, &[0x90, notes::FADER_TOUCH + 1, 0x7F]);
    h.midi(0, &[0x80, notes::FADER_TOUCH + 1, 0x00]);
    h.midi(0, &[0x90, notes::FADER_TOUCH + 1, 0x7F]);

    let frames = h.advance(3000);
    assert!(lcd_writes(&frames, 0, 1).is_empty());
}

#[test]
fn test_unchanged_host_value_does_not_move_motor() {
    let mut h = Harness::new(AppConfig::default());
    h.title("volume/3", "Bass");
    h.value("volume/3", 0.6, "-4dB");
    h.run(|s, ctx| s.initialize(ctx));

    let out = h.value("volume/3", 0.6, "-4dB");
    assert!(pitch_bends(&out.frames, 2).is_empty());

    let out = h.value("volume/3", 0.61, "-3.8dB");
    assert_eq!(pitch_bends(&out.frames, 2).len(), 1);
}

#[test]
fn test_empty_title_unassigns_strip() {
    let mut h = Harness::new(AppConfig::default());
    h.title("volume/1", "Kick");
    h.value("volume/1", 0.8, "0dB");
    h.title("pan/1", "Pan");
    h.value("pan/1", 0.5, "C");
    h.run(|s, ctx| s.initialize(ctx));
    h.press(notes::ASSIGN_PAN);

    let out = h.title("volume/1", "");
    assert_eq!(pitch_bends(&out.frames, 0), vec![0]);
    assert_eq!(lcd_writes(&out.frames, 0, 0), vec![format_cell("")]);

    let out = h.title("pan/1", "");
    assert!(out
        .frames
        .iter()
        .any(|f| f.bytes == vec![0xB0, cc::ENCODER_RING, 0x00]));
    assert_eq!(lcd_writes(&out.frames, 1, 0), vec![format_cell("")]);
}

#[test]
fn test_assign_button_cycles_split_pages() {
    let mut h = Harness::new(AppConfig::default());
    h.run(|s, ctx| s.initialize(ctx));

    let out = h.press(notes::ASSIGN_EQ);
    let eq_first = h.read(|s, ctx| s.paging().active_page(ctx).map(|p| (p.name.clone(), p.chunk)));
    assert_eq!(eq_first, Some(("EQ/EQ 1".to_string(), 0)));
    assert!(out.frames.iter().any(|f| f.bytes == vec![0xB0, cc::SEGMENT + 11, b'1']));
    assert!(out.frames.iter().any(|f| f.bytes == vec![0xB0, cc::SEGMENT + 10, b'2']));
    assert_eq!(leds(&out.frames, notes::ASSIGN_EQ), vec![0x7F]);
    assert_eq!(leds(&out.frames, notes::ASSIGN_TRACK), vec![0x00]);

    h.press(notes::ASSIGN_EQ);
    let chunk = h.read(|s, ctx| s.paging().active_page(ctx).map(|p| p.chunk));
    assert_eq!(chunk, Some(1));

    h.press(notes::ASSIGN_EQ);
    let chunk = h.read(|s, ctx| s.paging().active_page(ctx).map(|p| p.chunk));
    assert_eq!(chunk, Some(0));

    // Channel navigation stays inside the logical page
    h.press(notes::CHANNEL_RIGHT);
    h.press(notes::CHANNEL_RIGHT);
    let chunk = h.read(|s, ctx| s.paging().active_page(ctx).map(|p| p.chunk));
    assert_eq!(chunk, Some(1));

    // Unsplit pages blank the assignment display
    let out = h.press(notes::ASSIGN_PAN);
    assert!(out.frames.iter().any(|f| f.bytes == vec![0xB0, cc::SEGMENT + 11, 0x20]));
}

#[test]
fn test_flip_swaps_fader_and_encoder() {
    let mut h = Harness::new(AppConfig::default());
    for (id, title) in [("volume/1", "Kick"), ("pan/1", "Pan")] {
        h.title(id, title);
    }
    h.value("volume/1", 0.7, "-3dB");
    h.value("pan/1", 0.25, "L50");
    h.run(|s, ctx| s.initialize(ctx));
    h.press(notes::ASSIGN_PAN);

    let out = h.midi(0, &[0xB0, cc::ENCODER_ROTATE, 0x43]);
    assert_eq!(
        out.commands,
        vec![HostCommand::Adjust {
            parameter: "pan/1".to_string(),
            steps: -3
        }]
    );

    let out = h.press(notes::FLIP);
    assert_eq!(leds(&out.frames, notes::FLIP), vec![0x7F]);
    assert_eq!(pitch_bends(&out.frames, 0), vec![convert::to_14bit(0.25)]);
    assert!(h.read(|s, ctx| s.paging().is_flipped(ctx)));

    let out = h.midi(0, &[0xB0, cc::ENCODER_ROTATE, 0x02]);
    assert_eq!(
        out.commands,
        vec![HostCommand::Adjust {
            parameter: "volume/1".to_string(),
            steps: 2
        }]
    );
    let out = h.midi(0, &[0xE0, 0x7F, 0x7F]);
    assert_eq!(
        out.commands,
        vec![HostCommand::SetValue {
            parameter: "pan/1".to_string(),
            value: 1.0
        }]
    );

    // Flip survives switching banks
    h.press(notes::ASSIGN_TRACK);
    assert!(h.read(|s, ctx| s.paging().is_flipped(ctx)));
}

#[test]
fn test_channel_buttons_toggle_and_follow_host() {
    let mut h = Harness::new(AppConfig::default());
    h.title("mute/1", "Mute");
    h.run(|s, ctx| s.initialize(ctx));

    let out = h.press(notes::MUTE);
    assert_eq!(
        out.commands,
        vec![HostCommand::Toggle {
            parameter: "mute/1".to_string()
        }]
    );

    let out = h.value("mute/1", 1.0, "On");
    assert_eq!(leds(&out.frames, notes::MUTE), vec![0x7F]);
    let out = h.value("mute/1", 1.0, "On");
    assert!(leds(&out.frames, notes::MUTE).is_empty());

    // Unknown parameters are not toggled
    let out = h.press(notes::SOLO);
    assert!(out.commands.is_empty());
}

#[test]
fn test_motor_toggle_reaches_every_unit() {
    let mut h = Harness::new(two_unit_config());
    h.title("volume/1", "Kick");
    h.title("volume/9", "Keys");
    h.value("volume/1", 0.5, "-6dB");
    h.value("volume/9", 0.4, "-9dB");
    h.run(|s, ctx| s.initialize(ctx));

    let out = h.press(notes::GLOBAL_VIEW);
    assert!(!h.read(|s, ctx| s.motors().get(ctx)));
    assert_eq!(leds(&out.frames, notes::GLOBAL_VIEW), vec![0x00]);

    let out = h.value("volume/9", 0.9, "+3dB");
    assert!(pitch_bends(&out.frames, 0).is_empty());

    // Re-enabling forces both units to resend, unchanged positions included
    let out = h.press(notes::GLOBAL_VIEW);
    let main = h.port(0);
    let extender = h.port(1);
    let main_frames: Vec<_> = out.frames.iter().filter(|f| f.port == main).cloned().collect();
    let ext_frames: Vec<_> = out.frames.iter().filter(|f| f.port == extender).cloned().collect();
    assert_eq!(pitch_bends(&main_frames, 0), vec![convert::to_14bit(0.5)]);
    assert_eq!(pitch_bends(&ext_frames, 0), vec![convert::to_14bit(0.9)]);
}

#[test]
fn test_extender_strips_are_global_channels() {
    let mut h = Harness::new(two_unit_config());
    h.run(|s, ctx| s.initialize(ctx));

    let out = h.title("volume/10", "Pad");
    let extender = h.port(1);
    let frame = out
        .frames
        .iter()
        .find(|f| f.port == extender && f.bytes.first() == Some(&0xF0))
        .unwrap();
    // Extender unit id in the SysEx header
    assert_eq!(frame.bytes[4], 0x15);
    assert_eq!(lcd_writes(&out.frames, 0, 1), vec![format_cell("Pad")]);

    let out = h.run(|s, ctx| s.on_meter(ctx, 9, 0.5));
    assert_eq!(out.frames.len(), 1);
    assert_eq!(out.frames[0].port, extender);
    assert_eq!(out.frames[0].bytes, vec![0xD0, (1 << 4) | 6]);
}

#[test]
fn test_name_value_switch_is_delivered() {
    let mut h = Harness::new(AppConfig::default());
    h.title("volume/1", "Kick");
    h.title("trim/1", "Trim");
    h.run(|s, ctx| s.initialize(ctx));

    let out = h.press(notes::NAME_VALUE);
    assert!(h.read(|s, ctx| s.value_mode().get(ctx)));
    assert_eq!(lcd_writes(&out.frames, 0, 0), vec![format_cell("Trim")]);
    assert_eq!(leds(&out.frames, notes::NAME_VALUE), vec![0x7F]);

    let out = h.press(notes::NAME_VALUE);
    assert_eq!(lcd_writes(&out.frames, 0, 0), vec![format_cell("Kick")]);
}

#[test]
fn test_transport_and_time() {
    let mut h = Harness::new(AppConfig::default());
    h.title("transport/record", "Record");
    h.run(|s, ctx| s.initialize(ctx));

    assert_eq!(
        h.press(notes::PLAY).commands,
        vec![HostCommand::Trigger {
            action: "play".to_string()
        }]
    );
    assert_eq!(
        h.press(notes::RECORD).commands,
        vec![HostCommand::Toggle {
            parameter: "transport/record".to_string()
        }]
    );
    assert_eq!(
        h.press(notes::SMPTE_BEATS).commands,
        vec![HostCommand::Trigger {
            action: "time_format".to_string()
        }]
    );
    assert_eq!(
        h.midi(0, &[0xB0, cc::JOG, 0x41]).commands,
        vec![HostCommand::Jog { steps: -1 }]
    );

    let out = h.run(|s, ctx| s.on_time(ctx, "00:01:02:10", "00:00:00:00"));
    assert_eq!(leds(&out.frames, notes::SMPTE_LED), vec![0x7F]);
    assert_eq!(leds(&out.frames, notes::BEATS_LED), vec![0x00]);
    assert!(out.frames.iter().any(|f| f.bytes == vec![0xB0, cc::SEGMENT, b'0']));

    let out = h.run(|s, ctx| s.on_time(ctx, "", ""));
    assert!(out.frames.iter().all(|f| f.bytes[1] < cc::SEGMENT + 10));
    assert!(h.read(|s, ctx| s.segment_display().cell_byte(ctx, 0)) == Some(0x20));
}

#[test]
fn test_unknown_port_is_ignored() {
    let mut h = Harness::new(AppConfig::default());
    let out = h.run(|s, ctx| s.handle_midi(ctx, PortId(usize::MAX), &[0x90, notes::PLAY, 0x7F]));
    assert!(out.is_empty());
}
