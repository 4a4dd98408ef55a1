//! Device composition
//!
//! Turns the configured unit list into devices laid out left to right. Each
//! unit contributes eight channel strips; only the main unit carries the master
//! fader and the segment display.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use super::fader::MotorFader;
use super::lcd::LcdManager;
use super::notes::{cc, MASTER_FADER_CHANNEL};
use super::ports::PortPair;
use super::shadow::{OutputShadow, ShadowKind};
use crate::config::DeviceConfig;
use crate::context::{Context, PortId};
use crate::state::GlobalBooleanVariable;

pub const CHANNELS_PER_DEVICE: usize = 8;

/// Width of one channel strip in surface units
const STRIP_WIDTH: f64 = 2.0;

/// Kind of physical unit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    /// X-Touch: 8 strips, master fader, transport, segment display
    #[default]
    Main,
    /// X-Touch Extender: 8 strips only
    Extender,
}

impl DeviceKind {
    /// Physical width in surface units
    pub fn width(self) -> f64 {
        match self {
            // Strips plus master fader and the control section
            Self::Main => CHANNELS_PER_DEVICE as f64 * STRIP_WIDTH + 18.0,
            Self::Extender => CHANNELS_PER_DEVICE as f64 * STRIP_WIDTH + 2.0,
        }
    }

    /// Unit byte of the Mackie SysEx header
    pub fn sysex_unit(self) -> u8 {
        match self {
            Self::Main => 0x14,
            Self::Extender => 0x15,
        }
    }

    pub fn port_base_name(self) -> &'static str {
        match self {
            Self::Main => "X-Touch",
            Self::Extender => "X-Touch Extender",
        }
    }

    pub fn has_master_fader(self) -> bool {
        self == Self::Main
    }

    pub fn has_segment_display(self) -> bool {
        self == Self::Main
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Main => write!(f, "main"),
            Self::Extender => write!(f, "extender"),
        }
    }
}

/// Area a unit occupies on the logical surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceRegion {
    pub x: f64,
    pub width: f64,
}

/// One channel strip: encoder, fader, two LCD cells, four buttons, meter
#[derive(Debug, Clone)]
pub struct ChannelElement {
    /// Strip index on its unit (0-7)
    pub local: u8,
    /// Strip index across the whole surface
    pub global: usize,
    pub fader: MotorFader,
}

#[derive(Debug, Clone)]
pub struct Device {
    kind: DeviceKind,
    position: usize,
    region: SurfaceRegion,
    ports: PortPair,
    lcd: LcdManager,
    shadow: OutputShadow,
    channels: Vec<ChannelElement>,
    master_fader: Option<MotorFader>,
}

impl Device {
    fn new(kind: DeviceKind, position: usize, x: f64, ports: PortPair, motors: &GlobalBooleanVariable) -> Self {
        let channel_offset = position * CHANNELS_PER_DEVICE;
        let channels = (0..CHANNELS_PER_DEVICE)
            .map(|local| ChannelElement {
                local: local as u8,
                global: channel_offset + local,
                fader: MotorFader::new(ports.clone(), local as u8, motors.clone()),
            })
            .collect();
        let master_fader = kind
            .has_master_fader()
            .then(|| MotorFader::new(ports.clone(), MASTER_FADER_CHANNEL, motors.clone()));

        Self {
            kind,
            position,
            region: SurfaceRegion {
                x,
                width: kind.width(),
            },
            lcd: LcdManager::new(ports.clone()),
            ports,
            shadow: OutputShadow::new(),
            channels,
            master_fader,
        }
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    /// Position in the configured unit list
    pub fn position(&self) -> usize {
        self.position
    }

    /// Global index of this unit's first channel
    pub fn channel_offset(&self) -> usize {
        self.position * CHANNELS_PER_DEVICE
    }

    pub fn region(&self) -> SurfaceRegion {
        self.region
    }

    pub fn ports(&self) -> &PortPair {
        &self.ports
    }

    pub fn port_id(&self) -> PortId {
        self.ports.id()
    }

    pub fn lcd(&self) -> &LcdManager {
        &self.lcd
    }

    pub fn channels(&self) -> &[ChannelElement] {
        &self.channels
    }

    pub fn channel(&self, local: u8) -> Option<&ChannelElement> {
        self.channels.get(local as usize)
    }

    pub fn master_fader(&self) -> Option<&MotorFader> {
        self.master_fader.as_ref()
    }

    /// Every motor fader of the unit, master last
    pub fn faders(&self) -> impl Iterator<Item = &MotorFader> {
        self.channels
            .iter()
            .map(|c| &c.fader)
            .chain(self.master_fader.iter())
    }

    /// Switch a button LED, skipping writes that change nothing
    pub fn set_led(&self, ctx: &mut Context<'_>, note: u8, on: bool) {
        let velocity = if on { 0x7F } else { 0 };
        if self.shadow.update(ctx, ShadowKind::Note, 0, note, velocity) {
            self.ports.send_note_on(ctx, note, velocity);
        }
    }

    /// Write an encoder ring payload, skipping writes that change nothing
    pub fn set_ring(&self, ctx: &mut Context<'_>, local: u8, payload: u8) {
        let cc = cc::ENCODER_RING + (local & 0x07);
        if self.shadow.update(ctx, ShadowKind::Cc, 0, cc, payload) {
            self.ports.send_control_change(ctx, cc, payload);
        }
    }

    /// VU meter level (0.0-1.0) for a strip
    pub fn set_meter(&self, ctx: &mut Context<'_>, local: u8, level: f64) {
        let level = (level.clamp(0.0, 1.0) * 12.0).round() as u8;
        self.ports
            .send_channel_pressure(ctx, ((local & 0x07) << 4) | level);
    }

    /// Resend LEDs and rings on their next update
    pub fn invalidate_outputs(&self, ctx: &mut Context<'_>) {
        self.shadow.invalidate(ctx);
    }
}

/// Build the devices of the surface from the configured unit list
///
/// A single unit is found through `detection_pattern`; with several units
/// the configured port names identify them.
pub fn compose_devices(
    configs: &[DeviceConfig],
    detection_pattern: &str,
    motors: &GlobalBooleanVariable,
) -> Vec<Device> {
    let single = configs.len() == 1;
    let mut x = 0.0;

    configs
        .iter()
        .enumerate()
        .map(|(position, config)| {
            let mut ports = PortPair::new(
                config.kind,
                config.input_port.clone(),
                config.output_port.clone(),
            );
            if single {
                ports = ports.with_detection_pattern(detection_pattern);
            }

            let device = Device::new(config.kind, position, x, ports, motors);
            debug!(
                "Device {} ({}) at x={} channels {}..{}",
                position,
                config.kind,
                x,
                device.channel_offset(),
                device.channel_offset() + CHANNELS_PER_DEVICE
            );
            x += config.kind.width();
            device
        })
        .collect()
}
