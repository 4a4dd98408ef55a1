//! Configuration management
//!
//! Loads the YAML surface description. Every section has a default, so an
//! empty file describes a single X-Touch with the usual Mackie assignments.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::fs;

use crate::error::ConfigError;

/// Longest time a touched fader's value may stay on the scribble strip
pub const MAX_REVERT_SECONDS: f64 = 60.0;
use crate::paging::{ChannelTemplate, EncoderAssignment};
use crate::xtouch::notes::{self, ChannelButton};
use crate::xtouch::{DeviceKind, DisplayMode};

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Units from left to right
    pub devices: Vec<DeviceConfig>,
    /// Port name pattern used when a single unit is configured
    pub detection_pattern: String,
    pub channel_parameters: ChannelParameters,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub master_parameter: Option<String>,
    pub encoder_banks: Vec<EncoderBankConfig>,
    pub buttons: Vec<ButtonBinding>,
    /// Button toggling the fader motors on and off
    #[serde(skip_serializing_if = "Option::is_none")]
    pub motor_toggle_note: Option<u8>,
    /// How long a released fader keeps showing its value on the scribble strip
    pub display_revert_seconds: f64,
    /// Host scheduler period
    pub tick_ms: u64,
}

/// One physical unit
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct DeviceConfig {
    #[serde(default)]
    pub kind: DeviceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_port: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_port: Option<String>,
}

/// Per-channel parameter templates; `{channel}` is the 1-based channel and
/// an empty template leaves the control unbound
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ChannelParameters {
    pub volume: String,
    pub rec: String,
    pub solo: String,
    pub mute: String,
    pub select: String,
}

impl ChannelParameters {
    pub fn button(&self, button: ChannelButton) -> &str {
        match button {
            ChannelButton::Rec => &self.rec,
            ChannelButton::Solo => &self.solo,
            ChannelButton::Mute => &self.mute,
            ChannelButton::Select => &self.select,
        }
    }
}

impl Default for ChannelParameters {
    fn default() -> Self {
        Self {
            volume: "volume/{channel}".to_string(),
            rec: "rec/{channel}".to_string(),
            solo: "solo/{channel}".to_string(),
            mute: "mute/{channel}".to_string(),
            select: "select/{channel}".to_string(),
        }
    }
}

/// Encoder assignments reachable from one assign button
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EncoderBankConfig {
    pub name: String,
    pub button: u8,
    pub pages: Vec<EncoderPageConfig>,
}

/// One logical encoder page, either per channel or an explicit list
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EncoderPageConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_channel: Option<ChannelTemplate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assignments: Vec<EncoderAssignment>,
}

impl EncoderPageConfig {
    /// Assignment list for a surface with `channel_count` channels
    pub fn assignments_for(&self, channel_count: usize) -> Vec<EncoderAssignment> {
        match &self.per_channel {
            Some(template) => (0..channel_count).map(|c| template.expand(c)).collect(),
            None => self.assignments.clone(),
        }
    }
}

/// Extra button: toggles a parameter (LED follows it) and/or fires an action
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ButtonBinding {
    pub note: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            devices: vec![DeviceConfig::default()],
            detection_pattern: default_detection_pattern(),
            channel_parameters: ChannelParameters::default(),
            master_parameter: Some("master/volume".to_string()),
            encoder_banks: default_encoder_banks(),
            buttons: default_buttons(),
            motor_toggle_note: Some(notes::GLOBAL_VIEW),
            display_revert_seconds: 1.5,
            tick_ms: 100,
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub async fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path))?;

        Self::from_yaml_str(&contents)
            .with_context(|| format!("Failed to parse YAML config: {}", path))
    }

    /// Parse configuration from YAML text; empty text yields the defaults
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        let config = serde_yaml::from_str(contents)?;
        Ok(config)
    }

    /// Total number of channel strips on the surface
    pub fn channel_count(&self) -> usize {
        self.devices.len() * crate::xtouch::CHANNELS_PER_DEVICE
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.devices.is_empty() {
            return Err(ConfigError::NoDevices);
        }
        if self.devices.len() > 1 {
            if let Some(index) = self
                .devices
                .iter()
                .position(|d| d.input_port.is_none() || d.output_port.is_none())
            {
                return Err(ConfigError::MissingPortNames { index });
            }
        } else if self.detection_pattern.trim().is_empty() {
            return Err(ConfigError::EmptyDetectionPattern);
        }

        if self.encoder_banks.is_empty() {
            return Err(ConfigError::NoEncoderBanks);
        }

        let mut bound: HashMap<u8, String> = HashMap::new();
        let mut bind = |note: u8, what: String| -> Result<(), ConfigError> {
            if is_reserved_note(note) {
                return Err(ConfigError::InvalidNote { what, note });
            }
            if let Some(first) = bound.insert(note, what.clone()) {
                return Err(ConfigError::DuplicateNote {
                    note,
                    first,
                    second: what,
                });
            }
            Ok(())
        };

        for bank in &self.encoder_banks {
            if bank.pages.is_empty() {
                return Err(ConfigError::EmptyBank {
                    bank: bank.name.clone(),
                });
            }
            for page in &bank.pages {
                if page.per_channel.is_some() == !page.assignments.is_empty() {
                    return Err(ConfigError::InvalidPage {
                        bank: bank.name.clone(),
                        page: page.name.clone(),
                    });
                }
            }
            bind(bank.button, format!("bank '{}'", bank.name))?;
        }

        for button in &self.buttons {
            if button.parameter.is_none() && button.action.is_none() {
                return Err(ConfigError::EmptyButton { note: button.note });
            }
            bind(button.note, "button".to_string())?;
        }

        if let Some(note) = self.motor_toggle_note {
            bind(note, "motor toggle".to_string())?;
        }

        if self.tick_ms == 0 {
            return Err(ConfigError::InvalidTick);
        }
        if !(0.0..=MAX_REVERT_SECONDS).contains(&self.display_revert_seconds) {
            return Err(ConfigError::InvalidRevertDelay);
        }

        Ok(())
    }
}

/// Notes with a fixed meaning on the surface
fn is_reserved_note(note: u8) -> bool {
    note > 0x7F
        || note < notes::ASSIGN_TRACK
        || (notes::FADER_TOUCH..=notes::BEATS_LED).contains(&note)
        || matches!(
            note,
            notes::CHANNEL_LEFT | notes::CHANNEL_RIGHT | notes::FLIP | notes::NAME_VALUE | notes::SMPTE_BEATS
        )
}

// Default value functions
fn default_detection_pattern() -> String {
    "X-Touch".to_string()
}

fn per_channel(name: &str, mode: DisplayMode, parameter: &str, push_toggle: Option<&str>) -> EncoderPageConfig {
    EncoderPageConfig {
        name: name.to_string(),
        per_channel: Some(ChannelTemplate {
            display_mode: mode,
            parameter: parameter.to_string(),
            push_toggle: push_toggle.map(str::to_string),
        }),
        assignments: Vec::new(),
    }
}

fn assignment(mode: DisplayMode, parameter: &str, push_toggle: Option<&str>) -> EncoderAssignment {
    EncoderAssignment {
        display_mode: mode,
        parameter: parameter.to_string(),
        push_toggle: push_toggle.map(str::to_string),
    }
}

fn bank(name: &str, button: u8, pages: Vec<EncoderPageConfig>) -> EncoderBankConfig {
    EncoderBankConfig {
        name: name.to_string(),
        button,
        pages,
    }
}

fn default_encoder_banks() -> Vec<EncoderBankConfig> {
    use DisplayMode::*;

    let eq = (1..=4)
        .flat_map(|band| {
            [
                assignment(BoostOrCut, &format!("eq/{}/gain", band), Some(&format!("eq/{}/enable", band))),
                assignment(SingleDot, &format!("eq/{}/freq", band), None),
                assignment(Spread, &format!("eq/{}/q", band), None),
            ]
        })
        .chain([
            assignment(Wrap, "eq/low_cut", Some("eq/low_cut/enable")),
            assignment(Wrap, "eq/high_cut", Some("eq/high_cut/enable")),
        ])
        .collect();

    let dynamics = vec![
        assignment(Wrap, "comp/threshold", Some("comp/enable")),
        assignment(Wrap, "comp/ratio", None),
        assignment(Wrap, "comp/attack", None),
        assignment(Wrap, "comp/release", None),
        assignment(Wrap, "comp/makeup", None),
        assignment(Spread, "comp/knee", None),
        assignment(Wrap, "comp/mix", None),
        assignment(Wrap, "gate/threshold", Some("gate/enable")),
        assignment(Wrap, "gate/range", None),
        assignment(Wrap, "gate/attack", None),
        assignment(Wrap, "gate/hold", None),
        assignment(Wrap, "gate/release", None),
    ];

    let monitor = vec![
        assignment(Wrap, "monitor/level", Some("monitor/dim")),
        assignment(BoostOrCut, "monitor/balance", Some("monitor/mono")),
        assignment(Wrap, "monitor/phones", None),
        assignment(Wrap, "click/level", Some("click/enable")),
    ];

    vec![
        bank(
            "Track",
            notes::ASSIGN_TRACK,
            vec![per_channel("Input", BoostOrCut, "trim/{channel}", Some("phase/{channel}"))],
        ),
        bank(
            "Send",
            notes::ASSIGN_SEND,
            vec![
                per_channel("Send A", Wrap, "send_a/{channel}", Some("send_a/{channel}/enable")),
                per_channel("Send B", Wrap, "send_b/{channel}", Some("send_b/{channel}/enable")),
            ],
        ),
        bank(
            "Pan",
            notes::ASSIGN_PAN,
            vec![per_channel("Pan", BoostOrCut, "pan/{channel}", None)],
        ),
        bank(
            "Plugin",
            notes::ASSIGN_PLUGIN,
            vec![EncoderPageConfig {
                name: "Dynamics".to_string(),
                per_channel: None,
                assignments: dynamics,
            }],
        ),
        bank(
            "EQ",
            notes::ASSIGN_EQ,
            vec![EncoderPageConfig {
                name: "EQ".to_string(),
                per_channel: None,
                assignments: eq,
            }],
        ),
        bank(
            "Instrument",
            notes::ASSIGN_INSTRUMENT,
            vec![EncoderPageConfig {
                name: "Monitor".to_string(),
                per_channel: None,
                assignments: monitor,
            }],
        ),
    ]
}

fn default_buttons() -> Vec<ButtonBinding> {
    let action = |note: u8, action: &str| ButtonBinding {
        note,
        parameter: None,
        action: Some(action.to_string()),
    };

    vec![
        action(notes::REWIND, "rewind"),
        action(notes::FORWARD, "forward"),
        action(notes::STOP, "stop"),
        action(notes::PLAY, "play"),
        ButtonBinding {
            note: notes::RECORD,
            parameter: Some("transport/record".to_string()),
            action: None,
        },
    ]
}
