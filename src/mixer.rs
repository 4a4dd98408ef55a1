//! Loopback mixer
//!
//! In-memory host that owns every parameter the configuration names, so the
//! surface can be driven without a DAW. Commands from the surface change the
//! mixer; every change comes back as a notification, exactly as a real host
//! would answer.

use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::context::{Context, HostCommand};
use crate::paging::expand_channel_template;
use crate::session::Session;
use crate::xtouch::notes::ChannelButton;
use crate::xtouch::DisplayMode;

/// Value change per encoder tick
const ADJUST_STEP: f64 = 0.01;
/// Transport movement per jog tick
const JOG_MS: u64 = 100;
/// Transport movement of rewind / forward
const WIND_MS: u64 = 5_000;
const SMPTE_FPS: u64 = 30;
/// 120 BPM in 4/4
const BEAT_MS: u64 = 500;

/// Notification from the mixer to the surface
#[derive(Debug, Clone, PartialEq)]
pub enum MixerEvent {
    Value {
        parameter: String,
        value: f64,
        display: String,
    },
    Title {
        parameter: String,
        title: String,
    },
    Time {
        time: String,
        format: String,
    },
    Meter {
        channel: usize,
        level: f64,
    },
}

impl MixerEvent {
    /// Hand the notification to the session
    pub fn deliver(&self, session: &Session, ctx: &mut Context<'_>) {
        match self {
            Self::Value {
                parameter,
                value,
                display,
            } => session.on_parameter_value(ctx, parameter, *value, display),
            Self::Title { parameter, title } => session.on_parameter_title(ctx, parameter, title),
            Self::Time { time, format } => session.on_time(ctx, time, format),
            Self::Meter { channel, level } => session.on_meter(ctx, *channel, *level),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimeFormat {
    #[default]
    Smpte,
    Beats,
}

impl TimeFormat {
    fn pattern(self) -> &'static str {
        match self {
            Self::Smpte => "00:00:00:00",
            Self::Beats => "1.1.1.000",
        }
    }

    fn render(self, position_ms: u64) -> String {
        match self {
            Self::Smpte => {
                let seconds = position_ms / 1000;
                let frames = (position_ms % 1000) * SMPTE_FPS / 1000;
                format!(
                    "{:02}:{:02}:{:02}:{:02}",
                    seconds / 3600,
                    seconds / 60 % 60,
                    seconds % 60,
                    frames
                )
            }
            Self::Beats => {
                let beats = position_ms / BEAT_MS;
                let in_beat = position_ms % BEAT_MS;
                let sixteenth = in_beat * 4 / BEAT_MS;
                let ticks = (in_beat % (BEAT_MS / 4)) * 240 / (BEAT_MS / 4);
                format!("{}.{}.{}.{:03}", beats / 4 + 1, beats % 4 + 1, sixteenth + 1, ticks)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParameterKind {
    Continuous,
    Toggle,
}

#[derive(Debug, Clone)]
struct Parameter {
    kind: ParameterKind,
    value: f64,
    title: String,
}

impl Parameter {
    fn display(&self) -> String {
        match self.kind {
            ParameterKind::Toggle if self.value >= 0.5 => "On".to_string(),
            ParameterKind::Toggle => "Off".to_string(),
            ParameterKind::Continuous => format!("{:.0}%", self.value * 100.0),
        }
    }
}

/// Human-readable name of a parameter id such as `eq/1/gain`
///
/// A trailing channel number is dropped, inner numbers stick to the word
/// before them.
pub fn title_for(id: &str) -> String {
    let mut segments: Vec<&str> = id.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() > 1 && segments.last().is_some_and(|s| s.chars().all(|c| c.is_ascii_digit())) {
        segments.pop();
    }

    let mut words: Vec<String> = Vec::new();
    for segment in segments {
        if segment.chars().all(|c| c.is_ascii_digit()) {
            if let Some(last) = words.last_mut() {
                last.push_str(segment);
                continue;
            }
        }
        words.extend(segment.split('_').filter(|w| !w.is_empty()).map(capitalize));
    }
    words.join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone)]
pub struct LoopbackMixer {
    parameters: BTreeMap<String, Parameter>,
    volume_parameters: Vec<String>,
    playing: bool,
    position_ms: u64,
    time_format: TimeFormat,
}

impl LoopbackMixer {
    /// A mixer with every parameter the configuration can reach
    pub fn new(config: &AppConfig) -> Self {
        let mut mixer = Self {
            parameters: BTreeMap::new(),
            volume_parameters: Vec::new(),
            playing: false,
            position_ms: 0,
            time_format: TimeFormat::default(),
        };

        let channels = &config.channel_parameters;
        let channel_count = config.channel_count();
        for channel in 0..channel_count {
            if !channels.volume.is_empty() {
                let id = expand_channel_template(&channels.volume, channel);
                mixer.insert(&id, ParameterKind::Continuous, 0.75, Some(format!("Ch {}", channel + 1)));
                mixer.volume_parameters.push(id);
            }
            for button in ChannelButton::ALL {
                let template = channels.button(button);
                if !template.is_empty() {
                    let id = expand_channel_template(template, channel);
                    mixer.insert(&id, ParameterKind::Toggle, 0.0, None);
                }
            }
        }

        if let Some(master) = &config.master_parameter {
            mixer.insert(master, ParameterKind::Continuous, 0.75, Some("Master".to_string()));
        }

        for bank in &config.encoder_banks {
            for page in &bank.pages {
                for assignment in page.assignments_for(channel_count) {
                    let initial = match assignment.display_mode {
                        DisplayMode::BoostOrCut | DisplayMode::Spread => 0.5,
                        DisplayMode::SingleDot | DisplayMode::Wrap => 0.0,
                    };
                    mixer.insert(&assignment.parameter, ParameterKind::Continuous, initial, None);
                    if let Some(push) = &assignment.push_toggle {
                        mixer.insert(push, ParameterKind::Toggle, 0.0, None);
                    }
                }
            }
        }

        for button in &config.buttons {
            if let Some(parameter) = &button.parameter {
                mixer.insert(parameter, ParameterKind::Toggle, 0.0, None);
            }
        }

        debug!("Loopback mixer with {} parameters", mixer.parameters.len());
        mixer
    }

    fn insert(&mut self, id: &str, kind: ParameterKind, value: f64, title: Option<String>) {
        self.parameters.entry(id.to_string()).or_insert_with(|| Parameter {
            kind,
            value,
            title: title.unwrap_or_else(|| title_for(id)),
        });
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn value(&self, id: &str) -> Option<f64> {
        self.parameters.get(id).map(|p| p.value)
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn position_ms(&self) -> u64 {
        self.position_ms
    }

    /// Titles and values of every parameter plus the transport time
    pub fn snapshot(&self) -> Vec<MixerEvent> {
        let mut events = Vec::with_capacity(self.parameters.len() * 2 + 1);
        for (id, parameter) in &self.parameters {
            events.push(MixerEvent::Title {
                parameter: id.clone(),
                title: parameter.title.clone(),
            });
            events.push(self.value_event(id, parameter));
        }
        events.push(self.time_event());
        events
    }

    fn value_event(&self, id: &str, parameter: &Parameter) -> MixerEvent {
        MixerEvent::Value {
            parameter: id.to_string(),
            value: parameter.value,
            display: parameter.display(),
        }
    }

    fn time_event(&self) -> MixerEvent {
        MixerEvent::Time {
            time: self.time_format.render(self.position_ms),
            format: self.time_format.pattern().to_string(),
        }
    }

    /// Apply a surface command; returns the resulting notifications
    pub fn apply(&mut self, command: &HostCommand) -> Vec<MixerEvent> {
        match command {
            HostCommand::SetValue { parameter, value } => self.change(parameter, |p| p.value = *value),
            HostCommand::Adjust { parameter, steps } => {
                self.change(parameter, |p| p.value += *steps as f64 * ADJUST_STEP)
            }
            HostCommand::Toggle { parameter } => self.change(parameter, |p| {
                p.value = if p.value >= 0.5 { 0.0 } else { 1.0 };
            }),
            HostCommand::Jog { steps } => {
                self.move_transport(*steps as i64 * JOG_MS as i64);
                vec![self.time_event()]
            }
            HostCommand::Trigger { action } => self.trigger(action),
        }
    }

    fn change<F>(&mut self, id: &str, f: F) -> Vec<MixerEvent>
    where
        F: FnOnce(&mut Parameter),
    {
        let Some(parameter) = self.parameters.get_mut(id) else {
            warn!("Unknown parameter '{}'", id);
            return Vec::new();
        };
        f(parameter);
        parameter.value = parameter.value.clamp(0.0, 1.0);

        let parameter = parameter.clone();
        vec![self.value_event(id, &parameter)]
    }

    fn move_transport(&mut self, delta_ms: i64) {
        self.position_ms = if delta_ms < 0 {
            self.position_ms.saturating_sub(delta_ms.unsigned_abs())
        } else {
            self.position_ms.saturating_add(delta_ms as u64)
        };
    }

    fn trigger(&mut self, action: &str) -> Vec<MixerEvent> {
        match action {
            "play" => self.playing = true,
            "stop" => {
                // Stop while stopped returns to zero
                if !self.playing {
                    self.position_ms = 0;
                }
                self.playing = false;
            }
            "rewind" => self.move_transport(-(WIND_MS as i64)),
            "forward" => self.move_transport(WIND_MS as i64),
            "time_format" => {
                self.time_format = match self.time_format {
                    TimeFormat::Smpte => TimeFormat::Beats,
                    TimeFormat::Beats => TimeFormat::Smpte,
                };
            }
            other => {
                warn!("Unknown action '{}'", other);
                return Vec::new();
            }
        }
        debug!("Transport action '{}'", action);
        vec![self.time_event()]
    }

    /// Advance the transport; while playing this yields the time and meters
    pub fn advance(&mut self, elapsed_ms: u64) -> Vec<MixerEvent> {
        if !self.playing {
            return Vec::new();
        }
        self.position_ms = self.position_ms.saturating_add(elapsed_ms);

        let phase = self.position_ms / 100;
        let mut events = vec![self.time_event()];
        for (channel, id) in self.volume_parameters.iter().enumerate() {
            let volume = self.parameters.get(id).map_or(0.0, |p| p.value);
            let swing = ((phase + channel as u64 * 3) % 10) as f64 / 10.0;
            events.push(MixerEvent::Meter {
                channel,
                level: volume * swing,
            });
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_titles_from_ids() {
        assert_eq!(title_for("pan/3"), "Pan");
        assert_eq!(title_for("eq/1/gain"), "Eq1 Gain");
        assert_eq!(title_for("send_a/2/enable"), "Send A2 Enable");
        assert_eq!(title_for("comp/threshold"), "Comp Threshold");
    }

    #[test]
    fn test_default_config_parameters() {
        let mixer = LoopbackMixer::new(&AppConfig::default());
        assert_eq!(mixer.value("volume/1"), Some(0.75));
        assert_eq!(mixer.value("pan/8"), Some(0.5));
        assert_eq!(mixer.value("mute/8"), Some(0.0));
        assert_eq!(mixer.value("eq/4/q"), Some(0.5));
        assert_eq!(mixer.value("volume/9"), None);

        let snapshot = mixer.snapshot();
        assert!(snapshot.contains(&MixerEvent::Title {
            parameter: "volume/2".to_string(),
            title: "Ch 2".to_string()
        }));
        assert_eq!(
            snapshot.last(),
            Some(&MixerEvent::Time {
                time: "00:00:00:00".to_string(),
                format: "00:00:00:00".to_string()
            })
        );
    }

    #[test]
    fn test_commands_change_values() {
        let mut mixer = LoopbackMixer::new(&AppConfig::default());

        let events = mixer.apply(&HostCommand::Toggle {
            parameter: "mute/1".to_string(),
        });
        assert_eq!(
            events,
            vec![MixerEvent::Value {
                parameter: "mute/1".to_string(),
                value: 1.0,
                display: "On".to_string()
            }]
        );

        mixer.apply(&HostCommand::Adjust {
            parameter: "volume/1".to_string(),
            steps: 40,
        });
        assert_eq!(mixer.value("volume/1"), Some(1.0));

        let events = mixer.apply(&HostCommand::SetValue {
            parameter: "volume/1".to_string(),
            value: 0.5,
        });
        assert!(matches!(&events[0], MixerEvent::Value { display, .. } if display == "50%"));

        assert!(mixer
            .apply(&HostCommand::Toggle {
                parameter: "nope".to_string()
            })
            .is_empty());
    }

    #[test]
    fn test_transport() {
        let mut mixer = LoopbackMixer::new(&AppConfig::default());
        assert!(mixer.advance(1000).is_empty());

        mixer.apply(&HostCommand::Trigger {
            action: "play".to_string(),
        });
        let events = mixer.advance(61_500);
        assert_eq!(
            events[0],
            MixerEvent::Time {
                time: "00:01:01:15".to_string(),
                format: "00:00:00:00".to_string()
            }
        );
        assert_eq!(events.len(), 1 + 8);

        let events = mixer.apply(&HostCommand::Trigger {
            action: "time_format".to_string(),
        });
        // 61.5 s at 120 BPM = 123 beats
        assert_eq!(
            events,
            vec![MixerEvent::Time {
                time: "31.4.1.000".to_string(),
                format: "1.1.1.000".to_string()
            }]
        );

        mixer.apply(&HostCommand::Jog { steps: -5 });
        assert_eq!(mixer.position_ms(), 61_000);

        mixer.apply(&HostCommand::Trigger {
            action: "stop".to_string(),
        });
        mixer.apply(&HostCommand::Trigger {
            action: "stop".to_string(),
        });
        assert!(!mixer.is_playing());
        assert_eq!(mixer.position_ms(), 0);
    }
}
