//! Surface session
//!
//! Wires the devices, the encoder paging, the displays and the polling timer
//! into one logical surface. The session itself is stateless: everything it
//! remembers between callbacks lives in the context store. Each entry point
//! takes the context of the current host callback and delivers the surface
//! value changes it caused before returning.

mod cache;
mod feedback;
mod input;

#[cfg(test)]
mod tests;

pub use cache::{ParameterCache, ParameterState};

use std::sync::{Arc, Weak};
use tracing::{debug, info};

use crate::config::{AppConfig, ButtonBinding, ChannelParameters};
use crate::context::{Context, PortId};
use crate::error::ConfigError;
use crate::paging::{expand_channel_template, EncoderPaging};
use crate::state::{ContextStateVariable, GlobalBooleanVariable};
use crate::timer::{Clock, PollingTimer};
use crate::xtouch::{
    compose_devices, ChannelElement, Device, DisplayMode, PortPair, SegmentDisplayManager,
    CHANNELS_PER_DEVICE,
};

/// What an encoder drives under the current page and flip state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderTarget {
    pub parameter: String,
    pub display_mode: DisplayMode,
    pub push_toggle: Option<String>,
}

#[derive(Debug)]
pub struct Session {
    handle: Weak<Session>,
    devices: Vec<Device>,
    segment_display: SegmentDisplayManager,
    paging: EncoderPaging,
    timer: PollingTimer,
    motors: GlobalBooleanVariable,
    value_mode: GlobalBooleanVariable,
    cache: ParameterCache,
    /// Per global channel: the top LCD row shows the fader value
    display_override: Vec<ContextStateVariable<bool>>,
    channel_parameters: ChannelParameters,
    master_parameter: Option<String>,
    buttons: Vec<ButtonBinding>,
    motor_toggle_note: Option<u8>,
    display_revert_seconds: f64,
}

impl Session {
    pub fn new(config: &AppConfig, clock: Arc<dyn Clock>) -> Result<Arc<Self>, ConfigError> {
        config.validate()?;

        let motors = GlobalBooleanVariable::new("motors", true);
        let value_mode = GlobalBooleanVariable::new("value-mode", false);
        let devices = compose_devices(&config.devices, &config.detection_pattern, &motors);
        let segment_display = SegmentDisplayManager::new(devices.iter().map(|d| d.ports().clone()));
        let channel_count = devices.len() * CHANNELS_PER_DEVICE;
        let paging = EncoderPaging::new(&config.encoder_banks, channel_count);
        let timer = PollingTimer::new(clock);
        let display_override = (0..channel_count)
            .map(|_| ContextStateVariable::named("lcd-override", false))
            .collect();

        info!(
            "Surface: {} device(s), {} channels, {} encoder pages",
            devices.len(),
            channel_count,
            paging.pages().len()
        );

        Ok(Arc::new_cyclic(|handle: &Weak<Session>| {
            let session = handle.clone();
            paging.on_page_activated().add_callback(move |ctx, active| {
                if let Some(session) = session.upgrade() {
                    session.on_page_activated(ctx, active);
                }
            });

            for position in 0..devices.len() {
                let session = handle.clone();
                motors.add_on_change(move |ctx, enabled| {
                    if let Some(session) = session.upgrade() {
                        session.on_motors_changed(ctx, position, enabled);
                    }
                });
            }

            let session = handle.clone();
            value_mode.add_on_change(move |ctx, on| {
                if let Some(session) = session.upgrade() {
                    session.on_value_mode_changed(ctx, on);
                }
            });

            Session {
                handle: handle.clone(),
                devices,
                segment_display,
                paging,
                timer,
                motors,
                value_mode,
                cache: ParameterCache,
                display_override,
                channel_parameters: config.channel_parameters.clone(),
                master_parameter: config.master_parameter.clone(),
                buttons: config.buttons.clone(),
                motor_toggle_note: config.motor_toggle_note,
                display_revert_seconds: config.display_revert_seconds,
            }
        }))
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    /// Port pairs of every unit, left to right
    pub fn ports(&self) -> Vec<PortPair> {
        self.devices.iter().map(|d| d.ports().clone()).collect()
    }

    pub fn channel_count(&self) -> usize {
        self.devices.len() * CHANNELS_PER_DEVICE
    }

    pub fn paging(&self) -> &EncoderPaging {
        &self.paging
    }

    pub fn segment_display(&self) -> &SegmentDisplayManager {
        &self.segment_display
    }

    pub fn timer(&self) -> &PollingTimer {
        &self.timer
    }

    pub fn motors(&self) -> &GlobalBooleanVariable {
        &self.motors
    }

    pub fn value_mode(&self) -> &GlobalBooleanVariable {
        &self.value_mode
    }

    pub fn cache(&self) -> &ParameterCache {
        &self.cache
    }

    /// Bring the hardware in line with the session state
    ///
    /// Activates the first encoder bank unless a page is already active.
    pub fn initialize(&self, ctx: &mut Context<'_>) {
        info!("Initializing surface");
        for device in &self.devices {
            device.invalidate_outputs(ctx);
            device.lcd().clear(ctx);
            for fader in device.faders() {
                fader.force_update(ctx);
            }
        }
        self.segment_display.clear_time(ctx);

        // Activation renders the strips
        if self.paging.active(ctx).is_some() || !self.paging.press_assign(ctx, 0) {
            self.render_strips(ctx);
        }
        self.render_controls(ctx);
        ctx.run_deferred();
    }

    /// Host scheduler tick
    pub fn tick(&self, ctx: &mut Context<'_>) {
        self.timer.tick(ctx);
        ctx.run_deferred();
    }

    fn device_for_port(&self, port: PortId) -> Option<&Device> {
        self.devices.iter().find(|d| d.port_id() == port)
    }

    /// Device and strip of a global channel
    fn strip(&self, global: usize) -> Option<(&Device, &ChannelElement)> {
        let device = self.devices.get(global / CHANNELS_PER_DEVICE)?;
        let channel = device.channel((global % CHANNELS_PER_DEVICE) as u8)?;
        Some((device, channel))
    }

    fn channel_parameter(template: &str, global: usize) -> Option<String> {
        (!template.is_empty()).then(|| expand_channel_template(template, global))
    }

    /// Volume parameter of a channel; also names the channel
    pub fn volume_parameter(&self, global: usize) -> Option<String> {
        Self::channel_parameter(&self.channel_parameters.volume, global)
    }

    /// Parameter a channel's fader drives; flipped pages hand it the encoder
    /// assignment
    pub fn fader_target(&self, ctx: &Context<'_>, global: usize) -> Option<String> {
        if self.paging.is_flipped(ctx) {
            self.paging
                .active_page(ctx)?
                .assignment(global)
                .map(|a| a.parameter.clone())
        } else {
            self.volume_parameter(global)
        }
    }

    /// Parameter a channel's encoder drives; flipped pages give it the volume
    pub fn encoder_target(&self, ctx: &Context<'_>, global: usize) -> Option<EncoderTarget> {
        if self.paging.is_flipped(ctx) {
            return self.volume_parameter(global).map(|parameter| EncoderTarget {
                parameter,
                display_mode: DisplayMode::Wrap,
                push_toggle: None,
            });
        }

        let assignment = self.paging.active_page(ctx)?.assignment(global)?;
        Some(EncoderTarget {
            parameter: assignment.parameter.clone(),
            display_mode: assignment.display_mode,
            push_toggle: assignment.push_toggle.clone(),
        })
    }

    /// Show the fader value on the top row of `global` until the revert
    /// timeout fires
    fn schedule_display_revert(&self, ctx: &mut Context<'_>, global: usize) {
        let session = self.handle.clone();
        let id = format!("lcd-revert-{}", global);
        debug!("Scheduling display revert for channel {}", global + 1);
        self.timer.set_timeout(
            ctx,
            &id,
            move |ctx| {
                if let Some(session) = session.upgrade() {
                    session.revert_display(ctx, global);
                }
            },
            self.display_revert_seconds,
        );
    }

    fn revert_display(&self, ctx: &mut Context<'_>, global: usize) {
        let Some((device, channel)) = self.strip(global) else {
            return;
        };
        // Touched again since release: the next release reschedules
        if channel.fader.is_touched(ctx) {
            return;
        }
        if let Some(state) = self.display_override.get(global) {
            state.set(ctx, &false);
        }
        self.render_lcd(ctx, device, channel);
    }
}
