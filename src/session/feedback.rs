//! Host to surface feedback
//!
//! Parameter notifications update the cache and re-render every element
//! currently bound to the parameter. Renders go through the diffing layers
//! (fader feedback, LED shadow, LCD cells, segment cells), so rendering an
//! unchanged element writes nothing.

use tracing::{debug, trace};

use super::{EncoderTarget, ParameterState, Session};
use crate::context::Context;
use crate::paging::ActivePage;
use crate::xtouch::notes::{self, ChannelButton};
use crate::xtouch::{ring_payload, ChannelElement, Device, MotorFader, RING_OFF};

/// LCD rows
const NAME_ROW: usize = 0;
const VALUE_ROW: usize = 1;

impl Session {
    /// Host reports a new value for `id`
    pub fn on_parameter_value(&self, ctx: &mut Context<'_>, id: &str, value: f64, display_text: &str) {
        trace!("Parameter '{}' = {} ({})", id, value, display_text);
        self.cache.update(ctx, id, |state| {
            state.value = value.clamp(0.0, 1.0);
            state.display = display_text.to_string();
        });
        self.render_parameter(ctx, id);
        ctx.run_deferred();
    }

    /// Host reports the name of `id`; an empty title unassigns it
    pub fn on_parameter_title(&self, ctx: &mut Context<'_>, id: &str, title: &str) {
        debug!("Parameter '{}' titled '{}'", id, title);
        self.cache.update(ctx, id, |state| state.title = title.to_string());
        self.render_parameter(ctx, id);
        ctx.run_deferred();
    }

    /// Transport time; an empty time blanks the time cells
    pub fn on_time(&self, ctx: &mut Context<'_>, time: &str, format: &str) {
        if time.is_empty() {
            self.segment_display.clear_time(ctx);
        } else {
            self.segment_display.update_time(ctx, time, format);
        }
        ctx.run_deferred();
    }

    /// Meter level (0.0-1.0) of a global channel
    pub fn on_meter(&self, ctx: &mut Context<'_>, global: usize, level: f64) {
        if let Some((device, channel)) = self.strip(global) {
            device.set_meter(ctx, channel.local, level);
        }
        ctx.run_deferred();
    }

    /// Cached state of `id` if it is assigned
    pub(super) fn assigned(&self, ctx: &Context<'_>, id: Option<&str>) -> Option<ParameterState> {
        id.map(|id| self.cache.get(ctx, id))
            .filter(ParameterState::is_assigned)
    }

    fn render_parameter(&self, ctx: &mut Context<'_>, id: &str) {
        for device in &self.devices {
            for channel in device.channels() {
                let global = channel.global;
                let fader_target = self.fader_target(ctx, global);
                let encoder_target = self.encoder_target(ctx, global);
                let fader_hit = fader_target.as_deref() == Some(id);
                let encoder_hit = encoder_target
                    .as_ref()
                    .is_some_and(|t| t.parameter == id || t.push_toggle.as_deref() == Some(id));

                if fader_hit {
                    self.render_fader(ctx, &channel.fader, fader_target.as_deref());
                }
                if encoder_hit {
                    self.render_ring(ctx, device, channel.local, encoder_target.as_ref());
                }
                if fader_hit || encoder_hit || self.volume_parameter(global).as_deref() == Some(id) {
                    self.render_lcd(ctx, device, channel);
                }

                for button in ChannelButton::ALL {
                    let parameter = Self::channel_parameter(self.channel_parameters.button(button), global);
                    if parameter.as_deref() == Some(id) {
                        self.render_led(ctx, device, button.note(channel.local), Some(id));
                    }
                }
            }

            if let Some(master) = device.master_fader() {
                if self.master_parameter.as_deref() == Some(id) {
                    self.render_fader(ctx, master, Some(id));
                }
            }

            if device.kind().has_master_fader() {
                for binding in &self.buttons {
                    if binding.parameter.as_deref() == Some(id) {
                        self.render_led(ctx, device, binding.note, Some(id));
                    }
                }
            }
        }
    }

    pub(super) fn render_fader(&self, ctx: &mut Context<'_>, fader: &MotorFader, target: Option<&str>) {
        match self.assigned(ctx, target) {
            Some(state) => {
                fader.set_value(ctx, state.value);
            }
            None => fader.unassign(ctx),
        }
    }

    fn render_ring(&self, ctx: &mut Context<'_>, device: &Device, local: u8, target: Option<&EncoderTarget>) {
        let payload = target
            .and_then(|t| {
                let state = self.assigned(ctx, Some(&t.parameter))?;
                let center = self
                    .assigned(ctx, t.push_toggle.as_deref())
                    .is_some_and(|push| push.is_on());
                Some(ring_payload(t.display_mode, state.value, center))
            })
            .unwrap_or(RING_OFF);
        device.set_ring(ctx, local, payload);
    }

    /// Top row: fader value while overridden, else the encoder parameter name
    /// in value mode, else the channel name. Bottom row: encoder value.
    pub(super) fn render_lcd(&self, ctx: &mut Context<'_>, device: &Device, channel: &ChannelElement) {
        let global = channel.global;
        let overridden = self
            .display_override
            .get(global)
            .is_some_and(|state| state.get(ctx));
        let encoder = self
            .encoder_target(ctx, global)
            .and_then(|t| self.assigned(ctx, Some(&t.parameter)));

        let top = if overridden {
            let target = self.fader_target(ctx, global);
            self.assigned(ctx, target.as_deref()).map(|s| s.display)
        } else if self.value_mode.get(ctx) {
            encoder.as_ref().map(|s| s.title.clone())
        } else {
            let volume = self.volume_parameter(global);
            self.assigned(ctx, volume.as_deref()).map(|s| s.title)
        };
        let bottom = encoder.map(|s| s.display);

        let local = channel.local as usize;
        let lcd = device.lcd();
        lcd.set_channel_text(ctx, NAME_ROW, local, top.as_deref().unwrap_or(""));
        lcd.set_channel_text(ctx, VALUE_ROW, local, bottom.as_deref().unwrap_or(""));
    }

    /// LED following a toggle parameter
    fn render_led(&self, ctx: &mut Context<'_>, device: &Device, note: u8, parameter: Option<&str>) {
        let on = self.assigned(ctx, parameter).is_some_and(|s| s.is_on());
        device.set_led(ctx, note, on);
    }

    fn render_strip(&self, ctx: &mut Context<'_>, device: &Device, channel: &ChannelElement) {
        let global = channel.global;
        let fader_target = self.fader_target(ctx, global);
        let encoder_target = self.encoder_target(ctx, global);
        self.render_fader(ctx, &channel.fader, fader_target.as_deref());
        self.render_ring(ctx, device, channel.local, encoder_target.as_ref());
        self.render_lcd(ctx, device, channel);
    }

    /// Channel button LEDs and, on the main unit, the extra button LEDs
    fn render_buttons(&self, ctx: &mut Context<'_>, device: &Device) {
        for channel in device.channels() {
            for button in ChannelButton::ALL {
                let parameter = Self::channel_parameter(self.channel_parameters.button(button), channel.global);
                self.render_led(ctx, device, button.note(channel.local), parameter.as_deref());
            }
        }

        if device.kind().has_master_fader() {
            for binding in &self.buttons {
                if binding.parameter.is_some() {
                    self.render_led(ctx, device, binding.note, binding.parameter.as_deref());
                }
            }
        }
    }

    /// Assignment display plus assign and flip LEDs
    fn render_page_indicators(&self, ctx: &mut Context<'_>, active: Option<ActivePage>) {
        let page = active.and_then(|a| self.paging.page(a.page));
        match page.and_then(|p| p.assignment_label()) {
            Some(label) => self.segment_display.set_assignment(ctx, &label),
            None => self.segment_display.clear_assignment(ctx),
        }

        let flipped = active.is_some_and(|a| a.flipped);
        for device in self.devices.iter().filter(|d| d.kind().has_master_fader()) {
            for (index, bank) in self.paging.banks().iter().enumerate() {
                device.set_led(ctx, bank.button, page.is_some_and(|p| p.bank == index));
            }
            device.set_led(ctx, notes::FLIP, flipped);
        }
    }

    /// Mode LEDs on the main units
    fn render_global_leds(&self, ctx: &mut Context<'_>) {
        let value_mode = self.value_mode.get(ctx);
        let motors = self.motors.get(ctx);
        for device in self.devices.iter().filter(|d| d.kind().has_master_fader()) {
            device.set_led(ctx, notes::NAME_VALUE, value_mode);
            if let Some(note) = self.motor_toggle_note {
                device.set_led(ctx, note, motors);
            }
        }
    }

    /// Faders, rings and scribble strips of every channel
    pub(super) fn render_strips(&self, ctx: &mut Context<'_>) {
        for device in &self.devices {
            for channel in device.channels() {
                self.render_strip(ctx, device, channel);
            }
        }
    }

    /// Everything outside the channel strips' page-dependent elements
    pub(super) fn render_controls(&self, ctx: &mut Context<'_>) {
        let active = self.paging.active(ctx);
        self.render_page_indicators(ctx, active);
        self.render_global_leds(ctx);

        for device in &self.devices {
            if let Some(master) = device.master_fader() {
                self.render_fader(ctx, master, self.master_parameter.as_deref());
            }
            self.render_buttons(ctx, device);
        }
    }

    pub(super) fn on_page_activated(&self, ctx: &mut Context<'_>, active: ActivePage) {
        debug!("Rebinding encoders for page {} (flipped: {})", active.page, active.flipped);
        self.render_page_indicators(ctx, Some(active));
        self.render_strips(ctx);
    }

    /// Motor flag changed; runs once per device
    pub(super) fn on_motors_changed(&self, ctx: &mut Context<'_>, position: usize, enabled: bool) {
        let Some(device) = self.devices.get(position) else {
            return;
        };
        debug!("Motors {} on device {}", if enabled { "enabled" } else { "disabled" }, position);

        if enabled {
            for fader in device.faders() {
                fader.force_update(ctx);
            }
            for channel in device.channels() {
                let target = self.fader_target(ctx, channel.global);
                self.render_fader(ctx, &channel.fader, target.as_deref());
            }
            if let Some(master) = device.master_fader() {
                self.render_fader(ctx, master, self.master_parameter.as_deref());
            }
        }

        if let Some(note) = self.motor_toggle_note.filter(|_| device.kind().has_master_fader()) {
            device.set_led(ctx, note, enabled);
        }
    }

    pub(super) fn on_value_mode_changed(&self, ctx: &mut Context<'_>, on: bool) {
        debug!("Scribble strips show {}", if on { "parameter names" } else { "channel names" });
        for device in &self.devices {
            for channel in device.channels() {
                self.render_lcd(ctx, device, channel);
            }
        }
        for device in self.devices.iter().filter(|d| d.kind().has_master_fader()) {
            device.set_led(ctx, notes::NAME_VALUE, on);
        }
    }
}
