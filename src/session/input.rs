//! Surface to host input routing
//!
//! Decodes the MIDI a unit sends and turns it into host commands or surface
//! state changes (paging, flip, touch, motor and display modes).

use tracing::{debug, trace, warn};

use super::Session;
use crate::context::{Context, HostCommand, PortId};
use crate::midi::{convert, format_hex, MidiMessage};
use crate::xtouch::notes::{self, cc, ChannelButton, MASTER_FADER_CHANNEL};
use crate::xtouch::{Device, CHANNELS_PER_DEVICE};

const CHANNELS: u8 = CHANNELS_PER_DEVICE as u8;

impl Session {
    /// Raw MIDI from the unit behind `port`
    pub fn handle_midi(&self, ctx: &mut Context<'_>, port: PortId, data: &[u8]) {
        let Some(device) = self.device_for_port(port) else {
            warn!("MIDI from unknown {}: {}", port, format_hex(data));
            return;
        };
        let Some(message) = MidiMessage::parse(data) else {
            debug!("Ignoring undecodable MIDI from {}: {}", port, format_hex(data));
            return;
        };
        trace!("← {} {}", port, message);

        match message {
            MidiMessage::NoteOn { note, .. } => self.on_button(ctx, device, note, true),
            MidiMessage::NoteOff { note, .. } => self.on_button(ctx, device, note, false),
            MidiMessage::ControlChange { cc, value, .. } => self.on_control_change(ctx, device, cc, value),
            MidiMessage::PitchBend { channel, value } => self.on_fader_moved(ctx, device, channel, value),
            other => trace!("Unhandled surface message: {}", other),
        }
        ctx.run_deferred();
    }

    fn command(ctx: &mut Context<'_>, command: HostCommand) {
        debug!("Surface → host: {:?}", command);
        ctx.send_command(command);
    }

    /// Toggle `parameter` if the host knows it
    fn toggle(&self, ctx: &mut Context<'_>, parameter: Option<String>) {
        match parameter {
            Some(parameter) if self.cache.is_assigned(ctx, &parameter) => {
                Self::command(ctx, HostCommand::Toggle { parameter });
            }
            Some(parameter) => debug!("Ignoring toggle of unassigned '{}'", parameter),
            None => {}
        }
    }

    fn on_button(&self, ctx: &mut Context<'_>, device: &Device, note: u8, pressed: bool) {
        let touch_range = notes::FADER_TOUCH..notes::FADER_TOUCH + CHANNELS;
        if touch_range.contains(&note) {
            self.on_fader_touch(ctx, device, note - notes::FADER_TOUCH, pressed);
            return;
        }
        if note == notes::MASTER_FADER_TOUCH {
            self.on_master_touch(ctx, device, pressed);
            return;
        }
        if !pressed {
            return;
        }

        match note {
            n if n < notes::ENCODER_PUSH => {
                let Some((button, local)) = ChannelButton::from_note(n) else {
                    return;
                };
                let global = device.channel_offset() + local as usize;
                let parameter = Self::channel_parameter(self.channel_parameters.button(button), global);
                self.toggle(ctx, parameter);
            }
            n if n < notes::ENCODER_PUSH + CHANNELS => {
                let global = device.channel_offset() + (n - notes::ENCODER_PUSH) as usize;
                let push = self.encoder_target(ctx, global).and_then(|t| t.push_toggle);
                self.toggle(ctx, push);
            }
            notes::FLIP => {
                self.paging.toggle_flip(ctx);
            }
            notes::CHANNEL_LEFT => {
                self.paging.navigate(ctx, -1);
            }
            notes::CHANNEL_RIGHT => {
                self.paging.navigate(ctx, 1);
            }
            notes::NAME_VALUE => self.value_mode.toggle(ctx, false),
            notes::SMPTE_BEATS => Self::command(
                ctx,
                HostCommand::Trigger {
                    action: "time_format".to_string(),
                },
            ),
            n if self.motor_toggle_note == Some(n) => self.motors.toggle(ctx, true),
            n => {
                if let Some(bank) = self.paging.bank_for_button(n) {
                    self.paging.press_assign(ctx, bank);
                } else if let Some(binding) = self.buttons.iter().find(|b| b.note == n) {
                    if binding.parameter.is_some() {
                        self.toggle(ctx, binding.parameter.clone());
                    }
                    if let Some(action) = &binding.action {
                        Self::command(
                            ctx,
                            HostCommand::Trigger {
                                action: action.clone(),
                            },
                        );
                    }
                } else {
                    debug!("Unmapped button {:#04x}", n);
                }
            }
        }
    }

    fn on_control_change(&self, ctx: &mut Context<'_>, device: &Device, controller: u8, value: u8) {
        let steps = convert::relative_ticks(value);
        if steps == 0 {
            return;
        }

        if (cc::ENCODER_ROTATE..cc::ENCODER_ROTATE + CHANNELS).contains(&controller) {
            let global = device.channel_offset() + (controller - cc::ENCODER_ROTATE) as usize;
            match self.encoder_target(ctx, global) {
                Some(target) if self.cache.is_assigned(ctx, &target.parameter) => Self::command(
                    ctx,
                    HostCommand::Adjust {
                        parameter: target.parameter,
                        steps,
                    },
                ),
                _ => trace!("Encoder {} has no assignment", global + 1),
            }
        } else if controller == cc::JOG {
            Self::command(ctx, HostCommand::Jog { steps });
        }
    }

    fn on_fader_moved(&self, ctx: &mut Context<'_>, device: &Device, channel: u8, value: u16) {
        let parameter = if channel == MASTER_FADER_CHANNEL && device.master_fader().is_some() {
            self.master_parameter.clone()
        } else if channel < CHANNELS {
            self.fader_target(ctx, device.channel_offset() + channel as usize)
        } else {
            None
        };

        if let Some(parameter) = parameter.filter(|p| self.cache.is_assigned(ctx, p)) {
            ctx.send_command(HostCommand::SetValue {
                parameter,
                value: convert::from_14bit(value),
            });
        }
    }

    fn on_fader_touch(&self, ctx: &mut Context<'_>, device: &Device, local: u8, touched: bool) {
        let Some(channel) = device.channel(local) else {
            return;
        };
        let global = channel.global;
        trace!("Fader {} {}", global + 1, if touched { "touched" } else { "released" });

        if touched {
            channel.fader.set_touched(ctx, true);
            if let Some(state) = self.display_override.get(global) {
                state.set(ctx, &true);
            }
            self.render_lcd(ctx, device, channel);
            return;
        }

        let target = self.fader_target(ctx, global);
        match self.assigned(ctx, target.as_deref()) {
            Some(state) => {
                channel.fader.release(ctx, state.value);
            }
            None => {
                channel.fader.set_touched(ctx, false);
                channel.fader.unassign(ctx);
            }
        }
        self.schedule_display_revert(ctx, global);
    }

    fn on_master_touch(&self, ctx: &mut Context<'_>, device: &Device, touched: bool) {
        let Some(master) = device.master_fader() else {
            return;
        };
        if touched {
            master.set_touched(ctx, true);
            return;
        }

        match self.assigned(ctx, self.master_parameter.as_deref()) {
            Some(state) => {
                master.release(ctx, state.value);
            }
            None => {
                master.set_touched(ctx, false);
                master.unassign(ctx);
            }
        }
    }
}
