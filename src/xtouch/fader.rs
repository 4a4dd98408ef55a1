//! Motorized fader feedback
//!
//! Decides whether a host value becomes a motor move. A position is written
//! only while the fader is not touched, and only if it differs from the last
//! written one, is exactly zero, or a forced update is pending.

use tracing::trace;

use super::ports::PortPair;
use crate::context::Context;
use crate::midi::convert;
use crate::state::{ContextStateVariable, GlobalBooleanVariable};

#[derive(Debug, Clone)]
pub struct MotorFader {
    ports: PortPair,
    channel: u8,
    motors: GlobalBooleanVariable,
    touched: ContextStateVariable<bool>,
    last_sent: ContextStateVariable<Option<u16>>,
    force_update: ContextStateVariable<bool>,
}

impl MotorFader {
    /// Fader on pitch-bend `channel` of `ports`, gated by the shared motor flag
    pub fn new(ports: PortPair, channel: u8, motors: GlobalBooleanVariable) -> Self {
        Self {
            ports,
            channel,
            motors,
            touched: ContextStateVariable::named("fader-touched", false),
            last_sent: ContextStateVariable::named("fader-sent", None),
            force_update: ContextStateVariable::named("fader-force", false),
        }
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn is_touched(&self, ctx: &Context<'_>) -> bool {
        self.touched.get(ctx)
    }

    pub fn set_touched(&self, ctx: &mut Context<'_>, touched: bool) {
        self.touched.set(ctx, &touched);
    }

    /// Last position written to the motor
    pub fn last_sent(&self, ctx: &Context<'_>) -> Option<u16> {
        self.last_sent.get(ctx)
    }

    /// Make the next position go out even if unchanged
    pub fn force_update(&self, ctx: &mut Context<'_>) {
        self.force_update.set(ctx, &true);
    }

    /// Move to a normalized host value; returns whether a frame was written
    pub fn set_value(&self, ctx: &mut Context<'_>, value: f64) -> bool {
        self.send(ctx, convert::to_14bit(value))
    }

    fn send(&self, ctx: &mut Context<'_>, value: u16) -> bool {
        if self.touched.get(ctx) || !self.motors.get(ctx) {
            return false;
        }

        let forced = self.force_update.get(ctx);
        if self.last_sent.get(ctx) == Some(value) && value != 0 && !forced {
            return false;
        }

        trace!("Fader {} → {}", self.channel, value);
        self.ports.send_pitch_bend(ctx, self.channel, value);
        self.last_sent.set(ctx, &Some(value));
        if forced {
            self.force_update.set(ctx, &false);
        }
        true
    }

    /// Snap to zero after the target went away; the next value is forced
    pub fn unassign(&self, ctx: &mut Context<'_>) {
        self.send(ctx, 0);
        self.force_update(ctx);
    }

    /// Release after a touch: the host value is resent regardless
    pub fn release(&self, ctx: &mut Context<'_>, host_value: f64) -> bool {
        self.touched.set(ctx, &false);
        self.force_update(ctx);
        self.set_value(ctx, host_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{MemoryStore, Outbox};
    use crate::xtouch::device::DeviceKind;

    fn fader() -> (MotorFader, GlobalBooleanVariable) {
        let motors = GlobalBooleanVariable::new("motors", true);
        let ports = PortPair::new(DeviceKind::Main, None, None);
        (MotorFader::new(ports, 2, motors.clone()), motors)
    }

    #[test]
    fn test_touched_fader_never_moves() {
        let mut store = MemoryStore::new();
        let mut outbox = Outbox::new();
        let mut ctx = Context::new(&mut store, &mut outbox);

        let (fader, _) = fader();
        fader.set_touched(&mut ctx, true);
        assert!(!fader.set_value(&mut ctx, 0.3));
        assert!(!fader.set_value(&mut ctx, 0.0));
        fader.force_update(&mut ctx);
        assert!(!fader.set_value(&mut ctx, 0.6));
        assert!(ctx.frames().is_empty());
    }

    #[test]
    fn test_unchanged_value_needs_force() {
        let mut store = MemoryStore::new();
        let mut outbox = Outbox::new();
        let mut ctx = Context::new(&mut store, &mut outbox);

        let (fader, _) = fader();
        assert!(fader.set_value(&mut ctx, 1.0));
        assert!(!fader.set_value(&mut ctx, 1.0));
        assert_eq!(ctx.frames()[0].bytes, vec![0xE2, 0x7F, 0x7F]);

        fader.force_update(&mut ctx);
        assert!(fader.set_value(&mut ctx, 1.0));
        // The write consumed the forced update
        assert!(!fader.set_value(&mut ctx, 1.0));
        assert_eq!(ctx.frames().len(), 2);
    }

    #[test]
    fn test_zero_is_always_written() {
        let mut store = MemoryStore::new();
        let mut outbox = Outbox::new();
        let mut ctx = Context::new(&mut store, &mut outbox);

        let (fader, _) = fader();
        assert!(fader.set_value(&mut ctx, 0.0));
        assert!(fader.set_value(&mut ctx, 0.0));
    }

    #[test]
    fn test_unassign_snaps_to_zero_and_forces_next() {
        let mut store = MemoryStore::new();
        let mut outbox = Outbox::new();
        let mut ctx = Context::new(&mut store, &mut outbox);

        let (fader, _) = fader();
        fader.set_value(&mut ctx, 0.5);
        fader.unassign(&mut ctx);
        assert_eq!(fader.last_sent(&ctx), Some(0));
        assert_eq!(ctx.frames()[1].bytes, vec![0xE2, 0x00, 0x00]);

        fader.set_value(&mut ctx, 0.5);
        assert_eq!(ctx.frames().len(), 3);
    }

    #[test]
    fn test_release_resends_host_value() {
        let mut store = MemoryStore::new();
        let mut outbox = Outbox::new();
        let mut ctx = Context::new(&mut store, &mut outbox);

        let (fader, _) = fader();
        fader.set_value(&mut ctx, 0.5);
        fader.set_touched(&mut ctx, true);
        assert!(fader.release(&mut ctx, 0.5));
        assert!(!fader.is_touched(&ctx));
        assert_eq!(ctx.frames().len(), 2);
    }

    #[test]
    fn test_motors_off_suppresses_writes() {
        let mut store = MemoryStore::new();
        let mut outbox = Outbox::new();
        let mut ctx = Context::new(&mut store, &mut outbox);

        let (fader, motors) = fader();
        motors.set(&mut ctx, false, true);
        assert!(!fader.set_value(&mut ctx, 0.7));
        assert!(!fader.set_value(&mut ctx, 0.0));
        assert_eq!(fader.last_sent(&ctx), None);
    }
}
