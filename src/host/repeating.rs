//! Repeating activation binding
//!
//! Models a host action binding from a surface value to a sub-page activation
//! that repeats while the value is held: the first activation happens on the
//! tick that sees the value held, the next after `delay_ms`, then every
//! `interval_ms`.

use crate::context::Context;
use crate::host::{SubPageArea, SurfaceValue};
use crate::state::ContextStateVariable;

#[derive(Debug, Clone)]
pub struct RepeatingActivation {
    trigger: SurfaceValue,
    area: SubPageArea,
    sub_page: usize,
    delay_ms: u64,
    interval_ms: u64,
    next_due_ms: ContextStateVariable<Option<u64>>,
}

impl RepeatingActivation {
    /// Bind `trigger` to activate `sub_page` of `area`, repeating at `rate_hz`
    pub fn new(
        trigger: SurfaceValue,
        area: SubPageArea,
        sub_page: usize,
        delay_secs: f64,
        rate_hz: f64,
    ) -> Self {
        let interval_ms = if rate_hz > 0.0 {
            (1000.0 / rate_hz).round() as u64
        } else {
            u64::MAX
        };

        Self {
            trigger,
            area,
            sub_page,
            delay_ms: (delay_secs.max(0.0) * 1000.0).round() as u64,
            interval_ms,
            next_due_ms: ContextStateVariable::named("repeat", None),
        }
    }

    pub fn trigger(&self) -> &SurfaceValue {
        &self.trigger
    }

    /// Host scheduler tick; returns whether the sub-page was activated
    pub fn tick(&self, ctx: &mut Context<'_>, now_ms: u64) -> bool {
        if self.trigger.process_value(ctx) == 0.0 {
            if self.next_due_ms.get(ctx).is_some() {
                self.next_due_ms.set(ctx, &None);
            }
            return false;
        }

        let next = match self.next_due_ms.get(ctx) {
            None => now_ms.saturating_add(self.delay_ms),
            Some(due) if now_ms >= due => now_ms.saturating_add(self.interval_ms),
            Some(_) => return false,
        };
        self.next_due_ms.set(ctx, &Some(next));
        self.area.activate(ctx, self.sub_page);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{MemoryStore, Outbox};

    #[test]
    fn test_repeats_while_held() {
        let mut store = MemoryStore::new();
        let mut outbox = Outbox::new();
        let mut ctx = Context::new(&mut store, &mut outbox);

        let trigger = SurfaceValue::new("trigger");
        let area = SubPageArea::new("Repeat", ["Only"]);
        let binding = RepeatingActivation::new(trigger.clone(), area, 0, 1.0, 1.0);

        assert!(!binding.tick(&mut ctx, 0));

        trigger.set_process_value(&mut ctx, 1.0);
        assert!(binding.tick(&mut ctx, 100));
        assert!(!binding.tick(&mut ctx, 600));
        assert!(binding.tick(&mut ctx, 1100));
        assert!(!binding.tick(&mut ctx, 1500));
        assert!(binding.tick(&mut ctx, 2100));

        trigger.set_process_value(&mut ctx, 0.0);
        assert!(!binding.tick(&mut ctx, 5000));
    }
}
