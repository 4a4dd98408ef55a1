//! Custom surface value
//!
//! A hardware-side value the host tracks for the surface. Writing its process
//! value does not call back synchronously: the host delivers
//! `on_process_value_change` after the current callback has returned.

use std::sync::Arc;

use super::CallbackSlot;
use crate::context::Context;
use crate::state::ContextStateVariable;

#[derive(Debug)]
struct Inner {
    name: String,
    value: ContextStateVariable<f64>,
    on_process_value_change: CallbackSlot<f64>,
}

/// Handle to a host surface value (clones refer to the same value)
#[derive(Debug, Clone)]
pub struct SurfaceValue {
    inner: Arc<Inner>,
}

impl SurfaceValue {
    pub fn new(name: &str) -> Self {
        Self::with_initial(name, 0.0)
    }

    pub fn with_initial(name: &str, initial: f64) -> Self {
        Self {
            inner: Arc::new(Inner {
                name: name.to_string(),
                value: ContextStateVariable::named("surface", initial),
                on_process_value_change: CallbackSlot::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn on_process_value_change(&self) -> &CallbackSlot<f64> {
        &self.inner.on_process_value_change
    }

    pub fn process_value(&self, ctx: &Context<'_>) -> f64 {
        self.inner.value.get(ctx)
    }

    /// Store a new process value and queue the change notification
    ///
    /// Writing the current value again is not a change and notifies nobody.
    pub fn set_process_value(&self, ctx: &mut Context<'_>, value: f64) {
        if self.inner.value.get(ctx) == value {
            return;
        }
        self.inner.value.set(ctx, &value);

        let inner = Arc::clone(&self.inner);
        ctx.defer(Box::new(move |ctx| {
            inner.on_process_value_change.fire(ctx, value);
        }));
    }
}
