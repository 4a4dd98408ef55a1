//! Boolean flag shared by every device of the surface
//!
//! The host delivers callbacks per hardware binding, so a flag toggled from one
//! unit is invisible to bindings on another unit unless it travels through a
//! surface value. The flag's state cell is mirrored onto a surface value whose
//! change notification fans out to all registered on-change callbacks.

use crate::context::Context;
use crate::host::SurfaceValue;
use crate::state::{CallbackCollection, ContextStateVariable};

#[derive(Debug, Clone)]
pub struct GlobalBooleanVariable {
    state: ContextStateVariable<bool>,
    surface_value: SurfaceValue,
    on_change: CallbackCollection<bool>,
}

impl GlobalBooleanVariable {
    pub fn new(name: &str, initial: bool) -> Self {
        let state = ContextStateVariable::named(name, initial);
        let surface_value = SurfaceValue::with_initial(name, if initial { 1.0 } else { 0.0 });
        let on_change = CallbackCollection::<bool>::new();

        let delivered_state = state.clone();
        let delivered_on_change = on_change.clone();
        surface_value
            .on_process_value_change()
            .set(move |ctx, value| {
                let value = value != 0.0;
                // Already applied when the setter ran the callbacks instantly
                if delivered_state.get(ctx) == value {
                    return;
                }
                delivered_state.set(ctx, &value);
                delivered_on_change.run(ctx, value);
            });

        Self {
            state,
            surface_value,
            on_change,
        }
    }

    pub fn get(&self, ctx: &Context<'_>) -> bool {
        self.state.get(ctx)
    }

    /// Change the flag
    ///
    /// The change reaches the on-change callbacks when the host delivers the
    /// surface value update. With `run_callbacks_instantly` the flag is stored
    /// and every callback has run before this returns.
    pub fn set(&self, ctx: &mut Context<'_>, value: bool, run_callbacks_instantly: bool) {
        self.surface_value
            .set_process_value(ctx, if value { 1.0 } else { 0.0 });

        if run_callbacks_instantly && self.state.get(ctx) != value {
            self.state.set(ctx, &value);
            self.on_change.run(ctx, value);
        }
    }

    /// Flip the flag
    ///
    /// Flips the latest requested value, so two deferred toggles in one
    /// callback cancel out once the host has delivered both changes.
    pub fn toggle(&self, ctx: &mut Context<'_>, run_callbacks_instantly: bool) {
        let value = self.surface_value.process_value(ctx) == 0.0;
        self.set(ctx, value, run_callbacks_instantly);
    }

    pub fn add_on_change<F>(&self, callback: F)
    where
        F: for<'c> Fn(&mut Context<'c>, bool) + Send + Sync + 'static,
    {
        self.on_change.add_callback(callback);
    }
}
