//! Single-slot callback property

use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

use crate::context::Context;
use crate::state::Callback;

/// A host callback property holding at most one callback
///
/// Assigning a new callback replaces the previous one, like the host's own
/// `onProcessValueChange`-style properties.
pub struct CallbackSlot<A> {
    callback: RwLock<Option<Callback<A>>>,
}

impl<A> Default for CallbackSlot<A> {
    fn default() -> Self {
        Self {
            callback: RwLock::new(None),
        }
    }
}

impl<A> fmt::Debug for CallbackSlot<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackSlot")
            .field("assigned", &self.is_assigned())
            .finish()
    }
}

impl<A> CallbackSlot<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<F>(&self, callback: F)
    where
        F: for<'c> Fn(&mut Context<'c>, A) + Send + Sync + 'static,
    {
        *self.callback.write() = Some(Arc::new(callback));
    }

    pub fn is_assigned(&self) -> bool {
        self.callback.read().is_some()
    }

    /// Invoke the assigned callback, if any
    pub fn fire(&self, ctx: &mut Context<'_>, args: A) {
        let callback = self.callback.read().clone();
        if let Some(callback) = callback {
            callback(ctx, args);
        }
    }
}
