//! Multicast callbacks over single-slot host callback properties

use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

use crate::context::Context;
use crate::host::CallbackSlot;

/// Callback invoked with the active session context
pub type Callback<A> = Arc<dyn for<'c> Fn(&mut Context<'c>, A) + Send + Sync>;

/// Ordered list of callbacks dispatched through one host callback slot
pub struct CallbackCollection<A> {
    callbacks: Arc<RwLock<Vec<Callback<A>>>>,
}

impl<A> Clone for CallbackCollection<A> {
    fn clone(&self) -> Self {
        Self {
            callbacks: Arc::clone(&self.callbacks),
        }
    }
}

impl<A> Default for CallbackCollection<A> {
    fn default() -> Self {
        Self {
            callbacks: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

impl<A> fmt::Debug for CallbackCollection<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackCollection")
            .field("len", &self.len())
            .finish()
    }
}

impl<A> CallbackCollection<A> {
    pub fn len(&self) -> usize {
        self.callbacks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<A: Clone + 'static> CallbackCollection<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a collection and install its dispatcher into `slot`
    ///
    /// Whatever the slot held before is replaced.
    pub fn attach(slot: &CallbackSlot<A>) -> Self {
        let collection = Self::new();
        let dispatcher = collection.clone();
        slot.set(move |ctx, args: A| dispatcher.run(ctx, args));
        collection
    }

    pub fn add_callback<F>(&self, callback: F)
    where
        F: for<'c> Fn(&mut Context<'c>, A) + Send + Sync + 'static,
    {
        self.callbacks.write().push(Arc::new(callback));
    }

    /// Invoke every callback in registration order
    pub fn run(&self, ctx: &mut Context<'_>, args: A) {
        // Snapshot so callbacks may register further callbacks without deadlocking
        let callbacks: Vec<Callback<A>> = self.callbacks.read().clone();
        for callback in callbacks {
            callback(ctx, args.clone());
        }
    }
}
