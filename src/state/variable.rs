//! Typed state cells on top of the session string store
//!
//! Each cell owns one key in the session store and encodes its value as JSON.
//! Keys are generated from a process-wide counter so two cells never share one.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{error, warn};

use crate::context::Context;

static NEXT_VARIABLE_ID: AtomicUsize = AtomicUsize::new(0);

/// Allocate a fresh, process-wide unique state key
pub(crate) fn next_state_key(prefix: &str) -> String {
    let id = NEXT_VARIABLE_ID.fetch_add(1, Ordering::Relaxed);
    format!("{}#{}", prefix, id)
}

/// A typed value persisted in the session context
///
/// Clones share the same key, so a clone reads and writes the same state.
#[derive(Debug, Clone)]
pub struct ContextStateVariable<T> {
    key: String,
    initial: T,
}

impl<T> ContextStateVariable<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    pub fn new(initial: T) -> Self {
        Self::named("var", initial)
    }

    /// Create a cell whose key starts with `prefix` (helps reading store dumps)
    pub fn named(prefix: &str, initial: T) -> Self {
        Self {
            key: next_state_key(prefix),
            initial,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn initial(&self) -> &T {
        &self.initial
    }

    /// Current value, or the initial value if nothing was stored yet
    pub fn get(&self, ctx: &Context<'_>) -> T {
        let raw = ctx.get(&self.key);
        if raw.is_empty() {
            return self.initial.clone();
        }

        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                warn!("Undecodable state under '{}' ({}), using initial value", self.key, e);
                self.initial.clone()
            }
        }
    }

    pub fn set(&self, ctx: &mut Context<'_>, value: &T) {
        match serde_json::to_string(value) {
            Ok(raw) => ctx.set(&self.key, raw),
            Err(e) => error!("Failed to encode state '{}': {}", self.key, e),
        }
    }

    /// Read-modify-write helper
    pub fn update<F>(&self, ctx: &mut Context<'_>, f: F) -> T
    where
        F: FnOnce(&mut T),
    {
        let mut value = self.get(ctx);
        f(&mut value);
        self.set(ctx, &value);
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{MemoryStore, Outbox};
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Record {
        value: f64,
        label: String,
    }

    #[test]
    fn test_unset_returns_initial() {
        let mut store = MemoryStore::new();
        let mut outbox = Outbox::new();
        let ctx = Context::new(&mut store, &mut outbox);

        let cell = ContextStateVariable::new(7u16);
        assert_eq!(cell.get(&ctx), 7);
    }

    #[test]
    fn test_scalars_and_records() {
        let mut store = MemoryStore::new();
        let mut outbox = Outbox::new();
        let mut ctx = Context::new(&mut store, &mut outbox);

        let flag = ContextStateVariable::new(false);
        flag.set(&mut ctx, &true);
        assert!(flag.get(&ctx));
        assert_eq!(ctx.get(flag.key()), "true");

        let record = ContextStateVariable::new(Record {
            value: 0.0,
            label: String::new(),
        });
        let stored = Record {
            value: 0.5,
            label: "Pan".to_string(),
        };
        record.set(&mut ctx, &stored);
        assert_eq!(record.get(&ctx), stored);
    }

    #[test]
    fn test_keys_are_unique() {
        let a = ContextStateVariable::new(0u8);
        let b = ContextStateVariable::new(0u8);
        let c = ContextStateVariable::named("var", 0u8);
        assert_ne!(a.key(), b.key());
        assert_ne!(b.key(), c.key());
    }

    #[test]
    fn test_garbage_falls_back_to_initial() {
        let mut store = MemoryStore::new();
        let mut outbox = Outbox::new();
        let mut ctx = Context::new(&mut store, &mut outbox);

        let cell = ContextStateVariable::new(3i32);
        ctx.set(cell.key(), "not json".to_string());
        assert_eq!(cell.get(&ctx), 3);
    }

    #[test]
    fn test_clones_share_state() {
        let mut store = MemoryStore::new();
        let mut outbox = Outbox::new();
        let mut ctx = Context::new(&mut store, &mut outbox);

        let cell = ContextStateVariable::new(0u32);
        let alias = cell.clone();
        cell.update(&mut ctx, |v| *v += 5);
        assert_eq!(alias.get(&ctx), 5);
    }
}
