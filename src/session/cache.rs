//! Last known host state per parameter
//!
//! Bindings change with every page activation, so an element that gets a new
//! target must be able to render it without asking the host again. Entries
//! live in the session store under `param:<id>`.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::context::Context;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterState {
    /// Normalized value (0.0-1.0)
    pub value: f64,
    /// Host-formatted value text
    pub display: String,
    /// Parameter name; empty while the parameter is unassigned
    pub title: String,
}

impl ParameterState {
    pub fn is_assigned(&self) -> bool {
        !self.title.is_empty()
    }

    /// Toggle parameters read as on from the middle up
    pub fn is_on(&self) -> bool {
        self.value >= 0.5
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ParameterCache;

impl ParameterCache {
    fn key(id: &str) -> String {
        format!("param:{}", id)
    }

    pub fn get(&self, ctx: &Context<'_>, id: &str) -> ParameterState {
        let raw = ctx.get(&Self::key(id));
        if raw.is_empty() {
            return ParameterState::default();
        }
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("Undecodable cache entry for '{}': {}", id, e);
            ParameterState::default()
        })
    }

    /// Read-modify-write; returns the stored state
    pub fn update<F>(&self, ctx: &mut Context<'_>, id: &str, f: F) -> ParameterState
    where
        F: FnOnce(&mut ParameterState),
    {
        let mut state = self.get(ctx, id);
        f(&mut state);
        match serde_json::to_string(&state) {
            Ok(raw) => ctx.set(&Self::key(id), raw),
            Err(e) => warn!("Failed to encode cache entry for '{}': {}", id, e),
        }
        state
    }

    /// Whether `id` names an assigned parameter
    pub fn is_assigned(&self, ctx: &Context<'_>, id: &str) -> bool {
        self.get(ctx, id).is_assigned()
    }
}
