//! Output shadow for LED writes
//!
//! Remembers the last value written per output address of one unit and drops
//! writes that would not change anything on the hardware. Entries live in the
//! session store under `<base>@<generation>/<kind>|<channel>|<data1>`;
//! `invalidate` moves to a fresh generation so everything is written again.

use crate::context::Context;
use crate::state::{next_state_key, ContextStateVariable};

/// Output address type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadowKind {
    Note,
    Cc,
}

/// Build the lookup key for one output address
pub fn make_shadow_key(kind: ShadowKind, channel: u8, data1: u8) -> String {
    let kind = match kind {
        ShadowKind::Note => "note",
        ShadowKind::Cc => "cc",
    };
    format!("{}|{}|{}", kind, channel, data1)
}

#[derive(Debug, Clone)]
pub struct OutputShadow {
    base: String,
    generation: ContextStateVariable<u32>,
}

impl OutputShadow {
    pub fn new() -> Self {
        Self {
            base: next_state_key("shadow"),
            generation: ContextStateVariable::named("shadow-generation", 0),
        }
    }

    fn entry_key(&self, ctx: &Context<'_>, kind: ShadowKind, channel: u8, data1: u8) -> String {
        format!(
            "{}@{}/{}",
            self.base,
            self.generation.get(ctx),
            make_shadow_key(kind, channel, data1)
        )
    }

    /// Record `value` for the address; returns false if it was already there
    pub fn update(&self, ctx: &mut Context<'_>, kind: ShadowKind, channel: u8, data1: u8, value: u8) -> bool {
        let key = self.entry_key(ctx, kind, channel, data1);
        let value = value.to_string();
        if ctx.get(&key) == value {
            return false;
        }
        ctx.set(&key, value);
        true
    }

    /// Forget every recorded value
    pub fn invalidate(&self, ctx: &mut Context<'_>) {
        self.generation.update(ctx, |g| *g = g.wrapping_add(1));
    }
}

impl Default for OutputShadow {
    fn default() -> Self {
        Self::new()
    }
}
