//! Session state management
//!
//! The host gives the surface no memory of its own between callbacks, only the
//! string store of the session context. This module builds typed state on top
//! of it: single-value cells, flags shared across devices, and multicast
//! callback lists.

mod callbacks;
mod global;
mod variable;

pub use callbacks::{Callback, CallbackCollection};
pub use global::GlobalBooleanVariable;
pub use variable::ContextStateVariable;
pub(crate) use variable::next_state_key;
