//! xtouch-session - Control-surface session runtime for the Behringer X-Touch
//!
//! Composes one or more X-Touch units into a single surface and drives its
//! motor faders, encoder rings, scribble strips and segment display from a
//! host that only offers callbacks and a per-session string store.

pub mod config;
pub mod context;
pub mod error;
pub mod host;
pub mod midi;
pub mod mixer;
pub mod paging;
pub mod session;
pub mod state;
pub mod text;
pub mod timer;
pub mod xtouch;
