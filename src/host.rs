//! Host surface model
//!
//! Minimal stand-ins for the objects the host application hands to a surface
//! script: single-slot callback properties, custom surface values, sub-page
//! areas and repeating action bindings. All mutable state lives in the session
//! context; the objects themselves are wiring.

mod repeating;
mod slot;
mod sub_page;
mod surface_value;

pub use repeating::RepeatingActivation;
pub use slot::CallbackSlot;
pub use sub_page::{SubPage, SubPageArea};
pub use surface_value::SurfaceValue;
