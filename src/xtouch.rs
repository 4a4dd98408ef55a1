//! Behringer X-Touch hardware layer
//!
//! Everything that knows the Mackie Control wire format: port pairs and
//! framing, device composition, LED ring payloads, the scribble strips, the
//! segment display, motor faders and the midir connection.

pub mod connection;
pub mod device;
pub mod fader;
pub mod lcd;
pub mod notes;
pub mod ports;
pub mod ring;
pub mod segment_display;
pub mod shadow;

pub use device::{compose_devices, ChannelElement, Device, DeviceKind, SurfaceRegion, CHANNELS_PER_DEVICE};
pub use fader::MotorFader;
pub use lcd::LcdManager;
pub use ports::PortPair;
pub use ring::{ring_payload, DisplayMode, RING_OFF};
pub use segment_display::{SegmentDisplayManager, SegmentGlyph};
