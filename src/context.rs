//! Session context adapter
//!
//! The host hands a context to every callback it delivers. The context carries
//! the only durable state the runtime has (a string key/value store) and
//! collects everything the callback wants to send back out: MIDI frames for the
//! hardware and commands for the host.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use crate::midi::format_hex;

/// Host-provided key/value store scoped to the session
pub trait StateStore: Send {
    /// Returns the stored value, or an empty string if the key was never set
    fn get_state(&self, key: &str) -> String;

    /// Stores a value
    fn set_state(&mut self, key: &str, value: String);
}

/// In-memory store used by the loopback host and the tests
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl StateStore for MemoryStore {
    fn get_state(&self, key: &str) -> String {
        self.entries.get(key).cloned().unwrap_or_default()
    }

    fn set_state(&mut self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
    }
}

/// Identifies the output port an outgoing frame is written to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortId(pub usize);

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "port#{}", self.0)
    }
}

/// A raw MIDI frame queued for a device output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingFrame {
    pub port: PortId,
    pub bytes: Vec<u8>,
}

/// Request from the surface to the host application
#[derive(Debug, Clone, PartialEq)]
pub enum HostCommand {
    /// Absolute value change (fader moves), normalized 0.0..=1.0
    SetValue { parameter: String, value: f64 },
    /// Relative change in encoder ticks (negative = counter-clockwise)
    Adjust { parameter: String, steps: i32 },
    /// Button press on a toggle parameter
    Toggle { parameter: String },
    /// Jog wheel movement in ticks
    Jog { steps: i32 },
    /// Fire-and-forget host action (e.g. "time_format")
    Trigger { action: String },
}

/// Everything a callback produced for the outside world
#[derive(Debug, Default)]
pub struct Outbox {
    pub frames: Vec<OutgoingFrame>,
    pub commands: Vec<HostCommand>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty() && self.commands.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
        self.commands.clear();
    }
}

type DeferredTask = Box<dyn for<'c> FnOnce(&mut Context<'c>) + Send>;

/// Per-callback execution context
pub struct Context<'a> {
    store: &'a mut dyn StateStore,
    outbox: &'a mut Outbox,
    deferred: VecDeque<DeferredTask>,
}

impl<'a> Context<'a> {
    pub fn new(store: &'a mut dyn StateStore, outbox: &'a mut Outbox) -> Self {
        Self {
            store,
            outbox,
            deferred: VecDeque::new(),
        }
    }

    /// Read a raw state string (empty if unset)
    pub fn get(&self, key: &str) -> String {
        self.store.get_state(key)
    }

    /// Write a raw state string
    pub fn set(&mut self, key: &str, value: String) {
        self.store.set_state(key, value);
    }

    /// Queue a MIDI frame for a device output
    pub fn send_midi(&mut self, port: PortId, bytes: Vec<u8>) {
        tracing::trace!("→ {} {}", port, format_hex(&bytes));
        self.outbox.frames.push(OutgoingFrame { port, bytes });
    }

    /// Queue a command for the host
    pub fn send_command(&mut self, command: HostCommand) {
        tracing::trace!("→ host {:?}", command);
        self.outbox.commands.push(command);
    }

    pub fn frames(&self) -> &[OutgoingFrame] {
        &self.outbox.frames
    }

    pub fn commands(&self) -> &[HostCommand] {
        &self.outbox.commands
    }

    /// Schedule work the host performs after the current callback returns
    pub(crate) fn defer(&mut self, task: DeferredTask) {
        self.deferred.push_back(task);
    }

    /// Number of deliveries still waiting in the host queue
    pub fn pending_deliveries(&self) -> usize {
        self.deferred.len()
    }

    /// Deliver everything the host queued, including work queued by the
    /// deliveries themselves
    pub fn run_deferred(&mut self) {
        while let Some(task) = self.deferred.pop_front() {
            task(self);
        }
    }
}
