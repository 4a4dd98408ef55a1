//! Polling timer
//!
//! The host has no delayed-callback primitive. A dedicated "Timer" sub-page is
//! bound to a repeating activation whose trigger is held at 1 while any
//! timeout is pending; each activation fires the due entries and releases the
//! trigger once nothing is left.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace};

use crate::context::Context;
use crate::host::{RepeatingActivation, SubPageArea, SurfaceValue};
use crate::state::CallbackCollection;

/// Device clock in milliseconds
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Milliseconds since the clock was created
#[derive(Debug)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

/// Clock advanced by hand
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, ms: u64) {
        self.now.store(ms, Ordering::Relaxed);
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::Relaxed)
    }
}

pub type TimeoutCallback = Box<dyn for<'c> FnOnce(&mut Context<'c>) + Send>;

struct TimeoutEntry {
    due_ms: u64,
    callback: TimeoutCallback,
}

/// Timer delay and rate of the repeating binding
const POLL_DELAY_SECS: f64 = 1.0;
const POLL_RATE_HZ: f64 = 1.0;

#[derive(Clone)]
pub struct PollingTimer {
    area: SubPageArea,
    binding: RepeatingActivation,
    timeouts: Arc<Mutex<HashMap<String, TimeoutEntry>>>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for PollingTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollingTimer")
            .field("pending", &self.pending())
            .finish()
    }
}

impl PollingTimer {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let area = SubPageArea::new("Timer", ["Timer"]);
        let trigger = SurfaceValue::new("Timer trigger");
        let binding = RepeatingActivation::new(trigger, area.clone(), 0, POLL_DELAY_SECS, POLL_RATE_HZ);
        let timeouts = Arc::new(Mutex::new(HashMap::new()));

        let timer = Self {
            area,
            binding,
            timeouts,
            clock,
        };

        if let Some(page) = timer.area.sub_page(0) {
            let hooks = CallbackCollection::attach(page.on_activate());
            let poller = timer.clone();
            hooks.add_callback(move |ctx, ()| poller.poll(ctx));
        }
        timer
    }

    /// Number of armed timeouts
    pub fn pending(&self) -> usize {
        self.timeouts.lock().len()
    }

    pub fn is_armed(&self, id: &str) -> bool {
        self.timeouts.lock().contains_key(id)
    }

    /// Arm `callback` to run after `seconds`, replacing any timeout with `id`
    pub fn set_timeout<F>(&self, ctx: &mut Context<'_>, id: &str, callback: F, seconds: f64)
    where
        F: for<'c> FnOnce(&mut Context<'c>) + Send + 'static,
    {
        let delay_ms = (seconds.max(0.0) * 1000.0).round() as u64;
        let due_ms = self.clock.now_ms().saturating_add(delay_ms);
        trace!("Timeout '{}' due at {} ms", id, due_ms);
        self.timeouts.lock().insert(
            id.to_string(),
            TimeoutEntry {
                due_ms,
                callback: Box::new(callback),
            },
        );
        self.binding.trigger().set_process_value(ctx, 1.0);
    }

    /// Host scheduler tick
    pub fn tick(&self, ctx: &mut Context<'_>) {
        self.binding.tick(ctx, self.clock.now_ms());
    }

    /// Fire every due timeout; stop ticking once none are left
    fn poll(&self, ctx: &mut Context<'_>) {
        let now = self.clock.now_ms();
        let mut due: Vec<(String, TimeoutEntry)> = {
            let mut timeouts = self.timeouts.lock();
            let ids: Vec<String> = timeouts
                .iter()
                .filter(|(_, entry)| entry.due_ms <= now)
                .map(|(id, _)| id.clone())
                .collect();
            ids.into_iter()
                .filter_map(|id| timeouts.remove(&id).map(|entry| (id, entry)))
                .collect()
        };
        due.sort_by_key(|(_, entry)| entry.due_ms);

        // Callbacks may arm new timeouts, so the map is unlocked here
        for (id, entry) in due {
            debug!("Timeout '{}' fired", id);
            (entry.callback)(ctx);
        }

        if self.timeouts.lock().is_empty() {
            self.binding.trigger().set_process_value(ctx, 0.0);
        }
    }
}
