use chrono::NaiveDateTime;
use std::sync::Mutex;

/// A single source of "now" for the whole engine.
///
/// All stored and compared instants are naive (zone-less) local wall-clock
/// timestamps — see SPEC_FULL.md §4.1. Every component that needs "now" takes
/// a `&dyn Clock` instead of calling `chrono::Local::now()` directly, so a
/// single logical step (one scheduler tick, one `recognize` request) can pin
/// down one value of "now" and reuse it throughout.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Production clock: the OS's local wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// Test clock that returns a fixed instant until explicitly advanced.
pub struct FixedClock {
    now: Mutex<NaiveDateTime>,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock().expect("clock mutex poisoned") = now;
    }

    pub fn advance(&self, duration: chrono::Duration) {
        let mut guard = self.now.lock().expect("clock mutex poisoned");
        *guard += duration;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().expect("clock mutex poisoned")
    }
}
