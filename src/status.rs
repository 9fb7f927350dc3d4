//! Single-slot "what is happening now" indicator.
//!
//! The signal holds at most one message. [`StatusSignal::show`] overwrites
//! whatever is there; [`StatusSignal::hide`] clears it. Workflow runs never
//! call `hide` themselves: they take a [`StatusLease`], which clears the
//! signal when dropped, on success, error and unwinding alike.
//!
//! Overlapping leases are not coordinated. Whichever lease is dropped first
//! clears the message even if the other is still alive.

use console::Term;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

struct Slot {
    message: Option<String>,
    bar: Option<ProgressBar>,
}

/// Cloneable handle to the process-wide status slot.
#[derive(Clone)]
pub struct StatusSignal {
    slot: Arc<Mutex<Slot>>,
    visible: bool,
}

impl StatusSignal {
    /// A signal drawn as a spinner on stderr when stderr is a terminal.
    pub fn new() -> Self {
        Self::with_visibility(Term::stderr().is_term())
    }

    /// A signal that tracks messages without drawing anything.
    pub fn hidden() -> Self {
        Self::with_visibility(false)
    }

    fn with_visibility(visible: bool) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot {
                message: None,
                bar: None,
            })),
            visible,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        // A panic while holding the lock leaves only a stale message behind.
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replace the current message and make it visible.
    pub fn show(&self, message: impl Into<String>) {
        let message = message.into();
        let mut slot = self.lock();
        let bar = slot.bar.get_or_insert_with(|| self.spinner());
        bar.set_message(message.clone());
        slot.message = Some(message);
    }

    /// Clear the current message.
    pub fn hide(&self) {
        let mut slot = self.lock();
        slot.message = None;
        if let Some(bar) = slot.bar.take() {
            bar.finish_and_clear();
        }
    }

    pub fn current(&self) -> Option<String> {
        self.lock().message.clone()
    }

    pub fn is_visible(&self) -> bool {
        self.lock().message.is_some()
    }

    /// Acquire the signal for the duration of a workflow run.
    pub fn lease(&self) -> StatusLease {
        StatusLease {
            signal: self.clone(),
        }
    }

    /// Run `f` with the spinner temporarily removed, so printed lines are not
    /// overdrawn.
    pub fn suspend<R>(&self, f: impl FnOnce() -> R) -> R {
        let bar = self.lock().bar.clone();
        match bar {
            Some(bar) => bar.suspend(f),
            None => f(),
        }
    }

    fn spinner(&self) -> ProgressBar {
        let bar = ProgressBar::new_spinner();
        if !self.visible {
            bar.set_draw_target(ProgressDrawTarget::hidden());
            return bar;
        }
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .expect("progress bar template is a valid static string");
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(100));
        bar
    }
}

impl Default for StatusSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoped ownership of the status signal. Dropping it hides the signal.
pub struct StatusLease {
    signal: StatusSignal,
}

impl StatusLease {
    pub fn show(&self, message: impl Into<String>) {
        self.signal.show(message);
    }
}

impl Drop for StatusLease {
    fn drop(&mut self) {
        self.signal.hide();
    }
}
