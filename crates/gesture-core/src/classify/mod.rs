//! Gesture classifiers.
//!
//! Classifiers turn one raw record into zero or more semantic events,
//! emitted through a sink owned by the caller.  The return value of a
//! `process` call is the answer the OS hook chain is waiting for: keep
//! propagating the event, or swallow it.
//!
//! All classifier state is exclusively owned by the OS callback thread
//! (the OS serializes hook callbacks for a given hook chain), so nothing
//! in this module locks.

use crate::domain::event::{KeyGestureEvent, MouseGestureEvent};

pub mod buttons;
pub mod keyboard;
pub mod mouse;

/// The answer handed back to the OS hook chain for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    /// Continue propagating the event to the rest of the system.
    Forward,
    /// Swallow the event; the rest of the system never sees it.
    Swallow,
}

impl Propagation {
    pub(crate) fn from_handled(handled: bool) -> Self {
        if handled {
            Propagation::Swallow
        } else {
            Propagation::Forward
        }
    }

    /// The raw boolean the OS subscription callback must return
    /// (`true` = continue propagation).
    pub fn forward_to_os(self) -> bool {
        self == Propagation::Forward
    }
}

/// Receives semantic keyboard events as the classifier emits them.
///
/// The event is passed mutably so the sink (and the subscribers behind
/// it) can set `handled`; the classifier reads the flag back after each
/// emission.
pub trait KeyEventSink {
    fn emit_key(&mut self, event: &mut KeyGestureEvent);
}

/// Receives semantic mouse events as the classifier emits them.
pub trait MouseEventSink {
    fn emit_mouse(&mut self, event: &mut MouseGestureEvent);
}
