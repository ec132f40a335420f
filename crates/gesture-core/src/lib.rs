//! # gesture-core
//!
//! Pure classification logic for the global input-hook subsystem: raw
//! keyboard/mouse records in, semantic gestures (down/press/up, click,
//! double-click, move, wheel, drag) out, plus the reference-counted
//! suppression whitelist consulted ahead of classification.
//!
//! This crate is used by the capture infrastructure in `gesture-capture`.
//! It has zero dependencies on OS APIs, hook primitives, or UI frameworks,
//! so every state machine in here is unit-testable on any platform.
//!
//! # Architecture overview
//!
//! An OS input hook hands the capture layer one *raw record* per callback
//! invocation.  The hook chain wants a single answer back — "keep
//! propagating this event to the rest of the system, or swallow it" — and
//! it wants that answer *fast*: a stalled global hook callback freezes
//! input delivery for every process until the OS times it out.
//!
//! This crate defines:
//!
//! - **`domain`** – The record and event types.  Raw records are immutable
//!   snapshots of one callback invocation; gesture events carry a mutable
//!   `handled` flag that consumers set to stop OS propagation.
//!
//! - **`classify`** – The keyboard and mouse classifiers.  The mouse
//!   classifier owns a per-button state machine ([`ButtonTracker`]) and a
//!   drag sub-state-machine keyed on the left button.  All of this state
//!   is exclusively owned by the OS callback thread, so none of it locks.
//!
//! - **`suppression`** – The whitelist: a concurrency-safe, reference-
//!   counted table of gestures the application is currently synthesizing
//!   itself and must not re-receive as user input, with a short grace
//!   window after release to absorb emulated-vs-hardware delivery races.

pub mod classify;
pub mod domain;
pub mod suppression;

pub use classify::buttons::{ButtonTracker, ReleaseKind};
pub use classify::keyboard::{AsciiCharResolver, CharResolver, KeyEventClassifier};
pub use classify::mouse::{DragThresholds, MouseEventClassifier};
pub use classify::{KeyEventSink, MouseEventSink, Propagation};
pub use domain::event::{
    KeyGestureEvent, KeyPhase, Modifiers, MouseButton, MouseButtons, MouseGestureEvent,
    MousePhase, Point, RawKeyboardRecord, RawMouseRecord,
};
pub use domain::gesture::{GestureInput, MatchMode, NormalizedGesture, ScrollDirection};
pub use suppression::{SuppressionConfig, SuppressionRegistry, WhitelistToken};
