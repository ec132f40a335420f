//! gesture-capture library entry point.
//!
//! Infrastructure around `gesture-core`: the OS hook sources behind the
//! [`hook::HookSource`] trait, the idempotent [`hook::HookHandle`], the
//! lazily-installing [`facade::InputEvents`] surface, and TOML
//! configuration.  Re-exports the public modules so integration tests in
//! `tests/` and the `gesture-watch` binary share one module tree.

pub mod config;
pub mod facade;
pub mod hook;

pub use facade::{FacadeOptions, InputEvents, SubscriptionId};
pub use hook::{HookError, HookHandle, HookSource};
