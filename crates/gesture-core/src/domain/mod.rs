//! Domain types shared by the classifiers and the suppression registry.

pub mod event;
pub mod gesture;
