//! Capture source (C1, spec.md §4.1).

pub mod capture;

pub use capture::{CaptureConfig, CaptureError, CaptureSource};
