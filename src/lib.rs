//! Far-field voice interaction core.
//!
//! See `SPEC_FULL.md` for the module-to-file map this crate follows.

pub mod audio;
pub mod cloud;
pub mod config;
pub mod device_state;
pub mod dsp;
pub mod error;
pub mod intent;
pub mod led;
pub mod metrics;
pub mod playback;
pub mod scheduler;
pub mod segment;
pub mod tools;
pub mod types;
pub mod wake_sink;

pub use error::{Result, VoiceCoreError};
