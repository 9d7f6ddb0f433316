//! Crate-wide error taxonomy.
//!
//! Each component owns a local error enum; `VoiceCoreError` aggregates
//! them via `#[from]` so callers that cross component boundaries (the
//! scheduler, mainly) can propagate with `?` without manual mapping.
//! See spec.md §7 for the taxonomy this mirrors (transient-cloud,
//! transient-device, config, programmer, fatal).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, VoiceCoreError>;

#[derive(Error, Debug)]
pub enum VoiceCoreError {
    #[error("capture error: {0}")]
    Capture(#[from] crate::audio::capture::CaptureError),

    #[error("dsp error: {0}")]
    Dsp(#[from] crate::dsp::DspError),

    #[error("cloud error: {0}")]
    Cloud(#[from] crate::cloud::client::CloudError),

    #[error("tool error: {0}")]
    Tool(#[from] crate::tools::ToolError),

    #[error("playback error: {0}")]
    Playback(#[from] crate::playback::PlaybackError),

    #[error("scheduler error: {0}")]
    Scheduler(#[from] crate::scheduler::SchedulerError),

    #[error("config error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
