//! Playback driver (C10, spec.md §4.10).
//!
//! Consumes either a container blob or raw PCM with an explicit
//! `(rate, channels)` tuple, plays it to completion on `cpal`'s default
//! output device, and signals "playback done" to the scheduler. Built
//! on `cpal` for symmetry with C1's capture side (the teacher's
//! `audio_capture.rs` and `src/main.rs` both use it for the input
//! side); a second concurrent play attempt fails fast with `Busy`
//! rather than queuing, matching spec.md's exclusive-ownership model.

use crate::cloud::container;
use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("playback device busy")]
    Busy,
    #[error("no output device available")]
    NoDevice,
    #[error("unsupported output configuration: {0}")]
    UnsupportedConfig(String),
    #[error("decode error: {0}")]
    Decode(#[from] container::ContainerError),
    #[error("device error: {0}")]
    Device(String),
}

/// Trait boundary the scheduler drives playback through, mirroring
/// `CloudOps` (`src/cloud/client.rs`): lets the barge-in/cancellation
/// paths be exercised against a recording stub instead of real
/// hardware in tests.
#[async_trait]
pub trait PlaybackOps: Send + Sync {
    async fn play_container_blocking(&self, blob: &[u8]) -> Result<(), PlaybackError>;
    fn cancel(&self);
}

/// Polling granularity for the blocking playback thread's cancellation
/// check. Must stay well under the <=50ms barge-in budget (spec.md §4.10,
/// §8 S5).
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(10);

pub struct PlaybackDriver {
    busy: Arc<AtomicBool>,
    cancelled: Arc<AtomicBool>,
}

impl PlaybackDriver {
    pub fn new() -> Self {
        PlaybackDriver {
            busy: Arc::new(AtomicBool::new(false)),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Plays a container blob (canonical header + interleaved PCM) to
    /// completion. Returns once the hardware has drained all samples.
    pub async fn play_container_blocking(&self, blob: &[u8]) -> Result<(), PlaybackError> {
        let decoded = container::decode(blob)?;
        self.play_pcm_blocking(&decoded.pcm, decoded.sample_rate, decoded.channels).await
    }

    /// Plays raw interleaved PCM at the given `(rate, channels)`.
    pub async fn play_pcm_blocking(
        &self,
        pcm: &[i16],
        sample_rate: u32,
        channels: u16,
    ) -> Result<(), PlaybackError> {
        if self.busy.swap(true, Ordering::SeqCst) {
            return Err(PlaybackError::Busy);
        }
        self.cancelled.store(false, Ordering::SeqCst);

        let result = self.run_stream(pcm.to_vec(), sample_rate, channels).await;
        self.busy.store(false, Ordering::SeqCst);
        result
    }

    async fn run_stream(&self, pcm: Vec<i16>, sample_rate: u32, channels: u16) -> Result<(), PlaybackError> {
        let cancelled = self.cancelled.clone();

        let handle = tokio::task::spawn_blocking(move || -> Result<(), PlaybackError> {
            let host = cpal::default_host();
            let device = host.default_output_device().ok_or(PlaybackError::NoDevice)?;

            let config = cpal::StreamConfig {
                channels,
                sample_rate: cpal::SampleRate(sample_rate),
                buffer_size: cpal::BufferSize::Default,
            };

            let pcm = Arc::new(pcm);
            let pcm_for_stream = pcm.clone();
            let position = Arc::new(AtomicUsize::new(0));
            let position_for_stream = position.clone();

            let stream = device
                .build_output_stream(
                    &config,
                    move |data: &mut [i16], _| {
                        for sample in data.iter_mut() {
                            let idx = position_for_stream.fetch_add(1, Ordering::SeqCst);
                            *sample = pcm_for_stream.get(idx).copied().unwrap_or(0);
                        }
                    },
                    move |err| log::error!("playback stream error: {err}"),
                    None,
                )
                .map_err(|e| PlaybackError::UnsupportedConfig(e.to_string()))?;

            stream.play().map_err(|e| PlaybackError::Device(e.to_string()))?;

            // Poll in small increments instead of sleeping for the whole
            // estimated duration up front, so `cancel()` (which flips
            // `cancelled`) is observed within the barge-in budget rather
            // than only after playback would have finished anyway.
            let total_samples = pcm.len();
            loop {
                if cancelled.load(Ordering::SeqCst) {
                    break;
                }
                if position.load(Ordering::SeqCst) >= total_samples {
                    break;
                }
                std::thread::sleep(CANCEL_POLL_INTERVAL);
            }
            drop(stream);
            Ok(())
        });

        handle.await.map_err(|e| PlaybackError::Device(e.to_string()))??;
        Ok(())
    }

    /// Aborts playback promptly: flips the flag the blocking stream
    /// thread's poll loop observes within one `CANCEL_POLL_INTERVAL`,
    /// dropping the cpal stream and stopping output inside the <=50ms
    /// barge-in budget (spec.md §4.10, §8 S5).
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.busy.store(false, Ordering::SeqCst);
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }
}

impl Default for PlaybackDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlaybackOps for PlaybackDriver {
    async fn play_container_blocking(&self, blob: &[u8]) -> Result<(), PlaybackError> {
        PlaybackDriver::play_container_blocking(self, blob).await
    }

    fn cancel(&self) {
        PlaybackDriver::cancel(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle() {
        let driver = PlaybackDriver::new();
        assert!(!driver.is_busy());
    }

    #[tokio::test]
    async fn concurrent_play_attempt_is_busy() {
        let driver = Arc::new(PlaybackDriver::new());
        driver.busy.store(true, Ordering::SeqCst);
        let result = driver.play_pcm_blocking(&[0; 10], 16_000, 1).await;
        assert!(matches!(result, Err(PlaybackError::Busy)));
    }
}
