//! Capture source (C1, spec.md §4.1).
//!
//! Pulls interleaved multichannel PCM frames from the codec at a fixed
//! sample rate. The capture loop holds an exclusive lock on the codec
//! while reading; concurrent readers fail with `Busy`. Built on `cpal`,
//! matching the teacher's `src/main.rs`/`audio_capture.rs` input-device
//! handling, but exposing a pull-based `next_frame` rather than the
//! teacher's callback-driven stream directly, since the rest of this
//! core's pipeline (C2's feed/fetch contract) is pull-based too.

use crate::types::PcmFrame;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("codec is busy with another reader")]
    Busy,
    #[error("capture underflow: no frame within {0:?}")]
    Underflow(Duration),
    #[error("capture driver error: {0}")]
    DriverError(String),
}

/// Lists available input device names, for `--list-devices` (Supplemented
/// Feature B.1).
pub fn list_input_devices() -> Result<Vec<String>, CaptureError> {
    let host = cpal::default_host();
    let devices = host.input_devices().map_err(|e| CaptureError::DriverError(e.to_string()))?;
    Ok(devices.filter_map(|d| d.name().ok()).collect())
}

pub struct CaptureConfig {
    pub device_name: Option<String>,
    pub sample_rate: u32,
    pub channels: u16,
    pub frame_samples: usize,
    pub underflow_timeout: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        CaptureConfig {
            device_name: None,
            sample_rate: 16_000,
            channels: 1,
            frame_samples: 1_280,
            underflow_timeout: Duration::from_secs(2),
        }
    }
}

/// Pull-based capture source. The underlying `cpal` stream runs on its
/// own thread and pushes frames into a bounded channel; `next_frame`
/// is the sole reader, giving the "exclusive lock while reading"
/// contract via `locked` rather than a literal mutex around hardware
/// I/O (cpal streams are not re-entrant from multiple pull sites
/// anyway).
pub struct CaptureSource {
    rx: Mutex<mpsc::Receiver<Vec<i16>>>,
    locked: AtomicBool,
    config: CaptureConfig,
    sequence: Mutex<u64>,
    /// Frames the stream callback dropped (queue full) since the last
    /// successful read; folded into the next frame's `sequence` jump
    /// instead of being silently discarded (spec.md §4.1).
    dropped: Arc<AtomicU64>,
    _stream: cpal::Stream,
}

impl CaptureSource {
    pub fn start(config: CaptureConfig) -> Result<Self, CaptureError> {
        let host = cpal::default_host();
        let device = match &config.device_name {
            Some(name) => host
                .input_devices()
                .map_err(|e| CaptureError::DriverError(e.to_string()))?
                .find(|d| d.name().map(|n| &n == name).unwrap_or(false))
                .ok_or_else(|| CaptureError::DriverError(format!("device '{name}' not found")))?,
            None => host
                .default_input_device()
                .ok_or_else(|| CaptureError::DriverError("no default input device".to_string()))?,
        };

        let stream_config = cpal::StreamConfig {
            channels: config.channels,
            sample_rate: cpal::SampleRate(config.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let (tx, rx) = mpsc::channel::<Vec<i16>>(8);
        let frame_samples = config.frame_samples;
        let channels = config.channels as usize;
        let accumulator = Arc::new(Mutex::new(Vec::<i16>::new()));
        let dropped = Arc::new(AtomicU64::new(0));
        let dropped_for_stream = dropped.clone();

        let stream = device
            .build_input_stream(
                &stream_config,
                move |data: &[i16], _| {
                    let mut buf = accumulator.lock().unwrap();
                    buf.extend_from_slice(data);
                    let chunk_len = frame_samples * channels;
                    while buf.len() >= chunk_len {
                        let chunk: Vec<i16> = buf.drain(0..chunk_len).collect();
                        if tx.try_send(chunk).is_err() {
                            dropped_for_stream.fetch_add(1, Ordering::Relaxed);
                            log::warn!("capture source: frame queue full, dropping frame");
                        }
                    }
                },
                |err| log::error!("capture stream error: {err}"),
                None,
            )
            .map_err(|e| CaptureError::DriverError(e.to_string()))?;

        stream.play().map_err(|e| CaptureError::DriverError(e.to_string()))?;

        Ok(CaptureSource {
            rx: Mutex::new(rx),
            locked: AtomicBool::new(false),
            config,
            sequence: Mutex::new(0),
            dropped,
            _stream: stream,
        })
    }

    /// Pulls the next frame, or a `Busy`/`Underflow` error. Loss between
    /// calls is surfaced as a `gap` on the returned frame rather than
    /// silently padded (spec.md §4.1).
    pub async fn next_frame(&self) -> Result<PcmFrame, CaptureError> {
        if self.locked.swap(true, Ordering::SeqCst) {
            return Err(CaptureError::Busy);
        }
        let result = self.read_frame().await;
        self.locked.store(false, Ordering::SeqCst);
        result
    }

    async fn read_frame(&self) -> Result<PcmFrame, CaptureError> {
        let mut rx = self.rx.lock().unwrap();
        let samples = tokio::time::timeout(self.config.underflow_timeout, rx.recv())
            .await
            .map_err(|_| CaptureError::Underflow(self.config.underflow_timeout))?
            .ok_or_else(|| CaptureError::DriverError("capture stream ended".to_string()))?;

        // Fold any frames the callback dropped since the last read into
        // this frame's sequence jump, so a gap of N frames advances the
        // counter by N+1 instead of being silently absorbed.
        let lost = self.dropped.swap(0, Ordering::Relaxed);
        let mut sequence = self.sequence.lock().unwrap();
        *sequence += 1 + lost;

        Ok(PcmFrame {
            samples,
            channels: self.config.channels,
            sample_rate: self.config.sample_rate,
            sequence: *sequence,
            captured_at: Instant::now(),
        })
    }
}
