//! DSP front-end (C2, spec.md §4.2).
//!
//! Collapses N-channel `PcmFrame`s to enhanced single-channel output
//! through AEC → BSS/NS → VAD, and optionally a parallel wakeword
//! detector. Exposes the feed/fetch contract spec.md requires: `feed`
//! appends to an internal accumulator and advances processing one
//! `feed_chunksize` at a time; `fetch` drains already-processed chunks
//! without ever blocking on I/O.

pub mod aec;
pub mod bss_ns;
pub mod vad;
pub mod wakeword;

use crate::types::{EnhancedFrame, PcmFrame};
use aec::AcousticEchoCanceller;
use bss_ns::BlindSourceSeparator;
use std::collections::VecDeque;
use thiserror::Error;
use vad::{EnergyVad, Vad, VadConfig};
use wakeword::{DegradedWakewordDetector, WakewordDetector};

#[derive(Error, Debug)]
pub enum DspError {
    #[error("feed chunk size must be > 0")]
    InvalidChunkSize,
    #[error("channel count must be >= 1")]
    InvalidChannelCount,
    #[error("frame channel count {got} does not match configured {expected}")]
    ChannelMismatch { expected: u16, got: u16 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStatus {
    /// Accumulator received the samples but has not reached a full chunk.
    Buffered,
    /// Accumulator reached one or more full chunks; `fetch` will yield them.
    Advanced,
}

#[derive(Debug, Clone)]
pub struct DspConfig {
    pub channels: u16,
    pub sample_rate: u32,
    /// Samples per channel consumed per processing step.
    pub feed_chunksize: usize,
    pub vad: VadConfig,
    pub wake_cooldown_ms: u64,
    pub wakeword_enabled: bool,
    /// Path to the tflite wakeword model, used only when built with the
    /// `wakeword_tflite` feature. `None` (or load failure) falls back to
    /// `DegradedWakewordDetector`.
    pub wakeword_model_path: Option<std::path::PathBuf>,
    pub wakeword_confidence_threshold: f32,
}

impl Default for DspConfig {
    fn default() -> Self {
        DspConfig {
            channels: 1,
            sample_rate: 16_000,
            feed_chunksize: 1_280,
            vad: VadConfig::default(),
            wake_cooldown_ms: 2_000,
            wakeword_enabled: true,
            wakeword_model_path: None,
            wakeword_confidence_threshold: 0.5,
        }
    }
}

/// Stateful AEC → BSS/NS → VAD → optional wakeword pipeline.
///
/// Construction never fails outright: if any stage cannot be built from
/// `config` the front end falls back to degraded pass-through (downmix
/// by averaging, energy-based VAD, wakeword disabled), reported once
/// here rather than per frame (spec.md §4.2 "Failure").
pub struct DspFrontEnd {
    config: DspConfig,
    aec: AcousticEchoCanceller,
    bss_ns: BlindSourceSeparator,
    vad: Box<dyn Vad + Send>,
    wakeword: Box<dyn WakewordDetector + Send>,
    accumulator: Vec<i16>,
    ready: VecDeque<EnhancedFrame>,
    degraded: bool,
}

impl DspFrontEnd {
    pub fn new(config: DspConfig) -> Result<Self, DspError> {
        if config.feed_chunksize == 0 {
            return Err(DspError::InvalidChunkSize);
        }
        if config.channels == 0 {
            return Err(DspError::InvalidChannelCount);
        }

        let (aec, bss_ns, vad, wakeword, degraded) = match AcousticEchoCanceller::new(&config) {
            Ok(aec) => {
                let bss_ns = BlindSourceSeparator::new(&config);
                let vad: Box<dyn Vad + Send> = Box::new(EnergyVad::new(config.vad.clone()));
                let wakeword: Box<dyn WakewordDetector + Send> = if config.wakeword_enabled {
                    build_wakeword_detector(&config)
                } else {
                    Box::new(wakeword::DisabledWakewordDetector)
                };
                (aec, bss_ns, vad, wakeword, false)
            }
            Err(_) => {
                log::warn!("DSP front-end: AEC unavailable, falling back to degraded pass-through mode");
                (
                    AcousticEchoCanceller::passthrough(),
                    BlindSourceSeparator::passthrough(),
                    Box::new(EnergyVad::new(config.vad.clone())) as Box<dyn Vad + Send>,
                    Box::new(wakeword::DisabledWakewordDetector) as Box<dyn WakewordDetector + Send>,
                    true,
                )
            }
        };

        if degraded {
            log::warn!("DSP front-end constructed in degraded mode: downmix-average, energy VAD, wakeword disabled");
        }

        Ok(DspFrontEnd {
            config,
            aec,
            bss_ns,
            vad,
            wakeword,
            accumulator: Vec::new(),
            ready: VecDeque::new(),
            degraded,
        })
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Appends `frame`'s samples to the internal accumulator. Idempotent
    /// on empty frames. Advances processing by whole `feed_chunksize`
    /// steps, preserving input order (spec.md §4.2 "Ordering").
    pub fn feed(&mut self, frame: PcmFrame) -> Result<FeedStatus, DspError> {
        if frame.channels != self.config.channels {
            return Err(DspError::ChannelMismatch {
                expected: self.config.channels,
                got: frame.channels,
            });
        }
        if frame.samples.is_empty() {
            return Ok(FeedStatus::Buffered);
        }

        self.accumulator.extend_from_slice(&frame.samples);

        let chunk_len = self.config.feed_chunksize * self.config.channels as usize;
        let mut advanced = false;
        while self.accumulator.len() >= chunk_len {
            let chunk: Vec<i16> = self.accumulator.drain(0..chunk_len).collect();
            let enhanced = self.process_chunk(&chunk);
            self.ready.push_back(enhanced);
            advanced = true;
        }

        Ok(if advanced {
            FeedStatus::Advanced
        } else {
            FeedStatus::Buffered
        })
    }

    fn process_chunk(&mut self, chunk: &[i16]) -> EnhancedFrame {
        let downmixed = downmix(chunk, self.config.channels);
        let echo_cancelled = self.aec.process(&downmixed);
        let (enhanced, trigger_channel) = self.bss_ns.process(&echo_cancelled);

        let vad_active = self.vad.update(&enhanced);
        let wakeword_index = if self.config.wakeword_enabled {
            self.wakeword.detect(&enhanced)
        } else {
            None
        };

        EnhancedFrame {
            samples: enhanced,
            sample_rate: self.config.sample_rate,
            vad_active,
            wakeword_index,
            trigger_channel,
        }
    }

    /// Returns the next processed chunk if available. Never blocks.
    pub fn fetch(&mut self) -> Option<EnhancedFrame> {
        self.ready.pop_front()
    }
}

/// Builds the real tflite-backed detector when compiled with
/// `wakeword_tflite` and a model path is configured, falling back to
/// the degraded energy detector on missing path or load failure so a
/// bad model file degrades the wakeword stage rather than the whole
/// front end.
#[cfg(feature = "wakeword_tflite")]
fn build_wakeword_detector(config: &DspConfig) -> Box<dyn WakewordDetector + Send> {
    if let Some(path) = &config.wakeword_model_path {
        match wakeword::tflite::TfliteWakewordDetector::load(
            path,
            config.wakeword_confidence_threshold,
            config.wake_cooldown_ms,
        ) {
            Ok(detector) => return Box::new(detector),
            Err(e) => log::warn!(
                "DSP front-end: tflite wakeword model load failed ({e}), falling back to degraded detector"
            ),
        }
    }
    Box::new(DegradedWakewordDetector::new(config.wake_cooldown_ms))
}

#[cfg(not(feature = "wakeword_tflite"))]
fn build_wakeword_detector(config: &DspConfig) -> Box<dyn WakewordDetector + Send> {
    Box::new(DegradedWakewordDetector::new(config.wake_cooldown_ms))
}

/// Averages interleaved channels down to mono. With one channel this is
/// a pass-through copy.
fn downmix(interleaved: &[i16], channels: u16) -> Vec<i16> {
    let channels = channels.max(1) as usize;
    if channels == 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks(channels)
        .map(|frame| {
            let sum: i32 = frame.iter().map(|&s| s as i32).sum();
            (sum / frame.len() as i32) as i16
        })
        .collect()
}
