//! Segment batcher (C3, spec.md §4.3).
//!
//! Maintains one growable buffer of enhanced samples, capped at
//! `max_utterance_samples`, and emits a completed `Utterance` when VAD
//! deasserts after enough accumulated speech. Delivery to the scheduler
//! goes through a depth-1 bounded queue (spec.md §4.3, §5
//! "Back-pressure"): a busy scheduler means the new utterance is
//! dropped and `dropped_utterances` increments, the deliberate
//! back-pressure policy chosen over queuing (spec.md §9 Open Questions).

use crate::metrics::Metrics;
use crate::types::{EnhancedFrame, Utterance};
use tokio::sync::mpsc;

pub struct SegmentBatcherConfig {
    pub min_utterance_samples: usize,
    pub max_utterance_samples: usize,
}

pub struct SegmentBatcher {
    config: SegmentBatcherConfig,
    buffer: Vec<i16>,
    sample_rate: u32,
    was_active: bool,
}

impl SegmentBatcher {
    pub fn new(config: SegmentBatcherConfig) -> Self {
        SegmentBatcher {
            config,
            buffer: Vec::new(),
            sample_rate: 16_000,
            was_active: false,
        }
    }

    /// Feeds one enhanced frame, returning a completed `Utterance` if
    /// this frame closed one (spec.md §4.3's four-way branch).
    pub fn push(&mut self, frame: &EnhancedFrame) -> Option<Utterance> {
        self.sample_rate = frame.sample_rate;
        let result = if frame.vad_active {
            if self.buffer.len() >= self.config.max_utterance_samples {
                Some(self.emit(true))
            } else {
                self.buffer.extend_from_slice(&frame.samples);
                if self.buffer.len() >= self.config.max_utterance_samples {
                    self.buffer.truncate(self.config.max_utterance_samples);
                    Some(self.emit(true))
                } else {
                    None
                }
            }
        } else if self.was_active {
            if self.buffer.len() >= self.config.min_utterance_samples {
                Some(self.emit(false))
            } else {
                self.buffer.clear();
                None
            }
        } else {
            None
        };

        self.was_active = frame.vad_active;
        result
    }

    fn emit(&mut self, truncated: bool) -> Utterance {
        let samples = std::mem::take(&mut self.buffer);
        Utterance {
            samples,
            sample_rate: self.sample_rate,
            truncated,
        }
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.was_active = false;
    }
}

/// Publishes completed utterances to the scheduler over a depth-1
/// channel, applying drop-newest back-pressure when the scheduler has
/// not yet drained the previous one.
pub struct UtteranceSink {
    tx: mpsc::Sender<Utterance>,
    metrics: std::sync::Arc<Metrics>,
}

impl UtteranceSink {
    pub fn new(tx: mpsc::Sender<Utterance>, metrics: std::sync::Arc<Metrics>) -> Self {
        UtteranceSink { tx, metrics }
    }

    pub fn publish(&self, utterance: Utterance) {
        match self.tx.try_send(utterance) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                log::warn!("segment batcher: scheduler busy, dropping utterance");
                self.metrics.incr_dropped_utterances();
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                log::error!("segment batcher: scheduler channel closed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(vad_active: bool, samples: Vec<i16>) -> EnhancedFrame {
        EnhancedFrame {
            samples,
            sample_rate: 16_000,
            vad_active,
            wakeword_index: None,
            trigger_channel: 0,
        }
    }

    #[test]
    fn short_blip_is_discarded() {
        let mut batcher = SegmentBatcher::new(SegmentBatcherConfig {
            min_utterance_samples: 100,
            max_utterance_samples: 1_000,
        });
        assert!(batcher.push(&frame(true, vec![1; 10])).is_none());
        assert!(batcher.push(&frame(false, vec![])).is_none());
    }

    #[test]
    fn sustained_speech_emits_on_vad_deassert() {
        let mut batcher = SegmentBatcher::new(SegmentBatcherConfig {
            min_utterance_samples: 5,
            max_utterance_samples: 1_000,
        });
        assert!(batcher.push(&frame(true, vec![1; 10])).is_none());
        let utterance = batcher.push(&frame(false, vec![])).unwrap();
        assert_eq!(utterance.samples.len(), 10);
        assert!(!utterance.truncated);
    }

    #[test]
    fn full_buffer_emits_truncated_and_resets() {
        let mut batcher = SegmentBatcher::new(SegmentBatcherConfig {
            min_utterance_samples: 1,
            max_utterance_samples: 10,
        });
        assert!(batcher.push(&frame(true, vec![1; 6])).is_none());
        let utterance = batcher.push(&frame(true, vec![1; 6])).unwrap();
        assert!(utterance.truncated);
        assert_eq!(utterance.samples.len(), 10);
        assert!(batcher.buffer.is_empty());
    }
}
