//! Black-box check of C3 → C8(metrics) wiring: a full buffer, its
//! delivery through the bounded queue, and the drop-newest
//! back-pressure policy (spec.md §8 boundary behavior, §9).

use std::sync::Arc;
use voice_core::metrics::Metrics;
use voice_core::segment::{SegmentBatcher, SegmentBatcherConfig, UtteranceSink};
use voice_core::types::EnhancedFrame;

fn frame(vad_active: bool, samples: Vec<i16>) -> EnhancedFrame {
    EnhancedFrame {
        samples,
        sample_rate: 16_000,
        vad_active,
        wakeword_index: None,
        trigger_channel: 0,
    }
}

/// S1-shaped happy path: sustained speech bracketed by silence yields
/// exactly one utterance within the expected sample-count window.
#[test]
fn sustained_utterance_is_delivered_to_the_queue() {
    let metrics = Arc::new(Metrics::new());
    let (tx, mut rx) = tokio::sync::mpsc::channel(1);
    let sink = UtteranceSink::new(tx, metrics.clone());

    let mut batcher = SegmentBatcher::new(SegmentBatcherConfig {
        min_utterance_samples: 8_000,  // 0.5s at 16kHz
        max_utterance_samples: 32_000, // 2.0s at 16kHz
    });

    // 1.5s of speech (24_000 samples at 16kHz).
    if let Some(u) = batcher.push(&frame(true, vec![800; 24_000])) {
        sink.publish(u);
    }
    // VAD deasserts: utterance closes.
    if let Some(u) = batcher.push(&frame(false, vec![])) {
        sink.publish(u);
    }

    let received = rx.try_recv().expect("utterance should have been queued");
    assert_eq!(received.samples.len(), 24_000);
    assert!(!received.truncated);
    assert_eq!(metrics.snapshot().dropped_utterances, 0);
}

/// S2-shaped short blip: below `min_utterance_samples`, nothing is
/// delivered and no metric moves.
#[test]
fn short_blip_emits_nothing_and_touches_no_metric() {
    let metrics = Arc::new(Metrics::new());
    let (tx, mut rx) = tokio::sync::mpsc::channel(1);
    let sink = UtteranceSink::new(tx, metrics.clone());

    let mut batcher = SegmentBatcher::new(SegmentBatcherConfig {
        min_utterance_samples: 6_400, // 0.4s at 16kHz
        max_utterance_samples: 32_000,
    });

    // 80ms blip (1_280 samples at 16kHz) surrounded by silence.
    assert!(batcher.push(&frame(true, vec![500; 1_280])).is_none());
    let closed = batcher.push(&frame(false, vec![]));
    assert!(closed.is_none());
    if let Some(u) = closed {
        sink.publish(u);
    }

    assert!(rx.try_recv().is_err());
    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.dropped_utterances, 0);
    assert_eq!(snapshot.stt_success, 0);
}

/// A second utterance arriving while the single queue slot is still
/// occupied is dropped and `dropped_utterances` increments by exactly
/// one (spec.md §8 boundary behavior).
#[test]
fn second_utterance_while_queue_full_is_dropped() {
    let metrics = Arc::new(Metrics::new());
    let (tx, rx) = tokio::sync::mpsc::channel(1);
    let sink = UtteranceSink::new(tx, metrics.clone());

    let mut batcher = SegmentBatcher::new(SegmentBatcherConfig {
        min_utterance_samples: 10,
        max_utterance_samples: 1_000,
    });

    batcher.push(&frame(true, vec![1; 20]));
    let first = batcher.push(&frame(false, vec![])).unwrap();
    sink.publish(first);

    batcher.push(&frame(true, vec![1; 20]));
    let second = batcher.push(&frame(false, vec![])).unwrap();
    sink.publish(second); // queue slot still full -> dropped

    assert_eq!(metrics.snapshot().dropped_utterances, 1);
    drop(rx); // keep the receiver alive for the whole test above this point
}
