//! Metrics sink (C12, spec.md §4.12).
//!
//! A single `Mutex`-guarded counter block, following the teacher's
//! preference for `std::sync` primitives over bespoke atomics
//! (`agent/src/services/mod.rs` holds its service state the same way).
//! Every counter increments behind one lock so a snapshot never tears
//! across fields (spec.md invariant: "Periodic snapshot publishes an
//! immutable copy").

use serde::Serialize;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Default, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub wake_events: u64,
    pub simulated_wake_events: u64,
    pub button_events: u64,
    pub stt_success: u64,
    pub stt_failure: u64,
    pub tts_success: u64,
    pub tts_failure: u64,
    pub spotify_play: u64,
    pub spotify_pause: u64,
    pub spotify_resume: u64,
    pub spotify_volume: u64,
    pub interactions: u64,
    pub interaction_errors: u64,
    pub dropped_utterances: u64,
    /// Capture gaps signalled by C1 (Supplemented Feature B.2).
    pub capture_gaps: u64,
    pub timestamp_ms: u64,
}

#[derive(Default)]
struct Counters {
    wake_events: u64,
    simulated_wake_events: u64,
    button_events: u64,
    stt_success: u64,
    stt_failure: u64,
    tts_success: u64,
    tts_failure: u64,
    spotify_play: u64,
    spotify_pause: u64,
    spotify_resume: u64,
    spotify_volume: u64,
    interactions: u64,
    interaction_errors: u64,
    dropped_utterances: u64,
    capture_gaps: u64,
}

/// Process-wide metrics handle. Cheap to clone (wraps an `Arc` internally
/// via `Mutex` held by reference where callers share one instance).
pub struct Metrics {
    counters: Mutex<Counters>,
}

impl Metrics {
    pub fn new() -> Self {
        Metrics {
            counters: Mutex::new(Counters::default()),
        }
    }

    pub fn incr_wake_events(&self) {
        self.counters.lock().unwrap().wake_events += 1;
    }
    pub fn incr_simulated_wake_events(&self) {
        self.counters.lock().unwrap().simulated_wake_events += 1;
    }
    pub fn incr_button_events(&self) {
        self.counters.lock().unwrap().button_events += 1;
    }
    pub fn incr_stt_success(&self) {
        self.counters.lock().unwrap().stt_success += 1;
    }
    pub fn incr_stt_failure(&self) {
        self.counters.lock().unwrap().stt_failure += 1;
    }
    pub fn incr_tts_success(&self) {
        self.counters.lock().unwrap().tts_success += 1;
    }
    pub fn incr_tts_failure(&self) {
        self.counters.lock().unwrap().tts_failure += 1;
    }
    pub fn incr_spotify_play(&self) {
        self.counters.lock().unwrap().spotify_play += 1;
    }
    pub fn incr_spotify_pause(&self) {
        self.counters.lock().unwrap().spotify_pause += 1;
    }
    pub fn incr_spotify_resume(&self) {
        self.counters.lock().unwrap().spotify_resume += 1;
    }
    pub fn incr_spotify_volume(&self) {
        self.counters.lock().unwrap().spotify_volume += 1;
    }
    pub fn incr_interactions(&self) {
        self.counters.lock().unwrap().interactions += 1;
    }
    pub fn incr_interaction_errors(&self) {
        self.counters.lock().unwrap().interaction_errors += 1;
    }
    pub fn incr_dropped_utterances(&self) {
        self.counters.lock().unwrap().dropped_utterances += 1;
    }
    pub fn incr_capture_gaps(&self) {
        self.counters.lock().unwrap().capture_gaps += 1;
    }

    /// Immutable copy of every counter, field-consistent under one lock.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let c = self.counters.lock().unwrap();
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        MetricsSnapshot {
            wake_events: c.wake_events,
            simulated_wake_events: c.simulated_wake_events,
            button_events: c.button_events,
            stt_success: c.stt_success,
            stt_failure: c.stt_failure,
            tts_success: c.tts_success,
            tts_failure: c.tts_failure,
            spotify_play: c.spotify_play,
            spotify_pause: c.spotify_pause,
            spotify_resume: c.spotify_resume,
            spotify_volume: c.spotify_volume,
            interactions: c.interactions,
            interaction_errors: c.interaction_errors,
            dropped_utterances: c.dropped_utterances,
            capture_gaps: c.capture_gaps,
            timestamp_ms,
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_increments() {
        let m = Metrics::new();
        m.incr_wake_events();
        m.incr_wake_events();
        m.incr_dropped_utterances();
        let snap = m.snapshot();
        assert_eq!(snap.wake_events, 2);
        assert_eq!(snap.dropped_utterances, 1);
        assert_eq!(snap.stt_success, 0);
    }

    #[test]
    fn snapshot_is_immutable_copy() {
        let m = Metrics::new();
        let first = m.snapshot();
        m.incr_interactions();
        let second = m.snapshot();
        assert_eq!(first.interactions, 0);
        assert_eq!(second.interactions, 1);
    }
}
