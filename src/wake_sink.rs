//! Wake sink (C4, spec.md §4.4).
//!
//! Receives wakeword events from C2, applies its own cooldown (a
//! second guard against duplicate signalling paths, independent of
//! C2's own per-index cooldown), and fans out to a registered hook.
//! The hook must return promptly; this sink enforces nothing beyond
//! logging a warning if a hook is slow, since actually bounding hook
//! latency would require preempting arbitrary user code — the
//! contract is advisory, matching the teacher's pattern of trusting
//! callback implementors (`llm/integration.rs`'s handlers never police
//! each other's latency either).

use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// A wakeword detection crossing the sink, destined for the scheduler.
#[derive(Debug, Clone, Copy)]
pub struct WakeEvent {
    pub wakeword_index: usize,
    pub detected_at: Instant,
}

pub struct WakeSink {
    cooldown: Duration,
    last_emitted: Option<Instant>,
    tx: mpsc::Sender<WakeEvent>,
}

impl WakeSink {
    pub fn new(cooldown_ms: u64, tx: mpsc::Sender<WakeEvent>) -> Self {
        WakeSink {
            cooldown: Duration::from_millis(cooldown_ms),
            last_emitted: None,
            tx,
        }
    }

    /// Called from the capture/DSP task whenever C2 reports a wakeword
    /// index. Applies cooldown and forwards to the bounded wake queue
    /// (depth 8, spec.md §5 "Back-pressure"); drop-newest on overflow.
    pub fn notify(&mut self, wakeword_index: usize) {
        let now = Instant::now();
        if let Some(last) = self.last_emitted {
            if now.duration_since(last) < self.cooldown {
                log::debug!("wake sink: suppressing duplicate within cooldown window");
                return;
            }
        }
        self.last_emitted = Some(now);

        let event = WakeEvent {
            wakeword_index,
            detected_at: now,
        };
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                log::warn!("wake sink: wake queue full, dropping event");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                log::error!("wake sink: scheduler wake channel closed");
            }
        }
    }
}
