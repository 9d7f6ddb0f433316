//! Interaction scheduler (C5, spec.md §4.5).
//!
//! The central state machine: IDLE → LISTENING → THINKING → SPEAKING →
//! IDLE, with ERROR recovery, cancellation, and barge-in. Re-architects
//! the teacher's static-depth-counter tool-call recursion guard
//! (DESIGN NOTES §9) as the explicit one-iteration loop below, and
//! reuses `tokio_util::sync::CancellationToken` exactly as the
//! teacher's `llm/integration.rs` does for its per-interaction
//! cancellation.

use crate::cloud::client::CloudOps;
use crate::device_state::DeviceStateStore;
use crate::intent::{self, Decision};
use crate::led::{LedDriver, LedProjector};
use crate::metrics::Metrics;
use crate::playback::PlaybackOps;
use crate::tools::ToolExecutor;
use crate::types::{InteractionState, LlmReply, ToolCall, ToolResult, Utterance};
use crate::wake_sink::WakeEvent;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("already handling an interaction")]
    Busy,
}

/// Internal outcome of one interaction leg. `Cancelled` (barge-in,
/// shutdown) is deliberately distinct from `Failed` (STT/LLM/TTS/
/// playback fault): only the latter counts toward `interaction_errors`
/// and triggers the ERROR LED flash (spec.md §4.5, §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InteractionError {
    Cancelled,
    Failed,
}

pub struct SchedulerConfig {
    pub wake_word: String,
    pub tts_voice: String,
}

/// Owns the state machine and drives cloud round-trips. Generic over
/// the LED driver, cloud transport, and playback driver so tests can
/// substitute recording/canned stubs for all three (mirrors the
/// teacher's `STTService`/`LLMService`/`TTSService` trait boundaries in
/// `agent/src/services/mod.rs`).
pub struct Scheduler<D: LedDriver, C: CloudOps, P: PlaybackOps> {
    config: SchedulerConfig,
    state: Mutex<InteractionState>,
    cloud: Arc<C>,
    tools: Arc<ToolExecutor>,
    device_state: Arc<DeviceStateStore>,
    playback: Arc<P>,
    led: Mutex<LedProjector<D>>,
    metrics: Arc<Metrics>,
    /// Cancellation token for the in-flight interaction, if any. A
    /// wake during SPEAKING cancels this; a wake during THINKING is
    /// ignored per spec.md §4.5.
    interaction_token: Mutex<Option<CancellationToken>>,
    speaking: AtomicBool,
}

impl<D: LedDriver, C: CloudOps, P: PlaybackOps> Scheduler<D, C, P> {
    pub fn new(
        config: SchedulerConfig,
        cloud: Arc<C>,
        tools: Arc<ToolExecutor>,
        device_state: Arc<DeviceStateStore>,
        playback: Arc<P>,
        led: LedProjector<D>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Scheduler {
            config,
            state: Mutex::new(InteractionState::Idle),
            cloud,
            tools,
            device_state,
            playback,
            led: Mutex::new(led),
            metrics,
            interaction_token: Mutex::new(None),
            speaking: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> InteractionState {
        *self.state.lock().unwrap()
    }

    fn set_state(&self, state: InteractionState) {
        *self.state.lock().unwrap() = state;
        // LED side-effects are notified synchronously before any
        // blocking work (spec.md §4.5).
        self.led.lock().unwrap().on_state_change(state);
    }

    /// Main loop: drains utterances and wake events, at most one
    /// interaction in flight at a time (spec.md §4.5, §5).
    pub async fn run(
        self: Arc<Self>,
        mut utterances: mpsc::Receiver<Utterance>,
        mut wakes: mpsc::Receiver<WakeEvent>,
        shutdown: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    log::info!("scheduler: shutting down");
                    break;
                }
                Some(utterance) = utterances.recv() => {
                    self.clone().handle_utterance(utterance).await;
                }
                Some(wake) = wakes.recv() => {
                    self.clone().handle_wake(wake).await;
                }
                else => break,
            }
        }
    }

    async fn handle_wake(self: Arc<Self>, _wake: WakeEvent) {
        self.metrics.incr_wake_events();
        self.led.lock().unwrap().on_wake_detected();

        match self.state() {
            InteractionState::Speaking => {
                log::info!("scheduler: wake during SPEAKING, barging in");
                self.playback.cancel();
                if let Some(token) = self.interaction_token.lock().unwrap().take() {
                    token.cancel();
                }
                self.set_state(InteractionState::Idle);
            }
            InteractionState::Thinking => {
                log::debug!("scheduler: wake during THINKING, ignored");
            }
            _ => {}
        }
    }

    async fn handle_utterance(self: Arc<Self>, utterance: Utterance) {
        if self.state() != InteractionState::Idle {
            log::warn!("scheduler: busy, dropping utterance");
            self.metrics.incr_dropped_utterances();
            return;
        }

        let token = CancellationToken::new();
        *self.interaction_token.lock().unwrap() = Some(token.clone());

        self.set_state(InteractionState::Listening);
        self.set_state(InteractionState::Thinking);

        self.metrics.incr_interactions();
        let outcome = self.run_interaction(&utterance, &token).await;

        // A barge-in cancellation is not a failure (spec.md §4.5,
        // §7): only a genuine STT/LLM/TTS/playback fault counts toward
        // `interaction_errors` and gets the ERROR flash.
        if let Err(InteractionError::Failed) = outcome {
            self.metrics.incr_interaction_errors();
            self.set_state(InteractionState::Error);
            self.led.lock().unwrap().on_error();
        }

        *self.interaction_token.lock().unwrap() = None;
        self.set_state(InteractionState::Idle);
    }

    async fn run_interaction(
        &self,
        utterance: &Utterance,
        token: &CancellationToken,
    ) -> Result<(), InteractionError> {
        let transcript = tokio::select! {
            _ = token.cancelled() => return Err(InteractionError::Cancelled),
            result = self.cloud.stt(&utterance.samples, utterance.sample_rate) => result,
        };

        let transcript = match transcript {
            Ok(t) => {
                self.metrics.incr_stt_success();
                t
            }
            Err(e) => {
                log::warn!("scheduler: STT failed: {e}");
                self.metrics.incr_stt_failure();
                return Err(InteractionError::Failed);
            }
        };

        if !transcript.is_final {
            return Ok(());
        }

        let scrubbed = intent::scrub_wake_word(&transcript.text, &self.config.wake_word);

        // Intent router short-circuits common commands without a
        // network round-trip (spec.md §4.9). The confirmation is still
        // spoken through the normal THINKING->SPEAKING->IDLE leg: a
        // local decision skips the cloud, not the TTS/playback stage
        // (spec.md §8 S1).
        match intent::route(&scrubbed) {
            Decision::None => {}
            decision => {
                let confirmation = self.execute_local_decision(decision);
                return self.speak(&confirmation, token).await;
            }
        }

        let reply = tokio::select! {
            _ = token.cancelled() => return Err(InteractionError::Cancelled),
            result = self.cloud.llm(&scrubbed, Some(self.tools.function_declarations())) => result,
        };

        let speech_text = match reply {
            Ok(LlmReply::Text(text)) => text,
            Ok(LlmReply::ToolCall { name, arguments }) => {
                self.run_tool_round_trip(name, arguments, &scrubbed, token).await?
            }
            Err(e) => {
                log::warn!("scheduler: LLM call failed: {e}");
                return Err(InteractionError::Failed);
            }
        };

        self.speak(&speech_text, token).await
    }

    /// Executes exactly one tool call, feeds the result back to the
    /// LLM, and bounds recursion to that single follow-up: a second
    /// tool call in the follow-up response is not executed (spec.md
    /// §4.5 "Tool-call recursion", §9 DESIGN NOTES).
    async fn run_tool_round_trip(
        &self,
        name: String,
        arguments: serde_json::Value,
        original_transcript: &str,
        token: &CancellationToken,
    ) -> Result<String, InteractionError> {
        let call = ToolCall { name, arguments };
        let tool_result = match self.tools.execute(&call) {
            Ok(result) => result,
            Err(e) => ToolResult::Error(e.to_string()),
        };

        let follow_up_prompt = format!(
            "The user asked: \"{original_transcript}\". Tool '{}' returned: {}",
            call.name,
            tool_result.to_canonical_string()
        );

        let follow_up = tokio::select! {
            _ = token.cancelled() => return Err(InteractionError::Cancelled),
            result = self.cloud.llm(&follow_up_prompt, None) => result,
        };

        match follow_up {
            Ok(LlmReply::Text(text)) => Ok(text),
            Ok(LlmReply::ToolCall { .. }) => {
                log::info!("scheduler: second tool call in follow-up ignored (recursion bound = 1)");
                Ok(fallback_acknowledgement(&tool_result))
            }
            Err(e) => {
                log::warn!("scheduler: follow-up LLM call failed: {e}");
                Err(InteractionError::Failed)
            }
        }
    }

    async fn speak(&self, text: &str, token: &CancellationToken) -> Result<(), InteractionError> {
        let tts_bytes = tokio::select! {
            _ = token.cancelled() => return Err(InteractionError::Cancelled),
            result = self.cloud.tts(text, &self.config.tts_voice) => result,
        };

        let tts_bytes = match tts_bytes {
            Ok(bytes) => {
                self.metrics.incr_tts_success();
                bytes
            }
            Err(e) => {
                log::warn!("scheduler: TTS failed: {e}");
                self.metrics.incr_tts_failure();
                return Err(InteractionError::Failed);
            }
        };

        self.set_state(InteractionState::Speaking);
        self.speaking.store(true, Ordering::SeqCst);
        self.device_state.set_playing(true);

        let result = tokio::select! {
            _ = token.cancelled() => {
                self.playback.cancel();
                Err(InteractionError::Cancelled)
            }
            result = self.playback.play_container_blocking(&tts_bytes) => {
                result.map_err(|e| {
                    log::warn!("scheduler: playback failed: {e}");
                    InteractionError::Failed
                })
            }
        };

        self.device_state.set_playing(false);
        self.speaking.store(false, Ordering::SeqCst);
        result
    }

    /// Applies a locally-routed decision's device-state side effect and
    /// returns the confirmation text to speak (spec.md §8 S1: even a
    /// local decision is spoken back through TTS/playback).
    fn execute_local_decision(&self, decision: Decision) -> String {
        match decision {
            Decision::SpotifyPlay(query) => {
                log::info!("scheduler: spotify play '{query}' (local, no cloud round-trip)");
                self.metrics.incr_spotify_play();
                format!("Playing {query}.")
            }
            Decision::SpotifyPause => {
                self.metrics.incr_spotify_pause();
                "Pausing.".to_string()
            }
            Decision::SpotifyResume => {
                self.metrics.incr_spotify_resume();
                "Resuming.".to_string()
            }
            Decision::SpotifyVolumeDelta(delta) => {
                self.metrics.incr_spotify_volume();
                if delta >= 0 {
                    "Turning the volume up.".to_string()
                } else {
                    "Turning the volume down.".to_string()
                }
            }
            Decision::LightsOn => {
                self.device_state.set_leds_enabled(true);
                "Turning the lights on.".to_string()
            }
            Decision::LightsOff => {
                self.device_state.set_leds_enabled(false);
                "Turning the lights off.".to_string()
            }
            Decision::None => String::new(),
        }
    }
}

fn fallback_acknowledgement(result: &ToolResult) -> String {
    match result {
        ToolResult::Success(_) => "Done.".to_string(),
        ToolResult::Error(msg) => format!("I couldn't complete that: {msg}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::client::CloudError;
    use crate::cloud::envelope::FunctionDeclaration;
    use crate::led::{LedError, LedPattern};
    use crate::playback::PlaybackError;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    struct NoopLed;
    impl LedDriver for NoopLed {
        fn show_pattern(&mut self, _pattern: LedPattern) -> Result<(), LedError> {
            Ok(())
        }
        fn flash(&mut self, _pattern: LedPattern) -> Result<(), LedError> {
            Ok(())
        }
    }

    /// Recording LED driver so tests can assert the exact state
    /// sequence (spec.md §8 S1's IDLE→LISTENING→THINKING→SPEAKING→IDLE).
    #[derive(Clone)]
    struct RecordingLed {
        patterns: Arc<Mutex<Vec<LedPattern>>>,
    }

    impl RecordingLed {
        fn new() -> Self {
            RecordingLed { patterns: Arc::new(Mutex::new(Vec::new())) }
        }
    }

    impl LedDriver for RecordingLed {
        fn show_pattern(&mut self, pattern: LedPattern) -> Result<(), LedError> {
            self.patterns.lock().unwrap().push(pattern);
            Ok(())
        }
        fn flash(&mut self, pattern: LedPattern) -> Result<(), LedError> {
            self.patterns.lock().unwrap().push(pattern);
            Ok(())
        }
    }

    /// Canned cloud stub driving the §8 end-to-end scenarios. Each leg
    /// reads a pre-scripted response and records how many times it was
    /// called.
    struct StubCloud {
        stt_result: Mutex<Option<Result<crate::types::Transcript, CloudError>>>,
        llm_results: Mutex<Vec<Result<LlmReply, CloudError>>>,
        tts_calls: Mutex<Vec<String>>,
        tts_result: Mutex<Option<Result<Vec<u8>, CloudError>>>,
        llm_call_count: AtomicUsize,
    }

    impl StubCloud {
        fn new() -> Self {
            StubCloud {
                stt_result: Mutex::new(None),
                llm_results: Mutex::new(Vec::new()),
                tts_calls: Mutex::new(Vec::new()),
                tts_result: Mutex::new(Some(Ok(vec![0u8; 48_000]))),
                llm_call_count: AtomicUsize::new(0),
            }
        }

        fn with_stt(self, transcript: &str) -> Self {
            *self.stt_result.lock().unwrap() = Some(Ok(crate::types::Transcript {
                text: transcript.to_string(),
                is_final: true,
            }));
            self
        }

        fn with_stt_failure(self) -> Self {
            *self.stt_result.lock().unwrap() = Some(Err(CloudError::ServerError(500)));
            self
        }

        fn with_llm_replies(self, replies: Vec<LlmReply>) -> Self {
            *self.llm_results.lock().unwrap() = replies.into_iter().map(Ok).collect();
            self
        }
    }

    #[async_trait]
    impl CloudOps for StubCloud {
        async fn stt(&self, _pcm: &[i16], _rate: u32) -> Result<crate::types::Transcript, CloudError> {
            self.stt_result.lock().unwrap().clone().unwrap_or(Err(CloudError::ServerError(500)))
        }

        async fn llm(
            &self,
            _prompt: &str,
            _tools: Option<Vec<FunctionDeclaration>>,
        ) -> Result<LlmReply, CloudError> {
            let idx = self.llm_call_count.fetch_add(1, Ordering::SeqCst);
            self.llm_results
                .lock()
                .unwrap()
                .get(idx)
                .cloned()
                .unwrap_or_else(|| Err(CloudError::ServerError(500)))
        }

        async fn tts(&self, text: &str, _voice: &str) -> Result<Vec<u8>, CloudError> {
            self.tts_calls.lock().unwrap().push(text.to_string());
            self.tts_result.lock().unwrap().clone().unwrap_or(Err(CloudError::ServerError(500)))
        }
    }

    impl Clone for CloudError {
        fn clone(&self) -> Self {
            match self {
                CloudError::Timeout(d) => CloudError::Timeout(*d),
                CloudError::Transport(_) => CloudError::ServerError(0),
                CloudError::Malformed(s) => CloudError::Malformed(s.clone()),
                CloudError::ServerError(s) => CloudError::ServerError(*s),
            }
        }
    }

    /// Playback stub that never touches real hardware; `cancel` flips a
    /// flag observable by the test and `play_container_blocking` can be
    /// made to hang until cancelled, to exercise barge-in (S5).
    struct StubPlayback {
        cancelled: Arc<AtomicBool>,
        hang: bool,
    }

    impl StubPlayback {
        fn new() -> Self {
            StubPlayback { cancelled: Arc::new(AtomicBool::new(false)), hang: false }
        }

        fn hanging() -> Self {
            StubPlayback { cancelled: Arc::new(AtomicBool::new(false)), hang: true }
        }
    }

    #[async_trait]
    impl PlaybackOps for StubPlayback {
        async fn play_container_blocking(&self, _blob: &[u8]) -> Result<(), PlaybackError> {
            if self.hang {
                loop {
                    if self.cancelled.load(Ordering::SeqCst) {
                        return Err(PlaybackError::Busy);
                    }
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
            }
            Ok(())
        }

        fn cancel(&self) {
            self.cancelled.store(true, Ordering::SeqCst);
        }
    }

    fn test_utterance() -> Utterance {
        Utterance { samples: vec![0; 16_000], sample_rate: 16_000, truncated: false }
    }

    fn make_scheduler<C: CloudOps, P: PlaybackOps>(
        cloud: Arc<C>,
        playback: Arc<P>,
        led: RecordingLed,
    ) -> Arc<Scheduler<RecordingLed, C, P>> {
        let device_state = Arc::new(DeviceStateStore::new());
        let tools = Arc::new(ToolExecutor::new(device_state.clone()));
        let metrics = Arc::new(Metrics::new());
        Arc::new(Scheduler::new(
            SchedulerConfig {
                wake_word: "naptick".to_string(),
                tts_voice: "default".to_string(),
            },
            cloud,
            tools,
            device_state,
            playback,
            LedProjector::new(led),
            metrics,
        ))
    }

    #[test]
    fn fallback_acknowledgement_reflects_success() {
        let ack = fallback_acknowledgement(&ToolResult::Success(serde_json::json!({"ok": true})));
        assert_eq!(ack, "Done.");
    }

    #[test]
    fn fallback_acknowledgement_reflects_error() {
        let ack = fallback_acknowledgement(&ToolResult::Error("bad args".to_string()));
        assert!(ack.contains("bad args"));
    }

    #[tokio::test]
    async fn new_scheduler_starts_idle() {
        let cloud = Arc::new(StubCloud::new());
        let playback = Arc::new(StubPlayback::new());
        let scheduler = make_scheduler(cloud, playback, RecordingLed::new());
        assert_eq!(scheduler.state(), InteractionState::Idle);
    }

    /// S1 (spec.md §8): a local-intent transcript never reaches the
    /// LLM — the router short-circuits it — but it still traverses
    /// THINKING→SPEAKING→IDLE and calls TTS exactly once with a
    /// synthesized confirmation, matching S1's literal "TTS stub
    /// returning a 48 000-byte blob, and state sequence IDLE →
    /// LISTENING → THINKING → SPEAKING → IDLE" for the "lights off"
    /// transcript.
    #[tokio::test]
    async fn s1_local_intent_resolves_without_cloud_round_trip() {
        let cloud = Arc::new(StubCloud::new().with_stt("turn the lights off"));
        let playback = Arc::new(StubPlayback::new());
        let led = RecordingLed::new();
        let scheduler = make_scheduler(cloud.clone(), playback, led.clone());

        scheduler.clone().handle_utterance(test_utterance()).await;

        assert_eq!(scheduler.state(), InteractionState::Idle);
        assert!(!scheduler.device_state.snapshot().leds.enabled);
        let patterns = led.patterns.lock().unwrap().clone();
        assert_eq!(
            patterns,
            vec![
                LedPattern::Listening,
                LedPattern::Thinking,
                LedPattern::Speaking,
                LedPattern::Idle
            ]
        );
        let tts_calls = cloud.tts_calls.lock().unwrap().clone();
        assert_eq!(tts_calls, vec!["Turning the lights off.".to_string()]);
    }

    /// S3: a transcript that forwards to the LLM, which issues exactly
    /// one tool call; the tool result feeds a follow-up LLM reply that
    /// is spoken via TTS exactly once.
    #[tokio::test]
    async fn s3_tool_call_round_trip_speaks_follow_up_text() {
        let cloud = Arc::new(
            StubCloud::new()
                .with_stt("what is the temperature")
                .with_llm_replies(vec![
                    LlmReply::ToolCall {
                        name: "get_temperature".to_string(),
                        arguments: serde_json::json!({}),
                    },
                    LlmReply::Text("It's about 22 and a half degrees.".to_string()),
                ]),
        );
        let playback = Arc::new(StubPlayback::new());
        let scheduler = make_scheduler(cloud.clone(), playback, RecordingLed::new());

        scheduler.clone().handle_utterance(test_utterance()).await;

        assert_eq!(scheduler.state(), InteractionState::Idle);
        assert_eq!(scheduler.metrics.snapshot().interaction_errors, 0);
        assert_eq!(scheduler.metrics.snapshot().interactions, 1);
        let tts_calls = cloud.tts_calls.lock().unwrap().clone();
        assert_eq!(tts_calls, vec!["It's about 22 and a half degrees.".to_string()]);
    }

    /// S4: a second tool call in the follow-up response is never
    /// executed; the spoken text falls back to an acknowledgement of
    /// the first tool's result.
    #[tokio::test]
    async fn s4_nested_tool_call_is_not_executed() {
        let cloud = Arc::new(
            StubCloud::new()
                .with_stt("what is the temperature")
                .with_llm_replies(vec![
                    LlmReply::ToolCall {
                        name: "get_temperature".to_string(),
                        arguments: serde_json::json!({}),
                    },
                    LlmReply::ToolCall {
                        name: "get_sensors".to_string(),
                        arguments: serde_json::json!({}),
                    },
                ]),
        );
        let playback = Arc::new(StubPlayback::new());
        let scheduler = make_scheduler(cloud.clone(), playback, RecordingLed::new());

        scheduler.clone().handle_utterance(test_utterance()).await;

        assert_eq!(scheduler.metrics.snapshot().interaction_errors, 0);
        let tts_calls = cloud.tts_calls.lock().unwrap().clone();
        assert_eq!(tts_calls, vec!["Done.".to_string()]);
    }

    /// S5: a wake event mid-SPEAKING cancels playback and returns to
    /// IDLE; the interaction token is observed by the hanging playback
    /// stub, proving cancellation actually propagates.
    #[tokio::test]
    async fn s5_wake_during_speaking_barges_in() {
        let cloud = Arc::new(
            StubCloud::new()
                .with_stt("what is the temperature")
                .with_llm_replies(vec![LlmReply::Text("some long answer".to_string())]),
        );
        let playback = Arc::new(StubPlayback::hanging());
        let scheduler = make_scheduler(cloud, playback.clone(), RecordingLed::new());

        let handle = tokio::spawn(scheduler.clone().handle_utterance(test_utterance()));

        // Wait until playback has actually started (state == Speaking).
        for _ in 0..200 {
            if scheduler.state() == InteractionState::Speaking {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(scheduler.state(), InteractionState::Speaking);

        scheduler
            .clone()
            .handle_wake(WakeEvent { wakeword_index: 0, detected_at: std::time::Instant::now() })
            .await;

        tokio::time::timeout(Duration::from_millis(200), handle).await.unwrap().unwrap();

        assert_eq!(scheduler.state(), InteractionState::Idle);
        assert!(playback.cancelled.load(Ordering::SeqCst));
        assert_eq!(scheduler.metrics.snapshot().wake_events, 1);
    }

    /// S6: an STT failure never reaches the router or TTS; metrics
    /// record exactly one failed interaction and the state recovers to
    /// IDLE via the ERROR flash.
    #[tokio::test]
    async fn s6_stt_failure_recovers_to_idle() {
        let cloud = Arc::new(StubCloud::new().with_stt_failure());
        let playback = Arc::new(StubPlayback::new());
        let scheduler = make_scheduler(cloud.clone(), playback, RecordingLed::new());

        scheduler.clone().handle_utterance(test_utterance()).await;

        assert_eq!(scheduler.state(), InteractionState::Idle);
        let snapshot = scheduler.metrics.snapshot();
        assert_eq!(snapshot.stt_failure, 1);
        assert_eq!(snapshot.interactions, 1);
        assert_eq!(snapshot.interaction_errors, 1);
        assert!(cloud.tts_calls.lock().unwrap().is_empty());
    }

    /// A second utterance arriving while non-IDLE is dropped and
    /// `dropped_utterances` increments by exactly one (spec.md §8
    /// boundary behavior).
    #[tokio::test]
    async fn second_utterance_while_busy_is_dropped() {
        let cloud = Arc::new(
            StubCloud::new()
                .with_stt("what is the temperature")
                .with_llm_replies(vec![LlmReply::Text("answer".to_string())]),
        );
        let playback = Arc::new(StubPlayback::hanging());
        let scheduler = make_scheduler(cloud, playback.clone(), RecordingLed::new());

        let handle = tokio::spawn(scheduler.clone().handle_utterance(test_utterance()));
        for _ in 0..200 {
            if scheduler.state() == InteractionState::Speaking {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        scheduler.clone().handle_utterance(test_utterance()).await;
        assert_eq!(scheduler.metrics.snapshot().dropped_utterances, 1);

        playback.cancel();
        tokio::time::timeout(Duration::from_millis(200), handle).await.unwrap().unwrap();
    }
}
