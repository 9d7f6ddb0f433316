//! Shared data model (spec.md §3).
//!
//! Types here are intentionally plain data: the stages that produce
//! and consume them (C1-C12) own the behavior.

use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Interleaved 16-bit signed PCM captured from the codec.
///
/// Invariant: `samples.len() == frame_samples * channels as usize`,
/// stable for the lifetime of a capture session (spec.md §3).
#[derive(Debug, Clone)]
pub struct PcmFrame {
    pub samples: Vec<i16>,
    pub channels: u16,
    pub sample_rate: u32,
    /// Monotonically increasing; a jump greater than 1 means a `gap`
    /// was signalled instead of silently padded.
    pub sequence: u64,
    pub captured_at: Instant,
}

impl PcmFrame {
    pub fn frame_samples(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }
}

/// Single-channel enhanced PCM produced by the DSP front-end (C2).
#[derive(Debug, Clone)]
pub struct EnhancedFrame {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    pub vad_active: bool,
    /// `Some(index)` when a wakeword fired on this chunk, else `None`.
    pub wakeword_index: Option<usize>,
    /// Diagnostic only: which input microphone dominated BSS/NS.
    pub trigger_channel: usize,
}

/// A VAD-bounded segment of enhanced speech, ready for STT (C3).
#[derive(Debug, Clone)]
pub struct Utterance {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    pub truncated: bool,
}

/// Transcript returned by the cloud STT service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
    #[serde(rename = "final")]
    pub is_final: bool,
}

/// A structured function invocation issued by the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub arguments: serde_json::Value,
}

/// Result of executing a `ToolCall` (spec.md §3, §4.7).
#[derive(Debug, Clone)]
pub enum ToolResult {
    Success(serde_json::Value),
    Error(String),
}

impl ToolResult {
    /// Canonical string form, always representable in <= 512 bytes
    /// for realistic tool payloads (spec.md §3).
    pub fn to_canonical_string(&self) -> String {
        let value = match self {
            ToolResult::Success(v) => v.clone(),
            ToolResult::Error(msg) => serde_json::json!({ "error": msg }),
        };
        serde_json::to_string(&value).unwrap_or_else(|_| "{\"error\":\"encode failure\"}".into())
    }
}

/// One of the voice-interaction scheduler's states (spec.md §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionState {
    Idle,
    Listening,
    Thinking,
    Speaking,
    Error,
}

impl InteractionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionState::Idle => "idle",
            InteractionState::Listening => "listening",
            InteractionState::Thinking => "thinking",
            InteractionState::Speaking => "speaking",
            InteractionState::Error => "error",
        }
    }
}

/// Reply shape from the LLM client (spec.md §4.6).
#[derive(Debug, Clone)]
pub enum LlmReply {
    Text(String),
    ToolCall { name: String, arguments: serde_json::Value },
}
