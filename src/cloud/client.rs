//! Cloud client (C6, spec.md §4.6).
//!
//! Three HTTPS/JSON operations with independent deadlines. Built on
//! `reqwest` (the teacher's `agent/src/llm/client.rs` uses blocking
//! `ureq`; this core's tasks are async per spec.md §5, so `reqwest`
//! with its `json` feature is the natural ecosystem swap rather than
//! bringing `ureq` into an async runtime). No automatic retries here —
//! retry policy, such as it is, lives in the scheduler (spec.md §4.6,
//! §7).

use super::container;
use super::envelope::{self, FunctionDeclaration, LlmRequest};
use crate::types::{LlmReply, Transcript};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CloudError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("server returned status {0}")]
    ServerError(u16),
}

/// Trait boundary for the scheduler's cloud round-trips, mirroring the
/// teacher's `STTService`/`LLMService`/`TTSService` split in
/// `agent/src/services/mod.rs`. Lets the scheduler's state machine be
/// tested against a canned stub instead of a live network call.
#[async_trait]
pub trait CloudOps: Send + Sync {
    async fn stt(&self, pcm: &[i16], sample_rate: u32) -> Result<Transcript, CloudError>;
    async fn llm(
        &self,
        prompt: &str,
        tool_declarations: Option<Vec<FunctionDeclaration>>,
    ) -> Result<LlmReply, CloudError>;
    async fn tts(&self, text: &str, voice: &str) -> Result<Vec<u8>, CloudError>;
}

pub struct CloudClientConfig {
    pub stt_endpoint: String,
    pub llm_endpoint: String,
    pub tts_endpoint: String,
    pub stt_timeout: Duration,
    pub llm_timeout: Duration,
    pub tts_timeout: Duration,
}

impl Default for CloudClientConfig {
    fn default() -> Self {
        CloudClientConfig {
            stt_endpoint: "https://api.example.com/v1/stt".to_string(),
            llm_endpoint: "https://api.example.com/v1/llm".to_string(),
            tts_endpoint: "https://api.example.com/v1/tts".to_string(),
            stt_timeout: Duration::from_secs(10),
            llm_timeout: Duration::from_secs(15),
            tts_timeout: Duration::from_secs(15),
        }
    }
}

pub struct CloudClient {
    http: Client,
    config: CloudClientConfig,
    stt_key: String,
    llm_key: String,
    tts_key: String,
}

#[derive(Deserialize)]
struct SttResponse {
    text: String,
    #[serde(rename = "final", default = "default_true")]
    is_final: bool,
}

fn default_true() -> bool {
    true
}

impl CloudClient {
    pub fn new(config: CloudClientConfig, stt_key: String, llm_key: String, tts_key: String) -> Self {
        CloudClient {
            http: Client::new(),
            config,
            stt_key,
            llm_key,
            tts_key,
        }
    }
}

#[async_trait]
impl CloudOps for CloudClient {
    /// STT: wraps PCM in the canonical container, base64-encodes it,
    /// and posts for transcription.
    async fn stt(&self, pcm: &[i16], sample_rate: u32) -> Result<Transcript, CloudError> {
        let container_bytes = container::encode(pcm, sample_rate, 1);
        let payload = serde_json::json!({
            "audio_base64": base64::Engine::encode(
                &base64::engine::general_purpose::STANDARD,
                &container_bytes
            ),
            "sample_rate": sample_rate,
        });

        let resp = tokio::time::timeout(
            self.config.stt_timeout,
            self.http
                .post(&self.config.stt_endpoint)
                .bearer_auth(&self.stt_key)
                .json(&payload)
                .send(),
        )
        .await
        .map_err(|_| CloudError::Timeout(self.config.stt_timeout))??;

        if !resp.status().is_success() {
            return Err(CloudError::ServerError(resp.status().as_u16()));
        }

        let body: SttResponse = resp.json().await?;
        Ok(Transcript {
            text: body.text,
            is_final: body.is_final,
        })
    }

    /// LLM: posts the `contents`/`tools` envelope, returns either a
    /// text reply or a single structured tool call.
    async fn llm(
        &self,
        prompt: &str,
        tool_declarations: Option<Vec<FunctionDeclaration>>,
    ) -> Result<LlmReply, CloudError> {
        let mut request = LlmRequest::text_prompt(prompt);
        if let Some(decls) = tool_declarations {
            request = request.with_tools(decls);
        }

        let resp = tokio::time::timeout(
            self.config.llm_timeout,
            self.http
                .post(&self.config.llm_endpoint)
                .bearer_auth(&self.llm_key)
                .json(&request)
                .send(),
        )
        .await
        .map_err(|_| CloudError::Timeout(self.config.llm_timeout))??;

        if !resp.status().is_success() {
            return Err(CloudError::ServerError(resp.status().as_u16()));
        }

        let body = resp.text().await?;
        envelope::parse_reply(&body).map_err(|e| CloudError::Malformed(e.to_string()))
    }

    /// TTS: posts text + voice, returns the decoded/encoded PCM blob
    /// the playback driver consumes.
    async fn tts(&self, text: &str, voice: &str) -> Result<Vec<u8>, CloudError> {
        let payload: Value = serde_json::json!({ "text": text, "voice": voice });

        let resp = tokio::time::timeout(
            self.config.tts_timeout,
            self.http
                .post(&self.config.tts_endpoint)
                .bearer_auth(&self.tts_key)
                .json(&payload)
                .send(),
        )
        .await
        .map_err(|_| CloudError::Timeout(self.config.tts_timeout))??;

        if !resp.status().is_success() {
            return Err(CloudError::ServerError(resp.status().as_u16()));
        }

        Ok(resp.bytes().await?.to_vec())
    }
}
