//! Configuration surface (spec.md §6).
//!
//! Two halves, following the teacher's split in `src/config.rs`: secrets
//! (cloud credentials, loaded from the environment via `dotenvy` and
//! held behind `secrecy::SecretBox`) and behavioral knobs (sample rate,
//! cooldowns, VAD thresholds, ...), which are plain `clap`-parsed CLI
//! flags with the spec's stated defaults.

use clap::Parser;
use secrecy::{ExposeSecret, SecretBox};
use std::env;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Cloud service credentials. Never logged or `Debug`-printed whole.
pub struct ApiConfig {
    stt_key: SecretBox<String>,
    llm_key: SecretBox<String>,
    tts_key: SecretBox<String>,
}

impl ApiConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            stt_key: Self::load_key("VOICE_CORE_STT_API_KEY")?,
            llm_key: Self::load_key("VOICE_CORE_LLM_API_KEY")?,
            tts_key: Self::load_key("VOICE_CORE_TTS_API_KEY")?,
        })
    }

    fn load_key(env_var: &str) -> Result<SecretBox<String>, ConfigError> {
        let key = env::var(env_var).map_err(|_| ConfigError::MissingEnvVar(env_var.to_string()))?;
        if key.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: env_var.to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(SecretBox::new(Box::new(key)))
    }

    pub fn stt_key(&self) -> &str {
        self.stt_key.expose_secret()
    }
    pub fn llm_key(&self) -> &str {
        self.llm_key.expose_secret()
    }
    pub fn tts_key(&self) -> &str {
        self.tts_key.expose_secret()
    }
}

/// Behavioral knobs recognized by the pipeline (spec.md §6).
#[derive(Parser, Debug, Clone)]
#[command(name = "voice-core", about = "Far-field voice interaction core")]
pub struct PipelineConfig {
    /// Codec sample rate in Hz; must divide evenly into the frame size.
    #[arg(long, default_value_t = 16_000)]
    pub sample_rate_hz: u32,

    /// DSP frame cadence target, in milliseconds.
    #[arg(long, default_value_t = 80)]
    pub frame_size_ms: u32,

    /// Non-streaming capture length, in milliseconds.
    #[arg(long, default_value_t = 2_000)]
    pub capture_ms: u32,

    /// Wakeword debounce window.
    #[arg(long, default_value_t = 2_000)]
    pub wake_cooldown_ms: u64,

    /// Interaction cooldown between consecutive utterances.
    #[arg(long, default_value_t = 0)]
    pub cooldown_ms: u64,

    #[arg(long, default_value_t = true)]
    pub enable_vad: bool,

    /// Energy threshold used when a trained VAD is unavailable.
    #[arg(long, default_value_t = 100.0)]
    pub vad_threshold: f32,

    #[arg(long, default_value = "default")]
    pub tts_voice: String,

    #[arg(long, default_value_t = false)]
    pub use_realtime_streaming: bool,

    #[arg(long, default_value_t = false)]
    pub skip_wake_word: bool,

    #[arg(long, default_value_t = true)]
    pub enable_wakenet_local: bool,

    #[arg(long, default_value = "hey_voice_core")]
    pub wakenet_model: String,

    #[arg(long, default_value_t = 0.5)]
    pub wakenet_threshold: f32,

    /// Configured wake word, scrubbed from transcripts before routing
    /// (spec.md §4.5).
    #[arg(long, default_value = "hey voice core")]
    pub wake_word: String,

    /// Enable verbose (debug) logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Audio device name; default device used when absent.
    #[arg(short, long)]
    pub device: Option<String>,

    /// List available audio input devices and exit.
    #[arg(long)]
    pub list_devices: bool,

    /// Development mode: log the negotiated input device and stream
    /// config at startup instead of assuming it matches `sample_rate_hz`
    /// (SPEC_FULL.md §B.1; mirrors the teacher's `--dev-mode` auto-detect
    /// ergonomics in `src/main.rs`).
    #[arg(long)]
    pub dev_mode: bool,

    /// Print the current device-state snapshot as canonical JSON and
    /// exit, without starting the pipeline (SPEC_FULL.md §B.4).
    #[arg(long)]
    pub dump_device_state: bool,

    /// Periodic metrics snapshot log interval.
    #[arg(long, default_value_t = 30_000)]
    pub metrics_interval_ms: u64,
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate_hz == 0 {
            return Err(ConfigError::InvalidValue {
                field: "sample_rate_hz".to_string(),
                reason: "must be > 0".to_string(),
            });
        }
        let frame_samples = (self.sample_rate_hz as u64 * self.frame_size_ms as u64) / 1000;
        if frame_samples == 0 {
            return Err(ConfigError::InvalidValue {
                field: "frame_size_ms".to_string(),
                reason: "sample_rate_hz must divide into a non-zero frame size".to_string(),
            });
        }
        Ok(())
    }

    pub fn max_utterance_samples(&self) -> usize {
        5 * self.sample_rate_hz as usize
    }

    pub fn min_utterance_samples(&self) -> usize {
        // Matches the teacher's convention of expressing durations in
        // whole seconds-fractions rather than magic sample counts.
        (self.sample_rate_hz as f32 * 0.4) as usize
    }

    pub fn wake_cooldown(&self) -> Duration {
        Duration::from_millis(self.wake_cooldown_ms)
    }

    pub fn metrics_interval(&self) -> Duration {
        Duration::from_millis(self.metrics_interval_ms)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        // clap::Parser::parse_from(&[] as &[&str]) would require a
        // binary name; build defaults directly instead.
        PipelineConfig {
            sample_rate_hz: 16_000,
            frame_size_ms: 80,
            capture_ms: 2_000,
            wake_cooldown_ms: 2_000,
            cooldown_ms: 0,
            enable_vad: true,
            vad_threshold: 100.0,
            tts_voice: "default".to_string(),
            use_realtime_streaming: false,
            skip_wake_word: false,
            enable_wakenet_local: true,
            wakenet_model: "hey_voice_core".to_string(),
            wakenet_threshold: 0.5,
            wake_word: "hey voice core".to_string(),
            verbose: false,
            device: None,
            list_devices: false,
            dev_mode: false,
            dump_device_state: false,
            metrics_interval_ms: 30_000,
        }
    }
}
