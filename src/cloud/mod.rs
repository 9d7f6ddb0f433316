//! Cloud client (C6, spec.md §4.6): STT, LLM, and TTS over HTTPS/JSON.

pub mod client;
pub mod container;
pub mod envelope;

pub use client::{CloudClient, CloudClientConfig, CloudError, CloudOps};
