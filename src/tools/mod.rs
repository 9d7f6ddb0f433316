//! Tool executor (C7, spec.md §4.7).
//!
//! A closed, versioned set of named tools, the only writer of C8.
//! Grounded on the teacher's real `llm/tools/mod.rs` `ToolRegistry`
//! (not the stale placeholder `llm/tools.rs` also present in the
//! source tree) but adapted to spec.md's result shape: plain
//! `ToolResult::Success(Value) | Error(String)` rather than the
//! teacher's `Success(Option<String>) | Escalation(Value)` split, since
//! this core's tool set never needs a second LLM-mediated escalation
//! branch distinct from an ordinary success payload.

pub mod handlers;

use crate::device_state::DeviceStateStore;
use crate::types::{ToolCall, ToolResult};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Unknown function: {0}")]
    NotFound(String),
    #[error("cancelled")]
    Cancelled,
}

pub struct ToolExecutor {
    store: Arc<DeviceStateStore>,
}

impl ToolExecutor {
    pub fn new(store: Arc<DeviceStateStore>) -> Self {
        ToolExecutor { store }
    }

    /// Dispatches a named tool call. Every call is logged with its name
    /// and canonical argument string before dispatch (spec.md §4.7).
    /// Unknown names return `{error}` without touching C8.
    pub fn execute(&self, call: &ToolCall) -> Result<ToolResult, ToolError> {
        log::info!(
            "tool executor: dispatching '{}' args={}",
            call.name,
            call.arguments
        );

        let result = match call.name.as_str() {
            "get_device_state" => handlers::get_device_state(&self.store),
            "get_health" => handlers::get_health(&self.store),
            "get_temperature" => handlers::get_temperature(&self.store),
            "get_sensors" => handlers::get_sensors(&self.store),
            "set_leds" => handlers::set_leds(&self.store, &call.arguments),
            "set_led_color" => handlers::set_led_color(&self.store, &call.arguments),
            "set_audio_mute" => handlers::set_audio_mute(&self.store, &call.arguments),
            other => {
                return Err(ToolError::NotFound(other.to_string()));
            }
        };

        Ok(result)
    }

    /// Function-declaration schema handed to the LLM client so it can
    /// issue well-formed tool calls (spec.md §4.6 `tools` array).
    pub fn function_declarations(&self) -> Vec<crate::cloud::envelope::FunctionDeclaration> {
        use crate::cloud::envelope::FunctionDeclaration;

        vec![
            FunctionDeclaration {
                name: "get_device_state".to_string(),
                description: "Reads the full device state snapshot".to_string(),
                parameters: None,
            },
            FunctionDeclaration {
                name: "get_health".to_string(),
                description: "Reads device health: status, free heap, active sensors".to_string(),
                parameters: None,
            },
            FunctionDeclaration {
                name: "get_temperature".to_string(),
                description: "Reads the current temperature and humidity".to_string(),
                parameters: None,
            },
            FunctionDeclaration {
                name: "get_sensors".to_string(),
                description: "Reads the sensors subtree".to_string(),
                parameters: None,
            },
            FunctionDeclaration {
                name: "set_leds".to_string(),
                description: "Enables or disables the LED ring".to_string(),
                parameters: Some(serde_json::json!({
                    "type": "object",
                    "properties": { "enabled": { "type": "boolean" } },
                    "required": ["enabled"],
                })),
            },
            FunctionDeclaration {
                name: "set_led_color".to_string(),
                description: "Sets all LED pixels to one RGB color".to_string(),
                parameters: Some(serde_json::json!({
                    "type": "object",
                    "properties": {
                        "red": { "type": "integer", "minimum": 0, "maximum": 255 },
                        "green": { "type": "integer", "minimum": 0, "maximum": 255 },
                        "blue": { "type": "integer", "minimum": 0, "maximum": 255 },
                    },
                    "required": ["red", "green", "blue"],
                })),
            },
            FunctionDeclaration {
                name: "set_audio_mute".to_string(),
                description: "Mutes or unmutes audio playback".to_string(),
                parameters: Some(serde_json::json!({
                    "type": "object",
                    "properties": { "muted": { "type": "boolean" } },
                    "required": ["muted"],
                })),
            },
        ]
    }
}
