//! Tool handler implementations (spec.md §4.7).
//!
//! Each handler validates its arguments strictly (wrong type, missing
//! field, or out-of-range value all fail without mutating state) and
//! either reads C8 or calls one of C8's section setters. Argument
//! extraction mirrors the teacher's `quick_actions.rs` style
//! (`arguments.get("x").and_then(|v| v.as_...())`).

use crate::device_state::DeviceStateStore;
use crate::types::ToolResult;
use serde_json::Value;
use std::sync::Arc;

fn invalid(field: &str, reason: &str) -> ToolResult {
    ToolResult::Error(format!("invalid argument '{field}': {reason}"))
}

pub fn get_device_state(store: &DeviceStateStore) -> ToolResult {
    match serde_json::to_value(store.snapshot()) {
        Ok(v) => ToolResult::Success(v),
        Err(e) => ToolResult::Error(format!("serialization failure: {e}")),
    }
}

pub fn get_health(store: &DeviceStateStore) -> ToolResult {
    ToolResult::Success(store.health())
}

pub fn get_temperature(store: &DeviceStateStore) -> ToolResult {
    ToolResult::Success(store.temperature())
}

pub fn get_sensors(store: &DeviceStateStore) -> ToolResult {
    match serde_json::to_value(store.sensors()) {
        Ok(v) => ToolResult::Success(v),
        Err(e) => ToolResult::Error(format!("serialization failure: {e}")),
    }
}

pub fn set_leds(store: &Arc<DeviceStateStore>, arguments: &Value) -> ToolResult {
    let enabled = match arguments.get("enabled").and_then(Value::as_bool) {
        Some(v) => v,
        None => return invalid("enabled", "must be a boolean"),
    };
    store.set_leds_enabled(enabled);
    ToolResult::Success(serde_json::json!({
        "success": true,
        "message": format!("LEDs {}", if enabled { "enabled" } else { "disabled" }),
    }))
}

pub fn set_led_color(store: &Arc<DeviceStateStore>, arguments: &Value) -> ToolResult {
    let channel = |name: &str| -> Result<u8, ToolResult> {
        match arguments.get(name).and_then(Value::as_i64) {
            Some(v) if (0..=255).contains(&v) => Ok(v as u8),
            Some(_) => Err(invalid(name, "must be between 0 and 255")),
            None => Err(invalid(name, "must be an integer")),
        }
    };

    let (red, green, blue) = match (channel("red"), channel("green"), channel("blue")) {
        (Ok(r), Ok(g), Ok(b)) => (r, g, b),
        (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => return e,
    };

    store.set_led_color(red, green, blue);
    ToolResult::Success(serde_json::json!({
        "success": true,
        "message": format!("LEDs set to rgb({red}, {green}, {blue})"),
    }))
}

pub fn set_audio_mute(store: &Arc<DeviceStateStore>, arguments: &Value) -> ToolResult {
    let muted = match arguments.get("muted").and_then(Value::as_bool) {
        Some(v) => v,
        None => return invalid("muted", "must be a boolean"),
    };
    store.set_audio_muted(muted);
    ToolResult::Success(serde_json::json!({
        "success": true,
        "message": format!("audio {}", if muted { "muted" } else { "unmuted" }),
    }))
}
