//! Device-state store (C8, spec.md §4.8).
//!
//! Re-architected per DESIGN NOTES §9: the teacher's callback-mutated
//! module-level globals become an explicit handle created at init and
//! passed by reference to every component (C5's prompt builder, C7,
//! and external-boundary getters). One `RwLock` per section gives
//! field-atomic publication within a section while letting readers see
//! a mix of old/new sections, exactly as spec.md requires; many
//! readers, few writers.

use serde::Serialize;
use std::sync::RwLock;

#[derive(Debug, Clone, Serialize)]
pub struct DeviceSection {
    pub identity: String,
    pub free_heap: u64,
    pub min_free_heap: u64,
}

impl Default for DeviceSection {
    fn default() -> Self {
        DeviceSection {
            identity: "voice-core".to_string(),
            free_heap: 0,
            min_free_heap: 0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct WifiSection {
    pub connected: bool,
    pub ssid: Option<String>,
    pub rssi: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LedsSection {
    pub enabled: bool,
    pub count: u32,
    pub brightness: u8,
    pub state: String,
}

impl Default for LedsSection {
    fn default() -> Self {
        LedsSection {
            enabled: true,
            count: 12,
            brightness: 255,
            state: "idle".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AudioSection {
    pub playing: bool,
    pub muted: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LinkSection {
    pub connected: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SensorReading {
    pub available: bool,
    pub value: Option<f32>,
    pub unit: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SensorsSection {
    pub temperature_c: Option<SensorReading>,
    pub humidity_rh: Option<SensorReading>,
}

/// Canonical key-value document (spec.md §3 `DeviceSnapshot`). Field
/// declaration order is the serialization order; `serde_json` preserves
/// struct field order, which is what makes two snapshots with no
/// intervening writes byte-identical (spec.md invariant 5).
#[derive(Debug, Clone, Serialize)]
pub struct DeviceSnapshot {
    pub device: DeviceSection,
    pub wifi: WifiSection,
    pub leds: LedsSection,
    pub audio: AudioSection,
    pub link: LinkSection,
    pub sensors: SensorsSection,
}

pub struct DeviceStateStore {
    device: RwLock<DeviceSection>,
    wifi: RwLock<WifiSection>,
    leds: RwLock<LedsSection>,
    audio: RwLock<AudioSection>,
    link: RwLock<LinkSection>,
    sensors: RwLock<SensorsSection>,
}

impl DeviceStateStore {
    pub fn new() -> Self {
        DeviceStateStore {
            device: RwLock::new(DeviceSection::default()),
            wifi: RwLock::new(WifiSection::default()),
            leds: RwLock::new(LedsSection::default()),
            audio: RwLock::new(AudioSection::default()),
            link: RwLock::new(LinkSection::default()),
            sensors: RwLock::new(SensorsSection::default()),
        }
    }

    /// Full snapshot for the `get_device_state` tool and external
    /// getters (Supplemented Feature B.4). Each section is cloned under
    /// its own short-lived read lock, so the result may mix sections
    /// from slightly different instants but never tears within one.
    pub fn snapshot(&self) -> DeviceSnapshot {
        DeviceSnapshot {
            device: self.device.read().unwrap().clone(),
            wifi: self.wifi.read().unwrap().clone(),
            leds: self.leds.read().unwrap().clone(),
            audio: self.audio.read().unwrap().clone(),
            link: self.link.read().unwrap().clone(),
            sensors: self.sensors.read().unwrap().clone(),
        }
    }

    pub fn health(&self) -> serde_json::Value {
        let device = self.device.read().unwrap().clone();
        let sensors = self.sensors.read().unwrap().clone();
        let sensors_active = [&sensors.temperature_c, &sensors.humidity_rh]
            .iter()
            .filter(|s| s.as_ref().map(|r| r.available).unwrap_or(false))
            .count();
        serde_json::json!({
            "status": "ok",
            "free_heap": device.free_heap,
            "min_free_heap": device.min_free_heap,
            "sensors_active": sensors_active,
        })
    }

    pub fn temperature(&self) -> serde_json::Value {
        let sensors = self.sensors.read().unwrap();
        serde_json::json!({
            "temperature_c": sensors.temperature_c.as_ref().and_then(|r| r.value),
            "humidity_rh": sensors.humidity_rh.as_ref().and_then(|r| r.value),
            "source": "SHT45",
        })
    }

    pub fn sensors(&self) -> SensorsSection {
        self.sensors.read().unwrap().clone()
    }

    pub fn set_leds_enabled(&self, enabled: bool) {
        let mut leds = self.leds.write().unwrap();
        leds.enabled = enabled;
        if !enabled {
            leds.state = "off".to_string();
        }
    }

    pub fn set_led_color(&self, _r: u8, _g: u8, _b: u8) {
        let mut leds = self.leds.write().unwrap();
        leds.enabled = true;
        leds.state = "custom".to_string();
    }

    pub fn set_audio_muted(&self, muted: bool) {
        self.audio.write().unwrap().muted = muted;
    }

    pub fn set_playing(&self, playing: bool) {
        self.audio.write().unwrap().playing = playing;
    }

    pub fn set_link_connected(&self, connected: bool) {
        self.link.write().unwrap().connected = connected;
    }

    pub fn set_wifi(&self, connected: bool, ssid: Option<String>, rssi: Option<i32>) {
        let mut wifi = self.wifi.write().unwrap();
        wifi.connected = connected;
        wifi.ssid = ssid;
        wifi.rssi = rssi;
    }

    pub fn set_led_state(&self, state: &str) {
        self.leds.write().unwrap().state = state.to_string();
    }

    /// Deterministic canonical document, used for checksums/equality
    /// checks (spec.md invariant 5).
    pub fn canonical_string(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }
}

impl Default for DeviceStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_serialization_is_idempotent() {
        let store = DeviceStateStore::new();
        let a = store.canonical_string();
        let b = store.canonical_string();
        assert_eq!(a, b);
    }

    #[test]
    fn set_leds_enabled_updates_state() {
        let store = DeviceStateStore::new();
        store.set_leds_enabled(false);
        let snap = store.snapshot();
        assert!(!snap.leds.enabled);
        assert_eq!(snap.leds.state, "off");
    }

    #[test]
    fn set_audio_mute_is_isolated_to_audio_section() {
        let store = DeviceStateStore::new();
        store.set_audio_muted(true);
        let snap = store.snapshot();
        assert!(snap.audio.muted);
        assert!(!snap.audio.playing);
    }
}
