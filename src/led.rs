//! LED state projector (C11, spec.md §4.11) and its hardware driver.
//!
//! `LedProjector` maps `InteractionState` transitions to a pattern
//! name and pushes it to a `LedDriver`; transient events (wake
//! detected, error) overlay a short flash without changing the base
//! pattern. The driver itself is grounded directly on the teacher's
//! `agent/src/led_ring.rs`: real USB control under the `led_ring`
//! feature (ReSpeaker 4-mic VID/PID, vendor control transfers), and an
//! identical-surface stub returning `NotSupported` otherwise, so C11
//! never has to know which is wired in.

use crate::types::InteractionState;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedError {
    #[error("LED hardware not supported in this build")]
    NotSupported,
    #[error("USB error: {0}")]
    Usb(String),
    #[error("LED device not found")]
    DeviceNotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedPattern {
    Idle,
    Listening,
    Thinking,
    Speaking,
    Error,
}

impl LedPattern {
    pub fn name(&self) -> &'static str {
        match self {
            LedPattern::Idle => "idle",
            LedPattern::Listening => "listen",
            LedPattern::Thinking => "wait",
            LedPattern::Speaking => "speak",
            LedPattern::Error => "error",
        }
    }
}

pub trait LedDriver {
    fn show_pattern(&mut self, pattern: LedPattern) -> Result<(), LedError>;
    /// Overlay a brief flash (e.g. wake detected) without changing the
    /// base pattern the caller will re-assert afterwards.
    fn flash(&mut self, pattern: LedPattern) -> Result<(), LedError>;
}

/// Maps scheduler state transitions to LED patterns (spec.md §4.11).
/// Pattern identifiers are opaque to this component; rendering is the
/// driver's responsibility.
pub struct LedProjector<D: LedDriver> {
    driver: D,
}

impl<D: LedDriver> LedProjector<D> {
    pub fn new(driver: D) -> Self {
        LedProjector { driver }
    }

    pub fn on_state_change(&mut self, state: InteractionState) {
        let pattern = match state {
            InteractionState::Idle => LedPattern::Idle,
            InteractionState::Listening => LedPattern::Listening,
            InteractionState::Thinking => LedPattern::Thinking,
            InteractionState::Speaking => LedPattern::Speaking,
            InteractionState::Error => LedPattern::Error,
        };
        if let Err(e) = self.driver.show_pattern(pattern) {
            log::warn!("LED projector: failed to show pattern {}: {e}", pattern.name());
        }
    }

    pub fn on_wake_detected(&mut self) {
        if let Err(e) = self.driver.flash(LedPattern::Listening) {
            log::warn!("LED projector: failed wake flash: {e}");
        }
    }

    pub fn on_error(&mut self) {
        if let Err(e) = self.driver.flash(LedPattern::Error) {
            log::warn!("LED projector: failed error flash: {e}");
        }
    }
}

#[cfg(feature = "led_ring")]
pub mod usb_ring {
    //! Real USB-controlled LED ring driver, grounded directly on
    //! `agent/src/led_ring.rs`'s `LedRing`: same vendor/product IDs,
    //! same control-transfer constants, same claim-interface-3 and
    //! continue-on-failure behavior.

    use super::{LedDriver, LedError, LedPattern};
    use rusb::UsbContext;
    use std::time::Duration;

    const RESPEAKER_VID: u16 = 0x2886;
    const RESPEAKER_4MIC_PID: u16 = 0x0018;
    const TIMEOUT: Duration = Duration::from_millis(500);

    pub struct UsbLedRing {
        handle: rusb::DeviceHandle<rusb::Context>,
    }

    impl UsbLedRing {
        pub fn new() -> Result<Self, LedError> {
            let context = rusb::Context::new().map_err(|e| LedError::Usb(e.to_string()))?;
            for device in context.devices().map_err(|e| LedError::Usb(e.to_string()))?.iter() {
                let descriptor = match device.device_descriptor() {
                    Ok(d) => d,
                    Err(_) => continue,
                };
                if descriptor.vendor_id() == RESPEAKER_VID && descriptor.product_id() == RESPEAKER_4MIC_PID {
                    let mut handle = device.open().map_err(|e| LedError::Usb(e.to_string()))?;
                    if let Err(e) = handle.claim_interface(3) {
                        log::warn!("USB LED ring: failed to claim interface 3: {e}");
                    }
                    return Ok(UsbLedRing { handle });
                }
            }
            Err(LedError::DeviceNotFound)
        }

        fn send(&mut self, cmd_value: u16, data: &[u8]) -> Result<(), LedError> {
            let request_type = rusb::request_type(
                rusb::Direction::Out,
                rusb::RequestType::Vendor,
                rusb::Recipient::Device,
            );
            self.handle
                .write_control(request_type, 0, cmd_value, 0, data, TIMEOUT)
                .map_err(|e| LedError::Usb(e.to_string()))?;
            Ok(())
        }
    }

    impl LedDriver for UsbLedRing {
        fn show_pattern(&mut self, pattern: LedPattern) -> Result<(), LedError> {
            let cmd_value = match pattern {
                LedPattern::Idle => 0,
                LedPattern::Listening => 1,
                LedPattern::Thinking => 2,
                LedPattern::Speaking => 3,
                LedPattern::Error => 4,
            };
            self.send(cmd_value, &[])
        }

        fn flash(&mut self, pattern: LedPattern) -> Result<(), LedError> {
            self.show_pattern(pattern)
        }
    }

    impl Drop for UsbLedRing {
        fn drop(&mut self) {
            let _ = self.send(0, &[]);
        }
    }
}

/// Identical-surface stub used when `led_ring` is disabled, or when the
/// real driver failed to find hardware. Every call returns
/// `NotSupported`; callers only log a warning and move on.
pub struct NullLedDriver;

impl LedDriver for NullLedDriver {
    fn show_pattern(&mut self, _pattern: LedPattern) -> Result<(), LedError> {
        Err(LedError::NotSupported)
    }

    fn flash(&mut self, _pattern: LedPattern) -> Result<(), LedError> {
        Err(LedError::NotSupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct RecordingDriver {
        patterns: Rc<RefCell<Vec<LedPattern>>>,
    }

    impl LedDriver for RecordingDriver {
        fn show_pattern(&mut self, pattern: LedPattern) -> Result<(), LedError> {
            self.patterns.borrow_mut().push(pattern);
            Ok(())
        }
        fn flash(&mut self, pattern: LedPattern) -> Result<(), LedError> {
            self.patterns.borrow_mut().push(pattern);
            Ok(())
        }
    }

    #[test]
    fn state_changes_map_to_expected_patterns() {
        let patterns = Rc::new(RefCell::new(Vec::new()));
        let mut projector = LedProjector::new(RecordingDriver { patterns: patterns.clone() });
        projector.on_state_change(InteractionState::Listening);
        projector.on_state_change(InteractionState::Speaking);
        assert_eq!(*patterns.borrow(), vec![LedPattern::Listening, LedPattern::Speaking]);
    }

    #[test]
    fn null_driver_always_errors() {
        let mut driver = NullLedDriver;
        assert!(matches!(driver.show_pattern(LedPattern::Idle), Err(LedError::NotSupported)));
    }
}
