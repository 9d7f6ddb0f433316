//! Energy-based VAD with hysteresis (spec.md §4.2).
//!
//! Mirrors the teacher's `WebRtcVAD` state machine in
//! `src/vad/mod.rs` (`recent_decisions` + `speech_trigger_frames` /
//! `silence_stop_frames`), but decides per-chunk on signal energy
//! rather than delegating to `webrtc_vad`, since this core's contract
//! only requires "a configurable energy threshold when a trained VAD
//! is unavailable" (spec.md §4.2). `hangover_frames` replaces the
//! teacher's separate rise/fall frame counts with the spec's stated
//! defaults (2 on rise, 8 on fall).

use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct VadConfig {
    pub energy_threshold: f32,
    /// Consecutive active chunks required to assert speech.
    pub hangover_frames_rise: usize,
    /// Consecutive inactive chunks required to deassert speech.
    pub hangover_frames_fall: usize,
}

impl Default for VadConfig {
    fn default() -> Self {
        VadConfig {
            energy_threshold: 100.0,
            hangover_frames_rise: 2,
            hangover_frames_fall: 8,
        }
    }
}

pub trait Vad {
    /// Feeds one enhanced chunk and returns the (possibly unchanged)
    /// `vad_active` decision after hysteresis.
    fn update(&mut self, samples: &[i16]) -> bool;
    fn reset(&mut self);
}

pub struct EnergyVad {
    config: VadConfig,
    recent_decisions: VecDeque<bool>,
    active: bool,
}

impl EnergyVad {
    pub fn new(config: VadConfig) -> Self {
        let capacity = config.hangover_frames_rise.max(config.hangover_frames_fall);
        EnergyVad {
            config,
            recent_decisions: VecDeque::with_capacity(capacity),
            active: false,
        }
    }

    fn rms_energy(samples: &[i16]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
        ((sum_sq / samples.len() as f64).sqrt()) as f32
    }
}

impl Vad for EnergyVad {
    fn update(&mut self, samples: &[i16]) -> bool {
        let raw_active = Self::rms_energy(samples) > self.config.energy_threshold;

        let capacity = self.config.hangover_frames_rise.max(self.config.hangover_frames_fall);
        self.recent_decisions.push_back(raw_active);
        while self.recent_decisions.len() > capacity {
            self.recent_decisions.pop_front();
        }

        let needed = if self.active {
            self.config.hangover_frames_fall
        } else {
            self.config.hangover_frames_rise
        };
        let recent_matching = self
            .recent_decisions
            .iter()
            .rev()
            .take(needed)
            .filter(|&&d| d == !self.active)
            .count();

        if recent_matching >= needed && self.recent_decisions.len() >= needed {
            self.active = !self.active;
        }

        self.active
    }

    fn reset(&mut self) {
        self.recent_decisions.clear();
        self.active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loud(n: usize) -> Vec<i16> {
        vec![1000i16; n]
    }
    fn quiet(n: usize) -> Vec<i16> {
        vec![5i16; n]
    }

    #[test]
    fn single_loud_chunk_does_not_flip_state() {
        let mut vad = EnergyVad::new(VadConfig::default());
        assert!(!vad.update(&loud(160)));
    }

    #[test]
    fn sustained_energy_asserts_after_rise_frames() {
        let mut vad = EnergyVad::new(VadConfig::default());
        assert!(!vad.update(&loud(160)));
        assert!(vad.update(&loud(160)));
    }

    #[test]
    fn sustained_silence_deasserts_after_fall_frames() {
        let mut vad = EnergyVad::new(VadConfig::default());
        vad.update(&loud(160));
        vad.update(&loud(160));
        assert!(vad.active);

        for _ in 0..7 {
            assert!(vad.update(&quiet(160)));
        }
        assert!(!vad.update(&quiet(160)));
    }

    #[test]
    fn reset_clears_state() {
        let mut vad = EnergyVad::new(VadConfig::default());
        vad.update(&loud(160));
        vad.update(&loud(160));
        vad.reset();
        assert!(!vad.active);
        assert!(!vad.update(&loud(160)));
    }
}
