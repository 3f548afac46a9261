// src/hysteresis.rs
//
// Temporal hysteresis filter. Raw per-frame verdicts jitter; the
// stable label only flips to crawling after a sensitivity-derived run
// of consecutive candidate frames, and decays one frame at a time on
// the way back down.

/// Stable label after temporal filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StableLabel {
    Walking,
    Crawling,
}

/// Consecutive candidate frames needed before the stable label flips
/// to crawling: 15 minus sensitivity, floored at one frame.
pub fn frames_to_confirm(sensitivity: u8) -> u32 {
    u32::from(15u8.saturating_sub(sensitivity)).max(1)
}

/// Per-stream debounce state. One instance per monitored stream; reset
/// whenever the stream (re)starts so state never leaks across sources.
#[derive(Debug, Default)]
pub struct HysteresisFilter {
    counter: u32,
}

impl HysteresisFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one scored frame into the counter and return the stable
    /// label. Low-confidence and no-subject frames must not be fed
    /// here; they leave the counter untouched.
    pub fn update(&mut self, candidate: bool, sensitivity: u8) -> StableLabel {
        if candidate {
            self.counter += 1;
        } else {
            self.counter = self.counter.saturating_sub(1);
        }

        if self.counter >= frames_to_confirm(sensitivity) {
            StableLabel::Crawling
        } else {
            StableLabel::Walking
        }
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn reset(&mut self) {
        self.counter = 0;
    }
}
