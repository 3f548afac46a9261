// src/pipeline/telemetry.rs
//
// Bounded rolling series of confidence samples for the live chart.
// Purely observational; no decision component ever reads it back.

use serde::Serialize;
use std::collections::VecDeque;

/// Samples retained for display.
const WINDOW: usize = 30;

/// Coarse danger indicator plotted behind the confidence line.
const DANGER_LEVEL: u8 = 100;
const CALM_LEVEL: u8 = 20;

#[derive(Debug, Clone, Serialize)]
pub struct TelemetrySample {
    /// Wall-clock label, HH:MM:SS.
    pub time: String,
    /// Confidence as a percentage, one decimal of precision.
    pub confidence_pct: f32,
    pub danger: u8,
}

#[derive(Debug, Default)]
pub struct TelemetryBuffer {
    samples: VecDeque<TelemetrySample>,
}

impl TelemetryBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, now_ms: u64, confidence: f32, danger: bool) {
        let time = chrono::DateTime::from_timestamp_millis(now_ms as i64)
            .map(|t| t.format("%H:%M:%S").to_string())
            .unwrap_or_default();

        if self.samples.len() >= WINDOW {
            self.samples.pop_front();
        }
        self.samples.push_back(TelemetrySample {
            time,
            confidence_pct: (confidence * 1000.0).round() / 10.0,
            danger: if danger { DANGER_LEVEL } else { CALM_LEVEL },
        });
    }

    pub fn samples(&self) -> impl Iterator<Item = &TelemetrySample> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_evicts_oldest_beyond_window() {
        let mut buffer = TelemetryBuffer::new();
        for i in 0..40u64 {
            buffer.push(i * 1000, 0.5, false);
        }
        assert_eq!(buffer.len(), 30);
        // Oldest retained sample is #10 (t=10s).
        let first = buffer.samples().next().unwrap();
        assert!(first.time.ends_with(":10"), "time was {}", first.time);
    }

    #[test]
    fn test_danger_indicator_levels() {
        let mut buffer = TelemetryBuffer::new();
        buffer.push(0, 0.873, true);
        buffer.push(200, 0.42, false);
        let samples: Vec<_> = buffer.samples().collect();
        assert_eq!(samples[0].danger, 100);
        assert!((samples[0].confidence_pct - 87.3).abs() < 1e-3);
        assert_eq!(samples[1].danger, 20);
    }
}
