// src/config.rs

use crate::types::Config;
use anyhow::Result;
use std::fs;
use tracing::warn;

pub const SENSITIVITY_RANGE: std::ops::RangeInclusive<u8> = 1..=10;
pub const CONFIDENCE_RANGE: std::ops::RangeInclusive<f32> = 0.1..=0.9;

impl Config {
    /// Parse the config as written. Callers run `sanitize()` once the
    /// tracing subscriber is up, so clamp warnings are never dropped.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Clamp operator settings at the boundary so out-of-range values
    /// never reach the scorer (invalid configuration is clamped, not
    /// propagated).
    pub fn sanitize(&mut self) {
        let sensitivity = clamp_sensitivity(self.detection.sensitivity);
        if sensitivity != self.detection.sensitivity {
            warn!(
                "Sensitivity {} out of range, clamped to {}",
                self.detection.sensitivity, sensitivity
            );
            self.detection.sensitivity = sensitivity;
        }

        let threshold = clamp_confidence(self.detection.confidence_threshold);
        if threshold != self.detection.confidence_threshold {
            warn!(
                "Confidence threshold {} out of range, clamped to {}",
                self.detection.confidence_threshold, threshold
            );
            self.detection.confidence_threshold = threshold;
        }

        if let Some(zone) = self.zone {
            if zone.w < 0.0 || zone.h < 0.0 {
                warn!(
                    "Zone has negative dimensions ({}x{}), ignoring zone",
                    zone.w, zone.h
                );
                self.zone = None;
            }
        }
    }
}

pub fn clamp_sensitivity(value: u8) -> u8 {
    value.clamp(*SENSITIVITY_RANGE.start(), *SENSITIVITY_RANGE.end())
}

pub fn clamp_confidence(value: f32) -> f32 {
    value.clamp(*CONFIDENCE_RANGE.start(), *CONFIDENCE_RANGE.end())
}
