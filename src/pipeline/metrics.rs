// src/pipeline/metrics.rs
//
// Run observability. Counts what the pipeline saw and decided;
// exported as a summary at the end of each run or on demand.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct PipelineMetrics {
    pub total_frames: Arc<AtomicU64>,
    pub frames_with_subject: Arc<AtomicU64>,
    pub low_confidence_frames: Arc<AtomicU64>,
    pub accepted_updates: Arc<AtomicU64>,
    pub danger_events: Arc<AtomicU64>,
    pub info_events: Arc<AtomicU64>,
    pub suppressed_alerts: Arc<AtomicU64>,
    pub snapshots_captured: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            total_frames: Arc::new(AtomicU64::new(0)),
            frames_with_subject: Arc::new(AtomicU64::new(0)),
            low_confidence_frames: Arc::new(AtomicU64::new(0)),
            accepted_updates: Arc::new(AtomicU64::new(0)),
            danger_events: Arc::new(AtomicU64::new(0)),
            info_events: Arc::new(AtomicU64::new(0)),
            suppressed_alerts: Arc::new(AtomicU64::new(0)),
            snapshots_captured: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }

    pub fn inc(&self, counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn fps(&self) -> f64 {
        let frames = self.total_frames.load(Ordering::Relaxed);
        let elapsed = self.started_at.elapsed().as_secs_f64();
        if elapsed > 0.01 {
            frames as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_frames: self.total_frames.load(Ordering::Relaxed),
            frames_with_subject: self.frames_with_subject.load(Ordering::Relaxed),
            low_confidence_frames: self.low_confidence_frames.load(Ordering::Relaxed),
            accepted_updates: self.accepted_updates.load(Ordering::Relaxed),
            danger_events: self.danger_events.load(Ordering::Relaxed),
            info_events: self.info_events.load(Ordering::Relaxed),
            suppressed_alerts: self.suppressed_alerts.load(Ordering::Relaxed),
            snapshots_captured: self.snapshots_captured.load(Ordering::Relaxed),
            fps: self.fps(),
            elapsed_secs: self.started_at.elapsed().as_secs_f64(),
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSummary {
    pub total_frames: u64,
    pub frames_with_subject: u64,
    pub low_confidence_frames: u64,
    pub accepted_updates: u64,
    pub danger_events: u64,
    pub info_events: u64,
    pub suppressed_alerts: u64,
    pub snapshots_captured: u64,
    pub fps: f64,
    pub elapsed_secs: f64,
}
