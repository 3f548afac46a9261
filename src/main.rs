// src/main.rs

mod config;
mod features;
mod hysteresis;
mod pipeline;
mod pose_source;
mod privacy;
mod report;
mod scorer;
mod types;
mod zone;

use anyhow::{Context, Result};
use pipeline::event_bus::{EventBus, PipelineEvent};
use pipeline::{DetectionPipeline, FrameInput, PipelineSettings};
use pose_source::RecordingReader;
use std::io::Write;
use std::path::Path;
use tracing::{error, info, warn};
use types::Config;

struct ProcessingStats {
    total_frames: u64,
    subject_frames: u64,
    alerts: u64,
}

fn main() -> Result<()> {
    let mut config = Config::load("config.yaml")?;

    tracing_subscriber::fmt()
        .with_env_filter(format!("intruder_detection={}", config.logging.level))
        .init();

    info!("Intruder Detection Pipeline Starting");
    // Clamp after the subscriber is up so out-of-range warnings land
    // in the log.
    config.sanitize();
    info!(
        "Detection settings: sensitivity={}, confidence_threshold={:.2}, zone={}, privacy={}",
        config.detection.sensitivity,
        config.detection.confidence_threshold,
        if config.zone.is_some() { "active" } else { "off" },
        if config.privacy.enabled { "on" } else { "off" },
    );

    let recordings = pose_source::find_recordings(&config.video.input_dir)?;
    if recordings.is_empty() {
        error!("No pose recordings found in {}", config.video.input_dir);
        return Ok(());
    }

    std::fs::create_dir_all(&config.video.output_dir)
        .with_context(|| format!("Failed to create {}", config.video.output_dir))?;

    let mut pipeline = DetectionPipeline::new(PipelineSettings::from_config(&config));
    let mut bus = EventBus::new(256);

    for (idx, path) in recordings.iter().enumerate() {
        info!(
            "Processing recording {}/{}: {}",
            idx + 1,
            recordings.len(),
            path.display()
        );

        // New source: nothing from the previous stream may leak in.
        pipeline.reset();

        match process_recording(path, &mut pipeline, &mut bus) {
            Ok(stats) => {
                info!(
                    "Recording done: {} frames, {} with subject, {} alert(s)",
                    stats.total_frames, stats.subject_frames, stats.alerts
                );
            }
            Err(e) => {
                error!("Failed to process {}: {:#}", path.display(), e);
            }
        }
    }

    let output_dir = Path::new(&config.video.output_dir);
    report::write_report(&output_dir.join("security_report.csv"), pipeline.events())?;
    save_events_jsonl(&output_dir.join("events.jsonl"), pipeline.events())?;

    let summary = pipeline.metrics().summary();
    info!(
        "Run summary: {} frames ({:.1} fps), {} accepted updates, {} danger / {} info events, {} suppressed",
        summary.total_frames,
        summary.fps,
        summary.accepted_updates,
        summary.danger_events,
        summary.info_events,
        summary.suppressed_alerts,
    );
    info!("Total alerts: {}", pipeline.total_alerts());

    Ok(())
}

fn process_recording(
    path: &Path,
    pipeline: &mut DetectionPipeline,
    bus: &mut EventBus,
) -> Result<ProcessingStats> {
    let mut stats = ProcessingStats {
        total_frames: 0,
        subject_frames: 0,
        alerts: 0,
    };

    for record in RecordingReader::open(path)? {
        let record = record?;
        let frame = record.frame();
        stats.total_frames += 1;
        if frame.is_some() {
            stats.subject_frames += 1;
        }

        let outcome = pipeline.process_frame(
            FrameInput {
                now_ms: record.timestamp_ms,
                frame: frame.as_ref(),
                // Offline recordings carry no pixels to snapshot.
                snapshot_jpeg: None,
                audio_idle: true,
            },
            bus,
        );

        if outcome.accepted {
            for event in bus.drain() {
                match event {
                    PipelineEvent::AlertRaised(alert) => {
                        stats.alerts += 1;
                        warn!(
                            "ALERT [{}] {} ({:.0}%)",
                            alert.id,
                            alert.message,
                            alert.confidence * 100.0
                        );
                    }
                    PipelineEvent::ActivityLogged(activity) => {
                        info!("{} ({:.0}%)", activity.message, activity.confidence * 100.0);
                    }
                    PipelineEvent::SpeakWarning { action } => {
                        // No audio channel in the offline driver; surface
                        // the trigger so operators can see it fired.
                        info!("Spoken warning requested: {}", action);
                    }
                }
            }
        }
    }

    Ok(stats)
}

fn save_events_jsonl(path: &Path, events: &[types::DetectionEvent]) -> Result<()> {
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for event in events {
        let json_line = serde_json::to_string(event)?;
        writeln!(file, "{}", json_line)?;
    }
    file.flush()?;
    info!("{} event(s) saved to {}", events.len(), path.display());
    Ok(())
}
