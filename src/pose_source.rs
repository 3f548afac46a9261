// src/pose_source.rs
//
// Inbound plumbing: pose recordings exported by the external
// estimation model, one JSON object per line. The pipeline itself
// never parses these; it only sees the PoseFrame each record carries.

use crate::types::{Keypoint, PoseFrame};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};
use tracing::info;
use walkdir::WalkDir;

/// One line of a recording: a frame timestamp plus the model's
/// landmark set, or no landmarks when the model saw no subject.
#[derive(Debug, Clone, Deserialize)]
pub struct PoseRecord {
    pub timestamp_ms: u64,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub landmarks: Option<Vec<Keypoint>>,
}

impl PoseRecord {
    pub fn frame(&self) -> Option<PoseFrame> {
        self.landmarks.as_ref().map(|landmarks| PoseFrame {
            landmarks: landmarks.clone(),
            width: self.width,
            height: self.height,
        })
    }
}

pub fn find_recordings(input_dir: &str) -> Result<Vec<PathBuf>> {
    let mut recordings = Vec::new();

    for entry in WalkDir::new(input_dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if let Some(ext) = path.extension() {
            if matches!(ext.to_str(), Some("jsonl") | Some("ndjson")) {
                recordings.push(path.to_path_buf());
            }
        }
    }

    recordings.sort();
    info!("Found {} pose recording(s)", recordings.len());
    Ok(recordings)
}

pub struct RecordingReader {
    lines: Lines<BufReader<File>>,
    line_number: usize,
    path: PathBuf,
}

impl RecordingReader {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open recording {}", path.display()))?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
            line_number: 0,
            path: path.to_path_buf(),
        })
    }
}

impl Iterator for RecordingReader {
    type Item = Result<PoseRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_number += 1;
            if line.trim().is_empty() {
                continue;
            }
            return Some(serde_json::from_str(&line).with_context(|| {
                format!("Bad pose record at {}:{}", self.path.display(), self.line_number)
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_with_landmarks_builds_frame() {
        let json = format!(
            r#"{{"timestamp_ms": 1200, "width": 640, "height": 480, "landmarks": [{}]}}"#,
            vec![r#"{"x": 0.5, "y": 0.5, "z": 0.0, "visibility": 0.9}"#; 33].join(",")
        );
        let record: PoseRecord = serde_json::from_str(&json).unwrap();
        let frame = record.frame().unwrap();
        assert_eq!(frame.landmarks.len(), 33);
        assert_eq!(frame.width, 640);
        assert_eq!(record.timestamp_ms, 1200);
    }

    #[test]
    fn test_record_without_landmarks_is_no_subject() {
        let json = r#"{"timestamp_ms": 1400, "width": 640, "height": 480}"#;
        let record: PoseRecord = serde_json::from_str(json).unwrap();
        assert!(record.frame().is_none());
    }

    #[test]
    fn test_keypoint_depth_defaults_to_zero() {
        let json = r#"{"x": 0.1, "y": 0.2, "visibility": 0.8}"#;
        let kp: Keypoint = serde_json::from_str(json).unwrap();
        assert_eq!(kp.z, 0.0);
    }
}
