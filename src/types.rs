// src/types.rs

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub video: VideoConfig,
    pub detection: DetectionConfig,
    #[serde(default)]
    pub zone: Option<ZoneRect>,
    #[serde(default)]
    pub privacy: PrivacyConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoConfig {
    pub input_dir: String,
    pub output_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Operator sensitivity, 1 (strict) to 10 (eager).
    pub sensitivity: u8,
    /// Minimum mean landmark visibility for a frame to be scored.
    pub confidence_threshold: f32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            sensitivity: 5,
            confidence_threshold: 0.5,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrivacyConfig {
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

/// One joint estimate from the external pose model. Coordinates are
/// normalized to [0,1] of the frame; z is the world-space depth hint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
    pub visibility: f32,
}

/// All landmarks for one detected subject in one video frame, plus the
/// frame's pixel dimensions. Built fresh per inference callback and
/// consumed synchronously; never retained across frames.
#[derive(Debug, Clone)]
pub struct PoseFrame {
    pub landmarks: Vec<Keypoint>,
    pub width: u32,
    pub height: u32,
}

/// Operator-drawn restriction rectangle, in frame pixel coordinates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ZoneRect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl ZoneRect {
    /// Boundary is inclusive: a point exactly on the edge is inside.
    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.x + self.w && py >= self.y && py <= self.y + self.h
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecurityStatus {
    #[serde(rename = "SAFE")]
    Safe,
    #[serde(rename = "DANGER")]
    Danger,
}

/// Closed set of action labels the pipeline can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    #[serde(rename = "none")]
    None,
    #[serde(rename = "walking")]
    Walking,
    #[serde(rename = "crawling")]
    Crawling,
    #[serde(rename = "loitering outside zone")]
    LoiteringOutsideZone,
}

impl ActionType {
    pub fn label(&self) -> &'static str {
        match self {
            ActionType::None => "none",
            ActionType::Walking => "walking",
            ActionType::Crawling => "crawling",
            ActionType::LoiteringOutsideZone => "loitering outside zone",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "none" => Some(ActionType::None),
            "walking" => Some(ActionType::Walking),
            "crawling" => Some(ActionType::Crawling),
            "loitering outside zone" => Some(ActionType::LoiteringOutsideZone),
            _ => None,
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A discrete, user-visible security event. Immutable once logged;
/// removed only by operator dismissal or oldest-first eviction.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionEvent {
    pub id: String,
    pub timestamp_ms: u64,
    #[serde(rename = "type")]
    pub action: ActionType,
    pub confidence: f32,
    pub status: SecurityStatus,
    pub message: String,
    /// Base64-encoded JPEG evidence still, when the snapshot gate allowed one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<String>,
}

impl DetectionEvent {
    pub fn timestamp(&self) -> chrono::DateTime<chrono::Utc> {
        chrono::DateTime::from_timestamp_millis(self.timestamp_ms as i64)
            .unwrap_or_else(chrono::Utc::now)
    }
}
