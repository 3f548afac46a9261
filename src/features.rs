// src/features.rs
//
// Landmark feature extractor. Turns one raw pose frame into the
// normalized geometry the action scorer consumes.

use crate::types::PoseFrame;

/// BlazePose 33-landmark topology indices used by the pipeline.
pub mod landmark {
    pub const NOSE: usize = 0;
    pub const LEFT_EYE: usize = 2;
    pub const RIGHT_EYE: usize = 5;
    pub const LEFT_SHOULDER: usize = 11;
    pub const RIGHT_SHOULDER: usize = 12;
    pub const LEFT_WRIST: usize = 15;
    pub const RIGHT_WRIST: usize = 16;
    pub const LEFT_HIP: usize = 23;
    pub const RIGHT_HIP: usize = 24;
    pub const COUNT: usize = 33;
}

/// Minimum visibility for a single landmark to participate in a
/// geometric predicate (wrist position, head height, face anchor).
pub const LANDMARK_VISIBILITY_MIN: f32 = 0.5;

/// Subject bounding box in frame pixel coordinates.
#[derive(Debug, Clone, Copy)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl BoundingBox {
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.w / 2.0, self.y + self.h / 2.0)
    }
}

/// Geometry derived from one pose frame.
#[derive(Debug, Clone)]
pub struct PoseFeatures {
    pub bounding_box: BoundingBox,
    /// Width / height of the bounding box.
    pub aspect_ratio: f32,
    /// |shoulder-mid.x - hip-mid.x| in normalized coordinates.
    pub spine_dx: f32,
    /// |shoulder-mid.y - hip-mid.y| in normalized coordinates.
    pub spine_dy: f32,
    pub left_wrist_below_hip: bool,
    pub right_wrist_below_hip: bool,
    /// Nose-to-hip vertical distance divided by bounding-box height,
    /// both normalized. None when the nose is not confidently visible.
    pub head_hip_ratio: Option<f32>,
    /// Mean visibility across all landmarks; doubles as the detection
    /// confidence reported with any event this frame produces.
    pub visibility: f32,
}

/// Extract features from a pose frame. Returns None for the normal
/// "no subject this frame" case (absent or malformed landmark set),
/// never an error.
pub fn extract(frame: &PoseFrame) -> Option<PoseFeatures> {
    if frame.landmarks.len() != landmark::COUNT || frame.width == 0 || frame.height == 0 {
        return None;
    }

    let width = frame.width as f32;
    let height = frame.height as f32;

    let mut min_x = f32::MAX;
    let mut max_x = f32::MIN;
    let mut min_y = f32::MAX;
    let mut max_y = f32::MIN;
    let mut visibility_sum = 0.0;

    for kp in &frame.landmarks {
        min_x = min_x.min(kp.x);
        max_x = max_x.max(kp.x);
        min_y = min_y.min(kp.y);
        max_y = max_y.max(kp.y);
        visibility_sum += kp.visibility;
    }

    let box_h_norm = max_y - min_y;
    if box_h_norm <= f32::EPSILON {
        return None;
    }

    let bounding_box = BoundingBox {
        x: min_x * width,
        y: min_y * height,
        w: (max_x - min_x) * width,
        h: box_h_norm * height,
    };

    let nose = frame.landmarks[landmark::NOSE];
    let left_shoulder = frame.landmarks[landmark::LEFT_SHOULDER];
    let right_shoulder = frame.landmarks[landmark::RIGHT_SHOULDER];
    let left_hip = frame.landmarks[landmark::LEFT_HIP];
    let right_hip = frame.landmarks[landmark::RIGHT_HIP];
    let left_wrist = frame.landmarks[landmark::LEFT_WRIST];
    let right_wrist = frame.landmarks[landmark::RIGHT_WRIST];

    let shoulder_mid_x = (left_shoulder.x + right_shoulder.x) / 2.0;
    let shoulder_mid_y = (left_shoulder.y + right_shoulder.y) / 2.0;
    let hip_mid_x = (left_hip.x + right_hip.x) / 2.0;
    let hip_mid_y = (left_hip.y + right_hip.y) / 2.0;

    let head_hip_ratio = if nose.visibility > LANDMARK_VISIBILITY_MIN {
        Some((nose.y - hip_mid_y).abs() / box_h_norm)
    } else {
        None
    };

    Some(PoseFeatures {
        bounding_box,
        aspect_ratio: bounding_box.w / bounding_box.h,
        spine_dx: (shoulder_mid_x - hip_mid_x).abs(),
        spine_dy: (shoulder_mid_y - hip_mid_y).abs(),
        left_wrist_below_hip: left_wrist.visibility > LANDMARK_VISIBILITY_MIN
            && left_wrist.y > hip_mid_y,
        right_wrist_below_hip: right_wrist.visibility > LANDMARK_VISIBILITY_MIN
            && right_wrist.y > hip_mid_y,
        head_hip_ratio,
        visibility: visibility_sum / landmark::COUNT as f32,
    })
}
