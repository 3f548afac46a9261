// src/privacy.rs
//
// Privacy redaction gate. Computes where identity-bearing pixels must
// be blurred. This is a rendering instruction only: it never alters
// the action score or the event decision, and the host must composite
// it into live view and evidence snapshots alike.

use crate::features::{landmark, LANDMARK_VISIBILITY_MIN};
use crate::types::PoseFrame;

/// Blur disc diameter is four inter-eye distances, floored here (px).
const MIN_BLUR_DIAMETER: f32 = 60.0;
const EYE_DISTANCE_SCALE: f32 = 4.0;

/// Circular redaction region in frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RedactionDisc {
    pub cx: f32,
    pub cy: f32,
    pub radius: f32,
}

/// Returns the face redaction disc when privacy mode is active and the
/// face anchor (nose) is confidently visible.
pub fn redaction_disc(frame: &PoseFrame, enabled: bool) -> Option<RedactionDisc> {
    if !enabled || frame.landmarks.len() != landmark::COUNT {
        return None;
    }

    let nose = frame.landmarks[landmark::NOSE];
    if nose.visibility <= LANDMARK_VISIBILITY_MIN {
        return None;
    }

    let width = frame.width as f32;
    let left_eye = frame.landmarks[landmark::LEFT_EYE];
    let right_eye = frame.landmarks[landmark::RIGHT_EYE];
    let eye_distance = (left_eye.x - right_eye.x).abs() * width;
    let diameter = (eye_distance * EYE_DISTANCE_SCALE).max(MIN_BLUR_DIAMETER);

    Some(RedactionDisc {
        cx: nose.x * width,
        cy: nose.y * frame.height as f32,
        radius: diameter / 2.0,
    })
}
