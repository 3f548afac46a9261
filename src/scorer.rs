// src/scorer.rs
//
// Heuristic action scorer. Sums weighted geometric predicates over one
// frame's features into an action score, then emits a binary
// candidate verdict. Weights and cutoffs are tunable constants, not
// learned; sensitivity rescales predicate strictness so the operator
// can trade false positives against missed detections.

use crate::features::PoseFeatures;

/// Spine is "horizontal" when dx > dy * (this / sensitivity factor).
const SPINE_HORIZONTAL_RATIO: f32 = 0.8;
/// Wide-relative-to-tall silhouette.
const WIDE_ASPECT: f32 = 0.9;
/// Strongly wide silhouette, scaled down by the sensitivity factor.
const STRONG_WIDE_ASPECT: f32 = 1.2;
/// Head counts as "near hip height" below this fraction of box height,
/// scaled up by the sensitivity factor.
const HEAD_NEAR_HIP_RATIO: f32 = 0.4;
/// Score at or above which a frame is a crawling candidate.
const CANDIDATE_SCORE: f32 = 2.5;

/// Per-frame verdict handed to the hysteresis filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    /// Frame discarded pre-scoring: mean visibility under the operator
    /// threshold. Must not touch the hysteresis counter.
    LowConfidence,
    /// Scored frame; candidate=true means crawling-like this frame.
    Scored { candidate: bool, confidence: f32 },
}

pub fn sensitivity_factor(sensitivity: u8) -> f32 {
    f32::from(sensitivity) / 5.0
}

/// Weighted predicate sum over one frame's features.
pub fn action_score(features: &PoseFeatures, sensitivity: u8) -> f32 {
    let factor = sensitivity_factor(sensitivity);
    let mut score = 0.0;

    // Horizontally-oriented torso (lying/crawling) rather than standing.
    if features.spine_dx > features.spine_dy * (SPINE_HORIZONTAL_RATIO / factor) {
        score += 2.0;
    }

    if features.aspect_ratio > WIDE_ASPECT {
        score += 1.0;
    }
    if features.aspect_ratio > STRONG_WIDE_ASPECT / factor {
        score += 1.0;
    }

    if features.left_wrist_below_hip || features.right_wrist_below_hip {
        score += 1.0;
    }

    // Head close to hip height, i.e. not upright.
    if let Some(ratio) = features.head_hip_ratio {
        if ratio < HEAD_NEAR_HIP_RATIO * factor {
            score += 1.0;
        }
    }

    score
}

pub fn score_frame(features: &PoseFeatures, sensitivity: u8, confidence_threshold: f32) -> Verdict {
    if features.visibility < confidence_threshold {
        return Verdict::LowConfidence;
    }

    Verdict::Scored {
        candidate: action_score(features, sensitivity) >= CANDIDATE_SCORE,
        confidence: features.visibility,
    }
}
