// src/zone.rs
//
// Spatial zone gate. A zone restricts where a crawling detection is
// actionable; it never detects behavior on its own. Crawling outside
// the zone is downgraded to a distinct non-threat label.

use crate::hysteresis::StableLabel;
use crate::types::{ActionType, SecurityStatus, ZoneRect};

/// Absent zone means the whole frame is in-bounds.
pub fn in_zone(zone: Option<&ZoneRect>, center: (f32, f32)) -> bool {
    match zone {
        Some(rect) => rect.contains(center.0, center.1),
        None => true,
    }
}

/// Map the stabilized label plus the zone verdict onto the effective
/// action and safety status.
pub fn effective_action(label: StableLabel, inside: bool) -> (ActionType, SecurityStatus) {
    match (label, inside) {
        (StableLabel::Crawling, true) => (ActionType::Crawling, SecurityStatus::Danger),
        (StableLabel::Crawling, false) => {
            (ActionType::LoiteringOutsideZone, SecurityStatus::Safe)
        }
        (StableLabel::Walking, _) => (ActionType::Walking, SecurityStatus::Safe),
    }
}
