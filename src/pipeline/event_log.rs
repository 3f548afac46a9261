// src/pipeline/event_log.rs
//
// Alert deduplication and the bounded event log. Converts stabilized
// labels into discrete, rate-limited events; the windows are pure
// wall-clock gates against the last logged event's timestamp.

use crate::types::{ActionType, DetectionEvent, SecurityStatus};
use tracing::debug;

/// Retained events; oldest evicted on overflow.
pub const MAX_EVENTS: usize = 50;
/// Minimum gap after any logged event before the next DANGER event.
pub const ALERT_DEDUP_MS: u64 = 3_000;
/// Minimum gap before a SAFE informational event.
pub const INFO_GAP_MS: u64 = 10_000;
/// Confidence floor for SAFE informational events.
pub const INFO_CONFIDENCE_MIN: f32 = 0.6;

/// What the log did with one accepted frame update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// New DANGER event appended.
    DangerLogged,
    /// New SAFE informational event appended.
    InfoLogged,
    /// DANGER-worthy but inside the dedup window.
    AlertSuppressed,
    /// Nothing worth logging.
    Skipped,
}

#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<DetectionEvent>,
    /// Timestamp of the most recently logged event. Kept apart from the
    /// retained events so stream restarts can reset the rate gates
    /// without discarding the operator's log, and so dismissal never
    /// reopens a window.
    last_event_ms: Option<u64>,
    /// Sequence suffix for event ids. Stream timestamps restart from
    /// zero on every recording, so the timestamp alone can collide
    /// across streams; the sequence keeps ids unique for the log's
    /// lifetime so dismissal only ever targets one event.
    next_seq: u64,
    total_alerts: u64,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self, now_ms: u64) -> String {
        let id = format!("{}-{}", now_ms, self.next_seq);
        self.next_seq += 1;
        id
    }

    /// Fold one accepted frame update into the log. `snapshot` is the
    /// base64 evidence still, already gated upstream; it is only ever
    /// attached to DANGER events.
    pub fn record(
        &mut self,
        now_ms: u64,
        action: ActionType,
        status: SecurityStatus,
        confidence: f32,
        snapshot: Option<String>,
    ) -> RecordOutcome {
        let since_last = self.last_event_ms.map(|last| now_ms.saturating_sub(last));

        match status {
            SecurityStatus::Danger => {
                if let Some(gap) = since_last.filter(|gap| *gap < ALERT_DEDUP_MS) {
                    debug!("Alert suppressed, {}ms since last event", gap);
                    return RecordOutcome::AlertSuppressed;
                }

                self.last_event_ms = Some(now_ms);
                let id = self.next_id(now_ms);
                self.push(DetectionEvent {
                    id,
                    timestamp_ms: now_ms,
                    action,
                    confidence,
                    status: SecurityStatus::Danger,
                    message: format!("Suspicious {} pattern detected", action),
                    snapshot,
                });
                self.total_alerts += 1;
                RecordOutcome::DangerLogged
            }
            SecurityStatus::Safe => {
                let gap_open = since_last.map_or(true, |gap| gap > INFO_GAP_MS);
                if confidence > INFO_CONFIDENCE_MIN && gap_open && action != ActionType::None {
                    self.last_event_ms = Some(now_ms);
                    let id = self.next_id(now_ms);
                    self.push(DetectionEvent {
                        id,
                        timestamp_ms: now_ms,
                        action,
                        confidence,
                        status: SecurityStatus::Safe,
                        message: format!("Activity monitored: {}", action),
                        snapshot: None,
                    });
                    RecordOutcome::InfoLogged
                } else {
                    RecordOutcome::Skipped
                }
            }
        }
    }

    fn push(&mut self, event: DetectionEvent) {
        if self.events.len() >= MAX_EVENTS {
            self.events.remove(0);
        }
        self.events.push(event);
    }

    /// Operator-initiated removal by id, independent of the rate rules.
    pub fn dismiss(&mut self, id: &str) -> bool {
        let before = self.events.len();
        self.events.retain(|event| event.id != id);
        self.events.len() != before
    }

    pub fn events(&self) -> &[DetectionEvent] {
        &self.events
    }

    pub fn latest(&self) -> Option<&DetectionEvent> {
        self.events.last()
    }

    pub fn total_alerts(&self) -> u64 {
        self.total_alerts
    }

    /// Reopen the rate gates for a fresh stream. Retained events and
    /// the alert counter survive; only the dedup clock resets.
    pub fn reset_gate(&mut self) {
        self.last_event_ms = None;
    }
}
