// src/pipeline/event_bus.rs
//
// Decoupled outbound channel. The pipeline publishes events and side
// effects as values; the host decides delivery (UI log, audio, export)
// without the decision logic ever blocking on I/O.

use crate::types::{ActionType, DetectionEvent};
use std::collections::VecDeque;
use tracing::warn;

#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// A DANGER event entered the log.
    AlertRaised(DetectionEvent),
    /// A SAFE informational event entered the log.
    ActivityLogged(DetectionEvent),
    /// Fire-and-forget spoken warning request. Published at most once
    /// per logged alert, and only while the audio channel is idle.
    SpeakWarning { action: ActionType },
}

pub struct EventBus {
    events: VecDeque<PipelineEvent>,
    max_pending: usize,
}

impl EventBus {
    pub fn new(max_pending: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_pending),
            max_pending,
        }
    }

    pub fn publish(&mut self, event: PipelineEvent) {
        if self.events.len() >= self.max_pending {
            warn!(
                "Event bus full ({} events), dropping oldest",
                self.max_pending
            );
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub fn drain(&mut self) -> Vec<PipelineEvent> {
        self.events.drain(..).collect()
    }

    pub fn pending_count(&self) -> usize {
        self.events.len()
    }
}
