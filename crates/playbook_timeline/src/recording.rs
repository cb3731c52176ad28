// SPDX-License-Identifier: MIT OR Apache-2.0
//! Recording state machine.
//!
//! At most one entity records at a time. A session opens at a tick and closes
//! into a segment once the cursor has moved past that tick.

use crate::entity::EntityId;
use crate::keyframe::Tick;

/// An open recording session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordingSession {
    /// Entity being recorded
    pub entity: EntityId,
    /// Tick the session opened at
    pub start_tick: Tick,
}

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingOutcome {
    /// The cursor never moved forward; no interval was recorded
    Discarded(RecordingSession),
    /// Motion was recorded over `[start_tick, end_tick)`
    Closed {
        /// Entity that was recorded
        entity: EntityId,
        /// First recorded tick
        start_tick: Tick,
        /// End of the recorded interval
        end_tick: Tick,
    },
}

/// Recording state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordingState {
    /// Drags only move entities on screen
    #[default]
    Idle,
    /// Drags of the session's entity write keyframes
    Recording(RecordingSession),
}

impl RecordingState {
    /// Whether a session is open
    pub fn is_active(&self) -> bool {
        matches!(self, RecordingState::Recording(_))
    }

    /// The open session, if any
    pub fn session(&self) -> Option<RecordingSession> {
        match self {
            RecordingState::Recording(session) => Some(*session),
            RecordingState::Idle => None,
        }
    }

    /// Whether `entity` is the one being recorded
    pub fn is_recording(&self, entity: EntityId) -> bool {
        self.session().is_some_and(|s| s.entity == entity)
    }

    /// Open a session. Returns false if one is already open.
    pub fn begin(&mut self, entity: EntityId, start_tick: Tick) -> bool {
        if self.is_active() {
            return false;
        }
        *self = RecordingState::Recording(RecordingSession { entity, start_tick });
        true
    }

    /// Close the open session at `end_tick`
    pub fn finish(&mut self, end_tick: Tick) -> Option<RecordingOutcome> {
        let session = self.session()?;
        *self = RecordingState::Idle;

        if end_tick <= session.start_tick {
            return Some(RecordingOutcome::Discarded(session));
        }
        Some(RecordingOutcome::Closed {
            entity: session.entity,
            start_tick: session.start_tick,
            end_tick,
        })
    }
}
