// SPDX-License-Identifier: MIT OR Apache-2.0
//! Board state and the command surface used by the front end.
//!
//! [`Board`] owns the roster, the timeline, the playback clock, the recording
//! session, the selection and the undo history. Every mutation goes through
//! its commands. Commands referring to unknown entities or segments are
//! ignored, since the front end may still be showing a reference that an
//! earlier command invalidated.

use crate::config::BoardConfig;
use crate::entity::{Entity, EntityId};
use crate::history::{self, History, HistoryError, HistoryStats, StateSnapshot};
use crate::keyframe::{Keyframe, Tick};
use crate::playback::{FrameOutcome, FrameTicket, PlaybackClock};
use crate::recording::{RecordingOutcome, RecordingSession, RecordingState};
use crate::timeline::Timeline;
use crate::track::{Segment, SegmentEdge, Track};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Reference to a segment by track and position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SegmentRef {
    /// Entity owning the track
    pub entity: EntityId,
    /// Index in the track's segment list
    pub index: usize,
}

impl SegmentRef {
    /// Create a new segment reference
    pub fn new(entity: EntityId, index: usize) -> Self {
        Self { entity, index }
    }
}

/// Selection state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    /// Selected entity
    pub entity: Option<EntityId>,
    /// Selected segment
    pub segment: Option<SegmentRef>,
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    entities: &'a IndexMap<EntityId, Entity>,
    timeline: &'a Timeline,
}

#[derive(Deserialize)]
struct SnapshotData {
    entities: IndexMap<EntityId, Entity>,
    timeline: Timeline,
}

/// Editable choreography of one set of entities
#[derive(Debug)]
pub struct Board {
    /// Roster with current poses
    entities: IndexMap<EntityId, Entity>,
    /// Tracks and keyframes
    timeline: Timeline,
    /// Time cursor and frame loop
    clock: PlaybackClock,
    /// Open recording session
    recording: RecordingState,
    /// Undo/redo stacks
    history: History,
    /// Current selection
    selection: Selection,
}

impl Board {
    /// Create a board from a configuration
    pub fn new(config: &BoardConfig) -> Self {
        let entities: IndexMap<EntityId, Entity> = config
            .build_entities()
            .into_iter()
            .map(|e| (e.id, e))
            .collect();
        let total_ticks = config.total_ticks();

        Self {
            timeline: Timeline::new(entities.keys().copied(), total_ticks),
            clock: PlaybackClock::new(config.frame_rate, total_ticks),
            entities,
            recording: RecordingState::Idle,
            history: History::new(),
            selection: Selection::default(),
        }
    }

    // --- Queries ---

    /// Current cursor position
    pub fn current_tick(&self) -> f64 {
        self.clock.tick()
    }

    /// Cursor rounded to the nearest tick
    pub fn current_frame(&self) -> Tick {
        self.clock.current_frame()
    }

    /// Last tick of the timeline
    pub fn total_ticks(&self) -> Tick {
        self.timeline.total_ticks()
    }

    /// Ticks per second
    pub fn frame_rate(&self) -> u32 {
        self.clock.frame_rate()
    }

    /// All tracks in roster order
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.timeline.tracks()
    }

    /// Track of `entity`
    pub fn track(&self, entity: EntityId) -> Option<&Track> {
        self.timeline.track(entity)
    }

    /// Segment behind a reference
    pub fn segment(&self, segment: SegmentRef) -> Option<&Segment> {
        self.timeline.track(segment.entity)?.segment(segment.index)
    }

    /// Keyframes of `entity`
    pub fn keyframes(&self, entity: EntityId) -> &[Keyframe] {
        self.timeline.keyframes(entity)
    }

    /// All entities with their current poses
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Entity by id
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Open recording session
    pub fn recording(&self) -> Option<RecordingSession> {
        self.recording.session()
    }

    /// Current selection
    pub fn selection(&self) -> Selection {
        self.selection
    }

    /// Whether playback was requested
    pub fn is_playing(&self) -> bool {
        self.clock.is_playing()
    }

    /// Whether the frame loop should be running
    pub fn is_running(&self) -> bool {
        self.clock.is_playing() || self.recording.is_active()
    }

    /// Frame the host should run next, if the loop is scheduled
    pub fn pending_frame(&self) -> Option<FrameTicket> {
        self.clock.pending_frame()
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Label of the edit the next undo reverts
    pub fn undo_description(&self) -> Option<&str> {
        self.history.undo_description()
    }

    /// Label of the edit the next redo reapplies
    pub fn redo_description(&self) -> Option<&str> {
        self.history.redo_description()
    }

    /// History statistics
    pub fn history_stats(&self) -> HistoryStats {
        self.history.stats()
    }

    // --- Playback ---

    /// Scrub the cursor and resample every entity that is not recording
    pub fn set_tick(&mut self, tick: f64) {
        self.clock.set_tick(tick);
        self.resample();
    }

    /// Jump to the first tick
    pub fn seek_start(&mut self) {
        self.set_tick(0.0);
    }

    /// Jump to the last tick
    pub fn seek_end(&mut self) {
        self.set_tick(self.total_ticks() as f64);
    }

    /// Start or pause playback.
    ///
    /// Pausing keeps the loop alive while a recording is open.
    pub fn set_playing(&mut self, playing: bool) {
        if playing {
            self.clock.play();
            self.clock.start();
            tracing::info!("Playback started at tick {:.1}", self.clock.tick());
        } else {
            self.clock.pause();
            if !self.recording.is_active() {
                self.clock.cancel();
            }
            tracing::info!("Playback paused at tick {:.1}", self.clock.tick());
        }
    }

    /// Toggle play/pause
    pub fn toggle_playback(&mut self) {
        self.set_playing(!self.clock.is_playing());
    }

    /// Run the scheduled frame `ticket` at time `now`.
    ///
    /// Returns the ticket of the next frame, or `None` once the loop stopped or
    /// when `ticket` is stale.
    pub fn on_frame(&mut self, ticket: FrameTicket, now: Instant) -> Option<FrameTicket> {
        let boundary = self
            .recording
            .session()
            .and_then(|s| self.timeline.next_segment_start(s.entity, s.start_tick));

        match self.clock.advance(ticket, now, boundary) {
            FrameOutcome::Stale => None,
            FrameOutcome::Advanced(next) => {
                self.resample();
                Some(next)
            }
            FrameOutcome::ReachedBoundary(tick) => {
                tracing::info!("Recording reached existing segment at tick {tick}");
                self.stop_recording();
                self.clock.pause();
                self.clock.cancel();
                None
            }
            FrameOutcome::ReachedEnd => {
                tracing::info!("Playback reached end of timeline");
                self.resample();
                None
            }
        }
    }

    // --- Selection ---

    /// Select an entity, or clear the entity selection
    pub fn select_entity(&mut self, entity: Option<EntityId>) {
        match entity {
            Some(id) if !self.entities.contains_key(&id) => {
                tracing::debug!("Ignoring selection of unknown entity {id}");
            }
            _ => self.selection.entity = entity,
        }
    }

    /// Select a segment, or clear the segment selection
    pub fn select_segment(&mut self, segment: Option<SegmentRef>) {
        match segment {
            Some(seg) if self.segment(seg).is_none() => {
                tracing::debug!("Ignoring selection of unknown segment {seg:?}");
            }
            _ => self.selection.segment = segment,
        }
    }

    // --- Recording ---

    /// Open a recording session for `entity` at the current tick.
    ///
    /// Starts the frame loop. Recording over an existing segment is undoable.
    pub fn start_recording(&mut self, entity: EntityId) {
        let Some(pose) = self.entities.get(&entity).map(|e| e.pose) else {
            tracing::debug!("Ignoring recording of unknown entity {entity}");
            return;
        };
        if let Some(session) = self.recording.session() {
            tracing::debug!("Recording of {} already open", session.entity);
            return;
        }

        let tick = self.clock.current_frame();
        let overwrites = self
            .timeline
            .track(entity)
            .is_some_and(|t| t.segment_at(tick).is_some());
        if overwrites {
            self.record_history("Overwrite Recording");
        }

        self.timeline.set_keyframe(entity, tick, pose);
        self.recording.begin(entity, tick);
        self.clock.start();
        tracing::info!("Recording {entity} from tick {tick}");
    }

    /// Drag an entity to `(x, y)`.
    ///
    /// The recorded entity writes a keyframe at the current tick; any other
    /// entity only moves until the next resample.
    pub fn update_recording_pose(&mut self, entity: EntityId, x: f32, y: f32) {
        let tick = self.clock.current_frame();
        let recording = self.recording.is_recording(entity);
        let Some(target) = self.entities.get_mut(&entity) else {
            return;
        };

        target.pose = target.pose.with_position(x, y);
        if recording {
            self.timeline.set_keyframe(entity, tick, target.pose);
        }
    }

    /// Turn an entity to `angle` degrees, recording it like a drag
    pub fn rotate_entity(&mut self, entity: EntityId, angle: f32) {
        let tick = self.clock.current_frame();
        let recording = self.recording.is_recording(entity);
        let Some(target) = self.entities.get_mut(&entity) else {
            return;
        };

        target.pose.angle = angle;
        if recording {
            self.timeline.set_keyframe(entity, tick, target.pose);
        }
    }

    /// Close the recording session at the current tick
    pub fn stop_recording(&mut self) {
        let Some(outcome) = self.recording.finish(self.clock.current_frame()) else {
            return;
        };

        match outcome {
            RecordingOutcome::Discarded(session) => {
                tracing::debug!(
                    "Discarded empty recording of {} at tick {}",
                    session.entity,
                    session.start_tick
                );
            }
            RecordingOutcome::Closed {
                entity,
                start_tick,
                end_tick,
            } => {
                let selected = self.selected_on(entity);
                self.timeline.record_segment(entity, start_tick, end_tick);
                self.reselect(entity, selected, None);
                tracing::info!("Recorded {entity} over [{start_tick}, {end_tick})");
            }
        }

        if !self.clock.is_playing() {
            self.clock.cancel();
        }
        self.resample();
    }

    // --- Segment editing ---

    /// Drag a segment towards `desired_start`.
    ///
    /// Part of a continuous gesture: call [`Board::push_snapshot`] once when the
    /// gesture begins.
    pub fn move_segment(&mut self, entity: EntityId, index: usize, desired_start: Tick) {
        let selected = self.selected_on(entity);
        if let Some(new_index) = self.timeline.move_segment(entity, index, desired_start) {
            self.reselect(entity, selected, Some((index, new_index)));
            self.resample();
        }
    }

    /// Drag one edge of a segment to `desired`.
    ///
    /// Part of a continuous gesture: call [`Board::push_snapshot`] once when the
    /// gesture begins.
    pub fn resize_segment(&mut self, entity: EntityId, index: usize, edge: SegmentEdge, desired: Tick) {
        let selected = self.selected_on(entity);
        if let Some(new_index) = self.timeline.resize_segment(entity, index, edge, desired) {
            self.reselect(entity, selected, Some((index, new_index)));
            self.resample();
        }
    }

    /// Delete the selected segment and its keyframes
    pub fn delete_selected_segment(&mut self) {
        let Some(selected) = self.selection.segment else {
            return;
        };
        if self.segment(selected).is_none() {
            tracing::debug!("Selected segment {selected:?} no longer exists");
            return;
        }

        self.record_history("Delete Segment");
        self.timeline.delete_segment(selected.entity, selected.index);
        self.selection.segment = None;
        self.resample();
    }

    /// Index and value of the selected segment if it sits on `entity`'s track
    fn selected_on(&self, entity: EntityId) -> Option<(usize, Segment)> {
        let selected = self.selection.segment.filter(|s| s.entity == entity)?;
        Some((selected.index, *self.segment(selected)?))
    }

    /// Point the selection back at its segment after `entity`'s track changed.
    ///
    /// `edited` maps the index of a segment the edit replaced to its new index.
    /// Any other selected segment is found again by its start tick, which also
    /// picks the merged segment when a recording absorbed it.
    fn reselect(
        &mut self,
        entity: EntityId,
        selected: Option<(usize, Segment)>,
        edited: Option<(usize, usize)>,
    ) {
        let Some((index, segment)) = selected else {
            return;
        };
        let new_index = match edited {
            Some((old, new)) if old == index => Some(new),
            _ => self
                .timeline
                .track(entity)
                .and_then(|t| t.segment_at(segment.start_tick))
                .map(|(i, _)| i),
        };
        self.selection.segment = new_index.map(|i| SegmentRef::new(entity, i));
    }

    // --- History ---

    /// Capture the current state for undo, e.g. at the start of a drag gesture
    pub fn push_snapshot(&mut self) {
        self.record_history("Edit");
    }

    /// Capture the current state for undo under a label
    pub fn push_labeled_snapshot(&mut self, description: &str) {
        self.record_history(description);
    }

    /// Restore the state before the last recorded edit
    pub fn undo(&mut self) {
        match self.try_undo() {
            Ok(()) => {
                tracing::info!("Undo");
                self.after_restore();
            }
            Err(HistoryError::NothingToUndo) => tracing::debug!("Nothing to undo"),
            Err(e) => tracing::error!("Undo failed: {e}"),
        }
    }

    /// Reapply the last undone edit
    pub fn redo(&mut self) {
        match self.try_redo() {
            Ok(()) => {
                tracing::info!("Redo");
                self.after_restore();
            }
            Err(HistoryError::NothingToRedo) => tracing::debug!("Nothing to redo"),
            Err(e) => tracing::error!("Redo failed: {e}"),
        }
    }

    fn try_undo(&mut self) -> history::Result<()> {
        if !self.history.can_undo() {
            return Err(HistoryError::NothingToUndo);
        }
        let current = self.capture()?;
        let previous = self.history.undo(current)?;
        self.restore(&previous)
    }

    fn try_redo(&mut self) -> history::Result<()> {
        if !self.history.can_redo() {
            return Err(HistoryError::NothingToRedo);
        }
        let current = self.capture()?;
        let next = self.history.redo(current)?;
        self.restore(&next)
    }

    fn after_restore(&mut self) {
        self.selection.segment = None;
        self.resample();
    }

    fn record_history(&mut self, description: &str) {
        match self.capture() {
            Ok(snapshot) => self.history.push(description, snapshot),
            Err(e) => tracing::error!("Failed to capture snapshot for {description}: {e}"),
        }
    }

    fn capture(&self) -> history::Result<StateSnapshot> {
        StateSnapshot::from_value(&SnapshotRef {
            entities: &self.entities,
            timeline: &self.timeline,
        })
    }

    fn restore(&mut self, snapshot: &StateSnapshot) -> history::Result<()> {
        let data: SnapshotData = snapshot.to_value()?;
        self.entities = data.entities;
        self.timeline = data.timeline;
        Ok(())
    }

    /// Pull every non-recording entity's pose from its keyframes
    fn resample(&mut self) {
        let tick = self.clock.tick();
        for entity in self.entities.values_mut() {
            if self.recording.is_recording(entity.id) {
                continue;
            }
            if let Some(pose) = self.timeline.sample(entity.id, tick) {
                entity.pose = pose;
            }
        }
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new(&BoardConfig::default())
    }
}
