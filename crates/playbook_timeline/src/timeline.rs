// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tracks and keyframes of every entity over a fixed-length timeline.
//!
//! All segment edits go through [`Timeline`] so that keyframes follow their
//! segments: shifted on move, stretched on resize, dropped on delete.

use crate::entity::EntityId;
use crate::keyframe::{Keyframe, KeyframeStore, Pose, Tick};
use crate::track::{Segment, SegmentEdge, Track};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Tracks plus keyframes, bounded by `total_ticks`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    /// One track per entity, in roster order
    tracks: IndexMap<EntityId, Track>,
    /// Pose samples of every entity
    keyframes: KeyframeStore,
    /// Last tick of the timeline
    total_ticks: Tick,
}

impl Timeline {
    /// Create a timeline with one empty track per entity
    pub fn new(entities: impl IntoIterator<Item = EntityId>, total_ticks: Tick) -> Self {
        Self {
            tracks: entities
                .into_iter()
                .map(|id| (id, Track::new(id)))
                .collect(),
            keyframes: KeyframeStore::new(),
            total_ticks: total_ticks.max(0),
        }
    }

    /// Last tick of the timeline
    pub fn total_ticks(&self) -> Tick {
        self.total_ticks
    }

    /// Track of `entity`
    pub fn track(&self, entity: EntityId) -> Option<&Track> {
        self.tracks.get(&entity)
    }

    /// All tracks in roster order
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    /// Keyframes of `entity`
    pub fn keyframes(&self, entity: EntityId) -> &[Keyframe] {
        self.keyframes.keyframes(entity)
    }

    /// Insert or overwrite a keyframe of a known entity
    pub fn set_keyframe(&mut self, entity: EntityId, tick: Tick, pose: Pose) {
        if self.tracks.contains_key(&entity) {
            self.keyframes.set_keyframe(entity, tick, pose);
        }
    }

    /// Interpolated pose of `entity` at `tick`
    pub fn sample(&self, entity: EntityId, tick: f64) -> Option<Pose> {
        self.keyframes.sample(entity, tick)
    }

    /// Earliest segment start of `entity` strictly after `tick`
    pub fn next_segment_start(&self, entity: EntityId, tick: Tick) -> Option<Tick> {
        self.track(entity)?.next_start_after(tick)
    }

    /// Add `[start, end)` to the track of `entity`, returning its index.
    ///
    /// Rejected when empty or when it would overlap an existing segment.
    pub fn add_segment(&mut self, entity: EntityId, start: Tick, end: Tick) -> Option<usize> {
        let track = self.tracks.get_mut(&entity)?;
        let segment = Segment::new(start, end);
        if start >= end || track.overlaps_any(&segment, None) {
            tracing::debug!("Rejected segment [{start}, {end}) on {entity}");
            return None;
        }
        Some(track.add_segment(segment))
    }

    /// Close a recorded interval on the track of `entity`.
    ///
    /// Segments the interval overlaps are absorbed so the result is a single
    /// segment spanning all of them.
    pub fn record_segment(&mut self, entity: EntityId, start: Tick, end: Tick) -> Option<usize> {
        if start >= end {
            return None;
        }
        let mut merged = Segment::new(start, end);
        if !self.track(entity)?.overlaps_any(&merged, None) {
            return self.add_segment(entity, start, end);
        }

        let track = self.tracks.get_mut(&entity)?;
        while let Some(idx) = track
            .segments()
            .iter()
            .position(|s| s.overlaps(&merged))
        {
            if let Some(absorbed) = track.remove_segment(idx) {
                merged.start_tick = merged.start_tick.min(absorbed.start_tick);
                merged.end_tick = merged.end_tick.max(absorbed.end_tick);
            }
        }
        Some(track.add_segment(merged))
    }

    /// Remove a segment together with its keyframes
    pub fn delete_segment(&mut self, entity: EntityId, index: usize) -> Option<Segment> {
        let segment = self.tracks.get_mut(&entity)?.remove_segment(index)?;
        self.keyframes
            .remove_range(entity, segment.start_tick, segment.end_tick);
        Some(segment)
    }

    /// Drag a segment towards `desired_start`, carrying its keyframes along.
    ///
    /// Returns the segment's index after the move, or `None` when nothing changed.
    pub fn move_segment(&mut self, entity: EntityId, index: usize, desired_start: Tick) -> Option<usize> {
        let track = self.tracks.get(&entity)?;
        let old = *track.segment(index)?;
        let Some(new) = track.plan_move(index, desired_start, self.total_ticks) else {
            tracing::debug!("Move of segment {index} on {entity} blocked");
            return None;
        };

        let delta = new.start_tick - old.start_tick;
        if delta == 0 {
            return None;
        }

        self.keyframes
            .retime_range(entity, old.start_tick, old.end_tick, |tick| tick + delta);
        self.tracks.get_mut(&entity)?.replace_segment(index, new)
    }

    /// Drag one edge of a segment to `desired`, stretching its keyframes.
    ///
    /// Returns the segment's index after the resize, or `None` when nothing changed.
    pub fn resize_segment(
        &mut self,
        entity: EntityId,
        index: usize,
        edge: SegmentEdge,
        desired: Tick,
    ) -> Option<usize> {
        let track = self.tracks.get(&entity)?;
        let old = *track.segment(index)?;
        let Some(new) = track.plan_resize(index, edge, desired, self.total_ticks) else {
            tracing::debug!("Resize of segment {index} on {entity} blocked");
            return None;
        };
        if new == old {
            return None;
        }

        let old_dur = old.duration() as f64;
        let new_dur = new.duration() as f64;
        self.keyframes
            .retime_range(entity, old.start_tick, old.end_tick, |tick| {
                let frac = if old_dur == 0.0 {
                    0.0
                } else {
                    (tick - old.start_tick) as f64 / old_dur
                };
                (new.start_tick as f64 + frac * new_dur).round() as Tick
            });
        self.tracks.get_mut(&entity)?.replace_segment(index, new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const E: EntityId = EntityId(0);

    fn timeline() -> Timeline {
        Timeline::new([E, EntityId(1)], 100)
    }

    fn ticks(timeline: &Timeline) -> Vec<Tick> {
        timeline.keyframes(E).iter().map(|k| k.tick).collect()
    }

    fn assert_no_overlap(timeline: &Timeline) {
        for track in timeline.tracks() {
            for pair in track.segments().windows(2) {
                assert!(pair[0].end_tick <= pair[1].start_tick, "{pair:?}");
            }
        }
    }

    #[test]
    fn test_add_segment_rejects_overlap_and_empty() {
        let mut tl = timeline();
        assert_eq!(tl.add_segment(E, 0, 10), Some(0));
        assert_eq!(tl.add_segment(E, 5, 15), None);
        assert_eq!(tl.add_segment(E, 20, 20), None);
        assert_eq!(tl.add_segment(EntityId(9), 0, 10), None);
        assert_eq!(tl.track(E).map(Track::segment_count), Some(1));
    }

    #[test]
    fn test_delete_removes_keyframes_inclusive() {
        let mut tl = timeline();
        tl.add_segment(E, 10, 20);
        for tick in [5, 10, 15, 20, 25] {
            tl.set_keyframe(E, tick, Pose::default());
        }

        assert_eq!(tl.delete_segment(E, 0), Some(Segment::new(10, 20)));
        assert_eq!(ticks(&tl), vec![5, 25]);
        assert_eq!(tl.delete_segment(E, 0), None);
    }

    #[test]
    fn test_move_retimes_keyframes() {
        let mut tl = timeline();
        tl.add_segment(E, 0, 5);
        tl.add_segment(E, 10, 15);
        tl.set_keyframe(E, 0, Pose::new(0.0, 0.0, 0.0));
        tl.set_keyframe(E, 5, Pose::new(5.0, 0.0, 0.0));
        tl.set_keyframe(E, 12, Pose::new(12.0, 0.0, 0.0));

        assert_eq!(tl.move_segment(E, 0, 8), Some(0));
        let track = tl.track(E).map(|t| t.segments().to_vec());
        assert_eq!(track, Some(vec![Segment::new(5, 10), Segment::new(10, 15)]));
        assert_eq!(ticks(&tl), vec![5, 10, 12]);
        assert_no_overlap(&tl);
    }

    #[test]
    fn test_move_to_same_start_is_noop() {
        let mut tl = timeline();
        tl.add_segment(E, 0, 5);
        tl.set_keyframe(E, 0, Pose::default());
        assert_eq!(tl.move_segment(E, 0, 0), None);
        assert_eq!(ticks(&tl), vec![0]);
    }

    #[test]
    fn test_move_into_free_space_reorders() {
        let mut tl = timeline();
        tl.add_segment(E, 0, 5);
        tl.add_segment(E, 10, 15);

        assert_eq!(tl.move_segment(E, 0, 40), Some(1));
        let starts: Vec<_> = tl
            .track(E)
            .map(|t| t.segments().iter().map(|s| s.start_tick).collect())
            .unwrap_or_default();
        assert_eq!(starts, vec![10, 40]);
    }

    #[test]
    fn test_resize_end_stretches_keyframes() {
        let mut tl = timeline();
        tl.add_segment(E, 0, 10);
        tl.set_keyframe(E, 0, Pose::new(0.0, 0.0, 0.0));
        tl.set_keyframe(E, 5, Pose::new(5.0, 0.0, 0.0));
        tl.set_keyframe(E, 10, Pose::new(10.0, 0.0, 0.0));

        assert_eq!(tl.resize_segment(E, 0, SegmentEdge::End, 20), Some(0));
        assert_eq!(ticks(&tl), vec![0, 10, 20]);
        assert_eq!(tl.track(E).and_then(|t| t.segment(0)).copied(), Some(Segment::new(0, 20)));
    }

    #[test]
    fn test_resize_start_compresses_keyframes() {
        let mut tl = timeline();
        tl.add_segment(E, 0, 10);
        tl.set_keyframe(E, 0, Pose::default());
        tl.set_keyframe(E, 10, Pose::default());
        tl.set_keyframe(E, 30, Pose::default());

        assert_eq!(tl.resize_segment(E, 0, SegmentEdge::Start, 5), Some(0));
        assert_eq!(ticks(&tl), vec![5, 10, 30]);
    }

    #[test]
    fn test_resize_unchanged_is_noop() {
        let mut tl = timeline();
        tl.add_segment(E, 0, 10);
        assert_eq!(tl.resize_segment(E, 0, SegmentEdge::End, 10), None);
        assert_eq!(tl.resize_segment(E, 4, SegmentEdge::End, 30), None);
    }

    #[test]
    fn test_record_segment_absorbs_overlapped() {
        let mut tl = timeline();
        tl.add_segment(E, 10, 20);
        tl.add_segment(E, 30, 40);

        assert_eq!(tl.record_segment(E, 15, 25), Some(0));
        let segments = tl.track(E).map(|t| t.segments().to_vec());
        assert_eq!(segments, Some(vec![Segment::new(10, 25), Segment::new(30, 40)]));
        assert_eq!(tl.record_segment(E, 25, 25), None);
    }

    #[test]
    fn test_record_segment_without_overlap_inserts_in_order() {
        let mut tl = timeline();
        tl.add_segment(E, 30, 40);

        assert_eq!(tl.record_segment(E, 0, 10), Some(0));
        assert_eq!(tl.record_segment(E, 10, 30), Some(1));
        let segments = tl.track(E).map(|t| t.segments().to_vec());
        assert_eq!(
            segments,
            Some(vec![Segment::new(0, 10), Segment::new(10, 30), Segment::new(30, 40)])
        );
        assert_eq!(tl.record_segment(EntityId(9), 0, 10), None);
    }

    #[test]
    fn test_resize_keeps_neighbor_anchor() {
        let mut tl = timeline();
        tl.add_segment(E, 5, 10);
        tl.add_segment(E, 20, 30);
        tl.set_keyframe(E, 5, Pose::new(5.0, 0.0, 0.0));
        tl.set_keyframe(E, 10, Pose::new(1.0, 0.0, 0.0));
        tl.set_keyframe(E, 20, Pose::new(99.0, 0.0, 0.0));
        tl.set_keyframe(E, 30, Pose::new(30.0, 0.0, 0.0));

        // Pulled back flush against the neighbor at 20.
        assert_eq!(tl.resize_segment(E, 0, SegmentEdge::End, 25), Some(0));
        assert_eq!(tl.track(E).and_then(|t| t.segment(0)).copied(), Some(Segment::new(5, 20)));
        assert_eq!(ticks(&tl), vec![5, 20, 30]);
        assert_eq!(tl.sample(E, 20.0).map(|p| p.x), Some(99.0));
    }

    #[test]
    fn test_move_keeps_neighbor_anchor() {
        let mut tl = timeline();
        tl.add_segment(E, 0, 5);
        tl.add_segment(E, 10, 15);
        tl.set_keyframe(E, 0, Pose::new(0.0, 0.0, 0.0));
        tl.set_keyframe(E, 5, Pose::new(5.0, 0.0, 0.0));
        tl.set_keyframe(E, 10, Pose::new(99.0, 0.0, 0.0));
        tl.set_keyframe(E, 15, Pose::new(15.0, 0.0, 0.0));

        assert_eq!(tl.move_segment(E, 0, 8), Some(0));
        assert_eq!(ticks(&tl), vec![5, 10, 15]);
        assert_eq!(tl.sample(E, 5.0).map(|p| p.x), Some(0.0));
        assert_eq!(tl.sample(E, 10.0).map(|p| p.x), Some(99.0));
    }

    #[test]
    fn test_edit_sequence_keeps_invariants() {
        let mut tl = timeline();
        tl.add_segment(E, 0, 10);
        tl.add_segment(E, 20, 30);
        tl.add_segment(E, 50, 60);
        for tick in [0, 5, 10, 20, 25, 30, 50, 60] {
            tl.set_keyframe(E, tick, Pose::new(tick as f32, 0.0, 0.0));
        }

        tl.move_segment(E, 0, 25);
        tl.resize_segment(E, 1, SegmentEdge::End, 90);
        tl.move_segment(E, 2, 0);
        tl.resize_segment(E, 0, SegmentEdge::Start, 0);
        tl.delete_segment(E, 1);
        tl.move_segment(E, 0, 99);

        assert_no_overlap(&tl);
        let ticks = ticks(&tl);
        assert!(ticks.windows(2).all(|w| w[0] < w[1]), "{ticks:?}");
    }
}
