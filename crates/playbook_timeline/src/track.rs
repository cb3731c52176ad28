// SPDX-License-Identifier: MIT OR Apache-2.0
//! Track and segment definitions.
//!
//! A [`Track`] holds the recorded intervals of one entity. Segments are kept
//! sorted by start tick and never overlap. The planning methods compute where a
//! segment would land after a move or resize without touching any state, so the
//! caller can re-time keyframes before committing.

use crate::entity::EntityId;
use crate::keyframe::Tick;
use serde::{Deserialize, Serialize};

/// Shortest duration a resize may leave a segment with
pub const MIN_SEGMENT_TICKS: Tick = 3;

/// Half-open interval `[start_tick, end_tick)` of recorded motion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// First tick covered
    pub start_tick: Tick,
    /// First tick no longer covered
    pub end_tick: Tick,
}

impl Segment {
    /// Create a new segment
    pub fn new(start_tick: Tick, end_tick: Tick) -> Self {
        Self {
            start_tick,
            end_tick,
        }
    }

    /// Length in ticks
    pub fn duration(&self) -> Tick {
        self.end_tick - self.start_tick
    }

    /// Whether `tick` lies inside the interval
    pub fn contains(&self, tick: Tick) -> bool {
        self.start_tick <= tick && tick < self.end_tick
    }

    /// Whether the two intervals share at least one tick
    pub fn overlaps(&self, other: &Segment) -> bool {
        self.start_tick < other.end_tick && other.start_tick < self.end_tick
    }

    /// Same segment starting at `start_tick`
    pub fn moved_to(&self, start_tick: Tick) -> Segment {
        Segment::new(start_tick, start_tick + self.duration())
    }
}

/// Which edge of a segment a resize drags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentEdge {
    /// The start tick
    Start,
    /// The end tick
    End,
}

/// Recorded intervals of one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Entity the track belongs to
    pub entity: EntityId,
    /// Segments sorted by start tick
    segments: Vec<Segment>,
}

impl Track {
    /// Create an empty track
    pub fn new(entity: EntityId) -> Self {
        Self {
            entity,
            segments: Vec::new(),
        }
    }

    /// Insert a segment keeping the list sorted, returning its index.
    ///
    /// The caller guarantees the segment does not overlap existing ones.
    pub fn add_segment(&mut self, segment: Segment) -> usize {
        let idx = self
            .segments
            .partition_point(|s| s.start_tick <= segment.start_tick);
        self.segments.insert(idx, segment);
        idx
    }

    /// Remove the segment at `index`
    pub fn remove_segment(&mut self, index: usize) -> Option<Segment> {
        (index < self.segments.len()).then(|| self.segments.remove(index))
    }

    /// Replace the segment at `index` and restore ordering.
    ///
    /// Returns the new index of the replaced segment.
    pub fn replace_segment(&mut self, index: usize, segment: Segment) -> Option<usize> {
        self.remove_segment(index)?;
        Some(self.add_segment(segment))
    }

    /// Segment at `index`
    pub fn segment(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    /// All segments in start order
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Segment count
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Segment covering `tick`
    pub fn segment_at(&self, tick: Tick) -> Option<(usize, &Segment)> {
        self.segments.iter().enumerate().find(|(_, s)| s.contains(tick))
    }

    /// Earliest segment start strictly after `tick`
    pub fn next_start_after(&self, tick: Tick) -> Option<Tick> {
        self.segments
            .iter()
            .map(|s| s.start_tick)
            .filter(|&start| start > tick)
            .min()
    }

    /// Whether `candidate` overlaps any segment other than `except`
    pub fn overlaps_any(&self, candidate: &Segment, except: Option<usize>) -> bool {
        self.others(except).any(|(_, s)| s.overlaps(candidate))
    }

    fn others(&self, except: Option<usize>) -> impl Iterator<Item = (usize, &Segment)> {
        self.segments
            .iter()
            .enumerate()
            .filter(move |(i, _)| Some(*i) != except)
    }

    /// Where the segment at `index` lands when dragged towards `desired_start`.
    ///
    /// The start is clamped to the timeline, then snapped against every segment
    /// it would overlap: flush before a neighbor that was ahead of it, flush after
    /// one that was behind it. `None` when the index is unknown or no
    /// overlap-free position exists.
    pub fn plan_move(&self, index: usize, desired_start: Tick, total_ticks: Tick) -> Option<Segment> {
        let current = *self.segments.get(index)?;
        let dur = current.duration();
        let max_start = (total_ticks - dur).max(0);
        let mut start = desired_start.clamp(0, max_start);

        for (_, other) in self.others(Some(index)) {
            if !current.moved_to(start).overlaps(other) {
                continue;
            }
            start = if current.start_tick < other.start_tick {
                other.start_tick - dur
            } else {
                other.end_tick
            };
            start = start.clamp(0, max_start);
        }

        let moved = current.moved_to(start);
        if self.overlaps_any(&moved, Some(index)) {
            return None;
        }
        Some(moved)
    }

    /// Where the segment at `index` lands when `edge` is dragged to `desired`.
    ///
    /// Keeps at least [`MIN_SEGMENT_TICKS`] and stops at the nearest neighbor.
    /// `None` when the index is unknown or the result would be invalid.
    pub fn plan_resize(
        &self,
        index: usize,
        edge: SegmentEdge,
        desired: Tick,
        total_ticks: Tick,
    ) -> Option<Segment> {
        let current = *self.segments.get(index)?;
        let mut resized = current;

        match edge {
            SegmentEdge::Start => {
                resized.start_tick = desired.min(current.end_tick - MIN_SEGMENT_TICKS).max(0);
                for (_, other) in self.others(Some(index)) {
                    if resized.overlaps(other) {
                        resized.start_tick = other.end_tick;
                    }
                }
            }
            SegmentEdge::End => {
                resized.end_tick = desired
                    .max(current.start_tick + MIN_SEGMENT_TICKS)
                    .min(total_ticks);
                for (_, other) in self.others(Some(index)) {
                    if resized.overlaps(other) {
                        resized.end_tick = other.start_tick;
                    }
                }
            }
        }

        if resized.start_tick >= resized.end_tick || self.overlaps_any(&resized, Some(index)) {
            return None;
        }
        Some(resized)
    }
}
