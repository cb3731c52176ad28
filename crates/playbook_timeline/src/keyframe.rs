// SPDX-License-Identifier: MIT OR Apache-2.0
//! Keyframe storage and sampling.
//!
//! Every entity owns one [`KeyframeChannel`]: a tick-sorted, tick-unique list of
//! pose samples. Sampling between two samples is a plain linear blend of
//! `x`, `y` and `angle`.

use crate::entity::EntityId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Integer position on the timeline
pub type Tick = i64;

/// Position and heading of an entity on the field
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    /// Field-relative x coordinate
    pub x: f32,
    /// Field-relative y coordinate
    pub y: f32,
    /// Heading in degrees
    pub angle: f32,
}

impl Pose {
    /// Create a new pose
    pub fn new(x: f32, y: f32, angle: f32) -> Self {
        Self { x, y, angle }
    }

    /// Same pose moved to a new position, keeping the heading
    pub fn with_position(self, x: f32, y: f32) -> Self {
        Self { x, y, ..self }
    }

    /// Linear blend towards `other`.
    ///
    /// The heading is blended numerically: 350 -> 10 sweeps through 180.
    pub fn lerp(&self, other: &Pose, t: f32) -> Pose {
        Pose {
            x: Interpolation::lerp(self.x, other.x, t),
            y: Interpolation::lerp(self.y, other.y, t),
            angle: Interpolation::lerp(self.angle, other.angle, t),
        }
    }
}

/// A pose sample at a tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Tick of the sample
    pub tick: Tick,
    /// Sampled pose
    pub pose: Pose,
}

impl Keyframe {
    /// Create a new keyframe
    pub fn new(tick: Tick, pose: Pose) -> Self {
        Self { tick, pose }
    }
}

/// Interpolation utilities
pub struct Interpolation;

impl Interpolation {
    /// Linear interpolation between two floats
    pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
        a + (b - a) * t
    }
}

/// Ordered keyframes of a single entity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyframeChannel {
    keyframes: Vec<Keyframe>,
}

impl KeyframeChannel {
    /// Create an empty channel
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a sample, overwriting any sample already at `tick`
    pub fn set(&mut self, tick: Tick, pose: Pose) {
        match self.keyframes.binary_search_by_key(&tick, |k| k.tick) {
            Ok(idx) => self.keyframes[idx].pose = pose,
            Err(idx) => self.keyframes.insert(idx, Keyframe::new(tick, pose)),
        }
    }

    /// Sample the channel at `tick`.
    ///
    /// Holds the first pose before the first sample and the last pose after the
    /// last one.
    pub fn sample(&self, tick: f64) -> Option<Pose> {
        let first = self.keyframes.first()?;
        let last = self.keyframes.last()?;

        if tick <= first.tick as f64 {
            return Some(first.pose);
        }
        if tick >= last.tick as f64 {
            return Some(last.pose);
        }

        // First sample strictly after `tick`; never 0 or len here.
        let next_idx = self.keyframes.partition_point(|k| (k.tick as f64) <= tick);
        let a = &self.keyframes[next_idx - 1];
        let b = &self.keyframes[next_idx];
        let t = (tick - a.tick as f64) / (b.tick - a.tick) as f64;
        Some(a.pose.lerp(&b.pose, t as f32))
    }

    /// Remove samples with `lo <= tick <= hi`
    pub fn remove_range(&mut self, lo: Tick, hi: Tick) {
        self.keyframes.retain(|k| k.tick < lo || k.tick > hi);
    }

    /// Re-map the tick of every sample inside `[lo, hi]`.
    ///
    /// Samples outside the range are never touched: a mapped sample landing on
    /// one of them is dropped. Mapped samples colliding with each other keep
    /// the later one.
    pub fn retime_range(&mut self, lo: Tick, hi: Tick, mut map: impl FnMut(Tick) -> Tick) {
        let (inside, outside): (Vec<Keyframe>, Vec<Keyframe>) = self
            .keyframes
            .drain(..)
            .partition(|k| k.tick >= lo && k.tick <= hi);

        let mut retimed = KeyframeChannel::new();
        for kf in inside {
            retimed.set(map(kf.tick), kf.pose);
        }

        self.keyframes = outside;
        for kf in retimed.keyframes {
            if self.at(kf.tick).is_some() {
                tracing::debug!("Dropped re-timed keyframe colliding at tick {}", kf.tick);
                continue;
            }
            self.set(kf.tick, kf.pose);
        }
    }

    /// Sample exactly at `tick`, if any
    pub fn at(&self, tick: Tick) -> Option<&Keyframe> {
        self.keyframes
            .binary_search_by_key(&tick, |k| k.tick)
            .ok()
            .map(|idx| &self.keyframes[idx])
    }

    /// All samples in tick order
    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    /// Whether the channel has no samples
    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }
}

/// Keyframe channels for every entity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyframeStore {
    channels: IndexMap<EntityId, KeyframeChannel>,
}

impl KeyframeStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the sample at `tick` for `entity`
    pub fn set_keyframe(&mut self, entity: EntityId, tick: Tick, pose: Pose) {
        self.channels.entry(entity).or_default().set(tick, pose);
    }

    /// Sample `entity` at `tick`; `None` if it has no keyframes
    pub fn sample(&self, entity: EntityId, tick: f64) -> Option<Pose> {
        self.channels.get(&entity)?.sample(tick)
    }

    /// Remove samples of `entity` with `lo <= tick <= hi`
    pub fn remove_range(&mut self, entity: EntityId, lo: Tick, hi: Tick) {
        if let Some(channel) = self.channels.get_mut(&entity) {
            channel.remove_range(lo, hi);
        }
    }

    /// Re-map the ticks of samples of `entity` inside `[lo, hi]`
    pub fn retime_range(
        &mut self,
        entity: EntityId,
        lo: Tick,
        hi: Tick,
        map: impl FnMut(Tick) -> Tick,
    ) {
        if let Some(channel) = self.channels.get_mut(&entity) {
            channel.retime_range(lo, hi, map);
        }
    }

    /// Channel of `entity`, if it ever received a keyframe
    pub fn channel(&self, entity: EntityId) -> Option<&KeyframeChannel> {
        self.channels.get(&entity)
    }

    /// Samples of `entity` in tick order
    pub fn keyframes(&self, entity: EntityId) -> &[Keyframe] {
        self.channels
            .get(&entity)
            .map(KeyframeChannel::keyframes)
            .unwrap_or_default()
    }

    /// Total number of samples across all entities
    pub fn keyframe_count(&self) -> usize {
        self.channels.values().map(KeyframeChannel::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticks(channel: &KeyframeChannel) -> Vec<Tick> {
        channel.keyframes().iter().map(|k| k.tick).collect()
    }

    #[test]
    fn test_set_keeps_order_and_overwrites() {
        let mut channel = KeyframeChannel::new();
        channel.set(10, Pose::new(1.0, 0.0, 0.0));
        channel.set(0, Pose::new(0.0, 0.0, 0.0));
        channel.set(5, Pose::new(0.5, 0.0, 0.0));
        channel.set(5, Pose::new(0.7, 0.0, 0.0));

        assert_eq!(ticks(&channel), vec![0, 5, 10]);
        assert_eq!(channel.at(5).map(|k| k.pose.x), Some(0.7));
    }

    #[test]
    fn test_sample_empty() {
        let channel = KeyframeChannel::new();
        assert_eq!(channel.sample(3.0), None);

        let store = KeyframeStore::new();
        assert_eq!(store.sample(EntityId(0), 3.0), None);
    }

    #[test]
    fn test_sample_interpolates_and_clamps() {
        let mut channel = KeyframeChannel::new();
        channel.set(0, Pose::new(0.0, 0.0, 0.0));
        channel.set(10, Pose::new(10.0, 0.0, 0.0));

        assert_eq!(channel.sample(5.0), Some(Pose::new(5.0, 0.0, 0.0)));
        assert_eq!(channel.sample(-4.0), Some(Pose::new(0.0, 0.0, 0.0)));
        assert_eq!(channel.sample(0.0), Some(Pose::new(0.0, 0.0, 0.0)));
        assert_eq!(channel.sample(10.0), Some(Pose::new(10.0, 0.0, 0.0)));
        assert_eq!(channel.sample(99.0), Some(Pose::new(10.0, 0.0, 0.0)));
    }

    #[test]
    fn test_sample_exact_inner_keyframe() {
        let mut channel = KeyframeChannel::new();
        channel.set(0, Pose::new(0.0, 0.0, 0.0));
        channel.set(4, Pose::new(4.0, 2.0, 0.0));
        channel.set(8, Pose::new(0.0, 0.0, 0.0));

        assert_eq!(channel.sample(4.0), Some(Pose::new(4.0, 2.0, 0.0)));
        assert_eq!(channel.sample(6.0), Some(Pose::new(2.0, 1.0, 0.0)));
    }

    #[test]
    fn test_angle_blend_does_not_wrap() {
        let mut channel = KeyframeChannel::new();
        channel.set(0, Pose::new(0.0, 0.0, 350.0));
        channel.set(10, Pose::new(0.0, 0.0, 10.0));

        let mid = channel.sample(5.0).map(|p| p.angle);
        assert_eq!(mid, Some(180.0));
    }

    #[test]
    fn test_remove_range_is_inclusive() {
        let mut channel = KeyframeChannel::new();
        for tick in [0, 5, 10, 15] {
            channel.set(tick, Pose::default());
        }

        channel.remove_range(5, 10);
        assert_eq!(ticks(&channel), vec![0, 15]);
    }

    #[test]
    fn test_retime_range_shifts_only_inside() {
        let mut channel = KeyframeChannel::new();
        for tick in [0, 5, 10, 20] {
            channel.set(tick, Pose::new(tick as f32, 0.0, 0.0));
        }

        channel.retime_range(5, 10, |t| t + 7);
        assert_eq!(ticks(&channel), vec![0, 12, 17, 20]);
        assert_eq!(channel.at(17).map(|k| k.pose.x), Some(10.0));
    }

    #[test]
    fn test_retime_collision_keeps_ticks_unique() {
        let mut channel = KeyframeChannel::new();
        channel.set(0, Pose::new(0.0, 0.0, 0.0));
        channel.set(1, Pose::new(1.0, 0.0, 0.0));
        channel.set(5, Pose::new(5.0, 0.0, 0.0));

        // Squash everything onto tick 0.
        channel.retime_range(0, 5, |_| 0);
        assert_eq!(ticks(&channel), vec![0]);
        assert_eq!(channel.at(0).map(|k| k.pose.x), Some(5.0));
    }

    #[test]
    fn test_retime_never_overwrites_outside_samples() {
        let mut channel = KeyframeChannel::new();
        channel.set(0, Pose::new(0.0, 0.0, 0.0));
        channel.set(5, Pose::new(5.0, 0.0, 0.0));
        channel.set(10, Pose::new(99.0, 0.0, 0.0));

        channel.retime_range(0, 5, |t| t + 5);
        assert_eq!(ticks(&channel), vec![5, 10]);
        assert_eq!(channel.at(5).map(|k| k.pose.x), Some(0.0));
        assert_eq!(channel.at(10).map(|k| k.pose.x), Some(99.0));
    }

    #[test]
    fn test_store_routes_per_entity() {
        let mut store = KeyframeStore::new();
        store.set_keyframe(EntityId(1), 0, Pose::new(1.0, 1.0, 0.0));
        store.set_keyframe(EntityId(2), 0, Pose::new(2.0, 2.0, 0.0));
        store.remove_range(EntityId(1), 0, 0);

        assert!(store.keyframes(EntityId(1)).is_empty());
        assert_eq!(store.keyframes(EntityId(2)).len(), 1);
        assert_eq!(store.keyframe_count(), 1);
    }
}
