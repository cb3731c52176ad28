// SPDX-License-Identifier: MIT OR Apache-2.0
//! Timeline engine for Playbook.
//!
//! This crate choreographs a fixed set of entities (players and a ball) over a
//! discrete timeline:
//! - Keyframe storage with linear pose interpolation
//! - Per-entity tracks of non-overlapping recorded segments
//! - Live recording of dragged entities
//! - A real-time playback clock that stops at recording boundaries
//! - Snapshot-based undo/redo
//!
//! ## Architecture
//!
//! [`Board`] owns all state and exposes the commands and queries a front end
//! needs. Rendering and input handling live outside this crate; the front end
//! drives the playback loop by running the frames the board schedules.

pub mod board;
pub mod config;
pub mod entity;
pub mod history;
pub mod keyframe;
pub mod playback;
pub mod recording;
pub mod timeline;
pub mod track;

pub use board::{Board, SegmentRef, Selection};
pub use config::{BoardConfig, ConfigError, TeamConfig};
pub use entity::{Entity, EntityId, EntityKind};
pub use history::{History, HistoryError, HistoryStats, StateSnapshot, MAX_HISTORY};
pub use keyframe::{Interpolation, Keyframe, KeyframeChannel, KeyframeStore, Pose, Tick};
pub use playback::{FrameOutcome, FrameTicket, PlaybackClock};
pub use recording::{RecordingOutcome, RecordingSession, RecordingState};
pub use timeline::Timeline;
pub use track::{Segment, SegmentEdge, Track, MIN_SEGMENT_TICKS};
