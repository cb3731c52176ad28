// SPDX-License-Identifier: MIT OR Apache-2.0
//! Command scripts.
//!
//! A script is a RON list of board commands. `Advance` runs the playback loop
//! for a number of frames with synthetic frame times spaced one tick apart, so
//! a script produces the same result on every run.

use playbook_timeline::{Board, EntityId, SegmentEdge, SegmentRef, Tick};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Script errors
#[derive(Debug, Error)]
pub enum ScriptError {
    /// Reading the file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not a valid script
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// One board command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Scrub the cursor
    SetTick(f64),
    /// Start or pause playback
    SetPlaying(bool),
    /// Select an entity by id
    SelectEntity(Option<u32>),
    /// Select a segment by entity id and index
    SelectSegment(Option<(u32, usize)>),
    /// Open a recording session
    StartRecording(u32),
    /// Drag an entity
    Drag {
        /// Entity id
        entity: u32,
        /// Target x
        x: f32,
        /// Target y
        y: f32,
    },
    /// Turn an entity
    Rotate {
        /// Entity id
        entity: u32,
        /// Heading in degrees
        angle: f32,
    },
    /// Close the recording session
    StopRecording,
    /// Drag a segment
    MoveSegment {
        /// Entity id
        entity: u32,
        /// Segment index
        index: usize,
        /// Desired start tick
        start: Tick,
    },
    /// Drag a segment edge
    ResizeSegment {
        /// Entity id
        entity: u32,
        /// Segment index
        index: usize,
        /// Dragged edge
        edge: SegmentEdge,
        /// Desired tick of the edge
        tick: Tick,
    },
    /// Delete the selected segment
    DeleteSelectedSegment,
    /// Mark the start of a gesture for undo
    PushSnapshot,
    /// Undo
    Undo,
    /// Redo
    Redo,
    /// Run the playback loop for up to `frames` frames
    Advance {
        /// Frame count
        frames: u32,
    },
}

/// A list of commands
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Script {
    /// Commands in execution order
    pub steps: Vec<Command>,
}

impl Script {
    /// Load a RON script file
    pub fn load(path: &Path) -> Result<Self, ScriptError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Parse RON script text
    pub fn from_ron_str(contents: &str) -> Result<Self, ScriptError> {
        Ok(ron::from_str(contents)?)
    }
}

/// Applies commands to a board, driving playback with synthetic time
pub struct ScriptRunner {
    board: Board,
    now: Instant,
    frame_interval: Duration,
}

impl ScriptRunner {
    /// Create a runner for `board`
    pub fn new(board: Board) -> Self {
        let frame_interval = Duration::from_secs_f64(1.0 / f64::from(board.frame_rate()));
        Self {
            board,
            now: Instant::now(),
            frame_interval,
        }
    }

    /// The board being driven
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Run every step of `script`
    pub fn run(&mut self, script: &Script) {
        for (i, step) in script.steps.iter().enumerate() {
            tracing::debug!("Step {i}: {step:?}");
            self.apply(step);
        }
    }

    /// Apply a single command
    pub fn apply(&mut self, command: &Command) {
        let board = &mut self.board;
        match *command {
            Command::SetTick(tick) => board.set_tick(tick),
            Command::SetPlaying(playing) => board.set_playing(playing),
            Command::SelectEntity(entity) => board.select_entity(entity.map(EntityId)),
            Command::SelectSegment(segment) => board.select_segment(
                segment.map(|(entity, index)| SegmentRef::new(EntityId(entity), index)),
            ),
            Command::StartRecording(entity) => board.start_recording(EntityId(entity)),
            Command::Drag { entity, x, y } => board.update_recording_pose(EntityId(entity), x, y),
            Command::Rotate { entity, angle } => board.rotate_entity(EntityId(entity), angle),
            Command::StopRecording => board.stop_recording(),
            Command::MoveSegment {
                entity,
                index,
                start,
            } => board.move_segment(EntityId(entity), index, start),
            Command::ResizeSegment {
                entity,
                index,
                edge,
                tick,
            } => board.resize_segment(EntityId(entity), index, edge, tick),
            Command::DeleteSelectedSegment => board.delete_selected_segment(),
            Command::PushSnapshot => board.push_snapshot(),
            Command::Undo => board.undo(),
            Command::Redo => board.redo(),
            Command::Advance { frames } => self.advance(frames),
        }
    }

    /// Run up to `frames` frames of the playback loop.
    ///
    /// The first frame of a freshly scheduled loop only records its timestamp.
    fn advance(&mut self, frames: u32) {
        for _ in 0..frames {
            let Some(ticket) = self.board.pending_frame() else {
                tracing::debug!("Playback loop idle at tick {:.1}", self.board.current_tick());
                break;
            };
            self.board.on_frame(ticket, self.now);
            self.now += self.frame_interval;
        }
    }
}
