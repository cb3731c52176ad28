// SPDX-License-Identifier: MIT OR Apache-2.0
//! Undo/redo history built on serialized state snapshots.
//!
//! A snapshot is the bincode encoding of the editable state, so it shares
//! nothing with the live state it was taken from.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use thiserror::Error;

/// Maximum undo history depth
pub const MAX_HISTORY: usize = 100;

/// History errors
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Nothing to undo
    #[error("Nothing to undo")]
    NothingToUndo,

    /// Nothing to redo
    #[error("Nothing to redo")]
    NothingToRedo,

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}

/// Result type for history operations
pub type Result<T> = std::result::Result<T, HistoryError>;

/// Frozen copy of the editable state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSnapshot {
    /// Serialized state
    data: Vec<u8>,
}

impl StateSnapshot {
    /// Capture a serializable value
    pub fn from_value<T: Serialize>(value: &T) -> Result<Self> {
        let data = bincode::serialize(value)?;
        Ok(Self { data })
    }

    /// Decode the captured value
    pub fn to_value<T: for<'de> Deserialize<'de>>(&self) -> Result<T> {
        Ok(bincode::deserialize(&self.data)?)
    }

    /// Size in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// A snapshot with the label of the edit that followed it
#[derive(Debug, Clone)]
struct HistoryEntry {
    description: String,
    snapshot: StateSnapshot,
}

/// History statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryStats {
    /// Entries in the undo stack
    pub undo_count: usize,
    /// Entries in the redo stack
    pub redo_count: usize,
    /// Bytes held by both stacks
    pub memory_used: usize,
    /// Maximum depth of each stack
    pub max_depth: usize,
}

/// Bounded undo/redo stacks
#[derive(Debug)]
pub struct History {
    /// Undo stack, most recent at the back
    undo_stack: VecDeque<HistoryEntry>,
    /// Redo stack, most recent at the back
    redo_stack: VecDeque<HistoryEntry>,
    /// Maximum depth of each stack
    max_depth: usize,
}

impl History {
    /// Create a new history manager
    pub fn new() -> Self {
        Self::with_max_depth(MAX_HISTORY)
    }

    /// Create with custom maximum depth
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            max_depth: max_depth.max(1),
        }
    }

    /// Record the state preceding an edit. Clears the redo stack.
    pub fn push(&mut self, description: impl Into<String>, snapshot: StateSnapshot) {
        self.redo_stack.clear();
        Self::push_bounded(
            &mut self.undo_stack,
            self.max_depth,
            HistoryEntry {
                description: description.into(),
                snapshot,
            },
        );
    }

    /// Step back: stores `current` for redo and returns the state to restore
    pub fn undo(&mut self, current: StateSnapshot) -> Result<StateSnapshot> {
        let entry = self
            .undo_stack
            .pop_back()
            .ok_or(HistoryError::NothingToUndo)?;

        Self::push_bounded(
            &mut self.redo_stack,
            self.max_depth,
            HistoryEntry {
                description: entry.description.clone(),
                snapshot: current,
            },
        );
        Ok(entry.snapshot)
    }

    /// Step forward: stores `current` for undo and returns the state to restore
    pub fn redo(&mut self, current: StateSnapshot) -> Result<StateSnapshot> {
        let entry = self
            .redo_stack
            .pop_back()
            .ok_or(HistoryError::NothingToRedo)?;

        Self::push_bounded(
            &mut self.undo_stack,
            self.max_depth,
            HistoryEntry {
                description: entry.description.clone(),
                snapshot: current,
            },
        );
        Ok(entry.snapshot)
    }

    fn push_bounded(stack: &mut VecDeque<HistoryEntry>, max_depth: usize, entry: HistoryEntry) {
        stack.push_back(entry);
        while stack.len() > max_depth {
            stack.pop_front();
        }
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Get undo stack depth
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Get redo stack depth
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// Get history statistics
    pub fn stats(&self) -> HistoryStats {
        let memory_used = self
            .undo_stack
            .iter()
            .chain(self.redo_stack.iter())
            .map(|e| e.snapshot.size())
            .sum();
        HistoryStats {
            undo_count: self.undo_stack.len(),
            redo_count: self.redo_stack.len(),
            memory_used,
            max_depth: self.max_depth,
        }
    }

    /// Get description of next undo operation
    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.back().map(|e| e.description.as_str())
    }

    /// Get description of next redo operation
    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.back().map(|e| e.description.as_str())
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(value: u32) -> StateSnapshot {
        StateSnapshot::from_value(&value).unwrap()
    }

    fn value(snapshot: &StateSnapshot) -> u32 {
        snapshot.to_value().unwrap()
    }

    #[test]
    fn test_snapshot_is_independent() {
        let mut state = vec![1u32, 2, 3];
        let snapshot = StateSnapshot::from_value(&state).unwrap();
        state.push(4);

        let restored: Vec<u32> = snapshot.to_value().unwrap();
        assert_eq!(restored, vec![1, 2, 3]);
    }

    #[test]
    fn test_undo_redo_cycle() {
        let mut history = History::new();
        assert!(matches!(history.undo(snap(0)), Err(HistoryError::NothingToUndo)));

        history.push("Move Segment", snap(1));
        assert_eq!(history.undo_description(), Some("Move Segment"));

        let restored = history.undo(snap(2)).unwrap();
        assert_eq!(value(&restored), 1);
        assert_eq!(history.redo_description(), Some("Move Segment"));

        let restored = history.redo(snap(1)).unwrap();
        assert_eq!(value(&restored), 2);
        assert!(history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_push_clears_redo() {
        let mut history = History::new();
        history.push("a", snap(1));
        history.undo(snap(2)).unwrap();
        assert!(history.can_redo());

        history.push("b", snap(3));
        assert!(!history.can_redo());
        assert!(matches!(history.redo(snap(4)), Err(HistoryError::NothingToRedo)));
    }

    #[test]
    fn test_depth_is_bounded() {
        let mut history = History::new();
        for i in 0..150 {
            history.push("edit", snap(i));
        }
        assert_eq!(history.undo_depth(), MAX_HISTORY);

        let mut oldest = None;
        while let Ok(restored) = history.undo(snap(999)) {
            oldest = Some(value(&restored));
        }
        assert_eq!(oldest, Some(50));
        assert_eq!(history.redo_depth(), MAX_HISTORY);
        assert_eq!(history.stats().undo_count, 0);
    }
}
