// SPDX-License-Identifier: MIT OR Apache-2.0
//! Entities placed on the field.

use crate::keyframe::Pose;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What an entity represents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    /// A player of a team
    Player {
        /// Index of the team in the board configuration
        team: usize,
        /// Shirt number
        number: u8,
    },
    /// The ball
    Ball,
}

/// An entity with its current pose
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Stable identifier
    pub id: EntityId,
    /// Player or ball
    pub kind: EntityKind,
    /// Display color
    pub color: [u8; 3],
    /// Current pose
    pub pose: Pose,
}

impl Entity {
    /// Create a player
    pub fn player(id: EntityId, team: usize, number: u8, color: [u8; 3], pose: Pose) -> Self {
        Self {
            id,
            kind: EntityKind::Player { team, number },
            color,
            pose,
        }
    }

    /// Create the ball
    pub fn ball(id: EntityId, color: [u8; 3], pose: Pose) -> Self {
        Self {
            id,
            kind: EntityKind::Ball,
            color,
            pose,
        }
    }

    /// Label shown on the field
    pub fn label(&self) -> String {
        match self.kind {
            EntityKind::Player { number, .. } => number.to_string(),
            EntityKind::Ball => "ball".to_string(),
        }
    }

    /// Whether this is the ball
    pub fn is_ball(&self) -> bool {
        matches!(self.kind, EntityKind::Ball)
    }
}
