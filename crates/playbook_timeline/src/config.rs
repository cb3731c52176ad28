// SPDX-License-Identifier: MIT OR Apache-2.0
//! Board configuration.
//!
//! Stored as RON. Everything here is fixed for the lifetime of a board:
//! timeline length, teams and their players, and the ball.

use crate::entity::{Entity, EntityId};
use crate::keyframe::{Pose, Tick};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Default ticks per second
pub const DEFAULT_FRAME_RATE: u32 = 30;

/// Default timeline length in seconds
pub const DEFAULT_DURATION_SECS: u32 = 30;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading the file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid RON
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Writing RON failed
    #[error("Serialization error: {0}")]
    Serialize(#[from] ron::Error),

    /// The values are unusable
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// One team on the field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamConfig {
    /// Team name
    pub name: String,
    /// Shirt color
    pub color: [u8; 3],
    /// Shirt numbers, one player each
    pub numbers: Vec<u8>,
}

impl TeamConfig {
    /// Create a team with players numbered `1..=count`
    pub fn numbered(name: impl Into<String>, color: [u8; 3], count: u8) -> Self {
        Self {
            name: name.into(),
            color,
            numbers: (1..=count).collect(),
        }
    }
}

/// Board configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Ticks per second
    pub frame_rate: u32,
    /// Timeline length in seconds
    pub duration_secs: u32,
    /// Teams, laid out on alternating halves
    pub teams: Vec<TeamConfig>,
    /// Ball color
    pub ball_color: [u8; 3],
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            frame_rate: DEFAULT_FRAME_RATE,
            duration_secs: DEFAULT_DURATION_SECS,
            teams: vec![
                TeamConfig::numbered("Home", [220, 60, 60], 5),
                TeamConfig::numbered("Away", [60, 90, 220], 5),
            ],
            ball_color: [250, 250, 250],
        }
    }
}

impl BoardConfig {
    /// Load and validate a RON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Parse and validate RON text
    pub fn from_ron_str(contents: &str) -> Result<Self, ConfigError> {
        let config: BoardConfig = ron::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Render as pretty RON
    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    /// Check the values are usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_rate == 0 {
            return Err(ConfigError::Invalid("frame_rate must be positive".into()));
        }
        if self.duration_secs == 0 {
            return Err(ConfigError::Invalid("duration_secs must be positive".into()));
        }
        Ok(())
    }

    /// Length of the timeline in ticks
    pub fn total_ticks(&self) -> Tick {
        Tick::from(self.frame_rate) * Tick::from(self.duration_secs)
    }

    /// Build the roster with starting poses.
    ///
    /// Even-indexed teams line up on the left half facing right, odd-indexed ones
    /// on the right half facing left. The ball is last, on the centre spot.
    pub fn build_entities(&self) -> Vec<Entity> {
        let mut entities = Vec::new();
        let mut next_id = 0u32;

        for (team_idx, team) in self.teams.iter().enumerate() {
            let (x, angle) = if team_idx % 2 == 0 { (0.25, 0.0) } else { (0.75, 180.0) };
            let count = team.numbers.len() as f32;
            for (slot, &number) in team.numbers.iter().enumerate() {
                let y = (slot as f32 + 1.0) / (count + 1.0);
                entities.push(Entity::player(
                    EntityId(next_id),
                    team_idx,
                    number,
                    team.color,
                    Pose::new(x, y, angle),
                ));
                next_id += 1;
            }
        }

        entities.push(Entity::ball(
            EntityId(next_id),
            self.ball_color,
            Pose::new(0.5, 0.5, 0.0),
        ));
        entities
    }
}
