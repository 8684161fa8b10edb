//! The world surface consumed by the command manager.
//!
//! Implementations are only ever called from the step context, once per
//! simulation step, never concurrently.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{Pose, Twist, Vec3};

pub type WorldResult<T> = Result<T, WorldError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorldError {
    #[error("no entity named {0:?}")]
    UnknownEntity(String),

    #[error("invalid entity description: {0}")]
    InvalidDescription(String),
}

/// Mutable physical state of one entity.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    /// World-frame pose.
    pub pose: Pose,
    /// Per-axis scale factors, `ONE` for an unscaled model.
    pub scale: Vec3,
    /// Current velocity.
    pub velocity: Twist,
}

impl EntityState {
    /// Whether every component is a finite number.
    pub fn is_finite(&self) -> bool {
        self.pose.is_finite() && self.scale.is_finite() && self.velocity.is_finite()
    }
}

impl Default for EntityState {
    fn default() -> Self {
        Self {
            pose: Pose::default(),
            scale: Vec3::ONE,
            velocity: Twist::default(),
        }
    }
}

/// Everything needed to respawn an entity.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityDescription {
    /// Requested unique name. The world may assign another on spawn.
    pub name: String,
    /// Model source, e.g. an SDF document.
    pub model: String,
    /// State to restore on spawn.
    pub state: EntityState,
}

impl EntityDescription {
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            state: EntityState::default(),
        }
    }

    pub fn with_pose(mut self, pose: Pose) -> Self {
        self.state.pose = pose;
        self
    }
}

/// Entity storage the manager snapshots and mutates.
pub trait World {
    /// Returns the full description of `name`, or `None` if it does not exist.
    fn snapshot_entity(&self, name: &str) -> Option<EntityDescription>;

    /// Overwrites the physical state of an existing entity.
    fn restore_entity(&mut self, name: &str, state: &EntityState) -> WorldResult<()>;

    /// Removes `name`, returning its last description.
    fn remove_entity(&mut self, name: &str) -> WorldResult<EntityDescription>;

    /// Spawns a new entity and returns the name the world assigned to it,
    /// which may differ from `description.name` on collision.
    fn spawn_entity(&mut self, description: &EntityDescription) -> WorldResult<String>;

    fn contains_entity(&self, name: &str) -> bool {
        self.snapshot_entity(name).is_some()
    }
}

/// Physics integration driven by the step driver.
pub trait Steppable {
    fn integrate(&mut self, dt: f64);

    fn sim_time(&self) -> f64;
}
