//! Shared types for the user command pipeline.
//!
//! This crate defines the boundary between remote clients, the transport bus,
//! the command manager, and the simulation world: the logical message shapes
//! that travel on the bus, the geometry they carry, and the [`World`] surface
//! the manager mutates. It has no dependency on any particular world or
//! transport implementation.

pub mod geometry;
pub mod messages;
pub mod world;

pub use geometry::{Pose, Quat, Twist, Vec3, Wrench};
pub use messages::{
    CommandId, CommandPayload, CommandStatsMsg, CommandSummary, CommandType, NewCommandMsg,
    UndoRedoDirection, UndoRedoMsg, WireMsg,
};
pub use world::{EntityDescription, EntityState, Steppable, World, WorldError, WorldResult};
