//! Reference simulation world.
//!
//! The `world` crate intentionally stays small. It provides [`SimWorld`], an
//! in-memory entity store implementing the [`World`](user_cmd_abi::World)
//! surface, so the step driver and tests have something concrete to mutate.

/// In-memory world implementation.
pub mod world;

pub use crate::world::SimWorld;
