//! Per-type undo/redo dispatch.
//!
//! A record carries a [`CommandType`] tag and a [`CommandPayload`]; the
//! [`ActionTable`] maps the tag to plain function pointers that apply the
//! inverse or forward effect. New kinds of action are added by registering a
//! `CommandType::Custom` entry, not by adding record types.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;
use user_cmd_abi::{
    CommandPayload, CommandType, EntityDescription, EntityState, NewCommandMsg, World, WorldError,
};

use crate::error::MalformedReason;

pub type ActionResult<T> = Result<T, ActionError>;

/// Failure of a single world-side effect.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("entity {0:?} does not exist")]
    StaleEntity(String),

    #[error("handler cannot apply a {0} payload")]
    PayloadMismatch(&'static str),

    #[error(transparent)]
    World(WorldError),
}

impl From<WorldError> for ActionError {
    fn from(err: WorldError) -> Self {
        match err {
            WorldError::UnknownEntity(name) => ActionError::StaleEntity(name),
            other => ActionError::World(other),
        }
    }
}

/// Applies one direction of an action. The entity name may be rebound when
/// the action respawns the entity under a world-assigned name.
pub type ActionFn = fn(&mut dyn World, &mut String, &CommandPayload) -> ActionResult<()>;

/// Undo/redo pair plus the payload shape the pair understands.
#[derive(Clone, Copy)]
pub struct ActionHandlers {
    pub undo: ActionFn,
    pub redo: ActionFn,
    pub accepts: fn(&CommandPayload) -> bool,
}

impl fmt::Debug for ActionHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionHandlers").finish_non_exhaustive()
    }
}

#[derive(Clone, Debug)]
pub struct ActionTable {
    handlers: HashMap<CommandType, ActionHandlers>,
}

impl Default for ActionTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ActionTable {
    /// Table with no registered actions.
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Table covering every built-in [`CommandType`].
    pub fn builtin() -> Self {
        Self::empty()
            .with(
                CommandType::Moving,
                ActionHandlers {
                    undo: move_undo,
                    redo: move_redo,
                    accepts: |p| matches!(p, CommandPayload::Pose { .. }),
                },
            )
            .with(
                CommandType::Scaling,
                ActionHandlers {
                    undo: scale_undo,
                    redo: scale_redo,
                    accepts: |p| matches!(p, CommandPayload::Scale { .. }),
                },
            )
            .with(
                CommandType::Deleting,
                ActionHandlers {
                    undo: respawn,
                    redo: despawn,
                    accepts: |p| matches!(p, CommandPayload::Entity(_)),
                },
            )
            .with(
                CommandType::Inserting,
                ActionHandlers {
                    undo: despawn,
                    redo: respawn,
                    accepts: |p| matches!(p, CommandPayload::Entity(_)),
                },
            )
            .with(
                CommandType::WrenchApply,
                ActionHandlers {
                    undo: wrench_undo,
                    redo: wrench_redo,
                    accepts: |p| matches!(p, CommandPayload::Wrench { .. }),
                },
            )
    }

    /// Handlers for custom kinds that carry a [`CommandPayload::Snapshot`].
    pub fn snapshot_handlers() -> ActionHandlers {
        ActionHandlers {
            undo: snapshot_undo,
            redo: snapshot_redo,
            accepts: |p| matches!(p, CommandPayload::Snapshot { .. }),
        }
    }

    pub fn with(mut self, cmd_type: CommandType, handlers: ActionHandlers) -> Self {
        self.register(cmd_type, handlers);
        self
    }

    /// Registers `handlers`, returning the ones previously bound to the type.
    pub fn register(
        &mut self,
        cmd_type: CommandType,
        handlers: ActionHandlers,
    ) -> Option<ActionHandlers> {
        self.handlers.insert(cmd_type, handlers)
    }

    pub fn get(&self, cmd_type: &CommandType) -> Option<&ActionHandlers> {
        self.handlers.get(cmd_type)
    }

    pub fn contains(&self, cmd_type: &CommandType) -> bool {
        self.handlers.contains_key(cmd_type)
    }

    /// Checks everything about a new command that does not need the world.
    pub fn validate(&self, msg: &NewCommandMsg) -> Result<(), MalformedReason> {
        let handlers = self
            .get(&msg.cmd_type)
            .ok_or_else(|| MalformedReason::UnknownType(msg.cmd_type.label().to_owned()))?;
        if !(handlers.accepts)(&msg.payload) {
            return Err(MalformedReason::PayloadMismatch {
                cmd_type: msg.cmd_type.label().to_owned(),
                payload: msg.payload.kind(),
            });
        }
        if !msg.payload.is_finite() {
            return Err(MalformedReason::NonFinite(msg.payload.kind()));
        }

        let named_by_payload = msg.cmd_type.carries_entity()
            && msg.payload.entity().is_some_and(|d| !d.name.is_empty());
        if msg.entity_name.is_empty() && !named_by_payload {
            return Err(MalformedReason::MissingEntity);
        }
        Ok(())
    }
}

fn restore_with(
    world: &mut dyn World,
    entity: &str,
    edit: impl FnOnce(&mut EntityState),
) -> ActionResult<()> {
    let mut snapshot = world
        .snapshot_entity(entity)
        .ok_or_else(|| ActionError::StaleEntity(entity.to_owned()))?;
    edit(&mut snapshot.state);
    world.restore_entity(entity, &snapshot.state)?;
    Ok(())
}

fn move_undo(
    world: &mut dyn World,
    entity: &mut String,
    payload: &CommandPayload,
) -> ActionResult<()> {
    match payload {
        CommandPayload::Pose { from, .. } => restore_with(world, entity, |s| s.pose = *from),
        other => Err(ActionError::PayloadMismatch(other.kind())),
    }
}

fn move_redo(
    world: &mut dyn World,
    entity: &mut String,
    payload: &CommandPayload,
) -> ActionResult<()> {
    match payload {
        CommandPayload::Pose { to, .. } => restore_with(world, entity, |s| s.pose = *to),
        other => Err(ActionError::PayloadMismatch(other.kind())),
    }
}

fn scale_undo(
    world: &mut dyn World,
    entity: &mut String,
    payload: &CommandPayload,
) -> ActionResult<()> {
    match payload {
        CommandPayload::Scale { from, .. } => restore_with(world, entity, |s| s.scale = *from),
        other => Err(ActionError::PayloadMismatch(other.kind())),
    }
}

fn scale_redo(
    world: &mut dyn World,
    entity: &mut String,
    payload: &CommandPayload,
) -> ActionResult<()> {
    match payload {
        CommandPayload::Scale { to, .. } => restore_with(world, entity, |s| s.scale = *to),
        other => Err(ActionError::PayloadMismatch(other.kind())),
    }
}

fn wrench_undo(
    world: &mut dyn World,
    entity: &mut String,
    payload: &CommandPayload,
) -> ActionResult<()> {
    match payload {
        CommandPayload::Wrench { from, .. } => restore_with(world, entity, |s| s.velocity = *from),
        other => Err(ActionError::PayloadMismatch(other.kind())),
    }
}

fn wrench_redo(
    world: &mut dyn World,
    entity: &mut String,
    payload: &CommandPayload,
) -> ActionResult<()> {
    match payload {
        CommandPayload::Wrench { to, .. } => restore_with(world, entity, |s| s.velocity = *to),
        other => Err(ActionError::PayloadMismatch(other.kind())),
    }
}

fn snapshot_undo(
    world: &mut dyn World,
    entity: &mut String,
    payload: &CommandPayload,
) -> ActionResult<()> {
    match payload {
        CommandPayload::Snapshot { before, .. } => restore_with(world, entity, |s| *s = *before),
        other => Err(ActionError::PayloadMismatch(other.kind())),
    }
}

fn snapshot_redo(
    world: &mut dyn World,
    entity: &mut String,
    payload: &CommandPayload,
) -> ActionResult<()> {
    match payload {
        CommandPayload::Snapshot { after, .. } => restore_with(world, entity, |s| *s = *after),
        other => Err(ActionError::PayloadMismatch(other.kind())),
    }
}

fn description_of(payload: &CommandPayload) -> ActionResult<&EntityDescription> {
    payload
        .entity()
        .ok_or_else(|| ActionError::PayloadMismatch(payload.kind()))
}

/// Spawns the captured description and rebinds the record to the new name.
fn respawn(
    world: &mut dyn World,
    entity: &mut String,
    payload: &CommandPayload,
) -> ActionResult<()> {
    let description = description_of(payload)?;
    *entity = world.spawn_entity(description)?;
    Ok(())
}

fn despawn(
    world: &mut dyn World,
    entity: &mut String,
    payload: &CommandPayload,
) -> ActionResult<()> {
    description_of(payload)?;
    world.remove_entity(entity)?;
    Ok(())
}
