//! Logical message shapes exchanged over the bus.
//!
//! Encoding is left to the transport; these types only fix the fields.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::{Pose, Twist, Vec3, Wrench};
use crate::world::{EntityDescription, EntityState};

/// Identifier assigned by the command manager. Strictly increasing, never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandId(pub u64);

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of user action. `Custom` kinds need a registered action handler.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandType {
    Moving,
    Scaling,
    Deleting,
    Inserting,
    WrenchApply,
    Custom(String),
}

impl CommandType {
    pub fn label(&self) -> &str {
        match self {
            CommandType::Moving => "moving",
            CommandType::Scaling => "scaling",
            CommandType::Deleting => "deleting",
            CommandType::Inserting => "inserting",
            CommandType::WrenchApply => "wrench",
            CommandType::Custom(name) => name,
        }
    }

    /// Whether the payload itself can name the target entity.
    pub fn carries_entity(&self) -> bool {
        matches!(self, CommandType::Deleting | CommandType::Inserting)
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Reversible state captured when the user performed the action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CommandPayload {
    /// Pose before and after a move.
    Pose { from: Pose, to: Pose },
    /// Scale before and after a resize.
    Scale { from: Vec3, to: Vec3 },
    /// Full description of an entity that was deleted or inserted.
    Entity(EntityDescription),
    /// Applied wrench with the velocity before and after it took effect.
    Wrench { wrench: Wrench, from: Twist, to: Twist },
    /// Whole-entity state before and after an arbitrary edit.
    Snapshot {
        before: EntityState,
        after: EntityState,
    },
}

impl CommandPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            CommandPayload::Pose { .. } => "pose",
            CommandPayload::Scale { .. } => "scale",
            CommandPayload::Entity(_) => "entity",
            CommandPayload::Wrench { .. } => "wrench",
            CommandPayload::Snapshot { .. } => "snapshot",
        }
    }

    /// Whether every captured number is finite. Non-finite payloads could
    /// never be restored.
    pub fn is_finite(&self) -> bool {
        match self {
            CommandPayload::Pose { from, to } => from.is_finite() && to.is_finite(),
            CommandPayload::Scale { from, to } => from.is_finite() && to.is_finite(),
            CommandPayload::Entity(description) => description.state.is_finite(),
            CommandPayload::Wrench { wrench, from, to } => {
                wrench.is_finite() && from.is_finite() && to.is_finite()
            }
            CommandPayload::Snapshot { before, after } => before.is_finite() && after.is_finite(),
        }
    }

    pub fn entity(&self) -> Option<&EntityDescription> {
        match self {
            CommandPayload::Entity(description) => Some(description),
            _ => None,
        }
    }
}

/// Published by a client after it performed an action locally.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewCommandMsg {
    /// Human-readable label shown in history menus.
    pub description: String,
    /// Selects the undo/redo handlers.
    #[serde(rename = "type")]
    pub cmd_type: CommandType,
    /// Target entity. May be empty for kinds whose payload names the entity.
    pub entity_name: String,
    /// State captured before and after the action.
    pub payload: CommandPayload,
}

impl NewCommandMsg {
    pub fn moving(entity: &str, from: Pose, to: Pose) -> Self {
        Self {
            description: format!("Move {entity}"),
            cmd_type: CommandType::Moving,
            entity_name: entity.to_owned(),
            payload: CommandPayload::Pose { from, to },
        }
    }

    pub fn scaling(entity: &str, from: Vec3, to: Vec3) -> Self {
        Self {
            description: format!("Scale {entity}"),
            cmd_type: CommandType::Scaling,
            entity_name: entity.to_owned(),
            payload: CommandPayload::Scale { from, to },
        }
    }

    pub fn deleting(description: EntityDescription) -> Self {
        Self {
            description: format!("Delete {}", description.name),
            cmd_type: CommandType::Deleting,
            entity_name: description.name.clone(),
            payload: CommandPayload::Entity(description),
        }
    }

    /// The entity name is left empty; the manager takes it from the description.
    pub fn inserting(description: EntityDescription) -> Self {
        Self {
            description: format!("Insert {}", description.name),
            cmd_type: CommandType::Inserting,
            entity_name: String::new(),
            payload: CommandPayload::Entity(description),
        }
    }

    pub fn wrench(entity: &str, wrench: Wrench, from: Twist, to: Twist) -> Self {
        Self {
            description: format!("Apply wrench to {entity}"),
            cmd_type: CommandType::WrenchApply,
            entity_name: entity.to_owned(),
            payload: CommandPayload::Wrench { wrench, from, to },
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UndoRedoDirection {
    Undo,
    Redo,
}

/// Request to step the shared history one command back or forward.
///
/// With `command_id` set, the request only applies when that command is the
/// next one in the requested direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoRedoMsg {
    /// Expected id of the next command in `direction`, if the client cares.
    pub command_id: Option<CommandId>,
    pub direction: UndoRedoDirection,
}

impl UndoRedoMsg {
    pub fn undo(command_id: Option<CommandId>) -> Self {
        Self {
            command_id,
            direction: UndoRedoDirection::Undo,
        }
    }

    pub fn redo(command_id: Option<CommandId>) -> Self {
        Self {
            command_id,
            direction: UndoRedoDirection::Redo,
        }
    }
}

/// One history entry as presented to clients.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSummary {
    pub id: CommandId,
    /// Copied from [`NewCommandMsg::description`].
    pub description: String,
}

/// History counters broadcast after the manager applies requests.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandStatsMsg {
    /// Commands at or before the cursor.
    pub undoable_count: u64,
    /// Commands after the cursor.
    pub redoable_count: u64,
    /// Applied commands, oldest first.
    pub undo_commands: Vec<CommandSummary>,
    /// Undone commands, next to redo first.
    pub redo_commands: Vec<CommandSummary>,
}

/// Everything that travels on the user command topics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum WireMsg {
    UserCmd(NewCommandMsg),
    UndoRedo(UndoRedoMsg),
    Stats(CommandStatsMsg),
}

impl WireMsg {
    pub fn kind(&self) -> &'static str {
        match self {
            WireMsg::UserCmd(_) => "user_cmd",
            WireMsg::UndoRedo(_) => "undo_redo",
            WireMsg::Stats(_) => "stats",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_name_their_target() {
        let desc = EntityDescription::new("crate", "<sdf/>");

        assert_eq!(NewCommandMsg::deleting(desc.clone()).entity_name, "crate");
        let insert = NewCommandMsg::inserting(desc);
        assert!(insert.entity_name.is_empty());
        assert_eq!(insert.payload.entity().map(|d| d.name.as_str()), Some("crate"));
        assert_eq!(insert.description, "Insert crate");
    }

    #[test]
    fn non_finite_payloads_are_detected() {
        let nan_pose = CommandPayload::Pose {
            from: Pose::at(f64::NAN, 0.0, 0.0),
            to: Pose::default(),
        };
        assert!(!nan_pose.is_finite());

        let mut desc = EntityDescription::new("crate", "<sdf/>");
        assert!(CommandPayload::Entity(desc.clone()).is_finite());
        desc.state.velocity.angular.z = f64::INFINITY;
        assert!(!CommandPayload::Entity(desc).is_finite());
    }

    #[test]
    fn labels() {
        assert_eq!(CommandType::WrenchApply.to_string(), "wrench");
        assert_eq!(CommandType::Custom("paint".into()).label(), "paint");
        assert!(CommandType::Inserting.carries_entity());
        assert!(!CommandType::Moving.carries_entity());
        assert_eq!(CommandId(4).to_string(), "#4");
    }
}
