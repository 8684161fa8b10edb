//! A single reversible user action.

use user_cmd_abi::{
    CommandId, CommandPayload, CommandSummary, CommandType, NewCommandMsg, UndoRedoDirection,
    World,
};

use crate::actions::{ActionError, ActionTable};
use crate::error::{CommandError, CommandResult, IllegalReason, MalformedReason};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandState {
    Applied,
    Undone,
}

/// Result of a legal undo or redo.
///
/// The record's state always flips; `Skipped` means the world-side effect
/// could not be applied and was left out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transition {
    Applied,
    Skipped(CommandError),
}

#[derive(Clone, Debug, PartialEq)]
pub struct CommandRecord {
    id: CommandId,
    description: String,
    cmd_type: CommandType,
    entity_name: String,
    payload: CommandPayload,
    state: CommandState,
}

impl CommandRecord {
    /// Builds an applied record from a validated message.
    ///
    /// When the message leaves the entity name empty, the name carried by an
    /// entity payload is used instead.
    pub fn new(id: CommandId, msg: NewCommandMsg) -> Self {
        let NewCommandMsg {
            description,
            cmd_type,
            mut entity_name,
            payload,
        } = msg;
        if entity_name.is_empty() {
            if let Some(entity) = payload.entity() {
                entity_name = entity.name.clone();
            }
        }
        Self {
            id,
            description,
            cmd_type,
            entity_name,
            payload,
            state: CommandState::Applied,
        }
    }

    pub fn id(&self) -> CommandId {
        self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn cmd_type(&self) -> &CommandType {
        &self.cmd_type
    }

    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    pub fn set_entity_name(&mut self, name: impl Into<String>) {
        self.entity_name = name.into();
    }

    pub fn payload(&self) -> &CommandPayload {
        &self.payload
    }

    pub fn state(&self) -> CommandState {
        self.state
    }

    pub fn summary(&self) -> CommandSummary {
        CommandSummary {
            id: self.id,
            description: self.description.clone(),
        }
    }

    /// Applies the inverse effect and marks the record undone.
    pub fn undo(
        &mut self,
        world: &mut dyn World,
        actions: &ActionTable,
    ) -> CommandResult<Transition> {
        if self.state == CommandState::Undone {
            return Err(CommandError::illegal(
                UndoRedoDirection::Undo,
                Some(self.id),
                IllegalReason::AlreadyUndone,
            ));
        }
        let transition = self.run(UndoRedoDirection::Undo, world, actions);
        self.state = CommandState::Undone;
        Ok(transition)
    }

    /// Re-applies the forward effect and marks the record applied.
    pub fn redo(
        &mut self,
        world: &mut dyn World,
        actions: &ActionTable,
    ) -> CommandResult<Transition> {
        if self.state == CommandState::Applied {
            return Err(CommandError::illegal(
                UndoRedoDirection::Redo,
                Some(self.id),
                IllegalReason::AlreadyApplied,
            ));
        }
        let transition = self.run(UndoRedoDirection::Redo, world, actions);
        self.state = CommandState::Applied;
        Ok(transition)
    }

    fn run(
        &mut self,
        direction: UndoRedoDirection,
        world: &mut dyn World,
        actions: &ActionTable,
    ) -> Transition {
        let Some(handlers) = actions.get(&self.cmd_type) else {
            return Transition::Skipped(
                MalformedReason::UnknownType(self.cmd_type.label().to_owned()).into(),
            );
        };
        let action = match direction {
            UndoRedoDirection::Undo => handlers.undo,
            UndoRedoDirection::Redo => handlers.redo,
        };
        match action(world, &mut self.entity_name, &self.payload) {
            Ok(()) => Transition::Applied,
            Err(err) => Transition::Skipped(self.lift(err)),
        }
    }

    fn lift(&self, err: ActionError) -> CommandError {
        match err {
            ActionError::StaleEntity(entity) => CommandError::StaleEntity {
                id: self.id,
                entity,
            },
            ActionError::PayloadMismatch(payload) => MalformedReason::PayloadMismatch {
                cmd_type: self.cmd_type.label().to_owned(),
                payload,
            }
            .into(),
            ActionError::World(err) => CommandError::World(err),
        }
    }
}
