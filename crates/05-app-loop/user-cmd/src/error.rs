//! Error taxonomy for the command pipeline.
//!
//! None of these errors escape to the network callbacks or the step driver;
//! they are logged where they happen and surface in [`DrainReport`]s.
//!
//! [`DrainReport`]: crate::DrainReport

use thiserror::Error;
use user_cmd_abi::{CommandId, UndoRedoDirection, WorldError};

pub type CommandResult<T> = Result<T, CommandError>;

/// Why an inbound message was dropped before reaching the queue.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MalformedReason {
    #[error("unexpected {0} message on a command topic")]
    UnexpectedMessage(&'static str),

    #[error("no action registered for command type {0:?}")]
    UnknownType(String),

    #[error("{payload} payload does not fit command type {cmd_type:?}")]
    PayloadMismatch {
        cmd_type: String,
        payload: &'static str,
    },

    #[error("command does not name its target entity")]
    MissingEntity,

    #[error("{0} payload contains non-finite values")]
    NonFinite(&'static str),
}

/// Why an undo or redo request could not be applied.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum IllegalReason {
    #[error("nothing left to undo")]
    NothingToUndo,

    #[error("nothing left to redo")]
    NothingToRedo,

    #[error("next command is {expected}")]
    IdMismatch { expected: CommandId },

    #[error("command is already undone")]
    AlreadyUndone,

    #[error("command is already applied")]
    AlreadyApplied,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("malformed message: {0}")]
    Malformed(#[from] MalformedReason),

    #[error("{direction:?} of {} rejected: {reason}", display_requested(.requested))]
    IllegalTransition {
        direction: UndoRedoDirection,
        requested: Option<CommandId>,
        reason: IllegalReason,
    },

    #[error("entity {entity:?} targeted by command {id} no longer exists")]
    StaleEntity { id: CommandId, entity: String },

    #[error("command manager is no longer accepting messages")]
    ManagerUnavailable,

    #[error(transparent)]
    World(#[from] WorldError),
}

impl CommandError {
    pub(crate) fn illegal(
        direction: UndoRedoDirection,
        requested: Option<CommandId>,
        reason: IllegalReason,
    ) -> Self {
        CommandError::IllegalTransition {
            direction,
            requested,
            reason,
        }
    }
}

fn display_requested(requested: &Option<CommandId>) -> String {
    match requested {
        Some(id) => id.to_string(),
        None => "next command".to_owned(),
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("topic `{0}` must not be empty")]
    EmptyTopic(&'static str),

    #[error("topic {0:?} is configured more than once")]
    DuplicateTopic(String),
}
