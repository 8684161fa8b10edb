//! Linear, truncatable command history.

use user_cmd_abi::{CommandId, NewCommandMsg, UndoRedoDirection, World};

use crate::actions::ActionTable;
use crate::error::{CommandError, CommandResult, IllegalReason};
use crate::record::{CommandRecord, CommandState, Transition};

/// Where the cursor sits relative to the recorded commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HistoryState {
    /// Nothing recorded yet.
    Empty,
    /// Cursor at the end; nothing to redo.
    AllApplied,
    /// Both undo and redo are possible.
    PartiallyUndone,
    /// Cursor at zero; nothing to undo.
    AllUndone,
}

/// Ordered records split by a cursor: `[0, cursor)` applied, `[cursor, len)`
/// undone.
#[derive(Debug, Default)]
pub struct History {
    records: Vec<CommandRecord>,
    cursor: usize,
    next_id: u64,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records, applied and undone.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Index of the first undone record; equals `len()` when nothing is undone.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Records an undo can reach.
    pub fn undoable_count(&self) -> usize {
        self.cursor
    }

    /// Records a redo can reach.
    pub fn redoable_count(&self) -> usize {
        self.records.len() - self.cursor
    }

    /// Applied records, oldest first.
    pub fn undoable(&self) -> &[CommandRecord] {
        &self.records[..self.cursor]
    }

    /// Undone records, next to redo first.
    pub fn redoable(&self) -> &[CommandRecord] {
        &self.records[self.cursor..]
    }

    /// Every record in id order.
    pub fn records(&self) -> &[CommandRecord] {
        &self.records
    }

    /// Looks up a live record. Discarded ids return `None`.
    pub fn get(&self, id: CommandId) -> Option<&CommandRecord> {
        self.records.iter().find(|record| record.id() == id)
    }

    /// Id the next recorded command will receive.
    pub fn next_id(&self) -> CommandId {
        CommandId(self.next_id)
    }

    /// Coarse classification of the cursor position.
    pub fn state(&self) -> HistoryState {
        match (self.cursor, self.records.len()) {
            (_, 0) => HistoryState::Empty,
            (cursor, len) if cursor == len => HistoryState::AllApplied,
            (0, _) => HistoryState::AllUndone,
            _ => HistoryState::PartiallyUndone,
        }
    }

    /// Records a new command at the cursor, discarding the undone suffix.
    ///
    /// Returns the assigned id and how many records were discarded.
    pub fn push(&mut self, msg: NewCommandMsg) -> (CommandId, usize) {
        let discarded = self.records.len() - self.cursor;
        self.records.truncate(self.cursor);

        let id = CommandId(self.next_id);
        self.next_id += 1;
        self.records.push(CommandRecord::new(id, msg));
        self.cursor = self.records.len();

        debug_assert!(self.is_consistent());
        (id, discarded)
    }

    /// Undoes the last applied record. With `requested` set, that record must
    /// carry the requested id.
    pub fn undo(
        &mut self,
        requested: Option<CommandId>,
        world: &mut dyn World,
        actions: &ActionTable,
    ) -> CommandResult<(CommandId, Transition)> {
        let direction = UndoRedoDirection::Undo;
        let Some(index) = self.cursor.checked_sub(1) else {
            return Err(CommandError::illegal(
                direction,
                requested,
                IllegalReason::NothingToUndo,
            ));
        };
        let record = &mut self.records[index];
        check_requested(direction, requested, record)?;

        let transition = record.undo(world, actions)?;
        let id = record.id();
        self.cursor = index;

        debug_assert!(self.is_consistent());
        Ok((id, transition))
    }

    /// Redoes the first undone record. With `requested` set, that record must
    /// carry the requested id.
    pub fn redo(
        &mut self,
        requested: Option<CommandId>,
        world: &mut dyn World,
        actions: &ActionTable,
    ) -> CommandResult<(CommandId, Transition)> {
        let direction = UndoRedoDirection::Redo;
        let Some(record) = self.records.get_mut(self.cursor) else {
            return Err(CommandError::illegal(
                direction,
                requested,
                IllegalReason::NothingToRedo,
            ));
        };
        check_requested(direction, requested, record)?;

        let transition = record.redo(world, actions)?;
        let id = record.id();
        self.cursor += 1;

        debug_assert!(self.is_consistent());
        Ok((id, transition))
    }

    /// Checks the cursor invariant: applied prefix, undone suffix, increasing ids.
    pub fn is_consistent(&self) -> bool {
        self.cursor <= self.records.len()
            && self.undoable().iter().all(|r| r.state() == CommandState::Applied)
            && self.redoable().iter().all(|r| r.state() == CommandState::Undone)
            && self.records.windows(2).all(|w| w[0].id() < w[1].id())
            && self.records.last().map_or(true, |r| r.id().0 < self.next_id)
    }
}

fn check_requested(
    direction: UndoRedoDirection,
    requested: Option<CommandId>,
    record: &CommandRecord,
) -> CommandResult<()> {
    match requested {
        Some(id) if id != record.id() => Err(CommandError::illegal(
            direction,
            requested,
            IllegalReason::IdMismatch {
                expected: record.id(),
            },
        )),
        _ => Ok(()),
    }
}
