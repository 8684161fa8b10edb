//! The hand-off between the network context and the step context.
//!
//! [`Inbox`] is the only piece of the manager that network callbacks can
//! reach. It validates and enqueues; the matching [`PendingQueue`] is owned by
//! the manager and drained on the step context. The channel is the sole shared
//! mutable state between the two.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use log::{debug, warn};
use user_cmd_abi::{CommandId, NewCommandMsg, UndoRedoDirection, UndoRedoMsg, WireMsg};

use crate::actions::ActionTable;
use crate::error::{CommandError, CommandResult, MalformedReason};

/// A request waiting for the next drain.
#[derive(Clone, Debug, PartialEq)]
pub enum PendingRequest {
    NewCommand(NewCommandMsg),
    Undo(Option<CommandId>),
    Redo(Option<CommandId>),
}

impl From<UndoRedoMsg> for PendingRequest {
    fn from(msg: UndoRedoMsg) -> Self {
        match msg.direction {
            UndoRedoDirection::Undo => PendingRequest::Undo(msg.command_id),
            UndoRedoDirection::Redo => PendingRequest::Redo(msg.command_id),
        }
    }
}

/// Creates a connected inbox/queue pair.
pub fn channel(actions: Arc<ActionTable>) -> (Arc<Inbox>, PendingQueue) {
    let (sender, receiver) = crossbeam_channel::unbounded();
    let inbox = Arc::new(Inbox {
        sender,
        actions,
        open: AtomicBool::new(true),
        accepted: AtomicU64::new(0),
        dropped: AtomicU64::new(0),
    });
    (inbox, PendingQueue { receiver })
}

/// Network-facing entry point of the command manager.
pub struct Inbox {
    sender: Sender<PendingRequest>,
    actions: Arc<ActionTable>,
    open: AtomicBool,
    accepted: AtomicU64,
    dropped: AtomicU64,
}

impl Inbox {
    /// Bus callback for the user command topic. Never fails; rejected
    /// messages are logged and dropped.
    pub fn on_new_command_message(&self, msg: &WireMsg) {
        let result = match msg {
            WireMsg::UserCmd(cmd) => self.submit_new_command(cmd.clone()),
            other => Err(MalformedReason::UnexpectedMessage(other.kind()).into()),
        };
        self.note(result);
    }

    /// Bus callback for the undo/redo topic. Legality is checked at drain time.
    pub fn on_undo_redo_message(&self, msg: &WireMsg) {
        let result = match msg {
            WireMsg::UndoRedo(req) => self.submit_undo_redo(*req),
            other => Err(MalformedReason::UnexpectedMessage(other.kind()).into()),
        };
        self.note(result);
    }

    pub fn submit_new_command(&self, msg: NewCommandMsg) -> CommandResult<()> {
        self.actions.validate(&msg)?;
        self.enqueue(PendingRequest::NewCommand(msg))
    }

    pub fn submit_undo_redo(&self, msg: UndoRedoMsg) -> CommandResult<()> {
        self.enqueue(msg.into())
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub(crate) fn close(&self) {
        self.open.store(false, Ordering::Release);
    }

    fn enqueue(&self, request: PendingRequest) -> CommandResult<()> {
        if !self.is_open() {
            return Err(CommandError::ManagerUnavailable);
        }
        self.sender
            .send(request)
            .map_err(|_| CommandError::ManagerUnavailable)
    }

    fn note(&self, result: CommandResult<()>) {
        match result {
            Ok(()) => {
                self.accepted.fetch_add(1, Ordering::Relaxed);
            }
            Err(CommandError::ManagerUnavailable) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                debug!("dropping message: command manager is shut down");
            }
            Err(err) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("dropping message: {err}");
            }
        }
    }
}

/// Step-side end of the channel.
pub struct PendingQueue {
    receiver: Receiver<PendingRequest>,
}

impl PendingQueue {
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Yields the requests queued at the time of the call, in arrival order.
    /// Anything enqueued while the drain runs waits for the next one.
    pub fn drain_snapshot(&self) -> impl Iterator<Item = PendingRequest> + '_ {
        let queued = self.receiver.len();
        self.receiver.try_iter().take(queued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use user_cmd_abi::{CommandStatsMsg, Pose};

    fn pair() -> (Arc<Inbox>, PendingQueue) {
        channel(Arc::new(ActionTable::builtin()))
    }

    #[test]
    fn requests_drain_in_arrival_order() {
        let (inbox, queue) = pair();
        let cmd = NewCommandMsg::moving("box", Pose::default(), Pose::at(1.0, 0.0, 0.0));

        inbox.submit_new_command(cmd.clone()).unwrap();
        inbox.submit_undo_redo(UndoRedoMsg::undo(None)).unwrap();
        inbox
            .submit_undo_redo(UndoRedoMsg::redo(Some(CommandId(0))))
            .unwrap();

        let drained: Vec<_> = queue.drain_snapshot().collect();
        assert_eq!(
            drained,
            vec![
                PendingRequest::NewCommand(cmd),
                PendingRequest::Undo(None),
                PendingRequest::Redo(Some(CommandId(0))),
            ]
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn wrong_message_kind_is_dropped() {
        let (inbox, queue) = pair();
        inbox.on_new_command_message(&WireMsg::Stats(CommandStatsMsg::default()));
        inbox.on_undo_redo_message(&WireMsg::Stats(CommandStatsMsg::default()));

        assert_eq!(inbox.dropped(), 2);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn closed_inbox_reports_unavailable() {
        let (inbox, queue) = pair();
        inbox.close();
        assert_eq!(
            inbox.submit_undo_redo(UndoRedoMsg::undo(None)),
            Err(CommandError::ManagerUnavailable)
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn dropped_queue_reports_unavailable() {
        let (inbox, queue) = pair();
        drop(queue);
        assert_eq!(
            inbox.submit_undo_redo(UndoRedoMsg::redo(None)),
            Err(CommandError::ManagerUnavailable)
        );
    }
}
