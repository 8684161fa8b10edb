//! A remote user's view of the command topics.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use arc_swap::ArcSwapOption;
use log::trace;
use transport::{Bus, Publisher, Subscription, TransportResult};
use user_cmd::TopicConfig;
use user_cmd_abi::{CommandId, CommandStatsMsg, NewCommandMsg, UndoRedoMsg, WireMsg};

/// Announces locally performed edits and tracks the stats the server sends.
pub struct RemoteClient {
    user_cmd: Publisher<WireMsg>,
    undo_redo: Publisher<WireMsg>,
    latest: Arc<ArcSwapOption<CommandStatsMsg>>,
    received: Arc<AtomicU64>,
    _stats: Subscription,
}

impl RemoteClient {
    pub fn connect(bus: &Bus<WireMsg>, topics: &TopicConfig) -> Result<Self> {
        let user_cmd = bus
            .advertise(&topics.user_cmd)
            .with_context(|| format!("advertising {}", topics.user_cmd))?;
        let undo_redo = bus
            .advertise(&topics.undo_redo)
            .with_context(|| format!("advertising {}", topics.undo_redo))?;

        let latest = Arc::new(ArcSwapOption::empty());
        let received = Arc::new(AtomicU64::new(0));
        let sink = Arc::clone(&latest);
        let counter = Arc::clone(&received);
        let stats = bus
            .subscribe(&topics.stats, move |msg| {
                if let WireMsg::Stats(stats) = msg {
                    sink.store(Some(Arc::new(stats.clone())));
                    counter.fetch_add(1, Ordering::Relaxed);
                }
            })
            .with_context(|| format!("subscribing to {}", topics.stats))?;

        Ok(Self {
            user_cmd,
            undo_redo,
            latest,
            received,
            _stats: stats,
        })
    }

    /// Announces an edit the client already applied locally.
    pub fn execute(&self, msg: NewCommandMsg) -> TransportResult<usize> {
        trace!("announcing {:?} on {}", msg.cmd_type, self.user_cmd.topic());
        self.user_cmd.publish(&WireMsg::UserCmd(msg))
    }

    pub fn undo(&self, command_id: Option<CommandId>) -> TransportResult<usize> {
        self.undo_redo
            .publish(&WireMsg::UndoRedo(UndoRedoMsg::undo(command_id)))
    }

    pub fn redo(&self, command_id: Option<CommandId>) -> TransportResult<usize> {
        self.undo_redo
            .publish(&WireMsg::UndoRedo(UndoRedoMsg::redo(command_id)))
    }

    /// Most recent stats received, if any.
    pub fn latest_stats(&self) -> Option<Arc<CommandStatsMsg>> {
        self.latest.load_full()
    }

    pub fn stats_received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }
}
