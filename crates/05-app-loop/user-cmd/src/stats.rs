//! Undo/redo counters broadcast to clients.

use std::sync::Arc;

use arc_swap::ArcSwap;
use log::{trace, warn};
use transport::Publisher;
use user_cmd_abi::{CommandStatsMsg, CommandSummary, WireMsg};

use crate::config::StatsPolicy;
use crate::history::History;
use crate::record::CommandRecord;

/// Lock-free view of the most recently emitted stats.
#[derive(Clone)]
pub struct StatsHandle {
    latest: Arc<ArcSwap<CommandStatsMsg>>,
}

impl StatsHandle {
    pub fn load(&self) -> Arc<CommandStatsMsg> {
        self.latest.load_full()
    }
}

pub struct StatsPublisher {
    publisher: Option<Publisher<WireMsg>>,
    policy: StatsPolicy,
    detail: bool,
    last_emitted: Option<CommandStatsMsg>,
    latest: Arc<ArcSwap<CommandStatsMsg>>,
    emitted: u64,
}

impl StatsPublisher {
    pub fn new(publisher: Option<Publisher<WireMsg>>, policy: StatsPolicy, detail: bool) -> Self {
        Self {
            publisher,
            policy,
            detail,
            last_emitted: None,
            latest: Arc::new(ArcSwap::from_pointee(CommandStatsMsg::default())),
            emitted: 0,
        }
    }

    /// Derives the stats message from the history alone.
    pub fn snapshot(history: &History, detail: bool) -> CommandStatsMsg {
        let summaries = |records: &[CommandRecord]| -> Vec<CommandSummary> {
            if detail {
                records.iter().map(CommandRecord::summary).collect()
            } else {
                Vec::new()
            }
        };
        CommandStatsMsg {
            undoable_count: history.undoable_count() as u64,
            redoable_count: history.redoable_count() as u64,
            undo_commands: summaries(history.undoable()),
            redo_commands: summaries(history.redoable()),
        }
    }

    /// Called once after a drain that processed at least one request.
    /// Returns whether a message went out.
    pub fn after_drain(&mut self, history: &History) -> bool {
        let msg = Self::snapshot(history, self.detail);
        if self.policy == StatsPolicy::OnChange && self.last_emitted.as_ref() == Some(&msg) {
            trace!("stats unchanged, not publishing");
            return false;
        }
        self.emit(msg);
        true
    }

    /// Emits the current stats regardless of policy.
    pub fn publish_current(&mut self, history: &History) {
        let msg = Self::snapshot(history, self.detail);
        self.emit(msg);
    }

    pub fn handle(&self) -> StatsHandle {
        StatsHandle {
            latest: Arc::clone(&self.latest),
        }
    }

    /// Number of messages emitted so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    fn emit(&mut self, msg: CommandStatsMsg) {
        self.latest.store(Arc::new(msg.clone()));
        if let Some(publisher) = &self.publisher {
            if let Err(err) = publisher.publish(&WireMsg::Stats(msg.clone())) {
                warn!("failed to publish stats on {}: {err}", publisher.topic());
            }
        }
        trace!(
            "stats: {} undoable, {} redoable",
            msg.undoable_count,
            msg.redoable_count
        );
        self.last_emitted = Some(msg);
        self.emitted += 1;
    }
}
