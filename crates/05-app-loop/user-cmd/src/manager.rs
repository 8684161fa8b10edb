//! The command manager: history owner and once-per-step drain.

use std::sync::Arc;

use anyhow::{Context, Result};
use log::{debug, info, trace, warn};
use smallvec::SmallVec;
use transport::{Bus, Subscription};
use user_cmd_abi::{CommandId, CommandStatsMsg, WireMsg, World};

use crate::actions::ActionTable;
use crate::config::ManagerConfig;
use crate::error::CommandError;
use crate::history::{History, HistoryState};
use crate::pending::{self, Inbox, PendingQueue, PendingRequest};
use crate::record::Transition;
use crate::stats::{StatsHandle, StatsPublisher};

/// What happened to one drained request.
///
/// `skipped` is set when the transition completed but its world-side effect
/// could not be applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DrainEvent {
    Created {
        id: CommandId,
        discarded: usize,
    },
    Undone {
        id: CommandId,
        skipped: Option<CommandError>,
    },
    Redone {
        id: CommandId,
        skipped: Option<CommandError>,
    },
    Rejected(CommandError),
}

impl DrainEvent {
    /// Why the world was left untouched, for completed transitions.
    pub fn skipped(&self) -> Option<&CommandError> {
        match self {
            DrainEvent::Undone { skipped, .. } | DrainEvent::Redone { skipped, .. } => {
                skipped.as_ref()
            }
            _ => None,
        }
    }
}

/// Summary of a single [`CommandManager::process_pending_states`] call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub events: SmallVec<[DrainEvent; 8]>,
    pub stats_published: bool,
}

impl DrainReport {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn created(&self) -> usize {
        self.count(|e| matches!(e, DrainEvent::Created { .. }))
    }

    pub fn undone(&self) -> usize {
        self.count(|e| matches!(e, DrainEvent::Undone { .. }))
    }

    pub fn redone(&self) -> usize {
        self.count(|e| matches!(e, DrainEvent::Redone { .. }))
    }

    pub fn rejected(&self) -> usize {
        self.count(|e| matches!(e, DrainEvent::Rejected(_)))
    }

    /// Transitions whose target entity no longer exists.
    pub fn stale(&self) -> usize {
        self.count(|e| matches!(e.skipped(), Some(CommandError::StaleEntity { .. })))
    }

    /// Transitions that completed without their world-side effect, for any
    /// reason. Includes [`stale`](Self::stale) ones.
    pub fn skipped(&self) -> usize {
        self.count(|e| e.skipped().is_some())
    }

    fn count(&self, pred: impl Fn(&DrainEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

/// Owns the command history and applies queued requests once per step.
///
/// Network callbacks only ever reach the shared [`Inbox`]; the history, the
/// queue's receiving end, and the stats publisher live here and are touched
/// exclusively by [`process_pending_states`](Self::process_pending_states).
pub struct CommandManager {
    config: ManagerConfig,
    inbox: Arc<Inbox>,
    pending: PendingQueue,
    history: History,
    actions: Arc<ActionTable>,
    stats: StatsPublisher,
    subscriptions: Vec<Subscription>,
}

impl CommandManager {
    pub fn builder() -> CommandManagerBuilder {
        CommandManagerBuilder::new()
    }

    /// Shared network-side handle. Clones keep enqueueing valid until shutdown.
    pub fn inbox(&self) -> Arc<Inbox> {
        Arc::clone(&self.inbox)
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn actions(&self) -> &ActionTable {
        &self.actions
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn state(&self) -> HistoryState {
        self.history.state()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Current counters, computed from the history.
    pub fn stats(&self) -> CommandStatsMsg {
        StatsPublisher::snapshot(&self.history, self.config.stats_detail)
    }

    pub fn stats_handle(&self) -> StatsHandle {
        self.stats.handle()
    }

    pub fn stats_emitted(&self) -> u64 {
        self.stats.emitted()
    }

    /// Applies every request queued before this call, in arrival order, then
    /// publishes stats once. Must be called from the step context only.
    pub fn process_pending_states(&mut self, world: &mut dyn World) -> DrainReport {
        let requests: SmallVec<[PendingRequest; 8]> = self.pending.drain_snapshot().collect();
        let mut report = DrainReport::default();
        if requests.is_empty() {
            return report;
        }

        for request in requests {
            let event = self.apply(request, world);
            report.events.push(event);
        }
        report.stats_published = self.stats.after_drain(&self.history);

        debug!(
            "drained {} requests: {} created, {} undone, {} redone, {} rejected, {} skipped; \
             cursor {}/{}",
            report.events.len(),
            report.created(),
            report.undone(),
            report.redone(),
            report.rejected(),
            report.skipped(),
            self.history.cursor(),
            self.history.len()
        );
        report
    }

    /// Publishes the current stats regardless of the configured policy.
    pub fn publish_current_stats(&mut self) {
        self.stats.publish_current(&self.history);
    }

    /// Stops accepting messages and retires bus subscriptions. Requests still
    /// queued are discarded with the manager. Idempotent.
    pub fn shutdown(&mut self) {
        if !self.inbox.is_open() && self.subscriptions.is_empty() {
            return;
        }
        self.inbox.close();
        let retired = self.subscriptions.len();
        for subscription in self.subscriptions.drain(..) {
            subscription.unsubscribe();
        }
        info!(
            "command manager shut down ({} subscriptions retired, {} requests unprocessed)",
            retired,
            self.pending.len()
        );
    }

    fn apply(&mut self, request: PendingRequest, world: &mut dyn World) -> DrainEvent {
        match request {
            PendingRequest::NewCommand(msg) => {
                let description = msg.description.clone();
                let (id, discarded) = self.history.push(msg);
                if discarded > 0 {
                    debug!("command {id} discarded {discarded} redoable commands");
                }
                trace!("recorded command {id}: {description}");
                DrainEvent::Created { id, discarded }
            }
            PendingRequest::Undo(requested) => {
                match self.history.undo(requested, world, &self.actions) {
                    Ok((id, transition)) => DrainEvent::Undone {
                        id,
                        skipped: note_skipped("undo", id, transition),
                    },
                    Err(err) => self.reject(err),
                }
            }
            PendingRequest::Redo(requested) => {
                match self.history.redo(requested, world, &self.actions) {
                    Ok((id, transition)) => DrainEvent::Redone {
                        id,
                        skipped: note_skipped("redo", id, transition),
                    },
                    Err(err) => self.reject(err),
                }
            }
        }
    }

    fn reject(&self, err: CommandError) -> DrainEvent {
        warn!(
            "dropping request at cursor {}/{}: {err}",
            self.history.cursor(),
            self.history.len()
        );
        DrainEvent::Rejected(err)
    }
}

impl Drop for CommandManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn note_skipped(action: &str, id: CommandId, transition: Transition) -> Option<CommandError> {
    match transition {
        Transition::Applied => None,
        Transition::Skipped(err @ CommandError::StaleEntity { .. }) => {
            warn!("{action} of command {id} skipped: {err}");
            Some(err)
        }
        Transition::Skipped(err) => {
            warn!("{action} of command {id} failed to apply to the world: {err}");
            Some(err)
        }
    }
}

/// Builder for a [`CommandManager`].
pub struct CommandManagerBuilder {
    config: Option<ManagerConfig>,
    actions: Option<ActionTable>,
    bus: Option<Bus<WireMsg>>,
}

impl CommandManagerBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            actions: None,
            bus: None,
        }
    }

    pub fn config(mut self, config: ManagerConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Replaces the built-in action table.
    pub fn actions(mut self, actions: ActionTable) -> Self {
        self.actions = Some(actions);
        self
    }

    /// Subscribes the manager to its command topics and advertises stats on
    /// `bus`. Without a bus the manager is fed through [`CommandManager::inbox`].
    pub fn bus(mut self, bus: Bus<WireMsg>) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn build(self) -> Result<CommandManager> {
        let config = self.config.unwrap_or_default();
        config.validate().context("invalid command manager config")?;

        let actions = Arc::new(self.actions.unwrap_or_default());
        let (inbox, pending) = pending::channel(Arc::clone(&actions));

        let mut subscriptions = Vec::new();
        let mut publisher = None;
        if let Some(bus) = &self.bus {
            let topics = &config.topics;

            let cmd_inbox = Arc::clone(&inbox);
            subscriptions.push(
                bus.subscribe(&topics.user_cmd, move |msg| {
                    cmd_inbox.on_new_command_message(msg)
                })
                .with_context(|| format!("subscribing to {}", topics.user_cmd))?,
            );

            let undo_inbox = Arc::clone(&inbox);
            subscriptions.push(
                bus.subscribe(&topics.undo_redo, move |msg| {
                    undo_inbox.on_undo_redo_message(msg)
                })
                .with_context(|| format!("subscribing to {}", topics.undo_redo))?,
            );

            publisher = Some(
                bus.advertise(&topics.stats)
                    .with_context(|| format!("advertising {}", topics.stats))?,
            );
            info!(
                "command manager listening on {} and {}, stats on {}",
                topics.user_cmd, topics.undo_redo, topics.stats
            );
        }

        let stats = StatsPublisher::new(publisher, config.stats_policy, config.stats_detail);
        Ok(CommandManager {
            config,
            inbox,
            pending,
            history: History::new(),
            actions,
            stats,
            subscriptions,
        })
    }
}

impl Default for CommandManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
