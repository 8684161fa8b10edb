//! Server-side undo/redo history for user commands.
//!
//! Remote clients perform an action locally and then announce it on the bus.
//! The [`CommandManager`] turns those announcements, plus undo/redo requests,
//! into a single linear history that it applies to the world exactly once per
//! simulation step:
//!
//! 1. Network callbacks run on whatever thread delivers the message. They
//!    validate what can be validated without world access and push a
//!    [`PendingRequest`] through the [`Inbox`]. Nothing else happens there.
//! 2. The step driver calls [`CommandManager::process_pending_states`] once per
//!    step. Only this call touches the [`History`] or the world, applying the
//!    queued requests in arrival order.
//! 3. After a non-empty drain the [`StatsPublisher`] broadcasts the undo/redo
//!    counters.
//!
//! Records never hold the world or the manager; both are passed in when a
//! record is undone or redone.

pub mod actions;
pub mod config;
pub mod error;
pub mod history;
pub mod manager;
pub mod pending;
pub mod record;
pub mod stats;

pub use actions::{ActionError, ActionFn, ActionHandlers, ActionResult, ActionTable};
pub use config::{ManagerConfig, StatsPolicy, TopicConfig};
pub use error::{CommandError, CommandResult, ConfigError, IllegalReason, MalformedReason};
pub use history::{History, HistoryState};
pub use manager::{CommandManager, CommandManagerBuilder, DrainEvent, DrainReport};
pub use pending::{Inbox, PendingQueue, PendingRequest};
pub use record::{CommandRecord, CommandState, Transition};
pub use stats::{StatsHandle, StatsPublisher};
