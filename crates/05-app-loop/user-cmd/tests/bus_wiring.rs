//! Manager behaviour when fed through a transport bus.

use std::sync::Arc;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use transport::Bus;
use user_cmd::{CommandManager, ManagerConfig, StatsPolicy};
use user_cmd_abi::{
    CommandStatsMsg, EntityDescription, NewCommandMsg, Pose, UndoRedoMsg, WireMsg,
};
use world::SimWorld;

const USER_CMD: &str = "~/user_cmd";
const UNDO_REDO: &str = "~/undo_redo";
const STATS: &str = "~/user_cmd_stats";

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn world() -> SimWorld {
    SimWorld::new().with_entity(EntityDescription::new("box", "<sdf/>"))
}

fn move_box(x: f64) -> WireMsg {
    WireMsg::UserCmd(NewCommandMsg::moving("box", Pose::default(), Pose::at(x, 0.0, 0.0)))
}

type StatsLog = Arc<Mutex<Vec<CommandStatsMsg>>>;

fn collect_stats(bus: &Bus<WireMsg>) -> (StatsLog, transport::Subscription) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let sub = bus
        .subscribe(STATS, move |msg| {
            if let WireMsg::Stats(stats) = msg {
                sink.lock().push(stats.clone());
            }
        })
        .unwrap();
    (seen, sub)
}

/// Building subscribes both command topics and advertises stats.
#[test]
fn build_wires_topics() {
    init_logging();
    let bus = Bus::new();
    let manager = CommandManager::builder().bus(bus.clone()).build().unwrap();

    assert_eq!(bus.subscriber_count(USER_CMD), 1);
    assert_eq!(bus.subscriber_count(UNDO_REDO), 1);
    assert!(bus.metrics(STATS).is_some(), "stats topic advertised");

    drop(manager);
    assert_eq!(bus.subscriber_count(USER_CMD), 0, "drop retires subscriptions");
    assert_eq!(bus.subscriber_count(UNDO_REDO), 0);
}

/// Published commands wait in the queue until the next drain.
#[test]
fn published_commands_apply_on_drain() {
    init_logging();
    let bus = Bus::new();
    let mut manager = CommandManager::builder().bus(bus.clone()).build().unwrap();
    let (stats, _sub) = collect_stats(&bus);
    let mut world = world();

    bus.publish(USER_CMD, &move_box(1.0)).unwrap();
    bus.publish(USER_CMD, &move_box(2.0)).unwrap();
    assert_eq!(manager.pending_len(), 2);
    assert!(manager.history().is_empty(), "nothing applied before the drain");

    manager.process_pending_states(&mut world);
    bus.publish(UNDO_REDO, &WireMsg::UndoRedo(UndoRedoMsg::undo(None)))
        .unwrap();
    manager.process_pending_states(&mut world);

    let counts: Vec<_> = stats
        .lock()
        .iter()
        .map(|s| (s.undoable_count, s.redoable_count))
        .collect();
    assert_eq!(counts, vec![(2, 0), (1, 1)], "one stats message per drain");
    assert_eq!(world.entity("box").unwrap().state.pose, Pose::at(1.0, 0.0, 0.0));
}

/// Malformed and misrouted messages are dropped before queueing.
#[test]
fn malformed_messages_are_dropped() {
    init_logging();
    let bus = Bus::new();
    let mut manager = CommandManager::builder().bus(bus.clone()).build().unwrap();
    let inbox = manager.inbox();

    let mut nameless = NewCommandMsg::moving("box", Pose::default(), Pose::default());
    nameless.entity_name.clear();
    bus.publish(USER_CMD, &WireMsg::UserCmd(nameless)).unwrap();
    bus.publish(USER_CMD, &WireMsg::UndoRedo(UndoRedoMsg::undo(None)))
        .unwrap();
    bus.publish(UNDO_REDO, &move_box(1.0)).unwrap();

    assert_eq!(inbox.dropped(), 3);
    assert_eq!(inbox.accepted(), 0);
    let report = manager.process_pending_states(&mut world());
    assert!(report.is_empty());
}

/// After shutdown, callbacks still reachable through the inbox do nothing.
#[test]
fn shutdown_closes_the_inbox() {
    init_logging();
    let bus = Bus::new();
    let mut manager = CommandManager::builder().bus(bus.clone()).build().unwrap();
    let inbox = manager.inbox();

    manager.shutdown();
    manager.shutdown();

    assert_eq!(bus.publish(USER_CMD, &move_box(1.0)).unwrap(), 0);
    inbox.on_new_command_message(&move_box(1.0));
    assert_eq!(
        inbox.submit_undo_redo(UndoRedoMsg::undo(None)),
        Err(user_cmd::CommandError::ManagerUnavailable)
    );
    assert_eq!(inbox.dropped(), 1);
    assert_eq!(manager.pending_len(), 0);
}

/// A command published while a drain runs waits for the following drain.
#[test]
fn reentrant_publish_waits_for_next_drain() {
    init_logging();
    let bus: Bus<WireMsg> = Bus::new();
    let mut manager = CommandManager::builder().bus(bus.clone()).build().unwrap();

    // Every stats emission triggers one more command from a "client".
    let echo_bus = bus.clone();
    let _echo = bus
        .subscribe(STATS, move |msg| {
            if let WireMsg::Stats(stats) = msg {
                if stats.undoable_count < 3 {
                    let _ = echo_bus.publish(USER_CMD, &move_box(stats.undoable_count as f64));
                }
            }
        })
        .unwrap();

    let mut world = world();
    bus.publish(USER_CMD, &move_box(0.0)).unwrap();

    for expected in 1..=3 {
        let report = manager.process_pending_states(&mut world);
        assert_eq!(report.created(), 1, "drain {expected} applies one command");
        assert_eq!(manager.history().len(), expected);
    }
    assert_eq!(manager.pending_len(), 0);
}

/// `Always` republishes identical stats; `publish_current_stats` ignores policy.
#[test]
fn stats_policy_controls_emission() {
    init_logging();
    let bus = Bus::new();
    let config = ManagerConfig {
        stats_policy: StatsPolicy::Always,
        stats_detail: false,
        ..ManagerConfig::default()
    };
    let mut manager = CommandManager::builder()
        .config(config)
        .bus(bus.clone())
        .build()
        .unwrap();
    let (stats, _sub) = collect_stats(&bus);
    let mut world = world();

    for _ in 0..2 {
        bus.publish(UNDO_REDO, &WireMsg::UndoRedo(UndoRedoMsg::redo(None)))
            .unwrap();
        let report = manager.process_pending_states(&mut world);
        assert!(report.stats_published);
    }
    manager.publish_current_stats();

    let stats = stats.lock();
    assert_eq!(stats.len(), 3);
    assert!(stats.iter().all(|s| *s == CommandStatsMsg::default()));
}

/// Invalid configuration is reported by the builder.
#[test]
fn duplicate_topics_fail_to_build() {
    let mut config = ManagerConfig::default();
    config.topics.stats = config.topics.user_cmd.clone();

    let err = CommandManager::builder().config(config).build().err();
    let err = err.expect("duplicate topics are rejected");
    assert!(format!("{err:#}").contains("~/user_cmd"), "error names the topic: {err:#}");
}
