//! Delivery from several client threads while the step loop runs.

use std::thread;

use pretty_assertions::assert_eq;
use transport::Bus;
use user_cmd::{CommandManager, TopicConfig};
use user_cmd_abi::{CommandId, EntityDescription, NewCommandMsg, Pose, UndoRedoMsg, WireMsg};
use world::SimWorld;

use app::{DriverConfig, RemoteClient, StepDriver};

const CLIENTS: usize = 4;
const COMMANDS_PER_CLIENT: usize = 250;

fn scene() -> SimWorld {
    (0..CLIENTS).fold(SimWorld::new(), |world, c| {
        world.with_entity(EntityDescription::new(format!("box_{c}"), "<sdf/>"))
    })
}

fn command(client: usize, seq: usize) -> NewCommandMsg {
    NewCommandMsg::moving(
        &format!("box_{client}"),
        Pose::default(),
        Pose::at(seq as f64, client as f64, 0.0),
    )
    .with_description(format!("{client}:{seq}"))
}

fn parse(description: &str) -> (usize, usize) {
    let (client, seq) = description
        .split_once(':')
        .expect("description is client:seq");
    (client.parse().unwrap(), seq.parse().unwrap())
}

/// Every command from every thread lands in the history, in per-thread order.
#[test]
fn concurrent_clients_lose_nothing() {
    let _ = env_logger::builder().is_test(true).try_init();
    let bus = Bus::new();
    let manager = CommandManager::builder().bus(bus.clone()).build().unwrap();
    let mut driver = StepDriver::new(scene(), manager, DriverConfig::default()).unwrap();

    let handles: Vec<_> = (0..CLIENTS)
        .map(|c| {
            let bus = bus.clone();
            thread::spawn(move || {
                let client = RemoteClient::connect(&bus, &TopicConfig::default()).unwrap();
                for seq in 0..COMMANDS_PER_CLIENT {
                    assert_eq!(client.execute(command(c, seq)).unwrap(), 1);
                    if seq % 50 == 0 {
                        thread::yield_now();
                    }
                }
            })
        })
        .collect();

    let mut steps = 0u64;
    while !handles.iter().all(|h| h.is_finished()) {
        driver.step();
        steps += 1;
    }
    for handle in handles {
        handle.join().expect("client thread");
    }
    driver.step();

    let history = driver.manager().history();
    assert_eq!(history.len(), CLIENTS * COMMANDS_PER_CLIENT);
    assert_eq!(history.cursor(), history.len());
    assert!(history.is_consistent());

    let mut next_seq = [0usize; CLIENTS];
    for record in history.records() {
        let (client, seq) = parse(record.description());
        assert_eq!(seq, next_seq[client], "client {client} out of order");
        next_seq[client] += 1;
    }
    assert!(steps > 0);

    for c in 0..CLIENTS {
        let pose = driver.world().entity(&format!("box_{c}")).unwrap().state.pose;
        assert_eq!(pose, Pose::default(), "the server never applies new commands itself");
    }
}

/// Undo requests raced against new commands are each either applied or rejected.
#[test]
fn interleaved_undo_and_commands_stay_consistent() {
    const ROUNDS: usize = 200;
    let bus: Bus<WireMsg> = Bus::new();
    let manager = CommandManager::builder().bus(bus.clone()).build().unwrap();
    let topics = manager.config().topics.clone();
    let mut driver = StepDriver::new(scene(), manager, DriverConfig::default()).unwrap();

    let writer = {
        let bus = bus.clone();
        let topics = topics.clone();
        thread::spawn(move || {
            let client = RemoteClient::connect(&bus, &topics).unwrap();
            for seq in 0..ROUNDS {
                client.execute(command(0, seq)).unwrap();
            }
        })
    };
    let undoer = {
        let bus = bus.clone();
        thread::spawn(move || {
            let undo = WireMsg::UndoRedo(UndoRedoMsg::undo(None));
            for _ in 0..ROUNDS {
                bus.publish(&topics.undo_redo, &undo).unwrap();
            }
        })
    };

    let (mut created, mut undone, mut rejected) = (0, 0, 0);
    let mut tally = |driver: &mut StepDriver<SimWorld>| {
        let report = driver.step();
        created += report.created();
        undone += report.undone();
        rejected += report.rejected();
        assert!(driver.manager().history().is_consistent());
    };
    while !(writer.is_finished() && undoer.is_finished()) {
        tally(&mut driver);
    }
    writer.join().unwrap();
    undoer.join().unwrap();
    tally(&mut driver);

    assert_eq!(created, ROUNDS);
    assert_eq!(undone + rejected, ROUNDS, "every undo is accounted for");
    let history = driver.manager().history();
    assert!(history.len() <= ROUNDS);
    let last = history.records().last().map(|r| r.id());
    assert_eq!(last, Some(CommandId(ROUNDS as u64 - 1)), "undo never drops records");
}
