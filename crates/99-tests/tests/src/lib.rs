//! End-to-end suite for the user command pipeline.

#[cfg(test)]
mod concurrent;

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use transport::Bus;
    use user_cmd::{CommandManager, HistoryState, ManagerConfig};
    use user_cmd_abi::{
        CommandId, CommandSummary, EntityDescription, NewCommandMsg, Pose, Vec3,
    };
    use world::SimWorld;

    use app::{DriverConfig, RemoteClient, StepDriver};

    fn summary(id: u64, description: &str) -> CommandSummary {
        CommandSummary {
            id: CommandId(id),
            description: description.to_string(),
        }
    }

    /// Two clients editing the same scene share one history.
    #[test]
    fn two_clients_share_history() {
        let _ = env_logger::builder().is_test(true).try_init();
        let bus = Bus::new();
        let config = ManagerConfig::default();
        let manager = CommandManager::builder()
            .config(config.clone())
            .bus(bus.clone())
            .build()
            .expect("build manager");
        let alice = RemoteClient::connect(&bus, &config.topics).expect("alice");
        let bob = RemoteClient::connect(&bus, &config.topics).expect("bob");

        let table = EntityDescription::new("table", "<sdf/>").with_pose(Pose::at(1.0, 0.0, 0.0));
        let scene = SimWorld::new()
            .with_entity(table)
            .with_entity(EntityDescription::new("lamp", "<sdf/>"));
        let mut driver =
            StepDriver::new(scene, manager, DriverConfig::default()).expect("build driver");

        alice
            .execute(
                NewCommandMsg::moving("table", Pose::default(), Pose::at(1.0, 0.0, 0.0))
                    .with_description("move table"),
            )
            .unwrap();
        bob.execute(
            NewCommandMsg::scaling("lamp", Vec3::ONE, Vec3::new(2.0, 2.0, 2.0))
                .with_description("grow lamp"),
        )
        .unwrap();
        driver.step();

        bob.undo(Some(CommandId(1))).unwrap();
        driver.step();
        assert_eq!(driver.manager().state(), HistoryState::PartiallyUndone);

        let lamp = driver.world().entity("lamp").unwrap();
        assert_eq!(lamp.state.scale, Vec3::ONE, "bob's scale reverted");
        for client in [&alice, &bob] {
            let stats = client.latest_stats().expect("stats delivered");
            assert_eq!(stats.undo_commands, vec![summary(0, "move table")]);
            assert_eq!(stats.redo_commands, vec![summary(1, "grow lamp")]);
            assert_eq!(client.stats_received(), 2);
        }

        // Alice branches off; bob's undone edit is gone for good.
        alice
            .execute(
                NewCommandMsg::moving("lamp", Pose::default(), Pose::at(0.0, 2.0, 0.0))
                    .with_description("move lamp"),
            )
            .unwrap();
        bob.redo(Some(CommandId(1))).unwrap();
        let report = driver.step();
        assert_eq!(report.created(), 1);
        assert_eq!(report.rejected(), 1, "redo of a discarded command");

        let stats = bob.latest_stats().unwrap();
        assert_eq!(
            stats.undo_commands,
            vec![summary(0, "move table"), summary(2, "move lamp")]
        );
        assert_eq!(stats.redoable_count, 0);
    }

    /// Deleting, undoing and redoing a model through the full stack.
    #[test]
    fn delete_undo_redo_through_driver() {
        let bus = Bus::new();
        let manager = CommandManager::builder().bus(bus.clone()).build().unwrap();
        let client = RemoteClient::connect(&bus, &manager.config().topics).unwrap();
        let chair = EntityDescription::new("chair", "<sdf><model name='chair'/></sdf>")
            .with_pose(Pose::at(3.0, 1.0, 0.0));

        // The client already removed the chair locally.
        let mut driver =
            StepDriver::new(SimWorld::new(), manager, DriverConfig::default()).unwrap();
        client.execute(NewCommandMsg::deleting(chair.clone())).unwrap();
        client.undo(None).unwrap();
        driver.step();
        assert_eq!(driver.world().entity("chair"), Some(&chair), "undo restores the chair");

        client.redo(None).unwrap();
        driver.step();
        assert!(driver.world().is_empty(), "redo deletes it again");
        assert_eq!(driver.manager().state(), HistoryState::AllApplied);
    }
}
