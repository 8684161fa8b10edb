//! Fixed-step loop that owns the world and drains the command manager.

use anyhow::{Context, Result};
use log::{debug, info};
use user_cmd::{CommandManager, DrainReport};
use user_cmd_abi::{Steppable, World};

use crate::config::{DrainPhase, DriverConfig};

/// Runs the world one fixed step at a time, draining pending commands exactly
/// once per step.
pub struct StepDriver<W> {
    world: W,
    manager: CommandManager,
    config: DriverConfig,
    iterations: u64,
}

impl<W: World + Steppable> StepDriver<W> {
    pub fn new(world: W, manager: CommandManager, config: DriverConfig) -> Result<Self> {
        config.validate().context("invalid step driver config")?;
        info!(
            "step driver ready: step {}s, drain {:?}",
            config.step_size, config.drain_phase
        );
        Ok(Self {
            world,
            manager,
            config,
            iterations: 0,
        })
    }

    /// Advances one step and returns what the drain did.
    pub fn step(&mut self) -> DrainReport {
        let report = match self.config.drain_phase {
            DrainPhase::BeforePhysics => {
                let report = self.manager.process_pending_states(&mut self.world);
                self.world.integrate(self.config.step_size);
                report
            }
            DrainPhase::AfterPhysics => {
                self.world.integrate(self.config.step_size);
                self.manager.process_pending_states(&mut self.world)
            }
        };
        self.iterations += 1;
        if !report.is_empty() {
            debug!(
                "step {} at t={:.4}: {} requests drained",
                self.iterations,
                self.world.sim_time(),
                report.events.len()
            );
        }
        report
    }

    /// Runs `steps` steps and returns how many requests were drained in total.
    pub fn run(&mut self, steps: u64) -> usize {
        (0..steps).map(|_| self.step().events.len()).sum()
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }

    pub fn manager(&self) -> &CommandManager {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut CommandManager {
        &mut self.manager
    }

    /// Shuts the manager down and hands back the world.
    pub fn into_world(mut self) -> W {
        self.manager.shutdown();
        self.world
    }
}
