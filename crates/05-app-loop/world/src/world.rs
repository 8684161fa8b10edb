//! Minimal world state container used by the step driver and tests.

use std::collections::BTreeMap;

use log::debug;
use user_cmd_abi::{EntityDescription, EntityState, Steppable, World, WorldError, WorldResult};

/// Entity map keyed by unique name, plus a simulation clock.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimWorld {
    entities: BTreeMap<String, EntityDescription>,
    sim_time: f64,
}

impl SimWorld {
    /// Creates an empty world at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns `description` while building a world, ignoring name collisions.
    pub fn with_entity(mut self, description: EntityDescription) -> Self {
        self.entities.insert(description.name.clone(), description);
        self
    }

    /// Borrows an entity by name.
    pub fn entity(&self, name: &str) -> Option<&EntityDescription> {
        self.entities.get(name)
    }

    /// Names of all live entities in sorted order.
    pub fn entity_names(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    fn unique_name(&self, requested: &str) -> String {
        if !self.entities.contains_key(requested) {
            return requested.to_owned();
        }
        (0u64..)
            .map(|n| format!("{requested}_{n}"))
            .find(|candidate| !self.entities.contains_key(candidate))
            .unwrap_or_else(|| requested.to_owned())
    }
}

impl World for SimWorld {
    fn snapshot_entity(&self, name: &str) -> Option<EntityDescription> {
        self.entities.get(name).cloned()
    }

    fn restore_entity(&mut self, name: &str, state: &EntityState) -> WorldResult<()> {
        if !state.is_finite() {
            return Err(WorldError::InvalidDescription(format!(
                "non-finite state for {name}"
            )));
        }
        let entity = self
            .entities
            .get_mut(name)
            .ok_or_else(|| WorldError::UnknownEntity(name.to_owned()))?;
        entity.state = *state;
        Ok(())
    }

    fn remove_entity(&mut self, name: &str) -> WorldResult<EntityDescription> {
        self.entities
            .remove(name)
            .ok_or_else(|| WorldError::UnknownEntity(name.to_owned()))
    }

    fn spawn_entity(&mut self, description: &EntityDescription) -> WorldResult<String> {
        if description.name.is_empty() {
            return Err(WorldError::InvalidDescription(
                "entity name is empty".to_owned(),
            ));
        }
        if !description.state.is_finite() {
            return Err(WorldError::InvalidDescription(format!(
                "non-finite state for {}",
                description.name
            )));
        }

        let name = self.unique_name(&description.name);
        if name != description.name {
            debug!("spawn renamed {} to {name}", description.name);
        }
        let mut spawned = description.clone();
        spawned.name = name.clone();
        self.entities.insert(name.clone(), spawned);
        Ok(name)
    }

    fn contains_entity(&self, name: &str) -> bool {
        self.entities.contains_key(name)
    }
}

impl Steppable for SimWorld {
    fn integrate(&mut self, dt: f64) {
        self.sim_time += dt;
        for entity in self.entities.values_mut() {
            let state = &mut entity.state;
            state.pose.position = state.pose.position + state.velocity.linear.scaled(dt);
        }
    }

    fn sim_time(&self) -> f64 {
        self.sim_time
    }
}
