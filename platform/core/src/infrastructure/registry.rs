// Copyright (c) 2026 Agora Contributors
// SPDX-License-Identifier: Apache-2.0

//! Authoritative in-memory map of deployed containers and the agents each
//! currently exposes.

use crate::domain::agent::AgentDescription;
use crate::domain::container::{ContainerState, DeployedContainer};
use parking_lot::RwLock;

/// Owns every [`DeployedContainer`] for the lifetime of the deployment.
///
/// Backed by a Vec so that iteration order is registration order; the
/// tie-break for an unqualified invoke among multiple matches is
/// first-registration order.
#[derive(Debug, Default)]
pub struct ContainerRegistry {
    entries: RwLock<Vec<DeployedContainer>>,
}

impl ContainerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, container: DeployedContainer) {
        self.entries.write().push(container);
    }

    pub fn get(&self, container_id: &str) -> Option<DeployedContainer> {
        self.entries
            .read()
            .iter()
            .find(|c| c.container_id == container_id)
            .cloned()
    }

    pub fn list(&self) -> Vec<DeployedContainer> {
        self.entries.read().clone()
    }

    /// Replace a container's agent list wholesale. Readers observe either
    /// the pre- or the post-refresh list in full, never a mix.
    pub fn update_agents(&self, container_id: &str, agents: Vec<AgentDescription>) -> bool {
        let mut entries = self.entries.write();
        match entries.iter_mut().find(|c| c.container_id == container_id) {
            Some(container) => {
                container.agents = agents;
                true
            }
            None => false,
        }
    }

    pub fn set_state(&self, container_id: &str, state: ContainerState) -> bool {
        let mut entries = self.entries.write();
        match entries.iter_mut().find(|c| c.container_id == container_id) {
            Some(container) => {
                container.state = state;
                true
            }
            None => false,
        }
    }

    /// Remove a container. Removing an unknown identifier returns `None`
    /// rather than raising an error.
    pub fn remove(&self, container_id: &str) -> Option<DeployedContainer> {
        let mut entries = self.entries.write();
        let index = entries
            .iter()
            .position(|c| c.container_id == container_id)?;
        Some(entries.remove(index))
    }

    /// All agents across all containers, in registration order.
    pub fn agents(&self) -> Vec<AgentDescription> {
        self.entries
            .read()
            .iter()
            .flat_map(|c| c.agents.iter().cloned())
            .collect()
    }

    pub fn agent(&self, agent_id: &str) -> Option<AgentDescription> {
        self.entries
            .read()
            .iter()
            .flat_map(|c| c.agents.iter())
            .find(|a| a.agent_id == agent_id)
            .cloned()
    }

    /// First container, in registration order, hosting the given agent.
    pub fn find_agent_container(&self, agent_id: &str) -> Option<DeployedContainer> {
        self.entries
            .read()
            .iter()
            .find(|c| c.find_agent(agent_id).is_some())
            .cloned()
    }

    /// First container, in registration order, offering the given action,
    /// optionally restricted to one agent.
    pub fn find_action_container(
        &self,
        action: &str,
        agent_id: Option<&str>,
    ) -> Option<DeployedContainer> {
        self.entries
            .read()
            .iter()
            .find(|c| c.has_action(action, agent_id))
            .cloned()
    }

    pub fn restore(&self, containers: Vec<DeployedContainer>) {
        *self.entries.write() = containers;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::agent::ActionDescription;
    use crate::domain::container::{Connectivity, ContainerImageSpec};
    use std::sync::Arc;

    fn container(id: &str, agents: Vec<AgentDescription>) -> DeployedContainer {
        DeployedContainer {
            container_id: id.to_string(),
            image: ContainerImageSpec::default(),
            connectivity: Connectivity {
                public_url: "http://localhost".to_string(),
                api_port_mapping: 8082,
                extra_port_mappings: Default::default(),
            },
            agents,
            state: ContainerState::Ready,
        }
    }

    fn agent(id: &str, actions: &[&str]) -> AgentDescription {
        AgentDescription {
            agent_id: id.to_string(),
            actions: actions
                .iter()
                .map(|name| ActionDescription {
                    name: name.to_string(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn remove_is_idempotent() {
        let registry = ContainerRegistry::new();
        registry.register(container("c1", vec![]));
        assert!(registry.remove("c1").is_some());
        assert!(registry.remove("c1").is_none());
        assert!(registry.remove("never-registered").is_none());
    }

    #[test]
    fn action_tie_break_is_registration_order() {
        let registry = ContainerRegistry::new();
        registry.register(container("first", vec![agent("a1", &["Add"])]));
        registry.register(container("second", vec![agent("a2", &["Add"])]));

        let hit = registry.find_action_container("Add", None).unwrap();
        assert_eq!(hit.container_id, "first");

        let hit = registry.find_action_container("Add", Some("a2")).unwrap();
        assert_eq!(hit.container_id, "second");
    }

    #[test]
    fn update_agents_replaces_wholesale() {
        let registry = ContainerRegistry::new();
        registry.register(container("c1", vec![agent("a1", &["Add"]), agent("a2", &[])]));

        assert!(registry.update_agents("c1", vec![agent("a3", &["Sub"])]));
        let agents = registry.get("c1").unwrap().agents;
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].agent_id, "a3");

        assert!(!registry.update_agents("unknown", vec![]));
    }

    /// A reader racing a refresh sees either the full old list or the full
    /// new list, never a mix of both.
    #[test]
    fn refresh_is_atomic_for_readers() {
        let registry = Arc::new(ContainerRegistry::new());
        let old_list = vec![agent("old1", &[]), agent("old2", &[])];
        let new_list = vec![agent("new1", &[]), agent("new2", &[]), agent("new3", &[])];
        registry.register(container("c1", old_list.clone()));

        let writer = {
            let registry = registry.clone();
            let (old_list, new_list) = (old_list.clone(), new_list.clone());
            std::thread::spawn(move || {
                for i in 0..500 {
                    let next = if i % 2 == 0 { &new_list } else { &old_list };
                    registry.update_agents("c1", next.clone());
                }
            })
        };

        for _ in 0..500 {
            let agents = registry.get("c1").unwrap().agents;
            assert!(
                agents == old_list || agents == new_list,
                "observed a partially updated agent list: {agents:?}"
            );
        }
        writer.join().unwrap();
    }
}
