//! Dense arena holding every agent of a run.
//!
//! Agents live in a `Vec` in creation order, which is also the order the
//! tick loop processes them in. Each agent is addressed by its stable
//! [`AgentId`]; a side table maps ids to slots. A dead agent stays in its
//! slot (a tombstone) until [`Population::compact`] runs at the end of the
//! tick, so slot numbers stay valid while a tick is in progress.

use std::collections::BTreeMap;

use ecosim_agents::Agent;
use ecosim_types::{AgentId, Species};

/// Errors raised by the arena.
#[derive(Debug, thiserror::Error)]
pub enum PopulationError {
    /// The id sequence is exhausted.
    #[error("agent id space exhausted")]
    IdsExhausted,

    /// An agent was pushed with an id that is already present.
    #[error("agent {0} is already in the population")]
    Duplicate(AgentId),
}

/// Arena of agents with stable handles.
#[derive(Debug, Clone, Default)]
pub struct Population {
    agents: Vec<Agent>,
    slots: BTreeMap<AgentId, usize>,
    next_id: u64,
}

impl Population {
    /// An empty population whose first id is 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the next agent id.
    ///
    /// # Errors
    ///
    /// Returns [`PopulationError::IdsExhausted`] when the sequence would
    /// overflow.
    pub fn allocate_id(&mut self) -> Result<AgentId, PopulationError> {
        let id = AgentId(self.next_id);
        self.next_id = id
            .next()
            .ok_or(PopulationError::IdsExhausted)?
            .into_inner();
        Ok(id)
    }

    /// Append an agent after every existing one.
    ///
    /// # Errors
    ///
    /// Returns [`PopulationError::Duplicate`] if the id is already present.
    pub fn push(&mut self, agent: Agent) -> Result<(), PopulationError> {
        let id = agent.id();
        if self.slots.contains_key(&id) {
            return Err(PopulationError::Duplicate(id));
        }
        self.slots.insert(id, self.agents.len());
        self.agents.push(agent);
        Ok(())
    }

    /// Number of occupied slots, tombstones included.
    pub fn slot_count(&self) -> usize {
        self.agents.len()
    }

    /// Whether the arena holds no slots at all.
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// The agent in a slot.
    pub fn slot(&self, slot: usize) -> Option<&Agent> {
        self.agents.get(slot)
    }

    /// Mutable access to the agent in a slot.
    pub fn slot_mut(&mut self, slot: usize) -> Option<&mut Agent> {
        self.agents.get_mut(slot)
    }

    /// Look up an agent by id, dead or alive.
    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.slots.get(&id).and_then(|&slot| self.agents.get(slot))
    }

    /// Mutable lookup by id.
    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        let slot = *self.slots.get(&id)?;
        self.agents.get_mut(slot)
    }

    /// Live agents in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Agent> {
        self.agents.iter().filter(|agent| agent.is_alive())
    }

    /// Number of live agents.
    pub fn live_count(&self) -> usize {
        self.iter().count()
    }

    /// Number of live agents of one species.
    pub fn count(&self, species: Species) -> usize {
        self.iter().filter(|agent| agent.species() == species).count()
    }

    /// Drop every tombstone and renumber the slots. Returns the ids removed.
    pub fn compact(&mut self) -> Vec<AgentId> {
        let mut removed = Vec::new();
        self.agents.retain(|agent| {
            let alive = agent.is_alive();
            if !alive {
                removed.push(agent.id());
            }
            alive
        });
        if !removed.is_empty() {
            self.slots = self
                .agents
                .iter()
                .enumerate()
                .map(|(slot, agent)| (agent.id(), slot))
                .collect();
        }
        removed
    }
}
