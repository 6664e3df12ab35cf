//! The agent aggregate and its per-tick state machine.
//!
//! One [`Agent`] type serves both species; the species tag selects the
//! foraging action (grazing for prey, hunting for predators) and the
//! litter size from [`BehaviorConfig`]. Each tick the orchestrator calls,
//! in order:
//!
//! 1. [`Agent::update_state`] -- metabolism, desire, state transition.
//! 2. [`Agent::act`] -- the action for the current state. Side effects on
//!    other agents come back as an [`ActOutcome`] for the orchestrator to
//!    apply.
//! 3. [`Agent::advance_motion`] -- move along the heading and bounce off
//!    the field edges.
//! 4. [`Agent::grow_older`] -- aging and death by old age.

use std::f64::consts::{PI, TAU};

use ecosim_types::{
    AgentId, AgentInspection, AgentSnapshot, BehaviorState, DeathCause, Sex, Species, Vec2,
};
use ecosim_world::EnvironmentGrid;
use rand::Rng;
use tracing::debug;

use crate::config::BehaviorConfig;
use crate::error::AgentError;
use crate::genome::{Gamete, Genome, Phenotype};
use crate::perception::{NeighborView, Sight};

/// The two parents of an offspring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parents {
    /// The parent that sent the mate request.
    pub father: AgentId,
    /// The parent that accepted it.
    pub mother: AgentId,
}

/// Everything needed to bring an agent into the world.
#[derive(Debug, Clone)]
pub struct AgentSpawn {
    /// Handle assigned by the population.
    pub id: AgentId,
    /// Species tag.
    pub species: Species,
    /// Diploid genome.
    pub genome: Genome,
    /// Starting position.
    pub position: Vec2,
    /// Starting orientation in radians.
    pub orientation: f64,
    /// 0 for seed agents, one more than the older parent otherwise.
    pub generation: u32,
    /// Parents, `None` for seed agents.
    pub parents: Option<Parents>,
    /// Tick of birth.
    pub born_at_tick: u64,
}

/// Shared, mutable world context for one action.
#[derive(Debug)]
pub struct ActContext<'a> {
    /// The resource grid grazers deplete.
    pub grid: &'a mut EnvironmentGrid,
    /// Behavior parameters.
    pub config: &'a BehaviorConfig,
    /// Simulated time step.
    pub dt: f64,
}

/// A male's offer to a female, carrying one gamete per offspring.
#[derive(Debug, Clone)]
pub struct MateRequest {
    /// The requesting male.
    pub from: AgentId,
    /// The female being courted.
    pub to: AgentId,
    /// Species of the requester.
    pub species: Species,
    /// Paternal gametes, one per offspring.
    pub gametes: Vec<Gamete>,
}

/// Side effects of one action on other agents.
#[derive(Debug, Clone, Default)]
pub struct ActOutcome {
    /// A prey caught by this agent.
    pub kill: Option<AgentId>,
    /// A mate request to deliver.
    pub mate_request: Option<MateRequest>,
}

/// A simulated herbivore or carnivore.
#[derive(Debug, Clone)]
pub struct Agent {
    id: AgentId,
    species: Species,
    genome: Genome,
    phenotype: Phenotype,
    generation: u32,
    parents: Option<Parents>,
    born_at_tick: u64,

    /// Current position.
    pub position: Vec2,
    /// Orientation in radians, kept in `[0, 2*PI)`.
    orientation: f64,
    /// Unit vector along `orientation`.
    heading: Vec2,
    /// Current energy in `[0, max_energy]`.
    pub energy: f64,
    /// Current desire to mate in `[0, max_desire_to_mate]`.
    pub desire_to_mate: f64,
    /// Current behavior state.
    pub state: BehaviorState,
    /// Set when hunger triggers foraging; cleared when energy is full.
    pub seeking_food: bool,
    /// Whether the agent may initiate or accept mating.
    pub can_mate: bool,
    /// Wander ticks counted toward the mating cooldown.
    pub mate_cooldown: u32,
    /// Age in age units.
    pub age: f64,
    /// Age at which the agent dies.
    pub max_age: f64,
    /// Point the agent wanders toward.
    pub wander_target: Vec2,
    /// Wander ticks left before the target is re-rolled.
    pub wander_countdown: u32,
    alive: bool,
    cause_of_death: Option<DeathCause>,
}

impl Agent {
    /// Create an agent at full energy, wandering, not yet eligible to mate.
    pub fn spawn(
        spawn: AgentSpawn,
        config: &BehaviorConfig,
        rng: &mut impl Rng,
    ) -> Result<Self, AgentError> {
        let AgentSpawn {
            id,
            species,
            genome,
            position,
            orientation,
            generation,
            parents,
            born_at_tick,
        } = spawn;

        if !position.is_finite() || !orientation.is_finite() {
            return Err(AgentError::InvalidSpawn {
                agent: id,
                reason: format!("non-finite position {position:?} or orientation {orientation}"),
            });
        }
        let phenotype = genome
            .phenotype()
            .map_err(|source| AgentError::Genome { agent: id, source })?;

        let orientation = normalize_angle(orientation);
        let max_age = if config.max_age_min < config.max_age_max {
            rng.random_range(config.max_age_min..config.max_age_max)
        } else {
            config.max_age_min
        };

        Ok(Self {
            id,
            species,
            genome,
            phenotype,
            generation,
            parents,
            born_at_tick,
            position,
            orientation,
            heading: Vec2::from_angle(orientation),
            energy: phenotype.max_energy.max(0.0),
            desire_to_mate: 0.0,
            state: BehaviorState::Wandering,
            seeking_food: false,
            can_mate: false,
            mate_cooldown: 0,
            age: 0.0,
            max_age,
            wander_target: random_wander_target(config, rng),
            wander_countdown: 0,
            alive: true,
            cause_of_death: None,
        })
    }

    /// The agent's handle.
    pub const fn id(&self) -> AgentId {
        self.id
    }

    /// Species tag.
    pub const fn species(&self) -> Species {
        self.species
    }

    /// The agent's genome.
    pub const fn genome(&self) -> &Genome {
        &self.genome
    }

    /// Expressed trait values.
    pub const fn phenotype(&self) -> &Phenotype {
        &self.phenotype
    }

    /// Binary sex.
    pub const fn sex(&self) -> Sex {
        self.phenotype.sex
    }

    /// Generation number, 0 for seed agents.
    pub const fn generation(&self) -> u32 {
        self.generation
    }

    /// Parents, `None` for seed agents.
    pub const fn parents(&self) -> Option<Parents> {
        self.parents
    }

    /// Tick of birth.
    pub const fn born_at_tick(&self) -> u64 {
        self.born_at_tick
    }

    /// Orientation in radians.
    pub const fn orientation(&self) -> f64 {
        self.orientation
    }

    /// Unit heading derived from the orientation.
    pub const fn heading(&self) -> Vec2 {
        self.heading
    }

    /// Whether the agent is alive.
    pub const fn is_alive(&self) -> bool {
        self.alive
    }

    /// Why the agent died, once dead.
    pub const fn cause_of_death(&self) -> Option<DeathCause> {
        self.cause_of_death
    }

    /// Whether the agent has reached mating age.
    pub fn is_mature(&self, config: &BehaviorConfig) -> bool {
        self.age >= config.maturity_age
    }

    /// `max_energy - energy`.
    pub fn hunger(&self) -> f64 {
        self.phenotype.max_energy - self.energy
    }

    /// Point the agent in a new direction.
    pub fn set_orientation(&mut self, orientation: f64) {
        if orientation.is_finite() {
            self.orientation = normalize_angle(orientation);
            self.heading = Vec2::from_angle(self.orientation);
        }
    }

    /// Mark the agent dead. The first recorded cause wins.
    pub fn die(&mut self, cause: DeathCause) {
        if self.alive {
            self.alive = false;
            self.cause_of_death = Some(cause);
            debug!(agent = %self.id, species = %self.species, %cause, age = self.age, "agent died");
        }
    }

    /// A view of this agent for neighbour scans.
    pub const fn view(&self) -> NeighborView {
        NeighborView {
            id: self.id,
            species: self.species,
            sex: self.phenotype.sex,
            position: self.position,
            alive: self.alive,
        }
    }

    fn sight(&self) -> Sight {
        Sight {
            position: self.position,
            heading: self.heading,
            field_of_view: self.phenotype.field_of_view,
            view_distance: self.phenotype.view_distance,
        }
    }

    // -----------------------------------------------------------------------
    // State machine
    // -----------------------------------------------------------------------

    /// Pay metabolism, build desire, and pick the behavior state.
    ///
    /// Returns the cause of death if the agent starved this tick, in which
    /// case nothing else should run for it.
    pub fn update_state(&mut self, config: &BehaviorConfig) -> Option<DeathCause> {
        if !self.alive {
            return None;
        }

        self.energy -= self.phenotype.metabolism_rate;
        if self.energy <= 0.0 {
            self.energy = 0.0;
            self.die(DeathCause::Starvation);
            return Some(DeathCause::Starvation);
        }

        self.desire_to_mate = (self.desire_to_mate + self.phenotype.find_mate_rate)
            .min(self.phenotype.max_desire_to_mate)
            .max(0.0);

        let previous = self.state;
        let hunger = self.hunger();
        if hunger >= self.desire_to_mate && self.energy <= self.phenotype.max_energy / 2.0 {
            self.state = BehaviorState::Foraging;
            self.seeking_food = true;
        } else if !self.seeking_food && self.can_mate && self.is_mature(config) {
            self.state = BehaviorState::Mating;
        } else if !self.seeking_food && !self.can_mate {
            self.state = BehaviorState::Wandering;
            if self.is_mature(config) {
                if self.mate_cooldown >= config.mate_cooldown_ticks {
                    self.can_mate = true;
                    self.mate_cooldown = 0;
                } else {
                    self.mate_cooldown = self.mate_cooldown.saturating_add(1);
                }
            }
        }

        if previous != self.state {
            debug!(agent = %self.id, from = ?previous, to = ?self.state, "state transition");
        }
        None
    }

    // -----------------------------------------------------------------------
    // Actions
    // -----------------------------------------------------------------------

    /// Run the action for the current state.
    pub fn act(
        &mut self,
        neighbors: &[NeighborView],
        ctx: &mut ActContext<'_>,
        rng: &mut impl Rng,
    ) -> Result<ActOutcome, AgentError> {
        if !self.alive {
            return Ok(ActOutcome::default());
        }
        match (self.state, self.species) {
            (BehaviorState::Foraging, Species::Prey) => {
                self.graze(ctx, rng);
                Ok(ActOutcome::default())
            }
            (BehaviorState::Foraging, Species::Predator) => Ok(self.hunt(neighbors, ctx, rng)),
            (BehaviorState::Mating, _) => self.seek_mate(neighbors, ctx, rng),
            (BehaviorState::Fleeing | BehaviorState::Wandering, _) => {
                self.wander(ctx.config, ctx.dt, rng);
                Ok(ActOutcome::default())
            }
        }
    }

    /// Eat the occupied cell, or wander if it is bare.
    fn graze(&mut self, ctx: &mut ActContext<'_>, rng: &mut impl Rng) {
        let eaten = ctx.grid.deplete(self.position);
        if eaten > 0.0 {
            self.gain_energy(eaten / ctx.config.forage_divisor);
        } else {
            self.wander(ctx.config, ctx.dt, rng);
        }
    }

    /// Chase the nearest visible prey and eat it once in reach.
    fn hunt(
        &mut self,
        neighbors: &[NeighborView],
        ctx: &ActContext<'_>,
        rng: &mut impl Rng,
    ) -> ActOutcome {
        let own_id = self.id;
        let target = self
            .sight()
            .nearest(neighbors, |n| n.id != own_id && n.species == Species::Prey)
            .copied();

        let Some(prey) = target else {
            self.wander(ctx.config, ctx.dt, rng);
            return ActOutcome::default();
        };

        self.look_at(prey.position, ctx.dt);
        if self.position.distance(prey.position) <= ctx.config.catch_radius {
            self.gain_energy(ctx.config.kill_reward);
            debug!(predator = %self.id, prey = %prey.id, "prey caught");
            return ActOutcome {
                kill: Some(prey.id),
                mate_request: None,
            };
        }
        ActOutcome::default()
    }

    /// Approach the nearest visible mate; a male in contact sends a request.
    fn seek_mate(
        &mut self,
        neighbors: &[NeighborView],
        ctx: &ActContext<'_>,
        rng: &mut impl Rng,
    ) -> Result<ActOutcome, AgentError> {
        let own_id = self.id;
        let species = self.species;
        let wanted_sex = self.phenotype.sex.opposite();
        let candidate = self
            .sight()
            .nearest(neighbors, |n| {
                n.id != own_id && n.species == species && n.sex == wanted_sex
            })
            .copied();

        let Some(mate) = candidate else {
            self.wander(ctx.config, ctx.dt, rng);
            return Ok(ActOutcome::default());
        };

        self.look_at(mate.position, ctx.dt);
        let in_contact =
            self.position.distance(mate.position) <= ctx.config.mate_contact_radius;
        if !(in_contact && self.phenotype.sex == Sex::Male && self.can_mate) {
            return Ok(ActOutcome::default());
        }

        let litter = ctx.config.species(self.species).litter_size;
        let gametes = (0..litter)
            .map(|_| self.genome.form_gamete(&ctx.config.mutation, rng))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| AgentError::Genome {
                agent: self.id,
                source,
            })?;

        self.desire_to_mate = 0.0;
        self.can_mate = false;
        self.state = BehaviorState::Wandering;
        debug!(male = %self.id, female = %mate.id, litter, "mate request sent");

        Ok(ActOutcome {
            kill: None,
            mate_request: Some(MateRequest {
                from: self.id,
                to: mate.id,
                species: self.species,
                gametes,
            }),
        })
    }

    /// Steer toward the wander target, re-rolling it when the countdown
    /// runs out.
    pub fn wander(&mut self, config: &BehaviorConfig, dt: f64, rng: &mut impl Rng) {
        if self.wander_countdown == 0 {
            self.wander_target = random_wander_target(config, rng);
            self.wander_countdown = if config.wander_period_min < config.wander_period_max {
                rng.random_range(config.wander_period_min..config.wander_period_max)
            } else {
                config.wander_period_min
            };
        }
        self.look_at(self.wander_target, dt);
        self.wander_countdown = self.wander_countdown.saturating_sub(1);
    }

    /// Add energy up to the cap. Reaching the cap ends the food search.
    pub fn gain_energy(&mut self, amount: f64) {
        self.energy += amount.max(0.0);
        if self.energy >= self.phenotype.max_energy {
            self.energy = self.phenotype.max_energy;
            self.seeking_food = false;
        }
    }

    /// Turn toward `target` at the genetic turn speed.
    ///
    /// The turn direction is the sign of the cross product of the heading
    /// and the direction to the target; the turn amount is always
    /// `turn_speed * dt`, so the agent may overshoot and oscillate around
    /// the target bearing. No turn happens when the target is exactly
    /// ahead, exactly behind, or on top of the agent.
    pub fn look_at(&mut self, target: Vec2, dt: f64) {
        let Some(direction) = (target - self.position).normalized() else {
            return;
        };
        let cross = self.heading.cross(direction);
        let sign: f64 = if cross > 0.0 {
            1.0
        } else if cross < 0.0 {
            -1.0
        } else {
            0.0
        };
        self.set_orientation(sign.mul_add(self.phenotype.turn_speed * dt, self.orientation));
    }

    // -----------------------------------------------------------------------
    // Mating
    // -----------------------------------------------------------------------

    /// Answer a mate request.
    ///
    /// A mature, eligible female in the Mating state accepts: she forms one
    /// gamete per paternal gamete, and each pair becomes an offspring
    /// genome. Anything else silently declines with `Ok(None)`.
    pub fn receive_mate_request(
        &mut self,
        request: &MateRequest,
        config: &BehaviorConfig,
        rng: &mut impl Rng,
    ) -> Result<Option<Vec<Genome>>, AgentError> {
        let willing = self.alive
            && request.species == self.species
            && self.phenotype.sex == Sex::Female
            && self.is_mature(config)
            && self.can_mate
            && self.state == BehaviorState::Mating;
        if !willing {
            debug!(female = %self.id, male = %request.from, "mate request declined");
            return Ok(None);
        }

        let genomes = request
            .gametes
            .iter()
            .map(|paternal| {
                let maternal = self.genome.form_gamete(&config.mutation, rng)?;
                Genome::combine(paternal, &maternal)
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| AgentError::Genome {
                agent: self.id,
                source,
            })?;

        self.desire_to_mate = 0.0;
        self.can_mate = false;
        self.state = BehaviorState::Wandering;
        Ok(Some(genomes))
    }

    /// Spawn parameters for one offspring of this mother.
    ///
    /// Offspring appear at `(+1, +1)` from the mother, facing her way.
    pub fn offspring_spawn(
        &self,
        id: AgentId,
        genome: Genome,
        father: AgentId,
        father_generation: u32,
        tick: u64,
    ) -> AgentSpawn {
        AgentSpawn {
            id,
            species: self.species,
            genome,
            position: self.position + Vec2::new(1.0, 1.0),
            orientation: self.orientation,
            generation: self.generation.max(father_generation).saturating_add(1),
            parents: Some(Parents {
                father,
                mother: self.id,
            }),
            born_at_tick: tick,
        }
    }

    // -----------------------------------------------------------------------
    // Motion and aging
    // -----------------------------------------------------------------------

    /// Move along the heading and bounce off the field edges.
    ///
    /// Crossing the top or bottom margin mirrors the orientation vertically,
    /// crossing the left or right margin mirrors it horizontally. A bounce
    /// only happens while moving outward, re-rolls the wander target, and
    /// the position is clamped to the field.
    pub fn advance_motion(&mut self, config: &BehaviorConfig, dt: f64, rng: &mut impl Rng) {
        if !self.alive {
            return;
        }
        let velocity = self.heading * (self.phenotype.speed * dt);
        if !velocity.is_finite() {
            return;
        }
        self.position = self.position + velocity;

        let margin = config.boundary_margin;
        let (width, height) = (config.field_width, config.field_height);
        let mut bounced = false;

        let past_top = self.position.y <= margin && velocity.y < 0.0;
        let past_bottom = self.position.y >= height - margin && velocity.y > 0.0;
        if past_top || past_bottom {
            self.set_orientation(-self.orientation);
            bounced = true;
        }
        let past_left = self.position.x <= margin && velocity.x < 0.0;
        let past_right = self.position.x >= width - margin && velocity.x > 0.0;
        if past_left || past_right {
            self.set_orientation(PI - self.orientation);
            bounced = true;
        }
        if bounced {
            self.wander_target = random_wander_target(config, rng);
        }

        self.position = Vec2::new(
            self.position.x.clamp(0.0, width),
            self.position.y.clamp(0.0, height),
        );
    }

    /// Add one age step; reaching max age kills the agent.
    pub fn grow_older(&mut self, config: &BehaviorConfig) -> Option<DeathCause> {
        if !self.alive {
            return None;
        }
        self.age += config.age_step;
        if self.age >= self.max_age {
            self.die(DeathCause::OldAge);
            return Some(DeathCause::OldAge);
        }
        None
    }

    // -----------------------------------------------------------------------
    // Export
    // -----------------------------------------------------------------------

    /// Render-facing snapshot.
    pub const fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            id: self.id,
            species: self.species,
            position: self.position,
            orientation: self.orientation,
            color: self.phenotype.color,
            state: self.state,
            alive: self.alive,
        }
    }

    /// Detailed view for the driver's inspector.
    pub fn inspect(&self) -> AgentInspection {
        AgentInspection {
            snapshot: self.snapshot(),
            energy: self.energy,
            max_energy: self.phenotype.max_energy,
            desire_to_mate: self.desire_to_mate,
            max_desire_to_mate: self.phenotype.max_desire_to_mate,
            age: self.age,
            max_age: self.max_age,
            sex: self.phenotype.sex,
            can_mate: self.can_mate,
            generation: self.generation,
            cause_of_death: self.cause_of_death,
        }
    }
}

/// Wrap an angle into `[0, 2*PI)`.
fn normalize_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    if wrapped >= TAU { 0.0 } else { wrapped }
}

/// A random point inside the field margins.
fn random_wander_target(config: &BehaviorConfig, rng: &mut impl Rng) -> Vec2 {
    let x = random_coordinate(config.field_width, config.boundary_margin, rng);
    let y = random_coordinate(config.field_height, config.boundary_margin, rng);
    Vec2::new(x, y)
}

/// Uniform draw from `[margin, extent - margin)`, or the midpoint when the
/// field is too small for the margin.
pub fn random_coordinate(extent: f64, margin: f64, rng: &mut impl Rng) -> f64 {
    let high = extent - margin;
    if margin < high {
        rng.random_range(margin..high)
    } else {
        extent / 2.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use std::collections::BTreeMap;
    use std::f64::consts::FRAC_PI_2;

    use ecosim_types::Trait;
    use ecosim_world::GridParams;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;
    use crate::genome::AllelePair;

    const EPS: f64 = 1e-9;

    fn genome(sex: f64, tweak: impl Fn(&mut BTreeMap<Trait, f64>)) -> Genome {
        let mut values = BTreeMap::from([
            (Trait::Speed, 100.0),
            (Trait::TurnSpeed, 2.0),
            (Trait::FieldOfView, PI),
            (Trait::ViewDistance, 100.0),
            (Trait::MaxEnergy, 100.0),
            (Trait::MetabolismRate, 0.5),
            (Trait::FindMateRate, 1.0),
            (Trait::MaxDesireToMate, 50.0),
            (Trait::Sex, sex),
            (Trait::Red, 10.0),
            (Trait::Green, 20.0),
            (Trait::Blue, 30.0),
        ]);
        tweak(&mut values);
        Genome::homozygous(&values).unwrap()
    }

    fn spawn_at(id: u64, species: Species, sex: f64, position: Vec2) -> Agent {
        let mut rng = SmallRng::seed_from_u64(id);
        Agent::spawn(
            AgentSpawn {
                id: AgentId(id),
                species,
                genome: genome(sex, |_| {}),
                position,
                orientation: 0.0,
                generation: 0,
                parents: None,
                born_at_tick: 0,
            },
            &BehaviorConfig::default(),
            &mut rng,
        )
        .unwrap()
    }

    fn grid(level: f64) -> EnvironmentGrid {
        EnvironmentGrid::new(&GridParams {
            initial_level: level,
            ..GridParams::default()
        })
        .unwrap()
    }

    #[test]
    fn spawns_full_and_wandering() {
        let agent = spawn_at(1, Species::Prey, 0.0, Vec2::new(100.0, 100.0));
        assert!((agent.energy - 100.0).abs() < EPS);
        assert_eq!(agent.state, BehaviorState::Wandering);
        assert!(!agent.can_mate);
        assert!(agent.is_alive());
        assert!((900.0..1100.0).contains(&agent.max_age));
        assert_eq!(agent.sex(), Sex::Female);
    }

    #[test]
    fn spawn_rejects_bad_position() {
        let result = Agent::spawn(
            AgentSpawn {
                id: AgentId(1),
                species: Species::Prey,
                genome: genome(0.0, |_| {}),
                position: Vec2::new(f64::NAN, 0.0),
                orientation: 0.0,
                generation: 0,
                parents: None,
                born_at_tick: 0,
            },
            &BehaviorConfig::default(),
            &mut SmallRng::seed_from_u64(1),
        );
        assert!(matches!(result, Err(AgentError::InvalidSpawn { .. })));
    }

    #[test]
    fn starvation_clamps_energy_and_kills() {
        let config = BehaviorConfig::default();
        let mut agent = spawn_at(1, Species::Prey, 0.0, Vec2::new(100.0, 100.0));
        agent.energy = 0.3;
        assert_eq!(agent.update_state(&config), Some(DeathCause::Starvation));
        assert!(!agent.is_alive());
        assert!(agent.energy.abs() < EPS);
        assert_eq!(agent.cause_of_death(), Some(DeathCause::Starvation));
    }

    #[test]
    fn desire_is_capped() {
        let config = BehaviorConfig::default();
        let mut agent = spawn_at(1, Species::Prey, 0.0, Vec2::new(100.0, 100.0));
        agent.desire_to_mate = 49.5;
        agent.update_state(&config);
        assert!((agent.desire_to_mate - 50.0).abs() < EPS);
    }

    #[test]
    fn hunger_triggers_foraging() {
        let config = BehaviorConfig::default();
        let mut agent = spawn_at(1, Species::Prey, 0.0, Vec2::new(100.0, 100.0));
        agent.energy = 40.0;
        agent.update_state(&config);
        assert_eq!(agent.state, BehaviorState::Foraging);
        assert!(agent.seeking_food);
    }

    #[test]
    fn eligible_mature_agent_starts_mating() {
        let config = BehaviorConfig::default();
        let mut agent = spawn_at(1, Species::Prey, 0.0, Vec2::new(100.0, 100.0));
        agent.age = 250.0;
        agent.can_mate = true;
        agent.update_state(&config);
        assert_eq!(agent.state, BehaviorState::Mating);
    }

    #[test]
    fn cooldown_restores_eligibility() {
        let config = BehaviorConfig::default();
        let mut agent = spawn_at(1, Species::Prey, 0.0, Vec2::new(100.0, 100.0));
        agent.age = 250.0;
        agent.max_age = 10_000.0;
        for _ in 0..config.mate_cooldown_ticks {
            agent.energy = 100.0;
            agent.update_state(&config);
            assert!(!agent.can_mate);
        }
        agent.energy = 100.0;
        agent.update_state(&config);
        assert!(agent.can_mate);
        assert_eq!(agent.mate_cooldown, 0);
    }

    #[test]
    fn immature_agent_never_becomes_eligible() {
        let config = BehaviorConfig::default();
        let mut agent = spawn_at(1, Species::Prey, 0.0, Vec2::new(100.0, 100.0));
        for _ in 0..100 {
            agent.energy = 100.0;
            agent.update_state(&config);
        }
        assert!(!agent.can_mate);
        assert_eq!(agent.state, BehaviorState::Wandering);
    }

    #[test]
    fn grazing_empties_cell_and_gains_fifth() {
        let config = BehaviorConfig::default();
        let mut grid = grid(50.0);
        let mut rng = SmallRng::seed_from_u64(2);
        let mut agent = spawn_at(1, Species::Prey, 0.0, Vec2::new(30.0, 30.0));
        agent.energy = 40.0;
        agent.update_state(&config);
        let energy_before = agent.energy;
        let mut ctx = ActContext {
            grid: &mut grid,
            config: &config,
            dt: 0.025,
        };
        let outcome = agent.act(&[], &mut ctx, &mut rng).unwrap();
        assert!(outcome.kill.is_none());
        assert!((agent.energy - (energy_before + 10.0)).abs() < EPS);
        assert!(grid.level_at(Vec2::new(30.0, 30.0)).abs() < EPS);
    }

    #[test]
    fn grazing_to_full_clears_seeking_food() {
        let config = BehaviorConfig::default();
        let mut grid = grid(50.0);
        let mut rng = SmallRng::seed_from_u64(2);
        let mut agent = spawn_at(1, Species::Prey, 0.0, Vec2::new(30.0, 30.0));
        agent.state = BehaviorState::Foraging;
        agent.seeking_food = true;
        agent.energy = 95.0;
        let mut ctx = ActContext {
            grid: &mut grid,
            config: &config,
            dt: 0.025,
        };
        agent.act(&[], &mut ctx, &mut rng).unwrap();
        assert!((agent.energy - 100.0).abs() < EPS);
        assert!(!agent.seeking_food);
    }

    #[test]
    fn predator_catches_prey_in_reach() {
        let config = BehaviorConfig::default();
        let mut grid = grid(0.0);
        let mut rng = SmallRng::seed_from_u64(3);
        let mut predator = spawn_at(1, Species::Predator, 0.0, Vec2::new(100.0, 100.0));
        predator.state = BehaviorState::Foraging;
        predator.energy = 30.0;
        let prey = spawn_at(2, Species::Prey, 0.0, Vec2::new(120.0, 100.0));
        let mut ctx = ActContext {
            grid: &mut grid,
            config: &config,
            dt: 0.025,
        };
        let outcome = predator.act(&[prey.view()], &mut ctx, &mut rng).unwrap();
        assert_eq!(outcome.kill, Some(AgentId(2)));
        assert!((predator.energy - 100.0).abs() < EPS);
    }

    #[test]
    fn predator_ignores_prey_behind_it() {
        let config = BehaviorConfig::default();
        let mut grid = grid(0.0);
        let mut rng = SmallRng::seed_from_u64(3);
        let mut predator = spawn_at(1, Species::Predator, 0.0, Vec2::new(100.0, 100.0));
        predator.state = BehaviorState::Foraging;
        let prey = spawn_at(2, Species::Prey, 0.0, Vec2::new(70.0, 100.0));
        let mut ctx = ActContext {
            grid: &mut grid,
            config: &config,
            dt: 0.025,
        };
        let outcome = predator.act(&[prey.view()], &mut ctx, &mut rng).unwrap();
        assert!(outcome.kill.is_none());
    }

    #[test]
    fn male_in_contact_sends_litter_request() {
        let config = BehaviorConfig::default();
        let mut grid = grid(0.0);
        let mut rng = SmallRng::seed_from_u64(4);
        let mut male = spawn_at(1, Species::Prey, 1.0, Vec2::new(100.0, 100.0));
        male.state = BehaviorState::Mating;
        male.can_mate = true;
        male.age = 300.0;
        let female = spawn_at(2, Species::Prey, 0.0, Vec2::new(105.0, 100.0));
        let mut ctx = ActContext {
            grid: &mut grid,
            config: &config,
            dt: 0.025,
        };
        let outcome = male.act(&[female.view()], &mut ctx, &mut rng).unwrap();
        let request = outcome.mate_request.unwrap();
        assert_eq!(request.to, AgentId(2));
        assert_eq!(request.gametes.len(), 2);
        assert!(!male.can_mate);
        assert_eq!(male.state, BehaviorState::Wandering);
        assert!(male.desire_to_mate.abs() < EPS);
    }

    #[test]
    fn female_does_not_send_requests() {
        let config = BehaviorConfig::default();
        let mut grid = grid(0.0);
        let mut rng = SmallRng::seed_from_u64(4);
        let mut female = spawn_at(1, Species::Prey, 0.0, Vec2::new(100.0, 100.0));
        female.state = BehaviorState::Mating;
        female.can_mate = true;
        female.age = 300.0;
        let male = spawn_at(2, Species::Prey, 1.0, Vec2::new(105.0, 100.0));
        let mut ctx = ActContext {
            grid: &mut grid,
            config: &config,
            dt: 0.025,
        };
        let outcome = female.act(&[male.view()], &mut ctx, &mut rng).unwrap();
        assert!(outcome.mate_request.is_none());
        assert!(female.can_mate);
    }

    #[test]
    fn receptive_female_accepts_and_resets() {
        let config = BehaviorConfig::default();
        let mut rng = SmallRng::seed_from_u64(5);
        let male = spawn_at(1, Species::Predator, 1.0, Vec2::new(100.0, 100.0));
        let mut female = spawn_at(2, Species::Predator, 0.0, Vec2::new(105.0, 100.0));
        female.state = BehaviorState::Mating;
        female.can_mate = true;
        female.age = 300.0;
        female.desire_to_mate = 40.0;
        let request = MateRequest {
            from: male.id(),
            to: female.id(),
            species: Species::Predator,
            gametes: vec![male.genome().form_gamete(&config.mutation, &mut rng).unwrap()],
        };
        let genomes = female
            .receive_mate_request(&request, &config, &mut rng)
            .unwrap()
            .unwrap();
        assert_eq!(genomes.len(), 1);
        assert!(!female.can_mate);
        assert_eq!(female.state, BehaviorState::Wandering);
        assert!(female.desire_to_mate.abs() < EPS);
    }

    #[test]
    fn unreceptive_female_declines() {
        let config = BehaviorConfig::default();
        let mut rng = SmallRng::seed_from_u64(5);
        let male = spawn_at(1, Species::Prey, 1.0, Vec2::new(100.0, 100.0));
        let mut female = spawn_at(2, Species::Prey, 0.0, Vec2::new(105.0, 100.0));
        female.can_mate = true;
        female.age = 300.0;
        let request = MateRequest {
            from: male.id(),
            to: female.id(),
            species: Species::Prey,
            gametes: vec![male.genome().form_gamete(&config.mutation, &mut rng).unwrap()],
        };
        assert!(female
            .receive_mate_request(&request, &config, &mut rng)
            .unwrap()
            .is_none());
        assert!(female.can_mate);
    }

    #[test]
    fn offspring_spawn_is_adjacent_and_next_generation() {
        let mut mother = spawn_at(2, Species::Prey, 0.0, Vec2::new(50.0, 60.0));
        mother.set_orientation(1.0);
        let spawn = mother.offspring_spawn(AgentId(9), genome(0.0, |_| {}), AgentId(1), 3, 17);
        assert!((spawn.position.x - 51.0).abs() < EPS);
        assert!((spawn.position.y - 61.0).abs() < EPS);
        assert!((spawn.orientation - 1.0).abs() < EPS);
        assert_eq!(spawn.generation, 4);
        assert_eq!(
            spawn.parents,
            Some(Parents {
                father: AgentId(1),
                mother: AgentId(2)
            })
        );
        assert_eq!(spawn.born_at_tick, 17);
    }

    #[test]
    fn look_at_turns_toward_target() {
        let mut agent = spawn_at(1, Species::Prey, 0.0, Vec2::new(100.0, 100.0));
        agent.look_at(Vec2::new(100.0, 200.0), 0.1);
        assert!((agent.orientation() - 0.2).abs() < EPS);

        let mut agent = spawn_at(1, Species::Prey, 0.0, Vec2::new(100.0, 100.0));
        agent.look_at(Vec2::new(100.0, 0.0), 0.1);
        assert!((agent.orientation() - (TAU - 0.2)).abs() < EPS);
    }

    #[test]
    fn look_at_overshoots_by_a_full_turn_step() {
        let mut agent = spawn_at(1, Species::Prey, 0.0, Vec2::new(100.0, 100.0));
        agent.look_at(Vec2::new(300.0, 101.0), 1.0);
        assert!((agent.orientation() - 2.0).abs() < EPS);
        agent.look_at(Vec2::new(300.0, 101.0), 1.0);
        assert!(agent.orientation().abs() < EPS);
    }

    #[test]
    fn random_coordinate_respects_margins() {
        let mut rng = SmallRng::seed_from_u64(4);
        for _ in 0..200 {
            let x = random_coordinate(1300.0, 10.0, &mut rng);
            assert!((10.0..1290.0).contains(&x));
        }
        assert!((random_coordinate(10.0, 10.0, &mut rng) - 5.0).abs() < EPS);
    }

    #[test]
    fn look_at_straight_ahead_does_not_turn() {
        let mut agent = spawn_at(1, Species::Prey, 0.0, Vec2::new(100.0, 100.0));
        agent.look_at(Vec2::new(300.0, 100.0), 0.1);
        assert!(agent.orientation().abs() < EPS);
        agent.look_at(agent.position, 0.1);
        assert!(agent.orientation().abs() < EPS);
    }

    #[test]
    fn moves_along_heading() {
        let config = BehaviorConfig::default();
        let mut rng = SmallRng::seed_from_u64(6);
        let mut agent = spawn_at(1, Species::Prey, 0.0, Vec2::new(100.0, 100.0));
        agent.set_orientation(FRAC_PI_2);
        agent.advance_motion(&config, 0.1, &mut rng);
        assert!((agent.position.x - 100.0).abs() < 1e-6);
        assert!((agent.position.y - 110.0).abs() < 1e-6);
    }

    #[test]
    fn bounces_off_left_wall() {
        let config = BehaviorConfig::default();
        let mut rng = SmallRng::seed_from_u64(6);
        let mut agent = spawn_at(1, Species::Prey, 0.0, Vec2::new(12.0, 300.0));
        agent.set_orientation(PI);
        let target = agent.wander_target;
        agent.advance_motion(&config, 0.1, &mut rng);
        assert!(agent.orientation().abs() < 1e-9 || (agent.orientation() - TAU).abs() < 1e-9);
        assert!(agent.position.x >= 0.0);
        assert!(agent.wander_target != target);
    }

    #[test]
    fn bounces_off_bottom_wall() {
        let config = BehaviorConfig::default();
        let mut rng = SmallRng::seed_from_u64(6);
        let mut agent = spawn_at(1, Species::Prey, 0.0, Vec2::new(300.0, 585.0));
        agent.set_orientation(FRAC_PI_2);
        agent.advance_motion(&config, 0.1, &mut rng);
        assert!((agent.orientation() - (TAU - FRAC_PI_2)).abs() < 1e-9);
        assert!(agent.position.y <= 600.0);
    }

    #[test]
    fn inward_motion_near_wall_does_not_bounce() {
        let config = BehaviorConfig::default();
        let mut rng = SmallRng::seed_from_u64(6);
        let mut agent = spawn_at(1, Species::Prey, 0.0, Vec2::new(5.0, 300.0));
        agent.advance_motion(&config, 0.01, &mut rng);
        assert!(agent.orientation().abs() < EPS);
    }

    #[test]
    fn dies_of_old_age() {
        let config = BehaviorConfig::default();
        let mut agent = spawn_at(1, Species::Prey, 0.0, Vec2::new(100.0, 100.0));
        agent.age = agent.max_age - 0.05;
        assert_eq!(agent.grow_older(&config), Some(DeathCause::OldAge));
        assert!(!agent.is_alive());
        assert_eq!(agent.grow_older(&config), None);
    }

    #[test]
    fn wander_rerolls_target_on_expiry() {
        let config = BehaviorConfig::default();
        let mut rng = SmallRng::seed_from_u64(8);
        let mut agent = spawn_at(1, Species::Prey, 0.0, Vec2::new(100.0, 100.0));
        agent.wander(&config, 0.025, &mut rng);
        assert!(agent.wander_countdown >= 99 && agent.wander_countdown < 750);
        let target = agent.wander_target;
        assert!(target.x >= 10.0 && target.x < 1290.0);
        assert!(target.y >= 10.0 && target.y < 590.0);
        agent.wander(&config, 0.025, &mut rng);
        assert!(agent.wander_target == target);
    }

    #[test]
    fn snapshot_reflects_phenotype() {
        let agent = spawn_at(1, Species::Predator, 1.0, Vec2::new(1.0, 2.0));
        let snapshot = agent.snapshot();
        assert_eq!(snapshot.color.r, 10);
        assert_eq!(snapshot.species, Species::Predator);
        let inspection = agent.inspect();
        assert_eq!(inspection.sex, Sex::Male);
        assert_eq!(inspection.generation, 0);
    }

    #[test]
    fn heterozygous_pairs_express_mean() {
        let mut pairs: BTreeMap<Trait, AllelePair> = Trait::ALL
            .into_iter()
            .map(|t| (t, AllelePair::new(10.0, 30.0)))
            .collect();
        pairs.insert(Trait::Sex, AllelePair::new(0.0, 0.0));
        let genome = Genome::from_pairs(pairs).unwrap();
        let agent = Agent::spawn(
            AgentSpawn {
                id: AgentId(1),
                species: Species::Prey,
                genome,
                position: Vec2::new(10.0, 10.0),
                orientation: 0.0,
                generation: 0,
                parents: None,
                born_at_tick: 0,
            },
            &BehaviorConfig::default(),
            &mut SmallRng::seed_from_u64(1),
        )
        .unwrap();
        assert!((agent.energy - 20.0).abs() < EPS);
    }
}
