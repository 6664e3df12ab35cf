//! Tunable parameters for agent behavior and genome generation.
//!
//! The simulation core builds a [`BehaviorConfig`] from `ecosim-config.yaml`
//! at startup and passes it into every state transition and action. The
//! defaults reproduce the prototype the model was calibrated on: a
//! 1300x600 field, maturity at age 200, a 30-tick mating cooldown, a
//! 40-unit catch radius and a 200-energy kill reward.

use std::f64::consts::{FRAC_PI_2, TAU};

use ecosim_types::{Species, Trait};

use crate::error::{AgentError, GenomeError};

/// Half-open uniform range `[min, max)` for drawing a seed allele.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraitRange {
    /// Inclusive lower bound.
    pub min: f64,
    /// Exclusive upper bound.
    pub max: f64,
}

impl TraitRange {
    /// Create a range.
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Check the range is finite and non-empty.
    pub fn validate(&self, trait_key: Trait) -> Result<(), GenomeError> {
        if self.min.is_finite() && self.max.is_finite() && self.min < self.max {
            Ok(())
        } else {
            Err(GenomeError::InvalidRange {
                trait_key,
                min: self.min,
                max: self.max,
            })
        }
    }
}

/// Ranges for the continuous traits of a seed genome.
///
/// Sex and color are not configurable: the paternal sex allele is drawn
/// from {0, 1}, the maternal allele is 0, and each color allele is drawn
/// from 0..=255.
#[derive(Debug, Clone, PartialEq)]
pub struct GenomeRanges {
    /// Forward speed.
    pub speed: TraitRange,
    /// Turn rate in radians per second.
    pub turn_speed: TraitRange,
    /// Full field-of-view angle in radians.
    pub field_of_view: TraitRange,
    /// Sensing range.
    pub view_distance: TraitRange,
    /// Energy capacity.
    pub max_energy: TraitRange,
    /// Energy spent per tick.
    pub metabolism_rate: TraitRange,
    /// Desire gained per tick.
    pub find_mate_rate: TraitRange,
    /// Desire cap.
    pub max_desire_to_mate: TraitRange,
}

impl GenomeRanges {
    /// Prototype ranges for herbivores.
    pub const fn prey() -> Self {
        Self {
            speed: TraitRange::new(50.0, 150.0),
            turn_speed: TraitRange::new(0.0, TAU),
            ..Self::shared()
        }
    }

    /// Prototype ranges for carnivores.
    pub const fn predator() -> Self {
        Self {
            speed: TraitRange::new(80.0, 200.0),
            turn_speed: TraitRange::new(FRAC_PI_2, TAU),
            ..Self::shared()
        }
    }

    const fn shared() -> Self {
        Self {
            speed: TraitRange::new(50.0, 150.0),
            turn_speed: TraitRange::new(0.0, TAU),
            field_of_view: TraitRange::new(0.0, TAU),
            view_distance: TraitRange::new(60.0, 250.0),
            max_energy: TraitRange::new(75.0, 250.0),
            metabolism_rate: TraitRange::new(0.01, 0.5),
            find_mate_rate: TraitRange::new(0.1, 5.0),
            max_desire_to_mate: TraitRange::new(40.0, 75.0),
        }
    }

    /// The range for one continuous trait, `None` for sex and color.
    pub const fn range_for(&self, trait_key: Trait) -> Option<TraitRange> {
        match trait_key {
            Trait::Speed => Some(self.speed),
            Trait::TurnSpeed => Some(self.turn_speed),
            Trait::FieldOfView => Some(self.field_of_view),
            Trait::ViewDistance => Some(self.view_distance),
            Trait::MaxEnergy => Some(self.max_energy),
            Trait::MetabolismRate => Some(self.metabolism_rate),
            Trait::FindMateRate => Some(self.find_mate_rate),
            Trait::MaxDesireToMate => Some(self.max_desire_to_mate),
            Trait::Sex | Trait::Red | Trait::Green | Trait::Blue => None,
        }
    }

    /// Validate every range.
    pub fn validate(&self) -> Result<(), GenomeError> {
        for trait_key in Trait::CONTINUOUS {
            if let Some(range) = self.range_for(trait_key) {
                range.validate(trait_key)?;
            }
        }
        Ok(())
    }
}

/// Mutation parameters applied when forming a gamete.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MutationParams {
    /// Probability that one trait of a gamete mutates (default: 0.2).
    pub chance: f64,
    /// Half-width of the uniform noise added to continuous traits (default: 2).
    pub spread: f64,
    /// Half-width of the integer noise added to color channels (default: 10).
    pub color_spread: i32,
}

impl Default for MutationParams {
    fn default() -> Self {
        Self {
            chance: 0.2,
            spread: 2.0,
            color_spread: 10,
        }
    }
}

/// Per-species behavior table.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesParams {
    /// Offspring per accepted mating.
    pub litter_size: u32,
    /// Ranges for seed genomes.
    pub genome: GenomeRanges,
}

/// Everything the state machine and actions need besides the agent itself.
#[derive(Debug, Clone, PartialEq)]
pub struct BehaviorConfig {
    /// Field width in world units.
    pub field_width: f64,
    /// Field height in world units.
    pub field_height: f64,
    /// Distance from the field edge at which agents bounce (default: 10).
    pub boundary_margin: f64,
    /// Age at which agents may mate (default: 200).
    pub maturity_age: f64,
    /// Age added per tick (default: 0.1).
    pub age_step: f64,
    /// Lower bound of the random max age (default: 900).
    pub max_age_min: f64,
    /// Exclusive upper bound of the random max age (default: 1100).
    pub max_age_max: f64,
    /// Wander ticks before mate eligibility returns (default: 30).
    pub mate_cooldown_ticks: u32,
    /// Shortest wander target period in ticks (default: 100).
    pub wander_period_min: u32,
    /// Exclusive upper bound of the wander target period (default: 750).
    pub wander_period_max: u32,
    /// Distance at which a predator catches prey (default: 40).
    pub catch_radius: f64,
    /// Energy a predator gains per kill (default: 200).
    pub kill_reward: f64,
    /// Distance at which a mate request can be sent (default: 10).
    pub mate_contact_radius: f64,
    /// Grazed resource is divided by this to get energy (default: 5).
    pub forage_divisor: f64,
    /// Gamete mutation settings.
    pub mutation: MutationParams,
    /// Herbivore table.
    pub prey: SpeciesParams,
    /// Carnivore table.
    pub predator: SpeciesParams,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            field_width: 1300.0,
            field_height: 600.0,
            boundary_margin: 10.0,
            maturity_age: 200.0,
            age_step: 0.1,
            max_age_min: 900.0,
            max_age_max: 1100.0,
            mate_cooldown_ticks: 30,
            wander_period_min: 100,
            wander_period_max: 750,
            catch_radius: 40.0,
            kill_reward: 200.0,
            mate_contact_radius: 10.0,
            forage_divisor: 5.0,
            mutation: MutationParams::default(),
            prey: SpeciesParams {
                litter_size: 2,
                genome: GenomeRanges::prey(),
            },
            predator: SpeciesParams {
                litter_size: 1,
                genome: GenomeRanges::predator(),
            },
        }
    }
}

impl BehaviorConfig {
    /// The behavior table for one species.
    pub const fn species(&self, species: Species) -> &SpeciesParams {
        match species {
            Species::Prey => &self.prey,
            Species::Predator => &self.predator,
        }
    }

    /// Reject configurations the behaviors cannot run with.
    pub fn validate(&self) -> Result<(), AgentError> {
        let invalid = |reason: &str| AgentError::InvalidConfig {
            reason: reason.to_owned(),
        };

        let margin = self.boundary_margin;
        if !margin.is_finite()
            || margin < 0.0
            || !self.field_width.is_finite()
            || !self.field_height.is_finite()
            || self.field_width <= margin * 2.0
            || self.field_height <= margin * 2.0
        {
            return Err(invalid("field must be larger than twice the boundary margin"));
        }
        if !(self.max_age_min.is_finite()
            && self.max_age_max.is_finite()
            && self.max_age_min < self.max_age_max)
        {
            return Err(invalid("max age range must be non-empty"));
        }
        if self.wander_period_min == 0 || self.wander_period_min >= self.wander_period_max {
            return Err(invalid("wander period range must be non-empty and positive"));
        }
        if !(self.forage_divisor.is_finite() && self.forage_divisor > 0.0) {
            return Err(invalid("forage divisor must be positive"));
        }
        if !(0.0..=1.0).contains(&self.mutation.chance) {
            return Err(invalid("mutation chance must be within [0, 1]"));
        }
        if !(self.mutation.spread.is_finite() && self.mutation.spread >= 0.0)
            || self.mutation.color_spread < 0
        {
            return Err(invalid("mutation spread must be non-negative"));
        }
        for species in Species::ALL {
            let params = self.species(species);
            if params.litter_size == 0 {
                return Err(invalid("litter size must be at least 1"));
            }
            params
                .genome
                .validate()
                .map_err(|e| invalid(&e.to_string()))?;
        }
        Ok(())
    }
}
