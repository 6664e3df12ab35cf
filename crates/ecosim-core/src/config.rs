//! Configuration loading and typed config structures for the Ecosim simulation.
//!
//! The canonical configuration lives in `ecosim-config.yaml` at the project
//! root. This module defines strongly-typed structs that mirror the YAML
//! structure, and provides a loader that reads the file and applies
//! environment overrides. Every field has a default, so a partial (or empty)
//! file yields the calibrated prototype world: a 52x24 grid of 25-unit
//! cells, 50 prey and 50 predators, and a fixed 0.025 time step.

use std::path::Path;

use ecosim_agents::{BehaviorConfig, GenomeRanges, MutationParams, SpeciesParams, TraitRange};
use ecosim_types::Species;
use ecosim_world::GridParams;
use serde::Deserialize;
use tracing::warn;

/// Environment variable overriding [`WorldConfig::seed`].
pub const SEED_ENV: &str = "ECOSIM_SEED";

/// Environment variable overriding [`SimulationBoundsConfig::max_ticks`].
pub const MAX_TICKS_ENV: &str = "ECOSIM_MAX_TICKS";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The configuration parsed but describes a world that cannot run.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
///
/// Mirrors the structure of `ecosim-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// World-level settings (name, seed, timing).
    #[serde(default)]
    pub world: WorldConfig,

    /// Resource grid settings.
    #[serde(default)]
    pub environment: EnvironmentConfig,

    /// Seed population and population cap.
    #[serde(default)]
    pub population: PopulationConfig,

    /// Per-species genome range overrides and litter sizes.
    #[serde(default)]
    pub species: SpeciesTable,

    /// Behavior tuning shared by both species.
    #[serde(default)]
    pub behavior: BehaviorSettings,

    /// Simulation bounds.
    #[serde(default)]
    pub simulation: SimulationBoundsConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file, then apply environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the YAML is malformed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yml::from_str(&contents)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string. Environment overrides are
    /// not applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        Ok(config)
    }

    /// Override the seed and tick bound from `ECOSIM_SEED` and
    /// `ECOSIM_MAX_TICKS` when set.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup. Values that do not
    /// parse are ignored with a warning.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(SEED_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(seed) => self.world.seed = seed,
                Err(e) => warn!(var = SEED_ENV, value = %raw, error = %e, "ignoring override"),
            }
        }
        if let Some(raw) = lookup(MAX_TICKS_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(max_ticks) => self.simulation.max_ticks = max_ticks,
                Err(e) => {
                    warn!(var = MAX_TICKS_ENV, value = %raw, error = %e, "ignoring override");
                }
            }
        }
    }

    /// Field width in world units, spanned by the resource grid.
    pub fn field_width(&self) -> f64 {
        f64::from(self.environment.columns) * self.environment.cell_size
    }

    /// Field height in world units, spanned by the resource grid.
    pub fn field_height(&self) -> f64 {
        f64::from(self.environment.rows) * self.environment.cell_size
    }

    /// Resource grid parameters.
    pub const fn grid_params(&self) -> GridParams {
        GridParams {
            columns: self.environment.columns,
            rows: self.environment.rows,
            cell_size: self.environment.cell_size,
            max_resource: self.environment.max_resource,
            growth_rate: self.environment.growth_rate,
            initial_level: self.environment.initial_level,
        }
    }

    /// The behavior table handed to the agents crate.
    pub fn behavior_config(&self) -> BehaviorConfig {
        let b = &self.behavior;
        BehaviorConfig {
            field_width: self.field_width(),
            field_height: self.field_height(),
            boundary_margin: b.boundary_margin,
            maturity_age: b.maturity_age,
            age_step: b.age_step,
            max_age_min: b.max_age_min,
            max_age_max: b.max_age_max,
            mate_cooldown_ticks: b.mate_cooldown_ticks,
            wander_period_min: b.wander_period_min,
            wander_period_max: b.wander_period_max,
            catch_radius: b.catch_radius,
            kill_reward: b.kill_reward,
            mate_contact_radius: b.mate_contact_radius,
            forage_divisor: b.forage_divisor,
            mutation: MutationParams {
                chance: b.mutation_chance,
                spread: b.mutation_spread,
                color_spread: b.color_mutation_spread,
            },
            prey: self.species.prey.params(Species::Prey),
            predator: self.species.predator.params(Species::Predator),
        }
    }

    /// Reject configurations the simulation cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::Invalid { reason };

        if !(self.world.dt.is_finite() && self.world.dt > 0.0) {
            return Err(invalid(format!(
                "world.dt must be finite and positive, got {}",
                self.world.dt
            )));
        }
        if self.environment.columns == 0 || self.environment.rows == 0 {
            return Err(invalid("environment grid must have at least one cell".to_owned()));
        }
        if !(self.environment.cell_size.is_finite() && self.environment.cell_size > 0.0) {
            return Err(invalid("environment.cell_size must be positive".to_owned()));
        }
        self.behavior_config()
            .validate()
            .map_err(|e| invalid(e.to_string()))
    }
}

/// World-level configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WorldConfig {
    /// Human-readable simulation name.
    #[serde(default = "default_world_name")]
    pub name: String,

    /// Random seed for reproducibility.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Real-time milliseconds between ticks.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Simulated time advanced per tick.
    #[serde(default = "default_dt")]
    pub dt: f64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            name: default_world_name(),
            seed: default_seed(),
            tick_interval_ms: default_tick_interval_ms(),
            dt: default_dt(),
        }
    }
}

/// Resource grid configuration. The grid also defines the field extent.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EnvironmentConfig {
    /// Number of grid columns.
    #[serde(default = "default_columns")]
    pub columns: u32,

    /// Number of grid rows.
    #[serde(default = "default_rows")]
    pub rows: u32,

    /// Edge length of a cell in world units.
    #[serde(default = "default_cell_size")]
    pub cell_size: f64,

    /// Maximum resource level of a cell.
    #[serde(default = "default_max_resource")]
    pub max_resource: f64,

    /// Regrowth per unit of simulated time.
    #[serde(default = "default_growth_rate")]
    pub growth_rate: f64,

    /// Level every cell starts at.
    #[serde(default = "default_max_resource")]
    pub initial_level: f64,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            columns: default_columns(),
            rows: default_rows(),
            cell_size: default_cell_size(),
            max_resource: default_max_resource(),
            growth_rate: default_growth_rate(),
            initial_level: default_max_resource(),
        }
    }
}

/// Seed population configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PopulationConfig {
    /// Number of prey spawned at startup.
    #[serde(default = "default_initial_prey")]
    pub initial_prey: u32,

    /// Number of predators spawned at startup.
    #[serde(default = "default_initial_predators")]
    pub initial_predators: u32,

    /// Hard cap on live agents; births beyond it are dropped (0 = unlimited).
    #[serde(default = "default_max_population")]
    pub max_population: u32,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            initial_prey: default_initial_prey(),
            initial_predators: default_initial_predators(),
            max_population: default_max_population(),
        }
    }
}

impl PopulationConfig {
    /// The seed count for one species.
    pub const fn initial(&self, species: Species) -> u32 {
        match species {
            Species::Prey => self.initial_prey,
            Species::Predator => self.initial_predators,
        }
    }
}

/// A `[min, max)` range as written in YAML.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RangeConfig {
    /// Inclusive lower bound.
    pub min: f64,
    /// Exclusive upper bound.
    pub max: f64,
}

impl From<RangeConfig> for TraitRange {
    fn from(range: RangeConfig) -> Self {
        Self::new(range.min, range.max)
    }
}

/// Per-species overrides. Anything left out keeps the species default.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SpeciesConfig {
    /// Offspring per accepted mating.
    #[serde(default)]
    pub litter_size: Option<u32>,
    /// Seed range for forward speed.
    #[serde(default)]
    pub speed: Option<RangeConfig>,
    /// Seed range for turn speed (radians per second).
    #[serde(default)]
    pub turn_speed: Option<RangeConfig>,
    /// Seed range for the field-of-view angle (radians).
    #[serde(default)]
    pub field_of_view: Option<RangeConfig>,
    /// Seed range for sensing distance.
    #[serde(default)]
    pub view_distance: Option<RangeConfig>,
    /// Seed range for energy capacity.
    #[serde(default)]
    pub max_energy: Option<RangeConfig>,
    /// Seed range for metabolism per tick.
    #[serde(default)]
    pub metabolism_rate: Option<RangeConfig>,
    /// Seed range for desire gained per tick.
    #[serde(default)]
    pub find_mate_rate: Option<RangeConfig>,
    /// Seed range for the desire cap.
    #[serde(default)]
    pub max_desire_to_mate: Option<RangeConfig>,
}

impl SpeciesConfig {
    /// Merge the overrides onto the species defaults.
    pub fn params(&self, species: Species) -> SpeciesParams {
        let (mut genome, default_litter) = match species {
            Species::Prey => (GenomeRanges::prey(), default_prey_litter()),
            Species::Predator => (GenomeRanges::predator(), default_predator_litter()),
        };
        let overrides = [
            (&mut genome.speed, self.speed),
            (&mut genome.turn_speed, self.turn_speed),
            (&mut genome.field_of_view, self.field_of_view),
            (&mut genome.view_distance, self.view_distance),
            (&mut genome.max_energy, self.max_energy),
            (&mut genome.metabolism_rate, self.metabolism_rate),
            (&mut genome.find_mate_rate, self.find_mate_rate),
            (&mut genome.max_desire_to_mate, self.max_desire_to_mate),
        ];
        for (slot, value) in overrides {
            if let Some(range) = value {
                *slot = range.into();
            }
        }
        SpeciesParams {
            litter_size: self.litter_size.unwrap_or(default_litter),
            genome,
        }
    }
}

/// Overrides for both species.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SpeciesTable {
    /// Herbivore overrides.
    #[serde(default)]
    pub prey: SpeciesConfig,
    /// Carnivore overrides.
    #[serde(default)]
    pub predator: SpeciesConfig,
}

/// Behavior tuning shared by both species.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BehaviorSettings {
    /// Distance from the field edge at which agents bounce.
    #[serde(default = "default_boundary_margin")]
    pub boundary_margin: f64,

    /// Age at which agents may mate.
    #[serde(default = "default_maturity_age")]
    pub maturity_age: f64,

    /// Age added per tick.
    #[serde(default = "default_age_step")]
    pub age_step: f64,

    /// Lower bound of the random lifespan.
    #[serde(default = "default_max_age_min")]
    pub max_age_min: f64,

    /// Exclusive upper bound of the random lifespan.
    #[serde(default = "default_max_age_max")]
    pub max_age_max: f64,

    /// Wander ticks before mate eligibility returns.
    #[serde(default = "default_mate_cooldown_ticks")]
    pub mate_cooldown_ticks: u32,

    /// Shortest wander target period in ticks.
    #[serde(default = "default_wander_period_min")]
    pub wander_period_min: u32,

    /// Exclusive upper bound of the wander target period.
    #[serde(default = "default_wander_period_max")]
    pub wander_period_max: u32,

    /// Distance at which a predator catches prey.
    #[serde(default = "default_catch_radius")]
    pub catch_radius: f64,

    /// Energy a predator gains per kill.
    #[serde(default = "default_kill_reward")]
    pub kill_reward: f64,

    /// Distance at which a mate request can be sent.
    #[serde(default = "default_mate_contact_radius")]
    pub mate_contact_radius: f64,

    /// Grazed resource is divided by this to get energy.
    #[serde(default = "default_forage_divisor")]
    pub forage_divisor: f64,

    /// Probability that one trait of a gamete mutates.
    #[serde(default = "default_mutation_chance")]
    pub mutation_chance: f64,

    /// Half-width of the noise added to a mutated continuous trait.
    #[serde(default = "default_mutation_spread")]
    pub mutation_spread: f64,

    /// Half-width of the integer noise added to a mutated color channel.
    #[serde(default = "default_color_mutation_spread")]
    pub color_mutation_spread: i32,
}

impl Default for BehaviorSettings {
    fn default() -> Self {
        Self {
            boundary_margin: default_boundary_margin(),
            maturity_age: default_maturity_age(),
            age_step: default_age_step(),
            max_age_min: default_max_age_min(),
            max_age_max: default_max_age_max(),
            mate_cooldown_ticks: default_mate_cooldown_ticks(),
            wander_period_min: default_wander_period_min(),
            wander_period_max: default_wander_period_max(),
            catch_radius: default_catch_radius(),
            kill_reward: default_kill_reward(),
            mate_contact_radius: default_mate_contact_radius(),
            forage_divisor: default_forage_divisor(),
            mutation_chance: default_mutation_chance(),
            mutation_spread: default_mutation_spread(),
            color_mutation_spread: default_color_mutation_spread(),
        }
    }
}

/// Simulation bounds. A value of 0 for either bound means unlimited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SimulationBoundsConfig {
    /// Stop after this many ticks.
    #[serde(default)]
    pub max_ticks: u64,

    /// Stop after this many wall-clock seconds.
    #[serde(default)]
    pub max_real_time_seconds: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level used when `RUST_LOG` is unset (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON log lines instead of the human-readable format.
    #[serde(default)]
    pub json: bool,

    /// Log population statistics every N ticks (0 = never).
    #[serde(default = "default_stats_interval_ticks")]
    pub stats_interval_ticks: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            stats_interval_ticks: default_stats_interval_ticks(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

fn default_world_name() -> String {
    "Meadow".to_owned()
}

const fn default_seed() -> u64 {
    42
}

const fn default_tick_interval_ms() -> u64 {
    25
}

const fn default_dt() -> f64 {
    0.025
}

const fn default_columns() -> u32 {
    52
}

const fn default_rows() -> u32 {
    24
}

const fn default_cell_size() -> f64 {
    25.0
}

const fn default_max_resource() -> f64 {
    50.0
}

const fn default_growth_rate() -> f64 {
    2.0
}

const fn default_initial_prey() -> u32 {
    50
}

const fn default_initial_predators() -> u32 {
    50
}

const fn default_max_population() -> u32 {
    2000
}

const fn default_prey_litter() -> u32 {
    2
}

const fn default_predator_litter() -> u32 {
    1
}

const fn default_boundary_margin() -> f64 {
    10.0
}

const fn default_maturity_age() -> f64 {
    200.0
}

const fn default_age_step() -> f64 {
    0.1
}

const fn default_max_age_min() -> f64 {
    900.0
}

const fn default_max_age_max() -> f64 {
    1100.0
}

const fn default_mate_cooldown_ticks() -> u32 {
    30
}

const fn default_wander_period_min() -> u32 {
    100
}

const fn default_wander_period_max() -> u32 {
    750
}

const fn default_catch_radius() -> f64 {
    40.0
}

const fn default_kill_reward() -> f64 {
    200.0
}

const fn default_mate_contact_radius() -> f64 {
    10.0
}

const fn default_forage_divisor() -> f64 {
    5.0
}

const fn default_mutation_chance() -> f64 {
    0.2
}

const fn default_mutation_spread() -> f64 {
    2.0
}

const fn default_color_mutation_spread() -> i32 {
    10
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_stats_interval_ticks() -> u64 {
    100
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SimulationConfig::default();
        assert_eq!(config.world.seed, 42);
        assert_eq!(config.population.initial_prey, 50);
        assert_eq!(config.population.initial_predators, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn defaults_match_agent_defaults() {
        let config = SimulationConfig::default();
        assert_eq!(config.behavior_config(), BehaviorConfig::default());
        assert_eq!(config.grid_params(), GridParams::default());
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r"
world:
  name: Test Meadow
  seed: 123
  tick_interval_ms: 10
  dt: 0.05

environment:
  columns: 10
  rows: 8
  cell_size: 20.0
  max_resource: 30.0
  growth_rate: 1.5
  initial_level: 5.0

population:
  initial_prey: 12
  initial_predators: 3
  max_population: 500

species:
  prey:
    litter_size: 3
    speed: { min: 40.0, max: 60.0 }
  predator:
    view_distance: { min: 100.0, max: 120.0 }

behavior:
  maturity_age: 50.0
  catch_radius: 25.0
  mutation_chance: 0.1

simulation:
  max_ticks: 1000
  max_real_time_seconds: 60

logging:
  level: debug
  json: true
  stats_interval_ticks: 10
";
        let config = SimulationConfig::parse(yaml).unwrap_or_default();
        assert_eq!(config.world.name, "Test Meadow");
        assert_eq!(config.world.seed, 123);
        assert_eq!(config.environment.columns, 10);
        assert_eq!(config.population.max_population, 500);
        assert_eq!(config.simulation.max_ticks, 1000);
        assert!(config.logging.json);

        let behavior = config.behavior_config();
        assert!((behavior.field_width - 200.0).abs() < f64::EPSILON);
        assert!((behavior.field_height - 160.0).abs() < f64::EPSILON);
        assert!((behavior.maturity_age - 50.0).abs() < f64::EPSILON);
        assert!((behavior.catch_radius - 25.0).abs() < f64::EPSILON);
        assert!((behavior.mutation.chance - 0.1).abs() < f64::EPSILON);
        assert_eq!(behavior.prey.litter_size, 3);
        assert_eq!(behavior.prey.genome.speed, TraitRange::new(40.0, 60.0));
        assert_eq!(behavior.predator.litter_size, 1);
        assert_eq!(
            behavior.predator.genome.view_distance,
            TraitRange::new(100.0, 120.0)
        );
        assert_eq!(
            behavior.predator.genome.speed,
            GenomeRanges::predator().speed
        );
    }

    #[test]
    fn parse_minimal_yaml() {
        let yaml = "world:\n  seed: 7\n";
        let config = SimulationConfig::parse(yaml);
        assert!(config.is_ok());
        let config = config.ok().unwrap_or_default();

        // Seed is overridden
        assert_eq!(config.world.seed, 7);
        // Everything else uses defaults
        assert_eq!(config.environment.columns, 52);
        assert_eq!(config.population.initial_predators, 50);
    }

    #[test]
    fn parse_empty_yaml() {
        let config = SimulationConfig::parse("");
        assert!(config.is_ok());
    }

    #[test]
    fn malformed_yaml_is_rejected() {
        let config = SimulationConfig::parse("world: [unclosed");
        assert!(matches!(config, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn overrides_replace_seed_and_tick_bound() {
        let vars: BTreeMap<&str, &str> =
            BTreeMap::from([(SEED_ENV, "99"), (MAX_TICKS_ENV, " 250 ")]);
        let mut config = SimulationConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| (*v).to_owned()));
        assert_eq!(config.world.seed, 99);
        assert_eq!(config.simulation.max_ticks, 250);
    }

    #[test]
    fn unparsable_overrides_are_ignored() {
        let mut config = SimulationConfig::default();
        config.apply_overrides(|key| (key == SEED_ENV).then(|| "not-a-number".to_owned()));
        assert_eq!(config.world.seed, 42);
    }

    #[test]
    fn invalid_dt_is_rejected() {
        let mut config = SimulationConfig::default();
        config.world.dt = -0.1;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
        config.world.dt = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn invalid_behavior_is_rejected() {
        let mut config = SimulationConfig::default();
        config.species.prey.litter_size = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("ecosim-config.yaml");
        if path.exists() {
            let config = SimulationConfig::from_file(&path);
            assert!(config.is_ok(), "Failed to load project config: {config:?}");
        }
    }
}
