//! Enumeration types for the Ecosim simulation.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Species
// ---------------------------------------------------------------------------

/// The species tag carried by every agent.
///
/// Species share the same drives and state machine; they differ in what
/// they eat, which neighbors they react to, and how many offspring a
/// successful mating produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Species {
    /// Herbivore that grazes the resource grid.
    Prey,
    /// Carnivore that hunts prey.
    Predator,
}

impl Species {
    /// Every species, in a stable order.
    pub const ALL: [Self; 2] = [Self::Prey, Self::Predator];
}

impl core::fmt::Display for Species {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Prey => write!(f, "prey"),
            Self::Predator => write!(f, "predator"),
        }
    }
}

// ---------------------------------------------------------------------------
// Behavior state
// ---------------------------------------------------------------------------

/// The behavior state an agent acts out each tick.
///
/// `Foraging` means grazing for prey and hunting for predators.
/// `Fleeing` exists for prey only and is never entered by the current
/// transition rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum BehaviorState {
    /// Looking for food: grazing (prey) or hunting (predator).
    Foraging,
    /// Looking for a mate of the opposite sex.
    Mating,
    /// Running from a predator. Reserved.
    Fleeing,
    /// Drifting toward a random point.
    Wandering,
}

impl BehaviorState {
    /// Legacy numeric state tag (0 = foraging, 1 = mating, 2 = fleeing,
    /// 3 = wandering).
    pub const fn legacy_code(self) -> u8 {
        match self {
            Self::Foraging => 0,
            Self::Mating => 1,
            Self::Fleeing => 2,
            Self::Wandering => 3,
        }
    }
}

// ---------------------------------------------------------------------------
// Sex
// ---------------------------------------------------------------------------

/// Binary sex derived from the mean of the sex allele pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Sex {
    /// Mean of the sex alleles is zero.
    Female,
    /// Mean of the sex alleles is nonzero.
    Male,
}

impl Sex {
    /// Return the other sex.
    pub const fn opposite(self) -> Self {
        match self {
            Self::Female => Self::Male,
            Self::Male => Self::Female,
        }
    }
}

// ---------------------------------------------------------------------------
// Heritable traits
// ---------------------------------------------------------------------------

/// A heritable trait stored as a diploid allele pair in every genome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "kebab-case")]
pub enum Trait {
    /// Forward speed in world units per second.
    Speed,
    /// Maximum turn rate in radians per second.
    TurnSpeed,
    /// Full field-of-view angle in radians.
    FieldOfView,
    /// Sensing range in world units.
    ViewDistance,
    /// Energy capacity.
    MaxEnergy,
    /// Energy spent per tick.
    MetabolismRate,
    /// Desire-to-mate gained per tick.
    FindMateRate,
    /// Cap on desire-to-mate.
    MaxDesireToMate,
    /// Sex determinant (0 or 1 per allele).
    Sex,
    /// Red color channel (0--255).
    Red,
    /// Green color channel (0--255).
    Green,
    /// Blue color channel (0--255).
    Blue,
}

impl Trait {
    /// Every trait, in a stable order.
    pub const ALL: [Self; 12] = [
        Self::Speed,
        Self::TurnSpeed,
        Self::FieldOfView,
        Self::ViewDistance,
        Self::MaxEnergy,
        Self::MetabolismRate,
        Self::FindMateRate,
        Self::MaxDesireToMate,
        Self::Sex,
        Self::Red,
        Self::Green,
        Self::Blue,
    ];

    /// Continuous traits averaged in population statistics.
    pub const CONTINUOUS: [Self; 8] = [
        Self::Speed,
        Self::TurnSpeed,
        Self::FieldOfView,
        Self::ViewDistance,
        Self::MaxEnergy,
        Self::MetabolismRate,
        Self::FindMateRate,
        Self::MaxDesireToMate,
    ];

    /// The trait's key as used in configuration files and exports.
    pub const fn key(self) -> &'static str {
        match self {
            Self::Speed => "speed",
            Self::TurnSpeed => "turn-speed",
            Self::FieldOfView => "field-of-view",
            Self::ViewDistance => "view-distance",
            Self::MaxEnergy => "max-energy",
            Self::MetabolismRate => "metabolism-rate",
            Self::FindMateRate => "find-mate-rate",
            Self::MaxDesireToMate => "max-desire-to-mate",
            Self::Sex => "sex",
            Self::Red => "red",
            Self::Green => "green",
            Self::Blue => "blue",
        }
    }
}

impl core::fmt::Display for Trait {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.key())
    }
}

// ---------------------------------------------------------------------------
// Death
// ---------------------------------------------------------------------------

/// Why an agent died.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum DeathCause {
    /// Energy ran out.
    Starvation,
    /// Age reached the agent's max age.
    OldAge,
    /// Eaten by a predator.
    Predation,
}

impl core::fmt::Display for DeathCause {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Starvation => write!(f, "starvation"),
            Self::OldAge => write!(f, "old_age"),
            Self::Predation => write!(f, "predation"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_codes_match_original_order() {
        assert_eq!(BehaviorState::Foraging.legacy_code(), 0);
        assert_eq!(BehaviorState::Mating.legacy_code(), 1);
        assert_eq!(BehaviorState::Wandering.legacy_code(), 3);
    }

    #[test]
    fn trait_keys_are_unique() {
        let mut keys: Vec<&str> = Trait::ALL.iter().map(|t| t.key()).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), Trait::ALL.len());
    }

    #[test]
    fn trait_serializes_as_kebab_key() {
        let json = serde_json::to_string(&Trait::MaxDesireToMate).ok();
        assert_eq!(json.as_deref(), Some("\"max-desire-to-mate\""));
    }
}
