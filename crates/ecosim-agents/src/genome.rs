//! Diploid genomes: seed generation, gamete formation, and recombination.
//!
//! Every trait is stored as an [`AllelePair`]; the expressed value is the
//! mean of its two alleles. Breeding works in two steps:
//!
//! 1. [`Genome::form_gamete`] picks one allele per trait at random, then
//!    with probability `mutation.chance` perturbs one uniformly chosen trait.
//! 2. [`Genome::combine`] pairs a paternal and a maternal gamete back into a
//!    diploid genome.
//!
//! Mutation noise depends on the trait: motion traits take uniform noise,
//! bounded traits take the same noise floored at 0, sex is redrawn, and
//! color channels take integer noise wrapped modulo 256.

use std::collections::BTreeMap;

use ecosim_types::{Rgb, Sex, Trait};
use rand::Rng;

use crate::config::{GenomeRanges, MutationParams};
use crate::error::GenomeError;

/// The two alleles of one trait.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AllelePair {
    /// Allele inherited from the father.
    pub paternal: f64,
    /// Allele inherited from the mother.
    pub maternal: f64,
}

impl AllelePair {
    /// Create an allele pair.
    pub const fn new(paternal: f64, maternal: f64) -> Self {
        Self { paternal, maternal }
    }

    /// Expressed value: the arithmetic mean of both alleles.
    pub fn mean(&self) -> f64 {
        (self.paternal + self.maternal) / 2.0
    }
}

/// How a trait reacts to mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MutationKind {
    /// Uniform noise, unbounded.
    Motion,
    /// Uniform noise, floored at 0.
    Bounded,
    /// Redrawn from {0, 1}.
    Binary,
    /// Integer noise wrapped into 0..=255.
    Color,
}

const fn mutation_kind(trait_key: Trait) -> MutationKind {
    match trait_key {
        Trait::Speed | Trait::TurnSpeed | Trait::FieldOfView => MutationKind::Motion,
        Trait::ViewDistance
        | Trait::MaxEnergy
        | Trait::MetabolismRate
        | Trait::FindMateRate
        | Trait::MaxDesireToMate => MutationKind::Bounded,
        Trait::Sex => MutationKind::Binary,
        Trait::Red | Trait::Green | Trait::Blue => MutationKind::Color,
    }
}

/// A haploid set of alleles drawn from one parent.
#[derive(Debug, Clone, PartialEq)]
pub struct Gamete {
    alleles: BTreeMap<Trait, f64>,
    mutated: Option<Trait>,
}

impl Gamete {
    /// Build a gamete from explicit alleles.
    pub const fn from_alleles(alleles: BTreeMap<Trait, f64>) -> Self {
        Self {
            alleles,
            mutated: None,
        }
    }

    /// The allele carried for `trait_key`.
    pub fn allele(&self, trait_key: Trait) -> Option<f64> {
        self.alleles.get(&trait_key).copied()
    }

    /// The trait that mutated while forming this gamete, if any.
    pub const fn mutated(&self) -> Option<Trait> {
        self.mutated
    }

    fn require(&self, trait_key: Trait) -> Result<f64, GenomeError> {
        self.allele(trait_key)
            .ok_or(GenomeError::MissingTrait(trait_key))
    }
}

/// A complete diploid genome.
#[derive(Debug, Clone, PartialEq)]
pub struct Genome {
    pairs: BTreeMap<Trait, AllelePair>,
}

impl Genome {
    /// Build a genome from explicit allele pairs, checking every trait is
    /// present and finite.
    pub fn from_pairs(pairs: BTreeMap<Trait, AllelePair>) -> Result<Self, GenomeError> {
        let genome = Self { pairs };
        genome.validate()?;
        Ok(genome)
    }

    /// Build a genome where both alleles of every trait equal `values[trait]`.
    pub fn homozygous(values: &BTreeMap<Trait, f64>) -> Result<Self, GenomeError> {
        let pairs = Trait::ALL
            .into_iter()
            .map(|t| {
                let value = values.get(&t).copied().ok_or(GenomeError::MissingTrait(t))?;
                Ok((t, AllelePair::new(value, value)))
            })
            .collect::<Result<BTreeMap<_, _>, GenomeError>>()?;
        Self::from_pairs(pairs)
    }

    /// Draw a seed genome from per-trait uniform ranges.
    ///
    /// Continuous traits draw both alleles from their range. The paternal
    /// sex allele is 0 or 1 and the maternal allele is 0, so seed agents
    /// are male and female with equal odds. Color alleles are drawn from
    /// 0..=255.
    pub fn random(ranges: &GenomeRanges, rng: &mut impl Rng) -> Result<Self, GenomeError> {
        ranges.validate()?;
        let mut pairs = BTreeMap::new();
        for trait_key in Trait::ALL {
            let pair = match ranges.range_for(trait_key) {
                Some(range) => AllelePair::new(
                    rng.random_range(range.min..range.max),
                    rng.random_range(range.min..range.max),
                ),
                None if trait_key == Trait::Sex => {
                    AllelePair::new(f64::from(rng.random_range(0_u8..=1)), 0.0)
                }
                None => AllelePair::new(
                    f64::from(rng.random::<u8>()),
                    f64::from(rng.random::<u8>()),
                ),
            };
            pairs.insert(trait_key, pair);
        }
        Self::from_pairs(pairs)
    }

    /// Check every trait is present with finite alleles.
    pub fn validate(&self) -> Result<(), GenomeError> {
        for trait_key in Trait::ALL {
            let pair = self.pair(trait_key)?;
            for value in [pair.paternal, pair.maternal] {
                if !value.is_finite() {
                    return Err(GenomeError::NonFiniteAllele { trait_key, value });
                }
            }
        }
        Ok(())
    }

    /// The allele pair for one trait.
    pub fn pair(&self, trait_key: Trait) -> Result<AllelePair, GenomeError> {
        self.pairs
            .get(&trait_key)
            .copied()
            .ok_or(GenomeError::MissingTrait(trait_key))
    }

    /// The expressed value of one trait.
    pub fn expressed(&self, trait_key: Trait) -> Result<f64, GenomeError> {
        Ok(self.pair(trait_key)?.mean())
    }

    /// Draw a haploid gamete, possibly mutating one trait.
    pub fn form_gamete(
        &self,
        mutation: &MutationParams,
        rng: &mut impl Rng,
    ) -> Result<Gamete, GenomeError> {
        let mut alleles = BTreeMap::new();
        for trait_key in Trait::ALL {
            let pair = self.pair(trait_key)?;
            let allele = if rng.random_bool(0.5) {
                pair.paternal
            } else {
                pair.maternal
            };
            alleles.insert(trait_key, allele);
        }

        let mut mutated = None;
        let chance = if mutation.chance.is_finite() {
            mutation.chance.clamp(0.0, 1.0)
        } else {
            0.0
        };
        if rng.random_bool(chance) {
            let trait_key = Trait::ALL
                .get(rng.random_range(0..Trait::ALL.len()))
                .copied()
                .unwrap_or(Trait::Speed);
            if let Some(allele) = alleles.get_mut(&trait_key) {
                *allele = mutate_allele(*allele, mutation_kind(trait_key), mutation, rng);
                mutated = Some(trait_key);
            }
        }

        Ok(Gamete { alleles, mutated })
    }

    /// Pair a paternal and a maternal gamete into a diploid genome.
    pub fn combine(paternal: &Gamete, maternal: &Gamete) -> Result<Self, GenomeError> {
        let pairs = Trait::ALL
            .into_iter()
            .map(|t| Ok((t, AllelePair::new(paternal.require(t)?, maternal.require(t)?))))
            .collect::<Result<BTreeMap<_, _>, GenomeError>>()?;
        Self::from_pairs(pairs)
    }

    /// Express the genome into the values an agent acts on.
    pub fn phenotype(&self) -> Result<Phenotype, GenomeError> {
        Ok(Phenotype {
            speed: self.expressed(Trait::Speed)?,
            turn_speed: self.expressed(Trait::TurnSpeed)?,
            field_of_view: self.expressed(Trait::FieldOfView)?,
            view_distance: self.expressed(Trait::ViewDistance)?,
            max_energy: self.expressed(Trait::MaxEnergy)?,
            metabolism_rate: self.expressed(Trait::MetabolismRate)?,
            find_mate_rate: self.expressed(Trait::FindMateRate)?,
            max_desire_to_mate: self.expressed(Trait::MaxDesireToMate)?,
            sex: if self.expressed(Trait::Sex)? > 0.0 {
                Sex::Male
            } else {
                Sex::Female
            },
            color: Rgb {
                r: color_channel(self.expressed(Trait::Red)?),
                g: color_channel(self.expressed(Trait::Green)?),
                b: color_channel(self.expressed(Trait::Blue)?),
            },
        })
    }
}

fn mutate_allele(
    value: f64,
    kind: MutationKind,
    mutation: &MutationParams,
    rng: &mut impl Rng,
) -> f64 {
    match kind {
        MutationKind::Motion => value + uniform_noise(mutation.spread, rng),
        MutationKind::Bounded => (value + uniform_noise(mutation.spread, rng)).max(0.0),
        MutationKind::Binary => f64::from(rng.random_range(0_u8..=1)),
        MutationKind::Color => {
            let spread = mutation.color_spread.max(0);
            let shift = rng.random_range(-spread..=spread);
            (value + f64::from(shift)).rem_euclid(256.0)
        }
    }
}

fn uniform_noise(spread: f64, rng: &mut impl Rng) -> f64 {
    if spread.is_finite() && spread > 0.0 {
        rng.random_range(-spread..spread)
    } else {
        0.0
    }
}

/// Round a mean color allele into a channel value.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // Clamped to 0..=255 first.
fn color_channel(value: f64) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Expressed trait values, derived once when an agent is created.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Phenotype {
    /// Forward speed.
    pub speed: f64,
    /// Turn rate in radians per second.
    pub turn_speed: f64,
    /// Full field-of-view angle in radians.
    pub field_of_view: f64,
    /// Sensing range.
    pub view_distance: f64,
    /// Energy capacity.
    pub max_energy: f64,
    /// Energy spent per tick.
    pub metabolism_rate: f64,
    /// Desire gained per tick.
    pub find_mate_rate: f64,
    /// Desire cap.
    pub max_desire_to_mate: f64,
    /// Binary sex; male when the sex alleles average above zero.
    pub sex: Sex,
    /// Rendered color.
    pub color: Rgb,
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::cast_precision_loss,
    clippy::arithmetic_side_effects
)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    const EPS: f64 = 1e-9;

    fn uniform_genome(paternal: f64, maternal: f64) -> Genome {
        let pairs = Trait::ALL
            .into_iter()
            .map(|t| (t, AllelePair::new(paternal, maternal)))
            .collect();
        Genome::from_pairs(pairs).unwrap()
    }

    fn no_mutation() -> MutationParams {
        MutationParams {
            chance: 0.0,
            ..MutationParams::default()
        }
    }

    #[test]
    fn phenotype_is_allele_mean() {
        let mut pairs: BTreeMap<Trait, AllelePair> = Trait::ALL
            .into_iter()
            .map(|t| (t, AllelePair::new(10.0, 20.0)))
            .collect();
        pairs.insert(Trait::Sex, AllelePair::new(0.0, 0.0));
        let genome = Genome::from_pairs(pairs).unwrap();
        let phenotype = genome.phenotype().unwrap();
        assert!((phenotype.speed - 15.0).abs() < EPS);
        assert!((phenotype.max_energy - 15.0).abs() < EPS);
        assert_eq!(phenotype.sex, Sex::Female);
        assert_eq!(phenotype.color, Rgb { r: 15, g: 15, b: 15 });
    }

    #[test]
    fn nonzero_sex_mean_is_male() {
        let mut pairs: BTreeMap<Trait, AllelePair> = Trait::ALL
            .into_iter()
            .map(|t| (t, AllelePair::new(1.0, 1.0)))
            .collect();
        pairs.insert(Trait::Sex, AllelePair::new(1.0, 0.0));
        let genome = Genome::from_pairs(pairs).unwrap();
        assert_eq!(genome.phenotype().unwrap().sex, Sex::Male);
    }

    #[test]
    fn missing_trait_is_rejected() {
        let pairs: BTreeMap<Trait, AllelePair> = Trait::ALL
            .into_iter()
            .filter(|t| *t != Trait::Blue)
            .map(|t| (t, AllelePair::new(1.0, 1.0)))
            .collect();
        assert!(matches!(
            Genome::from_pairs(pairs),
            Err(GenomeError::MissingTrait(Trait::Blue))
        ));
    }

    #[test]
    fn non_finite_allele_is_rejected() {
        let mut pairs: BTreeMap<Trait, AllelePair> = Trait::ALL
            .into_iter()
            .map(|t| (t, AllelePair::new(1.0, 1.0)))
            .collect();
        pairs.insert(Trait::Speed, AllelePair::new(f64::NAN, 1.0));
        assert!(matches!(
            Genome::from_pairs(pairs),
            Err(GenomeError::NonFiniteAllele { .. })
        ));
    }

    #[test]
    fn combine_rejects_incomplete_gamete() {
        let full = uniform_genome(1.0, 2.0)
            .form_gamete(&no_mutation(), &mut SmallRng::seed_from_u64(1))
            .unwrap();
        let partial = Gamete::from_alleles(BTreeMap::from([(Trait::Speed, 3.0)]));
        assert!(matches!(
            Genome::combine(&full, &partial),
            Err(GenomeError::MissingTrait(_))
        ));
    }

    #[test]
    fn offspring_alleles_trace_to_each_parent() {
        let mut rng = SmallRng::seed_from_u64(42);
        let father = uniform_genome(1.0, 2.0);
        let mother = uniform_genome(3.0, 4.0);

        for _ in 0..200 {
            let sperm = father.form_gamete(&no_mutation(), &mut rng).unwrap();
            let egg = mother.form_gamete(&no_mutation(), &mut rng).unwrap();
            let child = Genome::combine(&sperm, &egg).unwrap();
            for t in Trait::ALL {
                let pair = child.pair(t).unwrap();
                assert!(
                    (pair.paternal - 1.0).abs() < EPS || (pair.paternal - 2.0).abs() < EPS,
                    "paternal {t} allele {} not from father",
                    pair.paternal
                );
                assert!(
                    (pair.maternal - 3.0).abs() < EPS || (pair.maternal - 4.0).abs() < EPS,
                    "maternal {t} allele {} not from mother",
                    pair.maternal
                );
            }
        }
    }

    #[test]
    fn non_mutated_loci_trace_to_parents_with_mutation_on() {
        let mut rng = SmallRng::seed_from_u64(9);
        let father = uniform_genome(100.0, 101.0);
        let mother = uniform_genome(200.0, 201.0);
        let mutation = MutationParams::default();

        for _ in 0..200 {
            let sperm = father.form_gamete(&mutation, &mut rng).unwrap();
            let egg = mother.form_gamete(&mutation, &mut rng).unwrap();
            let child = Genome::combine(&sperm, &egg).unwrap();
            for t in Trait::ALL {
                let pair = child.pair(t).unwrap();
                if sperm.mutated() != Some(t) {
                    assert!(
                        (pair.paternal - 100.0).abs() < EPS || (pair.paternal - 101.0).abs() < EPS
                    );
                }
                if egg.mutated() != Some(t) {
                    assert!(
                        (pair.maternal - 200.0).abs() < EPS || (pair.maternal - 201.0).abs() < EPS
                    );
                }
            }
        }
    }

    #[test]
    fn mutation_rate_converges() {
        let mut rng = SmallRng::seed_from_u64(7);
        let genome = uniform_genome(50.0, 60.0);
        let mutation = MutationParams::default();
        let trials = 20_000;
        let mutated = (0..trials)
            .filter(|_| {
                genome
                    .form_gamete(&mutation, &mut rng)
                    .unwrap()
                    .mutated()
                    .is_some()
            })
            .count();
        let rate = mutated as f64 / f64::from(trials);
        assert!((rate - 0.2).abs() < 0.02, "mutation rate {rate}");
    }

    #[test]
    fn at_most_one_trait_mutates() {
        let mut rng = SmallRng::seed_from_u64(3);
        let genome = uniform_genome(40.0, 40.0);
        let always = MutationParams {
            chance: 1.0,
            ..MutationParams::default()
        };
        for _ in 0..500 {
            let gamete = genome.form_gamete(&always, &mut rng).unwrap();
            let changed = Trait::ALL
                .into_iter()
                .filter(|t| (gamete.allele(*t).unwrap() - 40.0).abs() > EPS)
                .count();
            assert!(changed <= 1);
            assert!(gamete.mutated().is_some());
        }
    }

    #[test]
    fn bounded_traits_floor_at_zero() {
        let mut rng = SmallRng::seed_from_u64(11);
        let mutation = MutationParams::default();
        for _ in 0..500 {
            let value = mutate_allele(0.5, MutationKind::Bounded, &mutation, &mut rng);
            assert!(value >= 0.0);
            assert!(value <= 2.5);
        }
    }

    #[test]
    fn color_mutation_wraps() {
        let mut rng = SmallRng::seed_from_u64(5);
        let mutation = MutationParams::default();
        for _ in 0..500 {
            let value = mutate_allele(3.0, MutationKind::Color, &mutation, &mut rng);
            assert!((0.0..256.0).contains(&value));
            assert!(value <= 13.0 || value >= 249.0);
            assert!((value - value.round()).abs() < EPS);
        }
    }

    #[test]
    fn sex_mutation_redraws_binary() {
        let mut rng = SmallRng::seed_from_u64(13);
        let mutation = MutationParams::default();
        for _ in 0..100 {
            let value = mutate_allele(0.0, MutationKind::Binary, &mutation, &mut rng);
            assert!(value.abs() < EPS || (value - 1.0).abs() < EPS);
        }
    }

    #[test]
    fn random_genome_respects_ranges() {
        let mut rng = SmallRng::seed_from_u64(21);
        let ranges = GenomeRanges::predator();
        let mut males = 0_u32;
        for _ in 0..400 {
            let genome = Genome::random(&ranges, &mut rng).unwrap();
            let speed = genome.pair(Trait::Speed).unwrap();
            assert!((80.0..200.0).contains(&speed.paternal));
            assert!((80.0..200.0).contains(&speed.maternal));
            let sex = genome.pair(Trait::Sex).unwrap();
            assert!(sex.maternal.abs() < EPS);
            if genome.phenotype().unwrap().sex == Sex::Male {
                males += 1;
            }
        }
        assert!((120..280).contains(&males), "males {males}");
    }
}
