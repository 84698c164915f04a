//! Bit-string genetic algorithm for the double knapsack.
//!
//! Produces the per-generation best values that the aggregator averages.
//! Each individual marks which catalog items are taken. Fitness is the total
//! cost when both limits hold and 0 otherwise.
//!
//! Evaluation and offspring generation run on rayon. Every child draws from
//! its own ChaCha8 stream keyed by `(seed, generation, child index)`, so a run
//! is reproducible for a given seed whatever the thread count.

use std::time::Instant;

use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::model::{CapacityLimits, Item, LoadedCatalog, TrainingRun};
use crate::utils::error::{EvalError, Result};
use crate::utils::validation::{validate_positive_number, validate_probability, Validate};

const SPLITMIX64_GOLDEN: u64 = 0x9e3779b97f4a7c15;
const SPLITMIX64_M1: u64 = 0xbf58476d1ce4e5b9;
const SPLITMIX64_M2: u64 = 0x94d049bb133111eb;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneticConfig {
    pub population_size: usize,
    /// Individuals sampled per tournament, in `[1, population_size]`.
    pub tournament_size: usize,
    pub crossover_probability: f64,
    /// Per-bit flip probability.
    pub mutation_probability: f64,
    pub generation_limit: usize,
    /// Stop once `|best - previous| / best <= epsilon`. `None` always runs
    /// `generation_limit` generations, which keeps repetitions equally long.
    #[serde(default)]
    pub epsilon: Option<f64>,
}

impl Default for GeneticConfig {
    fn default() -> Self {
        Self {
            population_size: 100,
            tournament_size: 5,
            crossover_probability: 0.9,
            mutation_probability: 0.01,
            generation_limit: 200,
            epsilon: None,
        }
    }
}

impl Validate for GeneticConfig {
    fn validate(&self) -> Result<()> {
        validate_positive_number("population_size", self.population_size, 2)?;
        validate_positive_number("tournament_size", self.tournament_size, 1)?;
        if self.tournament_size > self.population_size {
            return Err(EvalError::InvalidConfigValueError {
                field: "tournament_size".to_string(),
                value: self.tournament_size.to_string(),
                reason: format!(
                    "Tournament cannot be larger than the population ({})",
                    self.population_size
                ),
            });
        }
        validate_probability("crossover_probability", self.crossover_probability)?;
        validate_probability("mutation_probability", self.mutation_probability)?;
        validate_positive_number("generation_limit", self.generation_limit, 1)?;
        if let Some(epsilon) = self.epsilon {
            if !(epsilon >= 0.0) {
                return Err(EvalError::InvalidConfigValueError {
                    field: "epsilon".to_string(),
                    value: epsilon.to_string(),
                    reason: "Epsilon must be non-negative".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Mixes a stream key into a seed (SplitMix64 finalizer).
fn derive_seed(seed: u64, generation: u64, index: u64) -> u64 {
    let mut z = seed
        .wrapping_add(generation.wrapping_mul(SPLITMIX64_GOLDEN))
        .wrapping_add(index.wrapping_add(1).wrapping_mul(SPLITMIX64_M2));
    z = (z ^ (z >> 30)).wrapping_mul(SPLITMIX64_M1);
    z = (z ^ (z >> 27)).wrapping_mul(SPLITMIX64_M2);
    z ^ (z >> 31)
}

pub fn fitness(genome: &[u8], items: &[Item], limits: &CapacityLimits) -> u64 {
    let (weight, size, cost) = genome
        .iter()
        .zip(items)
        .filter(|(bit, _)| **bit != 0)
        .fold((0u64, 0u64, 0u64), |(w, s, c), (_, item)| {
            (
                w.saturating_add(item.weight),
                s.saturating_add(item.size),
                c.saturating_add(item.cost),
            )
        });

    if limits.admits(weight, size) {
        cost
    } else {
        0
    }
}

/// Samples `size` distinct individuals and returns the fittest one's index.
/// Ties go to the earliest sampled.
pub fn tournament<R: Rng + ?Sized>(scores: &[u64], size: usize, rng: &mut R) -> usize {
    let mut best: Option<usize> = None;
    for candidate in index::sample(rng, scores.len(), size.min(scores.len())).iter() {
        match best {
            Some(current) if scores[current] >= scores[candidate] => {}
            _ => best = Some(candidate),
        }
    }
    best.unwrap_or(0)
}

/// One-point crossover with the given probability; otherwise a copy of `parent1`.
pub fn crossover<R: Rng + ?Sized>(
    child: &mut [u8],
    parent1: &[u8],
    parent2: &[u8],
    probability: f64,
    rng: &mut R,
) {
    if child.is_empty() || !rng.gen_bool(probability) {
        child.copy_from_slice(parent1);
        return;
    }

    let cut = rng.gen_range(0..child.len());
    child[..cut].copy_from_slice(&parent1[..cut]);
    child[cut..].copy_from_slice(&parent2[cut..]);
}

pub fn mutate<R: Rng + ?Sized>(genome: &mut [u8], probability: f64, rng: &mut R) {
    if probability == 0.0 {
        return;
    }
    for bit in genome.iter_mut() {
        if rng.gen_bool(probability) {
            *bit ^= 1;
        }
    }
}

/// Flat row-major population plus the buffer the next generation is written into.
pub struct Population<'a> {
    loaded: &'a LoadedCatalog,
    config: &'a GeneticConfig,
    seed: u64,
    generation: u64,
    genome_len: usize,
    current: Vec<u8>,
    next: Vec<u8>,
}

impl<'a> Population<'a> {
    pub fn new(loaded: &'a LoadedCatalog, config: &'a GeneticConfig, seed: u64) -> Self {
        let genome_len = loaded.catalog.len();
        let mut current = vec![0u8; config.population_size * genome_len];

        if genome_len > 0 {
            current
                .par_chunks_mut(genome_len)
                .enumerate()
                .for_each(|(row, genome)| {
                    let mut rng = ChaCha8Rng::seed_from_u64(derive_seed(seed, 0, row as u64));
                    for bit in genome.iter_mut() {
                        *bit = rng.gen_range(0..2);
                    }
                });
        }

        let next = vec![0u8; current.len()];
        Self {
            loaded,
            config,
            seed,
            generation: 0,
            genome_len,
            current,
            next,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn individual(&self, index: usize) -> &[u8] {
        &self.current[index * self.genome_len..(index + 1) * self.genome_len]
    }

    pub fn evaluate(&self) -> Vec<u64> {
        let items = &self.loaded.catalog.items;
        let limits = &self.loaded.limits;
        if self.genome_len == 0 {
            return vec![0; self.config.population_size];
        }
        self.current
            .par_chunks(self.genome_len)
            .map(|genome| fitness(genome, items, limits))
            .collect()
    }

    /// Scores the current generation, breeds the next one, and returns the
    /// best score of the generation just scored.
    pub fn evolve(&mut self) -> u64 {
        let scores = self.evaluate();
        let best = scores.iter().copied().max().unwrap_or(0);

        if self.genome_len > 0 {
            let stream = self.generation + 1;
            let seed = self.seed;
            let genome_len = self.genome_len;
            let config = self.config;
            let current = &self.current;

            self.next
                .par_chunks_mut(genome_len)
                .enumerate()
                .for_each(|(index, child)| {
                    let mut rng =
                        ChaCha8Rng::seed_from_u64(derive_seed(seed, stream, index as u64));
                    let first = tournament(&scores, config.tournament_size, &mut rng);
                    let second = tournament(&scores, config.tournament_size, &mut rng);
                    let parent1 = &current[first * genome_len..(first + 1) * genome_len];
                    let parent2 = &current[second * genome_len..(second + 1) * genome_len];

                    crossover(
                        child,
                        parent1,
                        parent2,
                        config.crossover_probability,
                        &mut rng,
                    );
                    mutate(child, config.mutation_probability, &mut rng);
                });

            std::mem::swap(&mut self.current, &mut self.next);
        }

        self.generation += 1;
        best
    }
}

fn relative_change(best: u64, previous: u64) -> Option<f64> {
    if best == 0 {
        return None;
    }
    Some((best as f64 - previous as f64).abs() / best as f64)
}

/// Runs one training repetition.
pub fn train(loaded: &LoadedCatalog, config: &GeneticConfig, seed: u64) -> Result<TrainingRun> {
    config.validate()?;
    loaded.catalog.verify_integrity()?;

    let started = Instant::now();
    let mut population = Population::new(loaded, config, seed);
    let mut best_per_generation = Vec::with_capacity(config.generation_limit);
    let mut previous: Option<u64> = None;

    for _ in 0..config.generation_limit {
        let best = population.evolve();
        best_per_generation.push(best);

        if let (Some(epsilon), Some(previous)) = (config.epsilon, previous) {
            if let Some(delta) = relative_change(best, previous) {
                if delta <= epsilon {
                    tracing::debug!(
                        "Converged after {} generations (delta {:.6} <= {})",
                        population.generation(),
                        delta,
                        epsilon
                    );
                    break;
                }
            }
        }
        previous = Some(best);
    }

    Ok(TrainingRun {
        repetition: 0,
        seed,
        best_per_generation,
        elapsed: started.elapsed(),
    })
}
