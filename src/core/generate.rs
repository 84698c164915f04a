//! Random catalog generation.
//!
//! Weights are drawn from `[1, 10 * max_weight / n)`, sizes from
//! `[1, 10 * max_size / n)` and costs from `[1, n)`. A draw is kept only if it
//! passes [`check_difficulty`]; otherwise it is redrawn.

use rand::distributions::{Distribution, Uniform};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::core::catalog::check_difficulty;
use crate::domain::model::{CapacityLimits, Catalog, Item, LoadedCatalog};
use crate::utils::error::{EvalError, Result};

pub const DEFAULT_MAX_ATTEMPTS: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateSpec {
    pub number_of_objects: u64,
    pub max_weight: u64,
    pub max_size: u64,
    pub seed: Option<u64>,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
}

fn default_max_attempts() -> usize {
    DEFAULT_MAX_ATTEMPTS
}

impl GenerateSpec {
    pub fn new(number_of_objects: u64, max_weight: u64, max_size: u64) -> Self {
        Self {
            number_of_objects,
            max_weight,
            max_size,
            seed: None,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn upper_bound(&self, limit: u64) -> u64 {
        limit.saturating_mul(10) / self.number_of_objects.max(1)
    }

    pub fn validate(&self) -> Result<()> {
        if self.number_of_objects < 2 {
            return Err(EvalError::ValidationError {
                message: format!(
                    "number_of_objects must be at least 2, got {}",
                    self.number_of_objects
                ),
            });
        }
        if usize::try_from(self.number_of_objects).is_err() {
            return Err(EvalError::ValidationError {
                message: format!("number_of_objects {} is too large", self.number_of_objects),
            });
        }
        for (name, limit) in [("max_weight", self.max_weight), ("max_size", self.max_size)] {
            if self.upper_bound(limit) < 2 {
                return Err(EvalError::ValidationError {
                    message: format!(
                        "{} {} is too small for {} objects (10 * {} / n must be at least 2)",
                        name, limit, self.number_of_objects, name
                    ),
                });
            }
        }
        if self.max_attempts == 0 {
            return Err(EvalError::ValidationError {
                message: "max_attempts must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Generates a catalog, seeding from `spec.seed` or from entropy.
pub fn generate_catalog(spec: &GenerateSpec) -> Result<LoadedCatalog> {
    let mut rng = match spec.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };
    generate_catalog_with(spec, &mut rng)
}

pub fn generate_catalog_with<R: Rng + ?Sized>(
    spec: &GenerateSpec,
    rng: &mut R,
) -> Result<LoadedCatalog> {
    spec.validate()?;

    let weights = Uniform::from(1..spec.upper_bound(spec.max_weight));
    let sizes = Uniform::from(1..spec.upper_bound(spec.max_size));
    let costs = Uniform::from(1..spec.number_of_objects);
    let limits = CapacityLimits::new(spec.max_weight, spec.max_size);

    for attempt in 1..=spec.max_attempts {
        let items: Vec<Item> = (0..spec.number_of_objects)
            .map(|_| {
                Item::new(
                    weights.sample(rng),
                    sizes.sample(rng),
                    costs.sample(rng),
                )
            })
            .collect();

        let loaded = LoadedCatalog {
            catalog: Catalog::from_items(items),
            limits,
        };

        match check_difficulty(&loaded) {
            Ok(()) => {
                tracing::debug!(
                    "Generated catalog on attempt {}: weight sum {}, size sum {}",
                    attempt,
                    loaded.catalog.total_weight(),
                    loaded.catalog.total_size()
                );
                return Ok(loaded);
            }
            Err(e) => tracing::debug!("Attempt {} rejected: {}", attempt, e),
        }
    }

    Err(EvalError::ProcessingError {
        message: format!(
            "no sufficiently constrained catalog after {} attempts",
            spec.max_attempts
        ),
    })
}
