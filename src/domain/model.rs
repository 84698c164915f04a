use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::utils::error::{EvalError, Result};

/// One candidate resource of the double knapsack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub weight: u64,
    pub size: u64,
    pub cost: u64,
}

impl Item {
    pub fn new(weight: u64, size: u64, cost: u64) -> Self {
        Self { weight, size, cost }
    }

    /// Value per unit of combined consumption, used only as a ranking key.
    ///
    /// An item that consumes neither weight nor size has density `+inf`, so it
    /// ranks ahead of everything else.
    pub fn density(&self) -> f64 {
        let consumption = self.weight as f64 + self.size as f64;
        if consumption == 0.0 {
            f64::INFINITY
        } else {
            self.cost as f64 / consumption
        }
    }
}

/// Ordered candidate list together with the object count declared by its source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub items: Vec<Item>,
    pub expected_count: usize,
}

impl Catalog {
    pub fn new(items: Vec<Item>, expected_count: usize) -> Self {
        Self {
            items,
            expected_count,
        }
    }

    /// Builds a catalog whose declared count is its actual length.
    pub fn from_items(items: Vec<Item>) -> Self {
        let expected_count = items.len();
        Self {
            items,
            expected_count,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Fails with [`EvalError::Integrity`] when the declared count differs from the items held.
    pub fn verify_integrity(&self) -> Result<()> {
        if self.expected_count != self.items.len() {
            return Err(EvalError::Integrity {
                declared: self.expected_count,
                actual: self.items.len(),
            });
        }
        Ok(())
    }

    /// Totals saturate at `u64::MAX`.
    pub fn total_weight(&self) -> u64 {
        self.saturating_total(|item| item.weight)
    }

    pub fn total_size(&self) -> u64 {
        self.saturating_total(|item| item.size)
    }

    pub fn total_cost(&self) -> u64 {
        self.saturating_total(|item| item.cost)
    }

    fn saturating_total(&self, field: impl Fn(&Item) -> u64) -> u64 {
        self.items
            .iter()
            .fold(0u64, |total, item| total.saturating_add(field(item)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityLimits {
    pub max_weight: u64,
    pub max_size: u64,
}

impl CapacityLimits {
    pub fn new(max_weight: u64, max_size: u64) -> Self {
        Self {
            max_weight,
            max_size,
        }
    }

    pub fn admits(&self, weight: u64, size: u64) -> bool {
        weight <= self.max_weight && size <= self.max_size
    }
}

/// Catalog and limits as read from one catalog file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadedCatalog {
    pub catalog: Catalog,
    pub limits: CapacityLimits,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionResult {
    pub total_cost: u64,
    pub total_weight: u64,
    pub total_size: u64,
    /// Catalog indices of the committed items, in ranked order.
    pub selected: Vec<usize>,
}

/// Per-generation best values read from one run file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSeries {
    pub source: String,
    pub parameter: String,
    pub values: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AveragedCurve {
    pub parameter: String,
    pub repetitions: usize,
    pub values: Vec<f64>,
}

/// Outcome of one genetic-solver repetition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrainingRun {
    pub repetition: usize,
    pub seed: u64,
    pub best_per_generation: Vec<u64>,
    pub elapsed: Duration,
}

impl TrainingRun {
    pub fn generations(&self) -> usize {
        self.best_per_generation.len()
    }

    pub fn final_best(&self) -> Option<u64> {
        self.best_per_generation.last().copied()
    }
}
