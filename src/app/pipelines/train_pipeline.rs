use crate::core::aggregate::render_run_values;
use crate::core::catalog::{check_difficulty, CatalogLoader};
use crate::core::genetic::{train, GeneticConfig};
use crate::core::parallel::WorkerPool;
use crate::core::{LoadedCatalog, Pipeline, Storage, TrainingRun};
use crate::utils::error::{EvalError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_path, Validate};

#[derive(Debug, Clone)]
pub struct TrainJob {
    pub catalog_path: String,
    /// Parameter token written into run file names (`res_<label>_<repetition>`).
    pub label: String,
    pub repetitions: usize,
    /// Repetition `r` trains with `seed + r`.
    pub seed: u64,
    pub genetic: GeneticConfig,
    pub output_dir: String,
    pub check_difficulty: bool,
    pub workers: usize,
}

impl Validate for TrainJob {
    fn validate(&self) -> Result<()> {
        validate_path("catalog_path", &self.catalog_path)?;
        validate_path("output_dir", &self.output_dir)?;
        validate_non_empty_string("label", &self.label)?;
        if self.label.contains(['_', '/', '\\']) {
            return Err(EvalError::InvalidConfigValueError {
                field: "label".to_string(),
                value: self.label.clone(),
                reason: "Label cannot contain '_' or path separators".to_string(),
            });
        }
        if self.repetitions == 0 {
            return Err(EvalError::InvalidConfigValueError {
                field: "repetitions".to_string(),
                value: "0".to_string(),
                reason: "At least one repetition is required".to_string(),
            });
        }
        self.genetic.validate()
    }
}

pub fn run_file_name(label: &str, repetition: usize) -> String {
    format!("res_{}_{}", label, repetition)
}

/// Paths of the run files a job writes, relative to storage.
pub fn run_file_paths(job: &TrainJob) -> Vec<String> {
    (0..job.repetitions)
        .map(|repetition| {
            let name = run_file_name(&job.label, repetition);
            std::path::Path::new(&job.output_dir)
                .join(name)
                .to_string_lossy()
                .into_owned()
        })
        .collect()
}

/// Trains the genetic solver `repetitions` times on one catalog and writes
/// one run file per repetition.
pub struct TrainPipeline<S: Storage> {
    storage: S,
    job: TrainJob,
}

impl<S: Storage> TrainPipeline<S> {
    pub fn new(storage: S, job: TrainJob) -> Self {
        Self { storage, job }
    }

    pub fn job(&self) -> &TrainJob {
        &self.job
    }
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for TrainPipeline<S> {
    type Extracted = LoadedCatalog;
    type Transformed = Vec<TrainingRun>;

    fn name(&self) -> &str {
        "train"
    }

    async fn extract(&self) -> Result<LoadedCatalog> {
        self.job.validate()?;

        let loaded = CatalogLoader::new(&self.storage)
            .load(&self.job.catalog_path)
            .await?;
        if self.job.check_difficulty {
            check_difficulty(&loaded)?;
        }

        tracing::info!(
            "📋 Training on {} ({} items, limits {}/{})",
            self.job.catalog_path,
            loaded.catalog.len(),
            loaded.limits.max_weight,
            loaded.limits.max_size
        );
        Ok(loaded)
    }

    async fn transform(&self, data: LoadedCatalog) -> Result<Vec<TrainingRun>> {
        let genetic = self.job.genetic.clone();
        let repetitions = self.job.repetitions;
        let base_seed = self.job.seed;
        let pool = WorkerPool::with_workers(self.job.workers);
        let label = self.job.label.clone();

        tokio::task::spawn_blocking(move || {
            (0..repetitions)
                .map(|repetition| {
                    let seed = base_seed.wrapping_add(repetition as u64);
                    let mut run = pool.install(|| train(&data, &genetic, seed))?;
                    run.repetition = repetition;
                    tracing::info!(
                        "🧬 [{}] repetition {}: best {} after {} generations ({:?})",
                        label,
                        repetition,
                        run.final_best().unwrap_or(0),
                        run.generations(),
                        run.elapsed
                    );
                    Ok(run)
                })
                .collect::<Result<Vec<_>>>()
        })
        .await
        .map_err(|e| EvalError::ProcessingError {
            message: format!("training task failed: {}", e),
        })?
    }

    async fn load(&self, result: Vec<TrainingRun>) -> Result<String> {
        let paths = run_file_paths(&self.job);
        for (run, path) in result.iter().zip(&paths) {
            self.storage
                .write_file(path, render_run_values(&run.best_per_generation).as_bytes())
                .await?;
            tracing::debug!("Wrote {} generations to {}", run.generations(), path);
        }

        tracing::info!(
            "📁 {} run file(s) written to {}",
            result.len(),
            self.job.output_dir
        );
        Ok(self.job.output_dir.clone())
    }
}
