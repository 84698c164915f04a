use serde::Serialize;

use crate::core::catalog::CatalogLoader;
use crate::core::greedy::select_many;
use crate::core::parallel::WorkerPool;
use crate::core::{CapacityLimits, LoadedCatalog, Pipeline, SelectionResult, Storage};
use crate::utils::error::{EvalError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// One `total_cost` per line.
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct GreedyJob {
    pub catalog_paths: Vec<String>,
    pub format: OutputFormat,
    /// Also write the JSON report here, relative to storage.
    pub report_path: Option<String>,
    pub workers: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GreedyReport {
    pub source: String,
    pub item_count: usize,
    pub limits: CapacityLimits,
    #[serde(flatten)]
    pub result: SelectionResult,
}

/// Loads catalogs, runs the greedy heuristic on each, prints the totals.
pub struct GreedyPipeline<S: Storage> {
    storage: S,
    job: GreedyJob,
}

impl<S: Storage> GreedyPipeline<S> {
    pub fn new(storage: S, job: GreedyJob) -> Self {
        Self { storage, job }
    }

    /// Text form prints the bare total for a single catalog, `path: total` otherwise.
    pub fn render(&self, reports: &[GreedyReport]) -> Result<String> {
        match self.job.format {
            OutputFormat::Text if reports.len() == 1 => {
                Ok(reports[0].result.total_cost.to_string())
            }
            OutputFormat::Text => Ok(reports
                .iter()
                .map(|report| format!("{}: {}", report.source, report.result.total_cost))
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(reports)?),
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for GreedyPipeline<S> {
    type Extracted = Vec<(String, LoadedCatalog)>;
    type Transformed = Vec<GreedyReport>;

    fn name(&self) -> &str {
        "greedy"
    }

    async fn extract(&self) -> Result<Vec<(String, LoadedCatalog)>> {
        if self.job.catalog_paths.is_empty() {
            return Err(EvalError::ValidationError {
                message: "no catalog files given".to_string(),
            });
        }

        let loader = CatalogLoader::new(&self.storage);
        let mut catalogs = Vec::with_capacity(self.job.catalog_paths.len());
        for path in &self.job.catalog_paths {
            let loaded = loader.load(path).await?;
            catalogs.push((path.clone(), loaded));
        }

        tracing::info!("📋 Loaded {} catalog(s)", catalogs.len());
        Ok(catalogs)
    }

    async fn transform(&self, data: Vec<(String, LoadedCatalog)>) -> Result<Vec<GreedyReport>> {
        let pool = WorkerPool::with_workers(self.job.workers);

        let reports = tokio::task::spawn_blocking(move || {
            let (sources, catalogs): (Vec<String>, Vec<LoadedCatalog>) = data.into_iter().unzip();
            let results = select_many(&catalogs, &pool);

            sources
                .into_iter()
                .zip(catalogs)
                .zip(results)
                .map(|((source, loaded), result)| {
                    Ok(GreedyReport {
                        source,
                        item_count: loaded.catalog.len(),
                        limits: loaded.limits,
                        result: result?,
                    })
                })
                .collect::<Result<Vec<_>>>()
        })
        .await
        .map_err(|e| EvalError::ProcessingError {
            message: format!("greedy selection task failed: {}", e),
        })??;

        for report in &reports {
            tracing::debug!(
                "{}: cost {}, weight {}/{}, size {}/{}, {} of {} items",
                report.source,
                report.result.total_cost,
                report.result.total_weight,
                report.limits.max_weight,
                report.result.total_size,
                report.limits.max_size,
                report.result.selected.len(),
                report.item_count
            );
        }

        Ok(reports)
    }

    async fn load(&self, result: Vec<GreedyReport>) -> Result<String> {
        println!("{}", self.render(&result)?);

        if let Some(report_path) = &self.job.report_path {
            let json = serde_json::to_string_pretty(&result)?;
            self.storage.write_file(report_path, json.as_bytes()).await?;
            tracing::info!("📁 Greedy report written to {}", report_path);
            return Ok(report_path.clone());
        }

        Ok("stdout".to_string())
    }
}
