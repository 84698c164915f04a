use crate::core::aggregate::{aggregate_runs, parse_run_values, render_curves_csv, RunNamePattern};
use crate::core::{AveragedCurve, Pipeline, RunSeries, Storage};
use crate::utils::error::{EvalError, Result};

#[derive(Debug, Clone)]
pub struct AggregateJob {
    pub run_files: Vec<String>,
    /// Regex with one capture group for the parameter token.
    pub pattern: String,
    /// CSV destination; printed to stdout when unset.
    pub output_file: Option<String>,
    pub json_file: Option<String>,
}

/// Reads run files, averages them per parameter, exports the curves.
pub struct AggregatePipeline<S: Storage> {
    storage: S,
    job: AggregateJob,
    pattern: RunNamePattern,
}

impl<S: Storage> AggregatePipeline<S> {
    pub fn new(storage: S, job: AggregateJob) -> Result<Self> {
        let pattern = RunNamePattern::new(&job.pattern)?;
        Ok(Self {
            storage,
            job,
            pattern,
        })
    }
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for AggregatePipeline<S> {
    type Extracted = Vec<RunSeries>;
    type Transformed = Vec<AveragedCurve>;

    fn name(&self) -> &str {
        "aggregate"
    }

    async fn extract(&self) -> Result<Vec<RunSeries>> {
        if self.job.run_files.is_empty() {
            return Err(EvalError::ValidationError {
                message: "no run files given".to_string(),
            });
        }

        let mut runs = Vec::with_capacity(self.job.run_files.len());
        for path in &self.job.run_files {
            let parameter = self.pattern.parameter_of(path)?;
            let bytes = self.storage.read_file(path).await?;
            let text = String::from_utf8(bytes).map_err(|e| EvalError::Parse {
                source_name: path.clone(),
                line: 0,
                message: format!("not valid UTF-8: {}", e),
            })?;
            let values = parse_run_values(path, &text)?;
            runs.push(RunSeries {
                source: path.clone(),
                parameter,
                values,
            });
        }

        tracing::info!("📋 Read {} run file(s)", runs.len());
        Ok(runs)
    }

    async fn transform(&self, data: Vec<RunSeries>) -> Result<Vec<AveragedCurve>> {
        let curves = aggregate_runs(data)?;
        for curve in &curves {
            tracing::info!(
                "📈 {}: {} repetition(s), {} generation(s), final average {:.2}",
                curve.parameter,
                curve.repetitions,
                curve.values.len(),
                curve.values.last().copied().unwrap_or(0.0)
            );
        }
        Ok(curves)
    }

    async fn load(&self, result: Vec<AveragedCurve>) -> Result<String> {
        let table = render_curves_csv(&result)?;

        if let Some(json_file) = &self.job.json_file {
            let json = serde_json::to_string_pretty(&result)?;
            self.storage.write_file(json_file, json.as_bytes()).await?;
            tracing::info!("📁 Curves written to {}", json_file);
        }

        match &self.job.output_file {
            Some(output_file) => {
                self.storage.write_file(output_file, table.as_bytes()).await?;
                Ok(output_file.clone())
            }
            None => {
                print!("{}", table);
                Ok("stdout".to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::aggregate::DEFAULT_RUN_PATTERN;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        async fn put(&self, path: &str, data: &str) {
            self.files
                .lock()
                .await
                .insert(path.to_string(), data.as_bytes().to_vec());
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            self.files.lock().await.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                EvalError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    fn job(files: &[&str]) -> AggregateJob {
        AggregateJob {
            run_files: files.iter().map(|f| f.to_string()).collect(),
            pattern: DEFAULT_RUN_PATTERN.to_string(),
            output_file: Some("summary.csv".to_string()),
            json_file: None,
        }
    }

    #[tokio::test]
    async fn test_aggregate_end_to_end() {
        let storage = MockStorage::default();
        storage.put("runs/res_10_0", "1\n4\n9\n").await;
        storage.put("runs/res_10_1", "3\n6\n9\n").await;
        storage.put("runs/res_50_0", "5\n7\n").await;

        let mut aggregate_job = job(&["runs/res_10_0", "runs/res_50_0", "runs/res_10_1"]);
        aggregate_job.json_file = Some("curves.json".to_string());
        let pipeline = AggregatePipeline::new(storage.clone(), aggregate_job).unwrap();

        let runs = pipeline.extract().await.unwrap();
        assert_eq!(runs[1].parameter, "50");

        let curves = pipeline.transform(runs).await.unwrap();
        assert_eq!(curves[0].values, vec![2.0, 5.0, 9.0]);

        assert_eq!(pipeline.load(curves).await.unwrap(), "summary.csv");
        let table = storage.get_file("summary.csv").await.unwrap();
        assert_eq!(
            String::from_utf8(table).unwrap(),
            "generation,10,50\n0,2,5\n1,5,7\n2,9,\n"
        );

        let json: serde_json::Value =
            serde_json::from_slice(&storage.get_file("curves.json").await.unwrap()).unwrap();
        assert_eq!(json[0]["parameter"], "10");
        assert_eq!(json[0]["repetitions"], 2);
    }

    #[tokio::test]
    async fn test_unequal_lengths_within_group_fail() {
        let storage = MockStorage::default();
        storage.put("res_a_0", "1\n2\n").await;
        storage.put("res_a_1", "1\n").await;

        let pipeline = AggregatePipeline::new(storage, job(&["res_a_0", "res_a_1"])).unwrap();
        let runs = pipeline.extract().await.unwrap();
        assert!(matches!(
            pipeline.transform(runs).await,
            Err(EvalError::SeriesLengthMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_unmatched_file_name_fails_extract() {
        let storage = MockStorage::default();
        storage.put("notes.txt", "1\n").await;

        let pipeline = AggregatePipeline::new(storage, job(&["notes.txt"])).unwrap();
        assert!(matches!(
            pipeline.extract().await,
            Err(EvalError::FileNameMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_malformed_run_file_fails_extract() {
        let storage = MockStorage::default();
        storage.put("res_a_0", "1\ntwo\n").await;

        let pipeline = AggregatePipeline::new(storage, job(&["res_a_0"])).unwrap();
        assert!(matches!(
            pipeline.extract().await,
            Err(EvalError::Parse { line: 2, .. })
        ));
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let mut bad = job(&["res_a_0"]);
        bad.pattern = "res_[a-z]+".to_string();
        assert!(AggregatePipeline::new(MockStorage::default(), bad).is_err());
    }
}
