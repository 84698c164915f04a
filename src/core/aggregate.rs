//! Averaging of repeated training runs.
//!
//! A run file holds one best value per generation, one integer per line. Runs
//! are grouped by a parameter token taken from the file name and averaged
//! pointwise within each group.

use std::collections::BTreeMap;
use std::path::Path;

use csv::WriterBuilder;
use regex::Regex;

use crate::domain::model::{AveragedCurve, RunSeries};
use crate::utils::error::{EvalError, Result};
use crate::utils::validation::validate_run_pattern;

/// Matches `res_<param>_<repetition>`.
pub const DEFAULT_RUN_PATTERN: &str = r"^res_([^_]+)_[^_]+$";

/// Extracts the grouping parameter from run file names.
#[derive(Debug, Clone)]
pub struct RunNamePattern {
    regex: Regex,
}

impl RunNamePattern {
    pub fn new(pattern: &str) -> Result<Self> {
        validate_run_pattern("pattern", pattern)?;
        let regex = Regex::new(pattern).map_err(|e| EvalError::ConfigError {
            message: format!("invalid run pattern '{}': {}", pattern, e),
        })?;
        Ok(Self { regex })
    }

    /// Matches against the file name component only, so directories may hold underscores.
    pub fn parameter_of(&self, path: &str) -> Result<String> {
        let file_name = Path::new(path)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(path);

        self.regex
            .captures(file_name)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| EvalError::FileNameMismatch {
                file_name: file_name.to_string(),
                pattern: self.regex.as_str().to_string(),
            })
    }
}

impl Default for RunNamePattern {
    fn default() -> Self {
        Self {
            regex: Regex::new(DEFAULT_RUN_PATTERN).expect("default run pattern is valid"),
        }
    }
}

/// Parses one run file. A single trailing newline is accepted; any other
/// blank or non-integer line is a parse error.
pub fn parse_run_values(source_name: &str, text: &str) -> Result<Vec<u64>> {
    let body = text.strip_suffix('\n').unwrap_or(text);
    let body = body.strip_suffix('\r').unwrap_or(body);
    if body.is_empty() {
        return Ok(Vec::new());
    }

    body.split('\n')
        .enumerate()
        .map(|(index, line)| {
            let line = line.trim_end_matches('\r').trim();
            line.parse::<u64>().map_err(|e| EvalError::Parse {
                source_name: source_name.to_string(),
                line: index as u64 + 1,
                message: format!("'{}' is not a non-negative integer: {}", line, e),
            })
        })
        .collect()
}

/// Renders run values in the format [`parse_run_values`] reads.
pub fn render_run_values(values: &[u64]) -> String {
    let mut out = String::with_capacity(values.len() * 8);
    for value in values {
        out.push_str(&value.to_string());
        out.push('\n');
    }
    out
}

/// Groups runs by parameter, in lexicographic parameter order.
pub fn group_by_parameter(runs: Vec<RunSeries>) -> BTreeMap<String, Vec<RunSeries>> {
    let mut groups: BTreeMap<String, Vec<RunSeries>> = BTreeMap::new();
    for run in runs {
        groups.entry(run.parameter.clone()).or_default().push(run);
    }
    groups
}

/// Pointwise arithmetic mean over runs that share a parameter.
///
/// Every run in the group must have the same number of generations.
pub fn average_group(parameter: &str, runs: &[RunSeries]) -> Result<AveragedCurve> {
    let Some(first) = runs.first() else {
        return Err(EvalError::ProcessingError {
            message: format!("parameter group '{}' has no runs", parameter),
        });
    };
    let generations = first.values.len();

    let mut sums = vec![0u128; generations];
    for run in runs {
        if run.values.len() != generations {
            return Err(EvalError::SeriesLengthMismatch {
                parameter: parameter.to_string(),
                source_name: run.source.clone(),
                expected: generations,
                actual: run.values.len(),
            });
        }
        for (sum, value) in sums.iter_mut().zip(&run.values) {
            *sum += u128::from(*value);
        }
    }

    let repetitions = runs.len();
    let values = sums
        .into_iter()
        .map(|sum| sum as f64 / repetitions as f64)
        .collect();

    Ok(AveragedCurve {
        parameter: parameter.to_string(),
        repetitions,
        values,
    })
}

/// Groups and averages all runs. Curves come back in parameter order.
pub fn aggregate_runs(runs: Vec<RunSeries>) -> Result<Vec<AveragedCurve>> {
    group_by_parameter(runs)
        .iter()
        .map(|(parameter, group)| average_group(parameter, group))
        .collect()
}

/// Table with one `generation` column and one column per curve. Shorter curves
/// leave empty cells; values are clipped at zero.
pub fn render_curves_csv(curves: &[AveragedCurve]) -> Result<String> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());

    let mut header = vec!["generation".to_string()];
    header.extend(curves.iter().map(|curve| curve.parameter.clone()));
    writer.write_record(&header)?;

    let rows = curves.iter().map(|c| c.values.len()).max().unwrap_or(0);
    for generation in 0..rows {
        let mut row = Vec::with_capacity(curves.len() + 1);
        row.push(generation.to_string());
        for curve in curves {
            row.push(
                curve
                    .values
                    .get(generation)
                    .map(|value| format_value(value.max(0.0)))
                    .unwrap_or_default(),
            );
        }
        writer.write_record(&row)?;
    }

    let bytes = writer.into_inner().map_err(|e| EvalError::ProcessingError {
        message: format!("failed to flush curve writer: {}", e),
    })?;
    String::from_utf8(bytes).map_err(|e| EvalError::ProcessingError {
        message: format!("curve table is not UTF-8: {}", e),
    })
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as u64)
    } else {
        format!("{:.4}", value)
    }
}
