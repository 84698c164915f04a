use crate::core::generate::GenerateSpec;
use crate::core::genetic::GeneticConfig;
use crate::utils::error::{EvalError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_positive_number, Validate,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A parameter sweep over the genetic solver, read from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub experiment: ExperimentInfo,
    pub catalog: CatalogSource,
    #[serde(default)]
    pub genetic: GeneticConfig,
    pub sweep: SweepConfig,
    pub output: OutputConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSource {
    pub path: String,
    /// When present, a fresh catalog is generated and written to `path` first.
    pub generate: Option<GenerateSpec>,
    #[serde(default)]
    pub skip_difficulty_check: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepParameter {
    PopulationSize,
    TournamentSize,
    CrossoverProbability,
    MutationProbability,
}

impl SweepParameter {
    pub fn as_str(&self) -> &'static str {
        match self {
            SweepParameter::PopulationSize => "population_size",
            SweepParameter::TournamentSize => "tournament_size",
            SweepParameter::CrossoverProbability => "crossover_probability",
            SweepParameter::MutationProbability => "mutation_probability",
        }
    }

    /// Returns `base` with this parameter set to `value`.
    pub fn apply(&self, base: &GeneticConfig, value: f64) -> Result<GeneticConfig> {
        let mut config = base.clone();
        match self {
            SweepParameter::PopulationSize => config.population_size = self.as_count(value)?,
            SweepParameter::TournamentSize => config.tournament_size = self.as_count(value)?,
            SweepParameter::CrossoverProbability => config.crossover_probability = value,
            SweepParameter::MutationProbability => config.mutation_probability = value,
        }
        Ok(config)
    }

    fn as_count(&self, value: f64) -> Result<usize> {
        if !(value >= 0.0) || value.fract() != 0.0 || value > u32::MAX as f64 {
            return Err(EvalError::InvalidConfigValueError {
                field: format!("sweep.values ({})", self.as_str()),
                value: value.to_string(),
                reason: "Value must be a non-negative integer".to_string(),
            });
        }
        Ok(value as usize)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    pub parameter: SweepParameter,
    pub values: Vec<f64>,
    #[serde(default = "default_repetitions")]
    pub repetitions: usize,
    #[serde(default)]
    pub seed: u64,
}

fn default_repetitions() -> usize {
    5
}

/// Token used for a sweep value in run file names. `f64`'s `Display` never
/// emits `_`, so labels stay parseable by the default run pattern.
pub fn value_label(value: f64) -> String {
    value.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub run_dir: String,
    pub summary_file: String,
    pub json_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

impl ExperimentConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EvalError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EvalError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables are left as is.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| EvalError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// One `(label, config)` per sweep value, in the order listed.
    pub fn sweep_configs(&self) -> Result<Vec<(String, GeneticConfig)>> {
        self.sweep
            .values
            .iter()
            .map(|&value| {
                let config = self.sweep.parameter.apply(&self.genetic, value)?;
                Ok((value_label(value), config))
            })
            .collect()
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }
}

impl Validate for ExperimentConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("experiment.name", &self.experiment.name)?;
        validate_path("catalog.path", &self.catalog.path)?;
        if let Some(spec) = &self.catalog.generate {
            spec.validate()?;
        }

        if self.sweep.values.is_empty() {
            return Err(EvalError::MissingConfigError {
                field: "sweep.values".to_string(),
            });
        }
        validate_positive_number("sweep.repetitions", self.sweep.repetitions, 1)?;
        // averaging needs every repetition to run the full generation limit
        if let Some(epsilon) = self.genetic.epsilon {
            return Err(EvalError::InvalidConfigValueError {
                field: "genetic.epsilon".to_string(),
                value: epsilon.to_string(),
                reason: "Early-stopped runs differ in length and cannot be averaged".to_string(),
            });
        }

        let mut labels = std::collections::HashSet::new();
        for (label, config) in self.sweep_configs()? {
            config.validate()?;
            if !labels.insert(label.clone()) {
                return Err(EvalError::InvalidConfigValueError {
                    field: "sweep.values".to_string(),
                    value: label,
                    reason: "Duplicate sweep value".to_string(),
                });
            }
        }

        validate_path("output.run_dir", &self.output.run_dir)?;
        validate_path("output.summary_file", &self.output.summary_file)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const BASIC: &str = r#"
[experiment]
name = "mutation-sweep"
description = "Mutation probability sweep"

[catalog]
path = "scenario.txt"

[genetic]
population_size = 50
tournament_size = 4
crossover_probability = 0.9
mutation_probability = 0.01
generation_limit = 100

[sweep]
parameter = "mutation_probability"
values = [0.001, 0.01, 0.1]
repetitions = 3
seed = 7

[output]
run_dir = "./runs"
summary_file = "./summary.csv"
"#;

    #[test]
    fn test_parse_basic_experiment_config() {
        let config = ExperimentConfig::from_toml_str(BASIC).unwrap();

        assert_eq!(config.experiment.name, "mutation-sweep");
        assert_eq!(config.sweep.parameter, SweepParameter::MutationProbability);
        assert_eq!(config.sweep.repetitions, 3);
        assert_eq!(config.genetic.epsilon, None);
        assert!(config.catalog.generate.is_none());
        assert!(!config.catalog.skip_difficulty_check);
        assert!(!config.monitoring_enabled());
        assert!(config.validate().is_ok());

        let sweep = config.sweep_configs().unwrap();
        let labels: Vec<_> = sweep.iter().map(|(label, _)| label.as_str()).collect();
        assert_eq!(labels, vec!["0.001", "0.01", "0.1"]);
        assert_eq!(sweep[2].1.mutation_probability, 0.1);
        assert_eq!(sweep[2].1.population_size, 50);
    }

    #[test]
    fn test_missing_genetic_section_uses_defaults() {
        let content = BASIC.replace("[genetic]", "[unused]");
        let config = ExperimentConfig::from_toml_str(&content).unwrap();
        assert_eq!(config.genetic, GeneticConfig::default());
    }

    #[test]
    fn test_integral_parameter_rejects_fractions() {
        let content = BASIC
            .replace("\"mutation_probability\"", "\"population_size\"")
            .replace("[0.001, 0.01, 0.1]", "[20, 40.5]");
        let config = ExperimentConfig::from_toml_str(&content).unwrap();
        assert!(config.sweep_configs().is_err());
        assert!(config.validate().is_err());

        let content = BASIC
            .replace("\"mutation_probability\"", "\"population_size\"")
            .replace("[0.001, 0.01, 0.1]", "[20, 40]");
        let config = ExperimentConfig::from_toml_str(&content).unwrap();
        let sweep = config.sweep_configs().unwrap();
        assert_eq!(sweep[1].0, "40");
        assert_eq!(sweep[1].1.population_size, 40);
    }

    #[test]
    fn test_invalid_sweep_values_fail_validation() {
        let out_of_range = BASIC.replace("[0.001, 0.01, 0.1]", "[0.5, 1.5]");
        let config = ExperimentConfig::from_toml_str(&out_of_range).unwrap();
        assert!(config.validate().is_err());

        let duplicated = BASIC.replace("[0.001, 0.01, 0.1]", "[0.1, 0.1]");
        let config = ExperimentConfig::from_toml_str(&duplicated).unwrap();
        assert!(config.validate().is_err());

        let empty = BASIC.replace("[0.001, 0.01, 0.1]", "[]");
        let config = ExperimentConfig::from_toml_str(&empty).unwrap();
        assert!(matches!(
            config.validate(),
            Err(EvalError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_epsilon_is_rejected_for_sweeps() {
        let content = BASIC.replace(
            "generation_limit = 100",
            "generation_limit = 100\nepsilon = 0.001",
        );
        let config = ExperimentConfig::from_toml_str(&content).unwrap();
        assert_eq!(config.genetic.epsilon, Some(0.001));

        match config.validate() {
            Err(EvalError::InvalidConfigValueError { field, .. }) => {
                assert_eq!(field, "genetic.epsilon")
            }
            other => panic!("expected epsilon to be rejected, got {:?}", other),
        }
    }

    #[test]
    fn test_generated_catalog_section() {
        let content = BASIC.replace(
            "path = \"scenario.txt\"",
            "path = \"generated.txt\"\n\n[catalog.generate]\nnumber_of_objects = 100\nmax_weight = 500\nmax_size = 400\nseed = 1",
        );
        let config = ExperimentConfig::from_toml_str(&content).unwrap();
        let spec = config.catalog.generate.as_ref().unwrap();
        assert_eq!(spec.number_of_objects, 100);
        assert_eq!(spec.seed, Some(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("KNAPSACK_EVAL_TEST_RUN_DIR", "/tmp/sweep-runs");

        let content = BASIC.replace("./runs", "${KNAPSACK_EVAL_TEST_RUN_DIR}");
        let config = ExperimentConfig::from_toml_str(&content).unwrap();
        assert_eq!(config.output.run_dir, "/tmp/sweep-runs");

        std::env::remove_var("KNAPSACK_EVAL_TEST_RUN_DIR");
    }

    #[test]
    fn test_unknown_parameter_is_parse_error() {
        let content = BASIC.replace("\"mutation_probability\"", "\"learning_rate\"");
        assert!(matches!(
            ExperimentConfig::from_toml_str(&content),
            Err(EvalError::ConfigValidationError { .. })
        ));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(BASIC.as_bytes()).unwrap();

        let config = ExperimentConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.output.summary_file, "./summary.csv");
    }
}
