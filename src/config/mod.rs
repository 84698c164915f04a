pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use args::{
    AggregateArgs, CliConfig, Command, GenerateArgs, GeneticArgs, GreedyArgs, PrintCatalogArgs,
    TrainArgs,
};

#[cfg(feature = "cli")]
mod args {
    use clap::{Args, Parser, Subcommand};

    use crate::app::pipelines::{AggregateJob, GreedyJob, OutputFormat, TrainJob};
    use crate::core::aggregate::DEFAULT_RUN_PATTERN;
    use crate::core::generate::{GenerateSpec, DEFAULT_MAX_ATTEMPTS};
    use crate::core::genetic::GeneticConfig;

    #[derive(Debug, Clone, Parser)]
    #[command(name = "knapsack-eval")]
    #[command(about = "Greedy baseline, genetic training and run aggregation for the double knapsack")]
    pub struct CliConfig {
        #[command(subcommand)]
        pub command: Command,

        /// Enable verbose output
        #[arg(short, long, global = true)]
        pub verbose: bool,

        /// Emit logs as JSON lines on stderr
        #[arg(long, global = true)]
        pub json_logs: bool,

        /// Log CPU and memory usage per pipeline phase
        #[arg(long, global = true)]
        pub monitor: bool,
    }

    #[derive(Debug, Clone, Subcommand)]
    pub enum Command {
        /// Generate a random catalog and save it to a file
        Generate(GenerateArgs),
        /// Train the genetic solver on a catalog, writing one run file per repetition
        Train(TrainArgs),
        /// Run the greedy heuristic and print the selected total cost
        Greedy(GreedyArgs),
        /// Average run files per parameter and export the curves
        Aggregate(AggregateArgs),
        /// Load a catalog and print a summary
        PrintCatalog(PrintCatalogArgs),
    }

    #[derive(Debug, Clone, Args)]
    pub struct GenerateArgs {
        /// Output file
        pub output_file: String,

        #[arg(short, long)]
        pub number_of_objects: u64,

        #[arg(short = 'w', long)]
        pub max_weight: u64,

        #[arg(short = 's', long)]
        pub max_size: u64,

        /// Seed for reproducible catalogs
        #[arg(long)]
        pub seed: Option<u64>,

        #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
        pub max_attempts: usize,
    }

    impl GenerateArgs {
        pub fn to_spec(&self) -> GenerateSpec {
            GenerateSpec {
                number_of_objects: self.number_of_objects,
                max_weight: self.max_weight,
                max_size: self.max_size,
                seed: self.seed,
                max_attempts: self.max_attempts,
            }
        }
    }

    #[derive(Debug, Clone, Args)]
    pub struct GeneticArgs {
        /// Generation limit
        #[arg(short = 'l', long, default_value_t = 200)]
        pub generation_limit: usize,

        #[arg(short, long, default_value_t = 100)]
        pub population_size: usize,

        /// Has to be in range [1, population_size]
        #[arg(short, long, default_value_t = 5)]
        pub tournament_size: usize,

        /// Has to be in range [0, 1]
        #[arg(short, long, default_value_t = 0.9)]
        pub crossover_probability: f64,

        /// Per-bit flip probability in range [0, 1]
        #[arg(short, long, default_value_t = 0.01)]
        pub mutation_probability: f64,

        /// Stop when the relative change of the best value is at most epsilon
        #[arg(short, long)]
        pub epsilon: Option<f64>,
    }

    impl GeneticArgs {
        pub fn to_config(&self) -> GeneticConfig {
            GeneticConfig {
                population_size: self.population_size,
                tournament_size: self.tournament_size,
                crossover_probability: self.crossover_probability,
                mutation_probability: self.mutation_probability,
                generation_limit: self.generation_limit,
                epsilon: self.epsilon,
            }
        }
    }

    #[derive(Debug, Clone, Args)]
    pub struct TrainArgs {
        /// Input catalog
        pub input_file: String,

        #[command(flatten)]
        pub genetic: GeneticArgs,

        /// Number of independent repetitions
        #[arg(short, long, default_value_t = 1)]
        pub repetitions: usize,

        /// Parameter token used in run file names
        #[arg(long, default_value = "default")]
        pub label: String,

        #[arg(long, default_value_t = 0)]
        pub seed: u64,

        #[arg(short, long, default_value = "./runs")]
        pub output_dir: String,

        /// Train even if the catalog fits almost entirely into the limits
        #[arg(long)]
        pub skip_difficulty_check: bool,

        /// Worker threads, 0 uses all cores
        #[arg(long, default_value_t = 0)]
        pub workers: usize,
    }

    impl TrainArgs {
        pub fn to_job(&self) -> TrainJob {
            TrainJob {
                catalog_path: self.input_file.clone(),
                label: self.label.clone(),
                repetitions: self.repetitions,
                seed: self.seed,
                genetic: self.genetic.to_config(),
                output_dir: self.output_dir.clone(),
                check_difficulty: !self.skip_difficulty_check,
                workers: self.workers,
            }
        }
    }

    #[derive(Debug, Clone, Args)]
    pub struct GreedyArgs {
        /// Catalog files
        #[arg(required = true)]
        pub catalogs: Vec<String>,

        /// Print a JSON report instead of the bare totals
        #[arg(long)]
        pub json: bool,

        /// Also write the JSON report to this file
        #[arg(long)]
        pub report: Option<String>,

        /// Worker threads, 0 uses all cores
        #[arg(long, default_value_t = 0)]
        pub workers: usize,
    }

    impl GreedyArgs {
        pub fn to_job(&self) -> GreedyJob {
            GreedyJob {
                catalog_paths: self.catalogs.clone(),
                format: if self.json {
                    OutputFormat::Json
                } else {
                    OutputFormat::Text
                },
                report_path: self.report.clone(),
                workers: self.workers,
            }
        }
    }

    #[derive(Debug, Clone, Args)]
    pub struct AggregateArgs {
        /// Run files, one integer per line
        #[arg(required = true)]
        pub run_files: Vec<String>,

        /// File name regex with one capture group for the parameter
        #[arg(long, default_value = DEFAULT_RUN_PATTERN)]
        pub pattern: String,

        /// CSV output file, stdout when omitted
        #[arg(short, long)]
        pub output: Option<String>,

        /// Also write the averaged curves as JSON
        #[arg(long)]
        pub json: Option<String>,
    }

    impl AggregateArgs {
        pub fn to_job(&self) -> AggregateJob {
            AggregateJob {
                run_files: self.run_files.clone(),
                pattern: self.pattern.clone(),
                output_file: self.output.clone(),
                json_file: self.json.clone(),
            }
        }
    }

    #[derive(Debug, Clone, Args)]
    pub struct PrintCatalogArgs {
        /// Input catalog
        pub input_file: String,

        /// Print every item, not just the summary
        #[arg(long)]
        pub items: bool,
    }

}
