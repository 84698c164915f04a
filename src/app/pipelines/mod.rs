pub mod aggregate_pipeline;
pub mod greedy_pipeline;
pub mod train_pipeline;

pub use aggregate_pipeline::{AggregateJob, AggregatePipeline};
pub use greedy_pipeline::{GreedyJob, GreedyPipeline, GreedyReport, OutputFormat};
pub use train_pipeline::{run_file_name, run_file_paths, TrainJob, TrainPipeline};
