pub mod aggregate;
pub mod catalog;
pub mod etl;
pub mod generate;
pub mod genetic;
pub mod greedy;
pub mod parallel;

pub use crate::domain::model::{
    AveragedCurve, CapacityLimits, Catalog, Item, LoadedCatalog, RunSeries, SelectionResult,
    TrainingRun,
};
pub use crate::domain::ports::{Pipeline, Storage};
pub use crate::utils::error::Result;
