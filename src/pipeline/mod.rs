mod options;
mod run;

pub use options::PipelineOptions;
pub use run::{AggregateUnits, AggregationReport};
