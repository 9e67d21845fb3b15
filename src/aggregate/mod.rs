mod constrained;
mod dissolve;
mod table;

pub use constrained::aggr_constrained;
pub use dissolve::{DissolvedTable, DissolvedUnit, dissolve};
pub use table::{aggr_table, aggregate_table};
