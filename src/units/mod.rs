mod density;
mod join;
mod rank;
mod table;
mod unit;

pub use density::compute_density;
pub use join::{JoinColumns, join_population, join_population_file};
pub use rank::sort_by_density;
pub use table::UnitTable;
pub use unit::AdminUnit;
