//! Shapefile format reading and writing operations.

mod read;
mod write;

pub use read::read_shapefile;
pub use write::{save_shapefile, write_unit_shapefile};
