//! IO module for format-specific reading and writing operations.
//!
//! Each format module handles reading and writing for a specific file format.
//!
//! # Format Modules
//!
//! - `csv` - CSV format for population tables
//! - `shp` - Shapefile format for unit polygons and their attributes
//! - `tiff` - GeoTIFF format for categorical and area rasters

pub(crate) mod csv;
pub(crate) mod shp;
pub(crate) mod tiff;

pub use shp::{read_shapefile, save_shapefile, write_unit_shapefile};
