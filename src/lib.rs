#![doc = "AggreUnit public API"]
mod aggregate;
mod common;
mod geom;
mod graph;
mod io;
mod pairing;
mod pipeline;
mod raster;
mod units;

#[doc(inline)]
pub use common::OverwritePolicy;

#[doc(inline)]
pub use raster::{GeoTransform, Raster, RasterGrid, polygonize, rasterize, raster_to_polygon, read_area_raster, read_raster, write_raster};

#[cfg(feature = "gdal")]
#[doc(inline)]
pub use raster::{polygonize_gdal, rasterize_gdal};

#[doc(inline)]
pub use units::{AdminUnit, JoinColumns, UnitTable, compute_density, join_population, join_population_file, sort_by_density};

#[doc(inline)]
pub use pairing::{PairingOptions, PairingSummary, pair_units};

#[doc(inline)]
pub use aggregate::{DissolvedTable, DissolvedUnit, aggr_constrained, aggr_table, aggregate_table, dissolve};

#[doc(inline)]
pub use pipeline::{AggregateUnits, AggregationReport, PipelineOptions};

#[doc(inline)]
pub use io::{read_shapefile, save_shapefile, write_unit_shapefile};
