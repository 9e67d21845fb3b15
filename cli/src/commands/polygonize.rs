use anyhow::Result;

use crate::cli::{Cli, PolygonizeArgs};

pub fn run(_cli: &Cli, args: &PolygonizeArgs) -> Result<()> {
    let table = aggreunit::raster_to_polygon(&args.raster, Some(&args.output), args.overwrite.into())?;
    println!("[polygonize] wrote {} units to {}", table.len(), args.output.display());
    Ok(())
}
