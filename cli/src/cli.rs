use std::path::PathBuf;

/// Density-ranked pairing of administrative units
#[derive(clap::Parser, Debug)]
#[command(name = "aggreunit", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Aggregate admin units by pairing dense neighbours
    Run(RunArgs),

    /// Convert a categorical raster to a shapefile
    Polygonize(PolygonizeArgs),
}

/// Mirrors `aggreunit::OverwritePolicy` for the command line.
#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum Overwrite {
    Fail,
    Overwrite,
    Skip,
}

impl From<Overwrite> for aggreunit::OverwritePolicy {
    fn from(value: Overwrite) -> Self {
        match value {
            Overwrite::Fail => Self::FailIfExists,
            Overwrite::Overwrite => Self::Overwrite,
            Overwrite::Skip => Self::SkipIfExists,
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Admin unit raster (categorical GeoTIFF)
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub admin: PathBuf,

    /// Population table (CSV)
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub population: PathBuf,

    /// Pixel area raster, same grid as the admin raster
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub area: PathBuf,

    /// Output directory, defaults to "."
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub output: Option<PathBuf>,

    /// JSON file with pipeline options; flags below override it
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Population column in the table
    #[arg(long)]
    pub pop_col: Option<String>,

    /// Id column in the table
    #[arg(long)]
    pub id_col: Option<String>,

    /// Ids that never merge (repeatable); replaces the default of 0
    #[arg(long = "exclude")]
    pub excluded: Vec<i64>,

    /// Fraction of units to eliminate
    #[arg(long)]
    pub fraction: Option<f64>,

    /// What to do when an output file already exists
    #[arg(long, value_enum)]
    pub overwrite: Option<Overwrite>,

    /// Also save the raw polygonization next to the admin raster
    #[arg(long)]
    pub save_admin_shape: bool,
}

#[derive(clap::Args, Debug)]
pub struct PolygonizeArgs {
    /// Categorical raster (GeoTIFF)
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub raster: PathBuf,

    /// Output shapefile
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub output: PathBuf,

    /// What to do when the output file already exists
    #[arg(long, value_enum, default_value = "fail")]
    pub overwrite: Overwrite,
}
