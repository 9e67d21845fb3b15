use std::{collections::BTreeSet, path::Path};

use anyhow::Result;
use aggreunit::{AggregateUnits, PipelineOptions};

use crate::cli::{Cli, RunArgs};

/// Start from the config file (or defaults) and apply any flags given.
fn options(args: &RunArgs) -> Result<PipelineOptions> {
    let mut options = match &args.config {
        Some(path) => PipelineOptions::from_json_file(path)?,
        None => PipelineOptions::default(),
    };
    if let Some(pop) = &args.pop_col { options.columns.population = pop.clone() }
    if let Some(id) = &args.id_col { options.columns.table_id = id.clone() }
    if !args.excluded.is_empty() { options.pairing.excluded = args.excluded.iter().copied().collect::<BTreeSet<_>>() }
    if let Some(fraction) = args.fraction { options.pairing.target_fraction = fraction }
    if let Some(overwrite) = args.overwrite { options.overwrite = overwrite.into() }
    if args.save_admin_shape { options.save_admin_shape = true }
    Ok(options)
}

pub fn run(_cli: &Cli, args: &RunArgs) -> Result<()> {
    let out_dir = args.output.as_deref().unwrap_or(Path::new("."));
    std::fs::create_dir_all(out_dir)?;

    let job = AggregateUnits::new(&args.admin, &args.population, &args.area, out_dir, options(args)?);
    log::info!("[run] writing outputs to {}", out_dir.display());
    let report = job.run()?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
