use std::{collections::BTreeMap, fs, path::{Path, PathBuf}};

use aggreunit::*;
use tempfile::TempDir;

const ND: i64 = -9999;

fn grid(width: usize, height: usize) -> RasterGrid {
    RasterGrid::new(width, height, GeoTransform::new(0.0, height as f64, 1.0, -1.0))
        .with_nodata(ND as f64)
        .with_epsg(4326)
}

fn write_tif(dir: &Path, name: &str, width: usize, height: usize, data: Vec<i64>) -> PathBuf {
    let path = dir.join(name);
    write_raster(&path, &Raster::new(grid(width, height), data), OverwritePolicy::FailIfExists).unwrap();
    path
}

fn write_population(dir: &Path, rows: &[(i64, f64)]) -> PathBuf {
    let path = dir.join("population.csv");
    let mut text = String::from("GID,P_2020\n");
    for (id, pop) in rows {
        text.push_str(&format!("{id},{pop}\n"));
    }
    fs::write(&path, text).unwrap();
    path
}

/// Parse the aggregated `adm_id,P_2020` table.
fn read_aggregated(path: &Path) -> BTreeMap<i64, f64> {
    fs::read_to_string(path).unwrap()
        .lines()
        .skip(1)
        .map(|line| {
            let (id, pop) = line.split_once(',').unwrap();
            (id.trim().parse().unwrap(), pop.trim().parse().unwrap())
        })
        .collect()
}

/// 5x2 block of single-cell units:
///
/// ```text
///  1  2  3  4  5
///  6  7  8  9 10
/// ```
///
/// Density rank: 2, 3, 5, 1, 4, then 6..=10 tied.
struct Block {
    _dir: TempDir,
    job: AggregateUnits,
}

fn block(options: PipelineOptions) -> Block {
    let dir = TempDir::new().unwrap();
    let admin = write_tif(dir.path(), "adm.tif", 5, 2, (1..=10).collect());
    let area = write_tif(dir.path(), "area.tif", 5, 2, vec![1; 10]);
    let population = write_population(dir.path(), &[
        (1, 10.0), (2, 50.0), (3, 40.0), (4, 5.0), (5, 30.0),
        (6, 1.0), (7, 1.0), (8, 1.0), (9, 1.0), (10, 1.0),
    ]);
    let out = dir.path().join("out");
    fs::create_dir_all(&out).unwrap();
    let job = AggregateUnits::new(&admin, &population, &area, &out, options);
    Block { _dir: dir, job }
}

#[test]
fn block_halves_unit_count() {
    let Block { _dir, job } = block(PipelineOptions::default());
    let report = job.run().unwrap();

    assert_eq!(report.units, 10);
    assert_eq!(report.clusters, 5);
    assert_eq!(report.pairing.pairs, 5);
    assert!(report.pairing.reached_target());
    assert_eq!(report.written.len(), 3);

    let labels = read_raster(&job.out_admin_raster).unwrap();
    assert_eq!((labels.width(), labels.height()), (5, 2));
    assert_eq!(labels.data(), &[
        1, 2, 2, 5, 5,
        1, 7, 7, 9, 9,
    ]);
}

#[test]
fn population_is_conserved_and_keyed_by_label() {
    let Block { _dir, job } = block(PipelineOptions::default());
    let report = job.run().unwrap();

    let aggregated = read_aggregated(&job.out_population_table);
    let expected = BTreeMap::from([(1, 11.0), (2, 90.0), (5, 35.0), (7, 2.0), (9, 2.0)]);
    assert_eq!(aggregated, expected);
    assert!((report.population_in - 140.0).abs() < 1e-9);
    assert!((report.population_out - report.population_in).abs() < 1e-9);
}

#[test]
fn shapefile_holds_one_feature_per_label() {
    let Block { _dir, job } = block(PipelineOptions::default());
    job.run().unwrap();

    let shapes = read_shapefile(&job.out_admin_shapefile, &JoinColumns::default()).unwrap();
    let ids: Vec<i64> = shapes.iter().map(|u| u.id()).collect();
    assert_eq!(ids, vec![1, 2, 5, 7, 9]);
    assert_eq!(shapes.get(2).unwrap().population(), Some(90.0));
    assert_eq!(shapes.epsg(), 4326);

    let area: f64 = shapes.iter().map(|u| u.area()).sum();
    assert!((area - 10.0).abs() < 1e-9);
}

#[test]
fn existing_outputs_respect_policy() {
    let Block { _dir, job } = block(PipelineOptions::default());
    job.run().unwrap();
    assert!(job.run().is_err());

    let mut skip = job.clone();
    skip.options.overwrite = OverwritePolicy::SkipIfExists;
    assert!(skip.run().unwrap().written.is_empty());

    let mut overwrite = job.clone();
    overwrite.options.overwrite = OverwritePolicy::Overwrite;
    assert_eq!(overwrite.run().unwrap().written.len(), 3);
}

#[test]
fn admin_shape_is_saved_next_to_raster() {
    let options = PipelineOptions { save_admin_shape: true, ..Default::default() };
    let Block { _dir, job } = block(options);
    let report = job.run().unwrap();

    let path = job.admin_shape_path();
    assert!(report.written.contains(&path));
    let units = read_shapefile(&path, &JoinColumns::default()).unwrap();
    assert_eq!(units.len(), 10);
    assert_eq!(units.get(2).unwrap().density(), 50.0);
}

#[test]
fn sentinel_and_single_unit_are_unchanged() {
    let dir = TempDir::new().unwrap();
    let admin = write_tif(dir.path(), "adm.tif", 2, 1, vec![0, 7]);
    let area = write_tif(dir.path(), "area.tif", 2, 1, vec![1, 1]);
    let population = write_population(dir.path(), &[(0, 0.0), (7, 12.0)]);

    let job = AggregateUnits::new(&admin, &population, &area, dir.path(), PipelineOptions::default());
    let report = job.run().unwrap();

    assert_eq!(report.clusters, 2);
    assert_eq!(report.pairing.pairs, 0);
    assert_eq!(read_raster(&job.out_admin_raster).unwrap().data(), &[0, 7]);
    assert_eq!(read_aggregated(&job.out_population_table), BTreeMap::from([(0, 0.0), (7, 12.0)]));
}

#[test]
fn isolated_zero_area_units_stay_unmerged() {
    // 7..=10 touch nothing but nodata (diagonal contact only) and cover no area
    let dir = TempDir::new().unwrap();
    let admin = write_tif(dir.path(), "adm.tif", 8, 2, vec![
        1, 2, 3, ND, 7, ND, 9, ND,
        4, 5, 6, ND, ND, 8, ND, 10,
    ]);
    let area = write_tif(dir.path(), "area.tif", 8, 2, vec![
        1, 1, 1, ND, 0, ND, 0, ND,
        1, 1, 1, ND, ND, 0, ND, 0,
    ]);
    let population = write_population(dir.path(), &[
        (1, 60.0), (2, 50.0), (3, 40.0), (4, 30.0), (5, 20.0), (6, 10.0),
    ]);

    let job = AggregateUnits::new(&admin, &population, &area, dir.path(), PipelineOptions::default());
    let report = job.run().unwrap();

    assert_eq!(report.pairing.pairs, 3);
    assert_eq!(report.clusters, 7);
    assert!(!report.pairing.reached_target());

    let labels = read_raster(&job.out_admin_raster).unwrap();
    assert_eq!(labels.data(), &[
        1, 1, 3, ND, 7, ND, 9, ND,
        4, 4, 3, ND, ND, 8, ND, 10,
    ]);
}

#[test]
fn nan_population_is_treated_as_zero() {
    let dir = TempDir::new().unwrap();
    let admin = write_tif(dir.path(), "adm.tif", 3, 1, vec![1, 2, 3]);
    let area = write_tif(dir.path(), "area.tif", 3, 1, vec![1, 1, 1]);
    let population = write_population(dir.path(), &[(1, 10.0), (2, f64::NAN), (3, 5.0)]);

    let job = AggregateUnits::new(&admin, &population, &area, dir.path(), PipelineOptions::default());
    let report = job.run().unwrap();

    // rank 1, 3, 2: unit 1 absorbs its only neighbour 2
    assert_eq!(read_raster(&job.out_admin_raster).unwrap().data(), &[1, 1, 3]);
    assert_eq!(read_aggregated(&job.out_population_table), BTreeMap::from([(1, 10.0), (3, 5.0)]));
    assert_eq!(report.population_in, 15.0);
    assert_eq!(report.population_out, 15.0);

    let shapes = read_shapefile(&job.out_admin_shapefile, &JoinColumns::default()).unwrap();
    assert_eq!(shapes.get(1).unwrap().population(), Some(10.0));
}

#[test]
fn raster_round_trip_preserves_labels() {
    let dir = TempDir::new().unwrap();
    let path = write_tif(dir.path(), "adm.tif", 4, 3, vec![
        0, 0, 3, 3,
        1, ND, 3, 7,
        1, 1, 7, 7,
    ]);
    let source = read_raster(&path).unwrap();
    let table = polygonize(&source).unwrap();
    let burned = rasterize(&dissolve(&table), source.grid()).unwrap();

    assert_eq!(burned.data(), source.data());
    let labels: Vec<i64> = table.iter().map(|u| u.id()).collect();
    assert_eq!(labels, vec![0, 1, 3, 7]);
}

#[test]
fn polygonize_to_shapefile() {
    let dir = TempDir::new().unwrap();
    let path = write_tif(dir.path(), "adm.tif", 3, 1, vec![2, 2, 5]);
    let out = dir.path().join("adm.shp");

    let table = raster_to_polygon(&path, Some(&out), OverwritePolicy::FailIfExists).unwrap();
    assert_eq!(table.len(), 2);
    assert!(raster_to_polygon(&path, Some(&out), OverwritePolicy::FailIfExists).is_err());

    let read = read_shapefile(&out, &JoinColumns::default()).unwrap();
    assert_eq!(read.iter().map(|u| u.id()).collect::<Vec<_>>(), vec![2, 5]);
}
