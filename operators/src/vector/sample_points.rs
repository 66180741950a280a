use gdal::raster::RasterBand;
use gdal::spatial_ref::SpatialRef;
use gdal::vector::{Feature, FieldDefn, Geometry, LayerAccess, LayerOptions, OGRFieldType, OGRwkbGeometryType};
use gdal::{Dataset, DriverManager};
use geoutils_datatypes::primitives::Coordinate2D;
use geoutils_datatypes::raster::{GeoTransform, RasterMetadata};
use geoutils_datatypes::util::gdal::band_no_data_value;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use snafu::ensure;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error;
use crate::util::Result;
use crate::util::gdal::open_raster;

pub const DEFAULT_MAX_BATCHES: usize = 100;
const MIN_BATCH_SIZE: usize = 1000;
const BATCH_GROWTH_FACTOR: f64 = 1.5;

/// Selects a band whose values are sampled at each point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BandSelector {
    /// 1-based band index. The column is named after the band description, else `band<n>`.
    Index(usize),
    /// Band description, compared case-insensitively.
    Name(String),
    /// 1-based band index with an explicit column name.
    Named(usize, String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum SamplingMode {
    /// A regular grid of points with `spacing` units between neighbours.
    Fishnet { spacing: f64 },
    /// Uniformly distributed points. Candidates are drawn in batches until `n_points`
    /// valid points are found.
    Random {
        n_points: usize,
        min_spacing: Option<f64>,
        seed: Option<u64>,
        /// Defaults to `max(2 * n_points, 1000)`.
        batch_size: Option<usize>,
        max_batches: usize,
    },
}

impl SamplingMode {
    pub fn random(n_points: usize) -> Self {
        Self::Random {
            n_points,
            min_spacing: None,
            seed: None,
            batch_size: None,
            max_batches: DEFAULT_MAX_BATCHES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointSamplingOptions {
    /// Defaults to the first band.
    pub bands: Vec<BandSelector>,
    pub mode: SamplingMode,
    /// Writes the points as a vector file if set.
    pub output_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplePoint {
    pub x: f64,
    pub y: f64,
    /// One value per column.
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampledPoints {
    /// The coordinate system of the raster as WKT.
    pub spatial_ref: Option<String>,
    pub columns: Vec<String>,
    pub points: Vec<SamplePoint>,
}

/// Vector formats the sampled points can be written as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VectorFormat {
    GeoPackage,
    Shapefile,
    GeoJson,
    Csv,
}

impl VectorFormat {
    fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .map(|extension| extension.to_string_lossy().to_ascii_lowercase());

        match extension.as_deref() {
            Some("gpkg") => Ok(Self::GeoPackage),
            Some("shp") => Ok(Self::Shapefile),
            Some("geojson" | "json") => Ok(Self::GeoJson),
            Some("csv") => Ok(Self::Csv),
            _ => error::UnsupportedVectorFormat { path }.fail(),
        }
    }

    fn driver_name(self) -> &'static str {
        match self {
            Self::GeoPackage => "GPKG",
            Self::Shapefile => "ESRI Shapefile",
            Self::GeoJson => "GeoJSON",
            Self::Csv => "CSV",
        }
    }

    fn layer_options(self) -> Option<&'static [&'static str]> {
        match self {
            Self::Csv => Some(&["GEOMETRY=AS_XY"]),
            _ => None,
        }
    }
}

/// Resolves the band selectors to 1-based band indices and column names.
fn resolve_bands(
    selectors: &[BandSelector],
    metadata: &RasterMetadata,
) -> Result<Vec<(usize, String)>> {
    let default_selectors = [BandSelector::Index(1)];
    let selectors = if selectors.is_empty() {
        &default_selectors[..]
    } else {
        selectors
    };

    let check_index = |index: usize| -> Result<usize> {
        ensure!(
            (1..=metadata.band_count).contains(&index),
            error::InvalidBandIndex {
                index,
                band_count: metadata.band_count
            }
        );
        Ok(index)
    };

    let mut bands = Vec::with_capacity(selectors.len());
    let mut unknown_names = Vec::new();

    for selector in selectors {
        match selector {
            BandSelector::Index(index) => {
                let index = check_index(*index)?;
                let description = metadata.band_descriptions[index - 1].trim();
                let column = if description.is_empty() {
                    format!("band{index}")
                } else {
                    description.to_string()
                };
                bands.push((index, column));
            }
            BandSelector::Name(name) => {
                let position = metadata
                    .band_descriptions
                    .iter()
                    .position(|description| description.eq_ignore_ascii_case(name));
                match position {
                    Some(position) => bands.push((position + 1, name.clone())),
                    None => unknown_names.push(name.clone()),
                }
            }
            BandSelector::Named(index, name) => {
                bands.push((check_index(*index)?, name.clone()));
            }
        }
    }

    ensure!(
        unknown_names.is_empty(),
        error::BandNameNotFound {
            names: unknown_names
        }
    );

    Ok(bands)
}

/// Reads single pixel values at map coordinates.
struct PixelSampler<'a> {
    dataset: &'a Dataset,
    geo_transform: GeoTransform,
    width: usize,
    height: usize,
}

impl<'a> PixelSampler<'a> {
    fn new(dataset: &'a Dataset, metadata: &RasterMetadata) -> Self {
        Self {
            dataset,
            geo_transform: metadata.grid.geo_transform,
            width: metadata.grid.width,
            height: metadata.grid.height,
        }
    }

    /// The pixel that contains `coordinate`, `None` outside of the raster.
    fn pixel(&self, coordinate: Coordinate2D) -> Option<(usize, usize)> {
        let (column, row) = self.geo_transform.coordinate_to_pixel(coordinate)?;
        let (column, row) = (column.floor(), row.floor());

        if column < 0. || row < 0. || column >= self.width as f64 || row >= self.height as f64 {
            return None;
        }

        Some((column as usize, row as usize))
    }

    fn band(&self, band_index: usize) -> Result<RasterBand<'a>> {
        Ok(self.dataset.rasterband(band_index)?)
    }

    fn value(band: &RasterBand, (column, row): (usize, usize)) -> Result<f64> {
        let buffer = band.read_as::<f64>((column as isize, row as isize), (1, 1), (1, 1), None)?;
        Ok(buffer.data()[0])
    }

    /// Whether `coordinate` lies on a pixel of `band` that is neither NaN nor no data.
    fn is_valid(&self, band: &RasterBand, coordinate: Coordinate2D) -> Result<bool> {
        let Some(pixel) = self.pixel(coordinate) else {
            return Ok(false);
        };

        let value = Self::value(band, pixel)?;

        Ok(!value.is_nan() && band_no_data_value(band).is_none_or(|no_data| value != no_data))
    }
}

/// Creates points over the raster at `raster_path` and samples the selected bands at them.
///
/// Only points on valid pixels of the first selected band are kept.
///
pub fn generate_points_from_raster(
    raster_path: &Path,
    options: PointSamplingOptions,
) -> Result<SampledPoints> {
    let output_format = options
        .output_path
        .as_deref()
        .map(VectorFormat::from_path)
        .transpose()?;

    match options.mode {
        SamplingMode::Fishnet { spacing } => ensure_valid_spacing(spacing)?,
        SamplingMode::Random {
            min_spacing: Some(min_spacing),
            ..
        } => ensure!(
            min_spacing.is_finite() && min_spacing >= 0.,
            error::InvalidSpacing {
                spacing: min_spacing
            }
        ),
        SamplingMode::Random { .. } => {}
    }

    let (dataset, metadata) = open_raster(raster_path)?;
    let bands = resolve_bands(&options.bands, &metadata)?;

    let sampler = PixelSampler::new(&dataset, &metadata);
    let reference_band = sampler.band(bands[0].0)?;

    let coordinates = match options.mode {
        SamplingMode::Fishnet { spacing } => {
            fishnet_points(&sampler, &reference_band, &metadata, spacing)?
        }
        SamplingMode::Random {
            n_points,
            min_spacing,
            seed,
            batch_size,
            max_batches,
        } => random_points(
            &sampler,
            &reference_band,
            &metadata,
            RandomSampling {
                n_points,
                min_spacing,
                seed,
                batch_size: batch_size.unwrap_or_else(|| (2 * n_points).max(MIN_BATCH_SIZE)),
                max_batches,
            },
        )?,
    };

    let sampled_bands = bands
        .iter()
        .map(|(band_index, _)| sampler.band(*band_index))
        .collect::<Result<Vec<_>>>()?;

    let mut points = Vec::with_capacity(coordinates.len());
    for coordinate in coordinates {
        let Some(pixel) = sampler.pixel(coordinate) else {
            continue;
        };

        let values = sampled_bands
            .iter()
            .map(|band| PixelSampler::value(band, pixel))
            .collect::<Result<Vec<_>>>()?;

        points.push(SamplePoint {
            x: coordinate.x,
            y: coordinate.y,
            values,
        });
    }

    info!(
        "Sampled {} point(s) from {}",
        points.len(),
        raster_path.display()
    );

    let sampled_points = SampledPoints {
        spatial_ref: metadata.grid.spatial_reference.clone(),
        columns: bands.into_iter().map(|(_, column)| column).collect(),
        points,
    };

    if let (Some(output_path), Some(format)) = (options.output_path.as_deref(), output_format) {
        write_points(&sampled_points, output_path, format)?;
    }

    Ok(sampled_points)
}

fn ensure_valid_spacing(spacing: f64) -> Result<()> {
    ensure!(
        spacing.is_finite() && spacing > 0.,
        error::InvalidSpacing { spacing }
    );
    Ok(())
}

/// Points from the lower left corner of the raster in steps of `spacing`, column by column.
fn fishnet_points(
    sampler: &PixelSampler,
    reference_band: &RasterBand,
    metadata: &RasterMetadata,
    spacing: f64,
) -> Result<Vec<Coordinate2D>> {
    let bounds = metadata.grid.bounds();
    let lower_left = bounds.lower_left();

    let steps_x = (bounds.size_x() / spacing).floor() as usize;
    let steps_y = (bounds.size_y() / spacing).floor() as usize;

    let mut points = Vec::new();
    for i in 0..=steps_x {
        for j in 0..=steps_y {
            let coordinate = Coordinate2D::new(
                lower_left.x + i as f64 * spacing,
                lower_left.y + j as f64 * spacing,
            );

            if sampler.is_valid(reference_band, coordinate)? {
                points.push(coordinate);
            }
        }
    }

    debug!(
        "Fishnet with spacing {spacing} has {} valid point(s) out of {}",
        points.len(),
        (steps_x + 1) * (steps_y + 1)
    );

    Ok(points)
}

struct RandomSampling {
    n_points: usize,
    min_spacing: Option<f64>,
    seed: Option<u64>,
    batch_size: usize,
    max_batches: usize,
}

fn random_points(
    sampler: &PixelSampler,
    reference_band: &RasterBand,
    metadata: &RasterMetadata,
    sampling: RandomSampling,
) -> Result<Vec<Coordinate2D>> {
    let mut rng = match sampling.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let bounds = metadata.grid.bounds();
    let (lower_left, upper_right) = (bounds.lower_left(), bounds.upper_right());

    let mut points: Vec<Coordinate2D> = Vec::with_capacity(sampling.n_points);
    let mut batch_size = sampling.batch_size;

    for batch in 0..sampling.max_batches {
        if points.len() >= sampling.n_points {
            break;
        }

        debug!(
            "Drawing batch {batch} of {batch_size} candidates, {} point(s) found so far",
            points.len()
        );

        for _ in 0..batch_size {
            let candidate = Coordinate2D::new(
                rng.random_range(lower_left.x..upper_right.x),
                rng.random_range(lower_left.y..upper_right.y),
            );

            if !sampler.is_valid(reference_band, candidate)? {
                continue;
            }

            let too_close = sampling.min_spacing.is_some_and(|min_spacing| {
                points
                    .iter()
                    .any(|point| point.euclidean_distance(&candidate) < min_spacing)
            });
            if too_close {
                continue;
            }

            points.push(candidate);
            if points.len() >= sampling.n_points {
                break;
            }
        }

        batch_size = (batch_size as f64 * BATCH_GROWTH_FACTOR) as usize;
    }

    ensure!(
        points.len() >= sampling.n_points,
        error::NotEnoughValidPoints {
            found: points.len(),
            requested: sampling.n_points
        }
    );

    Ok(points)
}

fn write_points(sampled_points: &SampledPoints, path: &Path, format: VectorFormat) -> Result<()> {
    let driver = DriverManager::get_driver_by_name(format.driver_name())?;
    if path.exists() {
        driver.delete(path)?;
    }

    let mut dataset = driver.create_vector_only(path)?;

    let spatial_ref = sampled_points
        .spatial_ref
        .as_deref()
        .map(SpatialRef::from_wkt)
        .transpose()?;

    let layer_name = path
        .file_stem()
        .map_or_else(|| "points".into(), |stem| stem.to_string_lossy());

    let layer = dataset.create_layer(LayerOptions {
        name: &layer_name,
        srs: spatial_ref.as_ref(),
        ty: OGRwkbGeometryType::wkbPoint,
        options: format.layer_options(),
    })?;

    for column in &sampled_points.columns {
        FieldDefn::new(column, OGRFieldType::OFTReal)?.add_to_layer(&layer)?;
    }

    for point in &sampled_points.points {
        let mut geometry = Geometry::empty(OGRwkbGeometryType::wkbPoint)?;
        geometry.add_point_2d((point.x, point.y));

        let mut feature = Feature::new(layer.defn())?;
        feature.set_geometry(geometry)?;
        // fields are created in column order, so indices match
        for (field_index, value) in point.values.iter().enumerate() {
            feature.set_field_double(field_index, *value)?;
        }
        feature.create(&layer)?;
    }

    info!(
        "Wrote {} point(s) to {}",
        sampled_points.points.len(),
        path.display()
    );

    Ok(())
}
