use gdal::raster::rasterize;
use gdal::spatial_ref::{AxisMappingStrategy, CoordTransform, SpatialRef};
use gdal::vector::{Geometry, Layer, LayerAccess, OGRFieldType};
use gdal::{Dataset, DriverManager};
use geoutils_datatypes::call_with_pixel_type;
use geoutils_datatypes::raster::{GeoTransform, GridDefinition, Pixel, RasterDataType};
use serde::{Deserialize, Serialize};
use snafu::{OptionExt, ensure};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{self, Error};
use crate::raster::{Compression, DEFAULT_BLOCK_SIZE, GeoTiffOptions, GeoTiffProfile};
use crate::util::Result;
use crate::util::gdal::{GdalNumThreads, open_vector, write_via_intermediate_file};
use crate::util::output_path::{RASTERIZATION_SUFFIX, derive_output_path_with_extension};

/// Number of points added along each edge when bounds are transformed.
const DENSIFY_POINTS: i32 = 21;

/// Burned into every covered pixel if no attribute is given.
const CONSTANT_BURN_VALUE: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterizeOptions {
    /// One band per attribute. Without attributes a single band of ones is burned.
    pub attributes: Vec<String>,
    pub data_type: Option<RasterDataType>,
    pub no_data: Option<f64>,
    /// Target coordinate system as user input, e.g. `EPSG:3857`. Defaults to the one of
    /// the layer.
    pub spatial_ref: Option<String>,
    /// Defaults to `<input stem>_rasterized.tif`.
    pub output_path: Option<PathBuf>,
    pub block_size: usize,
    pub tiled: bool,
    pub compression: Option<Compression>,
    pub num_threads: GdalNumThreads,
}

impl Default for RasterizeOptions {
    fn default() -> Self {
        Self {
            attributes: Vec::new(),
            data_type: None,
            no_data: None,
            spatial_ref: None,
            output_path: None,
            block_size: DEFAULT_BLOCK_SIZE,
            tiled: true,
            compression: None,
            num_threads: GdalNumThreads::AllCpus,
        }
    }
}

/// Chooses the pixel type and no data value of the rasterized output.
///
/// Without any hint, integer attributes and the constant burn value become `int32` with
/// `-1` and everything else `float32` with `-9999`. A given no data value alone selects
/// `float32`. A given pixel type alone gets its default no data value, which only exists
/// for `uint8`, `int32` and `float32`.
///
pub fn infer_data_type(
    data_type: Option<RasterDataType>,
    no_data: Option<f64>,
    first_field_type: Option<OGRFieldType::Type>,
) -> Result<(RasterDataType, f64)> {
    match (data_type, no_data) {
        (None, None) => match first_field_type {
            None | Some(OGRFieldType::OFTInteger | OGRFieldType::OFTInteger64) => {
                Ok((RasterDataType::I32, -1.0))
            }
            Some(_) => Ok((RasterDataType::F32, -9999.0)),
        },
        (None, Some(no_data)) => Ok((RasterDataType::F32, no_data)),
        (Some(data_type), Some(no_data)) => Ok((data_type, no_data)),
        (Some(RasterDataType::U8), None) => Ok((RasterDataType::U8, 255.0)),
        (Some(RasterDataType::I32), None) => Ok((RasterDataType::I32, -1.0)),
        (Some(RasterDataType::F32), None) => Ok((RasterDataType::F32, -9999.0)),
        (Some(data_type), None) => Err(Error::UnsupportedDatatype {
            data_type: data_type.to_string(),
        }),
    }
}

fn traditional_gis_order(mut spatial_ref: SpatialRef) -> SpatialRef {
    spatial_ref.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
    spatial_ref
}

/// Transforms from the layer's coordinate system to the output's and back.
struct Reprojection {
    forward: CoordTransform,
    inverse: CoordTransform,
}

/// Burns the features of the first layer of the vector file at `input` into a GeoTIFF
/// with square pixels of `resolution` units.
///
/// The raster covers the extent of the layer. It is written block by block: each block
/// only looks at the features whose extent intersects it, and blocks without features
/// are filled with no data.
///
/// Returns the path of the written raster.
///
pub fn rasterize_vector(
    input: &Path,
    resolution: f64,
    options: RasterizeOptions,
) -> Result<PathBuf> {
    ensure!(
        resolution.is_finite() && resolution > 0.0,
        error::InvalidResolution { resolution }
    );

    let dataset = open_vector(input)?;
    let mut layer = dataset.layer(0)?;

    let fields: Vec<(String, OGRFieldType::Type)> = layer
        .defn()
        .fields()
        .map(|field| (field.name(), field.field_type()))
        .collect();

    let mut field_indices = Vec::with_capacity(options.attributes.len());
    for attribute in &options.attributes {
        let field_index = fields
            .iter()
            .position(|(name, _)| name == attribute)
            .context(error::AttributeNotFound {
                attribute,
                path: input,
            })?;
        field_indices.push(field_index);
    }

    let first_field_type = field_indices.first().map(|&index| fields[index].1);
    let (data_type, no_data) =
        infer_data_type(options.data_type, options.no_data, first_field_type)?;

    ensure!(
        layer.feature_count() > 0,
        error::EmptyVectorLayer { path: input }
    );

    let source_spatial_ref = layer.spatial_ref().map(traditional_gis_order);
    let target_spatial_ref = match options.spatial_ref.as_deref() {
        Some(definition) => Some(traditional_gis_order(SpatialRef::from_definition(
            definition,
        )?)),
        None => source_spatial_ref.clone(),
    };

    let reprojection = match (&source_spatial_ref, &target_spatial_ref) {
        (Some(source), Some(target)) if source != target => Some(Reprojection {
            forward: CoordTransform::new(source, target)?,
            inverse: CoordTransform::new(target, source)?,
        }),
        _ => None,
    };

    let envelope = layer.get_extent()?;
    let mut bounds = [envelope.MinX, envelope.MinY, envelope.MaxX, envelope.MaxY];
    if let Some(reprojection) = &reprojection {
        bounds = reprojection
            .forward
            .transform_bounds(&bounds, DENSIFY_POINTS)?;
    }
    let [min_x, min_y, max_x, max_y] = bounds;

    let width = ((max_x - min_x) / resolution).ceil().max(1.) as usize;
    let height = ((max_y - min_y) / resolution).ceil().max(1.) as usize;

    let grid = GridDefinition::new(
        target_spatial_ref
            .as_ref()
            .map(SpatialRef::to_wkt)
            .transpose()?,
        GeoTransform::new_with_coordinate_x_y(min_x, resolution, max_y, -resolution),
        width,
        height,
    );

    let profile = GeoTiffProfile::new(
        grid,
        options.attributes.len().max(1),
        data_type,
        Some(no_data),
        &GeoTiffOptions {
            compression: options.compression,
            tiled: options.tiled,
            block_size: options.block_size,
            big_tiff: false,
            num_threads: options.num_threads,
        },
    )?
    .with_band_descriptions(options.attributes.clone());

    let output_path = options.output_path.clone().unwrap_or_else(|| {
        derive_output_path_with_extension(input, RASTERIZATION_SUFFIX, "tif")
    });

    info!(
        "Rasterizing {} ({} feature(s)) at resolution {resolution} into {} ({width}x{height} pixels, {data_type}, no data {no_data})",
        input.display(),
        layer.feature_count(),
        output_path.display()
    );

    write_via_intermediate_file(&output_path, |path| {
        call_with_pixel_type!(data_type, P => write_rasterized::<P>(
            &mut layer,
            &field_indices,
            reprojection.as_ref(),
            &profile,
            no_data,
            path,
        ))
    })?;

    Ok(output_path)
}

fn write_rasterized<P: Pixel>(
    layer: &mut Layer,
    field_indices: &[usize],
    reprojection: Option<&Reprojection>,
    profile: &GeoTiffProfile,
    no_data: f64,
    path: &Path,
) -> Result<Dataset> {
    let output = profile.create_dataset::<P>(path)?;
    let mem_driver = DriverManager::get_driver_by_name("MEM")?;

    for window in profile.block_windows() {
        let block_transform = profile.grid.geo_transform.window_transform(&window);
        let block_bounds = block_transform.bounds(window.width, window.height);

        let mut filter = [
            block_bounds.lower_left().x,
            block_bounds.lower_left().y,
            block_bounds.upper_right().x,
            block_bounds.upper_right().y,
        ];
        if let Some(reprojection) = reprojection {
            filter = reprojection
                .inverse
                .transform_bounds(&filter, DENSIFY_POINTS)?;
        }
        layer.set_spatial_filter_rect(filter[0], filter[1], filter[2], filter[3]);

        let (geometries, burn_values) = collect_features(
            layer,
            field_indices,
            reprojection.map(|r| &r.forward),
            no_data,
        )?;

        let mut block = mem_driver.create_with_band_type::<P, _>(
            "",
            window.width,
            window.height,
            profile.band_count,
        )?;
        block.set_geo_transform(&block_transform.into())?;
        if let Some(spatial_reference) = &profile.grid.spatial_reference {
            block.set_projection(spatial_reference)?;
        }
        for band_index in 1..=profile.band_count {
            block.rasterband(band_index)?.fill(no_data, None)?;
        }

        if geometries.is_empty() {
            debug!("Block {window:?} has no features");
        } else {
            debug!("Burning {} feature(s) into block {window:?}", geometries.len());

            for (band_index, values) in (1_usize..).zip(&burn_values) {
                rasterize(&mut block, &[band_index], &geometries, values, None)?;
            }
        }

        for band_index in 1..=profile.band_count {
            let mut buffer = block.rasterband(band_index)?.read_as::<P>(
                (0, 0),
                window.size(),
                window.size(),
                None,
            )?;
            output
                .rasterband(band_index)?
                .write(window.offset(), window.size(), &mut buffer)?;
        }
    }

    layer.clear_spatial_filter();

    Ok(output)
}

/// The geometries of the features that pass the layer's current filter and, per band,
/// the value to burn for each of them. Null attributes burn no data.
fn collect_features(
    layer: &mut Layer,
    field_indices: &[usize],
    transform: Option<&CoordTransform>,
    no_data: f64,
) -> Result<(Vec<Geometry>, Vec<Vec<f64>>)> {
    let mut geometries = Vec::new();
    let mut burn_values = vec![Vec::new(); field_indices.len().max(1)];

    for feature in layer.features() {
        let Some(geometry) = feature.geometry() else {
            continue;
        };

        let geometry = match transform {
            Some(transform) => geometry.transform(transform)?,
            None => geometry.clone(),
        };

        if field_indices.is_empty() {
            burn_values[0].push(CONSTANT_BURN_VALUE);
        } else {
            for (values, &field_index) in burn_values.iter_mut().zip(field_indices) {
                values.push(feature.field_as_double(field_index)?.unwrap_or(no_data));
            }
        }

        geometries.push(geometry);
    }

    Ok((geometries, burn_values))
}
