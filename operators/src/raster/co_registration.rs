use gdal::{Dataset, DriverManager};
use geoutils_datatypes::call_with_pixel_type;
use geoutils_datatypes::raster::{Pixel, resolve_no_data};
use geoutils_datatypes::util::gdal::{
    ResamplingMethod, band_no_data_value, set_band_no_data_value,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::output_profile::{Compression, DEFAULT_BLOCK_SIZE, GeoTiffOptions, GeoTiffProfile};
use super::warp::{WarpParameters, warp_band};
use crate::util::Result;
use crate::util::gdal::{
    GdalNumThreads, ensure_spatial_reference, open_raster, write_via_intermediate_file,
};
use crate::util::output_path::{CO_REGISTRATION_SUFFIX, output_path_or_derived};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoRegistrationOptions {
    /// Defaults to the child path with a `_coregistered` suffix.
    pub output_path: Option<PathBuf>,
    pub compression: Option<Compression>,
    pub tiled: bool,
    pub block_size: usize,
    pub big_tiff: bool,
    /// Used if the child declares no no data value.
    pub fallback_no_data: Option<f64>,
    pub num_threads: GdalNumThreads,
}

impl Default for CoRegistrationOptions {
    fn default() -> Self {
        Self {
            output_path: None,
            compression: Some(Compression::Zstd),
            tiled: true,
            block_size: DEFAULT_BLOCK_SIZE,
            big_tiff: false,
            fallback_no_data: None,
            num_threads: GdalNumThreads::AllCpus,
        }
    }
}

impl CoRegistrationOptions {
    fn geo_tiff_options(&self) -> GeoTiffOptions {
        GeoTiffOptions {
            compression: self.compression,
            tiled: self.tiled,
            block_size: self.block_size,
            big_tiff: self.big_tiff,
            num_threads: self.num_threads,
        }
    }
}

/// Resamples the `child` raster onto the grid of the `parent` raster.
///
/// The output has the coordinate system, transform and size of the parent and the band
/// count and pixel type of the child. Its no data value is the one declared by the child,
/// else the fallback, else the default of the pixel type.
///
/// All inputs are validated before the output is created: the resampling method first,
/// then the coordinate systems and finally the no data value. A tiled output is processed
/// tile by tile, so only one tile of one band is held in memory. A stripped output is
/// warped directly, in chunks that GDAL sizes to its warp memory limit.
///
/// Returns the path of the written raster.
///
pub fn co_register(
    parent: &Path,
    child: &Path,
    resampling_method: &str,
    options: CoRegistrationOptions,
) -> Result<PathBuf> {
    let resampling_method: ResamplingMethod = resampling_method.parse()?;

    let (_parent_dataset, parent_metadata) = open_raster(parent)?;
    let (child_dataset, child_metadata) = open_raster(child)?;

    ensure_spatial_reference(parent, &parent_metadata)?;
    ensure_spatial_reference(child, &child_metadata)?;

    let no_data = resolve_no_data(
        child_metadata.data_type,
        child_metadata.no_data_value,
        options.fallback_no_data,
    )?;

    if child_metadata.data_type.is_integer() && !resampling_method.is_nearest() {
        warn!(
            "Categorical/integer data should normally be resampled with 'nearest', not '{resampling_method}'"
        );
    }

    let profile = GeoTiffProfile::new(
        parent_metadata.grid,
        child_metadata.band_count,
        child_metadata.data_type,
        Some(no_data),
        &options.geo_tiff_options(),
    )?;

    let output_path = output_path_or_derived(
        options.output_path.as_deref(),
        child,
        CO_REGISTRATION_SUFFIX,
    );

    info!(
        "Co-registering {} onto the grid of {} ({}x{} pixels, {} band(s), {}, {resampling_method}) into {}",
        child.display(),
        parent.display(),
        profile.grid.width,
        profile.grid.height,
        profile.band_count,
        profile.data_type,
        output_path.display()
    );

    write_via_intermediate_file(&output_path, |path| {
        call_with_pixel_type!(profile.data_type, P => write_co_registered::<P>(
            &child_dataset,
            &profile,
            no_data,
            resampling_method,
            path,
        ))
    })?;

    Ok(output_path)
}

fn write_co_registered<P: Pixel>(
    child: &Dataset,
    profile: &GeoTiffProfile,
    no_data: f64,
    resampling_method: ResamplingMethod,
    path: &Path,
) -> Result<Dataset> {
    let output = profile.create_dataset::<P>(path)?;

    let band_parameters = (1..=profile.band_count)
        .map(|band_index| -> Result<(usize, WarpParameters)> {
            let source_no_data = band_no_data_value(&child.rasterband(band_index)?);
            Ok((
                band_index,
                WarpParameters {
                    resampling_method,
                    num_threads: profile.num_threads,
                    source_no_data,
                    destination_no_data: no_data,
                },
            ))
        })
        .collect::<Result<Vec<_>>>()?;

    // GDAL chunks the warp of a stripped file itself
    if !profile.is_tiled() {
        for (band_index, parameters) in &band_parameters {
            debug!("Warping band {band_index} into the output");
            warp_band(child, *band_index, &output, *band_index, parameters)?;
        }
        return Ok(output);
    }

    let spatial_reference = profile.grid.spatial_reference.as_deref().unwrap_or_default();
    let mem_driver = DriverManager::get_driver_by_name("MEM")?;

    let windows = profile.block_windows();
    debug!("Warping {} block(s)", windows.number_of_blocks());

    for window in windows {
        debug!("Warping block {window:?}");

        let mut block =
            mem_driver.create_with_band_type::<P, _>("", window.width, window.height, 1)?;
        block.set_geo_transform(&profile.grid.geo_transform.window_transform(&window).into())?;
        block.set_projection(spatial_reference)?;
        set_band_no_data_value(&mut block.rasterband(1)?, Some(no_data))?;

        for (band_index, parameters) in &band_parameters {
            warp_band(child, *band_index, &block, 1, parameters)?;

            let mut buffer = block.rasterband(1)?.read_as::<P>(
                (0, 0),
                window.size(),
                window.size(),
                None,
            )?;
            output
                .rasterband(*band_index)?
                .write(window.offset(), window.size(), &mut buffer)?;
        }
    }

    Ok(output)
}
