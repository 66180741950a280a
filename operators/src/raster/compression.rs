use gdal::Dataset;
use geoutils_datatypes::call_with_pixel_type;
use geoutils_datatypes::raster::{BlockWindows, Pixel, RasterMetadata};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use geoutils_datatypes::util::gdal::{band_no_data_value, set_band_no_data_value};

use super::output_profile::{Compression, GeoTiffOptions, GeoTiffProfile, is_valid_tile_size};
use crate::util::Result;
use crate::util::gdal::{GdalNumThreads, open_raster, write_via_intermediate_file};
use crate::util::output_path::{COMPRESSION_SUFFIX, output_path_or_derived};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompressionOptions {
    /// Defaults to the input path with a `_compressed` suffix.
    pub output_path: Option<PathBuf>,
    pub compression: Compression,
    pub num_threads: GdalNumThreads,
}

/// Rewrites the raster at `input` with another compression.
///
/// Grid, bands, pixel type, no data values and band descriptions are kept. A tiled input
/// keeps its tile size, everything else is written in strips. Pixels are copied block by
/// block along the input's own block layout.
///
pub fn compress_raster(input: &Path, options: CompressionOptions) -> Result<PathBuf> {
    let (dataset, metadata) = open_raster(input)?;

    let (block_width, block_height) = dataset.rasterband(1)?.block_size();
    let tile_size = native_tile_size((block_width, block_height), metadata.grid.width);

    let profile = GeoTiffProfile::with_tile_size(
        metadata.grid.clone(),
        metadata.band_count,
        metadata.data_type,
        metadata.no_data_value,
        tile_size,
        &GeoTiffOptions {
            compression: Some(options.compression),
            tiled: tile_size.is_some(),
            block_size: block_width,
            big_tiff: false,
            num_threads: options.num_threads,
        },
    )?
    .with_band_descriptions(metadata.band_descriptions.clone());

    let output_path =
        output_path_or_derived(options.output_path.as_deref(), input, COMPRESSION_SUFFIX);

    info!(
        "Compressing {} with {} into {}",
        input.display(),
        options.compression,
        output_path.display()
    );

    let block_windows = metadata.grid.block_windows(block_width, block_height);

    write_via_intermediate_file(&output_path, |path| {
        call_with_pixel_type!(profile.data_type, P => write_compressed::<P>(
            &dataset,
            &metadata,
            &profile,
            block_windows,
            path,
        ))
    })?;

    Ok(output_path)
}

/// The block size of the input if it is a tiling the output can take over.
///
/// Strips span the whole width with a height that differs from it. Tiles may be wider
/// than the raster itself. Blocks that are no valid GeoTIFF tiles, e.g. the scanlines of
/// other formats, yield `None`, so the output is written in strips.
///
fn native_tile_size(block_size: (usize, usize), raster_width: usize) -> Option<(usize, usize)> {
    let (block_width, block_height) = block_size;
    let is_strip = block_width == raster_width && block_height != block_width;

    (!is_strip && is_valid_tile_size(block_width) && is_valid_tile_size(block_height))
        .then_some(block_size)
}

fn write_compressed<P: Pixel>(
    input: &Dataset,
    metadata: &RasterMetadata,
    profile: &GeoTiffProfile,
    block_windows: BlockWindows,
    path: &Path,
) -> Result<Dataset> {
    let output = profile.create_dataset::<P>(path)?;

    // bands after the first may declare their own no data value
    for band_index in 2..=metadata.band_count {
        let no_data_value = band_no_data_value(&input.rasterband(band_index)?);
        set_band_no_data_value(&mut output.rasterband(band_index)?, no_data_value)?;
    }

    for window in block_windows {
        debug!("Copying block {window:?}");

        for band_index in 1..=metadata.band_count {
            let mut buffer = input.rasterband(band_index)?.read_as::<P>(
                window.offset(),
                window.size(),
                window.size(),
                None,
            )?;
            output
                .rasterband(band_index)?
                .write(window.offset(), window.size(), &mut buffer)?;
        }
    }

    Ok(output)
}
