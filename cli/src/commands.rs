use clap::Args;
use geoutils_datatypes::raster::RasterDataType;
use geoutils_operators::raster::{
    CoRegistrationOptions, Compression, CompressionOptions, co_register, compare_rasters,
    compress_raster,
};
use geoutils_operators::util::gdal::GdalNumThreads;
use geoutils_operators::vector::{
    BandSelector, DEFAULT_MAX_BATCHES, PointSamplingOptions, RasterizeOptions, SamplingMode,
    count_features, generate_points_from_raster, rasterize_vector,
};
use serde::Serialize;
use std::path::PathBuf;

use crate::config::{self, get_config_element};

fn parse_compression(s: &str) -> Result<Compression, String> {
    s.parse().map_err(|error: geoutils_operators::error::Error| error.to_string())
}

fn parse_data_type(s: &str) -> Result<RasterDataType, String> {
    s.parse()
        .map_err(|_| format!("unknown data type {s}, use e.g. uint8, int32 or float32"))
}

/// `3` selects band 3, `3:ndvi` selects band 3 as column `ndvi` and anything else selects
/// a band by its description.
fn parse_band_selector(s: &str) -> Result<BandSelector, String> {
    if let Ok(index) = s.parse::<usize>() {
        return Ok(BandSelector::Index(index));
    }

    match s.split_once(':') {
        Some((index, name)) if !name.is_empty() => match index.parse::<usize>() {
            Ok(index) => Ok(BandSelector::Named(index, name.to_string())),
            Err(_) => Ok(BandSelector::Name(s.to_string())),
        },
        _ => Ok(BandSelector::Name(s.to_string())),
    }
}

#[allow(clippy::print_stdout)]
fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_path(path: &std::path::Path) {
    println!("{}", path.display());
}

fn num_threads() -> anyhow::Result<GdalNumThreads> {
    Ok(get_config_element::<config::Gdal>()?.num_threads)
}

/// Resamples a raster onto the grid of another raster
#[derive(Debug, Args)]
pub struct CoRegister {
    /// Raster that defines the target grid
    #[arg(long)]
    pub parent: PathBuf,
    /// Raster that is resampled
    #[arg(long)]
    pub child: PathBuf,
    /// One of nearest, bilinear, cubic and lanczos
    #[arg(long, default_value = "nearest")]
    pub resampling: String,
    /// Defaults to the child path with a `_coregistered` suffix
    #[arg(long, short)]
    pub output: Option<PathBuf>,
    #[arg(long, value_parser = parse_compression, conflicts_with = "no_compression")]
    pub compression: Option<Compression>,
    #[arg(long)]
    pub no_compression: bool,
    /// Writes strips instead of tiles
    #[arg(long)]
    pub untiled: bool,
    #[arg(long)]
    pub block_size: Option<usize>,
    #[arg(long)]
    pub big_tiff: bool,
    /// No data value if the child declares none
    #[arg(long, allow_negative_numbers = true)]
    pub fallback_no_data: Option<f64>,
}

pub fn run_co_register(params: CoRegister) -> anyhow::Result<()> {
    let settings: config::CoRegistration = get_config_element()?;

    let compression = if params.no_compression {
        None
    } else {
        params.compression.or(settings.compression)
    };

    let output = co_register(
        &params.parent,
        &params.child,
        &params.resampling,
        CoRegistrationOptions {
            output_path: params.output,
            compression,
            tiled: settings.tiled && !params.untiled,
            block_size: params.block_size.unwrap_or(settings.block_size),
            big_tiff: settings.big_tiff || params.big_tiff,
            fallback_no_data: params.fallback_no_data,
            num_threads: num_threads()?,
        },
    )?;

    print_path(&output);
    Ok(())
}

/// Rewrites a raster with another compression
#[derive(Debug, Args)]
pub struct Compress {
    pub input: PathBuf,
    /// One of DEFLATE, LZW, ZSTD, JPEG and PACKBITS
    #[arg(long, value_parser = parse_compression, default_value = "ZSTD")]
    pub compression: Compression,
    /// Defaults to the input path with a `_compressed` suffix
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

pub fn run_compress(params: Compress) -> anyhow::Result<()> {
    let output = compress_raster(
        &params.input,
        CompressionOptions {
            output_path: params.output,
            compression: params.compression,
            num_threads: num_threads()?,
        },
    )?;

    print_path(&output);
    Ok(())
}

/// Burns vector features into a GeoTIFF
#[derive(Debug, Args)]
pub struct Rasterize {
    pub input: PathBuf,
    /// Pixel size in units of the target coordinate system
    #[arg(long)]
    pub resolution: f64,
    /// Attribute to burn, may be repeated for one band per attribute. Burns 1 if omitted.
    #[arg(long = "attribute")]
    pub attributes: Vec<String>,
    #[arg(long, value_parser = parse_data_type)]
    pub data_type: Option<RasterDataType>,
    #[arg(long, allow_negative_numbers = true)]
    pub no_data: Option<f64>,
    /// Target coordinate system, e.g. EPSG:3857. Defaults to the one of the layer.
    #[arg(long)]
    pub crs: Option<String>,
    /// Defaults to `<input stem>_rasterized.tif`
    #[arg(long, short)]
    pub output: Option<PathBuf>,
    #[arg(long, value_parser = parse_compression)]
    pub compression: Option<Compression>,
}

pub fn run_rasterize(params: Rasterize) -> anyhow::Result<()> {
    let settings: config::Rasterization = get_config_element()?;

    let output = rasterize_vector(
        &params.input,
        params.resolution,
        RasterizeOptions {
            attributes: params.attributes,
            data_type: params.data_type,
            no_data: params.no_data,
            spatial_ref: params.crs,
            output_path: params.output,
            block_size: settings.block_size,
            tiled: settings.tiled,
            compression: params.compression,
            num_threads: num_threads()?,
        },
    )?;

    print_path(&output);
    Ok(())
}

/// Counts the features of a vector file
#[derive(Debug, Args)]
pub struct CountFeatures {
    pub input: PathBuf,
    /// Groups the count by the values of this attribute
    #[arg(long)]
    pub attribute: Option<String>,
}

pub fn run_count_features(params: CountFeatures) -> anyhow::Result<()> {
    let count = count_features(&params.input, params.attribute.as_deref())?;
    print_json(&count)
}

/// Creates points over a raster and samples band values at them
#[derive(Debug, Args)]
pub struct SamplePoints {
    pub raster: PathBuf,
    /// Band index, band description or `<index>:<column name>`. Defaults to band 1.
    #[arg(long = "band", value_parser = parse_band_selector)]
    pub bands: Vec<BandSelector>,
    /// Distance between the points of a regular grid
    #[arg(long, required_unless_present = "random", conflicts_with = "random")]
    pub spacing: Option<f64>,
    /// Number of uniformly distributed random points
    #[arg(long)]
    pub random: Option<usize>,
    /// Minimum distance between random points
    #[arg(long, requires = "random")]
    pub min_spacing: Option<f64>,
    #[arg(long, requires = "random")]
    pub seed: Option<u64>,
    #[arg(long, requires = "random")]
    pub batch_size: Option<usize>,
    #[arg(long, requires = "random", default_value_t = DEFAULT_MAX_BATCHES)]
    pub max_batches: usize,
    /// Vector file (.gpkg, .shp, .geojson or .csv) the points are written to
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

pub fn run_sample_points(params: SamplePoints) -> anyhow::Result<()> {
    let mode = match (params.random, params.spacing) {
        (Some(n_points), _) => SamplingMode::Random {
            n_points,
            min_spacing: params.min_spacing,
            seed: params.seed,
            batch_size: params.batch_size,
            max_batches: params.max_batches,
        },
        (None, Some(spacing)) => SamplingMode::Fishnet { spacing },
        (None, None) => anyhow::bail!("either --spacing or --random is required"),
    };

    let write_to_file = params.output.is_some();

    let sampled = generate_points_from_raster(
        &params.raster,
        PointSamplingOptions {
            bands: params.bands,
            mode,
            output_path: params.output,
        },
    )?;

    if write_to_file {
        tracing::info!("Sampled {} point(s)", sampled.points.len());
        Ok(())
    } else {
        print_json(&sampled)
    }
}

/// Computes RMSE, MAE and R² of a model raster against a truth raster
#[derive(Debug, Args)]
pub struct Compare {
    pub truth: PathBuf,
    pub model: PathBuf,
    /// Used if the model has to be co-registered onto the truth grid
    #[arg(long, default_value = "nearest")]
    pub resampling: String,
}

pub fn run_compare(params: Compare) -> anyhow::Result<()> {
    let report = compare_rasters(
        &params.truth,
        &params.model,
        &params.resampling,
        num_threads()?,
    )?;
    print_json(&report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_parses_band_selectors() {
        assert_eq!(parse_band_selector("2").unwrap(), BandSelector::Index(2));
        assert_eq!(
            parse_band_selector("2:ndvi").unwrap(),
            BandSelector::Named(2, "ndvi".to_string())
        );
        assert_eq!(
            parse_band_selector("nir").unwrap(),
            BandSelector::Name("nir".to_string())
        );
        assert_eq!(
            parse_band_selector("a:b").unwrap(),
            BandSelector::Name("a:b".to_string())
        );
    }

    #[test]
    fn it_parses_options() {
        assert_eq!(parse_compression("lzw").unwrap(), Compression::Lzw);
        assert!(parse_compression("gzip").is_err());
        assert_eq!(parse_data_type("Float32").unwrap(), RasterDataType::F32);
        assert!(parse_data_type("complex").is_err());
    }
}
