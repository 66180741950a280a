use geoutils_datatypes::raster::RasterDataType;
use snafu::Snafu;
use std::path::PathBuf;

use crate::raster::Compression;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[snafu(context(suffix(false)))] // disables default `Snafu` suffix
pub enum Error {
    #[snafu(display(
        "Invalid resampling method: {method}. Possible values are nearest, bilinear, cubic and lanczos"
    ))]
    InvalidResamplingMethod { method: String },

    #[snafu(display("Raster {} has no coordinate system", path.display()))]
    MissingCoordinateSystem { path: PathBuf },

    #[snafu(display(
        "Unsupported data type {data_type}; please provide a fallback no data value"
    ))]
    UnsupportedDatatype { data_type: String },

    #[snafu(display("Block size must be a positive multiple of 16, found {block_size}"))]
    InvalidBlockSize { block_size: usize },

    #[snafu(display(
        "Invalid compression: {compression}. Possible values are DEFLATE, LZW, ZSTD, JPEG and PACKBITS"
    ))]
    InvalidCompression { compression: String },

    #[snafu(display("Compression {compression} does not support data type {data_type}"))]
    UnsupportedCompression {
        compression: Compression,
        data_type: RasterDataType,
    },

    #[snafu(display("Resolution must be positive and finite, found {resolution}"))]
    InvalidResolution { resolution: f64 },

    #[snafu(display("Attribute {attribute} not found in {}", path.display()))]
    AttributeNotFound { attribute: String, path: PathBuf },

    #[snafu(display("Vector layer of {} has no features", path.display()))]
    EmptyVectorLayer { path: PathBuf },

    #[snafu(display("Band index {index} is out of range 1..={band_count}"))]
    InvalidBandIndex { index: usize, band_count: usize },

    #[snafu(display("Band name(s) not found: {}", names.join(", ")))]
    BandNameNotFound { names: Vec<String> },

    #[snafu(display("Spacing must be positive and finite, found {spacing}"))]
    InvalidSpacing { spacing: f64 },

    #[snafu(display(
        "Could only find {found} valid points out of {requested} requested points"
    ))]
    NotEnoughValidPoints { found: usize, requested: usize },

    #[snafu(display(
        "Unsupported vector output format of {}; use .gpkg, .shp, .geojson or .csv",
        path.display()
    ))]
    UnsupportedVectorFormat { path: PathBuf },

    #[snafu(display("The rasters have no overlapping valid pixels"))]
    NoOverlappingValidPixels,

    #[snafu(display("Warp failed in {method_name}: {msg}"))]
    Warp {
        method_name: &'static str,
        msg: String,
    },

    #[snafu(display("DataTypeError: {}", source))]
    DataType {
        source: geoutils_datatypes::error::Error,
    },

    #[snafu(display("GdalError: {}", source))]
    Gdal {
        source: gdal::errors::GdalError,
    },

    #[snafu(display("IoError: {}", source))]
    Io {
        source: std::io::Error,
    },
}

impl From<geoutils_datatypes::error::Error> for Error {
    fn from(datatype_error: geoutils_datatypes::error::Error) -> Self {
        use geoutils_datatypes::error::Error as DataTypeError;

        match datatype_error {
            DataTypeError::InvalidResamplingMethod { method } => {
                Self::InvalidResamplingMethod { method }
            }
            DataTypeError::UnsupportedDatatype { data_type } => {
                Self::UnsupportedDatatype { data_type }
            }
            DataTypeError::Gdal { source } => Self::Gdal { source },
            source => Self::DataType { source },
        }
    }
}

impl From<gdal::errors::GdalError> for Error {
    fn from(gdal_error: gdal::errors::GdalError) -> Self {
        Self::Gdal { source: gdal_error }
    }
}

impl From<std::io::Error> for Error {
    fn from(io_error: std::io::Error) -> Self {
        Self::Io { source: io_error }
    }
}
