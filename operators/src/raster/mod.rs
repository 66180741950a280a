mod co_registration;
mod comparison;
mod compression;
mod output_profile;
mod warp;

pub use co_registration::{CoRegistrationOptions, co_register};
pub use comparison::{ComparisonReport, RegressionMetrics, compare_rasters};
pub use compression::{CompressionOptions, compress_raster};
pub use output_profile::{
    Compression, DEFAULT_BLOCK_SIZE, GeoTiffOptions, GeoTiffProfile, Predictor,
};
pub use warp::{WarpParameters, gdal_resample_alg, warp_band};
