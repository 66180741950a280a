mod feature_count;
mod rasterization;
mod sample_points;

pub use feature_count::{FeatureCount, NULL_VALUE_KEY, count_features};
pub use rasterization::{RasterizeOptions, infer_data_type, rasterize_vector};
pub use sample_points::{
    BandSelector, DEFAULT_MAX_BATCHES, PointSamplingOptions, SamplePoint, SampledPoints,
    SamplingMode, generate_points_from_raster,
};
