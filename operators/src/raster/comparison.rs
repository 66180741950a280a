use geoutils_datatypes::util::gdal::band_no_data_value;
use serde::{Deserialize, Serialize};
use snafu::ensure;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::co_registration::{CoRegistrationOptions, co_register};
use crate::error;
use crate::util::Result;
use crate::util::gdal::{GdalNumThreads, open_raster};

/// Transforms of aligned rasters may differ by this much.
const ALIGNMENT_EPSILON: f64 = 1e-6;

/// Accumulates error metrics of predictions against true values without storing samples.
///
/// The variance of the true values is updated with Welford's algorithm, so that the
/// coefficient of determination can be computed in a single pass.
///
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RegressionMetrics {
    count: u64,
    sum_squared_residuals: f64,
    sum_absolute_residuals: f64,
    truth_mean: f64,
    truth_m2: f64,
}

impl RegressionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, truth: f64, prediction: f64) {
        let residual = truth - prediction;
        self.sum_squared_residuals += residual * residual;
        self.sum_absolute_residuals += residual.abs();

        self.count += 1;
        let delta = truth - self.truth_mean;
        self.truth_mean += delta / self.count as f64;
        self.truth_m2 += delta * (truth - self.truth_mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn rmse(&self) -> f64 {
        (self.sum_squared_residuals / self.count as f64).sqrt()
    }

    pub fn mae(&self) -> f64 {
        self.sum_absolute_residuals / self.count as f64
    }

    /// The coefficient of determination. Constant true values give 1 for a perfect
    /// prediction and 0 otherwise.
    pub fn r2(&self) -> f64 {
        if self.truth_m2 == 0.0 {
            return if self.sum_squared_residuals == 0.0 {
                1.0
            } else {
                0.0
            };
        }

        1.0 - self.sum_squared_residuals / self.truth_m2
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
    /// Number of pixels that are valid in both rasters.
    pub n: u64,
}

/// Compares the first band of `model` against the first band of `truth`.
///
/// If the grids differ, `model` is co-registered onto the grid of `truth` first and the
/// co-registered file is written next to it. Pixels that are no data or NaN in either
/// raster are ignored.
///
pub fn compare_rasters(
    truth: &Path,
    model: &Path,
    resampling_method: &str,
    num_threads: GdalNumThreads,
) -> Result<ComparisonReport> {
    let (truth_dataset, truth_metadata) = open_raster(truth)?;

    let model: PathBuf = {
        let (_, model_metadata) = open_raster(model)?;

        if model_metadata
            .grid
            .is_aligned_with(&truth_metadata.grid, ALIGNMENT_EPSILON)
        {
            info!("Rasters are aligned, skipping co-registration");
            model.to_path_buf()
        } else {
            info!("Rasters differ in coordinate system, size or transform, co-registering");
            co_register(
                truth,
                model,
                resampling_method,
                CoRegistrationOptions {
                    num_threads,
                    ..Default::default()
                },
            )?
        }
    };

    let (model_dataset, _) = open_raster(&model)?;

    let truth_band = truth_dataset.rasterband(1)?;
    let model_band = model_dataset.rasterband(1)?;
    let truth_no_data = band_no_data_value(&truth_band);
    let model_no_data = band_no_data_value(&model_band);

    let is_valid = |value: f64, no_data: Option<f64>| {
        !value.is_nan() && no_data.is_none_or(|no_data| value != no_data)
    };

    let mut metrics = RegressionMetrics::new();

    let (block_width, block_height) = truth_band.block_size();
    for window in truth_metadata.grid.block_windows(block_width, block_height) {
        debug!("Comparing block {window:?}");

        let truth_values =
            truth_band.read_as::<f64>(window.offset(), window.size(), window.size(), None)?;
        let model_values =
            model_band.read_as::<f64>(window.offset(), window.size(), window.size(), None)?;

        for (&truth_value, &model_value) in truth_values.data().iter().zip(model_values.data()) {
            if is_valid(truth_value, truth_no_data) && is_valid(model_value, model_no_data) {
                metrics.update(truth_value, model_value);
            }
        }
    }

    ensure!(metrics.count() > 0, error::NoOverlappingValidPixels);

    let report = ComparisonReport {
        rmse: metrics.rmse(),
        mae: metrics.mae(),
        r2: metrics.r2(),
        n: metrics.count(),
    };

    info!(
        "Used pixels: {}, RMSE: {}, MAE: {}, R²: {}",
        report.n, report.rmse, report.mae, report.r2
    );

    Ok(report)
}
