use gdal::raster::{GdalDataType, RasterBand};
use gdal::{Dataset, DatasetOptions};
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use std::{fmt::Display, path::Path, str::FromStr};

use crate::error::{self, Error};
use crate::util::Result;

/// Opens a Gdal Dataset with the given `path`.
pub fn gdal_open_dataset(path: &Path) -> Result<Dataset> {
    gdal_open_dataset_ex(path, DatasetOptions::default())
}

/// Opens a Gdal Dataset with the given `path` and `dataset_options`.
/// Errors are reported verbosely so that GDAL's reason ends up in the log.
pub fn gdal_open_dataset_ex(path: &Path, dataset_options: DatasetOptions) -> Result<Dataset> {
    let dataset_options = {
        let mut dataset_options = dataset_options;
        dataset_options.open_flags |= gdal::GdalOpenFlags::GDAL_OF_VERBOSE_ERROR;
        dataset_options
    };

    Dataset::open_ex(path, dataset_options).context(error::Gdal)
}

/// Reads the no data value of `band`.
///
/// GDAL stores the no data value of 64 bit integer bands apart from the `f64` one, so
/// these bands are read through their typed accessors.
pub fn band_no_data_value(band: &RasterBand) -> Option<f64> {
    match band.band_type() {
        GdalDataType::Int64 => band.no_data_value_i64().map(|no_data| no_data as f64),
        GdalDataType::UInt64 => band.no_data_value_u64().map(|no_data| no_data as f64),
        _ => band.no_data_value(),
    }
}

/// Sets or clears the no data value of `band`, see [`band_no_data_value`].
///
/// For 64 bit integer bands the value is converted with a saturating cast, so the usual
/// sentinels (`i64::MIN`, `i64::MAX`, `u64::MAX`) are kept.
pub fn set_band_no_data_value(band: &mut RasterBand, no_data: Option<f64>) -> Result<()> {
    match band.band_type() {
        GdalDataType::Int64 => {
            band.set_no_data_value_i64(no_data.map(|no_data| no_data as i64))?;
        }
        GdalDataType::UInt64 => {
            band.set_no_data_value_u64(no_data.map(|no_data| no_data as u64))?;
        }
        _ => band.set_no_data_value(no_data)?,
    }
    Ok(())
}

/// The interpolation rule used to compute an output pixel from source pixels at a
/// different geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResamplingMethod {
    /// Picks the closest source pixel. Suitable for categorical data.
    Nearest,
    /// Linear interpolation of the 2×2 neighbourhood.
    Bilinear,
    /// Cubic convolution of the 4×4 neighbourhood.
    Cubic,
    /// Lanczos windowed sinc of the 6×6 neighbourhood.
    Lanczos,
}

impl ResamplingMethod {
    pub fn is_nearest(self) -> bool {
        self == ResamplingMethod::Nearest
    }
}

impl FromStr for ResamplingMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nearest" => Ok(ResamplingMethod::Nearest),
            "bilinear" => Ok(ResamplingMethod::Bilinear),
            "cubic" => Ok(ResamplingMethod::Cubic),
            "lanczos" => Ok(ResamplingMethod::Lanczos),
            _ => Err(Error::InvalidResamplingMethod {
                method: s.to_string(),
            }),
        }
    }
}

impl Display for ResamplingMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResamplingMethod::Nearest => write!(f, "nearest"),
            ResamplingMethod::Bilinear => write!(f, "bilinear"),
            ResamplingMethod::Cubic => write!(f, "cubic"),
            ResamplingMethod::Lanczos => write!(f, "lanczos"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_resampling_method() {
        for method in ["nearest", "bilinear", "cubic", "lanczos"] {
            let parsed: ResamplingMethod = method.parse().unwrap();
            assert_eq!(parsed.to_string(), method);
        }

        assert!(matches!(
            "average".parse::<ResamplingMethod>(),
            Err(Error::InvalidResamplingMethod { method }) if method == "average"
        ));
        assert!("Nearest".parse::<ResamplingMethod>().is_err());
    }

    #[test]
    fn test_deserialize_resampling_method() {
        let method = serde_json::from_str::<ResamplingMethod>("\"lanczos\"").unwrap();

        assert_eq!(method, ResamplingMethod::Lanczos);
        assert!(!method.is_nearest());
        assert!(ResamplingMethod::Nearest.is_nearest());
    }

    #[test]
    fn open_missing_dataset_fails() {
        assert!(matches!(
            gdal_open_dataset(Path::new("/does/not/exist.tif")),
            Err(Error::Gdal { .. })
        ));
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn no_data_of_64_bit_bands() {
        let driver = gdal::DriverManager::get_driver_by_name("MEM").unwrap();
        let signed = driver.create_with_band_type::<i64, _>("", 2, 2, 1).unwrap();
        let unsigned = driver.create_with_band_type::<u64, _>("", 2, 2, 1).unwrap();

        let mut band = signed.rasterband(1).unwrap();
        assert_eq!(band_no_data_value(&band), None);
        set_band_no_data_value(&mut band, Some(i64::MIN as f64)).unwrap();
        assert_eq!(band.no_data_value_i64(), Some(i64::MIN));
        assert_eq!(band_no_data_value(&band), Some(i64::MIN as f64));

        let mut band = unsigned.rasterband(1).unwrap();
        set_band_no_data_value(&mut band, Some(u64::MAX as f64)).unwrap();
        assert_eq!(band.no_data_value_u64(), Some(u64::MAX));
        set_band_no_data_value(&mut band, Some(0.0)).unwrap();
        assert_eq!(band_no_data_value(&band), Some(0.0));
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn no_data_of_other_bands() {
        let driver = gdal::DriverManager::get_driver_by_name("MEM").unwrap();
        let dataset = driver.create_with_band_type::<f32, _>("", 2, 2, 1).unwrap();

        let mut band = dataset.rasterband(1).unwrap();
        set_band_no_data_value(&mut band, Some(-9999.0)).unwrap();
        assert_eq!(band_no_data_value(&band), Some(-9999.0));
        set_band_no_data_value(&mut band, None).unwrap();
        assert_eq!(band_no_data_value(&band), None);
    }
}
