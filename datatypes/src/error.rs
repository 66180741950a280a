use snafu::Snafu;

use crate::primitives::Coordinate2D;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[snafu(context(suffix(false)))] // disables default `Snafu` suffix
pub enum Error {
    #[snafu(display(
        "The conditions ll.x <= ur.x && ll.y <= ur.y are not met by ll:{} ur:{}",
        lower_left_coordinate,
        upper_right_coordinate
    ))]
    InvalidBoundingBox {
        lower_left_coordinate: Coordinate2D,
        upper_right_coordinate: Coordinate2D,
    },

    #[snafu(display(
        "Invalid resampling method: {method}. Possible values are nearest, bilinear, cubic and lanczos"
    ))]
    InvalidResamplingMethod { method: String },

    #[snafu(display(
        "Unsupported data type {data_type}; please provide a fallback no data value"
    ))]
    UnsupportedDatatype { data_type: String },

    #[snafu(display("GdalError: {}", source))]
    Gdal { source: gdal::errors::GdalError },
}

impl From<gdal::errors::GdalError> for Error {
    fn from(gdal_error: gdal::errors::GdalError) -> Self {
        Self::Gdal { source: gdal_error }
    }
}
