pub mod gdal;
pub mod output_path;

use crate::error::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;
#[cfg(test)]
pub mod test;
