pub mod error;
pub mod raster;
pub mod util;
pub mod vector;
