pub mod error;
pub mod primitives;
pub mod raster;
pub mod util;
