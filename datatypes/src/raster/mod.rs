mod data_type;
mod geo_transform;
mod grid_definition;
mod no_data;
mod window;

pub use data_type::{Pixel, RasterDataType};
pub use geo_transform::{GdalGeoTransform, GeoTransform};
pub use grid_definition::{GridDefinition, RasterMetadata};
pub use no_data::resolve_no_data;
pub use window::{BlockWindows, Window};
