use gdal::{Dataset, Metadata};
use serde::{Deserialize, Serialize};

use super::{BlockWindows, GdalGeoTransform, GeoTransform, RasterDataType};
use crate::error::Error;
use crate::primitives::BoundingBox2D;
use crate::util::gdal::band_no_data_value;

/// What GDAL reports for rasters without georeferencing: pixel space with y pointing down.
const DEFAULT_GEO_TRANSFORM: GdalGeoTransform = [0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

/// The spatial frame of a raster: where each pixel is located.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct GridDefinition {
    /// The coordinate reference system as WKT. `None` if the raster has none.
    pub spatial_reference: Option<String>,
    pub geo_transform: GeoTransform,
    pub width: usize,
    pub height: usize,
}

impl GridDefinition {
    pub fn new(
        spatial_reference: Option<String>,
        geo_transform: GeoTransform,
        width: usize,
        height: usize,
    ) -> Self {
        Self {
            spatial_reference,
            geo_transform,
            width,
            height,
        }
    }

    /// Reads the grid of an opened dataset. A raster without a geotransform is placed in
    /// pixel space, so that a missing coordinate system can be reported afterwards.
    pub fn from_dataset(dataset: &Dataset) -> Result<Self, Error> {
        let projection = dataset.projection();
        let spatial_reference = if projection.trim().is_empty() {
            None
        } else {
            Some(projection)
        };

        let (width, height) = dataset.raster_size();

        Ok(Self {
            spatial_reference,
            geo_transform: dataset
                .geo_transform()
                .unwrap_or(DEFAULT_GEO_TRANSFORM)
                .into(),
            width,
            height,
        })
    }

    pub fn has_spatial_reference(&self) -> bool {
        self.spatial_reference.is_some()
    }

    pub fn bounds(&self) -> BoundingBox2D {
        self.geo_transform.bounds(self.width, self.height)
    }

    pub fn block_windows(&self, block_width: usize, block_height: usize) -> BlockWindows {
        BlockWindows::new(self.width, self.height, block_width, block_height)
    }

    /// Same size and spatial reference, and a transform that agrees within `epsilon`.
    pub fn is_aligned_with(&self, other: &Self, epsilon: f64) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.spatial_reference == other.spatial_reference
            && self.geo_transform.approx_eq(&other.geo_transform, epsilon)
    }
}

/// The descriptive information of a raster file that drives the operators.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct RasterMetadata {
    pub grid: GridDefinition,
    pub band_count: usize,
    /// The pixel type of the first band.
    pub data_type: RasterDataType,
    /// The declared no data value of the first band.
    pub no_data_value: Option<f64>,
    pub band_descriptions: Vec<String>,
}

impl RasterMetadata {
    /// Reads the metadata of an opened dataset.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::UnsupportedDatatype`] for pixel types without a
    /// [`RasterDataType`] counterpart, e.g. complex numbers.
    ///
    pub fn from_dataset(dataset: &Dataset) -> Result<Self, Error> {
        let grid = GridDefinition::from_dataset(dataset)?;
        let band_count = dataset.raster_count();

        let first_band = dataset.rasterband(1)?;
        let data_type = RasterDataType::from_gdal_data_type(first_band.band_type())?;
        let no_data_value = band_no_data_value(&first_band);

        let mut band_descriptions = Vec::with_capacity(band_count);
        for band_index in 1..=band_count {
            band_descriptions.push(dataset.rasterband(band_index)?.description()?);
        }

        Ok(Self {
            grid,
            band_count,
            data_type,
            no_data_value,
            band_descriptions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gdal::DriverManager;
    use gdal::spatial_ref::SpatialRef;

    fn mem_dataset(with_spatial_reference: bool) -> Dataset {
        let driver = DriverManager::get_driver_by_name("MEM").unwrap();
        let mut dataset = driver.create_with_band_type::<u16, _>("", 4, 3, 2).unwrap();

        dataset
            .set_geo_transform(&[100.0, 10.0, 0.0, 200.0, 0.0, -10.0])
            .unwrap();

        if with_spatial_reference {
            let wkt = SpatialRef::from_epsg(3857).unwrap().to_wkt().unwrap();
            dataset.set_projection(&wkt).unwrap();
        }

        {
            let mut band = dataset.rasterband(1).unwrap();
            band.set_no_data_value(Some(0.0)).unwrap();
            band.set_description("red").unwrap();
        }

        dataset
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn it_reads_raster_metadata() {
        let dataset = mem_dataset(true);

        let metadata = RasterMetadata::from_dataset(&dataset).unwrap();

        assert_eq!(metadata.band_count, 2);
        assert_eq!(metadata.data_type, RasterDataType::U16);
        assert_eq!(metadata.no_data_value, Some(0.0));
        assert_eq!(
            metadata.band_descriptions,
            vec!["red".to_string(), String::new()]
        );
        assert_eq!(metadata.grid.width, 4);
        assert_eq!(metadata.grid.height, 3);
        assert_eq!(
            metadata.grid.geo_transform,
            GeoTransform::new_with_coordinate_x_y(100.0, 10.0, 200.0, -10.0)
        );
        assert!(metadata.grid.has_spatial_reference());

        let bounds = metadata.grid.bounds();
        assert_eq!(bounds.upper_left(), (100.0, 200.0).into());
        assert_eq!(bounds.lower_right(), (140.0, 170.0).into());
    }

    #[test]
    fn missing_spatial_reference_is_none() {
        let dataset = mem_dataset(false);

        let grid = GridDefinition::from_dataset(&dataset).unwrap();

        assert!(!grid.has_spatial_reference());
    }

    #[test]
    fn missing_geo_transform_is_pixel_space() {
        let driver = DriverManager::get_driver_by_name("MEM").unwrap();
        let dataset = driver.create_with_band_type::<u8, _>("", 4, 3, 1).unwrap();

        let metadata = RasterMetadata::from_dataset(&dataset).unwrap();

        assert!(!metadata.grid.has_spatial_reference());
        assert_eq!(
            metadata.grid.geo_transform,
            GeoTransform::from(DEFAULT_GEO_TRANSFORM)
        );
        assert_eq!((metadata.grid.width, metadata.grid.height), (4, 3));
    }

    #[test]
    fn alignment_check() {
        let grid = GridDefinition::from_dataset(&mem_dataset(true)).unwrap();

        let mut shifted = grid.clone();
        shifted.geo_transform.origin_coordinate.x += 10.0;

        let mut other_size = grid.clone();
        other_size.width += 1;

        assert!(grid.is_aligned_with(&grid.clone(), 1e-6));
        assert!(!grid.is_aligned_with(&shifted, 1e-6));
        assert!(!grid.is_aligned_with(&other_size, 1e-6));

        let without_spatial_reference = GridDefinition::from_dataset(&mem_dataset(false)).unwrap();
        assert!(!grid.is_aligned_with(&without_spatial_reference, 1e-6));
    }

    #[test]
    fn grid_block_windows() {
        let grid = GridDefinition::new(None, GeoTransform::default(), 40, 20);

        assert_eq!(grid.block_windows(16, 16).count(), 6);
        assert_eq!(grid.block_windows(0, 0).count(), 1);
    }
}
