use gdal::raster::Buffer;
use gdal::spatial_ref::SpatialRef;
use gdal::{Dataset, DriverManager};
use geoutils_datatypes::raster::Pixel;
use geoutils_datatypes::util::gdal::set_band_no_data_value;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::util::gdal::name_value_list;

/// A raster fixture that is written as GeoTIFF.
#[derive(Debug, Clone)]
pub struct TestRaster<P: Pixel> {
    pub width: usize,
    pub height: usize,
    /// `None` writes a raster without georeferencing.
    pub geo_transform: Option<[f64; 6]>,
    pub epsg: Option<u32>,
    pub no_data: Option<f64>,
    pub tile_size: Option<usize>,
    /// One row major vector per band.
    pub bands: Vec<Vec<P>>,
}

impl<P: Pixel> TestRaster<P> {
    /// A north-up EPSG:3857 raster with 10 m pixels and its upper left corner at (0, 100).
    pub fn new(width: usize, height: usize, bands: Vec<Vec<P>>) -> Self {
        Self {
            width,
            height,
            geo_transform: Some([0.0, 10.0, 0.0, 100.0, 0.0, -10.0]),
            epsg: Some(3857),
            no_data: None,
            tile_size: None,
            bands,
        }
    }

    pub fn filled(width: usize, height: usize, value: P) -> Self {
        Self::new(width, height, vec![vec![value; width * height]])
    }

    #[must_use]
    pub fn with_geo_transform(mut self, geo_transform: [f64; 6]) -> Self {
        self.geo_transform = Some(geo_transform);
        self
    }

    /// Neither a geotransform nor a coordinate system, like a plain TIFF or PNG.
    #[must_use]
    pub fn without_georeference(mut self) -> Self {
        self.geo_transform = None;
        self.epsg = None;
        self
    }

    #[must_use]
    pub fn with_epsg(mut self, epsg: Option<u32>) -> Self {
        self.epsg = epsg;
        self
    }

    #[must_use]
    pub fn with_no_data(mut self, no_data: Option<f64>) -> Self {
        self.no_data = no_data;
        self
    }

    #[must_use]
    pub fn with_tile_size(mut self, tile_size: usize) -> Self {
        self.tile_size = Some(tile_size);
        self
    }

    pub fn write(&self, path: &Path) -> PathBuf {
        let driver = DriverManager::get_driver_by_name("GTiff").unwrap();

        let options = match self.tile_size {
            Some(tile_size) => name_value_list([
                ("TILED", "YES".to_string()),
                ("BLOCKXSIZE", tile_size.to_string()),
                ("BLOCKYSIZE", tile_size.to_string()),
            ]),
            None => name_value_list(Vec::<(&str, &str)>::new()),
        }
        .unwrap();

        let mut dataset = driver
            .create_with_band_type_with_options::<P, _>(
                path,
                self.width,
                self.height,
                self.bands.len(),
                &options,
            )
            .unwrap();

        if let Some(geo_transform) = &self.geo_transform {
            dataset.set_geo_transform(geo_transform).unwrap();
        }
        if let Some(epsg) = self.epsg {
            dataset.set_projection(&epsg_wkt(epsg)).unwrap();
        }

        for (index, values) in self.bands.iter().enumerate() {
            let mut band = dataset.rasterband(index + 1).unwrap();
            if self.no_data.is_some() {
                set_band_no_data_value(&mut band, self.no_data).unwrap();
            }
            let mut buffer = Buffer::new((self.width, self.height), values.clone());
            band.write((0, 0), (self.width, self.height), &mut buffer)
                .unwrap();
        }

        path.to_path_buf()
    }
}

pub fn epsg_wkt(epsg: u32) -> String {
    SpatialRef::from_epsg(epsg).unwrap().to_wkt().unwrap()
}

pub fn read_band<P: Pixel>(path: &Path, band_index: usize) -> Vec<P> {
    let dataset = Dataset::open(path).unwrap();
    let size = dataset.raster_size();

    dataset
        .rasterband(band_index)
        .unwrap()
        .read_as::<P>((0, 0), size, size, None)
        .unwrap()
        .data()
        .to_vec()
}

/// A GeoJSON polygon feature covering the rectangle with the given corners.
pub fn rectangle_feature(
    (min_x, min_y): (f64, f64),
    (max_x, max_y): (f64, f64),
    properties: serde_json::Value,
) -> serde_json::Value {
    serde_json::json!({
        "type": "Feature",
        "properties": properties,
        "geometry": {
            "type": "Polygon",
            "coordinates": [[
                [min_x, min_y],
                [max_x, min_y],
                [max_x, max_y],
                [min_x, max_y],
                [min_x, min_y]
            ]]
        }
    })
}

pub fn point_feature(x: f64, y: f64, properties: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "type": "Feature",
        "properties": properties,
        "geometry": { "type": "Point", "coordinates": [x, y] }
    })
}

/// Writes the features as a GeoJSON file in the coordinate system `EPSG:<epsg>`.
pub fn write_geojson(path: &Path, epsg: u32, features: Vec<serde_json::Value>) -> PathBuf {
    let collection = serde_json::json!({
        "type": "FeatureCollection",
        "crs": {
            "type": "name",
            "properties": { "name": format!("urn:ogc:def:crs:EPSG::{epsg}") }
        },
        "features": features
    });

    std::fs::write(path, collection.to_string()).unwrap();

    path.to_path_buf()
}

/// Log output shared between the subscriber and the test.
#[derive(Debug, Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Runs `f` with a subscriber that records log messages of level `INFO` and above.
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();

    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .with_writer(move || writer.clone())
        .finish();

    let result = tracing::subscriber::with_default(subscriber, f);

    let logs = String::from_utf8_lossy(&buffer.0.lock().unwrap()).into_owned();
    (result, logs)
}
