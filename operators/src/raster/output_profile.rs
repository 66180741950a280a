use gdal::cpl::CslStringList;
use gdal::raster::GdalType;
use gdal::{Dataset, DriverManager, Metadata};
use geoutils_datatypes::raster::{BlockWindows, GridDefinition, RasterDataType};
use geoutils_datatypes::util::gdal::set_band_no_data_value;
use serde::{Deserialize, Serialize};
use snafu::ensure;
use std::path::Path;
use std::str::FromStr;
use strum::EnumIter;

use crate::error::{self, Error};
use crate::util::Result;
use crate::util::gdal::{GdalNumThreads, name_value_list};

/// GeoTIFF tiles must have a size that is a multiple of this.
const TILE_SIZE_MULTIPLE: usize = 16;

pub const DEFAULT_BLOCK_SIZE: usize = 512;

/// Compression codecs of the GeoTIFF driver.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    strum::Display,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Compression {
    Deflate,
    Lzw,
    #[default]
    Zstd,
    Jpeg,
    Packbits,
}

impl Compression {
    /// Whether the codec can encode pixels of `data_type`.
    pub fn supports(self, data_type: RasterDataType) -> bool {
        match self {
            Compression::Jpeg => data_type == RasterDataType::U8,
            _ => true,
        }
    }
}

impl FromStr for Compression {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DEFLATE" => Ok(Compression::Deflate),
            "LZW" => Ok(Compression::Lzw),
            "ZSTD" => Ok(Compression::Zstd),
            "JPEG" => Ok(Compression::Jpeg),
            "PACKBITS" => Ok(Compression::Packbits),
            _ => Err(Error::InvalidCompression {
                compression: s.to_string(),
            }),
        }
    }
}

/// The TIFF predictor applied before compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Predictor {
    Horizontal,
    FloatingPoint,
}

impl Predictor {
    /// Only LZW and ZSTD get a predictor.
    pub fn for_compression(compression: Compression, data_type: RasterDataType) -> Option<Self> {
        match compression {
            Compression::Lzw | Compression::Zstd if data_type.is_float() => {
                Some(Predictor::FloatingPoint)
            }
            Compression::Lzw | Compression::Zstd => Some(Predictor::Horizontal),
            _ => None,
        }
    }

    pub fn gdal_value(self) -> u8 {
        match self {
            Predictor::Horizontal => 2,
            Predictor::FloatingPoint => 3,
        }
    }
}

/// How the output file is laid out and encoded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTiffOptions {
    pub compression: Option<Compression>,
    pub tiled: bool,
    pub block_size: usize,
    pub big_tiff: bool,
    pub num_threads: GdalNumThreads,
}

impl Default for GeoTiffOptions {
    fn default() -> Self {
        Self {
            compression: Some(Compression::default()),
            tiled: true,
            block_size: DEFAULT_BLOCK_SIZE,
            big_tiff: false,
            num_threads: GdalNumThreads::AllCpus,
        }
    }
}

/// Everything needed to create a GeoTIFF. The grid is taken over as is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoTiffProfile {
    pub grid: GridDefinition,
    pub band_count: usize,
    pub data_type: RasterDataType,
    pub no_data_value: Option<f64>,
    pub band_descriptions: Vec<String>,
    pub compression: Option<Compression>,
    pub predictor: Option<Predictor>,
    /// Tile width and height, `None` for a stripped file.
    pub tile_size: Option<(usize, usize)>,
    pub big_tiff: bool,
    pub num_threads: GdalNumThreads,
}

impl GeoTiffProfile {
    /// Creates a profile with square tiles of `options.block_size` if `options.tiled` is set.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidBlockSize` if tiling is requested with a block size that is zero or
    /// not a multiple of 16, and with `UnsupportedCompression` if the codec cannot encode
    /// `data_type`.
    ///
    pub fn new(
        grid: GridDefinition,
        band_count: usize,
        data_type: RasterDataType,
        no_data_value: Option<f64>,
        options: &GeoTiffOptions,
    ) -> Result<Self> {
        let tile_size = if options.tiled {
            ensure_valid_block_size(options.block_size)?;
            Some((options.block_size, options.block_size))
        } else {
            None
        };

        Self::with_tile_size(grid, band_count, data_type, no_data_value, tile_size, options)
    }

    /// Like [`GeoTiffProfile::new`] but with a given tiling, e.g. the one of an input file.
    pub fn with_tile_size(
        grid: GridDefinition,
        band_count: usize,
        data_type: RasterDataType,
        no_data_value: Option<f64>,
        tile_size: Option<(usize, usize)>,
        options: &GeoTiffOptions,
    ) -> Result<Self> {
        if let Some((tile_width, tile_height)) = tile_size {
            ensure_valid_block_size(tile_width)?;
            ensure_valid_block_size(tile_height)?;
        }

        if let Some(compression) = options.compression {
            ensure!(
                compression.supports(data_type),
                error::UnsupportedCompression {
                    compression,
                    data_type
                }
            );
        }

        let predictor = options
            .compression
            .and_then(|compression| Predictor::for_compression(compression, data_type));

        Ok(Self {
            grid,
            band_count,
            data_type,
            no_data_value,
            band_descriptions: Vec::new(),
            compression: options.compression,
            predictor,
            tile_size,
            big_tiff: options.big_tiff,
            num_threads: options.num_threads,
        })
    }

    #[must_use]
    pub fn with_band_descriptions(mut self, band_descriptions: Vec<String>) -> Self {
        self.band_descriptions = band_descriptions;
        self
    }

    pub fn is_tiled(&self) -> bool {
        self.tile_size.is_some()
    }

    /// The blocks in which the output is processed: its tiles, or the whole grid if the file
    /// is not tiled.
    pub fn block_windows(&self) -> BlockWindows {
        let (block_width, block_height) = self
            .tile_size
            .unwrap_or((self.grid.width, self.grid.height));

        self.grid.block_windows(block_width, block_height)
    }

    /// The creation options of GDAL's GeoTIFF driver.
    pub fn creation_options(&self) -> Result<CslStringList> {
        let mut options: Vec<(&str, String)> = Vec::new();

        if let Some(compression) = self.compression {
            options.push(("COMPRESS", compression.to_string()));
        }

        if let Some(predictor) = self.predictor {
            options.push(("PREDICTOR", predictor.gdal_value().to_string()));
        }

        if let Some((tile_width, tile_height)) = self.tile_size {
            options.push(("TILED", "YES".to_string()));
            options.push(("BLOCKXSIZE", tile_width.to_string()));
            options.push(("BLOCKYSIZE", tile_height.to_string()));
        }

        if self.big_tiff {
            options.push(("BIGTIFF", "IF_SAFER".to_string()));
        }

        options.push(("NUM_THREADS", self.num_threads.to_string()));
        options.push(("INTERLEAVE", "BAND".to_string()));

        name_value_list(options)
    }

    /// Creates the GeoTIFF with pixel type `P`, which must match `self.data_type`.
    pub fn create_dataset<P: GdalType>(&self, path: &Path) -> Result<Dataset> {
        let driver = DriverManager::get_driver_by_name("GTiff")?;

        let mut dataset = driver.create_with_band_type_with_options::<P, _>(
            path,
            self.grid.width,
            self.grid.height,
            self.band_count,
            &self.creation_options()?,
        )?;

        dataset.set_geo_transform(&self.grid.geo_transform.into())?;
        if let Some(spatial_reference) = &self.grid.spatial_reference {
            dataset.set_projection(spatial_reference)?;
        }

        for band_index in 1..=self.band_count {
            let mut band = dataset.rasterband(band_index)?;

            if self.no_data_value.is_some() {
                set_band_no_data_value(&mut band, self.no_data_value)?;
            }

            if let Some(description) = self
                .band_descriptions
                .get(band_index - 1)
                .filter(|d| !d.is_empty())
            {
                band.set_description(description)?;
            }
        }

        Ok(dataset)
    }
}

/// Whether GeoTIFF tiles may have a width or height of `block_size`.
pub fn is_valid_tile_size(block_size: usize) -> bool {
    block_size > 0 && block_size % TILE_SIZE_MULTIPLE == 0
}

fn ensure_valid_block_size(block_size: usize) -> Result<()> {
    ensure!(
        is_valid_tile_size(block_size),
        error::InvalidBlockSize { block_size }
    );
    Ok(())
}
