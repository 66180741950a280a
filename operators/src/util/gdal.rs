use gdal::cpl::CslStringList;
use gdal::{Dataset, DatasetOptions, GdalOpenFlags};
use geoutils_datatypes::raster::RasterMetadata;
use geoutils_datatypes::util::gdal::{gdal_open_dataset, gdal_open_dataset_ex};
use serde::{Deserialize, Serialize};
use snafu::ensure;
use std::path::{Path, PathBuf};

use crate::error;
use crate::util::Result;

const INTERMEDIATE_FILE_SUFFIX: &str = "GEOUTILS-TMP";

/// Number of threads for GDAL to use when warping or compressing files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GdalNumThreads {
    #[default]
    AllCpus,
    NumThreads(u16),
}

impl<'de> Deserialize<'de> for GdalNumThreads {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let number_of_threads = u16::deserialize(deserializer)?;

        if number_of_threads == 0 {
            Ok(GdalNumThreads::AllCpus)
        } else {
            Ok(GdalNumThreads::NumThreads(number_of_threads))
        }
    }
}

impl Serialize for GdalNumThreads {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Self::AllCpus => serializer.serialize_u16(0),
            Self::NumThreads(number_of_threads) => serializer.serialize_u16(*number_of_threads),
        }
    }
}

impl std::fmt::Display for GdalNumThreads {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AllCpus => write!(f, "ALL_CPUS"),
            Self::NumThreads(n) => write!(f, "{n}"),
        }
    }
}

impl From<u16> for GdalNumThreads {
    fn from(number_of_threads: u16) -> Self {
        if number_of_threads == 0 {
            Self::AllCpus
        } else {
            Self::NumThreads(number_of_threads)
        }
    }
}

/// Opens a raster and reads its metadata.
pub fn open_raster(path: &Path) -> Result<(Dataset, RasterMetadata)> {
    let dataset = gdal_open_dataset(path)?;
    let metadata = RasterMetadata::from_dataset(&dataset)?;

    Ok((dataset, metadata))
}

/// Opens a vector file such as a GeoPackage or a Shapefile.
pub fn open_vector(path: &Path) -> Result<Dataset> {
    Ok(gdal_open_dataset_ex(
        path,
        DatasetOptions {
            open_flags: GdalOpenFlags::GDAL_OF_VECTOR,
            ..Default::default()
        },
    )?)
}

/// Fails with `MissingCoordinateSystem` if the raster at `path` has no spatial reference.
pub fn ensure_spatial_reference(path: &Path, metadata: &RasterMetadata) -> Result<()> {
    ensure!(
        metadata.grid.has_spatial_reference(),
        error::MissingCoordinateSystem { path }
    );
    Ok(())
}

/// Builds a GDAL string list from `KEY=VALUE` pairs.
pub fn name_value_list<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Result<CslStringList>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut list = CslStringList::new();
    for (key, value) in pairs {
        list.set_name_value(key.as_ref(), value.as_ref())?;
    }
    Ok(list)
}

pub fn intermediate_file_path(output_file_path: &Path) -> PathBuf {
    output_file_path.with_extension(INTERMEDIATE_FILE_SUFFIX)
}

/// Lets `write_dataset` create and fill a dataset at an intermediate path next to
/// `output_file_path` and moves it to its final place afterwards.
///
/// If `write_dataset` fails, the intermediate file is removed so that no partial output
/// remains.
///
pub fn write_via_intermediate_file<F>(output_file_path: &Path, write_dataset: F) -> Result<()>
where
    F: FnOnce(&Path) -> Result<Dataset>,
{
    let intermediate_file_path = intermediate_file_path(output_file_path);

    let dataset = match write_dataset(&intermediate_file_path) {
        Ok(dataset) => dataset,
        Err(error) => {
            remove_intermediate_file(&intermediate_file_path);
            return Err(error);
        }
    };

    let driver = dataset.driver();

    // close file before renaming
    drop(dataset);

    driver.rename(output_file_path, &intermediate_file_path)?;

    Ok(())
}

fn remove_intermediate_file(intermediate_file_path: &Path) {
    if !intermediate_file_path.exists() {
        return;
    }

    if let Err(error) = std::fs::remove_file(intermediate_file_path) {
        tracing::warn!(
            "Could not remove intermediate file {}: {error}",
            intermediate_file_path.display()
        );
    }
}
