use crate::error::{self, Result};
use config::{Config, ConfigError, Environment, File, FileFormat};
use geoutils_operators::raster::Compression;
use geoutils_operators::util::gdal::GdalNumThreads;
use serde::Deserialize;
use snafu::ResultExt;
use std::sync::{LazyLock, RwLock};

/// The defaults are compiled in, so that the CLI works from any working directory.
const DEFAULT_SETTINGS: &str = include_str!("../Settings-default.toml");

static SETTINGS: LazyLock<Result<RwLock<Config>, ConfigError>> = LazyLock::new(init_settings);

fn init_settings() -> Result<RwLock<Config>, ConfigError> {
    let mut settings =
        Config::builder().add_source(File::from_str(DEFAULT_SETTINGS, FileFormat::Toml));

    #[cfg(not(test))]
    {
        settings = settings.add_source(File::new("Settings.toml", FileFormat::Toml).required(false));
    }

    // Override config with environment variables that start with `GEOUTILS__`,
    // e.g. `GEOUTILS__LOGGING__LOG_SPEC=debug`
    // Note: Since variables contain underscores, we need to use something different
    // for separating groups, for instance double underscores `__`
    settings = settings.add_source(Environment::with_prefix("geoutils").separator("__"));

    Ok(RwLock::new(settings.build()?))
}

fn settings() -> Result<&'static RwLock<Config>> {
    SETTINGS
        .as_ref()
        .map_err(|error| error::Error::LoadSettings {
            reason: error.to_string(),
        })
}

#[cfg(test)]
pub fn set_config<T>(key: &str, value: T) -> Result<()>
where
    T: Into<config::Value>,
{
    let mut settings = settings()?
        .write()
        .map_err(|_error| error::Error::ConfigLockFailed)?;

    let builder = Config::builder()
        .add_source(settings.clone())
        .set_override(key, value)
        .context(error::Config)?;

    *settings = builder.build().context(error::Config)?;
    Ok(())
}

pub fn get_config<'a, T>(key: &str) -> Result<T>
where
    T: Deserialize<'a>,
{
    settings()?
        .read()
        .map_err(|_error| error::Error::ConfigLockFailed)?
        .get::<T>(key)
        .context(error::Config)
}

pub fn get_config_element<'a, T>() -> Result<T>
where
    T: ConfigElement + Deserialize<'a>,
{
    get_config(T::KEY)
}

pub trait ConfigElement {
    const KEY: &'static str;
}

#[derive(Debug, Deserialize)]
pub struct Logging {
    pub log_spec: String,
    pub raw_error_messages: bool,
}

impl ConfigElement for Logging {
    const KEY: &'static str = "logging";
}

#[derive(Debug, Deserialize)]
pub struct Gdal {
    pub num_threads: GdalNumThreads,
    pub cache_max: Option<String>,
}

impl ConfigElement for Gdal {
    const KEY: &'static str = "gdal";
}

impl Gdal {
    /// Sets the global GDAL options that follow from the settings.
    pub fn apply(&self) -> Result<()> {
        if let Some(cache_max) = &self.cache_max {
            gdal::config::set_config_option("GDAL_CACHEMAX", cache_max)?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct CoRegistration {
    #[serde(default)]
    pub compression: Option<Compression>,
    pub tiled: bool,
    pub block_size: usize,
    pub big_tiff: bool,
}

impl ConfigElement for CoRegistration {
    const KEY: &'static str = "co_registration";
}

#[derive(Debug, Deserialize)]
pub struct Rasterization {
    pub tiled: bool,
    pub block_size: usize,
}

impl ConfigElement for Rasterization {
    const KEY: &'static str = "rasterization";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_loads_defaults() {
        let logging = get_config_element::<Logging>().unwrap();
        assert!(!logging.raw_error_messages);

        let gdal = get_config_element::<Gdal>().unwrap();
        assert_eq!(gdal.num_threads, GdalNumThreads::AllCpus);
        assert_eq!(gdal.cache_max, None);

        let co_registration = get_config_element::<CoRegistration>().unwrap();
        assert_eq!(co_registration.compression, Some(Compression::Zstd));
        assert!(co_registration.tiled);
        assert_eq!(co_registration.block_size, 512);
        assert!(!co_registration.big_tiff);

        let rasterization = get_config_element::<Rasterization>().unwrap();
        assert!(rasterization.tiled);
        assert_eq!(rasterization.block_size, 512);
    }

    #[test]
    fn it_overrides_settings() {
        set_config("logging.log_spec", "debug").unwrap();

        assert_eq!(
            get_config_element::<Logging>().unwrap().log_spec,
            "debug"
        );
    }
}
