use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[snafu(context(suffix(false)))] // disables default `Snafu` suffix
pub enum Error {
    #[snafu(display("Could not load settings: {reason}"))]
    LoadSettings { reason: String },

    #[snafu(display("ConfigError: {}", source))]
    Config { source: config::ConfigError },

    #[snafu(display("Failed to acquire the settings lock"))]
    ConfigLockFailed,

    #[snafu(display("Invalid log spec {log_spec}: {source}"))]
    InvalidLogSpec {
        log_spec: String,
        source: tracing_subscriber::filter::ParseError,
    },

    #[snafu(display("Could not install the log subscriber: {source}"))]
    LogSubscriber {
        source: tracing_subscriber::util::TryInitError,
    },

    #[snafu(display("GdalError: {}", source))]
    Gdal { source: gdal::errors::GdalError },
}

impl From<gdal::errors::GdalError> for Error {
    fn from(gdal_error: gdal::errors::GdalError) -> Self {
        Self::Gdal { source: gdal_error }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
