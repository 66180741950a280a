use snafu::ResultExt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::Logging;
use crate::error::{self, Result};

const GDAL_LOG_TARGET: &str = "GDAL";

/// Installs the global log subscriber that writes to `STDERR` and routes GDAL's messages
/// into it.
pub fn init_logging(logging_config: &Logging) -> Result<()> {
    let console_filter =
        EnvFilter::try_new(&logging_config.log_spec).context(error::InvalidLogSpec {
            log_spec: &logging_config.log_spec,
        })?;

    let console_layer = tracing_subscriber::fmt::layer()
        .with_file(false)
        .with_target(true)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(console_filter);

    tracing_subscriber::registry()
        .with(console_layer)
        .try_init()
        .context(error::LogSubscriber)?;

    reroute_gdal_logging();

    Ok(())
}

fn reroute_gdal_logging() {
    gdal::config::set_error_handler(|error_type, error_num, error_msg| match error_type {
        gdal::errors::CplErrType::None => {
            // should never log anything
            tracing::info!(target: GDAL_LOG_TARGET, "GDAL None {error_num}: {error_msg}");
        }
        gdal::errors::CplErrType::Debug => {
            tracing::debug!(target: GDAL_LOG_TARGET, "GDAL Debug {error_num}: {error_msg}");
        }
        gdal::errors::CplErrType::Warning => {
            tracing::warn!(target: GDAL_LOG_TARGET, "GDAL Warning {error_num}: {error_msg}");
        }
        gdal::errors::CplErrType::Failure => {
            tracing::error!(target: GDAL_LOG_TARGET, "GDAL Failure {error_num}: {error_msg}");
        }
        gdal::errors::CplErrType::Fatal => {
            tracing::error!(target: GDAL_LOG_TARGET, "GDAL Fatal {error_num}: {error_msg}");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_log_spec_fails() {
        let result = init_logging(&Logging {
            log_spec: "geoutils=loud".to_string(),
            raw_error_messages: false,
        });

        assert!(matches!(result, Err(error::Error::InvalidLogSpec { .. })));
    }
}
