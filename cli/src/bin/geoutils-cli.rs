use clap::{Parser, Subcommand};
use geoutils_cli::commands::{
    Compare, Compress, CoRegister, CountFeatures, Rasterize, SamplePoints, run_co_register,
    run_compare, run_compress, run_count_features, run_rasterize, run_sample_points,
};
use geoutils_cli::config::{self, get_config_element};
use geoutils_cli::logging::init_logging;

/// CLI for raster and vector utilities
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    CoRegister(CoRegister),
    Compress(Compress),
    Rasterize(Rasterize),
    CountFeatures(CountFeatures),
    SamplePoints(SamplePoints),
    Compare(Compare),
}

fn setup() -> anyhow::Result<bool> {
    let logging_config: config::Logging = get_config_element()?;
    init_logging(&logging_config)?;

    get_config_element::<config::Gdal>()?.apply()?;

    Ok(logging_config.raw_error_messages)
}

fn run(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::CoRegister(params) => run_co_register(params),
        Commands::Compress(params) => run_compress(params),
        Commands::Rasterize(params) => run_rasterize(params),
        Commands::CountFeatures(params) => run_count_features(params),
        Commands::SamplePoints(params) => run_sample_points(params),
        Commands::Compare(params) => run_compare(params),
    }
}

#[allow(clippy::print_stderr)]
fn main() {
    let cli = Cli::parse();

    let raw_error_messages = match setup() {
        Ok(raw_error_messages) => raw_error_messages,
        Err(err) => {
            eprintln!("Error: {err:#}");
            std::process::exit(1);
        }
    };

    if let Err(err) = run(cli.command) {
        if raw_error_messages {
            eprintln!("Error: {err}");
        } else {
            eprintln!("Error: {err:#}");
        }
        std::process::exit(1);
    }
}
