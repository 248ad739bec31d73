use clap::Parser;
use cli::Args;
use tracing::Level;
use tracing_error::ErrorLayer;
use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

pub mod artifacts;
pub mod serde_utils;

mod cli;
mod config;
mod deployment;
mod report;

/// Target of the final error report, printed whatever `RUST_LOG` says
const FAILURE_TARGET: &str = "vanity_deployer::failure";

async fn start() -> eyre::Result<()> {
    let args = Args::parse();

    deployment::run_deployment(args).await
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    dotenv::dotenv().ok();

    let indicatif_layer = IndicatifLayer::new();

    let filter = EnvFilter::from_default_env()
        .add_directive(format!("{FAILURE_TARGET}=off").parse()?);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(indicatif_layer.get_stderr_writer())
                .with_filter(filter),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(indicatif_layer.get_stderr_writer())
                .with_filter(
                    Targets::new().with_target(FAILURE_TARGET, Level::ERROR),
                ),
        )
        .with(indicatif_layer)
        .with(ErrorLayer::default())
        .init();

    match start().await {
        Ok(()) => Ok(()),
        Err(err) => {
            tracing::error!(target: FAILURE_TARGET, "{:?}", err);
            std::process::exit(1)
        }
    }
}
