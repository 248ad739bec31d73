use std::path::PathBuf;

use clap::Parser;

pub mod private_key;

pub use private_key::PrivateKey;
use reqwest::Url;

/// Deploys the Vanity contract
///
/// Every option is optional and can also be provided through the
/// environment (or a `.env` file).
#[derive(Debug, Clone, Parser)]
#[clap(rename_all = "kebab-case")]
pub struct Args {
    /// Path to the deployer configuration file
    ///
    /// Defaults to `deployer.yml` in the working directory when it exists
    #[clap(short, long, env)]
    pub config: Option<PathBuf>,

    /// Name of the network to deploy to
    #[clap(short, long, env)]
    pub network: Option<String>,

    /// Overrides the RPC Url of the selected network
    #[clap(short, long, env)]
    pub rpc_url: Option<Url>,

    /// Private keys to deploy with, comma separated
    ///
    /// Overrides the accounts of the selected network. The first one is
    /// used as the deployer.
    #[clap(short, long, env, value_delimiter = ',')]
    pub private_key: Vec<PrivateKey>,

    /// Directory holding the compiled contract artifacts
    #[clap(long, env)]
    pub artifacts: Option<PathBuf>,

    /// Where to write the deployment report
    #[clap(long, env)]
    pub report: Option<PathBuf>,
}
