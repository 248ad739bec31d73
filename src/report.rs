use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::deployment::{ConstructorArg, DeploymentOutput};
use crate::serde_utils;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Report {
    pub network: String,
    pub contract: String,
    pub constructor_args: Vec<ConstructorArg>,
    pub deployment: DeploymentOutput,
}

impl Report {
    pub fn new(
        network: impl ToString,
        contract: impl ToString,
        constructor_args: &[ConstructorArg],
        deployment: DeploymentOutput,
    ) -> Self {
        Self {
            network: network.to_string(),
            contract: contract.to_string(),
            constructor_args: constructor_args.to_vec(),
            deployment,
        }
    }
}

#[instrument(skip_all)]
pub async fn write_report(
    path: impl AsRef<Path>,
    report: &Report,
) -> eyre::Result<()> {
    let path = path.as_ref();

    serde_utils::write_serialize(path, report).await?;

    info!(path = %path.display(), "Wrote deployment report");

    Ok(())
}
