use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use ethers::abi::Abi;
use ethers::types::Bytes;
use eyre::{bail, Context};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::serde_utils;

pub const BUILD_INFO_DIR: &str = "build-info";
const DEBUG_ARTIFACT_SUFFIX: &str = ".dbg.json";

/// Fully qualified contract name, the source path and the contract name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractSpec {
    pub path: PathBuf,
    pub name: String,
}

impl ContractSpec {
    pub fn path_name(path: impl Into<PathBuf>, name: impl ToString) -> Self {
        Self {
            path: path.into(),
            name: name.to_string(),
        }
    }
}

impl fmt::Display for ContractSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path.display(), self.name)
    }
}

/// A compiled contract ready to be deployed
#[derive(Debug, Clone)]
pub struct Artifact {
    pub spec: ContractSpec,
    pub abi: Abi,
    pub bytecode: Bytes,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompilerArtifact {
    contract_name: String,
    source_name: PathBuf,
    abi: Abi,
    bytecode: String,
    #[serde(default)]
    link_references: BTreeMap<String, serde_json::Value>,
}

impl TryFrom<CompilerArtifact> for Artifact {
    type Error = eyre::Error;

    fn try_from(value: CompilerArtifact) -> Result<Self, Self::Error> {
        let spec =
            ContractSpec::path_name(value.source_name, value.contract_name);

        if !value.link_references.is_empty() {
            let libraries = value
                .link_references
                .keys()
                .cloned()
                .collect::<Vec<_>>()
                .join(", ");

            bail!("{spec} must be linked against libraries in {libraries}");
        }

        let bytecode = hex::decode(value.bytecode.trim_start_matches("0x"))
            .with_context(|| format!("Decoding bytecode of {spec}"))?;

        if bytecode.is_empty() {
            bail!("{spec} has no bytecode, it is abstract or an interface");
        }

        Ok(Self {
            spec,
            abi: value.abi,
            bytecode: bytecode.into(),
        })
    }
}

/// Compiler output laid out as `<root>/<sourceName>/<ContractName>.json`
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[instrument(skip(self))]
    pub async fn find(&self, name: &str) -> eyre::Result<Artifact> {
        let candidates = self.candidates(name).await?;

        match candidates.as_slice() {
            [] => bail!(
                "Artifact for {name} not found in {}",
                self.root.display()
            ),
            [path] => load(path).await,
            paths => {
                let mut specs = Vec::with_capacity(paths.len());
                for path in paths {
                    specs.push(load(path).await?.spec.to_string());
                }

                bail!(
                    "There are multiple artifacts for {name}: {}",
                    specs.join(", ")
                );
            }
        }
    }

    async fn candidates(&self, name: &str) -> eyre::Result<Vec<PathBuf>> {
        let is_dir = tokio::fs::metadata(&self.root)
            .await
            .map(|metadata| metadata.is_dir())
            .unwrap_or(false);

        if !is_dir {
            bail!(
                "Artifacts directory {} does not exist, compile the contracts first",
                self.root.display()
            );
        }

        let file_name = format!("{name}.json");
        let build_info = self.root.join(BUILD_INFO_DIR);

        let mut found = vec![];
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir)
                .await
                .with_context(|| format!("Reading {}", dir.display()))?;

            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();

                if entry.file_type().await?.is_dir() {
                    if path != build_info {
                        pending.push(path);
                    }
                    continue;
                }

                let entry_name = entry.file_name();
                let entry_name = entry_name.to_string_lossy();

                if entry_name.ends_with(DEBUG_ARTIFACT_SUFFIX) {
                    continue;
                }

                if entry_name == file_name {
                    debug!(path = %path.display(), "Found artifact");
                    found.push(path);
                }
            }
        }

        found.sort();

        Ok(found)
    }
}

async fn load(path: &Path) -> eyre::Result<Artifact> {
    let artifact: CompilerArtifact =
        serde_utils::read_deserialize_json(path).await?;

    artifact.try_into()
}
