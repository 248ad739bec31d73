use std::io::Write;

use async_trait::async_trait;
use ethers::providers::{Http, Provider};
use ethers::types::{Address, H256};
use ethers::utils::to_checksum;
use eyre::{ContextCompat, WrapErr};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use self::rpc::{ArtifactFactoryProvider, RpcSignerProvider};
use crate::artifacts::ArtifactStore;
use crate::cli::Args;
use crate::config::Config;
use crate::report::{self, Report};

pub mod constructor_args;
pub mod rpc;

pub use self::constructor_args::ConstructorArg;

pub const CONTRACT_NAME: &str = "Vanity";

/// Passed through to the contract constructor as is
pub const CONSTRUCTOR_ARGS: [ConstructorArg; 2] = [
    ConstructorArg::Integer(86_544_564),
    ConstructorArg::Fractional(0.001),
];

/// Supplies the identities able to sign transactions on the network
#[async_trait]
pub trait SignerProvider: Send + Sync {
    type Signer: DeployerSigner;

    async fn get_signers(&self) -> eyre::Result<Vec<Self::Signer>>;
}

#[async_trait]
pub trait DeployerSigner: Send + Sync {
    async fn get_address(&self) -> eyre::Result<Address>;
}

/// Resolves a contract by name into something that can deploy it on
/// behalf of `signer`
#[async_trait]
pub trait ContractFactoryProvider<S>: Send + Sync
where
    S: DeployerSigner,
{
    type Factory: ContractFactory;

    async fn get_contract_factory(
        &self,
        name: &str,
        signer: &S,
    ) -> eyre::Result<Self::Factory>;
}

#[async_trait]
pub trait ContractFactory: Send + Sync {
    async fn deploy(
        &self,
        args: &[ConstructorArg],
    ) -> eyre::Result<DeployedContract>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeployedContract {
    pub address: Address,
    pub transaction_hash: H256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentOutput {
    pub deployer: Address,
    pub deployed_to: Address,
    pub transaction_hash: H256,
}

pub struct DeploymentRunner<P, F> {
    signer_provider: P,
    factory_provider: F,
}

impl<P, F> DeploymentRunner<P, F>
where
    P: SignerProvider,
    F: ContractFactoryProvider<P::Signer>,
{
    pub fn new(signer_provider: P, factory_provider: F) -> Self {
        Self {
            signer_provider,
            factory_provider,
        }
    }

    /// Deploys the contract once, writing the deployer and contract
    /// addresses to `out`
    #[instrument(name = "deploy", skip_all, fields(contract = CONTRACT_NAME))]
    pub async fn run(
        &self,
        out: &mut impl Write,
    ) -> eyre::Result<DeploymentOutput> {
        let signers = self
            .signer_provider
            .get_signers()
            .await
            .wrap_err("Fetching signers")?;

        let deployer =
            signers.into_iter().next().context("No signers available")?;

        let deployer_address = deployer
            .get_address()
            .await
            .wrap_err("Resolving deployer address")?;

        writeln!(
            out,
            "Deploying {CONTRACT_NAME} Contract with address: {}",
            to_checksum(&deployer_address, None)
        )?;

        let factory = self
            .factory_provider
            .get_contract_factory(CONTRACT_NAME, &deployer)
            .await
            .wrap_err_with(|| {
                format!("Getting contract factory for {CONTRACT_NAME}")
            })?;

        info!(args = ?CONSTRUCTOR_ARGS, "Sending deployment");

        let deployed = factory
            .deploy(&CONSTRUCTOR_ARGS)
            .await
            .wrap_err_with(|| format!("Deploying {CONTRACT_NAME}"))?;

        writeln!(
            out,
            "{CONTRACT_NAME} contract deployed at {}",
            to_checksum(&deployed.address, None)
        )?;

        Ok(DeploymentOutput {
            deployer: deployer_address,
            deployed_to: deployed.address,
            transaction_hash: deployed.transaction_hash,
        })
    }
}

pub async fn run_deployment(args: Args) -> eyre::Result<()> {
    let config = Config::load(args.config.as_deref()).await?;

    let network_name = args
        .network
        .unwrap_or_else(|| config.default_network.clone());

    let mut network = config.network(&network_name)?;

    if let Some(rpc_url) = args.rpc_url {
        network.url = rpc_url;
    }

    if !args.private_key.is_empty() {
        network.accounts = args.private_key;
    }

    let artifacts = args.artifacts.unwrap_or(config.artifacts);

    info!(
        network = %network_name,
        url = %network.url,
        artifacts = %artifacts.display(),
        "Using network"
    );

    let provider = Provider::<Http>::try_from(network.url.as_str())?;

    let runner = DeploymentRunner::new(
        RpcSignerProvider::new(provider, network.accounts),
        ArtifactFactoryProvider::new(ArtifactStore::new(artifacts)),
    );

    let output = runner.run(&mut std::io::stdout()).await?;

    if let Some(report_path) = args.report {
        let report = Report::new(
            network_name,
            CONTRACT_NAME,
            &CONSTRUCTOR_ARGS,
            output,
        );

        report::write_report(&report_path, &report).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use eyre::eyre;
    use ethers::types::H160;
    use hex_literal::hex;

    use super::*;

    const DEPLOYER: Address =
        H160(hex!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266"));
    const SECOND: Address =
        H160(hex!("70997970c51812dc3a010c7d01b50e0d17dc79c8"));
    const DEPLOYED: Address =
        H160(hex!("5fbdb2315678afecb367f032d93f642f64180aa3"));
    const TX_HASH: H256 = H256([7; 32]);

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Step {
        Signers,
        Address,
        Factory,
        Deploy,
    }

    /// Records every provider call, fails the configured step
    #[derive(Debug, Clone, Default)]
    struct Recorder {
        fail_at: Option<Step>,
        no_signers: bool,
        calls: Arc<Mutex<Vec<Step>>>,
        deploy_args: Arc<Mutex<Vec<Vec<ConstructorArg>>>>,
        deploy_attempts: Arc<AtomicUsize>,
    }

    impl Recorder {
        fn failing_at(step: Step) -> Self {
            Self {
                fail_at: Some(step),
                ..Default::default()
            }
        }

        fn record(&self, step: Step) -> eyre::Result<()> {
            self.calls.lock().unwrap().push(step);

            if self.fail_at == Some(step) {
                return Err(eyre!("connection refused during {step:?}"));
            }

            Ok(())
        }

        fn calls(&self) -> Vec<Step> {
            self.calls.lock().unwrap().clone()
        }
    }

    struct MockSigner {
        address: Address,
        recorder: Recorder,
    }

    #[async_trait]
    impl SignerProvider for Recorder {
        type Signer = MockSigner;

        async fn get_signers(&self) -> eyre::Result<Vec<MockSigner>> {
            self.record(Step::Signers)?;

            if self.no_signers {
                return Ok(vec![]);
            }

            Ok([DEPLOYER, SECOND]
                .into_iter()
                .map(|address| MockSigner {
                    address,
                    recorder: self.clone(),
                })
                .collect())
        }
    }

    #[async_trait]
    impl DeployerSigner for MockSigner {
        async fn get_address(&self) -> eyre::Result<Address> {
            self.recorder.record(Step::Address)?;

            Ok(self.address)
        }
    }

    struct MockFactory {
        recorder: Recorder,
    }

    #[async_trait]
    impl ContractFactoryProvider<MockSigner> for Recorder {
        type Factory = MockFactory;

        async fn get_contract_factory(
            &self,
            name: &str,
            signer: &MockSigner,
        ) -> eyre::Result<MockFactory> {
            self.record(Step::Factory)?;

            assert_eq!(name, "Vanity");
            assert_eq!(signer.address, DEPLOYER);

            Ok(MockFactory {
                recorder: self.clone(),
            })
        }
    }

    #[async_trait]
    impl ContractFactory for MockFactory {
        async fn deploy(
            &self,
            args: &[ConstructorArg],
        ) -> eyre::Result<DeployedContract> {
            self.recorder.deploy_attempts.fetch_add(1, Ordering::SeqCst);
            self.recorder.deploy_args.lock().unwrap().push(args.to_vec());
            self.recorder.record(Step::Deploy)?;

            Ok(DeployedContract {
                address: DEPLOYED,
                transaction_hash: TX_HASH,
            })
        }
    }

    async fn run(recorder: &Recorder) -> (eyre::Result<DeploymentOutput>, String) {
        let runner = DeploymentRunner::new(recorder.clone(), recorder.clone());

        let mut out = Vec::new();
        let result = runner.run(&mut out).await;

        (result, String::from_utf8(out).unwrap())
    }

    #[tokio::test]
    async fn deploys_with_first_signer() -> eyre::Result<()> {
        let recorder = Recorder::default();

        let (result, out) = run(&recorder).await;

        assert_eq!(
            result?,
            DeploymentOutput {
                deployer: DEPLOYER,
                deployed_to: DEPLOYED,
                transaction_hash: TX_HASH,
            }
        );

        let lines: Vec<_> = out.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Deploying Vanity Contract with address: 0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266",
                "Vanity contract deployed at 0x5FbDB2315678afecb367f032d93F642f64180aa3",
            ]
        );

        assert_eq!(
            recorder.calls(),
            vec![Step::Signers, Step::Address, Step::Factory, Step::Deploy]
        );

        Ok(())
    }

    #[tokio::test]
    async fn deploys_with_fixed_arguments() -> eyre::Result<()> {
        let recorder = Recorder::default();

        let (result, _) = run(&recorder).await;
        result?;

        let deploy_args = recorder.deploy_args.lock().unwrap().clone();
        assert_eq!(
            deploy_args,
            vec![vec![
                ConstructorArg::Integer(86544564),
                ConstructorArg::Fractional(0.001),
            ]]
        );

        Ok(())
    }

    #[tokio::test]
    async fn signer_failure_stops_before_output() {
        let recorder = Recorder::failing_at(Step::Signers);

        let (result, out) = run(&recorder).await;

        let err = result.unwrap_err();
        assert!(format!("{err:?}").contains("connection refused"));
        assert!(out.is_empty());
        assert_eq!(recorder.calls(), vec![Step::Signers]);
    }

    #[tokio::test]
    async fn no_signers_is_an_error() {
        let recorder = Recorder {
            no_signers: true,
            ..Default::default()
        };

        let (result, out) = run(&recorder).await;

        assert_eq!(result.unwrap_err().to_string(), "No signers available");
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn address_failure() {
        let recorder = Recorder::failing_at(Step::Address);

        let (result, out) = run(&recorder).await;

        assert!(result.is_err());
        assert!(out.is_empty());
        assert_eq!(recorder.calls(), vec![Step::Signers, Step::Address]);
    }

    #[tokio::test]
    async fn factory_failure() {
        let recorder = Recorder::failing_at(Step::Factory);

        let (result, out) = run(&recorder).await;

        let err = result.unwrap_err();
        assert_eq!(err.to_string(), "Getting contract factory for Vanity");
        assert_eq!(out.lines().count(), 1);
        assert_eq!(recorder.deploy_attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn deploy_failure_is_not_retried() {
        let recorder = Recorder::failing_at(Step::Deploy);

        let (result, out) = run(&recorder).await;

        let err = result.unwrap_err();
        assert_eq!(err.to_string(), "Deploying Vanity");
        assert!(format!("{err:?}").contains("connection refused during Deploy"));

        assert_eq!(out.lines().count(), 1);
        assert_eq!(recorder.deploy_attempts.load(Ordering::SeqCst), 1);
        assert_eq!(
            recorder.calls(),
            vec![Step::Signers, Step::Address, Step::Factory, Step::Deploy]
        );
    }
}
