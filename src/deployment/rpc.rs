use std::sync::Arc;

use async_trait::async_trait;
use ethers::abi::Token;
use ethers::prelude::SignerMiddleware;
use ethers::providers::{Http, JsonRpcClient, Middleware, Provider};
use ethers::signers::{LocalWallet, Signer, Wallet};
use ethers::types::Address;
use eyre::WrapErr;
use tracing::{info, instrument};

use super::constructor_args;
use super::{
    ConstructorArg, ContractFactory, ContractFactoryProvider,
    DeployedContract, DeployerSigner, SignerProvider,
};
use crate::artifacts::{Artifact, ArtifactStore};
use crate::cli::PrivateKey;

pub type LocalSignerClient<P = Http> = SignerMiddleware<Provider<P>, LocalWallet>;

#[derive(Debug, Clone)]
pub enum RpcSigner<P = Http> {
    /// Signs locally with a private key
    Local(Arc<LocalSignerClient<P>>),
    /// An account unlocked on the node, transactions are sent unsigned
    Node {
        client: Arc<Provider<P>>,
        address: Address,
    },
}

#[async_trait]
impl<P> DeployerSigner for RpcSigner<P>
where
    P: JsonRpcClient + 'static,
{
    async fn get_address(&self) -> eyre::Result<Address> {
        match self {
            Self::Local(client) => Ok(client.address()),
            Self::Node { address, .. } => Ok(*address),
        }
    }
}

pub struct RpcSignerProvider<P = Http> {
    provider: Provider<P>,
    private_keys: Vec<PrivateKey>,
}

impl<P> RpcSignerProvider<P> {
    pub fn new(provider: Provider<P>, private_keys: Vec<PrivateKey>) -> Self {
        Self {
            provider,
            private_keys,
        }
    }
}

#[async_trait]
impl<P> SignerProvider for RpcSignerProvider<P>
where
    P: JsonRpcClient + Clone + 'static,
{
    type Signer = RpcSigner<P>;

    #[instrument(skip_all)]
    async fn get_signers(&self) -> eyre::Result<Vec<RpcSigner<P>>> {
        if self.private_keys.is_empty() {
            let accounts = self
                .provider
                .get_accounts()
                .await
                .wrap_err("Fetching node accounts")?;

            info!(count = accounts.len(), "Using node accounts");

            let signers = accounts
                .into_iter()
                .map(|address| RpcSigner::Node {
                    client: Arc::new(self.provider.clone().with_sender(address)),
                    address,
                })
                .collect();

            return Ok(signers);
        }

        let chain_id = self
            .provider
            .get_chainid()
            .await
            .wrap_err("Fetching chain id")?;

        info!(%chain_id, count = self.private_keys.len(), "Using local keys");

        let signers = self
            .private_keys
            .iter()
            .map(|private_key| {
                let wallet = Wallet::from(private_key.key.clone())
                    .with_chain_id(chain_id.as_u64());

                let client = SignerMiddleware::new(self.provider.clone(), wallet);

                RpcSigner::Local(Arc::new(client))
            })
            .collect();

        Ok(signers)
    }
}

pub struct ArtifactFactoryProvider {
    store: ArtifactStore,
}

impl ArtifactFactoryProvider {
    pub fn new(store: ArtifactStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<P> ContractFactoryProvider<RpcSigner<P>> for ArtifactFactoryProvider
where
    P: JsonRpcClient + Clone + 'static,
{
    type Factory = ArtifactFactory<P>;

    async fn get_contract_factory(
        &self,
        name: &str,
        signer: &RpcSigner<P>,
    ) -> eyre::Result<ArtifactFactory<P>> {
        let artifact = self.store.find(name).await?;

        info!(contract = %artifact.spec, "Resolved artifact");

        Ok(ArtifactFactory {
            artifact,
            signer: signer.clone(),
        })
    }
}

/// A compiled contract bound to the signer that pays for its deployment
pub struct ArtifactFactory<P = Http> {
    artifact: Artifact,
    signer: RpcSigner<P>,
}

#[async_trait]
impl<P> ContractFactory for ArtifactFactory<P>
where
    P: JsonRpcClient + 'static,
{
    #[instrument(name = "send_deployment", skip_all)]
    async fn deploy(
        &self,
        args: &[ConstructorArg],
    ) -> eyre::Result<DeployedContract> {
        let tokens = constructor_args::tokenize(&self.artifact.abi, args)?;

        let deployed = match &self.signer {
            RpcSigner::Local(client) => {
                deploy_with(client.clone(), &self.artifact, tokens).await?
            }
            RpcSigner::Node { client, .. } => {
                deploy_with(client.clone(), &self.artifact, tokens).await?
            }
        };

        info!(
            contract = %self.artifact.spec,
            address = ?deployed.address,
            transaction_hash = ?deployed.transaction_hash,
            "Deployed"
        );

        Ok(deployed)
    }
}

async fn deploy_with<M>(
    client: Arc<M>,
    artifact: &Artifact,
    tokens: Vec<Token>,
) -> eyre::Result<DeployedContract>
where
    M: Middleware + 'static,
{
    let factory = ethers::contract::ContractFactory::new(
        artifact.abi.clone(),
        artifact.bytecode.clone(),
        client,
    );

    let (contract, receipt) = factory
        .deploy_tokens(tokens)
        .wrap_err("Building deployment transaction")?
        .send_with_receipt()
        .await
        .wrap_err("Sending deployment transaction")?;

    Ok(DeployedContract {
        address: contract.address(),
        transaction_hash: receipt.transaction_hash,
    })
}
