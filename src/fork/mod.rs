pub mod cheats;
pub mod signers;

use std::path::PathBuf;

use alloy::node_bindings::{Anvil, AnvilInstance};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use anyhow::{Context, Result};
use tracing::info;

use crate::error::HarnessError;
use crate::model::NetworkProfile;

pub use signers::Signers;

/// Base fee the fork starts with (0.1 gwei), matching the gas price override.
const BASE_FEE_PER_GAS: &str = "100000000";

// ── Config ───────────────────────────────────────────────────────────

/// How to obtain the chain a suite runs against.
#[derive(Debug, Clone)]
pub struct ForkConfig {
    pub network: &'static NetworkProfile,
    /// Upstream RPC to fork from. Required unless `attach_url` is set.
    pub fork_url: Option<String>,
    /// Block to pin the fork at. `None` forks at the upstream head.
    pub fork_block: Option<u64>,
    /// Use an already-running fork instead of spawning Anvil.
    pub attach_url: Option<String>,
    pub mnemonic: Option<String>,
    pub anvil_path: Option<PathBuf>,
}

// ── Chain handle ─────────────────────────────────────────────────────

/// Shared connection to the forked node.
///
/// The provider carries no wallet: every account the harness sends from is
/// either one of the node's dev accounts or impersonated, so the node signs.
#[derive(Clone)]
pub struct ChainHandle {
    pub provider: DynProvider,
    pub rpc_url: String,
}

impl ChainHandle {
    pub fn connect(rpc_url: &str) -> Result<Self> {
        let url = rpc_url
            .parse()
            .map_err(|e| HarnessError::Config(format!("invalid RPC URL '{rpc_url}': {e}")))?;
        let provider = ProviderBuilder::new().connect_http(url).erased();
        Ok(ChainHandle {
            provider,
            rpc_url: rpc_url.to_string(),
        })
    }
}

// ── Fork ─────────────────────────────────────────────────────────────

/// A running fork plus the named accounts on it. Dropping it stops Anvil.
pub struct Fork {
    pub chain: ChainHandle,
    pub signers: Signers,
    pub network: &'static NetworkProfile,
    pub block: u64,
    _anvil: Option<AnvilInstance>,
}

impl Fork {
    /// Spawn Anvil (or attach to a running node) and resolve the signers.
    pub async fn start(config: &ForkConfig) -> Result<Self> {
        let (anvil, rpc_url) = match &config.attach_url {
            Some(url) => {
                info!(url = %url, "attaching to running node");
                (None, url.clone())
            }
            None => {
                let anvil = spawn_anvil(config)?;
                let url = anvil.endpoint();
                (Some(anvil), url)
            }
        };

        let chain = ChainHandle::connect(&rpc_url)?;
        let chain_id = chain.provider.get_chain_id().await.context("eth_chainId")?;
        if chain_id != config.network.chain_id {
            return Err(HarnessError::Config(format!(
                "node at {rpc_url} reports chain {chain_id}, expected {} for {}",
                config.network.chain_id, config.network.name
            ))
            .into());
        }

        let block = chain.provider.get_block_number().await.context("eth_blockNumber")?;
        let signers = Signers::load(&chain).await?;
        info!(network = %config.network, block, "fork ready");

        Ok(Fork {
            chain,
            signers,
            network: config.network,
            block,
            _anvil: anvil,
        })
    }
}

fn spawn_anvil(config: &ForkConfig) -> Result<AnvilInstance> {
    let fork_url = config.fork_url.as_deref().ok_or_else(|| {
        HarnessError::Config(format!(
            "no upstream RPC for {}. Set {} or pass --fork-url",
            config.network.name, config.network.rpc_env
        ))
    })?;

    let mut anvil = match &config.anvil_path {
        Some(path) => Anvil::at(path),
        None => Anvil::new(),
    };
    anvil = anvil
        .fork(fork_url)
        .chain_id(config.network.chain_id)
        .arg("--block-base-fee-per-gas")
        .arg(BASE_FEE_PER_GAS);
    if let Some(block) = config.fork_block {
        anvil = anvil.fork_block_number(block);
    }
    if let Some(mnemonic) = &config.mnemonic {
        anvil = anvil.mnemonic(mnemonic);
    }

    info!(
        network = config.network.name,
        block = ?config.fork_block,
        "spawning anvil fork"
    );
    anvil
        .try_spawn()
        .map_err(|e| HarnessError::Config(format!("failed to spawn anvil: {e}")).into())
}
