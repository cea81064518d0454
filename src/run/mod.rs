pub mod config;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::deploy::ArtifactStore;
use crate::fork::Fork;
use crate::model::pool::{self, Descriptor};
use crate::model::{BeefyVaultItem, PoolItem, StakingPoolItem};
use crate::protocols::{self, Protocol, SuiteContext};

use config::HarnessConfig;

/// CLI-facing arguments of `verify` (before env var resolution).
#[derive(Debug, Clone)]
pub struct VerifyArgs {
    pub protocol: Protocol,
    pub pools: Option<PathBuf>,
    pub staking_pools: Option<PathBuf>,
    pub fork_url: Option<String>,
    pub fork_block: Option<u64>,
    pub rpc_url: Option<String>,
    pub artifacts: Option<PathBuf>,
    pub skip: Vec<String>,
    pub only: Vec<String>,
    pub output: Option<PathBuf>,
}

/// Entry point for the `verify` command.
pub fn verify(args: &VerifyArgs) -> Result<()> {
    let config = HarnessConfig::from_cli(args)?;

    println!("=== adapter-harness verify ===");
    println!("Protocol:  {}", config.protocol);
    println!("Network:   {}", config.fork.network);
    match &config.fork.attach_url {
        Some(url) => println!("Attach:    {url}"),
        None => println!(
            "Fork at:   {}",
            config
                .fork
                .fork_block
                .map(|b| b.to_string())
                .unwrap_or_else(|| "latest".into())
        ),
    }
    println!("Pools:     {}", config.pools_path.display());
    if let Some(path) = &config.staking_pools_path {
        println!("Staking:   {}", path.display());
    }
    let artifacts = ArtifactStore::new(&config.artifacts_dir);
    println!("Artifacts: {}", artifacts.root().display());
    println!();

    if !config.skip_load {
        artifacts.require(config.protocol.artifacts())?;
    }

    let rt = tokio::runtime::Runtime::new().context("creating tokio runtime")?;
    let report = rt.block_on(verify_async(&config, artifacts))?;

    report.print_summary();
    if let Some(path) = &config.output {
        report.save(path)?;
        println!("Report written to {}", path.display());
    }
    if let Some(err) = report.first_failure() {
        let summary = format!("{} of {} pool cases failed", report.failed(), report.pools.len());
        return Err(anyhow::Error::new(err).context(summary));
    }
    Ok(())
}

async fn verify_async(config: &HarnessConfig, artifacts: ArtifactStore) -> Result<crate::report::SuiteReport> {
    let fork = Fork::start(&config.fork).await?;
    info!(block = fork.block, rpc = %fork.chain.rpc_url, "fork started");

    let ctx = SuiteContext {
        protocol: config.protocol,
        fork,
        artifacts,
        pools_path: config.pools_path.clone(),
        staking_pools_path: config.staking_pools_path.clone(),
        skip: config.skip.clone(),
        only: config.only.clone(),
    };
    protocols::run_suite(&ctx).await
}

/// Entry point for the `pools` command: load, validate and list a
/// protocol's fixtures without touching a chain.
pub fn pools(protocol: Protocol, pools: Option<&Path>, staking_pools: Option<&Path>) -> Result<()> {
    let pools_path = pools.map(Path::to_path_buf).unwrap_or_else(|| protocol.default_pools());
    println!("{protocol} pools ({})", pools_path.display());

    match protocol {
        Protocol::Beefy => {
            list(&pool::load_fixture::<BeefyVaultItem>(&pools_path)?);
            let staking = staking_pools
                .map(Path::to_path_buf)
                .or_else(|| protocol.default_staking_pools());
            if let Some(path) = staking {
                println!();
                println!("{protocol} staking pools ({})", path.display());
                list(&pool::load_fixture::<StakingPoolItem>(&path)?);
            }
        }
        _ => list(&pool::load_fixture::<PoolItem>(&pools_path)?),
    }
    Ok(())
}

fn list<T: Descriptor>(pools: &std::collections::BTreeMap<String, T>) {
    for (name, item) in pools {
        println!("  {name:<24} {}", item.summary());
    }
    println!("{} pools", pools.len());
}
