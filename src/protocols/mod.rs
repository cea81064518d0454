pub mod beefy;
pub mod common;
pub mod convex;
pub mod harvest;
pub mod lido;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use alloy::primitives::Address;
use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;
use tracing::info;

use crate::deploy::{self, ArtifactStore, TEST_DEFI_ADAPTER};
use crate::driver::AdapterCaller;
use crate::error::HarnessError;
use crate::fork::{ChainHandle, Fork};
use crate::model::NetworkProfile;
use crate::model::pool::{self, Descriptor};
use crate::report::SuiteReport;

/// An adapter family the harness can verify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    Convex,
    Harvest,
    Beefy,
    Lido,
}

impl Protocol {
    pub fn name(&self) -> &'static str {
        match self {
            Protocol::Convex => "convex",
            Protocol::Harvest => "harvest",
            Protocol::Beefy => "beefy",
            Protocol::Lido => "lido",
        }
    }

    /// Network whose state the protocol's pools live on.
    pub fn network(&self) -> &'static NetworkProfile {
        match self {
            Protocol::Beefy => NetworkProfile::polygon(),
            _ => NetworkProfile::ethereum(),
        }
    }

    pub fn default_pools(&self) -> PathBuf {
        let file = match self {
            Protocol::Convex => "ethereum/convex.finance-pools.json",
            Protocol::Harvest => "ethereum/harvest.finance-pools.json",
            Protocol::Lido => "ethereum/lido.fi-pools.json",
            Protocol::Beefy => "polygon/beefy_single_asset_pools.json",
        };
        Path::new("fixtures").join(file)
    }

    /// Only Beefy has a second fixture, for its staking pools.
    pub fn default_staking_pools(&self) -> Option<PathBuf> {
        match self {
            Protocol::Beefy => Some(Path::new("fixtures").join("polygon/beefy.staking-pools.json")),
            _ => None,
        }
    }

    /// Contract names deployed for this protocol, in deployment order.
    pub fn artifacts(&self) -> &'static [&'static str] {
        match self {
            Protocol::Convex => &[convex::ADAPTER, TEST_DEFI_ADAPTER],
            Protocol::Harvest => &[harvest::ADAPTER, TEST_DEFI_ADAPTER],
            Protocol::Beefy => &[beefy::ADAPTER, TEST_DEFI_ADAPTER],
            Protocol::Lido => &[lido::GATEWAY, lido::ADAPTER, TEST_DEFI_ADAPTER],
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ── Suite context ────────────────────────────────────────────────────

/// Everything a protocol suite needs: the fork, the artifacts, which
/// fixtures to load and which pools to leave out.
pub struct SuiteContext {
    pub protocol: Protocol,
    pub fork: Fork,
    pub artifacts: ArtifactStore,
    pub pools_path: PathBuf,
    pub staking_pools_path: Option<PathBuf>,
    /// Pool names excluded on the command line.
    pub skip: Vec<String>,
    /// When non-empty, only these pools run.
    pub only: Vec<String>,
}

impl SuiteContext {
    pub fn chain(&self) -> &ChainHandle {
        &self.fork.chain
    }

    pub fn report(&self) -> SuiteReport {
        SuiteReport::new(self.protocol.name(), self.fork.network.name, Some(self.fork.block))
    }

    /// Built-in exclusions plus `--skip`, each with the reason it is skipped.
    pub fn skip_list(&self, builtin: &[&str]) -> Vec<(String, String)> {
        let mut list: Vec<(String, String)> = builtin
            .iter()
            .map(|name| (name.to_string(), "known unsupported".to_string()))
            .collect();
        list.extend(
            self.skip
                .iter()
                .map(|name| (name.clone(), "skipped on the command line".to_string())),
        );
        list
    }

    /// Load a fixture and split it into the pools to run and the pools to skip.
    /// Skipped pools are recorded on `report`. Unknown `--skip`/`--only`
    /// names and an empty selection are errors.
    pub fn select<T>(
        &self,
        path: &Path,
        builtin_skips: &[&str],
        report: &mut SuiteReport,
    ) -> Result<Vec<(String, T)>>
    where
        T: serde::de::DeserializeOwned + Descriptor + Clone,
    {
        let pools = pool::load_fixture::<T>(path)?;
        pool::check_requested(pools.keys(), &self.skip, &self.only)?;
        let kept = self.split(path, &pools, builtin_skips, report);
        pool::ensure_selected(kept.len(), report.skipped.len())?;
        Ok(kept)
    }

    /// Split an already validated fixture. Callers holding more than one
    /// fixture check names and emptiness across all of them.
    pub fn split<T: Clone>(
        &self,
        path: &Path,
        pools: &BTreeMap<String, T>,
        builtin_skips: &[&str],
        report: &mut SuiteReport,
    ) -> Vec<(String, T)> {
        let (kept, skipped) = pool::select(pools, &self.skip_list(builtin_skips), &self.only);
        for (name, reason) in skipped {
            report.skip(name, reason);
        }
        info!(
            fixture = %path.display(),
            total = pools.len(),
            selected = kept.len(),
            "fixture loaded"
        );
        kept
    }

    /// Deploy `adapter` (with encoded constructor args) and a fresh
    /// `TestDeFiAdapter`, both from the deployer account.
    pub async fn deploy_harness(&self, adapter: &str, constructor_args: &[u8]) -> Result<AdapterCaller> {
        let deployer = self.fork.signers.deployer;
        let adapter = deploy::deploy(self.chain(), &self.artifacts, adapter, constructor_args, deployer).await?;
        let test_adapter =
            deploy::deploy(self.chain(), &self.artifacts, TEST_DEFI_ADAPTER, &[], deployer).await?;
        Ok(AdapterCaller::new(
            self.chain().clone(),
            self.fork.signers.admin,
            test_adapter,
            adapter,
        ))
    }
}

/// Run `protocol`'s suite on the fork held by `ctx`.
pub async fn run_suite(ctx: &SuiteContext) -> Result<SuiteReport> {
    info!(protocol = %ctx.protocol, network = %ctx.fork.network, "running suite");
    let mut report = match ctx.protocol {
        Protocol::Convex => convex::run(ctx).await?,
        Protocol::Harvest => harvest::run(ctx, harvest::FUND_WHOLE_TOKENS).await?,
        Protocol::Beefy => beefy::run(ctx).await?,
        Protocol::Lido => lido::run(ctx).await?,
    };
    report.finish();
    Ok(report)
}

/// Wrap a setup failure for `pool` so it aborts the suite with context.
pub(crate) fn setup_err(pool: &str, stage: &str) -> impl FnOnce(anyhow::Error) -> anyhow::Error {
    let pool = pool.to_string();
    let stage = stage.to_string();
    move |e| HarnessError::setup(pool, stage, e).into()
}

/// First underlying token of a descriptor.
pub(crate) fn first_token(name: &str, tokens: &[Address]) -> Result<Address, HarnessError> {
    required(name, tokens.first().copied(), "underlying tokens")
}

/// A descriptor field a protocol cannot run without.
pub(crate) fn required<T>(name: &str, value: Option<T>, what: &str) -> Result<T, HarnessError> {
    value.ok_or_else(|| HarnessError::setup(name, "descriptor", format!("no {what}")))
}
