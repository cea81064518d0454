use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use alloy::primitives::Address;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::HarnessError;
use crate::evm::short_addr;

/// A liquidity pool entry as it appears in the Ethereum fixtures.
///
/// `pool` is the address handed to the adapter. `lp_token` is the token the
/// caller holds after depositing. For share vaults the two are the same
/// contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PoolItem {
    #[schemars(with = "String")]
    pub pool: Address,
    #[schemars(with = "String")]
    pub lp_token: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub staking_pool: Option<Address>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[schemars(with = "Vec<String>")]
    pub reward_tokens: Vec<Address>,
    /// Underlying tokens. The first one is what gets deposited.
    #[schemars(with = "Vec<String>")]
    pub tokens: Vec<Address>,
    /// Holder impersonated to fund the caller contract.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub whale: Option<Address>,
    /// Exchange the adapter swaps through on exit (Lido's stETH pool).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub swap: Option<Address>,
}

/// A Beefy staking pool entry (Polygon fixtures).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StakingPoolItem {
    #[schemars(with = "Vec<String>")]
    pub tokens: Vec<Address>,
    #[schemars(with = "String")]
    pub staking_pool: Address,
    #[schemars(with = "Vec<String>")]
    pub reward_tokens: Vec<Address>,
    #[schemars(with = "String")]
    pub pool: Address,
    #[schemars(with = "String")]
    pub lp_token: Address,
    #[schemars(with = "String")]
    pub whale: Address,
}

/// A Beefy vault entry (Polygon fixtures). `platform` picks the DEX whose
/// router is used to acquire the want token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BeefyVaultItem {
    #[schemars(with = "String")]
    pub want_token: Address,
    #[schemars(with = "String")]
    pub beefy_vault: Address,
    #[serde(default)]
    #[schemars(with = "Vec<String>")]
    pub tokens: Vec<Address>,
    pub platform: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub whale0: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub whale1: Option<Address>,
    #[serde(default, rename = "whaleLP", skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub whale_lp: Option<Address>,
}

impl BeefyVaultItem {
    /// Single-asset vaults take a plain token; everything else takes a pair LP.
    pub fn is_single_asset(&self) -> bool {
        self.platform == "single_asset"
    }
}

pub type LiquidityPool = BTreeMap<String, PoolItem>;
pub type StakingPool = BTreeMap<String, StakingPoolItem>;
pub type BeefyVaults = BTreeMap<String, BeefyVaultItem>;

// ── Loading ──────────────────────────────────────────────────────────

/// Fixture entries that can check their own shape after parsing.
pub trait Descriptor {
    fn check(&self, name: &str) -> Result<(), String>;

    /// One-line description for listings.
    fn summary(&self) -> String;
}

impl Descriptor for PoolItem {
    fn check(&self, _name: &str) -> Result<(), String> {
        if self.tokens.is_empty() {
            return Err("`tokens` is empty".into());
        }
        if self.staking_pool.is_some() && self.reward_tokens.is_empty() {
            return Err("has a `stakingPool` but no `rewardTokens`".into());
        }
        Ok(())
    }

    fn summary(&self) -> String {
        let staking = match self.staking_pool {
            Some(addr) => format!("staking {}", short_addr(&addr)),
            None => "no staking".to_string(),
        };
        format!("pool {} lp {} {staking}", short_addr(&self.pool), short_addr(&self.lp_token))
    }
}

impl Descriptor for StakingPoolItem {
    fn check(&self, _name: &str) -> Result<(), String> {
        if self.tokens.is_empty() {
            return Err("`tokens` is empty".into());
        }
        if self.reward_tokens.is_empty() {
            return Err("`rewardTokens` is empty".into());
        }
        Ok(())
    }

    fn summary(&self) -> String {
        format!(
            "vault {} staking {} whale {}",
            short_addr(&self.pool),
            short_addr(&self.staking_pool),
            short_addr(&self.whale)
        )
    }
}

impl Descriptor for BeefyVaultItem {
    fn check(&self, _name: &str) -> Result<(), String> {
        if self.platform.is_empty() {
            return Err("`platform` is empty".into());
        }
        Ok(())
    }

    fn summary(&self) -> String {
        format!(
            "vault {} want {} on {}",
            short_addr(&self.beefy_vault),
            short_addr(&self.want_token),
            self.platform
        )
    }
}

/// Parse a fixture document from a JSON string and validate every entry.
pub fn parse_fixture<T>(label: &str, json: &str) -> Result<BTreeMap<String, T>, HarnessError>
where
    T: DeserializeOwned + Descriptor,
{
    let pools: BTreeMap<String, T> =
        serde_json::from_str(json).map_err(|e| HarnessError::Fixture {
            path: label.to_string(),
            reason: e.to_string(),
        })?;
    for (name, item) in &pools {
        item.check(name).map_err(|reason| HarnessError::Fixture {
            path: label.to_string(),
            reason: format!("pool `{name}` {reason}"),
        })?;
    }
    Ok(pools)
}

/// Load and validate a fixture file.
pub fn load_fixture<T>(path: &Path) -> Result<BTreeMap<String, T>, HarnessError>
where
    T: DeserializeOwned + Descriptor,
{
    let label = path.display().to_string();
    let contents = std::fs::read_to_string(path).map_err(|e| HarnessError::Fixture {
        path: label.clone(),
        reason: e.to_string(),
    })?;
    parse_fixture(&label, &contents)
}

/// Keep only pools that pass the `--only` filter and are not skipped.
/// Returns the kept pools and the skipped names, each with its reason.
pub fn select<T: Clone>(
    pools: &BTreeMap<String, T>,
    skip: &[(String, String)],
    only: &[String],
) -> (Vec<(String, T)>, Vec<(String, String)>) {
    let mut kept = Vec::new();
    let mut skipped = Vec::new();
    for (name, item) in pools {
        if !only.is_empty() && !only.iter().any(|o| o == name) {
            continue;
        }
        match skip.iter().find(|(s, _)| s == name) {
            Some((_, reason)) => skipped.push((name.clone(), reason.clone())),
            None => kept.push((name.clone(), item.clone())),
        }
    }
    (kept, skipped)
}

/// Every name passed with `--skip` or `--only` must name a pool in one of
/// the loaded fixtures.
pub fn check_requested<'a>(
    known: impl IntoIterator<Item = &'a String>,
    skip: &[String],
    only: &[String],
) -> Result<(), HarnessError> {
    let known: BTreeSet<&str> = known.into_iter().map(String::as_str).collect();
    for (flag, names) in [("--skip", skip), ("--only", only)] {
        let unknown: Vec<&str> = names
            .iter()
            .map(String::as_str)
            .filter(|name| !known.contains(name))
            .collect();
        if !unknown.is_empty() {
            return Err(HarnessError::Config(format!(
                "{flag} names pools not in the fixture: {}",
                unknown.join(", ")
            )));
        }
    }
    Ok(())
}

/// A suite with nothing left to run is a configuration error, not a pass.
pub fn ensure_selected(selected: usize, skipped: usize) -> Result<(), HarnessError> {
    if selected == 0 {
        return Err(HarnessError::Config(format!(
            "no pools left to run ({skipped} skipped)"
        )));
    }
    Ok(())
}
