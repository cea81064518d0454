use std::path::PathBuf;

use anyhow::Result;

use crate::error::HarnessError;
use crate::fork::ForkConfig;
use crate::model::NetworkProfile;
use crate::protocols::Protocol;

/// Runtime configuration for the `verify` command.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub protocol: Protocol,
    pub fork: ForkConfig,
    pub artifacts_dir: PathBuf,
    pub pools_path: PathBuf,
    pub staking_pools_path: Option<PathBuf>,
    /// Do not require compiled artifacts before the fork starts.
    pub skip_load: bool,
    pub skip: Vec<String>,
    pub only: Vec<String>,
    pub output: Option<PathBuf>,
}

impl HarnessConfig {
    pub fn from_cli(cli: &crate::run::VerifyArgs) -> Result<Self> {
        Self::from_sources(cli, |key| std::env::var(key).ok())
    }

    /// Resolve against an arbitrary environment. Flags win over variables.
    pub fn from_sources(cli: &crate::run::VerifyArgs, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let network = cli.protocol.network();
        let var = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        if let Some(fork) = var("FORK") {
            let requested = NetworkProfile::from_name(&fork)
                .ok_or_else(|| HarnessError::Config(format!("FORK names unknown network '{fork}'")))?;
            if requested.name != network.name {
                return Err(HarnessError::Config(format!(
                    "{} pools live on '{}' but FORK is '{}'",
                    cli.protocol, network.name, requested.name
                ))
                .into());
            }
        }

        let fork_url = cli.fork_url.clone().or_else(|| var(network.rpc_env));
        let attach_url = cli.rpc_url.clone();
        if fork_url.is_none() && attach_url.is_none() {
            return Err(HarnessError::Config(format!(
                "no RPC to fork {} from. Set {} or pass --fork-url",
                network.name, network.rpc_env
            ))
            .into());
        }

        let fork_block = match cli.fork_block {
            Some(block) => Some(block),
            None => match var("FORK_BLOCK_NUMBER") {
                Some(raw) => Some(raw.trim().parse::<u64>().map_err(|e| {
                    HarnessError::Config(format!("FORK_BLOCK_NUMBER '{raw}' is not a block number: {e}"))
                })?),
                None => network.fork_block,
            },
        };

        let artifacts_dir = cli
            .artifacts
            .clone()
            .or_else(|| var("ARTIFACTS_DIR").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("artifacts"));
        let skip_load = var("SKIP_LOAD").is_some_and(|v| v.eq_ignore_ascii_case("true"));

        Ok(HarnessConfig {
            protocol: cli.protocol,
            fork: ForkConfig {
                network,
                fork_url,
                fork_block,
                attach_url,
                mnemonic: var("MNEMONIC"),
                anvil_path: var("ANVIL_PATH").map(PathBuf::from),
            },
            artifacts_dir,
            pools_path: cli.pools.clone().unwrap_or_else(|| cli.protocol.default_pools()),
            staking_pools_path: cli
                .staking_pools
                .clone()
                .or_else(|| cli.protocol.default_staking_pools()),
            skip_load,
            skip: cli.skip.clone(),
            only: cli.only.clone(),
            output: cli.output.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::run::VerifyArgs;

    fn args(protocol: Protocol) -> VerifyArgs {
        VerifyArgs {
            protocol,
            pools: None,
            staking_pools: None,
            fork_url: None,
            fork_block: None,
            rpc_url: None,
            artifacts: None,
            skip: Vec::new(),
            only: Vec::new(),
            output: None,
        }
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_from_environment() {
        let config = HarnessConfig::from_sources(
            &args(Protocol::Harvest),
            env(&[("MAIN_RPC_URL", "http://archive:8545")]),
        )
        .unwrap();
        assert_eq!(config.fork.network.name, "main");
        assert_eq!(config.fork.fork_url.as_deref(), Some("http://archive:8545"));
        assert_eq!(config.fork.fork_block, Some(13_703_745));
        assert_eq!(config.artifacts_dir, PathBuf::from("artifacts"));
        assert_eq!(config.pools_path, Protocol::Harvest.default_pools());
        assert!(config.staking_pools_path.is_none());
        assert!(!config.skip_load);
    }

    #[test]
    fn test_flags_override_environment() {
        let mut cli = args(Protocol::Beefy);
        cli.fork_url = Some("http://flag:8545".into());
        cli.fork_block = Some(21_000_000);
        cli.artifacts = Some(PathBuf::from("out"));
        let config = HarnessConfig::from_sources(
            &cli,
            env(&[
                ("MATIC_RPC_URL", "http://env:8545"),
                ("FORK_BLOCK_NUMBER", "1"),
                ("ARTIFACTS_DIR", "build"),
                ("SKIP_LOAD", "TRUE"),
            ]),
        )
        .unwrap();
        assert_eq!(config.fork.fork_url.as_deref(), Some("http://flag:8545"));
        assert_eq!(config.fork.fork_block, Some(21_000_000));
        assert_eq!(config.artifacts_dir, PathBuf::from("out"));
        assert!(config.skip_load);
        assert!(config.staking_pools_path.is_some());
    }

    #[test]
    fn test_fork_network_mismatch_rejected() {
        let err = HarnessConfig::from_sources(
            &args(Protocol::Beefy),
            env(&[("FORK", "main"), ("MATIC_RPC_URL", "http://env:8545")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("FORK is 'main'"));
    }

    #[test]
    fn test_missing_rpc_rejected() {
        let err = HarnessConfig::from_sources(&args(Protocol::Lido), env(&[])).unwrap_err();
        assert!(err.to_string().contains("MAIN_RPC_URL"));
    }

    #[test]
    fn test_attach_needs_no_fork_url() {
        let mut cli = args(Protocol::Convex);
        cli.rpc_url = Some("http://127.0.0.1:8545".into());
        let config = HarnessConfig::from_sources(&cli, env(&[("FORK_BLOCK_NUMBER", " 13000000 ")])).unwrap();
        assert!(config.fork.fork_url.is_none());
        assert_eq!(config.fork.fork_block, Some(13_000_000));
    }

    #[test]
    fn test_bad_fork_block_rejected() {
        let err = HarnessConfig::from_sources(
            &args(Protocol::Harvest),
            env(&[("MAIN_RPC_URL", "http://a"), ("FORK_BLOCK_NUMBER", "latest")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("FORK_BLOCK_NUMBER"));
    }
}
