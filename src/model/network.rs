use serde::Serialize;

/// Gas price a network is configured with. `Auto` defers to the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GasPrice {
    Auto,
    Wei(u128),
}

const GWEI: u128 = 1_000_000_000;

/// A named network the harness knows how to fork.
///
/// Profiles are static. The RPC endpoint itself is never stored here. It is
/// looked up from `rpc_env` at runtime so secrets stay in the environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkProfile {
    /// Short name used on the command line and in `FORK` (e.g. "main", "matic").
    pub name: &'static str,
    /// EVM chain ID the fork is started with.
    pub chain_id: u64,
    /// Environment variable holding the upstream RPC URL.
    pub rpc_env: &'static str,
    pub gas_price: GasPrice,
    /// Block to pin the fork at when `FORK_BLOCK_NUMBER` is not set.
    pub fork_block: Option<u64>,
}

// ── Methods ──────────────────────────────────────────────────────────

impl NetworkProfile {
    /// Upstream RPC URL from the environment, if set and non-empty.
    pub fn rpc_url(&self) -> Option<String> {
        std::env::var(self.rpc_env).ok().filter(|url| !url.is_empty())
    }

    /// Look up a profile by name (case-insensitive).
    pub fn from_name(name: &str) -> Option<&'static NetworkProfile> {
        let name = name.to_lowercase();
        NETWORKS.iter().find(|n| n.name == name)
    }

    pub fn ethereum() -> &'static NetworkProfile {
        &NETWORKS[0]
    }

    pub fn polygon() -> &'static NetworkProfile {
        &NETWORKS[6]
    }
}

impl std::fmt::Display for NetworkProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (chain {})", self.name, self.chain_id)
    }
}

// ── Registry ─────────────────────────────────────────────────────────

macro_rules! network {
    ($name:expr, $id:expr, $env:expr, $gas:expr) => {
        network!($name, $id, $env, $gas, None)
    };
    ($name:expr, $id:expr, $env:expr, $gas:expr, $block:expr) => {
        NetworkProfile {
            name: $name,
            chain_id: $id,
            rpc_env: $env,
            gas_price: $gas,
            fork_block: $block,
        }
    };
}

pub static NETWORKS: &[NetworkProfile] = &[
    // ── Ethereum ──
    network!("main", 1, "MAIN_RPC_URL", GasPrice::Auto, Some(13_703_745)),
    network!("kovan", 42, "KOVAN_RPC_URL", GasPrice::Wei(GWEI)),
    network!("ropsten", 3, "ROPSTEN_RPC_URL", GasPrice::Wei(65 * GWEI)),
    network!("rinkeby", 4, "RINKEBY_RPC_URL", GasPrice::Wei(65 * GWEI)),
    network!("goerli", 5, "GOERLI_RPC_URL", GasPrice::Wei(65 * GWEI)),
    network!("hardhat", 31337, "HARDHAT_RPC_URL", GasPrice::Wei(65 * GWEI)),
    // ── Polygon ──
    network!("matic", 137, "MATIC_RPC_URL", GasPrice::Auto, Some(21_435_710)),
    network!("mumbai", 80001, "MUMBAI_RPC_URL", GasPrice::Wei(GWEI)),
    // ── Sidechains & L2s ──
    network!("xdai", 100, "XDAI_RPC_URL", GasPrice::Wei(GWEI)),
    network!("avalanche", 43114, "AVALANCHE_RPC_URL", GasPrice::Wei(225 * GWEI)),
    network!("fuji", 43113, "FUJI_RPC_URL", GasPrice::Wei(85 * GWEI)),
    network!("arbitrum1", 42161, "ARBITRUM1_RPC_URL", GasPrice::Wei(GWEI)),
    network!("rinkeby_arbitrum1", 421611, "RINKEBY_ARBITRUM1_RPC_URL", GasPrice::Wei(GWEI)),
    network!("fantom", 250, "FANTOM_RPC_URL", GasPrice::Wei(GWEI)),
    network!("fantom_test", 4002, "FANTOM_TEST_RPC_URL", GasPrice::Wei(GWEI)),
    network!("bsc", 56, "BSC_RPC_URL", GasPrice::Wei(GWEI)),
    network!("bsc_test", 97, "BSC_TEST_RPC_URL", GasPrice::Wei(GWEI)),
    network!("oethereum", 10, "OETHEREUM_RPC_URL", GasPrice::Wei(GWEI)),
    network!("kovan_oethereum", 69, "KOVAN_OETHEREUM_RPC_URL", GasPrice::Wei(GWEI)),
    network!("goerli_oethereum", 420, "GOERLI_OETHEREUM_RPC_URL", GasPrice::Wei(GWEI)),
];

// ── Listing ──────────────────────────────────────────────────────────

/// CLI entry point for the `networks` subcommand.
pub fn run() -> anyhow::Result<()> {
    println!("Known networks");
    println!("==============");
    println!();
    for net in NETWORKS {
        let rpc = if net.rpc_url().is_some() { "set" } else { "unset" };
        let gas = match net.gas_price {
            GasPrice::Auto => "auto".to_string(),
            GasPrice::Wei(wei) => format!("{} gwei", wei / GWEI),
        };
        let block = net
            .fork_block
            .map(|b| b.to_string())
            .unwrap_or_else(|| "latest".into());
        println!(
            "  {:<18} chain {:<7} gas {:<9} fork@{:<10} {}={}",
            net.name, net.chain_id, gas, block, net.rpc_env, rpc
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_profiles() {
        assert_eq!(NetworkProfile::ethereum().chain_id, 1);
        assert_eq!(NetworkProfile::polygon().chain_id, 137);
        assert_eq!(NetworkProfile::polygon().fork_block, Some(21_435_710));
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(NetworkProfile::from_name("MATIC").map(|n| n.rpc_env), Some("MATIC_RPC_URL"));
        assert!(NetworkProfile::from_name("solana").is_none());
    }

    #[test]
    fn test_registry_names_unique() {
        let mut names: Vec<_> = NETWORKS.iter().map(|n| n.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), NETWORKS.len());
        assert_eq!(NETWORKS.len(), 20);
    }
}
