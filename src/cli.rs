use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::protocols::Protocol;

/// DeFi adapter harness: fork a chain, drive each adapter through its
/// pool lifecycle and check every reported value.
#[derive(Parser)]
#[command(name = "adapter-harness", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a protocol's adapter suite on a fork
    Verify {
        /// Adapter family to verify
        #[arg(value_enum)]
        protocol: Protocol,

        /// Pool fixture (default: the protocol's bundled fixture)
        #[arg(long)]
        pools: Option<PathBuf>,

        /// Staking pool fixture (Beefy only)
        #[arg(long)]
        staking_pools: Option<PathBuf>,

        /// Upstream RPC to fork from (default: <NETWORK>_RPC_URL)
        #[arg(long)]
        fork_url: Option<String>,

        /// Block to fork at (default: FORK_BLOCK_NUMBER, then the network's pinned block)
        #[arg(long)]
        fork_block: Option<u64>,

        /// Attach to an already-running fork instead of spawning Anvil
        #[arg(long)]
        rpc_url: Option<String>,

        /// Directory holding compiled contract artifacts (default: ARTIFACTS_DIR or ./artifacts)
        #[arg(long)]
        artifacts: Option<PathBuf>,

        /// Pool name to leave out (repeatable)
        #[arg(long)]
        skip: Vec<String>,

        /// Run only this pool (repeatable)
        #[arg(long)]
        only: Vec<String>,

        /// Write the suite report as JSON
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Load, validate and list a protocol's pool fixtures
    Pools {
        #[arg(value_enum)]
        protocol: Protocol,

        #[arg(long)]
        pools: Option<PathBuf>,

        #[arg(long)]
        staking_pools: Option<PathBuf>,
    },

    /// List known networks and whether their RPC variable is set
    Networks,

    /// Output the JSON schemas for pool fixtures
    Schema,
}
