use clap::Parser;
use tracing_subscriber::EnvFilter;

use adapter_harness::{cli, model, run, schema};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("adapter_harness=info")),
        )
        .init();

    let cli = cli::Cli::parse();

    match cli.command {
        cli::Command::Schema => schema::run(),
        cli::Command::Networks => model::network::run(),
        cli::Command::Pools {
            protocol,
            pools,
            staking_pools,
        } => run::pools(protocol, pools.as_deref(), staking_pools.as_deref()),
        cli::Command::Verify {
            protocol,
            pools,
            staking_pools,
            fork_url,
            fork_block,
            rpc_url,
            artifacts,
            skip,
            only,
            output,
        } => run::verify(&run::VerifyArgs {
            protocol,
            pools,
            staking_pools,
            fork_url,
            fork_block,
            rpc_url,
            artifacts,
            skip,
            only,
            output,
        }),
    }
}
