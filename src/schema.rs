use schemars::schema_for;

use crate::model::{BeefyVaultItem, PoolItem, StakingPoolItem};

/// Generate and print the JSON Schemas for each fixture entry format.
pub fn run() -> anyhow::Result<()> {
    let schemas = serde_json::json!({
        "PoolItem": schema_for!(PoolItem),
        "StakingPoolItem": schema_for!(StakingPoolItem),
        "BeefyVaultItem": schema_for!(BeefyVaultItem),
    });
    let json = serde_json::to_string_pretty(&schemas)?;
    println!("{json}");
    Ok(())
}
