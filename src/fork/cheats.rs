//! Anvil cheat codes used during setup and between steps.

use alloy::primitives::{Address, U256};
use alloy::providers::Provider;
use alloy::rpc::types::BlockNumberOrTag;
use anyhow::{Context, Result};
use tracing::debug;

use super::ChainHandle;

impl ChainHandle {
    pub async fn impersonate(&self, account: Address) -> Result<()> {
        let _: () = self
            .provider
            .raw_request("anvil_impersonateAccount".into(), [account])
            .await
            .with_context(|| format!("anvil_impersonateAccount {account}"))?;
        Ok(())
    }

    pub async fn stop_impersonating(&self, account: Address) -> Result<()> {
        let _: () = self
            .provider
            .raw_request("anvil_stopImpersonatingAccount".into(), [account])
            .await
            .with_context(|| format!("anvil_stopImpersonatingAccount {account}"))?;
        Ok(())
    }

    pub async fn set_balance(&self, account: Address, wei: U256) -> Result<()> {
        let _: () = self
            .provider
            .raw_request("anvil_setBalance".into(), (account, wei))
            .await
            .with_context(|| format!("anvil_setBalance {account}"))?;
        Ok(())
    }

    /// Mine one block.
    pub async fn mine(&self) -> Result<()> {
        let _: serde_json::Value = self
            .provider
            .raw_request("evm_mine".into(), Vec::<u64>::new())
            .await
            .context("evm_mine")?;
        Ok(())
    }

    /// Advance the clock by `seconds` and mine a block at the new time.
    pub async fn increase_time(&self, seconds: u64) -> Result<()> {
        let _: serde_json::Value = self
            .provider
            .raw_request("evm_increaseTime".into(), [seconds])
            .await
            .context("evm_increaseTime")?;
        self.mine().await?;
        debug!(seconds, "time advanced");
        Ok(())
    }

    /// Mine the next block at exactly `timestamp`.
    pub async fn move_to_timestamp(&self, timestamp: u64) -> Result<()> {
        let _: serde_json::Value = self
            .provider
            .raw_request("evm_setNextBlockTimestamp".into(), [timestamp])
            .await
            .context("evm_setNextBlockTimestamp")?;
        self.mine().await
    }

    pub async fn latest_timestamp(&self) -> Result<u64> {
        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Latest)
            .await
            .context("eth_getBlockByNumber latest")?
            .context("node returned no latest block")?;
        Ok(block.header.timestamp)
    }
}
