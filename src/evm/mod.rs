pub mod contracts;

use alloy::network::Ethereum;
use alloy::primitives::{Address, U256};
use alloy::providers::PendingTransactionBuilder;
use alloy::rpc::types::TransactionReceipt;
use anyhow::{Context, Result};

use crate::error::HarnessError;

/// Gas price every harness transaction is sent with (0.1 gwei).
pub const OVERRIDE_GAS_PRICE: u128 = 100_000_000;

/// One ether (or one MATIC) in wei.
pub const ONE_ETHER: u128 = 1_000_000_000_000_000_000;

// ── Receipts ─────────────────────────────────────────────────────────

/// Wait for a sent transaction to be mined and fail if it reverted.
pub async fn confirm(
    pending: PendingTransactionBuilder<Ethereum>,
    label: &str,
) -> Result<TransactionReceipt> {
    let receipt = pending
        .get_receipt()
        .await
        .with_context(|| format!("{label} receipt"))?;
    require_success(&receipt, label)?;
    Ok(receipt)
}

pub fn require_success(receipt: &TransactionReceipt, label: &str) -> Result<()> {
    if !receipt.status() {
        return Err(HarnessError::Reverted {
            label: label.to_string(),
            tx: format!("{:?}", receipt.transaction_hash),
        }
        .into());
    }
    Ok(())
}

// ── Formatting ───────────────────────────────────────────────────────

/// Format an address for display (shortened).
pub fn short_addr(addr: &Address) -> String {
    let s = format!("{addr}");
    if s.len() > 10 {
        format!("{}...{}", &s[..6], &s[s.len() - 4..])
    } else {
        s
    }
}

/// `amount` native units as wei.
pub fn ether(amount: u64) -> U256 {
    U256::from(amount) * U256::from(ONE_ETHER)
}
