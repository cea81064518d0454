use alloy::primitives::Address;
use alloy::providers::DynProvider;
use alloy::rpc::types::TransactionReceipt;
use anyhow::{Context, Result};

use super::Step;
use crate::evm::contracts::{IAdapter, TestDeFiAdapter};
use crate::evm::{self, OVERRIDE_GAS_PRICE};
use crate::fork::ChainHandle;

macro_rules! send_from {
    ($call:expr, $from:expr, $label:expr) => {
        $call
            .from($from)
            .gas_price(OVERRIDE_GAS_PRICE)
            .send()
            .await
            .with_context(|| format!("sending {}", $label))?
    };
}

/// Sends each step's code batch through the `TestDeFiAdapter`.
///
/// The caller contract holds every balance. `admin` only pays for gas.
#[derive(Clone)]
pub struct AdapterCaller {
    chain: ChainHandle,
    admin: Address,
    pub test_adapter: Address,
    pub adapter: Address,
}

impl AdapterCaller {
    pub fn new(chain: ChainHandle, admin: Address, test_adapter: Address, adapter: Address) -> Self {
        AdapterCaller {
            chain,
            admin,
            test_adapter,
            adapter,
        }
    }

    pub fn chain(&self) -> &ChainHandle {
        &self.chain
    }

    /// The adapter under test, for view calls.
    pub fn adapter(&self) -> IAdapter::IAdapterInstance<&DynProvider> {
        IAdapter::new(self.adapter, &self.chain.provider)
    }

    pub fn caller(&self) -> TestDeFiAdapter::TestDeFiAdapterInstance<&DynProvider> {
        TestDeFiAdapter::new(self.test_adapter, &self.chain.provider)
    }

    /// Execute `step` for `pool`, depositing or withdrawing `underlying`.
    pub async fn run(&self, step: Step, pool: Address, underlying: Address) -> Result<TransactionReceipt> {
        let caller = self.caller();
        let adapter = self.adapter;
        let label = format!("{step} via {}", evm::short_addr(&pool));

        let pending = match step {
            Step::Deposit => send_from!(
                caller.testGetDepositAllCodes(underlying, pool, adapter),
                self.admin,
                label
            ),
            Step::Stake => send_from!(
                caller.testGetStakeAllCodes(pool, underlying, adapter),
                self.admin,
                label
            ),
            Step::ClaimReward => send_from!(
                caller.testClaimRewardTokenCode(pool, adapter),
                self.admin,
                label
            ),
            Step::Harvest => send_from!(
                caller.testGetHarvestAllCodes(pool, underlying, adapter),
                self.admin,
                label
            ),
            Step::Unstake => send_from!(
                caller.testGetUnstakeAllCodes(pool, adapter),
                self.admin,
                label
            ),
            Step::Withdraw => send_from!(
                caller.testGetWithdrawAllCodes(underlying, pool, adapter),
                self.admin,
                label
            ),
            Step::UnstakeAndWithdraw => send_from!(
                caller.testGetUnstakeAndWithdrawAllCodes(pool, underlying, adapter),
                self.admin,
                label
            ),
        };

        evm::confirm(pending, &label).await
    }
}
