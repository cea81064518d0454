//! Lido on Ethereum: WETH is unwrapped through a gateway and staked as
//! stETH, a rebasing token whose balances are shares of the pooled ether.

use alloy::primitives::{Address, U256, address};
use alloy::providers::{DynProvider, Provider};
use alloy::sol_types::SolValue;
use anyhow::{Context, Result};
use async_trait::async_trait;

use super::{SuiteContext, common, first_token, required, setup_err};
use crate::deploy;
use crate::driver::{self, AdapterCaller, Plan, PoolFlow, Step};
use crate::error::HarnessError;
use crate::evm::contracts::ILidoDeposit;
use crate::funding;
use crate::model::PoolItem;
use crate::oracle;
use crate::report::SuiteReport;
use crate::verify::Check;

pub const GATEWAY: &str = "LidoEthGateway";
pub const ADAPTER: &str = "LidoAdapter";

pub const WETH: Address = address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");
pub const WETH_WHALE: Address = address!("56178a0d5f301baf6cf3e1cd53d9863437345bf9");

/// WETH the caller contract is funded with.
pub const FUND_ETHER: u64 = 10;

/// stETH moves shares, not balances, so swapping a full balance out can
/// leave a share or two behind. Up to this many wei still count as exited.
pub const STETH_DUST_WEI: u64 = 2;

pub async fn run(ctx: &SuiteContext) -> Result<SuiteReport> {
    let mut report = ctx.report();
    let pools = ctx
        .select::<PoolItem>(&ctx.pools_path, &[], &mut report)?
        .into_iter()
        .map(|(name, item)| LidoPool::resolve(name, item))
        .collect::<Result<Vec<_>, _>>()?;

    let gateway = deploy::deploy(ctx.chain(), &ctx.artifacts, GATEWAY, &[], ctx.fork.signers.deployer)
        .await
        .map_err(setup_err("lido", "deploy gateway"))?;
    let caller = ctx
        .deploy_harness(ADAPTER, &(gateway,).abi_encode_params())
        .await
        .map_err(setup_err("lido", "deploy"))?;

    funding::transfer_from_whale(
        ctx.chain(),
        WETH,
        WETH_WHALE,
        caller.test_adapter,
        crate::evm::ether(FUND_ETHER),
    )
    .await
    .map_err(setup_err("lido", "funding"))?;

    for pool in pools {
        let mut flow = LidoFlow::new(pool, caller.clone());
        report.pools.push(driver::drive(&mut flow).await);
    }
    Ok(report)
}

/// A fixture entry with the deposit token and exit swap resolved before
/// anything is deployed.
#[derive(Debug, Clone)]
pub struct LidoPool {
    pub name: String,
    pub item: PoolItem,
    pub underlying: Address,
    pub swap: Address,
}

impl LidoPool {
    pub fn resolve(name: String, item: PoolItem) -> Result<Self, HarnessError> {
        let underlying = first_token(&name, &item.tokens)?;
        let swap = required(&name, item.swap, "swap address")?;
        Ok(LidoPool {
            name,
            item,
            underlying,
            swap,
        })
    }
}

/// Values read right after a deposit.
#[derive(Debug, Clone)]
struct DepositReadings {
    lp: U256,
    expected_lp: U256,
    native: U256,
    amount_in_token: U256,
    total_pooled_ether: U256,
    total_shares: U256,
    redeemable: U256,
    sufficient: bool,
    pool_value: U256,
    pool_value_before: U256,
}

/// Rebasing values are compared with the last two digits dropped.
fn deposit_checks_for(r: &DepositReadings) -> Result<Vec<Check>> {
    let expected_amount = oracle::rebased_amount(r.expected_lp, r.total_pooled_ether, r.total_shares)?;
    let expected_pool_value = r
        .pool_value_before
        .checked_add(expected_amount)
        .context("pool value overflow")?;
    Ok(vec![
        Check::nonzero("lp balance", r.lp),
        Check::eq_ignoring_rounding("lp balance", r.lp, r.expected_lp),
        Check::zero("native balance", r.native),
        Check::eq_ignoring_rounding("amount in token", r.amount_in_token, expected_amount),
        Check::eq("redeemable lp amount", r.redeemable, expected_amount),
        Check::is_true("redeemable amount sufficient", r.sufficient),
        Check::eq_ignoring_rounding("pool value", r.pool_value, expected_pool_value),
    ])
}

/// Values read right after a withdraw.
#[derive(Debug, Clone)]
struct WithdrawReadings {
    allowance: U256,
    lp: U256,
    shares: U256,
    underlying: U256,
    underlying_before: U256,
}

fn withdraw_checks_for(r: &WithdrawReadings) -> Vec<Check> {
    vec![
        Check::zero("allowance to swap", r.allowance),
        Check::eq("lp balance", r.lp, r.shares),
        Check::at_most("lp balance after exit", r.lp, U256::from(STETH_DUST_WEI)),
        Check::gt("underlying balance", r.underlying, r.underlying_before),
    ]
}

pub struct LidoFlow {
    name: String,
    pool: PoolItem,
    underlying: Address,
    swap: Address,
    caller: AdapterCaller,
    balance_before_deposit: U256,
    pool_value_before: U256,
    balance_before_withdraw: U256,
}

impl LidoFlow {
    pub fn new(pool: LidoPool, caller: AdapterCaller) -> Self {
        LidoFlow {
            name: pool.name,
            pool: pool.item,
            underlying: pool.underlying,
            swap: pool.swap,
            caller,
            balance_before_deposit: U256::ZERO,
            pool_value_before: U256::ZERO,
            balance_before_withdraw: U256::ZERO,
        }
    }

    fn steth(&self) -> ILidoDeposit::ILidoDepositInstance<&DynProvider> {
        ILidoDeposit::new(self.pool.pool, &self.caller.chain().provider)
    }

    async fn pool_value(&self) -> Result<U256> {
        self.caller
            .adapter()
            .getPoolValue(self.pool.pool, self.underlying)
            .call()
            .await
            .context("getPoolValue")
    }

    async fn underlying_balance(&self) -> Result<U256> {
        funding::balance_of(self.caller.chain(), self.underlying, self.caller.test_adapter).await
    }

    async fn deposit_checks(&mut self) -> Result<Vec<Check>> {
        let c = &self.caller;
        let adapter = c.adapter();
        let (test, pool, underlying) = (c.test_adapter, self.pool.pool, self.underlying);

        let expected_lp = adapter
            .calculateAmountInLPToken(underlying, pool, self.balance_before_deposit)
            .call()
            .await
            .context("calculateAmountInLPToken")?;
        let steth = self.steth();
        let readings = DepositReadings {
            lp: common::lp_balance(c, pool).await?,
            expected_lp,
            native: c.chain().provider.get_balance(test).await.context("eth_getBalance")?,
            amount_in_token: adapter
                .getAllAmountInToken(test, underlying, pool)
                .call()
                .await
                .context("getAllAmountInToken")?,
            total_pooled_ether: steth.getTotalPooledEther().call().await.context("getTotalPooledEther")?,
            total_shares: steth.getTotalShares().call().await.context("getTotalShares")?,
            redeemable: adapter
                .calculateRedeemableLPTokenAmount(test, underlying, pool, expected_lp)
                .call()
                .await
                .context("calculateRedeemableLPTokenAmount")?,
            sufficient: adapter
                .isRedeemableAmountSufficient(test, underlying, pool, expected_lp)
                .call()
                .await
                .context("isRedeemableAmountSufficient")?,
            pool_value: self.pool_value().await?,
            pool_value_before: self.pool_value_before,
        };

        let checks = deposit_checks_for(&readings)?;
        self.balance_before_withdraw = self.underlying_balance().await?;
        Ok(checks)
    }

    async fn withdraw_checks(&self) -> Result<Vec<Check>> {
        let c = &self.caller;
        let steth = self.steth();
        let readings = WithdrawReadings {
            allowance: steth
                .allowance(c.test_adapter, self.swap)
                .call()
                .await
                .context("stETH allowance")?,
            lp: common::lp_balance(c, self.pool.pool).await?,
            shares: steth.sharesOf(c.test_adapter).call().await.context("sharesOf")?,
            underlying: self.underlying_balance().await?,
            underlying_before: self.balance_before_withdraw,
        };
        Ok(withdraw_checks_for(&readings))
    }
}

#[async_trait]
impl PoolFlow for LidoFlow {
    fn name(&self) -> &str {
        &self.name
    }

    /// stETH cannot be staked, so only deposit and withdraw run.
    fn plan(&self) -> Plan {
        Plan::lifecycle(false, false)
    }

    async fn before(&mut self) -> Result<Vec<Check>> {
        let adapter = self.caller.adapter();
        let (pool, underlying) = (self.pool.pool, self.underlying);

        self.balance_before_deposit = self.underlying_balance().await?;
        self.pool_value_before = self.pool_value().await?;

        let reward = adapter.getRewardToken(pool).call().await.context("getRewardToken")?;
        let can_stake = adapter.canStake(pool).call().await.context("canStake")?;
        let tokens = adapter
            .getUnderlyingTokens(pool, underlying)
            .call()
            .await
            .context("getUnderlyingTokens")?;
        let lp_token = adapter
            .getLiquidityPoolToken(underlying, pool)
            .call()
            .await
            .context("getLiquidityPoolToken")?;

        Ok(vec![
            Check::same_address("reward token", reward, Address::ZERO),
            Check::is_false("canStake", can_stake),
            Check::same_address(
                "underlying token",
                tokens.first().copied().unwrap_or(Address::ZERO),
                underlying,
            ),
            Check::same_address("lp token", lp_token, self.pool.lp_token),
        ])
    }

    async fn execute(&mut self, step: Step) -> Result<()> {
        self.caller.run(step, self.pool.pool, self.underlying).await?;
        Ok(())
    }

    async fn reward_balance(&self) -> Result<U256> {
        Ok(U256::ZERO)
    }

    async fn verify(&mut self, step: Step) -> Result<Vec<Check>> {
        match step {
            Step::Deposit => self.deposit_checks().await,
            Step::Withdraw => self.withdraw_checks().await,
            other => anyhow::bail!("lido plan has no {other} step"),
        }
    }

    /// Redeeming one wei more than the position is worth must not pass.
    async fn after(&mut self) -> Result<Vec<Check>> {
        let c = &self.caller;
        let adapter = c.adapter();
        let (test, pool, underlying) = (c.test_adapter, self.pool.pool, self.underlying);
        let amount = adapter
            .getAllAmountInToken(test, underlying, pool)
            .call()
            .await
            .context("getAllAmountInToken")?;
        let over = amount.checked_add(U256::from(1)).context("amount overflow")?;
        let sufficient = adapter
            .isRedeemableAmountSufficient(test, underlying, pool, over)
            .call()
            .await
            .context("isRedeemableAmountSufficient")?;
        Ok(vec![Check::is_false("redeemable amount + 1 sufficient", sufficient)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eth(n: u64) -> U256 {
        crate::evm::ether(n)
    }

    fn deposit() -> DepositReadings {
        // 1.1 ether pooled per share
        let pooled = eth(11_000);
        let shares = eth(10_000);
        let expected_lp = eth(10);
        let amount = oracle::rebased_amount(expected_lp, pooled, shares).unwrap();
        DepositReadings {
            lp: expected_lp + U256::from(37u8),
            expected_lp,
            native: U256::ZERO,
            amount_in_token: amount + U256::from(1u8),
            total_pooled_ether: pooled,
            total_shares: shares,
            redeemable: amount,
            sufficient: true,
            pool_value: eth(500) + amount,
            pool_value_before: eth(500),
        }
    }

    #[test]
    fn test_deposit_checks_tolerate_rounding() {
        let checks = deposit_checks_for(&deposit()).unwrap();
        assert_eq!(checks.len(), 7);
        assert!(checks.iter().all(|c| c.passed), "{checks:?}");
    }

    #[test]
    fn test_deposit_checks_catch_redeemable_drift() {
        let r = deposit();
        let drifted = DepositReadings {
            redeemable: r.redeemable - U256::from(1u8),
            native: U256::from(1u8),
            ..r
        };
        let checks = deposit_checks_for(&drifted).unwrap();
        let failed: Vec<&str> = checks.iter().filter(|c| !c.passed).map(|c| c.label.as_str()).collect();
        assert_eq!(failed, ["native balance", "redeemable lp amount"]);
    }

    #[test]
    fn test_deposit_checks_need_shares() {
        let empty = DepositReadings {
            total_shares: U256::ZERO,
            ..deposit()
        };
        assert!(deposit_checks_for(&empty).is_err());
    }

    fn withdraw(lp: U256) -> WithdrawReadings {
        WithdrawReadings {
            allowance: U256::ZERO,
            lp,
            shares: lp,
            underlying: eth(10),
            underlying_before: eth(1),
        }
    }

    #[test]
    fn test_withdraw_requires_exit() {
        let checks = withdraw_checks_for(&withdraw(U256::ZERO));
        assert!(checks.iter().all(|c| c.passed));

        let dust = withdraw_checks_for(&withdraw(U256::from(STETH_DUST_WEI)));
        assert!(dust.iter().all(|c| c.passed));

        let left = withdraw_checks_for(&withdraw(eth(1)));
        let exit = left.iter().find(|c| c.label == "lp balance after exit").unwrap();
        assert!(!exit.passed);
        assert!(left.iter().filter(|c| c.label != "lp balance after exit").all(|c| c.passed));
    }

    #[test]
    fn test_resolve_requires_swap() {
        let item = PoolItem {
            pool: address!("ae7ab96520DE3A18E5e111B5EaAb095312D7fE84"),
            lp_token: address!("ae7ab96520DE3A18E5e111B5EaAb095312D7fE84"),
            staking_pool: None,
            reward_tokens: Vec::new(),
            tokens: vec![WETH],
            whale: None,
            swap: None,
        };
        let err = LidoPool::resolve("eth".into(), item.clone()).unwrap_err();
        assert!(err.to_string().contains("no swap address"));

        let curve = address!("DC24316b9AE028F1497c275EB9192a3Ea0f67022");
        let pool = LidoPool::resolve("eth".into(), PoolItem { swap: Some(curve), ..item }).unwrap();
        assert_eq!((pool.underlying, pool.swap), (WETH, curve));
    }
}
