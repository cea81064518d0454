//! Convex Finance on Ethereum: Curve LP tokens deposited into Convex and
//! staked in its reward pools, which pay CRV.

use alloy::primitives::{Address, U256};
use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

use super::{SuiteContext, common, first_token, required, setup_err};
use crate::driver::{self, AdapterCaller, Plan, PoolFlow, Step};
use crate::error::HarnessError;
use crate::evm::contracts::{IConvexStake, IERC20};
use crate::evm::{self, OVERRIDE_GAS_PRICE};
use crate::funding;
use crate::model::PoolItem;
use crate::oracle;
use crate::report::SuiteReport;
use crate::verify::Check;

pub const ADAPTER: &str = "ConvexFinanceAdapter";

/// Whole LP tokens each pool's caller balance is funded with.
pub const FUND_WHOLE_TOKENS: u64 = 10;

pub const REWARD_WARP_SECS: u64 = 2_000_000;

/// Pools the adapter cannot run: ETH-denominated pools, pools with no
/// usable whale at the pinned block, pools with extra reward contracts and
/// pools whose deposit zap lacks `calc_token_amount`.
pub const SKIPLIST: &[&str] = &[
    "seth", "steth", "ankreth", "reth", // ETH
    "sbtc", "hbtc", "pbtc", "bbtc", "obtc", // no whale
    "aave", "saave", "alusd", // extra rewards
    "ypool", "busd", "pax", // zap without calc_token_amount
    "eurs", "ironbank", "eurt", "mim",
];

// ── Suite ────────────────────────────────────────────────────────────

pub async fn run(ctx: &SuiteContext) -> Result<SuiteReport> {
    let mut report = ctx.report();
    let pools = ctx
        .select::<PoolItem>(&ctx.pools_path, SKIPLIST, &mut report)?
        .into_iter()
        .map(|(name, item)| ConvexPool::resolve(name, item))
        .collect::<Result<Vec<_>, _>>()?;

    let caller = ctx
        .deploy_harness(ADAPTER, &[])
        .await
        .map_err(setup_err("convex", "deploy"))?;

    for pool in &pools {
        set_pool_coin_data(ctx, &caller, pool.item.pool)
            .await
            .map_err(setup_err(&pool.name, "setPoolCoinData"))?;
        fund(&caller, pool).await.map_err(setup_err(&pool.name, "funding"))?;
    }

    for pool in &pools {
        let mut flow = ConvexFlow::new(pool.clone(), caller.clone(), Scenario::Lifecycle);
        report.pools.push(driver::drive(&mut flow).await);

        let mut flow = ConvexFlow::new(pool.clone(), caller.clone(), Scenario::QuickExit);
        report.pools.push(driver::drive(&mut flow).await);
    }
    Ok(report)
}

async fn set_pool_coin_data(ctx: &SuiteContext, caller: &AdapterCaller, pool: Address) -> Result<()> {
    let pending = caller
        .adapter()
        .setPoolCoinData(pool)
        .from(ctx.fork.signers.deployer)
        .gas_price(OVERRIDE_GAS_PRICE)
        .send()
        .await
        .context("sending setPoolCoinData")?;
    evm::confirm(pending, "setPoolCoinData").await?;
    Ok(())
}

async fn fund(caller: &AdapterCaller, pool: &ConvexPool) -> Result<()> {
    let decimals = IERC20::new(pool.underlying, &caller.chain().provider)
        .decimals()
        .call()
        .await
        .context("pool token decimals")?;
    let amount = oracle::whole_units(FUND_WHOLE_TOKENS, decimals)?;
    funding::transfer_from_whale(caller.chain(), pool.underlying, pool.whale, caller.test_adapter, amount).await
}

/// A fixture entry with every address a Convex run needs, resolved before
/// anything is deployed.
#[derive(Debug, Clone)]
pub struct ConvexPool {
    pub name: String,
    pub item: PoolItem,
    pub underlying: Address,
    pub staking_pool: Address,
    pub reward_token: Address,
    pub whale: Address,
}

impl ConvexPool {
    pub fn resolve(name: String, item: PoolItem) -> Result<Self, HarnessError> {
        let underlying = first_token(&name, &item.tokens)?;
        let staking_pool = required(&name, item.staking_pool, "staking pool")?;
        let reward_token = required(&name, item.reward_tokens.first().copied(), "reward token")?;
        let whale = required(&name, item.whale, "whale")?;
        Ok(ConvexPool {
            name,
            item,
            underlying,
            staking_pool,
            reward_token,
            whale,
        })
    }
}

/// Values read right after a deposit.
#[derive(Debug, Clone)]
struct DepositReadings {
    /// LP token `balanceOf` the caller contract.
    lp: U256,
    adapter_lp: U256,
    amount_in_token: U256,
    amount_in_lp: U256,
    redeemable: U256,
    sufficient: bool,
    can_stake: bool,
    pool_value: U256,
    pool_value_before: U256,
}

/// Curve LP is the underlying, so every amount the adapter reports must
/// equal the LP balance itself.
fn deposit_checks_for(r: &DepositReadings) -> Vec<Check> {
    vec![
        Check::eq("lp balance", r.adapter_lp, r.lp),
        Check::eq("amount in token", r.amount_in_token, r.lp),
        Check::eq("amount in lp token", r.amount_in_lp, r.lp),
        Check::eq("redeemable lp amount", r.redeemable, r.lp),
        Check::is_true("redeemable amount sufficient", r.sufficient),
        Check::is_true("canStake", r.can_stake),
        Check::gt("pool value", r.pool_value, r.pool_value_before),
    ]
}

/// Quote for swapping the reward accrued after staking. No reward, no quote.
fn swap_quote_check(unclaimed: U256, amounts: Option<&[U256]>) -> Result<Option<Check>> {
    if unclaimed.is_zero() {
        return Ok(None);
    }
    let amounts = amounts.context("reward accrued but no swap quote was read")?;
    Ok(Some(Check::nonzero("reward swap quote", oracle::swap_output(amounts)?)))
}

// ── Pool flow ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    /// deposit, stake, claim, harvest, unstake, withdraw
    Lifecycle,
    /// deposit, stake, then unstake and withdraw in one call
    QuickExit,
}

pub struct ConvexFlow {
    name: String,
    pool: ConvexPool,
    scenario: Scenario,
    caller: AdapterCaller,
    pool_value_before: U256,
    unclaimed_after_stake: U256,
}

impl ConvexFlow {
    pub fn new(pool: ConvexPool, caller: AdapterCaller, scenario: Scenario) -> Self {
        let name = match scenario {
            Scenario::Lifecycle => pool.name.clone(),
            Scenario::QuickExit => format!("{} (quick exit)", pool.name),
        };
        ConvexFlow {
            name,
            pool,
            scenario,
            caller,
            pool_value_before: U256::ZERO,
            unclaimed_after_stake: U256::ZERO,
        }
    }

    async fn pool_value(&self) -> Result<U256> {
        self.caller
            .adapter()
            .getPoolValue(self.pool.item.pool, self.pool.underlying)
            .call()
            .await
            .context("getPoolValue")
    }

    async fn stake_contract_balance(&self) -> Result<U256> {
        IConvexStake::new(self.pool.staking_pool, &self.caller.chain().provider)
            .balanceOf(self.caller.test_adapter)
            .call()
            .await
            .context("stake balanceOf")
    }

    async fn deposit_checks(&self) -> Result<Vec<Check>> {
        let c = &self.caller;
        let adapter = c.adapter();
        let (test, pool, underlying) = (c.test_adapter, self.pool.item.pool, self.pool.underlying);

        let lp = funding::balance_of(c.chain(), self.pool.item.lp_token, test).await?;
        let readings = DepositReadings {
            lp,
            adapter_lp: common::lp_balance(c, pool).await?,
            amount_in_token: adapter
                .getAllAmountInToken(test, underlying, pool)
                .call()
                .await
                .context("getAllAmountInToken")?,
            amount_in_lp: adapter
                .calculateAmountInLPToken(underlying, pool, lp)
                .call()
                .await
                .context("calculateAmountInLPToken")?,
            redeemable: adapter
                .calculateRedeemableLPTokenAmount(test, underlying, pool, lp)
                .call()
                .await
                .context("calculateRedeemableLPTokenAmount")?,
            sufficient: adapter
                .isRedeemableAmountSufficient(test, underlying, pool, lp)
                .call()
                .await
                .context("isRedeemableAmountSufficient")?,
            can_stake: adapter.canStake(pool).call().await.context("canStake")?,
            pool_value: self.pool_value().await?,
            pool_value_before: self.pool_value_before,
        };

        let mut checks = deposit_checks_for(&readings);
        checks.insert(1, common::check_underlying_balance(c, pool, underlying, underlying).await?);
        Ok(checks)
    }

    async fn stake_checks(&mut self) -> Result<Vec<Check>> {
        let c = &self.caller;
        let adapter = c.adapter();
        let (test, pool, underlying) = (c.test_adapter, self.pool.item.pool, self.pool.underlying);

        let staked = self.stake_contract_balance().await?;
        let earned = IConvexStake::new(self.pool.staking_pool, &c.chain().provider)
            .earned(test)
            .call()
            .await
            .context("stake earned")?;
        let unclaimed = common::unclaimed_reward(c, pool, underlying).await?;
        let amount_in_token = adapter
            .getAllAmountInTokenStake(test, underlying, pool)
            .call()
            .await
            .context("getAllAmountInTokenStake")?;
        let redeemable = adapter
            .calculateRedeemableLPTokenAmountStake(test, underlying, pool, amount_in_token)
            .call()
            .await
            .context("calculateRedeemableLPTokenAmountStake")?;
        let sufficient = adapter
            .isRedeemableAmountSufficientStake(test, underlying, pool, redeemable)
            .call()
            .await
            .context("isRedeemableAmountSufficientStake")?;

        let checks = vec![
            Check::eq("staked balance", common::staked_balance(c, pool).await?, staked),
            common::check_reward_token(c, pool, self.pool.reward_token).await?,
            Check::eq("unclaimed reward", unclaimed, earned),
            // staked LP values 1:1 until the reward is swapped
            Check::eq("amount in token (staked)", amount_in_token, staked),
            Check::eq("redeemable lp amount (staked)", redeemable, staked),
            Check::is_true("redeemable amount sufficient (staked)", sufficient),
        ];
        self.unclaimed_after_stake = unclaimed;
        Ok(checks)
    }

    async fn claim_checks(&self) -> Result<Vec<Check>> {
        let c = &self.caller;
        let mut checks = vec![
            common::check_claimed_reward(c, self.pool.item.pool, self.pool.reward_token).await?,
        ];
        let amounts = if self.unclaimed_after_stake.is_zero() {
            debug!(pool = %self.name, "no reward accrued, swap quote not checked");
            None
        } else {
            Some(
                c.adapter()
                    .getSwapTokenAmounts(self.pool.reward_token, self.pool.item.pool, self.unclaimed_after_stake)
                    .call()
                    .await
                    .context("getSwapTokenAmounts")?,
            )
        };
        checks.extend(swap_quote_check(self.unclaimed_after_stake, amounts.as_deref())?);
        Ok(checks)
    }
}

#[async_trait]
impl PoolFlow for ConvexFlow {
    fn name(&self) -> &str {
        &self.name
    }

    fn plan(&self) -> Plan {
        match self.scenario {
            Scenario::Lifecycle => Plan::lifecycle(true, true),
            Scenario::QuickExit => Plan::quick_exit(),
        }
    }

    async fn before(&mut self) -> Result<Vec<Check>> {
        if self.scenario == Scenario::QuickExit {
            return Ok(Vec::new());
        }
        self.pool_value_before = self.pool_value().await?;
        Ok(vec![Check::nonzero("pool value before deposit", self.pool_value_before)])
    }

    async fn execute(&mut self, step: Step) -> Result<()> {
        self.caller.run(step, self.pool.item.pool, self.pool.underlying).await?;
        if step == Step::Stake && self.scenario == Scenario::Lifecycle {
            let chain = self.caller.chain();
            chain.mine().await?;
            let now = chain.latest_timestamp().await?;
            chain.move_to_timestamp(now + REWARD_WARP_SECS).await?;
        }
        Ok(())
    }

    async fn reward_balance(&self) -> Result<U256> {
        common::reward_balance(&self.caller, self.pool.item.pool).await
    }

    async fn verify(&mut self, step: Step) -> Result<Vec<Check>> {
        let c = &self.caller;
        let pool = self.pool.item.pool;
        match (self.scenario, step) {
            (Scenario::QuickExit, Step::Deposit) => Ok(vec![Check::nonzero(
                "lp balance",
                common::lp_balance(c, pool).await?,
            )]),
            (Scenario::QuickExit, Step::Stake) => Ok(vec![Check::eq(
                "staked balance",
                common::staked_balance(c, pool).await?,
                self.stake_contract_balance().await?,
            )]),
            (_, Step::UnstakeAndWithdraw) => Ok(vec![Check::zero(
                "staked balance after exit",
                common::staked_balance(c, pool).await?,
            )]),
            (_, Step::Deposit) => self.deposit_checks().await,
            (_, Step::Stake) => self.stake_checks().await,
            (_, Step::ClaimReward) => self.claim_checks().await,
            (_, Step::Harvest) => Ok(vec![common::check_harvested(c, self.pool.underlying).await?]),
            (_, Step::Unstake) => Ok(vec![
                common::check_lp_balance(c, pool, self.pool.item.lp_token).await?,
                common::check_staked_balance(c, pool, self.pool.staking_pool).await?,
            ]),
            (_, Step::Withdraw) => {
                let mut checks = vec![
                    common::check_lp_balance(c, pool, self.pool.item.lp_token).await?,
                    common::check_underlying_balance(c, pool, self.pool.underlying, self.pool.underlying).await?,
                ];
                checks.extend(common::check_fully_exited(c, pool, true).await?);
                Ok(checks)
            }
        }
    }
}
