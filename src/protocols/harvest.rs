//! Harvest Finance on Ethereum: share vaults (fTokens) staked in reward
//! farms paying FARM.

use alloy::primitives::{Address, U256, address};
use alloy::providers::DynProvider;
use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;

use super::{SuiteContext, common, first_token, setup_err};
use crate::driver::{self, AdapterCaller, Plan, PoolFlow, Step};
use crate::error::HarnessError;
use crate::evm::contracts::{IERC20, IHarvestController, IHarvestDeposit, IHarvestFarm, IUniswapV2Router02};
use crate::evm::{self, OVERRIDE_GAS_PRICE};
use crate::fork::ChainHandle;
use crate::funding::{self, GAS_MONEY_ETHER};
use crate::model::PoolItem;
use crate::oracle;
use crate::verify::Check;

pub const ADAPTER: &str = "HarvestFinanceAdapter";

/// Whole tokens of each underlying the caller contract is funded with.
pub const FUND_WHOLE_TOKENS: u64 = 10_000;

/// Seconds the clock moves forward after staking so the farm accrues FARM.
pub const REWARD_WARP_SECS: u64 = 2_000_000;

pub const DAI: Address = address!("6B175474E89094C44Da98b954EedeAC495271d0F");
/// Holds both DAI and USDT at the pinned block.
pub const STABLECOIN_WHALE: Address = address!("47ac0Fb4F2D84898e4D9E7b4DaB3C24507a6D503");
pub const UNISWAP_V2_ROUTER: Address = address!("7a250d5630B4cF539739dF2C5dAcb4c659F2488D");

// ── Suite ────────────────────────────────────────────────────────────

/// Deploy, fund the caller with `fund_whole` of each underlying, whitelist
/// it on every vault and drive each pool through the full lifecycle.
pub async fn run(ctx: &SuiteContext, fund_whole: u64) -> Result<crate::report::SuiteReport> {
    let mut report = ctx.report();
    let pools = ctx
        .select::<PoolItem>(&ctx.pools_path, &[], &mut report)?
        .into_iter()
        .map(|(name, item)| HarvestPool::resolve(name, item))
        .collect::<Result<Vec<_>, _>>()?;

    let caller = ctx
        .deploy_harness(ADAPTER, &[])
        .await
        .map_err(setup_err("harvest", "deploy"))?;

    for pool in &pools {
        let whale = pool.item.whale.unwrap_or(STABLECOIN_WHALE);
        fund(ctx.chain(), pool.underlying, whale, caller.test_adapter, fund_whole)
            .await
            .map_err(setup_err(&pool.name, "funding"))?;
    }

    for pool in &pools {
        whitelist(ctx.chain(), pool.item.pool, caller.test_adapter)
            .await
            .map_err(setup_err(&pool.name, "whitelist"))?;
    }

    for pool in pools {
        let mut flow = HarvestFlow::new(pool, caller.clone());
        report.pools.push(driver::drive(&mut flow).await);
    }
    Ok(report)
}

/// Transfer `whole` tokens of `token` (at its own decimals) from `whale`.
async fn fund(chain: &ChainHandle, token: Address, whale: Address, to: Address, whole: u64) -> Result<()> {
    let decimals = IERC20::new(token, &chain.provider)
        .decimals()
        .call()
        .await
        .context("underlying decimals")?;
    let amount = oracle::whole_units(whole, decimals)?;
    funding::transfer_from_whale(chain, token, whale, to, amount).await
}

/// Harvest vaults only accept deposits from whitelisted contracts. Add the
/// caller through the vault controller, acting as governance.
pub async fn whitelist(chain: &ChainHandle, vault: Address, target: Address) -> Result<()> {
    let vault = IHarvestDeposit::new(vault, &chain.provider);
    let governance = vault.governance().call().await.context("vault governance()")?;
    let controller = vault.controller().call().await.context("vault controller()")?;

    chain.impersonate(governance).await?;
    chain.set_balance(governance, evm::ether(GAS_MONEY_ETHER)).await?;

    let controller = IHarvestController::new(controller, &chain.provider);
    let pending = controller
        .addToWhitelist(target)
        .from(governance)
        .gas_price(OVERRIDE_GAS_PRICE)
        .send()
        .await
        .context("sending addToWhitelist")?;
    evm::confirm(pending, "addToWhitelist").await?;
    let pending = controller
        .addCodeToWhitelist(target)
        .from(governance)
        .gas_price(OVERRIDE_GAS_PRICE)
        .send()
        .await
        .context("sending addCodeToWhitelist")?;
    evm::confirm(pending, "addCodeToWhitelist").await?;

    chain.stop_impersonating(governance).await?;
    info!(vault = %vault.address(), "caller whitelisted");
    Ok(())
}

// ── Pool flow ────────────────────────────────────────────────────────

/// A fixture entry with its underlying token resolved before anything is
/// deployed. Staking is optional for Harvest vaults.
#[derive(Debug, Clone)]
pub struct HarvestPool {
    pub name: String,
    pub item: PoolItem,
    pub underlying: Address,
}

impl HarvestPool {
    pub fn resolve(name: String, item: PoolItem) -> Result<Self, HarnessError> {
        let underlying = first_token(&name, &item.tokens)?;
        Ok(HarvestPool { name, item, underlying })
    }
}

pub struct HarvestFlow {
    name: String,
    pool: PoolItem,
    underlying: Address,
    staking_pool: Option<Address>,
    reward_token: Option<Address>,
    caller: AdapterCaller,
}

impl HarvestFlow {
    pub fn new(pool: HarvestPool, caller: AdapterCaller) -> Self {
        HarvestFlow {
            staking_pool: pool.item.staking_pool,
            reward_token: pool.item.reward_tokens.first().copied(),
            underlying: pool.underlying,
            name: pool.name,
            pool: pool.item,
            caller,
        }
    }

    fn vault(&self) -> IHarvestDeposit::IHarvestDepositInstance<&DynProvider> {
        IHarvestDeposit::new(self.pool.pool, &self.caller.chain().provider)
    }

    fn staking(&self) -> Result<Address> {
        self.staking_pool
            .with_context(|| format!("{} has no staking pool", self.name))
    }

    fn reward(&self) -> Result<Address> {
        self.reward_token
            .with_context(|| format!("{} has no reward token", self.name))
    }

    async fn decimals(&self) -> Result<u8> {
        self.vault().decimals().call().await.context("vault decimals()")
    }

    /// LP, underlying and share value after depositing.
    async fn deposit_checks(&self) -> Result<Vec<Check>> {
        let c = &self.caller;
        let pool = self.pool.pool;
        let lp = funding::balance_of(c.chain(), pool, c.test_adapter).await?;
        let ppfs = self
            .vault()
            .getPricePerFullShare()
            .call()
            .await
            .context("getPricePerFullShare")?;
        Ok(vec![
            common::check_lp_balance(c, pool, pool).await?,
            common::check_underlying_balance(c, pool, pool, self.underlying).await?,
            common::check_share_value(c, pool, self.underlying, lp, ppfs, self.decimals().await?).await?,
        ])
    }

    async fn stake_checks(&self) -> Result<Vec<Check>> {
        let c = &self.caller;
        let pool = self.pool.pool;
        let staking = self.staking()?;
        let reward = self.reward()?;
        let farm = IHarvestFarm::new(staking, &c.chain().provider);

        let staked = farm.balanceOf(c.test_adapter).call().await.context("farm balanceOf")?;
        let earned = farm.earned(c.test_adapter).call().await.context("farm earned")?;
        let unclaimed = common::unclaimed_reward(c, pool, self.underlying).await?;

        let ppfs = self
            .vault()
            .getPricePerFullShare()
            .call()
            .await
            .context("getPricePerFullShare")?;
        let reward_in_token = self.quote_reward(reward, earned).await?;
        let expected = oracle::harvest_stake_value(staked, ppfs, self.decimals().await?, reward_in_token)?;
        let actual = c
            .adapter()
            .getAllAmountInTokenStake(c.test_adapter, self.underlying, pool)
            .call()
            .await
            .context("getAllAmountInTokenStake")?;

        Ok(vec![
            Check::eq("staked balance", common::staked_balance(c, pool).await?, staked),
            common::check_reward_token(c, pool, reward).await?,
            Check::eq("unclaimed reward", unclaimed, earned),
            Check::eq("amount in token (staked)", actual, expected),
        ])
    }

    /// Underlying the pending reward would swap into: reward → WETH →
    /// underlying on Uniswap V2. Nothing pending quotes as zero.
    async fn quote_reward(&self, reward: Address, earned: U256) -> Result<U256> {
        if earned.is_zero() {
            return Ok(U256::ZERO);
        }
        let router = IUniswapV2Router02::new(UNISWAP_V2_ROUTER, &self.caller.chain().provider);
        let weth = router.WETH().call().await.context("router WETH()")?;
        let amounts = router
            .getAmountsOut(earned, vec![reward, weth, self.underlying])
            .call()
            .await
            .context("getAmountsOut")?;
        oracle::swap_output(&amounts)
    }
}

#[async_trait]
impl PoolFlow for HarvestFlow {
    fn name(&self) -> &str {
        &self.name
    }

    fn plan(&self) -> Plan {
        Plan::lifecycle(self.staking_pool.is_some(), true)
    }

    async fn execute(&mut self, step: Step) -> Result<()> {
        self.caller.run(step, self.pool.pool, self.underlying).await?;
        if step == Step::Stake {
            self.caller.chain().increase_time(REWARD_WARP_SECS).await?;
        }
        Ok(())
    }

    async fn reward_balance(&self) -> Result<U256> {
        common::reward_balance(&self.caller, self.pool.pool).await
    }

    async fn verify(&mut self, step: Step) -> Result<Vec<Check>> {
        let c = &self.caller;
        let pool = self.pool.pool;
        match step {
            Step::Deposit => self.deposit_checks().await,
            Step::Stake => self.stake_checks().await,
            Step::ClaimReward => Ok(vec![common::check_claimed_reward(c, pool, self.reward()?).await?]),
            Step::Harvest => Ok(vec![common::check_harvested(c, self.underlying).await?]),
            Step::Unstake => Ok(vec![
                common::check_lp_balance(c, pool, pool).await?,
                common::check_staked_balance(c, pool, self.staking()?).await?,
            ]),
            Step::Withdraw => {
                let mut checks = vec![
                    common::check_lp_balance(c, pool, pool).await?,
                    common::check_underlying_balance(c, pool, pool, self.underlying).await?,
                ];
                checks.extend(common::check_fully_exited(c, pool, self.staking_pool.is_some()).await?);
                Ok(checks)
            }
            Step::UnstakeAndWithdraw => Ok(vec![Check::zero(
                "staked balance",
                common::staked_balance(c, pool).await?,
            )]),
        }
    }
}
