//! Beefy Finance on Polygon: auto-compounding vaults (mooTokens), some of
//! which can be staked again in reward pools.

use alloy::primitives::{Address, U256, address};
use alloy::providers::DynProvider;
use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;

use super::{SuiteContext, common, first_token, required, setup_err};
use crate::driver::{self, AdapterCaller, Plan, PoolFlow, Step};
use crate::error::HarnessError;
use crate::evm::contracts::{IBeefyDeposit, IBeefyFarm, IERC20, IUniswapV2Pair};
use crate::fork::ChainHandle;
use crate::funding;
use crate::model::pool::{self, BeefyVaults, StakingPool};
use crate::model::{BeefyVaultItem, StakingPoolItem};
use crate::oracle;
use crate::report::SuiteReport;
use crate::verify::Check;

pub const ADAPTER: &str = "BeefyFinanceAdapter";

pub const WMATIC: Address = address!("0d500B1d8E8eF31E21C99d1Db9A6444d3ADf1270");

/// MATIC spent per token bought when funding a vault.
pub const MATIC_PER_SWAP: u64 = 50;

/// Whole want tokens a staking pool's caller balance is funded with.
pub const STAKING_FUND_WHOLE_TOKENS: u64 = 10;

const QUICKSWAP: Address = address!("a5e0829caced8ffdd4de3c43696c57f7d7a678ff");

// ── Routers ──────────────────────────────────────────────────────────

/// Where a vault's want token is bought (`swap`) and, for LP wants, where
/// its pair is hosted (`host`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Routers {
    pub swap: Address,
    pub host: Address,
}

impl Routers {
    const fn same(router: Address) -> Self {
        Routers {
            swap: router,
            host: router,
        }
    }

    /// Router pair for a vault's `platform`. Unknown platforms use QuickSwap.
    pub fn for_platform(platform: &str) -> Self {
        match platform {
            "JetSwap" => Self::same(address!("5C6EC38fb0e2609672BDf628B1fD605A523E5923")),
            "SushiSwap" => Self::same(address!("1b02dA8Cb0d097eB8D57A175b88c7D8b47997506")),
            "ApeSwap" => Self::same(address!("C0788A3aD43d79aa53B09c2EaCc313A787d1d607")),
            "Cometh" => Self::same(address!("93bcDc45f7e62f89a8e901DC4A0E2c6C427D9F25")),
            "WaultFinance" => Self::same(address!("3a1D87f206D12415f5b0A33E786967680AAb4f6d")),
            "Polyzap" => Self::same(address!("4aAEC1FA8247F85Dc3Df20F4e03FEAFdCB087Ae9")),
            // DFyn pairs WMATIC differently, so buy on QuickSwap.
            "DFyn" => Routers {
                swap: QUICKSWAP,
                host: address!("A102072A4C07F06EC3B4900FDC4C7B80b6c57429"),
            },
            // Neither can swap out of WMATIC.
            "FireBird" | "Curve" => Routers {
                swap: QUICKSWAP,
                host: address!("F6fa9Ea1f64f1BBfA8d71f7f43fAF6D45520bfac"),
            },
            _ => Self::same(QUICKSWAP),
        }
    }
}

// ── Suite ────────────────────────────────────────────────────────────

pub async fn run(ctx: &SuiteContext) -> Result<SuiteReport> {
    let mut report = ctx.report();
    let vault_fixture: BeefyVaults = pool::load_fixture(&ctx.pools_path)?;
    let staking_fixture: StakingPool = match &ctx.staking_pools_path {
        Some(path) => pool::load_fixture(path)?,
        None => StakingPool::new(),
    };
    // --skip and --only may name entries of either fixture.
    pool::check_requested(vault_fixture.keys().chain(staking_fixture.keys()), &ctx.skip, &ctx.only)?;

    let vaults = ctx.split(&ctx.pools_path, &vault_fixture, &[], &mut report);
    let staking = match &ctx.staking_pools_path {
        Some(path) => ctx.split(path, &staking_fixture, &[], &mut report),
        None => Vec::new(),
    };
    pool::ensure_selected(vaults.len() + staking.len(), report.skipped.len())?;
    let staking = staking
        .into_iter()
        .map(|(name, item)| StakingTarget::resolve(name, item))
        .collect::<Result<Vec<_>, _>>()?;

    let caller = ctx
        .deploy_harness(ADAPTER, &[])
        .await
        .map_err(setup_err("beefy", "deploy"))?;
    let admin = ctx.fork.signers.admin;

    for (name, vault) in &vaults {
        fund_vault(ctx.chain(), vault, admin, caller.test_adapter)
            .await
            .map_err(setup_err(name, "funding"))?;
    }
    for target in &staking {
        fund_staking(ctx.chain(), target, caller.test_adapter)
            .await
            .map_err(setup_err(&target.name, "funding"))?;
    }

    for (name, vault) in vaults {
        let mut flow = BeefyVaultFlow::new(name, vault, caller.clone());
        report.pools.push(driver::drive(&mut flow).await);
    }
    for target in staking {
        let mut flow = BeefyStakingFlow::new(target, caller.clone());
        report.pools.push(driver::drive(&mut flow).await);
    }
    Ok(report)
}

/// Acquire the vault's want token with MATIC and hand all of it to `to`.
/// Single-asset wants are wrapped or bought. LP wants are built by buying
/// both sides and adding liquidity on the pair's host router.
async fn fund_vault(chain: &ChainHandle, vault: &BeefyVaultItem, admin: Address, to: Address) -> Result<()> {
    let routers = Routers::for_platform(&vault.platform);
    let value = crate::evm::ether(MATIC_PER_SWAP);
    let want = vault.want_token;

    if vault.is_single_asset() {
        funding::acquire_with_native(chain, routers.swap, WMATIC, admin, want, value).await?;
    } else {
        let pair = IUniswapV2Pair::new(want, &chain.provider);
        let token0 = pair.token0().call().await.context("pair token0")?;
        let token1 = pair.token1().call().await.context("pair token1")?;
        funding::acquire_with_native(chain, routers.swap, WMATIC, admin, token0, value).await?;
        funding::acquire_with_native(chain, routers.swap, WMATIC, admin, token1, value).await?;

        let amount0 = funding::balance_of(chain, token0, admin).await?;
        let amount1 = funding::balance_of(chain, token1, admin).await?;
        funding::add_liquidity(chain, routers.host, admin, token0, token1, amount0, amount1, admin).await?;
    }

    let held = funding::balance_of(chain, want, admin).await?;
    funding::transfer(chain, want, admin, to, held).await?;
    info!(
        want = %want,
        platform = %vault.platform,
        amount = %held,
        "vault want funded"
    );
    Ok(())
}

async fn fund_staking(chain: &ChainHandle, target: &StakingTarget, to: Address) -> Result<()> {
    let token = target.underlying;
    let decimals = IERC20::new(token, &chain.provider)
        .decimals()
        .call()
        .await
        .context("want decimals")?;
    let amount = oracle::whole_units(STAKING_FUND_WHOLE_TOKENS, decimals)?;
    funding::transfer_from_whale(chain, token, target.item.whale, to, amount).await
}

// ── Shared checks ────────────────────────────────────────────────────

fn vault_contract(caller: &AdapterCaller, vault: Address) -> IBeefyDeposit::IBeefyDepositInstance<&DynProvider> {
    IBeefyDeposit::new(vault, &caller.chain().provider)
}

/// LP, underlying and share value after depositing `want` into `vault`.
async fn deposit_checks(caller: &AdapterCaller, vault: Address, want: Address) -> Result<Vec<Check>> {
    let contract = vault_contract(caller, vault);
    let lp = funding::balance_of(caller.chain(), vault, caller.test_adapter).await?;
    let ppfs = contract
        .getPricePerFullShare()
        .call()
        .await
        .context("getPricePerFullShare")?;
    let decimals = contract.decimals().call().await.context("vault decimals()")?;
    Ok(vec![
        Check::nonzero("lp balance", lp),
        common::check_lp_balance(caller, vault, vault).await?,
        common::check_underlying_balance(caller, vault, vault, want).await?,
        common::check_share_value(caller, vault, want, lp, ppfs, decimals).await?,
    ])
}

async fn withdraw_checks(caller: &AdapterCaller, vault: Address, want: Address, staking: bool) -> Result<Vec<Check>> {
    let mut checks = vec![
        common::check_lp_balance(caller, vault, vault).await?,
        common::check_underlying_balance(caller, vault, vault, want).await?,
    ];
    checks.extend(common::check_fully_exited(caller, vault, staking).await?);
    Ok(checks)
}

// ── Vault flow ───────────────────────────────────────────────────────

/// Deposit into a vault and withdraw again. Vaults have no staking leg.
pub struct BeefyVaultFlow {
    name: String,
    vault: BeefyVaultItem,
    caller: AdapterCaller,
}

impl BeefyVaultFlow {
    pub fn new(name: String, vault: BeefyVaultItem, caller: AdapterCaller) -> Self {
        BeefyVaultFlow { name, vault, caller }
    }
}

#[async_trait]
impl PoolFlow for BeefyVaultFlow {
    fn name(&self) -> &str {
        &self.name
    }

    fn plan(&self) -> Plan {
        Plan::lifecycle(false, false)
    }

    async fn execute(&mut self, step: Step) -> Result<()> {
        self.caller
            .run(step, self.vault.beefy_vault, self.vault.want_token)
            .await?;
        Ok(())
    }

    async fn reward_balance(&self) -> Result<U256> {
        Ok(U256::ZERO)
    }

    async fn verify(&mut self, step: Step) -> Result<Vec<Check>> {
        let (vault, want) = (self.vault.beefy_vault, self.vault.want_token);
        match step {
            Step::Deposit => deposit_checks(&self.caller, vault, want).await,
            Step::Withdraw => withdraw_checks(&self.caller, vault, want, false).await,
            other => anyhow::bail!("vault plan has no {other} step"),
        }
    }
}

// ── Staking flow ─────────────────────────────────────────────────────

/// A staking pool entry with its want and reward tokens resolved before
/// anything is deployed.
#[derive(Debug, Clone)]
pub struct StakingTarget {
    pub name: String,
    pub item: StakingPoolItem,
    pub underlying: Address,
    pub reward_token: Address,
}

impl StakingTarget {
    pub fn resolve(name: String, item: StakingPoolItem) -> Result<Self, HarnessError> {
        let underlying = first_token(&name, &item.tokens)?;
        let reward_token = required(&name, item.reward_tokens.first().copied(), "reward token")?;
        Ok(StakingTarget {
            name,
            item,
            underlying,
            reward_token,
        })
    }
}

/// Deposit into a vault, stake the mooTokens, claim, unstake and withdraw.
/// Rewards are not harvested: the reward token lacks swap liquidity.
pub struct BeefyStakingFlow {
    name: String,
    pool: StakingPoolItem,
    underlying: Address,
    reward_token: Address,
    caller: AdapterCaller,
}

impl BeefyStakingFlow {
    pub fn new(target: StakingTarget, caller: AdapterCaller) -> Self {
        BeefyStakingFlow {
            name: target.name,
            pool: target.item,
            underlying: target.underlying,
            reward_token: target.reward_token,
            caller,
        }
    }

    async fn stake_checks(&self) -> Result<Vec<Check>> {
        let c = &self.caller;
        let pool = self.pool.pool;
        let farm = IBeefyFarm::new(self.pool.staking_pool, &c.chain().provider);

        let staked = farm.balanceOf(c.test_adapter).call().await.context("farm balanceOf")?;
        let earned = farm.earned(c.test_adapter).call().await.context("farm earned")?;
        let unclaimed = common::unclaimed_reward(c, pool, self.underlying).await?;

        let contract = vault_contract(c, pool);
        let ppfs = contract
            .getPricePerFullShare()
            .call()
            .await
            .context("getPricePerFullShare")?;
        let decimals = contract.decimals().call().await.context("vault decimals()")?;
        let actual = c
            .adapter()
            .getAllAmountInTokenStake(c.test_adapter, self.underlying, pool)
            .call()
            .await
            .context("getAllAmountInTokenStake")?;

        Ok(vec![
            Check::eq("staked balance", common::staked_balance(c, pool).await?, staked),
            common::check_reward_token(c, pool, self.reward_token).await?,
            Check::eq("unclaimed reward", unclaimed, earned),
            Check::eq(
                "amount in token (staked)",
                actual,
                oracle::share_price_amount(staked, ppfs, decimals)?,
            ),
        ])
    }
}

#[async_trait]
impl PoolFlow for BeefyStakingFlow {
    fn name(&self) -> &str {
        &self.name
    }

    fn plan(&self) -> Plan {
        Plan::lifecycle(true, false)
    }

    async fn execute(&mut self, step: Step) -> Result<()> {
        self.caller.run(step, self.pool.pool, self.underlying).await?;
        if step == Step::Stake {
            self.caller.chain().mine().await?;
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
            Step::Deposit => deposit_checks(c, pool, self.underlying).await,
            Step::Stake => self.stake_checks().await,
            Step::ClaimReward => Ok(vec![common::check_claimed_reward(c, pool, self.reward_token).await?]),
            Step::Unstake => Ok(vec![
                common::check_lp_balance(c, pool, pool).await?,
                common::check_staked_balance(c, pool, self.pool.staking_pool).await?,
            ]),
            Step::Withdraw => withdraw_checks(c, pool, self.underlying, true).await,
            other => anyhow::bail!("staking plan has no {other} step"),
        }
    }
}
