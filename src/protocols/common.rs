//! Checks every adapter suite makes the same way.

use alloy::primitives::{Address, U256};
use anyhow::{Context, Result};

use crate::driver::AdapterCaller;
use crate::funding;
use crate::oracle;
use crate::verify::Check;

/// LP balance as the adapter reports it for the caller contract.
pub async fn lp_balance(caller: &AdapterCaller, pool: Address) -> Result<U256> {
    let test = caller.test_adapter;
    caller
        .adapter()
        .getLiquidityPoolTokenBalance(test, test, pool)
        .call()
        .await
        .context("getLiquidityPoolTokenBalance")
}

pub async fn staked_balance(caller: &AdapterCaller, pool: Address) -> Result<U256> {
    caller
        .adapter()
        .getLiquidityPoolTokenBalanceStake(caller.test_adapter, pool)
        .call()
        .await
        .context("getLiquidityPoolTokenBalanceStake")
}

/// Adapter's LP balance against the LP token's own `balanceOf`.
pub async fn check_lp_balance(caller: &AdapterCaller, pool: Address, lp_token: Address) -> Result<Check> {
    let actual = lp_balance(caller, pool).await?;
    let expected = funding::balance_of(caller.chain(), lp_token, caller.test_adapter).await?;
    Ok(Check::eq("lp balance", actual, expected))
}

/// Adapter's staked balance against the staking contract's `balanceOf`.
pub async fn check_staked_balance(caller: &AdapterCaller, pool: Address, staking_pool: Address) -> Result<Check> {
    let actual = staked_balance(caller, pool).await?;
    let expected = funding::balance_of(caller.chain(), staking_pool, caller.test_adapter).await?;
    Ok(Check::eq("staked balance", actual, expected))
}

/// Balance of the adapter's first underlying token, read through the
/// caller contract, against the underlying token's `balanceOf`.
///
/// `lookup` is the second argument of `getUnderlyingTokens`, which differs
/// between adapters.
pub async fn check_underlying_balance(
    caller: &AdapterCaller,
    pool: Address,
    lookup: Address,
    underlying: Address,
) -> Result<Check> {
    let tokens = caller
        .adapter()
        .getUnderlyingTokens(pool, lookup)
        .call()
        .await
        .context("getUnderlyingTokens")?;
    let reported = tokens.first().copied().context("adapter reports no underlying tokens")?;
    let actual = caller
        .caller()
        .getERC20TokenBalance(reported, caller.test_adapter)
        .call()
        .await
        .context("getERC20TokenBalance")?;
    let expected = funding::balance_of(caller.chain(), underlying, caller.test_adapter).await?;
    Ok(Check::eq("underlying balance", actual, expected))
}

pub async fn check_reward_token(caller: &AdapterCaller, pool: Address, expected: Address) -> Result<Check> {
    let actual = caller
        .adapter()
        .getRewardToken(pool)
        .call()
        .await
        .context("getRewardToken")?;
    Ok(Check::same_address("reward token", actual, expected))
}

pub async fn unclaimed_reward(caller: &AdapterCaller, pool: Address, underlying: Address) -> Result<U256> {
    caller
        .adapter()
        .getUnclaimedRewardTokenAmount(caller.test_adapter, pool, underlying)
        .call()
        .await
        .context("getUnclaimedRewardTokenAmount")
}

/// Reward-token balance held by the caller contract, via the token the
/// adapter reports.
pub async fn reward_balance(caller: &AdapterCaller, pool: Address) -> Result<U256> {
    let reward = caller
        .adapter()
        .getRewardToken(pool)
        .call()
        .await
        .context("getRewardToken")?;
    caller
        .caller()
        .getERC20TokenBalance(reward, caller.test_adapter)
        .call()
        .await
        .context("getERC20TokenBalance")
}

/// Claimed reward balance against the reward token's own `balanceOf`.
pub async fn check_claimed_reward(caller: &AdapterCaller, pool: Address, reward_token: Address) -> Result<Check> {
    let actual = reward_balance(caller, pool).await?;
    let expected = funding::balance_of(caller.chain(), reward_token, caller.test_adapter).await?;
    Ok(Check::eq("claimed reward balance", actual, expected))
}

/// After a harvest the reward must have turned into some underlying.
pub async fn check_harvested(caller: &AdapterCaller, underlying: Address) -> Result<Check> {
    let balance = caller
        .caller()
        .getERC20TokenBalance(underlying, caller.test_adapter)
        .call()
        .await
        .context("getERC20TokenBalance")?;
    Ok(Check::nonzero("underlying after harvest", balance))
}

/// Share vault position: `getAllAmountInToken` against
/// `lp × pricePerFullShare / 10^decimals`.
pub async fn check_share_value(
    caller: &AdapterCaller,
    pool: Address,
    underlying: Address,
    lp: U256,
    price_per_full_share: U256,
    decimals: u8,
) -> Result<Check> {
    let actual = caller
        .adapter()
        .getAllAmountInToken(caller.test_adapter, underlying, pool)
        .call()
        .await
        .context("getAllAmountInToken")?;
    let expected = oracle::share_price_amount(lp, price_per_full_share, decimals)?;
    Ok(Check::eq("amount in token", actual, expected))
}

/// Both legs of the position must be empty once everything is withdrawn.
pub async fn check_fully_exited(caller: &AdapterCaller, pool: Address, staking: bool) -> Result<Vec<Check>> {
    let mut checks = vec![Check::zero("lp balance after exit", lp_balance(caller, pool).await?)];
    if staking {
        checks.push(Check::zero(
            "staked balance after exit",
            staked_balance(caller, pool).await?,
        ));
    }
    Ok(checks)
}
