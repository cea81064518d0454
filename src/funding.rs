//! Getting tokens onto the fork: whale transfers, wrapping, DEX swaps and
//! liquidity provisioning.

use alloy::primitives::{Address, U256};
use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use crate::evm::contracts::{IERC20, IUniswapV2Router02, IWETH};
use crate::evm::{self, OVERRIDE_GAS_PRICE};
use crate::fork::ChainHandle;

/// Native balance given to impersonated accounts so they can pay gas.
pub const GAS_MONEY_ETHER: u64 = 1000;

/// Seconds a router swap stays valid after the latest block.
const SWAP_DEADLINE_SECS: u64 = 900;

// ── Whales ───────────────────────────────────────────────────────────

/// Move `amount` of `token` from an impersonated `whale` to `recipient`.
pub async fn transfer_from_whale(
    chain: &ChainHandle,
    token: Address,
    whale: Address,
    recipient: Address,
    amount: U256,
) -> Result<()> {
    let erc20 = IERC20::new(token, &chain.provider);
    let held = erc20
        .balanceOf(whale)
        .call()
        .await
        .with_context(|| format!("balanceOf whale {whale}"))?;
    if held < amount {
        bail!(
            "whale {} holds {held} of {}, need {amount}",
            evm::short_addr(&whale),
            evm::short_addr(&token)
        );
    }

    chain.impersonate(whale).await?;
    chain.set_balance(whale, evm::ether(GAS_MONEY_ETHER)).await?;

    let pending = erc20
        .transfer(recipient, amount)
        .from(whale)
        .gas_price(OVERRIDE_GAS_PRICE)
        .send()
        .await
        .context("sending whale transfer")?;
    evm::confirm(pending, "whale transfer").await?;

    chain.stop_impersonating(whale).await?;
    debug!(
        token = %token,
        whale = %whale,
        recipient = %recipient,
        amount = %amount,
        "funded from whale"
    );
    Ok(())
}

// ── Native ───────────────────────────────────────────────────────────

/// Wrap `amount` of the native coin into its wrapped token (WETH, WMATIC).
pub async fn wrap_native(chain: &ChainHandle, wrapped: Address, from: Address, amount: U256) -> Result<()> {
    let weth = IWETH::new(wrapped, &chain.provider);
    let pending = weth
        .deposit()
        .value(amount)
        .from(from)
        .gas_price(OVERRIDE_GAS_PRICE)
        .send()
        .await
        .context("sending wrap")?;
    evm::confirm(pending, "wrap native").await?;
    Ok(())
}

// ── Tokens ───────────────────────────────────────────────────────────

pub async fn transfer(chain: &ChainHandle, token: Address, from: Address, to: Address, amount: U256) -> Result<()> {
    let pending = IERC20::new(token, &chain.provider)
        .transfer(to, amount)
        .from(from)
        .gas_price(OVERRIDE_GAS_PRICE)
        .send()
        .await
        .context("sending transfer")?;
    evm::confirm(pending, "token transfer").await?;
    Ok(())
}

pub async fn approve(chain: &ChainHandle, token: Address, owner: Address, spender: Address, amount: U256) -> Result<()> {
    let pending = IERC20::new(token, &chain.provider)
        .approve(spender, amount)
        .from(owner)
        .gas_price(OVERRIDE_GAS_PRICE)
        .send()
        .await
        .context("sending approve")?;
    evm::confirm(pending, "approve").await?;
    Ok(())
}

pub async fn balance_of(chain: &ChainHandle, token: Address, account: Address) -> Result<U256> {
    IERC20::new(token, &chain.provider)
        .balanceOf(account)
        .call()
        .await
        .with_context(|| format!("balanceOf {account} on {token}"))
}

// ── DEX ──────────────────────────────────────────────────────────────

/// Buy `token` with `value` native coin on a Uniswap V2 style router,
/// routing through `wrapped`. Returns the amount `recipient` received.
pub async fn swap_native_for_token(
    chain: &ChainHandle,
    router: Address,
    wrapped: Address,
    from: Address,
    token: Address,
    value: U256,
    recipient: Address,
) -> Result<U256> {
    let before = balance_of(chain, token, recipient).await?;
    let deadline = U256::from(chain.latest_timestamp().await? + SWAP_DEADLINE_SECS);

    let pending = IUniswapV2Router02::new(router, &chain.provider)
        .swapExactETHForTokens(U256::ZERO, vec![wrapped, token], recipient, deadline)
        .value(value)
        .from(from)
        .gas_price(OVERRIDE_GAS_PRICE)
        .send()
        .await
        .context("sending swapExactETHForTokens")?;
    evm::confirm(pending, "swap native for token").await?;

    let received = balance_of(chain, token, recipient).await?.saturating_sub(before);
    if received.is_zero() {
        bail!("swap into {} returned nothing", evm::short_addr(&token));
    }
    Ok(received)
}

/// Get `token` into `from`'s wallet by spending `value` native coin:
/// wrap when `token` is the wrapped native, swap otherwise.
pub async fn acquire_with_native(
    chain: &ChainHandle,
    router: Address,
    wrapped: Address,
    from: Address,
    token: Address,
    value: U256,
) -> Result<U256> {
    if token == wrapped {
        wrap_native(chain, wrapped, from, value).await?;
        Ok(value)
    } else {
        swap_native_for_token(chain, router, wrapped, from, token, value, from).await
    }
}

/// Pair `amount_a` of `token_a` with `amount_b` of `token_b` held by `from`
/// and mint the LP tokens to `to`.
#[allow(clippy::too_many_arguments)]
pub async fn add_liquidity(
    chain: &ChainHandle,
    router: Address,
    from: Address,
    token_a: Address,
    token_b: Address,
    amount_a: U256,
    amount_b: U256,
    to: Address,
) -> Result<()> {
    approve(chain, token_a, from, router, amount_a).await?;
    approve(chain, token_b, from, router, amount_b).await?;
    let deadline = U256::from(chain.latest_timestamp().await? + SWAP_DEADLINE_SECS);

    let pending = IUniswapV2Router02::new(router, &chain.provider)
        .addLiquidity(token_a, token_b, amount_a, amount_b, U256::ZERO, U256::ZERO, to, deadline)
        .from(from)
        .gas_price(OVERRIDE_GAS_PRICE)
        .send()
        .await
        .context("sending addLiquidity")?;
    evm::confirm(pending, "add liquidity").await?;
    info!(
        token_a = %token_a,
        token_b = %token_b,
        to = %to,
        "liquidity added"
    );
    Ok(())
}
