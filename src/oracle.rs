//! Independent recomputation of the values an adapter is expected to report.
//!
//! Every formula here works from the protocol's own mechanics (share price,
//! pooled ether, router quotes), never from the adapter's results.

use alloy::primitives::U256;
use anyhow::{Context, Result, bail};

/// `10^decimals` as a U256.
pub fn pow10(decimals: u8) -> Result<U256> {
    U256::from(10u8)
        .checked_pow(U256::from(decimals))
        .with_context(|| format!("10^{decimals} overflows"))
}

/// `n` whole tokens in base units.
pub fn whole_units(n: u64, decimals: u8) -> Result<U256> {
    U256::from(n)
        .checked_mul(pow10(decimals)?)
        .with_context(|| format!("{n} tokens at {decimals} decimals overflows"))
}

/// Underlying amount redeemable for `lp` shares of a price-per-full-share
/// vault (Harvest, Beefy): `lp × ppfs / 10^decimals`.
pub fn share_price_amount(lp: U256, price_per_full_share: U256, decimals: u8) -> Result<U256> {
    let product = lp
        .checked_mul(price_per_full_share)
        .context("lp × pricePerFullShare overflows")?;
    Ok(product / pow10(decimals)?)
}

/// Ether value of `shares` of a rebasing token (Lido):
/// `shares × totalPooledEther / totalShares`.
pub fn rebased_amount(shares: U256, total_pooled_ether: U256, total_shares: U256) -> Result<U256> {
    if total_shares.is_zero() {
        bail!("rebasing token reports zero total shares");
    }
    let product = shares
        .checked_mul(total_pooled_ether)
        .context("shares × totalPooledEther overflows")?;
    Ok(product / total_shares)
}

/// Drop the last two decimal digits. The adapter and the oracle divide in
/// different orders, so rebasing values can differ in those digits.
pub fn ignore_rounding_error(value: U256) -> U256 {
    value / U256::from(100u8)
}

/// Output amount of a router `getAmountsOut` quote (the last hop).
pub fn swap_output(amounts_out: &[U256]) -> Result<U256> {
    amounts_out
        .last()
        .copied()
        .context("router returned an empty amounts path")
}

/// Total underlying for a staked share-vault position whose pending reward
/// would be swapped back into the underlying token.
pub fn harvest_stake_value(
    staked: U256,
    price_per_full_share: U256,
    decimals: u8,
    reward_in_token: U256,
) -> Result<U256> {
    share_price_amount(staked, price_per_full_share, decimals)?
        .checked_add(reward_in_token)
        .context("staked value + reward overflows")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u(v: u128) -> U256 {
        U256::from(v)
    }

    #[test]
    fn test_share_price_amount() {
        // 10 fDAI at a share price of 1.05 → 10.5 DAI
        let lp = u(10_000_000_000_000_000_000);
        let ppfs = u(1_050_000_000_000_000_000);
        assert_eq!(
            share_price_amount(lp, ppfs, 18).unwrap(),
            u(10_500_000_000_000_000_000)
        );

        // 6-decimal vault truncates toward zero
        assert_eq!(share_price_amount(u(3), u(1_333_333), 6).unwrap(), u(3));
        assert_eq!(share_price_amount(U256::ZERO, ppfs, 18).unwrap(), U256::ZERO);
    }

    #[test]
    fn test_share_price_overflow_is_an_error() {
        assert!(share_price_amount(U256::MAX, u(2), 18).is_err());
    }

    #[test]
    fn test_rebased_amount() {
        // 100 shares, pool holds 110 ether over 100 shares → 110
        assert_eq!(rebased_amount(u(100), u(110), u(100)).unwrap(), u(110));
        // integer division truncates
        assert_eq!(rebased_amount(u(10), u(7), u(3)).unwrap(), u(23));
        assert!(rebased_amount(u(1), u(1), U256::ZERO).is_err());
    }

    #[test]
    fn test_ignore_rounding_error() {
        assert_eq!(ignore_rounding_error(u(123_456)), u(1_234));
        assert_eq!(ignore_rounding_error(u(99)), U256::ZERO);
        // values differing only in the last two digits compare equal
        assert_eq!(
            ignore_rounding_error(u(9_999_999_999_999_999_901)),
            ignore_rounding_error(u(9_999_999_999_999_999_999))
        );
        assert_ne!(ignore_rounding_error(u(1_000)), ignore_rounding_error(u(1_100)));
    }

    #[test]
    fn test_swap_output() {
        assert_eq!(swap_output(&[u(5), u(7), u(11)]).unwrap(), u(11));
        assert!(swap_output(&[]).is_err());
    }

    #[test]
    fn test_harvest_stake_value() {
        let v = harvest_stake_value(u(2_000), u(1_500_000), 6, u(25)).unwrap();
        assert_eq!(v, u(3_025));
    }

    #[test]
    fn test_whole_units() {
        assert_eq!(whole_units(10, 6).unwrap(), u(10_000_000));
        assert_eq!(whole_units(10_000, 18).unwrap(), u(10_000) * pow10(18).unwrap());
        assert!(whole_units(1, 80).is_err());
    }
}
