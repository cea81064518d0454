use alloy::primitives::Address;
use alloy::providers::Provider;
use anyhow::{Context, Result};

use super::ChainHandle;
use crate::error::HarnessError;

/// The node's pre-funded dev accounts, by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signers {
    /// Sends every adapter step through the `TestDeFiAdapter`.
    pub admin: Address,
    pub owner: Address,
    /// Deploys the harness contracts.
    pub deployer: Address,
    pub alice: Address,
    pub bob: Address,
    pub charlie: Address,
    pub dave: Address,
    pub eve: Address,
}

impl Signers {
    /// Assign roles to accounts 0..7 in order.
    pub fn from_accounts(accounts: &[Address]) -> Result<Self, HarnessError> {
        if accounts.len() < 8 {
            return Err(HarnessError::Config(format!(
                "node exposes {} unlocked accounts, need 8",
                accounts.len()
            )));
        }
        Ok(Signers {
            admin: accounts[0],
            owner: accounts[1],
            deployer: accounts[2],
            alice: accounts[3],
            bob: accounts[4],
            charlie: accounts[5],
            dave: accounts[6],
            eve: accounts[7],
        })
    }

    pub async fn load(chain: &ChainHandle) -> Result<Self> {
        let accounts = chain.provider.get_accounts().await.context("eth_accounts")?;
        Ok(Self::from_accounts(&accounts)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles_follow_account_order() {
        let accounts: Vec<Address> = (1..=10u8).map(Address::repeat_byte).collect();
        let s = Signers::from_accounts(&accounts).unwrap();
        assert_eq!(s.admin, Address::repeat_byte(1));
        assert_eq!(s.deployer, Address::repeat_byte(3));
        assert_eq!(s.eve, Address::repeat_byte(8));
    }

    #[test]
    fn test_too_few_accounts() {
        let accounts = vec![Address::repeat_byte(1); 3];
        assert!(matches!(
            Signers::from_accounts(&accounts),
            Err(HarnessError::Config(_))
        ));
    }
}
