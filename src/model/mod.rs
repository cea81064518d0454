pub mod network;
pub mod pool;

pub use network::NetworkProfile;
pub use pool::{BeefyVaultItem, BeefyVaults, LiquidityPool, PoolItem, StakingPool, StakingPoolItem};
