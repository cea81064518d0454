use alloy::sol;

// ── Tokens ───────────────────────────────────────────────────────────

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract IERC20 {
        function transfer(address to, uint256 amount) external returns (bool);
        function approve(address spender, uint256 amount) external returns (bool);
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function decimals() external view returns (uint8);
        function symbol() external view returns (string);
    }
}

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract IWETH {
        function deposit() external payable;
        function balanceOf(address account) external view returns (uint256);
    }
}

// ── DEX ──────────────────────────────────────────────────────────────

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract IUniswapV2Router02 {
        function WETH() external pure returns (address);
        function getAmountsOut(uint256 amountIn, address[] calldata path) external view returns (uint256[] memory amounts);
        function swapExactETHForTokens(uint256 amountOutMin, address[] calldata path, address to, uint256 deadline)
            external payable returns (uint256[] memory amounts);
        function addLiquidity(
            address tokenA,
            address tokenB,
            uint256 amountADesired,
            uint256 amountBDesired,
            uint256 amountAMin,
            uint256 amountBMin,
            address to,
            uint256 deadline
        ) external returns (uint256 amountA, uint256 amountB, uint256 liquidity);
    }
}

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract IUniswapV2Pair {
        function token0() external view returns (address);
        function token1() external view returns (address);
        function balanceOf(address account) external view returns (uint256);
        function transfer(address to, uint256 amount) external returns (bool);
        function symbol() external view returns (string);
    }
}

// ── Protocols ────────────────────────────────────────────────────────

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract IConvexStake {
        function balanceOf(address account) external view returns (uint256);
        function earned(address account) external view returns (uint256);
    }
}

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract IHarvestDeposit {
        function decimals() external view returns (uint8);
        function balanceOf(address account) external view returns (uint256);
        function getPricePerFullShare() external view returns (uint256);
        function governance() external view returns (address);
        function controller() external view returns (address);
    }

    #[allow(missing_docs)]
    #[sol(rpc)]
    contract IHarvestFarm {
        function balanceOf(address account) external view returns (uint256);
        function earned(address account) external view returns (uint256);
    }

    #[allow(missing_docs)]
    #[sol(rpc)]
    contract IHarvestController {
        function addToWhitelist(address target) external;
        function addCodeToWhitelist(address target) external;
    }
}

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract IBeefyDeposit {
        function decimals() external view returns (uint8);
        function balanceOf(address account) external view returns (uint256);
        function getPricePerFullShare() external view returns (uint256);
    }

    #[allow(missing_docs)]
    #[sol(rpc)]
    contract IBeefyFarm {
        function balanceOf(address account) external view returns (uint256);
        function earned(address account) external view returns (uint256);
    }
}

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract ILidoDeposit {
        function getTotalPooledEther() external view returns (uint256);
        function getTotalShares() external view returns (uint256);
        function sharesOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
    }
}

// ── Harness contracts ────────────────────────────────────────────────

sol! {
    /// Pass-through caller that holds balances and invokes an adapter's
    /// codes on its own behalf.
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract TestDeFiAdapter {
        function testGetDepositAllCodes(address underlyingToken, address liquidityPool, address adapter) external;
        function testGetStakeAllCodes(address liquidityPool, address underlyingToken, address adapter) external;
        function testClaimRewardTokenCode(address liquidityPool, address adapter) external;
        function testGetHarvestAllCodes(address liquidityPool, address underlyingToken, address adapter) external;
        function testGetUnstakeAllCodes(address liquidityPool, address adapter) external;
        function testGetWithdrawAllCodes(address underlyingToken, address liquidityPool, address adapter) external;
        function testGetUnstakeAndWithdrawAllCodes(address liquidityPool, address underlyingToken, address adapter) external;
        function getERC20TokenBalance(address token, address account) external view returns (uint256);
    }
}

sol! {
    /// Method surface shared by every adapter under test.
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract IAdapter {
        function getLiquidityPoolTokenBalance(address vault, address underlyingToken, address liquidityPool) external view returns (uint256);
        function getLiquidityPoolTokenBalanceStake(address vault, address liquidityPool) external view returns (uint256);
        function getAllAmountInToken(address vault, address underlyingToken, address liquidityPool) external view returns (uint256);
        function getAllAmountInTokenStake(address vault, address underlyingToken, address liquidityPool) external view returns (uint256);
        function getUnderlyingTokens(address liquidityPool, address lpToken) external view returns (address[] memory);
        function getLiquidityPoolToken(address underlyingToken, address liquidityPool) external view returns (address);
        function getRewardToken(address liquidityPool) external view returns (address);
        function getUnclaimedRewardTokenAmount(address vault, address liquidityPool, address underlyingToken) external view returns (uint256);
        function getPoolValue(address liquidityPool, address underlyingToken) external view returns (uint256);
        function calculateAmountInLPToken(address underlyingToken, address liquidityPool, uint256 depositAmount) external view returns (uint256);
        function calculateRedeemableLPTokenAmount(address vault, address underlyingToken, address liquidityPool, uint256 redeemAmount) external view returns (uint256);
        function calculateRedeemableLPTokenAmountStake(address vault, address underlyingToken, address liquidityPool, uint256 redeemAmount) external view returns (uint256);
        function isRedeemableAmountSufficient(address vault, address underlyingToken, address liquidityPool, uint256 redeemAmount) external view returns (bool);
        function isRedeemableAmountSufficientStake(address vault, address underlyingToken, address liquidityPool, uint256 redeemAmount) external view returns (bool);
        function canStake(address liquidityPool) external view returns (bool);
        function getSwapTokenAmounts(address rewardToken, address liquidityPool, uint256 amount) external view returns (uint256[] memory);
        function setPoolCoinData(address liquidityPool) external;
    }
}
