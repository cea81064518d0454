
use adapter_harness::protocols::{Protocol, convex, run_suite};
use adapter_harness::report::PoolOutcome;

use fork_common::*;

#[tokio::test]
#[ignore] // Requires Anvil + MAIN_RPC_URL + compiled artifacts
async fn test_convex_suite() {
    let Some(ctx) = suite(Protocol::Convex, &[]).await else {
        return;
    };
    let report = run_suite(&ctx).await.expect("suite setup");

    for skipped in &report.skipped {
        assert!(convex::SKIPLIST.contains(&skipped.pool.as_str()));
    }
    assert_all_passed(&report);

    // every pool runs twice: the full lifecycle, then the quick exit
    assert_eq!(report.pools.len() % 2, 0);
    assert!(report.pools.iter().any(|p| p.pool.ends_with("(quick exit)")));
}

#[tokio::test]
#[ignore] // Requires Anvil + MAIN_RPC_URL + compiled artifacts
async fn test_convex_3pool_values() {
    let Some(ctx) = suite(Protocol::Convex, &["3pool"]).await else {
        return;
    };
    let report = run_suite(&ctx).await.expect("suite setup");
    let lifecycle = report
        .pools
        .iter()
        .find(|p| p.pool == "3pool")
        .expect("3pool lifecycle ran");

    assert!(matches!(lifecycle.outcome, PoolOutcome::Passed));
    assert!(check(lifecycle, "before", "pool value before deposit").passed);
    assert!(check(lifecycle, "deposit", "pool value").passed);
    assert!(check(lifecycle, "stake", "amount in token (staked)").passed);
    assert!(check(lifecycle, "withdraw", "staked balance after exit").passed);
}
