use std::path::Path;

use adapter_harness::deploy::ArtifactStore;
use adapter_harness::error::HarnessError;
use adapter_harness::model::pool::{self, load_fixture, parse_fixture};
use adapter_harness::model::{BeefyVaultItem, PoolItem, StakingPoolItem};
use adapter_harness::protocols::{Protocol, convex};

// ── Bundled fixtures ─────────────────────────────────────────────────

#[test]
fn test_bundled_ethereum_fixtures_load() {
    for protocol in [Protocol::Convex, Protocol::Harvest, Protocol::Lido] {
        let pools = load_fixture::<PoolItem>(&protocol.default_pools())
            .unwrap_or_else(|e| panic!("{protocol}: {e}"));
        assert!(!pools.is_empty(), "{protocol} fixture is empty");
        assert_eq!(protocol.network().name, "main");
    }
}

#[test]
fn test_bundled_beefy_fixtures_load() {
    let vaults = load_fixture::<BeefyVaultItem>(&Protocol::Beefy.default_pools()).unwrap();
    assert!(vaults.values().all(BeefyVaultItem::is_single_asset));

    let staking_path = Protocol::Beefy.default_staking_pools().expect("beefy has staking pools");
    let staking = load_fixture::<StakingPoolItem>(&staking_path).unwrap();
    assert!(staking.values().all(|p| !p.reward_tokens.is_empty()));
    assert_eq!(Protocol::Beefy.network().name, "matic");
}

#[test]
fn test_harvest_pools_stake_for_farm() {
    let pools = load_fixture::<PoolItem>(&Protocol::Harvest.default_pools()).unwrap();
    let dai = &pools["dai"];
    assert_eq!(dai.pool, dai.lp_token);
    assert!(dai.staking_pool.is_some());
    assert_eq!(dai.reward_tokens.len(), 1);
}

#[test]
fn test_lido_pool_names_its_swap() {
    let pools = load_fixture::<PoolItem>(&Protocol::Lido.default_pools()).unwrap();
    assert!(pools.values().all(|p| p.swap.is_some() && p.staking_pool.is_none()));
}

// ── Validation ───────────────────────────────────────────────────────

const DAI: &str = "0x6B175474E89094C44Da98b954EedeAC495271d0F";
const VAULT: &str = "0xab7FA2B2985BCcfC13c6D86b1D5A17486ab1e04C";

#[test]
fn test_empty_tokens_rejected() {
    let json = format!(r#"{{"dai": {{"pool": "{VAULT}", "lpToken": "{VAULT}", "tokens": []}}}}"#);
    let err = parse_fixture::<PoolItem>("inline", &json).unwrap_err();
    assert!(matches!(err, HarnessError::Fixture { .. }));
    assert!(err.to_string().contains("`dai`"));
}

#[test]
fn test_staking_without_reward_rejected() {
    let json = format!(
        r#"{{"dai": {{"pool": "{VAULT}", "lpToken": "{VAULT}", "stakingPool": "{VAULT}", "tokens": ["{DAI}"]}}}}"#
    );
    let err = parse_fixture::<PoolItem>("inline", &json).unwrap_err();
    assert!(err.to_string().contains("rewardTokens"));
}

#[test]
fn test_bad_address_rejected() {
    let json = r#"{"dai": {"pool": "0x1234", "lpToken": "0x1234", "tokens": []}}"#;
    assert!(parse_fixture::<PoolItem>("inline", json).is_err());
}

#[test]
fn test_missing_file_is_fixture_error() {
    let err = load_fixture::<PoolItem>(Path::new("fixtures/nope.json")).unwrap_err();
    assert!(matches!(err, HarnessError::Fixture { .. }));
}

#[test]
fn test_whale_lp_field_name() {
    let json = format!(
        r#"{{"lp": {{"wantToken": "{DAI}", "beefyVault": "{VAULT}", "platform": "QuickSwap", "whaleLP": "{DAI}"}}}}"#
    );
    let vaults = parse_fixture::<BeefyVaultItem>("inline", &json).unwrap();
    assert!(vaults["lp"].whale_lp.is_some());
    assert!(!vaults["lp"].is_single_asset());
}

// ── Selection ────────────────────────────────────────────────────────

#[test]
fn test_convex_skiplist_is_reported() {
    let pools = load_fixture::<PoolItem>(&Protocol::Convex.default_pools()).unwrap();
    let skip: Vec<(String, String)> = convex::SKIPLIST
        .iter()
        .map(|n| (n.to_string(), "known unsupported".to_string()))
        .collect();
    let (kept, skipped) = pool::select(&pools, &skip, &[]);

    assert!(kept.iter().all(|(name, _)| !convex::SKIPLIST.contains(&name.as_str())));
    assert!(kept.iter().any(|(name, _)| name == "3pool"));
    assert!(skipped.iter().any(|(name, reason)| name == "steth" && reason == "known unsupported"));
}

#[test]
fn test_only_filter_runs_named_pools() {
    let pools = load_fixture::<PoolItem>(&Protocol::Harvest.default_pools()).unwrap();
    let (kept, skipped) = pool::select(&pools, &[], &["usdt".to_string()]);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].0, "usdt");
    assert!(skipped.is_empty());
}

#[test]
fn test_selection_is_ordered_by_name() {
    let pools = load_fixture::<PoolItem>(&Protocol::Harvest.default_pools()).unwrap();
    let (kept, _) = pool::select(&pools, &[], &[]);
    let names: Vec<&str> = kept.iter().map(|(n, _)| n.as_str()).collect();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
}

#[test]
fn test_unknown_only_name_is_config_error() {
    let pools = load_fixture::<PoolItem>(&Protocol::Harvest.default_pools()).unwrap();
    let err = pool::check_requested(pools.keys(), &[], &["dia".to_string()]).unwrap_err();
    assert!(matches!(err, HarnessError::Config(_)));
    assert!(err.to_string().contains("--only"));
    assert!(err.to_string().contains("dia"));
}

#[test]
fn test_unknown_skip_name_is_config_error() {
    let pools = load_fixture::<PoolItem>(&Protocol::Harvest.default_pools()).unwrap();
    let err = pool::check_requested(pools.keys(), &["usdc".to_string()], &["dai".to_string()]).unwrap_err();
    assert!(matches!(&err, HarnessError::Config(msg) if msg.contains("--skip") && msg.contains("usdc")));
}

#[test]
fn test_known_names_pass_across_fixtures() {
    let vaults = load_fixture::<BeefyVaultItem>(&Protocol::Beefy.default_pools()).unwrap();
    let staking_path = Protocol::Beefy.default_staking_pools().unwrap();
    let staking = load_fixture::<StakingPoolItem>(&staking_path).unwrap();
    let only = vec!["bifi-gov".to_string()];
    assert!(pool::check_requested(vaults.keys(), &[], &only).is_err());
    assert!(pool::check_requested(vaults.keys().chain(staking.keys()), &[], &only).is_ok());
}

#[test]
fn test_empty_selection_is_config_error() {
    let pools = load_fixture::<PoolItem>(&Protocol::Convex.default_pools()).unwrap();
    let skip: Vec<(String, String)> = convex::SKIPLIST
        .iter()
        .map(|n| (n.to_string(), "known unsupported".to_string()))
        .collect();
    let only = vec!["steth".to_string()];
    pool::check_requested(pools.keys(), &[], &only).unwrap();

    let (kept, skipped) = pool::select(&pools, &skip, &only);
    assert!(kept.is_empty());
    let err = pool::ensure_selected(kept.len(), skipped.len()).unwrap_err();
    assert!(matches!(err, HarnessError::Config(_)));
    assert!(err.to_string().contains("1 skipped"));
    assert!(pool::ensure_selected(1, 0).is_ok());
}

// ── Artifacts ────────────────────────────────────────────────────────

#[test]
fn test_artifact_store_finds_nested_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("contracts/TestDeFiAdapter.sol");
    std::fs::create_dir_all(&nested).unwrap();
    std::fs::write(nested.join("TestDeFiAdapter.json"), r#"{"bytecode": "0x6080"}"#).unwrap();
    std::fs::write(
        dir.path().join("HarvestFinanceAdapter.json"),
        r#"{"bytecode": {"object": "0x60806040"}}"#,
    )
    .unwrap();

    let store = ArtifactStore::new(dir.path());
    assert_eq!(store.bytecode("TestDeFiAdapter").unwrap().len(), 2);
    assert_eq!(store.bytecode("HarvestFinanceAdapter").unwrap().len(), 4);
    assert!(store.require(Protocol::Harvest.artifacts()).is_ok());

    let err = store.require(Protocol::Lido.artifacts()).unwrap_err();
    assert!(matches!(err, HarnessError::Artifact { name, .. } if name == "LidoEthGateway"));
}
