use alloy::primitives::U256;
use anyhow::{Result, anyhow};
use async_trait::async_trait;

use adapter_harness::driver::{Plan, PoolFlow, Step, drive};
use adapter_harness::report::{PoolOutcome, StepStatus};
use adapter_harness::verify::Check;

// ── Mock flow ────────────────────────────────────────────────────────

/// Scripted flow: records every call and fails wherever it is told to.
struct MockFlow {
    plan: Plan,
    reward: U256,
    mismatch_at: Option<Step>,
    execute_error_at: Option<Step>,
    after_checks: Vec<Check>,
    calls: Vec<String>,
}

impl MockFlow {
    fn new(plan: Plan) -> Self {
        MockFlow {
            plan,
            reward: U256::from(5),
            mismatch_at: None,
            execute_error_at: None,
            after_checks: Vec::new(),
            calls: Vec::new(),
        }
    }

    fn executed(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| c.strip_prefix("execute "))
            .collect()
    }
}

#[async_trait]
impl PoolFlow for MockFlow {
    fn name(&self) -> &str {
        "mock"
    }

    fn plan(&self) -> Plan {
        self.plan.clone()
    }

    async fn before(&mut self) -> Result<Vec<Check>> {
        self.calls.push("before".into());
        Ok(vec![Check::nonzero("pool value", U256::from(1))])
    }

    async fn execute(&mut self, step: Step) -> Result<()> {
        self.calls.push(format!("execute {step}"));
        if self.execute_error_at == Some(step) {
            return Err(anyhow!("execution reverted"));
        }
        Ok(())
    }

    async fn reward_balance(&self) -> Result<U256> {
        Ok(self.reward)
    }

    async fn verify(&mut self, step: Step) -> Result<Vec<Check>> {
        self.calls.push(format!("verify {step}"));
        let expected = if self.mismatch_at == Some(step) { 2 } else { 1 };
        Ok(vec![Check::eq("lp balance", U256::from(1), U256::from(expected))])
    }

    async fn after(&mut self) -> Result<Vec<Check>> {
        self.calls.push("after".into());
        Ok(self.after_checks.clone())
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_full_lifecycle_runs_in_order() {
    let mut flow = MockFlow::new(Plan::lifecycle(true, true));
    let report = drive(&mut flow).await;

    assert!(report.passed());
    assert_eq!(
        flow.executed(),
        vec!["deposit", "stake", "claim", "harvest", "unstake", "withdraw"]
    );
    assert_eq!(flow.calls.first().map(String::as_str), Some("before"));
    assert_eq!(flow.calls.last().map(String::as_str), Some("after"));

    // before + six steps + after
    assert_eq!(report.records.len(), 8);
    assert_eq!(report.records[0].label, "before");
    assert_eq!(report.records[1].step, Some(Step::Deposit));
    assert_eq!(report.check_count(), 7);
}

#[tokio::test]
async fn test_verify_follows_each_execute() {
    let mut flow = MockFlow::new(Plan::lifecycle(true, false));
    drive(&mut flow).await;

    let steps: Vec<&str> = flow.calls[1..flow.calls.len() - 1]
        .iter()
        .map(String::as_str)
        .collect();
    assert_eq!(
        steps,
        vec![
            "execute deposit",
            "verify deposit",
            "execute stake",
            "verify stake",
            "execute claim",
            "verify claim",
            "execute unstake",
            "verify unstake",
            "execute withdraw",
            "verify withdraw",
        ]
    );
}

#[tokio::test]
async fn test_harvest_skipped_without_reward() {
    let mut flow = MockFlow::new(Plan::lifecycle(true, true));
    flow.reward = U256::ZERO;
    let report = drive(&mut flow).await;

    assert!(report.passed());
    assert!(!flow.executed().contains(&"harvest"));
    let harvest = report
        .records
        .iter()
        .find(|r| r.step == Some(Step::Harvest))
        .expect("harvest recorded");
    assert!(matches!(harvest.status, StepStatus::Skipped { .. }));
    assert!(harvest.checks.is_empty());
}

#[tokio::test]
async fn test_pool_without_staking_only_deposits_and_withdraws() {
    let mut flow = MockFlow::new(Plan::lifecycle(false, true));
    let report = drive(&mut flow).await;

    assert!(report.passed());
    assert_eq!(flow.executed(), vec!["deposit", "withdraw"]);
}

#[tokio::test]
async fn test_quick_exit_plan() {
    let mut flow = MockFlow::new(Plan::quick_exit());
    drive(&mut flow).await;
    assert_eq!(flow.executed(), vec!["deposit", "stake", "unstake+withdraw"]);
}

#[tokio::test]
async fn test_mismatch_stops_the_sequence() {
    let mut flow = MockFlow::new(Plan::lifecycle(true, true));
    flow.mismatch_at = Some(Step::Stake);
    let report = drive(&mut flow).await;

    assert!(!report.passed());
    assert_eq!(flow.executed(), vec!["deposit", "stake"]);
    assert!(!flow.calls.contains(&"after".to_string()));
    match &report.outcome {
        PoolOutcome::Mismatch { stage, check } => {
            assert_eq!(stage, "stake");
            assert!(check.contains("lp balance"));
        }
        other => panic!("expected mismatch, got {other:?}"),
    }
    let last = report.records.last().expect("records");
    assert!(matches!(last.status, StepStatus::Failed { .. }));
}

#[tokio::test]
async fn test_step_error_stops_the_sequence() {
    let mut flow = MockFlow::new(Plan::lifecycle(true, true));
    flow.execute_error_at = Some(Step::ClaimReward);
    let report = drive(&mut flow).await;

    assert_eq!(flow.executed(), vec!["deposit", "stake", "claim"]);
    assert!(!flow.calls.contains(&"verify claim".to_string()));
    match &report.outcome {
        PoolOutcome::Errored { stage, error } => {
            assert_eq!(stage, "claim");
            assert!(error.contains("execution reverted"));
        }
        other => panic!("expected error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_failed_after_check_fails_the_pool() {
    let mut flow = MockFlow::new(Plan::lifecycle(false, false));
    flow.after_checks = vec![Check::is_false("redeemable amount + 1 sufficient", true)];
    let report = drive(&mut flow).await;

    assert!(matches!(
        &report.outcome,
        PoolOutcome::Mismatch { stage, .. } if stage == "after"
    ));
    assert_eq!(flow.executed(), vec!["deposit", "withdraw"]);
}
