pub mod caller;

use alloy::primitives::U256;
use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::report::{PoolOutcome, PoolReport, StepRecord, StepStatus};
use crate::verify::{Check, first_failure};

pub use caller::AdapterCaller;

// ── Steps & plans ────────────────────────────────────────────────────

/// One adapter operation, driven through the `TestDeFiAdapter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Deposit,
    Stake,
    ClaimReward,
    /// Swap claimed reward tokens into the underlying token.
    Harvest,
    Unstake,
    Withdraw,
    UnstakeAndWithdraw,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Step::Deposit => "deposit",
            Step::Stake => "stake",
            Step::ClaimReward => "claim",
            Step::Harvest => "harvest",
            Step::Unstake => "unstake",
            Step::Withdraw => "withdraw",
            Step::UnstakeAndWithdraw => "unstake+withdraw",
        };
        f.write_str(name)
    }
}

/// Ordered steps for one pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub steps: Vec<Step>,
}

impl Plan {
    /// deposit → [stake → claim → [harvest] → unstake] → withdraw
    pub fn lifecycle(staking: bool, harvest: bool) -> Self {
        let mut steps = vec![Step::Deposit];
        if staking {
            steps.push(Step::Stake);
            steps.push(Step::ClaimReward);
            if harvest {
                steps.push(Step::Harvest);
            }
            steps.push(Step::Unstake);
        }
        steps.push(Step::Withdraw);
        Plan { steps }
    }

    /// deposit → stake → unstake-and-withdraw in one call
    pub fn quick_exit() -> Self {
        Plan {
            steps: vec![Step::Deposit, Step::Stake, Step::UnstakeAndWithdraw],
        }
    }
}

// ── Pool flow ────────────────────────────────────────────────────────

/// One pool's test case against one adapter.
///
/// Implementations execute the transaction for a step and then recompute,
/// independently of the adapter, what every reported value should be.
#[async_trait]
pub trait PoolFlow: Send {
    /// Name shown in reports.
    fn name(&self) -> &str;

    fn plan(&self) -> Plan;

    /// Checks made before the first step.
    async fn before(&mut self) -> Result<Vec<Check>> {
        Ok(Vec::new())
    }

    /// Send the step's transaction and wait for it to be mined.
    async fn execute(&mut self, step: Step) -> Result<()>;

    /// Reward tokens currently held by the caller. Gates the harvest step.
    async fn reward_balance(&self) -> Result<U256>;

    /// Checks made after `step` was mined.
    async fn verify(&mut self, step: Step) -> Result<Vec<Check>>;

    /// Checks made after the last step.
    async fn after(&mut self) -> Result<Vec<Check>> {
        Ok(Vec::new())
    }
}

/// Drive one pool through its plan, strictly in order.
///
/// The first failed check or failed call ends the pool's case. Steps after
/// it are not attempted. Chain state is left as it is for the next pool.
pub async fn drive(flow: &mut dyn PoolFlow) -> PoolReport {
    let pool = flow.name().to_string();
    let mut records = Vec::new();
    info!(pool = %pool, "starting sequence");

    let outcome = run_sequence(flow, &mut records).await;
    match &outcome {
        PoolOutcome::Passed => info!(pool = %pool, "sequence passed"),
        PoolOutcome::Mismatch { stage, check } => warn!(pool = %pool, %stage, %check, "mismatch"),
        PoolOutcome::Errored { stage, error } => warn!(pool = %pool, %stage, %error, "step failed"),
    }

    PoolReport {
        pool,
        records,
        outcome,
    }
}

async fn run_sequence(flow: &mut dyn PoolFlow, records: &mut Vec<StepRecord>) -> PoolOutcome {
    // ── Pre-sequence checks ──
    match flow.before().await {
        Ok(checks) => {
            if let Some(outcome) = record_checks(records, None, "before", checks) {
                return outcome;
            }
        }
        Err(e) => return errored(records, None, "before", e),
    }

    for step in flow.plan().steps {
        let label = step.to_string();

        if step == Step::Harvest {
            match flow.reward_balance().await {
                Ok(balance) if balance.is_zero() => {
                    debug!(%step, "no reward tokens claimed, skipping");
                    records.push(StepRecord {
                        step: Some(step),
                        label,
                        status: StepStatus::Skipped {
                            reason: "no reward tokens to harvest".into(),
                        },
                        checks: Vec::new(),
                    });
                    continue;
                }
                Ok(_) => {}
                Err(e) => return errored(records, Some(step), &label, e),
            }
        }

        debug!(%step, "executing");
        if let Err(e) = flow.execute(step).await {
            return errored(records, Some(step), &label, e);
        }

        match flow.verify(step).await {
            Ok(checks) => {
                for check in &checks {
                    debug!(%step, "{check}");
                }
                if let Some(outcome) = record_checks(records, Some(step), &label, checks) {
                    return outcome;
                }
            }
            Err(e) => return errored(records, Some(step), &label, e),
        }
    }

    // ── Post-sequence checks ──
    match flow.after().await {
        Ok(checks) => {
            if let Some(outcome) = record_checks(records, None, "after", checks) {
                return outcome;
            }
        }
        Err(e) => return errored(records, None, "after", e),
    }

    PoolOutcome::Passed
}

/// Record a batch of checks. Returns the mismatch outcome if any failed.
fn record_checks(
    records: &mut Vec<StepRecord>,
    step: Option<Step>,
    label: &str,
    checks: Vec<Check>,
) -> Option<PoolOutcome> {
    let failure = first_failure(&checks).map(|c| c.to_string());
    let status = match &failure {
        Some(check) => StepStatus::Failed {
            reason: check.clone(),
        },
        None => StepStatus::Executed,
    };
    records.push(StepRecord {
        step,
        label: label.to_string(),
        status,
        checks,
    });
    failure.map(|check| PoolOutcome::Mismatch {
        stage: label.to_string(),
        check,
    })
}

fn errored(
    records: &mut Vec<StepRecord>,
    step: Option<Step>,
    label: &str,
    error: anyhow::Error,
) -> PoolOutcome {
    let error = format!("{error:#}");
    records.push(StepRecord {
        step,
        label: label.to_string(),
        status: StepStatus::Failed {
            reason: error.clone(),
        },
        checks: Vec::new(),
    });
    PoolOutcome::Errored {
        stage: label.to_string(),
        error,
    }
}
