use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::driver::Step;
use crate::error::HarnessError;
use crate::verify::Check;

/// What happened to one step of a pool's sequence.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepStatus {
    Executed,
    Skipped { reason: String },
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    /// `None` for the checks run before the first and after the last step.
    pub step: Option<Step>,
    pub label: String,
    #[serde(flatten)]
    pub status: StepStatus,
    pub checks: Vec<Check>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum PoolOutcome {
    Passed,
    /// A check disagreed with the oracle.
    Mismatch { stage: String, check: String },
    /// A transaction or call failed before checks could run.
    Errored { stage: String, error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct PoolReport {
    pub pool: String,
    pub records: Vec<StepRecord>,
    pub outcome: PoolOutcome,
}

impl PoolReport {
    pub fn passed(&self) -> bool {
        matches!(self.outcome, PoolOutcome::Passed)
    }

    pub fn check_count(&self) -> usize {
        self.records.iter().map(|r| r.checks.len()).sum()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedPool {
    pub pool: String,
    pub reason: String,
}

/// Everything one protocol suite produced on one fork.
#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    pub protocol: String,
    pub network: String,
    pub fork_block: Option<u64>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub pools: Vec<PoolReport>,
    pub skipped: Vec<SkippedPool>,
}

impl SuiteReport {
    pub fn new(protocol: &str, network: &str, fork_block: Option<u64>) -> Self {
        SuiteReport {
            protocol: protocol.to_string(),
            network: network.to_string(),
            fork_block,
            started_at: Utc::now(),
            finished_at: None,
            pools: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn skip(&mut self, pool: impl Into<String>, reason: impl Into<String>) {
        self.skipped.push(SkippedPool {
            pool: pool.into(),
            reason: reason.into(),
        });
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn failed(&self) -> usize {
        self.pools.iter().filter(|p| !p.passed()).count()
    }

    pub fn all_passed(&self) -> bool {
        self.failed() == 0
    }

    /// The first pool case that did not pass, as an error.
    pub fn first_failure(&self) -> Option<HarnessError> {
        self.pools.iter().find_map(|p| match &p.outcome {
            PoolOutcome::Passed => None,
            PoolOutcome::Mismatch { stage, check } => Some(HarnessError::Mismatch {
                pool: p.pool.clone(),
                stage: stage.clone(),
                check: check.clone(),
            }),
            PoolOutcome::Errored { stage, error } => Some(HarnessError::StepFailed {
                pool: p.pool.clone(),
                stage: stage.clone(),
                reason: error.clone(),
            }),
        })
    }

    /// Print a human-readable summary to stdout.
    pub fn print_summary(&self) {
        println!();
        println!("── {} on {} ──", self.protocol, self.network);
        if let Some(block) = self.fork_block {
            println!("Fork block: {block}");
        }
        for pool in &self.pools {
            let mark = if pool.passed() { "PASS" } else { "FAIL" };
            println!("  [{mark}] {} ({} checks)", pool.pool, pool.check_count());
            match &pool.outcome {
                PoolOutcome::Passed => {}
                PoolOutcome::Mismatch { stage, check } => {
                    println!("         at {stage}: {check}");
                }
                PoolOutcome::Errored { stage, error } => {
                    println!("         at {stage}: {error}");
                }
            }
            for record in &pool.records {
                if let StepStatus::Skipped { reason } = &record.status {
                    println!("         {} skipped: {reason}", record.label);
                }
            }
        }
        for skipped in &self.skipped {
            println!("  [SKIP] {} ({})", skipped.pool, skipped.reason);
        }
        println!(
            "{} passed, {} failed, {} skipped",
            self.pools.len() - self.failed(),
            self.failed(),
            self.skipped.len()
        );
    }

    /// Write the report as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("serializing report")?;
        std::fs::write(path, json)
            .with_context(|| format!("writing report to {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::U256;

    use super::*;

    fn pool(name: &str, outcome: PoolOutcome) -> PoolReport {
        PoolReport {
            pool: name.to_string(),
            records: vec![StepRecord {
                step: Some(Step::Deposit),
                label: "deposit".into(),
                status: StepStatus::Executed,
                checks: vec![Check::eq("lp balance", U256::from(7), U256::from(7))],
            }],
            outcome,
        }
    }

    #[test]
    fn test_failures_are_counted_and_surfaced() {
        let mut report = SuiteReport::new("harvest", "main", Some(13_703_745));
        report.pools.push(pool("dai", PoolOutcome::Passed));
        report.pools.push(pool(
            "usdt",
            PoolOutcome::Errored {
                stage: "stake".into(),
                error: "execution reverted".into(),
            },
        ));
        report.skip("usdc", "skipped on the command line");

        assert_eq!(report.failed(), 1);
        assert!(!report.all_passed());
        let err = report.first_failure().unwrap();
        assert!(matches!(&err, HarnessError::StepFailed { pool, .. } if pool == "usdt"));
        assert!(err.to_string().contains("stake"));
    }

    #[test]
    fn test_save_writes_tagged_json() {
        let mut report = SuiteReport::new("lido", "main", None);
        report.pools.push(pool(
            "eth",
            PoolOutcome::Mismatch {
                stage: "deposit".into(),
                check: "lp balance".into(),
            },
        ));
        report.finish();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        report.save(&path).unwrap();

        let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let eth = &json["pools"][0];
        assert_eq!(eth["outcome"]["result"], "mismatch");
        assert_eq!(eth["records"][0]["status"], "executed");
        assert_eq!(eth["records"][0]["step"], "deposit");
        assert!(json["finished_at"].is_string());
    }
}
