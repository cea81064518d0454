use alloy::primitives::{Address, U256};
use serde::Serialize;

use crate::oracle::ignore_rounding_error;

/// How an actual value is compared against what the oracle expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Exact,
    /// Equal after dropping the last two decimal digits of both sides.
    IgnoringRounding,
    NonZero,
    Zero,
    /// Left-over dust up to a named ceiling.
    AtMost,
    GreaterThan,
    True,
    False,
    SameAddress,
}

/// One actual-vs-expected comparison.
#[derive(Debug, Clone, Serialize)]
pub struct Check {
    pub label: String,
    pub actual: String,
    pub expected: String,
    pub mode: Mode,
    pub passed: bool,
}

impl Check {
    pub fn eq(label: impl Into<String>, actual: U256, expected: U256) -> Self {
        Check {
            label: label.into(),
            actual: actual.to_string(),
            expected: expected.to_string(),
            mode: Mode::Exact,
            passed: actual == expected,
        }
    }

    pub fn eq_ignoring_rounding(label: impl Into<String>, actual: U256, expected: U256) -> Self {
        Check {
            label: label.into(),
            actual: actual.to_string(),
            expected: expected.to_string(),
            mode: Mode::IgnoringRounding,
            passed: ignore_rounding_error(actual) == ignore_rounding_error(expected),
        }
    }

    pub fn nonzero(label: impl Into<String>, actual: U256) -> Self {
        Check {
            label: label.into(),
            actual: actual.to_string(),
            expected: "> 0".into(),
            mode: Mode::NonZero,
            passed: !actual.is_zero(),
        }
    }

    pub fn zero(label: impl Into<String>, actual: U256) -> Self {
        Check {
            label: label.into(),
            actual: actual.to_string(),
            expected: "0".into(),
            mode: Mode::Zero,
            passed: actual.is_zero(),
        }
    }

    pub fn at_most(label: impl Into<String>, actual: U256, ceiling: U256) -> Self {
        Check {
            label: label.into(),
            actual: actual.to_string(),
            expected: format!("<= {ceiling}"),
            mode: Mode::AtMost,
            passed: actual <= ceiling,
        }
    }

    pub fn gt(label: impl Into<String>, actual: U256, floor: U256) -> Self {
        Check {
            label: label.into(),
            actual: actual.to_string(),
            expected: format!("> {floor}"),
            mode: Mode::GreaterThan,
            passed: actual > floor,
        }
    }

    pub fn is_true(label: impl Into<String>, actual: bool) -> Self {
        Check {
            label: label.into(),
            actual: actual.to_string(),
            expected: "true".into(),
            mode: Mode::True,
            passed: actual,
        }
    }

    pub fn is_false(label: impl Into<String>, actual: bool) -> Self {
        Check {
            label: label.into(),
            actual: actual.to_string(),
            expected: "false".into(),
            mode: Mode::False,
            passed: !actual,
        }
    }

    /// Addresses compare by value, so checksum casing never matters.
    pub fn same_address(label: impl Into<String>, actual: Address, expected: Address) -> Self {
        Check {
            label: label.into(),
            actual: actual.to_string(),
            expected: expected.to_string(),
            mode: Mode::SameAddress,
            passed: actual == expected,
        }
    }
}

impl std::fmt::Display for Check {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mark = if self.passed { "ok" } else { "MISMATCH" };
        write!(
            f,
            "{mark}: {} (actual {}, expected {}{})",
            self.label,
            self.actual,
            self.expected,
            if self.mode == Mode::IgnoringRounding { ", last 2 digits ignored" } else { "" },
        )
    }
}

/// First failed check, if any.
pub fn first_failure(checks: &[Check]) -> Option<&Check> {
    checks.iter().find(|c| !c.passed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_and_rounding_modes() {
        let a = U256::from(1_000_050u64);
        let b = U256::from(1_000_099u64);
        assert!(!Check::eq("exact", a, b).passed);
        assert!(Check::eq_ignoring_rounding("rounded", a, b).passed);
        assert!(!Check::eq_ignoring_rounding("rounded", a, U256::from(1_000_100u64)).passed);
    }

    #[test]
    fn test_display_marks_mismatch() {
        let c = Check::gt("underlying after harvest", U256::ZERO, U256::ZERO);
        assert!(!c.passed);
        assert!(c.to_string().starts_with("MISMATCH: underlying after harvest"));
        let checks = vec![Check::zero("staked", U256::ZERO), c];
        assert_eq!(first_failure(&checks).unwrap().label, "underlying after harvest");
    }

    #[test]
    fn test_at_most_allows_dust() {
        let ceiling = U256::from(2u8);
        assert!(Check::at_most("lp balance after exit", U256::ZERO, ceiling).passed);
        assert!(Check::at_most("lp balance after exit", ceiling, ceiling).passed);
        let over = Check::at_most("lp balance after exit", U256::from(3u8), ceiling);
        assert!(!over.passed);
        assert_eq!(over.expected, "<= 2");
    }

    #[test]
    fn test_bool_and_address_modes() {
        assert!(Check::is_true("canStake", true).passed);
        assert!(Check::is_false("canStake", false).passed);
        let addr = Address::repeat_byte(0x11);
        assert!(Check::same_address("reward token", addr, addr).passed);
        assert!(!Check::same_address("reward token", addr, Address::ZERO).passed);
    }
}
