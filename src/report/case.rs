//! Recorded outcome of one test case

use serde::Serialize;
use std::time::Duration;

use super::allure::AllureStatus;
use crate::errors::HarnessError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CaseOutcome {
    Passed,
    Failed { message: String },
    Broken { message: String },
    Skipped,
}

impl CaseOutcome {
    pub fn from_result<T>(result: &Result<T, HarnessError>) -> Self {
        match result {
            Ok(_) => CaseOutcome::Passed,
            Err(err) if err.is_test_failure() => CaseOutcome::Failed {
                message: err.to_string(),
            },
            Err(err) => CaseOutcome::Broken {
                message: err.to_string(),
            },
        }
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, CaseOutcome::Passed)
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            CaseOutcome::Failed { message } | CaseOutcome::Broken { message } => Some(message),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CaseOutcome::Passed => "passed",
            CaseOutcome::Failed { .. } => "failed",
            CaseOutcome::Broken { .. } => "broken",
            CaseOutcome::Skipped => "skipped",
        }
    }

    pub fn allure_status(&self) -> AllureStatus {
        match self {
            CaseOutcome::Passed => AllureStatus::Passed,
            CaseOutcome::Failed { .. } => AllureStatus::Failed,
            CaseOutcome::Broken { .. } => AllureStatus::Broken,
            CaseOutcome::Skipped => AllureStatus::Skipped,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CaseRecord {
    pub id: String,
    #[serde(serialize_with = "serialize_millis")]
    pub duration: Duration,
    pub outcome: CaseOutcome,
    /// Failure screenshot, relative to the HTML report directory
    pub screenshot: Option<String>,
}

fn serialize_millis<S: serde::Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}

/// Pass/fail totals of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub broken: usize,
    pub skipped: usize,
}

impl RunSummary {
    pub fn from_cases(cases: &[CaseRecord]) -> Self {
        let mut summary = RunSummary {
            total: cases.len(),
            ..Default::default()
        };
        for case in cases {
            match case.outcome {
                CaseOutcome::Passed => summary.passed += 1,
                CaseOutcome::Failed { .. } => summary.failed += 1,
                CaseOutcome::Broken { .. } => summary.broken += 1,
                CaseOutcome::Skipped => summary.skipped += 1,
            }
        }
        summary
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0 && self.broken == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_from_result() {
        let ok: Result<(), HarnessError> = Ok(());
        assert!(CaseOutcome::from_result(&ok).is_passed());

        let failed: Result<(), HarnessError> = Err(HarnessError::Assertion("nope".into()));
        assert_eq!(CaseOutcome::from_result(&failed).label(), "failed");

        let broken: Result<(), HarnessError> = Err(HarnessError::Driver("gone".into()));
        let outcome = CaseOutcome::from_result(&broken);
        assert_eq!(outcome.allure_status(), AllureStatus::Broken);
        assert!(outcome.message().unwrap().contains("gone"));
    }
}
