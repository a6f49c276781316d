//! JUnit XML for CI systems

use junit_report::{Duration, Report, TestCase, TestSuite};
use std::fs::File;
use std::path::Path;
use time::OffsetDateTime;

use super::case::{CaseOutcome, CaseRecord};
use crate::errors::{HarnessError, Result};

pub fn write_junit(suite_name: &str, cases: &[CaseRecord], path: &Path) -> Result<()> {
    let mut suite = TestSuite::new(suite_name);
    suite.set_timestamp(OffsetDateTime::now_utc());

    let classname = sanitize_classname(suite_name);
    for case in cases {
        suite.add_testcase(build_test_case(case, &classname));
    }

    let mut report = Report::new();
    report.add_testsuite(suite);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    report
        .write_xml(file)
        .map_err(|e| HarnessError::Report(format!("Failed to write JUnit XML: {}", e)))?;

    Ok(())
}

fn build_test_case(case: &CaseRecord, classname: &str) -> TestCase {
    let duration = Duration::new(
        case.duration.as_secs() as i64,
        case.duration.subsec_nanos() as i32,
    );

    let mut tc = match &case.outcome {
        CaseOutcome::Passed => TestCase::success(&case.id, duration),
        CaseOutcome::Failed { message } => {
            TestCase::failure(&case.id, duration, "AssertionFailure", message)
        }
        CaseOutcome::Broken { message } => {
            TestCase::error(&case.id, duration, "ExecutionError", message)
        }
        CaseOutcome::Skipped => TestCase::skipped(&case.id),
    };
    tc.set_classname(classname);
    tc
}

fn sanitize_classname(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '_' || c == '.' { c } else { '_' })
        .collect()
}
