//! Per-case failure capture and end-of-run report writing

use chrono::Local;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Instant;
use tracing::{info, warn};

use super::allure::{AllureCase, StatusDetails};
use super::case::{CaseOutcome, CaseRecord, RunSummary};
use super::environment::write_environment;
use super::html::write_index;
use super::junit::write_junit;
use super::sink::Reporter;
use crate::config::ReportSettings;
use crate::errors::Result;
use crate::page::{BasePage, BrowserDriver};

pub const JUNIT_FILE: &str = "junit.xml";
pub const INDEX_FILE: &str = "index.html";
pub const SCREENSHOT_DIR: &str = "screenshots";

/// Keep ids usable as file names
pub fn sanitize_id(id: &str) -> String {
    let cleaned: String = id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "case".to_string()
    } else {
        cleaned
    }
}

/// A run of test cases sharing one set of report directories
pub struct TestRun {
    suite: String,
    settings: ReportSettings,
    properties: Vec<(String, String)>,
    cases: Mutex<Vec<CaseRecord>>,
}

impl TestRun {
    pub fn new(suite: impl Into<String>, settings: ReportSettings) -> Self {
        Self {
            suite: suite.into(),
            settings,
            properties: Vec::new(),
            cases: Mutex::new(Vec::new()),
        }
    }

    /// Key/value pairs for `environment.properties` and the HTML header
    pub fn with_properties(mut self, properties: Vec<(String, String)>) -> Self {
        self.properties = properties;
        self
    }

    pub fn settings(&self) -> &ReportSettings {
        &self.settings
    }

    pub fn case(&self, id: &str) -> CaseGuard<'_> {
        let allure = AllureCase::new(&self.settings.allure_result_path, id)
            .with_full_name(format!("{}::{}", self.suite, id));
        CaseGuard {
            run: self,
            id: id.to_string(),
            reporter: Reporter::new(allure),
            started: Instant::now(),
        }
    }

    pub fn cases(&self) -> Vec<CaseRecord> {
        self.cases.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary::from_cases(&self.cases())
    }

    fn record(&self, case: CaseRecord) {
        match self.cases.lock() {
            Ok(mut cases) => cases.push(case),
            Err(_) => warn!(id = %case.id, "Case list poisoned, result dropped"),
        }
    }

    /// Write JUnit XML, `index.html` and `environment.properties`
    pub fn finish(&self) -> Result<RunSummary> {
        let cases = self.cases();
        let html_dir = &self.settings.html_report_path;

        write_junit(&self.suite, &cases, &html_dir.join(JUNIT_FILE))?;
        write_index(&self.suite, &cases, &self.properties, &html_dir.join(INDEX_FILE))?;
        write_environment(&self.settings.allure_result_path, &self.properties)?;

        let summary = RunSummary::from_cases(&cases);
        info!(
            suite = %self.suite,
            total = summary.total,
            passed = summary.passed,
            failed = summary.failed,
            broken = summary.broken,
            report = %html_dir.display(),
            "Test run finished"
        );
        Ok(summary)
    }
}

/// Open case; attach during the test, then call `finish`
pub struct CaseGuard<'a> {
    run: &'a TestRun,
    id: String,
    reporter: Reporter<AllureCase>,
    started: Instant,
}

impl<'a> CaseGuard<'a> {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn reporter(&mut self) -> &mut Reporter<AllureCase> {
        &mut self.reporter
    }

    pub fn epic(&mut self, value: &str) -> &mut Self {
        self.reporter.sink_mut().epic(value);
        self
    }

    pub fn feature(&mut self, value: &str) -> &mut Self {
        self.reporter.sink_mut().feature(value);
        self
    }

    pub fn story(&mut self, value: &str) -> &mut Self {
        self.reporter.sink_mut().story(value);
        self
    }

    /// Close an API-only case
    pub fn finish<T>(self, result: &Result<T>) -> CaseOutcome {
        let outcome = CaseOutcome::from_result(result);
        self.complete(outcome, None)
    }

    /// Close a UI case; on failure the page is captured before the result is written
    pub async fn finish_with_page<T, D: BrowserDriver>(
        mut self,
        result: &Result<T>,
        page: &BasePage<D>,
    ) -> CaseOutcome {
        let outcome = CaseOutcome::from_result(result);
        let screenshot = if outcome.is_passed() {
            None
        } else {
            self.capture_failure(page).await
        };
        self.complete(outcome, screenshot)
    }

    fn screenshot_path(&self, stamp: &str) -> (PathBuf, String) {
        let file = format!("{}_{}.png", sanitize_id(&self.id), stamp);
        let relative = format!("{}/{}", SCREENSHOT_DIR, file);
        let path = self.run.settings.html_report_path.join(SCREENSHOT_DIR).join(file);
        (path, relative)
    }

    /// Screenshot and page HTML; returns the screenshot path relative to the HTML report.
    /// Both attachments and the file share one capture timestamp.
    async fn capture_failure<D: BrowserDriver>(&mut self, page: &BasePage<D>) -> Option<String> {
        let stamp = Local::now().format("%Y%m%d_%H%M%S_%3f").to_string();
        let (path, relative) = self.screenshot_path(&stamp);
        let saved = match page.take_screenshot(Some(&path)).await {
            Ok(png) => {
                let name = format!("Failure screenshot {} {}", self.id, stamp);
                self.reporter.attach_png(&name, png);
                Some(relative)
            }
            Err(err) => {
                warn!(id = %self.id, error = %err, "Failed to capture failure screenshot");
                None
            }
        };

        match page.page_content().await {
            Ok(html) => {
                let name = format!("Page source {} {}", self.id, stamp);
                self.reporter.attach_html(&name, &html);
            }
            Err(err) => warn!(id = %self.id, error = %err, "Failed to capture page source"),
        }
        saved
    }

    fn complete(self, outcome: CaseOutcome, screenshot: Option<String>) -> CaseOutcome {
        let details = StatusDetails {
            message: outcome.message().map(str::to_string),
            trace: None,
        };
        if let Err(err) = self.reporter.sink().write_result(outcome.allure_status(), details) {
            warn!(id = %self.id, error = %err, "Failed to write Allure result");
        }

        match &outcome {
            CaseOutcome::Passed => info!(id = %self.id, "Case passed"),
            other => warn!(id = %self.id, status = other.label(), message = other.message().unwrap_or_default(), "Case did not pass"),
        }

        self.run.record(CaseRecord {
            id: self.id,
            duration: self.started.elapsed(),
            outcome: outcome.clone(),
            screenshot,
        });
        outcome
    }
}
