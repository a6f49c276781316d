//! Shared test utilities for qaharness integration tests
//!
//! - `FakeDriver`: an in-memory page that implements `BrowserDriver`
//! - `LogCapture`: collects formatted tracing output for assertions
//! - helpers for settings files and a running mock backend

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::fmt::MakeWriter;

use qaharness::errors::{HarnessError, Result};
use qaharness::page::{BrowserDriver, ElementHandle, SelectBy};

/// Tiny valid PNG header, enough for attachment checks
pub const FAKE_PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

// ============================================================================
// Fake browser driver
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct FakeElement {
    pub selector: String,
    pub text: String,
    pub displayed: bool,
    pub selected: bool,
    pub value: String,
    pub attributes: HashMap<String, String>,
    /// `(value, label)` pairs of a `<select>`
    pub options: Vec<(String, String)>,
    pub chosen: Option<String>,
}

impl FakeElement {
    pub fn new(selector: &str) -> Self {
        Self {
            selector: selector.to_string(),
            displayed: true,
            ..Default::default()
        }
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.displayed = false;
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn options(mut self, options: &[(&str, &str)]) -> Self {
        self.options = options
            .iter()
            .map(|(v, l)| (v.to_string(), l.to_string()))
            .collect();
        self
    }
}

/// What a click changes on the page
#[derive(Debug, Clone)]
pub enum Effect {
    Show(String),
    Hide(String),
    SetText(String, String),
    Navigate(String),
}

#[derive(Debug, Default)]
struct Dom {
    url: String,
    ready_state: String,
    elements: Vec<(String, FakeElement)>,
    on_click: HashMap<String, Vec<Effect>>,
    next_id: usize,
    calls: Vec<String>,
    quit: bool,
}

impl Dom {
    fn element_mut(&mut self, handle: &ElementHandle) -> Result<&mut FakeElement> {
        self.elements
            .iter_mut()
            .find(|(id, _)| id == handle.id())
            .map(|(_, el)| el)
            .ok_or_else(|| HarnessError::Driver(format!("stale element {}", handle.id())))
    }

    fn apply(&mut self, effect: &Effect) {
        match effect {
            Effect::Show(selector) => self.set_displayed(selector, true),
            Effect::Hide(selector) => self.set_displayed(selector, false),
            Effect::SetText(selector, text) => {
                for (_, el) in self.elements.iter_mut().filter(|(_, el)| &el.selector == selector) {
                    el.text = text.clone();
                }
            }
            Effect::Navigate(url) => self.url = url.clone(),
        }
    }

    fn set_displayed(&mut self, selector: &str, displayed: bool) {
        for (_, el) in self.elements.iter_mut().filter(|(_, el)| el.selector == selector) {
            el.displayed = displayed;
        }
    }
}

/// In-memory page. Clones share the same DOM, so a test can keep one
/// clone for inspection after handing the other to a page object.
#[derive(Debug, Clone)]
pub struct FakeDriver {
    dom: Arc<Mutex<Dom>>,
}

impl Default for FakeDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeDriver {
    pub fn new() -> Self {
        Self {
            dom: Arc::new(Mutex::new(Dom {
                url: "about:blank".to_string(),
                ready_state: "complete".to_string(),
                ..Default::default()
            })),
        }
    }

    pub fn with(self, element: FakeElement) -> Self {
        {
            let mut dom = self.dom.lock().unwrap();
            dom.next_id += 1;
            let id = format!("el-{}", dom.next_id);
            dom.elements.push((id, element));
        }
        self
    }

    pub fn on_click(self, selector: &str, effects: Vec<Effect>) -> Self {
        self.dom
            .lock()
            .unwrap()
            .on_click
            .insert(selector.to_string(), effects);
        self
    }

    pub fn set_ready_state(&self, state: &str) {
        self.dom.lock().unwrap().ready_state = state.to_string();
    }

    /// Apply `effect` after `delay`, from a background task
    pub fn later(&self, delay: Duration, effect: Effect) {
        let dom = Arc::clone(&self.dom);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            dom.lock().unwrap().apply(&effect);
        });
    }

    pub fn value_of(&self, selector: &str) -> Option<String> {
        let dom = self.dom.lock().unwrap();
        dom.elements
            .iter()
            .find(|(_, el)| el.selector == selector)
            .map(|(_, el)| el.value.clone())
    }

    pub fn element(&self, selector: &str) -> Option<FakeElement> {
        let dom = self.dom.lock().unwrap();
        dom.elements
            .iter()
            .find(|(_, el)| el.selector == selector)
            .map(|(_, el)| el.clone())
    }

    pub fn url(&self) -> String {
        self.dom.lock().unwrap().url.clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.dom.lock().unwrap().calls.clone()
    }

    pub fn was_quit(&self) -> bool {
        self.dom.lock().unwrap().quit
    }

    fn record(&self, call: String) {
        self.dom.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl BrowserDriver for FakeDriver {
    async fn goto(&self, url: &str) -> Result<()> {
        self.record(format!("goto {}", url));
        self.dom.lock().unwrap().url = url.to_string();
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.url())
    }

    async fn find_elements(&self, css: &str) -> Result<Vec<ElementHandle>> {
        let dom = self.dom.lock().unwrap();
        Ok(dom
            .elements
            .iter()
            .filter(|(_, el)| el.selector == css)
            .map(|(id, _)| ElementHandle(id.clone()))
            .collect())
    }

    async fn is_displayed(&self, element: &ElementHandle) -> Result<bool> {
        Ok(self.dom.lock().unwrap().element_mut(element)?.displayed)
    }

    async fn clear_and_type(&self, element: &ElementHandle, text: &str) -> Result<()> {
        let mut dom = self.dom.lock().unwrap();
        let el = dom.element_mut(element)?;
        el.value = text.to_string();
        let selector = el.selector.clone();
        dom.calls.push(format!("type {}", selector));
        Ok(())
    }

    async fn click(&self, element: &ElementHandle) -> Result<()> {
        let mut dom = self.dom.lock().unwrap();
        let el = dom.element_mut(element)?;
        el.selected = !el.selected;
        let selector = el.selector.clone();
        dom.calls.push(format!("click {}", selector));
        if let Some(effects) = dom.on_click.get(&selector).cloned() {
            for effect in &effects {
                dom.apply(effect);
            }
        }
        Ok(())
    }

    async fn is_selected(&self, element: &ElementHandle) -> Result<bool> {
        Ok(self.dom.lock().unwrap().element_mut(element)?.selected)
    }

    async fn select_option(&self, element: &ElementHandle, by: &SelectBy) -> Result<()> {
        let mut dom = self.dom.lock().unwrap();
        let el = dom.element_mut(element)?;
        let chosen = match by {
            SelectBy::Value(value) => el.options.iter().find(|(v, _)| v == value),
            SelectBy::Label(label) => el.options.iter().find(|(_, l)| l == label),
            SelectBy::Index(index) => el.options.get(*index),
        }
        .map(|(v, _)| v.clone())
        .ok_or_else(|| HarnessError::Driver(format!("no option matching {}", by)))?;
        el.chosen = Some(chosen);
        Ok(())
    }

    async fn text(&self, element: &ElementHandle) -> Result<String> {
        Ok(self.dom.lock().unwrap().element_mut(element)?.text.clone())
    }

    async fn attribute(&self, element: &ElementHandle, name: &str) -> Result<Option<String>> {
        Ok(self
            .dom
            .lock()
            .unwrap()
            .element_mut(element)?
            .attributes
            .get(name)
            .cloned())
    }

    async fn ready_state(&self) -> Result<String> {
        Ok(self.dom.lock().unwrap().ready_state.clone())
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        self.record("screenshot".to_string());
        Ok(FAKE_PNG.to_vec())
    }

    async fn page_source(&self) -> Result<String> {
        let dom = self.dom.lock().unwrap();
        let body: String = dom
            .elements
            .iter()
            .map(|(_, el)| format!("<div data-selector=\"{}\">{}</div>", el.selector, el.text))
            .collect();
        Ok(format!("<html><body>{}</body></html>", body))
    }

    async fn quit(&self) -> Result<()> {
        self.dom.lock().unwrap().quit = true;
        Ok(())
    }
}

// ============================================================================
// Log capture
// ============================================================================

#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Capture every event at debug level on this thread until the guard drops
pub fn capture_logs() -> (LogCapture, tracing::subscriber::DefaultGuard) {
    capture_logs_at(tracing::Level::DEBUG)
}

/// Capture events at `level` and above, e.g. the shipped `info` default
pub fn capture_logs_at(level: tracing::Level) -> (LogCapture, tracing::subscriber::DefaultGuard) {
    let capture = LogCapture::default();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_ansi(false)
        .with_writer(capture.clone())
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (capture, guard)
}

// ============================================================================
// Fixtures
// ============================================================================

pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

/// Settings file pointing every URL at `base_url`
pub fn settings_toml(base_url: &str, reports: &Path) -> String {
    format!(
        r#"current_env = "test"

[defaults]
timeout = 5
max_retries = 1
log_level = "warn"
allure_result_path = "{allure}"
html_report_path = "{html}"
logout_endpoint = "/user/logout"

[environments.test]
base_url = "{base}"
ui_url = "{base}"
number = "001"
username = "admin"
password = "Lx123456"
"#,
        base = base_url,
        allure = reports.join("allure_results").display(),
        html = reports.join("html_report").display(),
    )
}
