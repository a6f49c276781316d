//! Page-object base: named, logged, auto-waiting browser operations

use std::path::Path;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, Span};

use super::driver::{BrowserDriver, ElementHandle};
use super::element::{ElementRef, ElementState, LoadState, SelectOption};
use crate::client::build_url;
use crate::config::UiConfig;
use crate::errors::{HarnessError, Result};

/// Auto-wait poll interval
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long `complete` must hold before the network counts as idle
pub const NETWORK_IDLE_WINDOW: Duration = Duration::from_millis(500);

pub struct BasePage<D: BrowserDriver> {
    driver: D,
    ui_url: String,
    timeout: Duration,
    span: Span,
}

impl<D: BrowserDriver> BasePage<D> {
    pub fn new(driver: D, config: &UiConfig) -> Self {
        Self {
            driver,
            ui_url: config.ui_url.clone(),
            timeout: config.timeout,
            span: tracing::info_span!("page", ui_url = %config.ui_url),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn default_timeout(&self) -> Duration {
        self.timeout
    }

    /// Open `path` relative to the UI base URL (absolute URLs are used as is)
    pub async fn navigate(&self, path: &str) -> Result<()> {
        let url = build_url(&self.ui_url, path);
        info!(parent: &self.span, url = %url, "Navigating");
        self.driver.goto(&url).await
    }

    pub async fn current_url(&self) -> Result<String> {
        self.driver.current_url().await
    }

    /// Wait until the current URL contains `fragment`
    pub async fn wait_for_url(&self, fragment: &str, timeout: Option<Duration>) -> Result<String> {
        let timeout = timeout.unwrap_or(self.timeout);
        debug!(parent: &self.span, fragment, "Waiting for URL");
        let deadline = Instant::now() + timeout;
        loop {
            let url = self.driver.current_url().await?;
            if url.contains(fragment) {
                return Ok(url);
            }
            if Instant::now() >= deadline {
                return Err(HarnessError::Assertion(format!(
                    "expected URL containing '{}' within {:?}, still at '{}'",
                    fragment, timeout, url
                )));
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    pub async fn fill(&self, element: impl Into<ElementRef>, value: &str) -> Result<()> {
        let element = element.into();
        debug!(parent: &self.span, selector = %element, chars = value.chars().count(), "Filling");
        let handle = self.wait_for_handle(&element, ElementState::Visible).await?;
        self.driver.clear_and_type(&handle, value).await
    }

    pub async fn click(&self, element: impl Into<ElementRef>) -> Result<()> {
        let element = element.into();
        debug!(parent: &self.span, selector = %element, "Clicking");
        let handle = self.wait_for_handle(&element, ElementState::Visible).await?;
        self.driver.click(&handle).await
    }

    /// Tick a checkbox; a no-op when already checked
    pub async fn check(&self, element: impl Into<ElementRef>) -> Result<()> {
        let element = element.into();
        debug!(parent: &self.span, selector = %element, "Checking");
        self.set_checked(&element, true).await
    }

    pub async fn uncheck(&self, element: impl Into<ElementRef>) -> Result<()> {
        let element = element.into();
        debug!(parent: &self.span, selector = %element, "Unchecking");
        self.set_checked(&element, false).await
    }

    async fn set_checked(&self, element: &ElementRef, checked: bool) -> Result<()> {
        let handle = self.wait_for_handle(element, ElementState::Visible).await?;
        if self.driver.is_selected(&handle).await? != checked {
            self.driver.click(&handle).await?;
        }
        Ok(())
    }

    pub async fn select_option(&self, element: impl Into<ElementRef>, option: SelectOption) -> Result<()> {
        let element = element.into();
        let by = option.resolve()?;
        debug!(parent: &self.span, selector = %element, option = %by, "Selecting option");
        let handle = self.wait_for_handle(&element, ElementState::Visible).await?;
        self.driver.select_option(&handle, &by).await
    }

    pub async fn get_text(&self, element: impl Into<ElementRef>) -> Result<String> {
        let element = element.into();
        debug!(parent: &self.span, selector = %element, "Reading text");
        let handle = self.wait_for_handle(&element, ElementState::Visible).await?;
        self.driver.text(&handle).await
    }

    pub async fn get_attribute(&self, element: impl Into<ElementRef>, name: &str) -> Result<Option<String>> {
        let element = element.into();
        debug!(parent: &self.span, selector = %element, attribute = name, "Reading attribute");
        let handle = self.wait_for_handle(&element, ElementState::Attached).await?;
        self.driver.attribute(&handle, name).await
    }

    /// `false` when nothing visible shows up in time
    pub async fn is_visible(&self, element: impl Into<ElementRef>) -> Result<bool> {
        let element = element.into();
        debug!(parent: &self.span, selector = %element, "Checking visibility");
        match self.wait_for(&element, ElementState::Visible).await {
            Ok(_) => Ok(true),
            Err(HarnessError::ElementTimeout { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn wait_for_selector(&self, element: impl Into<ElementRef>, state: ElementState) -> Result<()> {
        let element = element.into();
        debug!(parent: &self.span, selector = %element, state = %state, "Waiting for selector");
        self.wait_for(&element, state).await.map(|_| ())
    }

    pub async fn wait_for_load_state(&self, state: LoadState, timeout: Option<Duration>) -> Result<()> {
        let timeout = timeout.unwrap_or(self.timeout);
        debug!(parent: &self.span, state = %state, "Waiting for load state");
        let deadline = Instant::now() + timeout;
        let mut complete_since: Option<Instant> = None;

        loop {
            let ready = self.driver.ready_state().await?;
            if state.is_reached_by(&ready) {
                if state != LoadState::NetworkIdle {
                    return Ok(());
                }
                let since = *complete_since.get_or_insert_with(Instant::now);
                if since.elapsed() >= NETWORK_IDLE_WINDOW {
                    return Ok(());
                }
            } else {
                complete_since = None;
            }

            if Instant::now() >= deadline {
                return Err(HarnessError::ElementTimeout {
                    selector: "document".to_string(),
                    state: state.to_string(),
                    timeout,
                });
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    /// Assert `element` reaches `state` within its timeout
    pub async fn expect_element(&self, element: impl Into<ElementRef>, state: ElementState) -> Result<()> {
        let element = element.into();
        debug!(parent: &self.span, selector = %element, state = %state, "Expecting element");
        match self.wait_for(&element, state).await {
            Ok(_) => Ok(()),
            Err(HarnessError::ElementTimeout { timeout, .. }) => Err(HarnessError::Assertion(format!(
                "expected '{}' to be {} within {:?}",
                element, state, timeout
            ))),
            Err(e) => Err(e),
        }
    }

    /// Assert a visible match of `element` contains `expected`
    pub async fn expect_text(&self, element: impl Into<ElementRef>, expected: &str) -> Result<()> {
        let element = element.into();
        debug!(parent: &self.span, selector = %element, expected, "Expecting text");
        let timeout = element.timeout.unwrap_or(self.timeout);
        let deadline = Instant::now() + timeout;
        let mut last_text: Option<String> = None;

        loop {
            for handle in self.matching(&element).await? {
                if self.driver.is_displayed(&handle).await.unwrap_or(false) {
                    let text = self.driver.text(&handle).await.unwrap_or_default();
                    if text.contains(expected) {
                        return Ok(());
                    }
                    last_text = Some(text);
                }
            }
            if Instant::now() >= deadline {
                let seen = match last_text {
                    Some(text) => format!("last text was '{}'", text),
                    None => "no visible match".to_string(),
                };
                return Err(HarnessError::Assertion(format!(
                    "expected '{}' to contain text '{}' within {:?}, {}",
                    element, expected, timeout, seen
                )));
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    /// PNG of the viewport, also written to `path` when given
    pub async fn take_screenshot(&self, path: Option<&Path>) -> Result<Vec<u8>> {
        let png = self.driver.screenshot().await?;
        if let Some(path) = path {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &png)?;
            info!(parent: &self.span, path = %path.display(), "Screenshot saved");
        }
        Ok(png)
    }

    /// Full HTML of the current page
    pub async fn page_content(&self) -> Result<String> {
        self.driver.page_source().await
    }

    /// End the browser session
    pub async fn close(self) -> Result<()> {
        info!(parent: &self.span, "Closing page");
        self.driver.quit().await
    }

    async fn wait_for_handle(&self, element: &ElementRef, state: ElementState) -> Result<ElementHandle> {
        self.wait_for(element, state).await?.ok_or_else(|| {
            HarnessError::Driver(format!("'{}' reached {} without a handle", element, state))
        })
    }

    /// Poll until `element` is in `state`; returns the first satisfying
    /// handle for `Attached`/`Visible`
    async fn wait_for(&self, element: &ElementRef, state: ElementState) -> Result<Option<ElementHandle>> {
        let timeout = element.timeout.unwrap_or(self.timeout);
        let deadline = Instant::now() + timeout;

        loop {
            let handles = self.matching(element).await?;
            let satisfied = match state {
                ElementState::Attached => Some(handles.into_iter().next()),
                ElementState::Detached => handles.is_empty().then_some(None),
                ElementState::Visible => self.first_displayed(&handles).await.map(Some),
                ElementState::Hidden => match self.first_displayed(&handles).await {
                    Some(_) => None,
                    None => Some(None),
                },
            };

            match satisfied {
                Some(Some(handle)) => return Ok(Some(handle)),
                Some(None) if matches!(state, ElementState::Detached | ElementState::Hidden) => {
                    return Ok(None)
                }
                _ => {}
            }

            if Instant::now() >= deadline {
                return Err(HarnessError::ElementTimeout {
                    selector: element.to_string(),
                    state: state.to_string(),
                    timeout,
                });
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    /// Current matches after the `has_text` filter
    async fn matching(&self, element: &ElementRef) -> Result<Vec<ElementHandle>> {
        let handles = self.driver.find_elements(&element.selector).await?;
        let Some(needle) = &element.has_text else {
            return Ok(handles);
        };

        let mut kept = Vec::with_capacity(handles.len());
        for handle in handles {
            // stale handles simply drop out of the match set
            if let Ok(text) = self.driver.text(&handle).await {
                if text.contains(needle.as_str()) {
                    kept.push(handle);
                }
            }
        }
        Ok(kept)
    }

    async fn first_displayed(&self, handles: &[ElementHandle]) -> Option<ElementHandle> {
        for handle in handles {
            if self.driver.is_displayed(handle).await.unwrap_or(false) {
                return Some(handle.clone());
            }
        }
        None
    }
}
