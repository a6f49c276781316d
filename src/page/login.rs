//! Login page object

use std::time::Duration;

use super::base::BasePage;
use super::driver::BrowserDriver;
use super::element::{ElementRef, ElementState, LoadState};
use crate::errors::Result;

pub const LOGIN_PATH: &str = "/login";

pub const NUMBER_INPUT: &str = "#number";
pub const USERNAME_INPUT: &str = "#username";
pub const PASSWORD_INPUT: &str = "#password";
pub const LOGIN_BUTTON: &str = "button[type='submit']";
pub const LOGIN_FORM: &str = "form.login-form";
pub const ERROR_MESSAGE: &str = ".error-message";
pub const SUCCESS_MESSAGE: &str = ".success-message";

/// Wait used for optional elements that may never appear
const PROBE_TIMEOUT: Duration = Duration::from_millis(500);

pub struct LoginPage<D: BrowserDriver> {
    page: BasePage<D>,
}

impl<D: BrowserDriver> LoginPage<D> {
    pub fn new(page: BasePage<D>) -> Self {
        Self { page }
    }

    pub fn page(&self) -> &BasePage<D> {
        &self.page
    }

    pub fn into_page(self) -> BasePage<D> {
        self.page
    }

    /// Navigate to the login form and wait until it is usable
    pub async fn open(&self) -> Result<()> {
        self.page.navigate(LOGIN_PATH).await?;
        self.page.wait_for_load_state(LoadState::DomContentLoaded, None).await?;
        self.page.wait_for_selector(LOGIN_FORM, ElementState::Visible).await
    }

    /// Fill the form and submit it. The number field is skipped when empty
    /// or absent from the page.
    pub async fn login(&self, number: &str, username: &str, password: &str) -> Result<()> {
        if !number.is_empty() && self.page.is_visible(ElementRef::new(NUMBER_INPUT).with_timeout(PROBE_TIMEOUT)).await? {
            self.page.fill(NUMBER_INPUT, number).await?;
        }
        self.page.fill(USERNAME_INPUT, username).await?;
        self.page.fill(PASSWORD_INPUT, password).await?;
        self.page.click(LOGIN_BUTTON).await
    }

    /// Error banner text, `None` when no error is shown
    pub async fn error_message(&self) -> Result<Option<String>> {
        let banner = ElementRef::new(ERROR_MESSAGE).with_timeout(PROBE_TIMEOUT);
        if self.page.is_visible(&banner).await? {
            Ok(Some(self.page.get_text(ERROR_MESSAGE).await?))
        } else {
            Ok(None)
        }
    }

    pub async fn is_logged_in(&self) -> Result<bool> {
        self.page.is_visible(SUCCESS_MESSAGE).await
    }

    pub async fn expect_error(&self, text: &str) -> Result<()> {
        self.page.expect_text(ERROR_MESSAGE, text).await
    }
}
