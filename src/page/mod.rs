//! Page objects over a pluggable browser driver

pub mod base;
pub mod driver;
pub mod element;
pub mod login;
pub mod webdriver;

pub use base::{BasePage, NETWORK_IDLE_WINDOW, POLL_INTERVAL};
pub use driver::{BrowserDriver, ElementHandle};
pub use element::{ElementRef, ElementState, LoadState, SelectBy, SelectOption};
pub use login::LoginPage;
pub use webdriver::WebDriverClient;
