//! Primitive browser operations
//!
//! Nothing here waits. Auto-waiting and logging live in
//! [`BasePage`](super::BasePage), so a driver only has to answer the
//! question asked at that instant.

use async_trait::async_trait;

use super::element::SelectBy;
use crate::errors::Result;

/// Opaque id of a live element, valid until the DOM changes under it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub String);

impl ElementHandle {
    pub fn id(&self) -> &str {
        &self.0
    }
}

#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn goto(&self, url: &str) -> Result<()>;

    async fn current_url(&self) -> Result<String>;

    /// All current matches for a CSS selector, in document order
    async fn find_elements(&self, css: &str) -> Result<Vec<ElementHandle>>;

    async fn is_displayed(&self, element: &ElementHandle) -> Result<bool>;

    async fn clear_and_type(&self, element: &ElementHandle, text: &str) -> Result<()>;

    async fn click(&self, element: &ElementHandle) -> Result<()>;

    /// Checked state of a checkbox/radio, selected state of an option
    async fn is_selected(&self, element: &ElementHandle) -> Result<bool>;

    async fn select_option(&self, element: &ElementHandle, by: &SelectBy) -> Result<()>;

    async fn text(&self, element: &ElementHandle) -> Result<String>;

    async fn attribute(&self, element: &ElementHandle, name: &str) -> Result<Option<String>>;

    /// `document.readyState`
    async fn ready_state(&self) -> Result<String>;

    /// PNG of the viewport
    async fn screenshot(&self) -> Result<Vec<u8>>;

    async fn page_source(&self) -> Result<String>;

    /// End the browser session
    async fn quit(&self) -> Result<()>;
}
