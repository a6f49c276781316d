//! Element references, states and selection keys

use std::fmt;
use std::time::Duration;

use crate::errors::{HarnessError, Result};

/// A selector plus optional filters, resolved to live elements only
/// inside a single page operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef {
    pub selector: String,
    /// Keep only matches whose text contains this
    pub has_text: Option<String>,
    /// Overrides the page's default auto-wait
    pub timeout: Option<Duration>,
}

impl ElementRef {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            has_text: None,
            timeout: None,
        }
    }

    pub fn has_text(mut self, text: impl Into<String>) -> Self {
        self.has_text = Some(text.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl From<&str> for ElementRef {
    fn from(selector: &str) -> Self {
        ElementRef::new(selector)
    }
}

impl From<String> for ElementRef {
    fn from(selector: String) -> Self {
        ElementRef::new(selector)
    }
}

impl From<&ElementRef> for ElementRef {
    fn from(element: &ElementRef) -> Self {
        element.clone()
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.has_text {
            Some(text) => write!(f, "{} >> has-text(\"{}\")", self.selector, text),
            None => f.write_str(&self.selector),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ElementState {
    /// At least one match in the DOM
    Attached,
    /// No match in the DOM
    Detached,
    /// At least one displayed match
    #[default]
    Visible,
    /// No displayed match
    Hidden,
}

impl fmt::Display for ElementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElementState::Attached => "attached",
            ElementState::Detached => "detached",
            ElementState::Visible => "visible",
            ElementState::Hidden => "hidden",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadState {
    /// `document.readyState` is `interactive` or `complete`
    DomContentLoaded,
    /// `document.readyState` is `complete`
    #[default]
    Load,
    /// `complete` held for a quiet window
    NetworkIdle,
}

impl LoadState {
    pub fn is_reached_by(&self, ready_state: &str) -> bool {
        match self {
            LoadState::DomContentLoaded => matches!(ready_state, "interactive" | "complete"),
            LoadState::Load | LoadState::NetworkIdle => ready_state == "complete",
        }
    }
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoadState::DomContentLoaded => "domcontentloaded",
            LoadState::Load => "load",
            LoadState::NetworkIdle => "networkidle",
        };
        f.write_str(name)
    }
}

/// Which `<option>` to pick; exactly one key must be set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectOption {
    pub value: Option<String>,
    pub label: Option<String>,
    pub index: Option<usize>,
}

impl SelectOption {
    pub fn by_value(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn by_label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }

    pub fn by_index(index: usize) -> Self {
        Self {
            index: Some(index),
            ..Self::default()
        }
    }

    pub fn resolve(&self) -> Result<SelectBy> {
        match (&self.value, &self.label, self.index) {
            (Some(value), None, None) => Ok(SelectBy::Value(value.clone())),
            (None, Some(label), None) => Ok(SelectBy::Label(label.clone())),
            (None, None, Some(index)) => Ok(SelectBy::Index(index)),
            (None, None, None) => Err(HarnessError::InvalidArgument(
                "select_option needs one of value, label or index".to_string(),
            )),
            _ => Err(HarnessError::InvalidArgument(
                "select_option accepts only one of value, label or index".to_string(),
            )),
        }
    }
}

/// A validated selection key, what drivers act on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectBy {
    Value(String),
    Label(String),
    Index(usize),
}

impl fmt::Display for SelectBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectBy::Value(v) => write!(f, "value={}", v),
            SelectBy::Label(l) => write!(f, "label={}", l),
            SelectBy::Index(i) => write!(f, "index={}", i),
        }
    }
}
