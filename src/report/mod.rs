//! Test reporting: attachments, Allure results, JUnit XML and an HTML summary

pub mod allure;
pub mod attachment;
pub mod case;
pub mod environment;
pub mod hooks;
pub mod html;
pub mod junit;
pub mod sink;

pub use allure::{AllureCase, AllureStatus, StatusDetails};
pub use attachment::{Attachment, MediaKind};
pub use case::{CaseOutcome, CaseRecord, RunSummary};
pub use environment::write_environment;
pub use hooks::{sanitize_id, CaseGuard, TestRun};
pub use html::render_index;
pub use junit::write_junit;
pub use sink::{AttachmentSink, Reporter};
