//! Allure 2 result files
//!
//! Each case writes `<uuid>-result.json` plus one `<uuid>-attachment.<ext>`
//! file per attachment into the results directory.

use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::attachment::Attachment;
use super::sink::AttachmentSink;
use crate::errors::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AllureStatus {
    Passed,
    /// A check failed
    Failed,
    /// The test itself broke
    Broken,
    Skipped,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AllureLabel {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AllureAttachment {
    pub name: String,
    pub source: String,
    #[serde(rename = "type")]
    pub mime: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AllureResult<'a> {
    uuid: String,
    history_id: &'a str,
    name: &'a str,
    full_name: &'a str,
    status: AllureStatus,
    status_details: &'a StatusDetails,
    stage: &'static str,
    start: i64,
    stop: i64,
    labels: &'a [AllureLabel],
    attachments: &'a [AllureAttachment],
}

/// One test case being recorded
#[derive(Debug)]
pub struct AllureCase {
    dir: PathBuf,
    uuid: Uuid,
    name: String,
    full_name: String,
    start: i64,
    labels: Vec<AllureLabel>,
    attachments: Vec<AllureAttachment>,
}

impl AllureCase {
    pub fn new(dir: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            dir: dir.into(),
            uuid: Uuid::new_v4(),
            full_name: name.clone(),
            name,
            start: Utc::now().timestamp_millis(),
            labels: Vec::new(),
            attachments: Vec::new(),
        }
    }

    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = full_name.into();
        self
    }

    pub fn label(&mut self, name: &str, value: &str) {
        self.labels.push(AllureLabel {
            name: name.to_string(),
            value: value.to_string(),
        });
    }

    pub fn epic(&mut self, value: &str) {
        self.label("epic", value);
    }

    pub fn feature(&mut self, value: &str) {
        self.label("feature", value);
    }

    pub fn story(&mut self, value: &str) {
        self.label("story", value);
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn labels(&self) -> &[AllureLabel] {
        &self.labels
    }

    pub fn attachments(&self) -> &[AllureAttachment] {
        &self.attachments
    }

    /// Write `<uuid>-result.json` and return its path
    pub fn write_result(&self, status: AllureStatus, details: StatusDetails) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let result = AllureResult {
            uuid: self.uuid.to_string(),
            history_id: &self.full_name,
            name: &self.name,
            full_name: &self.full_name,
            status,
            status_details: &details,
            stage: "finished",
            start: self.start,
            stop: Utc::now().timestamp_millis(),
            labels: &self.labels,
            attachments: &self.attachments,
        };
        let path = self.dir.join(format!("{}-result.json", self.uuid));
        std::fs::write(&path, serde_json::to_vec_pretty(&result)?)?;
        Ok(path)
    }
}

impl AttachmentSink for AllureCase {
    fn attach(&mut self, attachment: &Attachment) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let source = format!(
            "{}-attachment.{}",
            Uuid::new_v4(),
            attachment.media_kind.extension()
        );
        std::fs::write(self.dir.join(&source), &attachment.content)?;
        self.attachments.push(AllureAttachment {
            name: attachment.name.clone(),
            source,
            mime: attachment.media_kind.mime().to_string(),
        });
        Ok(())
    }
}
