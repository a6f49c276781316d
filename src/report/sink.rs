//! Where attachments go, and a reporter that never fails the test

use serde::Serialize;
use tracing::warn;

use super::attachment::Attachment;
use crate::errors::Result;

pub trait AttachmentSink {
    fn attach(&mut self, attachment: &Attachment) -> Result<()>;
}

/// Collects attachments in memory
impl AttachmentSink for Vec<Attachment> {
    fn attach(&mut self, attachment: &Attachment) -> Result<()> {
        self.push(attachment.clone());
        Ok(())
    }
}

/// Wraps a sink; attachment failures are logged and swallowed
pub struct Reporter<S> {
    sink: S,
}

impl<S: AttachmentSink> Reporter<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn attach(&mut self, attachment: Attachment) {
        if let Err(err) = self.sink.attach(&attachment) {
            warn!(name = %attachment.name, error = %err, "Failed to attach to report");
        }
    }

    pub fn attach_text(&mut self, name: &str, text: &str) {
        self.attach(Attachment::text(name, text));
    }

    pub fn attach_html(&mut self, name: &str, html: &str) {
        self.attach(Attachment::html(name, html));
    }

    pub fn attach_png(&mut self, name: &str, png: Vec<u8>) {
        self.attach(Attachment::png(name, png));
    }

    pub fn attach_json<T: Serialize + ?Sized>(&mut self, name: &str, value: &T) {
        match Attachment::json(name, value) {
            Ok(attachment) => self.attach(attachment),
            Err(err) => warn!(name, error = %err, "Failed to serialise attachment"),
        }
    }
}
