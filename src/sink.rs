use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;

use crate::types::OutputMessage;

/// Where the controller applies the overlay's visibility
pub trait VisibilitySink: Send + 'static {
    fn set_visible(&mut self, visible: bool);
}

/// Writes output messages as JSON lines. Clones share the same writer so
/// visibility and view updates stay ordered on one stream.
pub struct JsonLines<W: Write + Send + 'static> {
    writer: Arc<Mutex<W>>,
}

impl<W: Write + Send + 'static> JsonLines<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Arc::new(Mutex::new(writer)),
        }
    }

    pub fn emit(&self, message: &OutputMessage) -> Result<()> {
        let line = serde_json::to_string(message).context("Failed to serialize output message")?;
        let mut writer = self.writer.lock();
        writeln!(writer, "{}", line).context("Failed to write output line")?;
        writer.flush().context("Failed to flush output")?;
        Ok(())
    }

    /// Run `f` against the underlying writer
    #[cfg(test)]
    pub fn with_writer<T>(&self, f: impl FnOnce(&mut W) -> T) -> T {
        let mut writer = self.writer.lock();
        f(&mut *writer)
    }
}

impl<W: Write + Send + 'static> Clone for JsonLines<W> {
    fn clone(&self) -> Self {
        Self {
            writer: self.writer.clone(),
        }
    }
}

impl<W: Write + Send + 'static> VisibilitySink for JsonLines<W> {
    fn set_visible(&mut self, visible: bool) {
        if let Err(e) = self.emit(&OutputMessage::Visibility { visible }) {
            log::error!("Failed to emit visibility: {:#}", e);
        }
    }
}

/// Records every value it receives
#[cfg(test)]
#[derive(Clone, Default)]
pub struct RecordingSink {
    applied: Arc<Mutex<Vec<bool>>>,
}

#[cfg(test)]
impl RecordingSink {
    pub fn applied(&self) -> Vec<bool> {
        self.applied.lock().clone()
    }
}

#[cfg(test)]
impl VisibilitySink for RecordingSink {
    fn set_visible(&mut self, visible: bool) {
        self.applied.lock().push(visible);
    }
}
