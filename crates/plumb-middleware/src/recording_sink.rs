//! [`RecordingSink`] – a [`RenderSink`] that keeps every frame it is given.
//!
//! Used by headless hosts and tests to observe what the display loop would
//! have drawn.  Clones share the same log.

use std::sync::{Arc, Mutex};

use plumb_types::RenderFrame;

use crate::adapter::RenderSink;

#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    frames: Arc<Mutex<Vec<RenderFrame>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames rendered so far.
    pub fn len(&self) -> usize {
        self.frames.lock().map(|f| f.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The most recent frame, if any.
    pub fn last(&self) -> Option<RenderFrame> {
        self.frames.lock().ok().and_then(|f| f.last().copied())
    }

    /// A copy of every frame rendered so far.
    pub fn frames(&self) -> Vec<RenderFrame> {
        self.frames.lock().map(|f| f.clone()).unwrap_or_default()
    }
}

impl RenderSink for RecordingSink {
    fn render(&mut self, frame: &RenderFrame) {
        if let Ok(mut log) = self.frames.lock() {
            log.push(*frame);
        }
    }
}
