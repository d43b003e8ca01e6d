//! Session tracing of tokens and dispatched commands.
//!
//! Toggled at runtime with the `trace` command. Events go to the
//! `secretary::trace` target so they can be filtered like any other log.

use std::fmt::Debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tracer {
    enabled: bool,
}

impl Tracer {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Flip tracing and return the new state.
    pub fn toggle(&mut self) -> bool {
        self.enabled = !self.enabled;
        self.enabled
    }

    pub fn emit(&self, stage: &str, detail: &dyn Debug) {
        if self.enabled {
            tracing::info!(target: "secretary::trace", "{}: {:?}", stage, detail);
        }
    }
}
