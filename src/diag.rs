//! Diagnostics — structured warning/error reporting for recoverable faults.
//!
//! Input-validation fallbacks (unknown note names, unknown chord types,
//! playback before initialization) are invisible to the end user but must
//! stay observable. Components take an injected [`Diagnostics`] sink instead
//! of writing to the console; the default sink forwards to the `log` facade.

use std::sync::{Arc, Mutex};

/// Sink for recoverable-fault diagnostics.
///
/// `code` is a stable machine-readable identifier (e.g. `pitch.unknown_note`);
/// `context` carries the offending input or surrounding detail.
pub trait Diagnostics: Send + Sync {
    fn warn(&self, code: &str, context: &str);
    fn error(&self, code: &str, context: &str);
}

/// Default sink: forwards to the `log` facade.
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn warn(&self, code: &str, context: &str) {
        log::warn!("[{code}] {context}");
    }

    fn error(&self, code: &str, context: &str) {
        log::error!("[{code}] {context}");
    }
}

/// The shared default sink.
pub fn default_diagnostics() -> Arc<dyn Diagnostics> {
    Arc::new(LogDiagnostics)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// One recorded diagnostic entry.
#[derive(Debug, Clone)]
pub struct DiagEntry {
    pub severity: Severity,
    pub code: String,
    pub context: String,
}

/// Sink that records entries in memory. Lets tests (and embedders that want
/// their own reporting) assert on fallback paths without capturing stderr.
#[derive(Default)]
pub struct CollectingDiagnostics {
    entries: Mutex<Vec<DiagEntry>>,
}

impl CollectingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<DiagEntry> {
        self.entries.lock().unwrap().clone()
    }

    /// Codes of all recorded entries, in order.
    pub fn codes(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.code.clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }

    fn push(&self, severity: Severity, code: &str, context: &str) {
        self.entries.lock().unwrap().push(DiagEntry {
            severity,
            code: code.to_string(),
            context: context.to_string(),
        });
    }
}

impl Diagnostics for CollectingDiagnostics {
    fn warn(&self, code: &str, context: &str) {
        self.push(Severity::Warning, code, context);
    }

    fn error(&self, code: &str, context: &str) {
        self.push(Severity::Error, code, context);
    }
}
