use camino::Utf8PathBuf;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{Diagnostic, DiagnosticEvent, DiagnosticSink, Level, parse_record};
use crate::paths;
use crate::types::WindowId;

#[derive(Debug, Default)]
struct WindowDiagnostics {
    by_file: BTreeMap<Utf8PathBuf, Vec<Diagnostic>>,
    general: Vec<Diagnostic>,
    finalized: bool,
    finalize_count: usize,
    clear_count: usize,
}

/// In-memory [`DiagnosticSink`] keyed by window and absolute file path.
///
/// A diagnostic already recorded for the window (same level, message, code
/// and location) is not recorded again, so a module compiled by several
/// targets shows each problem once.
#[derive(Debug, Default)]
pub struct DiagnosticStore {
    windows: Mutex<HashMap<WindowId, WindowDiagnostics>>,
}

fn to_utf8(path: &Path) -> Option<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(paths::normalize(path)).ok()
}

impl DiagnosticStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<WindowId, WindowDiagnostics>> {
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Diagnostics whose primary span is in `file`, in arrival order.
    #[must_use]
    pub fn diagnostics_for(&self, window: WindowId, file: &Path) -> Vec<Diagnostic> {
        let Some(file) = to_utf8(file) else {
            return Vec::new();
        };
        self.lock()
            .get(&window)
            .and_then(|w| w.by_file.get(&file))
            .cloned()
            .unwrap_or_default()
    }

    /// Every diagnostic for the window: located ones sorted by file, then
    /// span-less ones.
    #[must_use]
    pub fn all_diagnostics(&self, window: WindowId) -> Vec<Diagnostic> {
        self.lock()
            .get(&window)
            .map(|w| {
                w.by_file
                    .values()
                    .flatten()
                    .chain(w.general.iter())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Files with at least one diagnostic.
    #[must_use]
    pub fn files(&self, window: WindowId) -> Vec<Utf8PathBuf> {
        self.lock()
            .get(&window)
            .map(|w| w.by_file.keys().cloned().collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn count_at_level(&self, window: WindowId, level: Level) -> usize {
        self.lock().get(&window).map_or(0, |w| {
            w.by_file
                .values()
                .flatten()
                .chain(w.general.iter())
                .filter(|d| d.level == level)
                .count()
        })
    }

    #[must_use]
    pub fn is_finalized(&self, window: WindowId) -> bool {
        self.lock().get(&window).is_some_and(|w| w.finalized)
    }

    #[must_use]
    pub fn finalize_count(&self, window: WindowId) -> usize {
        self.lock().get(&window).map_or(0, |w| w.finalize_count)
    }

    #[must_use]
    pub fn clear_count(&self, window: WindowId) -> usize {
        self.lock().get(&window).map_or(0, |w| w.clear_count)
    }
}

impl DiagnosticSink for DiagnosticStore {
    fn clear(&self, window: WindowId) {
        let mut windows = self.lock();
        let entry = windows.entry(window).or_default();
        entry.by_file.clear();
        entry.general.clear();
        entry.finalized = false;
        entry.clear_count += 1;
    }

    fn add_diagnostic(&self, window: WindowId, event: DiagnosticEvent) {
        let Some(base) = to_utf8(&event.path_rewrite_base) else {
            tracing::warn!(base = %event.path_rewrite_base.display(), "non UTF-8 project path");
            return;
        };
        let target = event.target.as_deref().and_then(to_utf8);
        let Some(diagnostic) = parse_record(&event.record, &base, target.as_deref()) else {
            return;
        };

        let mut windows = self.lock();
        let entry = windows.entry(window).or_default();
        let bucket = match &diagnostic.file {
            Some(file) => entry.by_file.entry(file.clone()).or_default(),
            None => &mut entry.general,
        };
        if bucket.iter().any(|d| d.same_report(&diagnostic)) {
            tracing::trace!(message = %diagnostic.message, "duplicate diagnostic dropped");
            return;
        }
        bucket.push(diagnostic);
    }

    fn has_diagnostic_for(&self, window: WindowId, file: &Path) -> bool {
        let Some(file) = to_utf8(file) else {
            return false;
        };
        self.lock()
            .get(&window)
            .and_then(|w| w.by_file.get(&file))
            .is_some_and(|d| !d.is_empty())
    }

    fn finalize(&self, window: WindowId) {
        let mut windows = self.lock();
        let entry = windows.entry(window).or_default();
        entry.finalized = true;
        entry.finalize_count += 1;
    }
}
