//! Structured compiler messages.
//!
//! Cargo wraps each rustc diagnostic in a `compiler-message` record; plain
//! rustc emits the diagnostic object directly. Both are accepted. Everything
//! else cargo prints in JSON mode (artifacts, build-script output,
//! `build-finished`) carries no diagnostics and is skipped.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// Severity as reported by rustc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Level {
    Error,
    Warning,
    Note,
    Help,
    FailureNote,
    Other,
}

impl Level {
    fn parse(s: &str) -> Self {
        match s {
            "error" | "error: internal compiler error" => Self::Error,
            "warning" => Self::Warning,
            "note" => Self::Note,
            "help" => Self::Help,
            "failure-note" => Self::FailureNote,
            _ => Self::Other,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Note => "note",
            Self::Help => "help",
            Self::FailureNote => "failure-note",
            Self::Other => "other",
        }
    }
}

/// Line/column range, 1-based as rustc reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Region {
    pub line_start: u32,
    pub column_start: u32,
    pub line_end: u32,
    pub column_end: u32,
}

/// A note or help attached to a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Child {
    pub level: Level,
    pub message: String,
    /// Present when the child points somewhere specific.
    pub file: Option<Utf8PathBuf>,
    pub region: Option<Region>,
    pub suggestion: Option<String>,
}

/// One diagnostic placed at its primary location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub level: Level,
    pub message: String,
    pub code: Option<String>,
    /// Absolute path of the primary span; `None` for span-less messages.
    pub file: Option<Utf8PathBuf>,
    pub region: Option<Region>,
    pub label: Option<String>,
    pub children: Vec<Child>,
    /// Target whose build produced this diagnostic.
    pub target: Option<Utf8PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rendered: Option<String>,
}

impl Diagnostic {
    /// Identity used to drop repeats reported by several targets.
    pub(crate) fn same_report(&self, other: &Self) -> bool {
        self.level == other.level
            && self.message == other.message
            && self.code == other.code
            && self.file == other.file
            && self.region == other.region
    }
}

#[derive(Debug, Deserialize)]
struct RawDiagnostic {
    message: String,
    code: Option<RawCode>,
    level: String,
    #[serde(default)]
    spans: Vec<RawSpan>,
    #[serde(default)]
    children: Vec<RawDiagnostic>,
    rendered: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawCode {
    code: String,
}

#[derive(Debug, Clone, Deserialize)]
struct RawSpan {
    file_name: String,
    line_start: u32,
    line_end: u32,
    column_start: u32,
    column_end: u32,
    is_primary: bool,
    label: Option<String>,
    suggested_replacement: Option<String>,
    expansion: Option<Box<RawExpansion>>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawExpansion {
    span: RawSpan,
}

impl RawSpan {
    fn region(&self) -> Region {
        Region {
            line_start: self.line_start,
            column_start: self.column_start,
            line_end: self.line_end,
            column_end: self.column_end,
        }
    }

    /// Walk out of macro expansions until the span names a real file.
    fn user_visible(&self) -> &Self {
        let mut span = self;
        while is_pseudo_file(&span.file_name) {
            match &span.expansion {
                Some(exp) => span = &exp.span,
                None => break,
            }
        }
        span
    }
}

fn is_pseudo_file(name: &str) -> bool {
    name.starts_with('<') && name.ends_with('>')
}

/// Resolve a span path against the base, normalising `.`/`..`.
fn resolve(base: &Utf8Path, file_name: &str) -> Utf8PathBuf {
    let resolved = crate::paths::resolve_against(base.as_std_path(), Path::new(file_name));
    Utf8PathBuf::from_path_buf(resolved).unwrap_or_else(|_| base.join(file_name))
}

/// Compiler-internal summary lines that repeat what the diagnostics already say.
fn is_summary(raw: &RawDiagnostic) -> bool {
    raw.spans.is_empty()
        && (raw.message.starts_with("aborting due to")
            || raw.message.ends_with("warning emitted")
            || raw.message.ends_with("warnings emitted")
            || raw.message.starts_with("For more information about"))
}

/// Parse one JSON record into a diagnostic.
///
/// Returns `None` for records that are not diagnostics, malformed
/// diagnostics, and compiler summary lines.
#[must_use]
pub fn parse_record(
    record: &Value,
    base: &Utf8Path,
    target: Option<&Utf8Path>,
) -> Option<Diagnostic> {
    let payload = match record.get("reason").and_then(Value::as_str) {
        Some("compiler-message") => record.get("message")?,
        Some(other) => {
            tracing::trace!(reason = other, "skipping non-diagnostic record");
            return None;
        }
        None => record,
    };

    let raw: RawDiagnostic = match serde_json::from_value(payload.clone()) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::debug!(error = %e, "unrecognised JSON record");
            return None;
        }
    };
    if is_summary(&raw) {
        return None;
    }

    let primary = raw
        .spans
        .iter()
        .find(|s| s.is_primary)
        .or_else(|| raw.spans.first())
        .map(RawSpan::user_visible);

    let children = raw
        .children
        .iter()
        .map(|c| {
            let span = c.spans.iter().find(|s| s.is_primary).or_else(|| c.spans.first());
            Child {
                level: Level::parse(&c.level),
                message: c.message.clone(),
                file: span
                    .filter(|s| !is_pseudo_file(&s.file_name))
                    .map(|s| resolve(base, &s.file_name)),
                region: span.map(RawSpan::region),
                suggestion: span.and_then(|s| s.suggested_replacement.clone()),
            }
        })
        .collect();

    Some(Diagnostic {
        level: Level::parse(&raw.level),
        message: raw.message,
        code: raw.code.map(|c| c.code),
        file: primary
            .filter(|s| !is_pseudo_file(&s.file_name))
            .map(|s| resolve(base, &s.file_name)),
        region: primary.map(RawSpan::region),
        label: primary.and_then(|s| s.label.clone()),
        children,
        target: target.map(Utf8Path::to_path_buf),
        rendered: raw.rendered,
    })
}
