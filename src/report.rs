//! What a conversion had to give up on.
//!
//! Failures below the packaging step never abort a conversion. Each one is
//! logged and recorded here so the caller can tell a clean document from a
//! best-effort one.

use std::fmt;

use log::warn;
use serde::Serialize;

/// The scope a degradation happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradationKind {
    /// One element could not be rendered and was replaced by a placeholder.
    Element,
    /// One chunk failed to parse and was skipped.
    Chunk,
    /// Image bytes were unavailable; a placeholder was emitted.
    ResourceUnavailable,
    /// A code block was emitted without coloring.
    Highlight,
}

impl fmt::Display for DegradationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DegradationKind::Element => "element",
            DegradationKind::Chunk => "chunk",
            DegradationKind::ResourceUnavailable => "resource unavailable",
            DegradationKind::Highlight => "highlight",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Degradation {
    pub kind: DegradationKind,
    pub detail: String,
}

/// Summary of one conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConversionReport {
    /// Chunks parsed successfully (1 when chunking was not used).
    pub chunks_parsed: usize,
    /// Block elements serialized.
    pub elements: usize,
    /// Images embedded.
    pub images: usize,
    /// Footnotes rendered.
    pub footnotes: usize,
    degradations: Vec<Degradation>,
}

impl ConversionReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log and record a degradation.
    pub fn record(&mut self, kind: DegradationKind, detail: impl Into<String>) {
        let detail = detail.into();
        warn!("{kind}: {detail}");
        self.degradations.push(Degradation { kind, detail });
    }

    pub fn degradations(&self) -> &[Degradation] {
        &self.degradations
    }

    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }

    /// Number of degradations of one kind.
    pub fn count(&self, kind: DegradationKind) -> usize {
        self.degradations.iter().filter(|d| d.kind == kind).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record() {
        let mut report = ConversionReport::new();
        assert!(!report.is_degraded());
        report.record(DegradationKind::ResourceUnavailable, "image a.png");
        report.record(DegradationKind::Highlight, "unsupported language: x");
        assert!(report.is_degraded());
        assert_eq!(report.count(DegradationKind::Highlight), 1);
        assert_eq!(report.degradations()[0].detail, "image a.png");
    }

    #[test]
    fn test_serializes_kind_snake_case() {
        let mut report = ConversionReport::new();
        report.record(DegradationKind::ResourceUnavailable, "x");
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains(r#""kind":"resource_unavailable""#));
    }
}
