pub mod vocabulary;

use std::sync::LazyLock;

use regex::Regex;

use crate::table::{AnnotatedRecord, RawRecord};
pub use vocabulary::MatchOrder;

/// Label for a row whose description could not be classified.
pub const UNCATEGORIZED: &str = "Uncategorized";
/// Label for a row with no description at all.
pub const OTHER: &str = "Other";

// Shortest capitalized run that stops before the next "Xy" word start or at the end.
static CAPITALIZED_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z][a-zA-Z\s\-–—]+?)(?:[A-Z][a-z]|$)").unwrap());
static LEADING_SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\s\-–—]+").unwrap());

/// Splits an incident-type label off the front of a description.
#[derive(Debug, Clone, Copy, Default)]
pub struct Segmenter {
    order: MatchOrder,
}

impl Segmenter {
    pub fn new(order: MatchOrder) -> Self {
        Segmenter { order }
    }

    /// Detect the incident type at the start of `description`.
    ///
    /// Known labels win; otherwise a leading capitalized run is taken as the
    /// label. Returns [`OTHER`] for a missing description and
    /// [`UNCATEGORIZED`] when nothing looks like a label.
    pub fn extract_incident_type(&self, description: Option<&str>) -> String {
        let Some(description) = description else {
            return OTHER.to_string();
        };

        if let Some(caps) = self.order.matcher().captures(description) {
            return caps[1].to_string();
        }

        if let Some(caps) = CAPITALIZED_RUN_RE.captures(description) {
            let label = caps[1].trim();
            let label = label.split('–').next().unwrap_or_default();
            let label = label.split('—').next().unwrap_or_default();
            return label.trim().to_string();
        }

        UNCATEGORIZED.to_string()
    }

    /// Classify and clean one record. The label handed to the cleaner is the
    /// one the classifier produced, so both always agree.
    pub fn annotate(&self, record: RawRecord) -> AnnotatedRecord {
        let incident_type = self.extract_incident_type(record.description.as_deref());
        let clean = clean_description(record.description.as_deref(), Some(&incident_type));
        AnnotatedRecord {
            date: record.date,
            description: record.description,
            incident_type,
            clean_description: clean,
        }
    }
}

/// Remove `incident_type` and any separator after it from the front of
/// `description`.
///
/// A missing description, a missing label or [`UNCATEGORIZED`] leave the
/// description untouched. A label that is not a literal prefix (possible for
/// heuristic labels) only has leading separators stripped.
pub fn clean_description(description: Option<&str>, incident_type: Option<&str>) -> Option<String> {
    let description = description?;
    let incident_type = match incident_type {
        Some(t) if t != UNCATEGORIZED => t,
        _ => return Some(description.to_string()),
    };

    let rest = description
        .strip_prefix(incident_type)
        .map(|after| after.strip_prefix(' ').unwrap_or(after))
        .unwrap_or(description);

    let rest = LEADING_SEPARATOR_RE.replace(rest, "");
    Some(rest.trim().to_string())
}
