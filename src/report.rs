use std::collections::HashMap;

use serde::Serialize;

use crate::table::AnnotatedRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeCount {
    pub incident_type: String,
    pub count: usize,
}

/// Frequency of each incident type, most common first. Ties sort by label.
pub fn count_types<'a>(records: impl IntoIterator<Item = &'a AnnotatedRecord>) -> Vec<TypeCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for r in records {
        *counts.entry(r.incident_type.as_str()).or_default() += 1;
    }
    let mut out: Vec<TypeCount> = counts
        .into_iter()
        .map(|(incident_type, count)| TypeCount {
            incident_type: incident_type.to_string(),
            count,
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.incident_type.cmp(&b.incident_type)));
    out
}

pub fn to_json(counts: &[TypeCount]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&serde_json::json!({
        "unique_types": counts.len(),
        "total": counts.iter().map(|c| c.count).sum::<usize>(),
        "counts": counts,
    }))
}
