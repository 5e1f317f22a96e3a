pub mod entries;
pub mod text;

use thiserror::Error;

use crate::table::RawRecord;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to parse HTML: {0}")]
    Parse(String),
}

/// Listing page markup → one record per reported incident, in page order.
pub fn extract_records(html: &str) -> Result<Vec<RawRecord>, ExtractError> {
    let entries = entries::find_entries(html)?;
    Ok(entries.iter().flat_map(|e| e.records()).collect())
}
