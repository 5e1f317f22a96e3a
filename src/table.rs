use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

use crate::segmenter::Segmenter;

pub const DATE_COLUMN: &str = "date";
pub const DESCRIPTION_COLUMN: &str = "description";
pub const INCIDENT_TYPE_COLUMN: &str = "incident_type";
pub const CLEAN_DESCRIPTION_COLUMN: &str = "clean_description";

#[derive(Debug, Error)]
pub enum TableError {
    #[error(
        "CSV file must contain a '{column}' column (available columns: {})",
        .available.join(", ")
    )]
    MissingColumn {
        column: &'static str,
        available: Vec<String>,
    },
    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

impl TableError {
    fn csv(path: &Path, source: csv::Error) -> Self {
        TableError::Csv {
            path: path.display().to_string(),
            source,
        }
    }
}

/// One incident as it appears on the beat page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    pub date: String,
    /// `None` when the description cell is empty.
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedRecord {
    pub date: String,
    pub description: Option<String>,
    pub incident_type: String,
    pub clean_description: Option<String>,
}

/// A loaded input table. Every input column is carried through untouched so
/// the annotated output can reproduce it.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<RawRow>,
}

#[derive(Debug, Clone)]
pub struct RawRow {
    pub fields: Vec<String>,
    pub record: RawRecord,
}

#[derive(Debug, Clone)]
pub struct AnnotatedTable {
    pub columns: Vec<String>,
    pub rows: Vec<AnnotatedRow>,
}

#[derive(Debug, Clone)]
pub struct AnnotatedRow {
    pub fields: Vec<String>,
    pub record: AnnotatedRecord,
}

impl RawTable {
    /// Build a `date,description` table straight from scraped records.
    pub fn from_records(records: Vec<RawRecord>) -> Self {
        let rows = records
            .into_iter()
            .map(|record| RawRow {
                fields: vec![
                    record.date.clone(),
                    record.description.clone().unwrap_or_default(),
                ],
                record,
            })
            .collect();
        RawTable {
            columns: vec![DATE_COLUMN.to_string(), DESCRIPTION_COLUMN.to_string()],
            rows,
        }
    }
}

impl AnnotatedTable {
    pub fn records(&self) -> impl Iterator<Item = &AnnotatedRecord> {
        self.rows.iter().map(|r| &r.record)
    }
}

/// Write scraped records with a `date,description` header.
pub fn save_raw(path: &Path, records: &[RawRecord]) -> Result<(), TableError> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| TableError::csv(path, e))?;
    for record in records {
        wtr.serialize(record).map_err(|e| TableError::csv(path, e))?;
    }
    if records.is_empty() {
        wtr.write_record([DATE_COLUMN, DESCRIPTION_COLUMN])
            .map_err(|e| TableError::csv(path, e))?;
    }
    wtr.flush().map_err(|source| TableError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(())
}

/// Load a headed CSV and validate that it has a `description` column.
///
/// `date` is optional. Columns produced by an earlier cleaning run are
/// dropped so re-cleaning a cleaned file replaces them instead of appending
/// a second copy.
pub fn load_raw(path: &Path) -> Result<RawTable, TableError> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| TableError::csv(path, e))?;
    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| TableError::csv(path, e))?
        .iter()
        .map(str::to_string)
        .collect();

    let description_idx = headers
        .iter()
        .position(|h| h == DESCRIPTION_COLUMN)
        .ok_or_else(|| TableError::MissingColumn {
            column: DESCRIPTION_COLUMN,
            available: headers.clone(),
        })?;
    let date_idx = headers.iter().position(|h| h == DATE_COLUMN);
    let keep: Vec<usize> = (0..headers.len())
        .filter(|&i| !is_derived_column(&headers[i]))
        .collect();

    let mut rows = Vec::new();
    for result in rdr.records() {
        let row = result.map_err(|e| TableError::csv(path, e))?;
        let cell = |idx: usize| row.get(idx).unwrap_or_default().to_string();
        let description = cell(description_idx);
        rows.push(RawRow {
            fields: keep.iter().map(|&i| cell(i)).collect(),
            record: RawRecord {
                date: date_idx.map(cell).unwrap_or_default(),
                description: (!description.is_empty()).then_some(description),
            },
        });
    }

    let columns: Vec<String> = keep.iter().map(|&i| headers[i].clone()).collect();
    info!(
        "Loaded {} with {} rows and columns: {}",
        path.display(),
        rows.len(),
        columns.join(", ")
    );
    Ok(RawTable { columns, rows })
}

fn is_derived_column(name: &str) -> bool {
    name == INCIDENT_TYPE_COLUMN || name == CLEAN_DESCRIPTION_COLUMN
}

/// Run the segmenter over every row, preserving row order.
pub fn annotate_table(table: RawTable, segmenter: &Segmenter) -> AnnotatedTable {
    let rows = table
        .rows
        .into_iter()
        .map(|row| AnnotatedRow {
            fields: row.fields,
            record: segmenter.annotate(row.record),
        })
        .collect();
    AnnotatedTable {
        columns: table.columns,
        rows,
    }
}

/// Write all input columns plus `incident_type` and `clean_description`.
pub fn save_annotated(path: &Path, table: &AnnotatedTable) -> Result<(), TableError> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| TableError::csv(path, e))?;
    let mut header = table.columns.clone();
    header.push(INCIDENT_TYPE_COLUMN.to_string());
    header.push(CLEAN_DESCRIPTION_COLUMN.to_string());
    wtr.write_record(&header).map_err(|e| TableError::csv(path, e))?;

    for row in &table.rows {
        let mut out = row.fields.clone();
        out.push(row.record.incident_type.clone());
        out.push(row.record.clean_description.clone().unwrap_or_default());
        wtr.write_record(&out).map_err(|e| TableError::csv(path, e))?;
    }
    wtr.flush().map_err(|source| TableError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(())
}

/// Load a cleaned file back as typed records.
pub fn load_annotated(path: &Path) -> Result<Vec<AnnotatedRecord>, TableError> {
    let mut rdr = csv::Reader::from_path(path).map_err(|e| TableError::csv(path, e))?;
    let headers = rdr.headers().map_err(|e| TableError::csv(path, e))?.clone();
    for column in [DATE_COLUMN, DESCRIPTION_COLUMN, INCIDENT_TYPE_COLUMN] {
        if !headers.iter().any(|h| h == column) {
            return Err(TableError::MissingColumn {
                column,
                available: headers.iter().map(str::to_string).collect(),
            });
        }
    }
    rdr.deserialize()
        .collect::<Result<Vec<AnnotatedRecord>, _>>()
        .map_err(|e| TableError::csv(path, e))
}

/// Annotate a loaded table and save it. A save failure is logged and the
/// annotated table is still returned so the caller can retry the write.
pub fn clean_table(table: RawTable, output: &Path, segmenter: &Segmenter) -> AnnotatedTable {
    let annotated = annotate_table(table, segmenter);
    match save_annotated(output, &annotated) {
        Ok(()) => info!("Saved cleaned data to {}", output.display()),
        Err(e) => error!("Error saving {}: {}", output.display(), e),
    }
    annotated
}

/// Load, annotate and save in one step. A load failure, including a missing
/// `description` column, aborts before any row is processed.
pub fn process_file(
    input: &Path,
    output: &Path,
    segmenter: &Segmenter,
) -> Result<AnnotatedTable, TableError> {
    let table = load_raw(input)?;
    Ok(clean_table(table, output, segmenter))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmenter::{OTHER, UNCATEGORIZED};

    fn write(dir: &tempfile::TempDir, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn raw_records_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw.csv");
        let records = vec![
            RawRecord {
                date: "Feb. 1, 2024".into(),
                description: Some("Theft, a bike was taken".into()),
            },
            RawRecord {
                date: "Feb. 2, 2024".into(),
                description: Some("Medical \"quoted\" text".into()),
            },
        ];
        save_raw(&path, &records).unwrap();
        let table = load_raw(&path).unwrap();
        assert_eq!(table.columns, vec!["date", "description"]);
        let loaded: Vec<_> = table.rows.into_iter().map(|r| r.record).collect();
        assert_eq!(loaded, records);
    }

    #[test]
    fn empty_scrape_still_writes_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw.csv");
        save_raw(&path, &[]).unwrap();
        let table = load_raw(&path).unwrap();
        assert!(table.rows.is_empty());
        assert_eq!(table.columns, vec!["date", "description"]);
    }

    #[test]
    fn missing_description_column_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "bad.csv", "date,text\nJan 1,Theft stuff\n");
        let err = load_raw(&path).unwrap_err();
        match err {
            TableError::MissingColumn { column, available } => {
                assert_eq!(column, "description");
                assert_eq!(available, vec!["date", "text"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_cell_is_missing_description() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "in.csv", "date,description\nJan 1,\n");
        let table = load_raw(&path).unwrap();
        assert_eq!(table.rows[0].record.description, None);
    }

    #[test]
    fn process_file_keeps_extra_columns_and_order() {
        let dir = tempfile::tempdir().unwrap();
        let input = write(
            &dir,
            "in.csv",
            "id,date,description\n7,Jan 1,Theft - Wallet stolen\n8,Jan 2,\n9,Jan 3,quiet night\n",
        );
        let output = dir.path().join("out.csv");
        let table = process_file(&input, &output, &Segmenter::default()).unwrap();

        let types: Vec<_> = table.records().map(|r| r.incident_type.as_str()).collect();
        assert_eq!(types, vec!["Theft", OTHER, UNCATEGORIZED]);

        let written = std::fs::read_to_string(&output).unwrap();
        let lines: Vec<_> = written.lines().collect();
        assert_eq!(lines[0], "id,date,description,incident_type,clean_description");
        assert_eq!(lines[1], "7,Jan 1,Theft - Wallet stolen,Theft,Wallet stolen");
        assert_eq!(lines[2], "8,Jan 2,,Other,");
        assert_eq!(lines[3], "9,Jan 3,quiet night,Uncategorized,quiet night");
    }

    #[test]
    fn recleaning_replaces_derived_columns() {
        let dir = tempfile::tempdir().unwrap();
        let input = write(
            &dir,
            "in.csv",
            "date,description,incident_type,clean_description\nJan 1,DUI Driver stopped,Old,old\n",
        );
        let output = dir.path().join("out.csv");
        process_file(&input, &output, &Segmenter::default()).unwrap();
        let written = std::fs::read_to_string(&output).unwrap();
        let lines: Vec<_> = written.lines().collect();
        assert_eq!(lines[0], "date,description,incident_type,clean_description");
        assert_eq!(lines[1], "Jan 1,DUI Driver stopped,DUI,Driver stopped");
    }

    #[test]
    fn write_failure_still_returns_table() {
        let dir = tempfile::tempdir().unwrap();
        let input = write(&dir, "in.csv", "date,description\nJan 1,Theft - Wallet\n");
        let output = dir.path().join("missing-dir").join("out.csv");
        let table = process_file(&input, &output, &Segmenter::default()).unwrap();
        assert_eq!(table.rows.len(), 1);
        assert!(!output.exists());
    }

    #[test]
    fn table_from_scraped_records() {
        let table = RawTable::from_records(vec![RawRecord {
            date: "Mar. 4, 2024".into(),
            description: Some("Alarm Panic button pressed".into()),
        }]);
        let annotated = annotate_table(table, &Segmenter::default());
        assert_eq!(annotated.columns, vec!["date", "description"]);
        assert_eq!(annotated.rows[0].fields, vec!["Mar. 4, 2024", "Alarm Panic button pressed"]);
        assert_eq!(annotated.rows[0].record.incident_type, "Alarm");
    }

    #[test]
    fn annotated_file_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let input = write(&dir, "in.csv", "date,description\nJan 1,Fraud Gift card scam\nJan 2,\n");
        let output = dir.path().join("out.csv");
        process_file(&input, &output, &Segmenter::default()).unwrap();
        let records = load_annotated(&output).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].incident_type, "Fraud");
        assert_eq!(records[0].clean_description.as_deref(), Some("Gift card scam"));
        assert_eq!(records[1].description, None);
        assert_eq!(records[1].clean_description, None);
    }
}
