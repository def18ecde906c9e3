//! Library-table CSV ingestion with header aliasing and good error
//! messages.

use anyhow::{bail, Context, Result};
use csv::StringRecord;
use pool_types::LibraryRecord;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Canonical input columns. Spreadsheets from different labs name these
/// differently, so each column carries a set of accepted aliases that
/// are matched case-insensitively.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Column {
    Project,
    Library,
    Concentration,
    Volume,
    Barcode,
    FragmentSize,
    EmpiricalNm,
    TargetReads,
}

impl Column {
    pub fn header(&self) -> &'static str {
        match self {
            Column::Project => "Project ID",
            Column::Library => "Library Name",
            Column::Concentration => "Final ng/ul",
            Column::Volume => "Total Volume",
            Column::Barcode => "Barcodes",
            Column::FragmentSize => "Adjusted peak size",
            Column::EmpiricalNm => "Empirical Library nM",
            Column::TargetReads => "Target Reads (M)",
        }
    }

    fn aliases(&self) -> &'static [&'static str] {
        match self {
            Column::Project => &["project id", "project_id", "project", "projectid"],
            Column::Library => &[
                "library name",
                "library_name",
                "library",
                "sample_name",
                "sample",
            ],
            Column::Concentration => &[
                "final ng/ul",
                "final ng/µl",
                "final_ng_ul",
                "concentration",
                "conc",
            ],
            Column::Volume => &["total volume", "total_volume", "volume", "vol"],
            Column::Barcode => &["barcodes", "barcode", "index", "indices"],
            Column::FragmentSize => &[
                "adjusted peak size",
                "adjusted_peak_size",
                "peak_size",
                "fragment_size",
                "size",
            ],
            Column::EmpiricalNm => &[
                "empirical library nm",
                "empirical_library_nm",
                "empirical_nm",
                "qpcr_nm",
            ],
            Column::TargetReads => &[
                "target reads (m)",
                "target_reads_m",
                "target_reads",
                "reads",
            ],
        }
    }

    fn required() -> &'static [Column] {
        &[
            Column::Project,
            Column::Library,
            Column::Concentration,
            Column::Volume,
            Column::Barcode,
            Column::FragmentSize,
            Column::TargetReads,
        ]
    }

    fn match_header(header: &str) -> Option<Column> {
        let normalized = header.trim().to_lowercase();
        [
            Column::Project,
            Column::Library,
            Column::Concentration,
            Column::Volume,
            Column::Barcode,
            Column::FragmentSize,
            Column::EmpiricalNm,
            Column::TargetReads,
        ]
        .into_iter()
        .find(|col| col.aliases().contains(&normalized.as_str()))
    }
}

/// A parsed library table, one row per library, headers resolved to
/// canonical columns.
pub struct LibraryTable {
    col_map: HashMap<Column, usize>,
    rows: Vec<StringRecord>,
}

impl LibraryTable {
    /// Read and header-check a library CSV.
    pub fn open(path: &Path) -> Result<LibraryTable> {
        let file = File::open(path)
            .with_context(|| format!("Error opening library table: {}", path.display()))?;
        let mut reader = csv::Reader::from_reader(BufReader::new(file));

        let mut headers = reader.headers()?.clone();
        headers.trim();
        let mut col_map = HashMap::new();
        for (i, header) in headers.iter().enumerate() {
            if let Some(column) = Column::match_header(header) {
                // First match wins when a file repeats a column.
                col_map.entry(column).or_insert(i);
            }
        }
        let missing: Vec<&str> = Column::required()
            .iter()
            .filter(|col| !col_map.contains_key(col))
            .map(Column::header)
            .collect();
        if !missing.is_empty() {
            bail!(
                "Library table '{}' is missing required columns: {}",
                path.display(),
                missing.join(", ")
            );
        }

        let mut rows = Vec::new();
        for result in reader.records() {
            let mut record = result?;
            record.trim();
            rows.push(record);
        }
        Ok(LibraryTable { col_map, rows })
    }

    fn get<'a>(&self, row: &'a StringRecord, column: Column) -> &'a str {
        self.col_map
            .get(&column)
            .and_then(|&i| row.get(i))
            .unwrap_or("")
    }

    fn parse_number(&self, row: &StringRecord, line: usize, column: Column) -> Result<f64> {
        let value = self.get(row, column);
        value.parse::<f64>().with_context(|| {
            format!(
                "Row {line}, column '{}': expected a number, got '{value}'",
                column.header()
            )
        })
    }

    /// Convert the table into typed records. Structural problems (bad
    /// numbers) fail here; domain thresholds are the validator's job.
    pub fn into_records(self) -> Result<Vec<LibraryRecord>> {
        let mut records = Vec::with_capacity(self.rows.len());
        for (i, row) in self.rows.iter().enumerate() {
            let line = i + 1;
            let empirical = self.get(row, Column::EmpiricalNm);
            let empirical_nm = if empirical.is_empty() {
                None
            } else {
                Some(self.parse_number(row, line, Column::EmpiricalNm)?)
            };
            records.push(LibraryRecord {
                project_id: self.get(row, Column::Project).to_string(),
                library_name: self.get(row, Column::Library).to_string(),
                barcode: self.get(row, Column::Barcode).to_string(),
                concentration_ng_ul: self.parse_number(row, line, Column::Concentration)?,
                fragment_size_bp: self.parse_number(row, line, Column::FragmentSize)?,
                available_volume_ul: self.parse_number(row, line, Column::Volume)?,
                empirical_nm,
                target_weight: self.parse_number(row, line, Column::TargetReads)?,
            });
        }
        Ok(records)
    }
}

/// Read a library CSV straight into typed records.
pub fn read_library_table(path: &Path) -> Result<Vec<LibraryRecord>> {
    LibraryTable::open(path)?.into_records()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_aliased_headers_accepted() {
        let file = write_csv(
            "project,sample,conc,vol,index,size,reads\n\
             P1,L1,1.5,30,ACGT,200,10\n",
        );
        let records = read_library_table(file.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].library_name, "L1");
        assert_eq!(records[0].fragment_size_bp, 200.0);
        assert_eq!(records[0].empirical_nm, None);
    }

    #[test]
    fn test_empirical_column_is_optional_per_row() {
        let file = write_csv(
            "Project ID,Library Name,Final ng/ul,Total Volume,Barcodes,Adjusted peak size,Empirical Library nM,Target Reads (M)\n\
             P1,L1,1.5,30,ACGT,200,12.5,10\n\
             P1,L2,1.5,30,TGCA,200,,10\n",
        );
        let records = read_library_table(file.path()).unwrap();
        assert_eq!(records[0].empirical_nm, Some(12.5));
        assert_eq!(records[1].empirical_nm, None);
    }

    #[test]
    fn test_missing_required_column_is_an_error() {
        let file = write_csv("project,sample,conc,vol,index,size\nP1,L1,1.5,30,ACGT,200\n");
        let err = read_library_table(file.path()).unwrap_err();
        assert!(err.to_string().contains("Target Reads (M)"));
    }

    #[test]
    fn test_bad_number_reports_row_and_column() {
        let file = write_csv(
            "project,sample,conc,vol,index,size,reads\n\
             P1,L1,abc,30,ACGT,200,10\n",
        );
        let err = read_library_table(file.path()).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("Row 1"), "{message}");
        assert!(message.contains("Final ng/ul"), "{message}");
    }
}
