//! Spreadsheet to canonical delimited text.
//!
//! The first sheet of the downloaded workbook becomes a comma-delimited UTF-8
//! file. Output is written next to its destination and renamed into place, so
//! a failed conversion never leaves a canonical file behind.

use crate::cell::cell_text;
use crate::error::{Result, SheetsError};
use calamine::{open_workbook_auto, Data, Range, Reader};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Fixed name of the canonical file inside the download directory.
pub const CANONICAL_FILE_NAME: &str = "deliveries.csv";

/// A canonical file produced by [`convert_workbook`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalFile {
    pub path: PathBuf,
    /// Name of the sheet the rows came from
    pub sheet: String,
    /// Data rows, header excluded
    pub rows: usize,
}

/// Convert the first sheet of `workbook` into delimited text at `destination`.
pub fn convert_workbook(workbook: &Path, destination: &Path) -> Result<CanonicalFile> {
    let open_err = |source| SheetsError::Open {
        path: workbook.to_path_buf(),
        source,
    };

    let mut book = open_workbook_auto(workbook).map_err(open_err)?;
    let sheet = book
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| SheetsError::EmptyWorkbook {
            path: workbook.to_path_buf(),
        })?;
    let range = book.worksheet_range(&sheet).map_err(open_err)?;
    debug!(
        "Read sheet '{}' from {} ({} rows)",
        sheet,
        workbook.display(),
        range.height()
    );

    let rows = write_range(&range, destination)?;
    info!(
        "Canonical file written to {} ({} data rows)",
        destination.display(),
        rows
    );

    Ok(CanonicalFile {
        path: destination.to_path_buf(),
        sheet,
        rows,
    })
}

/// Write every row of `range` to `destination`; returns the data row count.
pub fn write_range(range: &Range<Data>, destination: &Path) -> Result<usize> {
    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp = temp_sibling(destination);
    let written = write_rows(range, &tmp);
    match written {
        Ok(count) => {
            fs::rename(&tmp, destination)?;
            Ok(count)
        }
        Err(e) => {
            let _ = fs::remove_file(&tmp);
            Err(e)
        }
    }
}

fn write_rows(range: &Range<Data>, path: &Path) -> Result<usize> {
    let mut writer = csv::WriterBuilder::new().flexible(true).from_path(path)?;
    let mut count = 0usize;
    for row in range.rows() {
        writer.write_record(row.iter().map(cell_text))?;
        count += 1;
    }
    writer.flush()?;
    Ok(count.saturating_sub(1))
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_range() -> Range<Data> {
        let mut range = Range::new((0, 0), (2, 3));
        range.set_value((0, 0), Data::String("pacote".to_string()));
        range.set_value((0, 1), Data::String("etiqueta".to_string()));
        range.set_value((0, 2), Data::String("CEP".to_string()));
        range.set_value((0, 3), Data::String("Entregue".to_string()));

        range.set_value((1, 0), Data::Float(4_501_234.0));
        range.set_value((1, 1), Data::String("BR1029".to_string()));
        range.set_value((1, 2), Data::String("80240-000".to_string()));
        range.set_value((1, 3), Data::Bool(false));

        range.set_value((2, 0), Data::Int(4_501_235));
        range.set_value((2, 1), Data::String("BR1030, lote 2".to_string()));
        range.set_value((2, 3), Data::Bool(true));
        range
    }

    #[test]
    fn test_write_range() {
        let tmp = TempDir::new().expect("create temp dir");
        let dest = tmp.path().join(CANONICAL_FILE_NAME);

        let rows = write_range(&sample_range(), &dest).expect("write canonical file");
        assert_eq!(rows, 2);

        let text = fs::read_to_string(&dest).expect("read canonical file");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "pacote,etiqueta,CEP,Entregue");
        assert_eq!(lines[1], "4501234,BR1029,80240-000,FALSE");
        assert_eq!(lines[2], "4501235,\"BR1030, lote 2\",,TRUE");
        assert!(!tmp.path().join("deliveries.csv.tmp").exists());
    }

    #[test]
    fn test_write_range_overwrites() {
        let tmp = TempDir::new().expect("create temp dir");
        let dest = tmp.path().join(CANONICAL_FILE_NAME);
        fs::write(&dest, "stale\ncontent\nfrom\nprevious\nrun\n").expect("seed stale file");

        write_range(&sample_range(), &dest).expect("write canonical file");
        let text = fs::read_to_string(&dest).expect("read canonical file");
        assert_eq!(text.lines().count(), 3);
        assert!(!text.contains("stale"));
    }

    #[test]
    fn test_unreadable_workbook_leaves_no_output() {
        let tmp = TempDir::new().expect("create temp dir");
        let source = tmp.path().join("report.xlsx");
        fs::write(&source, b"this is not a zip archive").expect("write bogus workbook");
        let dest = tmp.path().join(CANONICAL_FILE_NAME);

        let err = convert_workbook(&source, &dest).unwrap_err();
        assert!(matches!(err, SheetsError::Open { .. }));
        assert!(!dest.exists());
    }

    #[test]
    fn test_missing_workbook() {
        let tmp = TempDir::new().expect("create temp dir");
        let err = convert_workbook(
            &tmp.path().join("absent.xlsx"),
            &tmp.path().join(CANONICAL_FILE_NAME),
        )
        .unwrap_err();
        assert!(matches!(err, SheetsError::Open { .. }));
    }
}
