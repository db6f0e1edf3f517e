//! Processed delivery reports.
//!
//! The processor writes one `.xlsx` per run into the output directory. The
//! first sheet carries one delivery per row under fixed column names.

use crate::cell::cell_text;
use crate::error::{Result, SheetsError};
use calamine::{open_workbook_auto, Data, Range, Reader};
use courier_core::CodeNamespace;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Assignee shown for deliveries the processor could not assign.
pub const UNASSIGNED: &str = "SEM MOTOBOY";

const COL_ASSIGNEE: &str = "MOTOBOY";
const COL_POSTAL_CODE: &str = "CEP";
const COL_DISTRICT: &str = "BAIRRO";
const COL_CITY: &str = "CIDADE";
const COL_STREET: &str = "LOGRADOURO";
const COL_NUMBER: &str = "NÚMERO";

/// One delivery row of a processed report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryRecord {
    pub primary_code: String,
    pub alternate_code: String,
    pub assignee: String,
    pub postal_code: String,
    pub district: String,
    pub city: String,
    pub street: String,
    pub number: String,
}

/// Most recently modified `.xlsx` in `dir`, or `None` when there is none.
pub fn newest_report(dir: &Path) -> Result<Option<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for entry in entries {
        let path = entry?.path();
        let is_report = path.is_file()
            && path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx"));
        if !is_report {
            continue;
        }
        let modified = fs::metadata(&path)?.modified()?;
        if newest.as_ref().map_or(true, |(best, _)| modified > *best) {
            newest = Some((modified, path));
        }
    }

    Ok(newest.map(|(_, path)| path))
}

/// First sheet of a processed report, as text cells.
#[derive(Debug, Clone)]
pub struct DeliveryReport {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl DeliveryReport {
    pub fn open(path: &Path) -> Result<Self> {
        let open_err = |source| SheetsError::Open {
            path: path.to_path_buf(),
            source,
        };

        let mut book = open_workbook_auto(path).map_err(open_err)?;
        let sheet = book
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| SheetsError::EmptyWorkbook {
                path: path.to_path_buf(),
            })?;
        let range = book.worksheet_range(&sheet).map_err(open_err)?;
        Ok(Self::from_range(&range))
    }

    pub fn from_range(range: &Range<Data>) -> Self {
        let mut rows = range
            .rows()
            .map(|row| row.iter().map(cell_text).collect::<Vec<_>>());
        let header = rows
            .next()
            .unwrap_or_default()
            .into_iter()
            .map(|h| h.trim().to_string())
            .collect();

        Self {
            header,
            rows: rows.collect(),
        }
    }

    /// Number of delivery rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn column(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }

    /// First row whose `namespace` column equals `code`, ignoring case and
    /// surrounding whitespace.
    ///
    /// Reports may repeat a code; the earliest row is returned as-is, with no
    /// attempt to pick between duplicates.
    pub fn find(&self, code: &str, namespace: CodeNamespace) -> Option<DeliveryRecord> {
        let wanted = code.trim().to_uppercase();
        let column = self.column(namespace.column())?;

        self.rows
            .iter()
            .find(|row| {
                row.get(column)
                    .is_some_and(|cell| cell.trim().to_uppercase() == wanted)
            })
            .map(|row| self.record(row))
    }

    fn record(&self, row: &[String]) -> DeliveryRecord {
        let get = |name: &str| {
            self.column(name)
                .and_then(|i| row.get(i))
                .map(|s| s.trim().to_string())
                .unwrap_or_default()
        };

        let assignee = get(COL_ASSIGNEE);
        DeliveryRecord {
            primary_code: get(CodeNamespace::Primary.column()),
            alternate_code: get(CodeNamespace::Alternate.column()),
            assignee: if assignee.is_empty() {
                UNASSIGNED.to_string()
            } else {
                assignee
            },
            postal_code: get(COL_POSTAL_CODE),
            district: get(COL_DISTRICT),
            city: get(COL_CITY),
            street: get(COL_STREET),
            number: get(COL_NUMBER),
        }
    }
}
