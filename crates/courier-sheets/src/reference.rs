//! Operator-maintained reference data: couriers and the regions they cover.
//!
//! The on-disk header uses the column names the external processor reads.

use crate::error::{Result, SheetsError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Header row of the reference-data file.
pub const REFERENCE_HEADER: [&str; 4] = ["nome_do_motoboy", "cidade", "bairro", "cep"];

/// One courier coverage entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceRecord {
    #[serde(rename = "nome_do_motoboy")]
    pub name: String,
    #[serde(rename = "cidade")]
    pub city: String,
    #[serde(rename = "bairro")]
    pub district: String,
    #[serde(rename = "cep")]
    pub postal_code: String,
}

impl ReferenceRecord {
    pub fn new(
        name: impl Into<String>,
        city: impl Into<String>,
        district: impl Into<String>,
        postal_code: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            city: city.into(),
            district: district.into(),
            postal_code: postal_code.into(),
        }
    }

    fn fields(&self) -> [&str; 4] {
        [&self.name, &self.city, &self.district, &self.postal_code]
    }
}

/// File-backed store of [`ReferenceRecord`]s.
#[derive(Debug, Clone)]
pub struct ReferenceStore {
    path: PathBuf,
}

impl ReferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the file with only the header when it does not exist.
    ///
    /// Returns `true` when the file was created.
    pub fn ensure_exists(&self) -> Result<bool> {
        if self.path.exists() {
            return Ok(false);
        }
        self.write_all(&[])?;
        info!("Reference data file created at {}", self.path.display());
        Ok(true)
    }

    /// Read every record in file order. Short rows read missing fields as empty.
    pub fn read_all(&self) -> Result<Vec<ReferenceRecord>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)?;

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row?;
            if row.iter().all(str::is_empty) {
                continue;
            }
            let field = |i: usize| row.get(i).unwrap_or_default().to_string();
            records.push(ReferenceRecord {
                name: field(0),
                city: field(1),
                district: field(2),
                postal_code: field(3),
            });
        }

        debug!("Read {} reference records", records.len());
        Ok(records)
    }

    /// Replace the whole file with `records`.
    pub fn write_all(&self, records: &[ReferenceRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("csv.tmp");
        {
            let mut writer = csv::Writer::from_path(&tmp)?;
            writer.write_record(REFERENCE_HEADER)?;
            for record in records {
                writer.write_record(record.fields())?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Add a record at the end.
    pub fn append(&self, record: ReferenceRecord) -> Result<()> {
        let mut records = self.read_or_empty()?;
        records.push(record);
        self.write_all(&records)
    }

    /// Overwrite the record at `index`.
    pub fn replace(&self, index: usize, record: ReferenceRecord) -> Result<()> {
        let mut records = self.read_or_empty()?;
        let len = records.len();
        let slot = records
            .get_mut(index)
            .ok_or(SheetsError::IndexOutOfRange { index, len })?;
        *slot = record;
        self.write_all(&records)
    }

    /// Delete the record at `index` and return it.
    pub fn remove(&self, index: usize) -> Result<ReferenceRecord> {
        let mut records = self.read_or_empty()?;
        if index >= records.len() {
            return Err(SheetsError::IndexOutOfRange {
                index,
                len: records.len(),
            });
        }
        let removed = records.remove(index);
        self.write_all(&records)?;
        Ok(removed)
    }

    fn read_or_empty(&self) -> Result<Vec<ReferenceRecord>> {
        if self.path.exists() {
            self.read_all()
        } else {
            Ok(Vec::new())
        }
    }
}
