//! Catalog export and import.
//!
//! The backup format is a versioned JSON document:
//!
//! ```json
//! {
//!   "version": "1.0",
//!   "exportDate": "2024-05-01T18:30:00Z",
//!   "exercises": [
//!     { "name": "Legs", "type": "header", "order": 0 },
//!     { "name": "Squat", "type": "exercise", "weight": 40.0, "additionalPlates": 1, "order": 1 }
//!   ]
//! }
//! ```

use crate::catalog::{insert_record, validate_name};
use crate::store::Storage;
use crate::{parse_weight, CatalogEntry, EntryKind, Error, Load, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::Write;
use std::path::Path;

pub const EXPORT_VERSION: &str = "1.0";

/// Largest stored order accepted on import, in either direction
pub const MAX_IMPORT_ORDER: i64 = 1_000_000_000;

/// Exported catalog
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub version: String,
    pub export_date: DateTime<Utc>,
    pub exercises: Vec<ExportEntry>,
}

/// One exported catalog entry. Headers carry no weight fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_plates: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

impl From<&CatalogEntry> for ExportEntry {
    fn from(entry: &CatalogEntry) -> Self {
        ExportEntry {
            name: entry.name.clone(),
            kind: entry.kind,
            weight: entry.load.map(|l| l.base_weight),
            additional_plates: entry.load.map(|l| l.additional_plates),
            order: Some(entry.order),
        }
    }
}

/// Outcome of an import
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
    pub total: usize,
}

/// A CSV row for spreadsheet export
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    order: i64,
    #[serde(rename = "type")]
    kind: EntryKind,
    name: &'a str,
    weight: Option<f64>,
    additional_plates: Option<u8>,
}

impl<'a> From<&'a CatalogEntry> for CsvRow<'a> {
    fn from(entry: &'a CatalogEntry) -> Self {
        CsvRow {
            order: entry.order,
            kind: entry.kind,
            name: &entry.name,
            weight: entry.load.map(|l| l.base_weight),
            additional_plates: entry.load.map(|l| l.additional_plates),
        }
    }
}

/// Suggested file name for a backup taken on `date`
pub fn backup_file_name(date: NaiveDate) -> String {
    format!("krafttraining-backup-{}.json", date.format("%Y-%m-%d"))
}

impl Storage {
    /// Snapshot the catalog as a backup document
    pub fn export(&self) -> Result<ExportDocument> {
        let entries = self.list_all()?;
        Ok(ExportDocument {
            version: EXPORT_VERSION.to_string(),
            export_date: Utc::now(),
            exercises: entries.iter().map(ExportEntry::from).collect(),
        })
    }

    /// Write a pretty-printed backup document to `path`
    pub fn write_export(&self, path: &Path) -> Result<ExportDocument> {
        let document = self.export()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&document)?;
        std::fs::write(path, contents)?;
        tracing::info!("Exported {} entries to {:?}", document.exercises.len(), path);
        Ok(document)
    }

    /// Write the catalog as CSV; returns the number of rows
    pub fn export_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let entries = self.list_all()?;
        let mut writer = csv::Writer::from_writer(writer);
        for entry in &entries {
            writer.serialize(CsvRow::from(entry))?;
        }
        writer.flush()?;
        Ok(entries.len())
    }

    /// Recreate the entries of a backup document in the catalog.
    ///
    /// Every entry gets a new id; existing entries are never overwritten.
    /// Entries with an empty name, or that fail validation, are skipped and
    /// counted. Stored orders are shifted so the smallest one lands at the
    /// end of the current catalog, keeping their relative order. The whole
    /// import commits as one transaction.
    pub fn import(&self, document: &Value) -> Result<ImportSummary> {
        let entries = document
            .get("exercises")
            .ok_or_else(|| Error::Format("missing 'exercises' field".into()))?
            .as_array()
            .ok_or_else(|| Error::Format("'exercises' must be an array".into()))?;

        let mut summary = ImportSummary {
            total: entries.len(),
            ..ImportSummary::default()
        };

        let mut parsed = Vec::with_capacity(entries.len());
        for (index, value) in entries.iter().enumerate() {
            match parse_entry(value, self) {
                Ok(entry) => parsed.push((index, entry)),
                Err(reason) => {
                    tracing::warn!("Skipping import entry {}: {}", index, reason);
                    summary.skipped += 1;
                }
            }
        }
        let min_order = parsed.iter().filter_map(|(_, (.., order))| *order).min();

        let summary = self.write(|doc| {
            let base_order = doc.next_order();
            let mut summary = summary;

            for (index, (kind, name, load, order)) in parsed {
                let inserted = match (order, min_order) {
                    (Some(order), Some(min)) => base_order
                        .as_ref()
                        .map_err(Error::to_string)
                        .and_then(|base| {
                            base.checked_add(order - min)
                                .ok_or_else(|| format!("order {} leaves no room in the catalog", order))
                        })
                        .and_then(|order| {
                            insert_record(doc, kind, name, load, Some(order)).map_err(|e| e.to_string())
                        }),
                    _ => insert_record(doc, kind, name, load, None).map_err(|e| e.to_string()),
                };

                match inserted {
                    Ok(_) => summary.imported += 1,
                    Err(reason) => {
                        tracing::warn!("Skipping import entry {}: {}", index, reason);
                        summary.skipped += 1;
                    }
                }
            }
            Ok(summary)
        })?;

        tracing::info!(
            "Imported {} of {} entries ({} skipped)",
            summary.imported,
            summary.total,
            summary.skipped
        );
        Ok(summary)
    }

    /// Import from backup JSON text
    pub fn import_str(&self, json: &str) -> Result<ImportSummary> {
        let document: Value = serde_json::from_str(json)
            .map_err(|e| Error::Format(format!("not valid JSON: {}", e)))?;
        self.import(&document)
    }

    /// Import a backup file
    pub fn import_file(&self, path: &Path) -> Result<ImportSummary> {
        let contents = std::fs::read_to_string(path)?;
        self.import_str(&contents)
    }
}

type ParsedEntry = (EntryKind, String, Option<Load>, Option<i64>);

fn parse_entry(value: &Value, storage: &Storage) -> std::result::Result<ParsedEntry, String> {
    let object = value.as_object().ok_or("entry is not an object")?;

    let name = match object.get("name") {
        Some(Value::String(name)) => validate_name(name).map_err(|e| e.to_string())?,
        Some(Value::Null) | None => return Err("missing name".into()),
        Some(_) => return Err("name is not text".into()),
    };

    let kind = match object.get("type").and_then(Value::as_str) {
        Some("header") => EntryKind::Header,
        _ => EntryKind::Exercise,
    };

    let load = match kind {
        EntryKind::Header => None,
        EntryKind::Exercise => {
            let weight = object.get("weight").map_or(0.0, weight_value);
            let plates = match object.get("additionalPlates").and_then(Value::as_u64) {
                Some(p) => u8::try_from(p).map_err(|_| format!("{} plates is out of range", p))?,
                None => 0,
            };
            let plates = storage.validate_plates(plates).map_err(|e| e.to_string())?;
            Some(Load::new(weight, plates))
        }
    };

    let order = match object.get("order").and_then(Value::as_i64) {
        Some(order) if !(-MAX_IMPORT_ORDER..=MAX_IMPORT_ORDER).contains(&order) => {
            return Err(format!("order {} is out of range", order));
        }
        order => order,
    };

    Ok((kind, name, load, order))
}

/// Weights may be numbers or user-typed text
fn weight_value(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().map_or(0.0, Load::coerce_weight),
        Value::String(s) => parse_weight(s),
        _ => 0.0,
    }
}
