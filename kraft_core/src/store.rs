//! File-backed document store with locked, atomic transactions.
//!
//! Both collections (the exercise catalog and the training singleton) live
//! in one JSON document, `<data_dir>/kraft.json`. Readers take a shared lock
//! on the sidecar `kraft.lock`; writers take an exclusive lock for the whole
//! read-modify-write and commit by atomically replacing the document.

use crate::migration::{self, MigrationReport};
use crate::{CatalogEntry, EntryId, EntryKind, Error, Load, Result, TrainingSession};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const DB_NAME: &str = "KrafttrainingDB";
pub const DB_VERSION: u32 = 1;
pub const DB_FILE: &str = "kraft.json";
pub const LOCK_FILE: &str = "kraft.lock";

/// Fixed key of the singleton training record
pub const CURRENT_TRAINING_KEY: &str = "current";

/// Store-wide settings the operations need
#[derive(Clone, Debug, PartialEq)]
pub struct StorageOptions {
    pub plate_increment_kg: f64,
    pub max_additional_plates: u8,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            plate_increment_kg: 2.5,
            max_additional_plates: 2,
        }
    }
}

// ============================================================================
// Persisted layout
// ============================================================================

/// A catalog record as stored on disk.
///
/// Older records may lack `order` or `type`; the startup migration fills in
/// orders, and a missing type reads as an exercise.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct ExerciseRecord {
    pub id: EntryId,
    #[serde(rename = "type", default)]
    pub kind: EntryKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_plates: Option<u8>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ExerciseRecord {
    pub fn sort_key(&self) -> (i64, EntryId) {
        (self.order.unwrap_or(0), self.id)
    }

    pub fn load(&self) -> Option<Load> {
        match self.kind {
            EntryKind::Header => None,
            EntryKind::Exercise => Some(Load::new(
                self.weight.unwrap_or(0.0),
                self.additional_plates.unwrap_or(0),
            )),
        }
    }

    pub fn set_load(&mut self, load: Load) {
        if self.kind.is_header() {
            return;
        }
        self.weight = Some(load.base_weight);
        self.additional_plates = Some(load.additional_plates);
    }

    pub fn to_entry(&self) -> CatalogEntry {
        CatalogEntry {
            id: self.id,
            kind: self.kind,
            name: self.name.clone(),
            order: self.order.unwrap_or(0),
            load: self.load(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// The whole database document
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct Document {
    pub name: String,
    pub version: u32,
    /// Last id handed out
    #[serde(default)]
    pub next_id: u64,
    #[serde(default)]
    pub exercises: Vec<ExerciseRecord>,
    #[serde(default)]
    pub training: BTreeMap<String, TrainingSession>,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            name: DB_NAME.into(),
            version: DB_VERSION,
            next_id: 0,
            exercises: Vec::new(),
            training: BTreeMap::new(),
        }
    }
}

impl Document {
    pub fn allocate_id(&mut self) -> EntryId {
        self.next_id += 1;
        EntryId(self.next_id)
    }

    /// Max order + 1, or 0 for an empty catalog
    pub fn next_order(&self) -> Result<i64> {
        match self.exercises.iter().filter_map(|r| r.order).max() {
            None => Ok(0),
            Some(max) => max.checked_add(1).ok_or_else(|| {
                Error::Validation(format!("catalog order {} leaves no room to append", max))
            }),
        }
    }

    /// Indices into `exercises`, in catalog order
    pub fn sorted_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..self.exercises.len()).collect();
        indices.sort_by_key(|&i| self.exercises[i].sort_key());
        indices
    }

    pub fn sorted_entries(&self) -> Vec<CatalogEntry> {
        self.sorted_indices()
            .into_iter()
            .map(|i| self.exercises[i].to_entry())
            .collect()
    }

    pub fn record(&self, id: EntryId) -> Option<&ExerciseRecord> {
        self.exercises.iter().find(|r| r.id == id)
    }

    pub fn record_mut(&mut self, id: EntryId) -> Option<&mut ExerciseRecord> {
        self.exercises.iter_mut().find(|r| r.id == id)
    }

    pub fn current_training(&self) -> Option<&TrainingSession> {
        self.training.get(CURRENT_TRAINING_KEY)
    }

    pub fn current_training_mut(&mut self) -> Option<&mut TrainingSession> {
        self.training.get_mut(CURRENT_TRAINING_KEY)
    }
}

// ============================================================================
// Storage handle
// ============================================================================

/// Handle to the local training database.
///
/// Construct once at startup with [`Storage::open`] and pass it to whatever
/// needs it.
#[derive(Debug)]
pub struct Storage {
    db_path: PathBuf,
    lock_path: PathBuf,
    options: StorageOptions,
}

/// Releases the advisory lock when dropped
struct LockGuard(File);

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = self.0.unlock();
    }
}

impl Storage {
    /// Open (or create) the database in `data_dir` and run the startup migration
    pub fn open(data_dir: impl AsRef<Path>, options: StorageOptions) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        std::fs::create_dir_all(data_dir).map_err(|e| Error::unavailable(data_dir, e))?;

        let storage = Self {
            db_path: data_dir.join(DB_FILE),
            lock_path: data_dir.join(LOCK_FILE),
            options,
        };

        let _guard = storage.lock(true)?;
        let exists = storage.db_path.exists();
        let mut doc = storage.load_unlocked()?;
        let report = migration::migrate(&mut doc);

        if !exists || report.changed() {
            storage.save_unlocked(&doc)?;
        }
        log_migration(&report);

        tracing::info!(
            "Opened training database {:?} ({} catalog entries)",
            storage.db_path,
            doc.exercises.len()
        );
        Ok(storage)
    }

    pub fn options(&self) -> &StorageOptions {
        &self.options
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Run `f` against a consistent snapshot of the document
    pub(crate) fn read<T>(&self, f: impl FnOnce(&Document) -> T) -> Result<T> {
        let _guard = self.lock(false)?;
        let doc = self.load_unlocked()?;
        Ok(f(&doc))
    }

    /// Read-modify-write transaction.
    ///
    /// The document is only written if `f` succeeds, and all of its changes
    /// land in a single atomic replace.
    pub(crate) fn write<T>(&self, f: impl FnOnce(&mut Document) -> Result<T>) -> Result<T> {
        let _guard = self.lock(true)?;
        let mut doc = self.load_unlocked()?;
        let value = f(&mut doc)?;
        self.save_unlocked(&doc)?;
        Ok(value)
    }

    fn lock(&self, exclusive: bool) -> Result<LockGuard> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&self.lock_path)
            .map_err(|e| Error::unavailable(&self.lock_path, e))?;

        if exclusive {
            file.lock_exclusive()?;
        } else {
            file.lock_shared()?;
        }
        Ok(LockGuard(file))
    }

    fn load_unlocked(&self) -> Result<Document> {
        if !self.db_path.exists() {
            return Ok(Document::default());
        }

        let file = File::open(&self.db_path).map_err(|e| Error::unavailable(&self.db_path, e))?;
        let doc: Document = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| Error::unavailable(&self.db_path, format!("corrupt database: {}", e)))?;

        if doc.name != DB_NAME {
            return Err(Error::unavailable(
                &self.db_path,
                format!("not a training database (name '{}')", doc.name),
            ));
        }
        if doc.version > DB_VERSION {
            return Err(Error::unavailable(
                &self.db_path,
                format!("database version {} is newer than supported {}", doc.version, DB_VERSION),
            ));
        }

        Ok(doc)
    }

    /// Atomically writes the document by:
    /// 1. Writing to a temp file in the same directory
    /// 2. Syncing to disk
    /// 3. Renaming over the original
    fn save_unlocked(&self, doc: &Document) -> Result<()> {
        let dir = self.db_path.parent().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::Other, "database path missing parent")
        })?;
        let temp = NamedTempFile::new_in(dir)?;

        {
            let mut writer = BufWriter::new(temp.as_file());
            serde_json::to_writer(&mut writer, doc)?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.persist(&self.db_path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved training database to {:?}", self.db_path);
        Ok(())
    }
}

fn log_migration(report: &MigrationReport) {
    if report.repaired_orders > 0 {
        tracing::warn!("Repaired missing order on {} catalog entries", report.repaired_orders);
    }
    if report.stripped_header_weights > 0 {
        tracing::warn!(
            "Dropped weights stored on {} header entries",
            report.stripped_header_weights
        );
    }
    if report.next_id_bumped {
        tracing::warn!("Id counter was behind stored ids and has been advanced");
    }
}
