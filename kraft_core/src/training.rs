//! Active training session lifecycle.
//!
//! At most one session exists, stored under a fixed key. Starting a session
//! snapshots the catalog; ending it deletes the record. No history is kept.

use crate::store::{Document, Storage, CURRENT_TRAINING_KEY};
use crate::{EntryId, Load, Result, SessionEntry, TrainingSession};
use chrono::Utc;

/// New values for one session entry
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SessionUpdate {
    pub weight: f64,
    pub completed: bool,
    pub plates: u8,
}

impl Storage {
    /// Snapshot the catalog into a fresh session, replacing any existing one
    pub fn start(&self) -> Result<TrainingSession> {
        let session = self.write(|doc| {
            let session = TrainingSession {
                active: true,
                started_at: Utc::now(),
                entries: doc
                    .sorted_entries()
                    .iter()
                    .map(SessionEntry::snapshot)
                    .collect(),
            };
            if doc.current_training().is_some() {
                tracing::info!("Replacing training session that was still in progress");
            }
            doc.training
                .insert(CURRENT_TRAINING_KEY.to_string(), session.clone());
            Ok(session)
        })?;

        tracing::info!("Started training with {} entries", session.entries.len());
        Ok(session)
    }

    /// The session in progress, if any
    pub fn current(&self) -> Result<Option<TrainingSession>> {
        self.read(|doc| active_session(doc).cloned())
    }

    /// Update weight, plates and completion of one session entry.
    ///
    /// With `persist_to_catalog`, the new load is also written to the
    /// matching catalog exercise in the same transaction. Returns `None` when
    /// there is no session or the entry is not part of it. The plate count
    /// is only checked once the target exercise is found.
    pub fn update_session_entry(
        &self,
        id: EntryId,
        update: SessionUpdate,
        persist_to_catalog: bool,
    ) -> Result<Option<TrainingSession>> {
        self.write(|doc| {
            self.apply_update(
                doc,
                id,
                Some((update.weight, update.plates)),
                update.completed,
                persist_to_catalog,
            )
        })
    }

    /// Toggle completion of a session entry, keeping its current load
    pub fn set_completed(
        &self,
        id: EntryId,
        completed: bool,
        persist_to_catalog: bool,
    ) -> Result<Option<TrainingSession>> {
        self.write(|doc| self.apply_update(doc, id, None, completed, persist_to_catalog))
    }

    /// Apply `load` (weight, plates) and `completed` to one entry of the
    /// active session
    fn apply_update(
        &self,
        doc: &mut Document,
        id: EntryId,
        load: Option<(f64, u8)>,
        completed: bool,
        persist_to_catalog: bool,
    ) -> Result<Option<TrainingSession>> {
        let Some(session) = doc.current_training_mut().filter(|s| s.active) else {
            tracing::debug!("No active training, ignoring update of {}", id);
            return Ok(None);
        };
        let Some(entry) = session.entries.iter_mut().find(|e| e.id == id) else {
            tracing::debug!("Entry {} is not part of the training, ignoring update", id);
            return Ok(None);
        };

        let mut persisted = None;
        if !entry.kind.is_header() {
            if let Some((weight, plates)) = load {
                entry.load = Some(Load::new(weight, self.validate_plates(plates)?));
            }
            entry.completed = Some(completed);
            persisted = entry.load;
        }
        let snapshot = session.clone();

        if let (true, Some(load)) = (persist_to_catalog, persisted) {
            match doc.record_mut(id) {
                Some(record) => {
                    record.set_load(load);
                    record.updated_at = Some(Utc::now());
                    tracing::debug!("Remembered {} kg for entry {}", load.base_weight, id);
                }
                None => tracing::warn!(
                    "Entry {} no longer exists in the catalog, weight not remembered",
                    id
                ),
            }
        }

        Ok(Some(snapshot))
    }

    /// Delete the session record entirely
    pub fn end(&self) -> Result<()> {
        let removed = self.write(|doc| Ok(doc.training.remove(CURRENT_TRAINING_KEY)))?;
        match removed {
            Some(session) => {
                let progress = session.progress();
                tracing::info!(
                    "Ended training ({} of {} exercises completed)",
                    progress.completed,
                    progress.total
                );
            }
            None => tracing::debug!("No training session to end"),
        }
        Ok(())
    }
}

fn active_session(doc: &Document) -> Option<&TrainingSession> {
    doc.current_training().filter(|s| s.active)
}
