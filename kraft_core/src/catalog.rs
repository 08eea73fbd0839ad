//! Exercise catalog operations.
//!
//! The catalog is the user's persistent master list of exercises and
//! section headers. Headers and exercises share one ordering space.

use crate::store::{Document, ExerciseRecord, Storage};
use crate::{CatalogEntry, Direction, EntryId, EntryKind, Error, Load, Result};
use chrono::Utc;

/// Trimmed name, or a validation error if nothing is left
pub(crate) fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation("name must not be empty".into()));
    }
    Ok(trimmed.to_string())
}

impl Storage {
    pub(crate) fn validate_plates(&self, plates: u8) -> Result<u8> {
        let max = self.options().max_additional_plates;
        if plates > max {
            return Err(Error::Validation(format!(
                "at most {} additional plates allowed, got {}",
                max, plates
            )));
        }
        Ok(plates)
    }

    /// Append an exercise to the end of the catalog
    pub fn add_exercise(&self, name: &str, weight: f64, plates: u8) -> Result<EntryId> {
        let name = validate_name(name)?;
        let load = Load::new(weight, self.validate_plates(plates)?);

        let id = self.write(|doc| insert_record(doc, EntryKind::Exercise, name, Some(load), None))?;
        tracing::debug!("Added exercise {}", id);
        Ok(id)
    }

    /// Append a section header to the end of the catalog
    pub fn add_header(&self, name: &str) -> Result<EntryId> {
        let name = validate_name(name)?;

        let id = self.write(|doc| insert_record(doc, EntryKind::Header, name, None, None))?;
        tracing::debug!("Added header {}", id);
        Ok(id)
    }

    /// All entries in catalog order (ascending `order`, ties by id)
    pub fn list_all(&self) -> Result<Vec<CatalogEntry>> {
        self.read(|doc| doc.sorted_entries())
    }

    pub fn get(&self, id: EntryId) -> Result<Option<CatalogEntry>> {
        self.read(|doc| doc.record(id).map(ExerciseRecord::to_entry))
    }

    /// Rename an entry and, for exercises, replace its load
    pub fn update(&self, id: EntryId, name: &str, weight: f64, plates: u8) -> Result<CatalogEntry> {
        let entry = self.write(|doc| {
            let record = doc.record_mut(id).ok_or(Error::NotFound(id))?;
            record.name = validate_name(name)?;
            if !record.kind.is_header() {
                record.set_load(Load::new(weight, self.validate_plates(plates)?));
            }
            record.updated_at = Some(Utc::now());
            Ok(record.to_entry())
        })?;

        tracing::debug!("Updated entry {}", id);
        Ok(entry)
    }

    /// Remove an entry. Deleting an unknown id is not an error.
    ///
    /// Returns whether an entry was removed.
    pub fn delete(&self, id: EntryId) -> Result<bool> {
        let removed = self.write(|doc| {
            let before = doc.exercises.len();
            doc.exercises.retain(|r| r.id != id);
            Ok(doc.exercises.len() != before)
        })?;

        if removed {
            tracing::debug!("Deleted entry {}", id);
        } else {
            tracing::debug!("Delete of unknown entry {} ignored", id);
        }
        Ok(removed)
    }

    /// Swap an entry with its neighbour in catalog order.
    ///
    /// Returns `false` without changing anything if the entry is unknown or
    /// already first (Up) / last (Down). Both order writes are committed
    /// together.
    pub fn move_entry(&self, id: EntryId, direction: Direction) -> Result<bool> {
        let moved = self.write(|doc| Ok(swap_with_neighbour(doc, id, direction)))?;
        if moved {
            tracing::debug!("Moved entry {} {:?}", id, direction);
        }
        Ok(moved)
    }

    /// Remove every catalog entry. Ids handed out so far stay retired.
    pub fn clear_all(&self) -> Result<usize> {
        let removed = self.write(|doc| Ok(std::mem::take(&mut doc.exercises).len()))?;
        tracing::info!("Cleared {} catalog entries", removed);
        Ok(removed)
    }
}

/// Create a record at `order`, or at the end of the catalog
pub(crate) fn insert_record(
    doc: &mut Document,
    kind: EntryKind,
    name: String,
    load: Option<Load>,
    order: Option<i64>,
) -> Result<EntryId> {
    let order = match order {
        Some(order) => order,
        None => doc.next_order()?,
    };
    let id = doc.allocate_id();
    let mut record = ExerciseRecord {
        id,
        kind,
        name,
        order: Some(order),
        weight: None,
        additional_plates: None,
        created_at: Some(Utc::now()),
        updated_at: None,
    };
    if let Some(load) = load {
        record.set_load(load);
    }
    doc.exercises.push(record);
    Ok(id)
}

fn swap_with_neighbour(doc: &mut Document, id: EntryId, direction: Direction) -> bool {
    let sorted = doc.sorted_indices();
    let Some(pos) = sorted.iter().position(|&i| doc.exercises[i].id == id) else {
        return false;
    };

    let target = match direction {
        Direction::Up => pos.checked_sub(1),
        Direction::Down => Some(pos + 1).filter(|&p| p < sorted.len()),
    };
    let Some(target) = target else {
        return false;
    };

    let (current, neighbour) = (sorted[pos], sorted[target]);

    // Equal orders would make the swap invisible; renumber first
    if doc.exercises[current].order == doc.exercises[neighbour].order {
        for (rank, &i) in sorted.iter().enumerate() {
            doc.exercises[i].order = Some(rank as i64);
        }
    }

    let current_order = doc.exercises[current].order;
    doc.exercises[current].order = doc.exercises[neighbour].order;
    doc.exercises[neighbour].order = current_order;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StorageOptions;
    use tempfile::TempDir;

    fn open() -> (TempDir, Storage) {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(temp_dir.path(), StorageOptions::default()).unwrap();
        (temp_dir, storage)
    }

    fn names(storage: &Storage) -> Vec<String> {
        storage.list_all().unwrap().into_iter().map(|e| e.name).collect()
    }

    #[test]
    fn test_add_assigns_increasing_order() {
        let (_dir, storage) = open();
        storage.add_header("Legs").unwrap();
        storage.add_exercise("  Squat ", 40.0, 0).unwrap();
        storage.add_exercise("Lunge", 20.0, 1).unwrap();

        let entries = storage.list_all().unwrap();
        let orders: Vec<_> = entries.iter().map(|e| e.order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
        assert_eq!(entries[1].name, "Squat");
        assert_eq!(entries[0].load, None);
        assert_eq!(entries[2].load, Some(Load::new(20.0, 1)));
    }

    #[test]
    fn test_add_rejects_empty_name() {
        let (_dir, storage) = open();
        let err = storage.add_exercise("   ", 10.0, 0).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(matches!(storage.add_header(""), Err(Error::Validation(_))));
        assert!(storage.list_all().unwrap().is_empty());
    }

    #[test]
    fn test_add_coerces_weight_and_checks_plates() {
        let (_dir, storage) = open();
        let id = storage.add_exercise("Curl", -5.0, 0).unwrap();
        let entry = storage.get(id).unwrap().unwrap();
        assert_eq!(entry.load.unwrap().base_weight, 0.0);

        let err = storage.add_exercise("Press", 30.0, 3).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_ids_are_never_reused() {
        let (_dir, storage) = open();
        let first = storage.add_exercise("Squat", 40.0, 0).unwrap();
        storage.delete(first).unwrap();
        storage.clear_all().unwrap();
        let second = storage.add_exercise("Squat", 40.0, 0).unwrap();
        assert!(second > first);
    }

    #[test]
    fn test_update_exercise_and_header() {
        let (_dir, storage) = open();
        let header = storage.add_header("Legs").unwrap();
        let squat = storage.add_exercise("Squat", 40.0, 0).unwrap();

        let updated = storage.update(squat, " Back Squat ", 45.0, 2).unwrap();
        assert_eq!(updated.name, "Back Squat");
        assert_eq!(updated.load, Some(Load::new(45.0, 2)));
        assert!(updated.updated_at.is_some());

        // Weight fields are ignored for headers, even invalid plate counts
        let updated = storage.update(header, "Lower Body", 99.0, 9).unwrap();
        assert_eq!(updated.name, "Lower Body");
        assert_eq!(updated.load, None);
    }

    #[test]
    fn test_update_errors() {
        let (_dir, storage) = open();
        let id = storage.add_exercise("Squat", 40.0, 0).unwrap();

        assert!(matches!(
            storage.update(EntryId(999), "Row", 10.0, 0),
            Err(Error::NotFound(EntryId(999)))
        ));
        assert!(matches!(storage.update(id, " ", 10.0, 0), Err(Error::Validation(_))));
        assert_eq!(storage.get(id).unwrap().unwrap().name, "Squat");
    }

    #[test]
    fn test_delete_is_idempotent() {
        let (_dir, storage) = open();
        let id = storage.add_exercise("Squat", 40.0, 0).unwrap();
        assert!(storage.delete(id).unwrap());
        assert!(!storage.delete(id).unwrap());
        assert!(storage.list_all().unwrap().is_empty());
    }

    #[test]
    fn test_move_up_then_down_restores_order() {
        let (_dir, storage) = open();
        storage.add_header("Legs").unwrap();
        let squat = storage.add_exercise("Squat", 40.0, 0).unwrap();
        storage.add_exercise("Lunge", 20.0, 0).unwrap();

        assert!(storage.move_entry(squat, Direction::Up).unwrap());
        assert_eq!(names(&storage), vec!["Squat", "Legs", "Lunge"]);

        assert!(storage.move_entry(squat, Direction::Down).unwrap());
        assert_eq!(names(&storage), vec!["Legs", "Squat", "Lunge"]);
    }

    #[test]
    fn test_move_at_boundary_is_noop() {
        let (_dir, storage) = open();
        let first = storage.add_exercise("Squat", 40.0, 0).unwrap();
        let last = storage.add_exercise("Lunge", 20.0, 0).unwrap();
        let before = storage.list_all().unwrap();

        assert!(!storage.move_entry(first, Direction::Up).unwrap());
        assert!(!storage.move_entry(last, Direction::Down).unwrap());
        assert!(!storage.move_entry(EntryId(42), Direction::Up).unwrap());
        assert_eq!(storage.list_all().unwrap(), before);
    }

    #[test]
    fn test_move_swaps_exactly_two_orders() {
        let (_dir, storage) = open();
        let ids: Vec<_> = ["A", "B", "C", "D"]
            .iter()
            .map(|n| storage.add_exercise(n, 0.0, 0).unwrap())
            .collect();

        assert!(storage.move_entry(ids[2], Direction::Up).unwrap());

        let entries = storage.list_all().unwrap();
        let pairs: Vec<_> = entries.iter().map(|e| (e.name.as_str(), e.order)).collect();
        assert_eq!(pairs, vec![("A", 0), ("C", 1), ("B", 2), ("D", 3)]);
    }

    #[test]
    fn test_move_with_tied_orders() {
        let (_dir, storage) = open();
        let a = storage.add_exercise("A", 0.0, 0).unwrap();
        let b = storage.add_exercise("B", 0.0, 0).unwrap();
        storage
            .write(|doc| {
                for record in &mut doc.exercises {
                    record.order = Some(5);
                }
                Ok(())
            })
            .unwrap();
        assert_eq!(names(&storage), vec!["A", "B"]);

        assert!(storage.move_entry(b, Direction::Up).unwrap());
        assert_eq!(names(&storage), vec!["B", "A"]);
        assert!(storage.move_entry(a, Direction::Up).unwrap());
        assert_eq!(names(&storage), vec!["A", "B"]);
    }

    #[test]
    fn test_clear_all() {
        let (_dir, storage) = open();
        storage.add_header("Legs").unwrap();
        storage.add_exercise("Squat", 40.0, 0).unwrap();
        assert_eq!(storage.clear_all().unwrap(), 2);
        assert!(storage.list_all().unwrap().is_empty());
    }
}
