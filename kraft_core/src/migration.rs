//! One-time repair pass over stored records, run when the store is opened.

use crate::store::Document;

/// What the migration changed
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub repaired_orders: usize,
    pub stripped_header_weights: usize,
    pub next_id_bumped: bool,
}

impl MigrationReport {
    pub fn changed(&self) -> bool {
        self.repaired_orders > 0 || self.stripped_header_weights > 0 || self.next_id_bumped
    }
}

/// Bring a loaded document up to the current invariants.
///
/// - Records without `order` get their position in stored (arrival) order.
/// - Headers lose any weight fields.
/// - The id counter is raised above every stored id.
pub(crate) fn migrate(doc: &mut Document) -> MigrationReport {
    let mut report = MigrationReport::default();

    for (position, record) in doc.exercises.iter_mut().enumerate() {
        if record.order.is_none() {
            record.order = Some(position as i64);
            report.repaired_orders += 1;
        }
        if record.kind.is_header()
            && (record.weight.is_some() || record.additional_plates.is_some())
        {
            record.weight = None;
            record.additional_plates = None;
            report.stripped_header_weights += 1;
        }
    }

    let max_id = doc.exercises.iter().map(|r| r.id.0).max().unwrap_or(0);
    if max_id > doc.next_id {
        doc.next_id = max_id;
        report.next_id_bumped = true;
    }

    report
}
