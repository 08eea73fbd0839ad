//! Core domain types for the Kraft training tracker.
//!
//! This module defines the fundamental types used throughout the system:
//! - Catalog entries (exercises and section headers)
//! - Loads (base weight plus add-on plates)
//! - The active training session and its snapshot entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Identity and Kinds
// ============================================================================

/// Stable catalog identifier, assigned once and never reused
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub u64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntryId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(EntryId)
    }
}

/// Kind of catalog entry
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    #[default]
    Exercise,
    /// Pure grouping label, carries no weight
    Header,
}

impl EntryKind {
    pub fn is_header(self) -> bool {
        self == EntryKind::Header
    }
}

/// Direction for reordering a catalog entry
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            other => Err(format!("unknown direction '{}', expected up or down", other)),
        }
    }
}

// ============================================================================
// Load
// ============================================================================

/// Weight of an exercise: base weight plus a count of fixed-increment plates
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Load {
    pub base_weight: f64,
    #[serde(default)]
    pub additional_plates: u8,
}

impl Load {
    pub fn new(base_weight: f64, additional_plates: u8) -> Self {
        Self {
            base_weight: Self::coerce_weight(base_weight),
            additional_plates,
        }
    }

    /// Negative and non-finite weights become 0
    pub fn coerce_weight(weight: f64) -> f64 {
        if weight.is_finite() && weight > 0.0 {
            weight
        } else {
            0.0
        }
    }

    /// Total weight lifted, given the weight of one add-on plate
    pub fn total(&self, plate_increment_kg: f64) -> f64 {
        self.base_weight + f64::from(self.additional_plates) * plate_increment_kg
    }
}

/// Parse user-entered weight text; anything unparsable is 0
///
/// Accepts `,` as decimal separator ("42,5").
pub fn parse_weight(text: &str) -> f64 {
    text.trim()
        .replace(',', ".")
        .parse::<f64>()
        .map(Load::coerce_weight)
        .unwrap_or(0.0)
}

// ============================================================================
// Catalog
// ============================================================================

/// One entry of the exercise catalog, as returned by `Storage::list_all`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: EntryId,
    pub kind: EntryKind,
    pub name: String,
    pub order: i64,
    /// `Some` for exercises, `None` for headers
    pub load: Option<Load>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl CatalogEntry {
    pub fn is_header(&self) -> bool {
        self.kind.is_header()
    }
}

// ============================================================================
// Training Session
// ============================================================================

/// Snapshot of one catalog entry inside the active training session
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionEntry {
    /// Id of the catalog entry this was copied from
    pub id: EntryId,
    #[serde(rename = "type", default)]
    pub kind: EntryKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load: Option<Load>,
    /// `None` for headers
    pub completed: Option<bool>,
}

impl SessionEntry {
    pub(crate) fn snapshot(entry: &CatalogEntry) -> Self {
        let header = entry.is_header();
        Self {
            id: entry.id,
            kind: entry.kind,
            name: entry.name.clone(),
            load: if header { None } else { Some(entry.load.unwrap_or_default()) },
            completed: if header { None } else { Some(false) },
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed == Some(true)
    }
}

/// Completed vs. total exercises of a session (headers not counted)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    pub fn is_finished(&self) -> bool {
        self.total > 0 && self.completed == self.total
    }
}

/// The single in-progress workout
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingSession {
    pub active: bool,
    pub started_at: DateTime<Utc>,
    pub entries: Vec<SessionEntry>,
}

impl TrainingSession {
    /// Look up a session entry by its catalog id
    pub fn entry(&self, id: EntryId) -> Option<&SessionEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn progress(&self) -> Progress {
        let exercises = self.entries.iter().filter(|e| !e.kind.is_header());
        let (completed, total) = exercises.fold((0, 0), |(done, total), e| {
            (done + usize::from(e.is_completed()), total + 1)
        });
        Progress { completed, total }
    }

    /// Entries a training view shows.
    ///
    /// With `show_completed` off, completed exercises are hidden. A header is
    /// only kept when at least one shown exercise follows it before the next
    /// header.
    pub fn visible_entries(&self, show_completed: bool) -> Vec<&SessionEntry> {
        let mut visible = Vec::with_capacity(self.entries.len());
        let mut pending_header = None;

        for entry in &self.entries {
            if entry.kind.is_header() {
                pending_header = Some(entry);
                continue;
            }
            if !show_completed && entry.is_completed() {
                continue;
            }
            if let Some(header) = pending_header.take() {
                visible.push(header);
            }
            visible.push(entry);
        }

        visible
    }
}
