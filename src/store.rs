//! Named-position storage backed by exchangeable CSV files.
//!
//! Each position set is one file under the storage root (`<name>.txt`) with
//! a `Name,X,Y` header and one row per labeled target. Exactly one set is
//! active at a time; switching sets reloads from disk and discards unsaved
//! in-memory edits of the previous set.
//!
//! Mutations (`insert`/`update`/`remove`) are in-memory only. The caller
//! decides when to persist with [`save_active`](PositionStore::save_active),
//! matching the UI's confirm-then-save semantics. A failed save leaves the
//! in-memory set authoritative so the operator can retry.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

/// File extension for persisted position sets.
const SET_EXTENSION: &str = "txt";

/// CSV header row, written and required verbatim.
const CSV_HEADER: &str = "Name,X,Y";

/// Name of the set synthesized when the storage root is empty.
const DEFAULT_SET_NAME: &str = "default";

/// Placeholder position seeded into a freshly synthesized default set.
const SEED_POSITION: (&str, f64, f64) = ("Default", 10.0, 12.0);

/// Errors reported by the position store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested position set does not exist in the storage root.
    #[error("position set '{0}' not found")]
    NotFound(String),

    /// A persisted row did not parse as a `(name, x, y)` triple.
    #[error("corrupt data in set '{set}' line {line}: {reason}")]
    CorruptData {
        set: String,
        line: usize,
        reason: String,
    },

    /// Filesystem read or write failure.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Rejected mutation (empty name, duplicate name, bad row index, ...).
    #[error("invalid position: {0}")]
    Validation(String),
}

/// One labeled XY target.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedPosition {
    pub name: String,
    pub x: f64,
    pub y: f64,
}

impl NamedPosition {
    pub fn new(name: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            name: name.into(),
            x,
            y,
        }
    }
}

/// An ordered collection of named positions, identified by its file stem.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionSet {
    name: String,
    positions: Vec<NamedPosition>,
}

impl PositionSet {
    fn new(name: impl Into<String>, positions: Vec<NamedPosition>) -> Self {
        Self {
            name: name.into(),
            positions,
        }
    }

    /// File stem identifying this set.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn get(&self, row: usize) -> Option<&NamedPosition> {
        self.positions.get(row)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NamedPosition> {
        self.positions.iter()
    }

    /// First position carrying `name`, if any.
    ///
    /// Duplicate names are tolerated by the store; resolution is first-match.
    pub fn resolve(&self, name: &str) -> Option<&NamedPosition> {
        self.positions.iter().find(|p| p.name == name)
    }
}

/// Store for named-position sets under one storage root directory.
pub struct PositionStore {
    storage_root: PathBuf,
    active: PositionSet,
}

impl PositionStore {
    /// Open the store, scanning `storage_root` for persisted sets.
    ///
    /// Creates the root directory if missing. When no sets exist yet, a
    /// `default` set containing one placeholder position is synthesized and
    /// persisted immediately, so the store is never empty on first use. The
    /// first set (alphabetically) becomes active.
    pub fn open(storage_root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let storage_root = storage_root.into();
        std::fs::create_dir_all(&storage_root)?;

        let mut store = Self {
            storage_root,
            active: PositionSet::new(DEFAULT_SET_NAME, Vec::new()),
        };

        let sets = store.list_sets()?;
        store.load_set(&sets[0])?;
        info!(
            "position store opened at {} ({} sets, active '{}')",
            store.storage_root.display(),
            sets.len(),
            store.active.name()
        );
        Ok(store)
    }

    /// Directory holding the persisted sets.
    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }

    /// The currently active set.
    pub fn active(&self) -> &PositionSet {
        &self.active
    }

    fn set_path(&self, name: &str) -> PathBuf {
        self.storage_root.join(format!("{name}.{SET_EXTENSION}"))
    }

    /// Enumerate available set names in sorted order.
    ///
    /// When the storage root holds no recognized files, synthesizes and
    /// persists the seeded `default` set before returning.
    pub fn list_sets(&self) -> Result<Vec<String>, StoreError> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.storage_root)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) == Some(SET_EXTENSION) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }

        if names.is_empty() {
            let (name, x, y) = SEED_POSITION;
            let seeded = PositionSet::new(
                DEFAULT_SET_NAME,
                vec![NamedPosition::new(name, x, y)],
            );
            write_set(&self.set_path(DEFAULT_SET_NAME), &seeded)?;
            info!("storage root empty, seeded '{DEFAULT_SET_NAME}' set");
            names.push(DEFAULT_SET_NAME.to_string());
        }

        names.sort();
        Ok(names)
    }

    /// Load a persisted set and make it active.
    ///
    /// Any unsaved edits to the previously active set are discarded.
    pub fn load_set(&mut self, name: &str) -> Result<(), StoreError> {
        let path = self.set_path(name);
        if !path.exists() {
            return Err(StoreError::NotFound(name.to_string()));
        }

        let text = std::fs::read_to_string(&path)?;
        self.active = parse_set(name, &text)?;
        debug!("loaded set '{}' ({} rows)", name, self.active.len());
        Ok(())
    }

    /// Serialize the active set to its backing file, overwriting it.
    ///
    /// On failure the in-memory set is untouched and remains the source of
    /// truth until the next successful save.
    pub fn save_active(&self) -> Result<(), StoreError> {
        let path = self.set_path(self.active.name());
        write_set(&path, &self.active)?;
        debug!(
            "saved set '{}' ({} rows)",
            self.active.name(),
            self.active.len()
        );
        Ok(())
    }

    /// Append a position to the active set (in memory).
    ///
    /// Rejects empty names, names containing the CSV delimiter, and names
    /// already present in the set.
    pub fn insert(&mut self, position: NamedPosition) -> Result<(), StoreError> {
        validate_name(&position.name)?;
        if self.active.resolve(&position.name).is_some() {
            return Err(StoreError::Validation(format!(
                "name '{}' already exists in set '{}'",
                position.name,
                self.active.name()
            )));
        }
        self.active.positions.push(position);
        Ok(())
    }

    /// Replace the position at `row` (in memory).
    ///
    /// In-place edits may transiently duplicate a name; duplicates resolve
    /// first-match on move-by-name.
    pub fn update(&mut self, row: usize, position: NamedPosition) -> Result<(), StoreError> {
        validate_name(&position.name)?;
        let len = self.active.len();
        match self.active.positions.get_mut(row) {
            Some(slot) => {
                *slot = position;
                Ok(())
            }
            None => Err(StoreError::Validation(format!(
                "row {row} out of range (set has {len} rows)"
            ))),
        }
    }

    /// Remove and return the position at `row` (in memory).
    pub fn remove(&mut self, row: usize) -> Result<NamedPosition, StoreError> {
        let len = self.active.len();
        if row >= len {
            return Err(StoreError::Validation(format!(
                "row {row} out of range (set has {len} rows)"
            )));
        }
        Ok(self.active.positions.remove(row))
    }
}

fn validate_name(name: &str) -> Result<(), StoreError> {
    if name.trim().is_empty() {
        return Err(StoreError::Validation("name must not be empty".to_string()));
    }
    if name.contains(',') {
        return Err(StoreError::Validation(format!(
            "name '{name}' must not contain ','"
        )));
    }
    Ok(())
}

fn write_set(path: &Path, set: &PositionSet) -> Result<(), StoreError> {
    let mut text = String::with_capacity(64 + set.len() * 32);
    text.push_str(CSV_HEADER);
    text.push('\n');
    for position in set.iter() {
        text.push_str(&format!("{},{},{}\n", position.name, position.x, position.y));
    }
    std::fs::write(path, text)?;
    Ok(())
}

fn parse_set(name: &str, text: &str) -> Result<PositionSet, StoreError> {
    let mut lines = text.lines().enumerate();

    match lines.next() {
        Some((_, header)) if header.trim_end() == CSV_HEADER => {}
        other => {
            return Err(StoreError::CorruptData {
                set: name.to_string(),
                line: 1,
                reason: format!(
                    "expected header '{CSV_HEADER}', got '{}'",
                    other.map(|(_, h)| h).unwrap_or_default()
                ),
            });
        }
    }

    let mut positions = Vec::new();
    for (index, line) in lines {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != 3 {
            return Err(StoreError::CorruptData {
                set: name.to_string(),
                line: index + 1,
                reason: format!("expected 3 fields, got {}", fields.len()),
            });
        }
        let x = parse_coord(name, index + 1, fields[1])?;
        let y = parse_coord(name, index + 1, fields[2])?;
        positions.push(NamedPosition::new(fields[0], x, y));
    }

    Ok(PositionSet::new(name, positions))
}

fn parse_coord(set: &str, line: usize, field: &str) -> Result<f64, StoreError> {
    field
        .trim()
        .parse()
        .map_err(|_| StoreError::CorruptData {
            set: set.to_string(),
            line,
            reason: format!("'{field}' is not a number"),
        })
}
