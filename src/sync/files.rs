//! The scheduler-owned collection of known files

use crate::types::FileRecord;
use std::collections::HashSet;

/// Ordered file list with id dedup.
///
/// `version` increases whenever the contents change.
#[derive(Debug, Default)]
pub struct FileSet {
    files: Vec<FileRecord>,
    ids: HashSet<String>,
    version: u64,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Append unless a record with the same id exists. Returns whether it was added.
    pub fn insert(&mut self, record: FileRecord) -> bool {
        if !self.ids.insert(record.id.clone()) {
            return false;
        }
        self.files.push(record);
        self.version += 1;
        true
    }

    pub fn clear(&mut self) {
        self.files.clear();
        self.ids.clear();
        self.version += 1;
    }

    /// Newest capture time first; ties keep discovery order
    pub fn sort_newest_first(&mut self) {
        self.files.sort_by(|a, b| b.time_taken.cmp(&a.time_taken));
        self.version += 1;
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileRecord> {
        self.files.iter()
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut FileRecord> {
        self.files.iter_mut().find(|f| f.id == id)
    }

    /// Mutable access for a pipeline stage; counts as one change
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, FileRecord> {
        self.version += 1;
        self.files.iter_mut()
    }

    /// Read-only copy for consumers, without thumbnail payloads
    pub fn snapshot(&self) -> Vec<FileRecord> {
        self.files
            .iter()
            .map(|f| FileRecord {
                thumbnail: None,
                ..f.clone()
            })
            .collect()
    }
}
