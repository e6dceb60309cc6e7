//! Per-file record of pending line-level edits.
//!
//! Every line index refers to the immutable line vector the ledger was
//! computed against, never to an already patched vector.

use std::collections::BTreeMap;

use tracing::debug;

/// How many occurrences of `old` a record rewrites.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope {
    /// The first token-aligned occurrence.
    First,
    /// Every token-aligned occurrence.
    Every,
}

/// A substitution inside one line. An empty `new` deletes the occurrence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatchRecord {
    pub line: usize,
    pub old: String,
    pub new: String,
    pub scope: Scope,
}

/// A whole line inserted before `anchor`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InsertionRecord {
    pub anchor: usize,
    pub text: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PatchLedger {
    patches: BTreeMap<usize, Vec<PatchRecord>>,
    insertions: Vec<InsertionRecord>,
}

impl PatchLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a record. A second record claiming the same `old` text on the
    /// same line replaces the first; records with different `old` text are
    /// kept in registration order and applied one after the other.
    pub fn record(&mut self, record: PatchRecord) {
        let slot = self.patches.entry(record.line).or_default();
        if let Some(existing) = slot.iter_mut().find(|r| r.old == record.old) {
            debug!(
                line = record.line,
                old = %record.old,
                previous = %existing.new,
                new = %record.new,
                "ledger overwrite"
            );
            *existing = record;
        } else {
            slot.push(record);
        }
    }

    pub fn replace(&mut self, line: usize, old: impl Into<String>, new: impl Into<String>) {
        self.record(PatchRecord {
            line,
            old: old.into(),
            new: new.into(),
            scope: Scope::First,
        });
    }

    pub fn replace_every(&mut self, line: usize, old: impl Into<String>, new: impl Into<String>) {
        self.record(PatchRecord {
            line,
            old: old.into(),
            new: new.into(),
            scope: Scope::Every,
        });
    }

    pub fn delete(&mut self, line: usize, old: impl Into<String>) {
        self.replace(line, old, String::new());
    }

    pub fn insert_before(&mut self, anchor: usize, text: impl Into<String>) {
        self.insertions.push(InsertionRecord {
            anchor,
            text: text.into(),
        });
    }

    /// Append another ledger's registrations after this one's.
    pub fn extend(&mut self, other: PatchLedger) {
        for record in other.patches.into_values().flatten() {
            self.record(record);
        }
        self.insertions.extend(other.insertions);
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty() && self.insertions.is_empty()
    }

    pub fn patch_count(&self) -> usize {
        self.patches.values().map(Vec::len).sum()
    }

    pub fn patches(&self) -> impl Iterator<Item = (usize, &[PatchRecord])> {
        self.patches
            .iter()
            .map(|(line, records)| (*line, records.as_slice()))
    }

    pub fn patches_for(&self, line: usize) -> &[PatchRecord] {
        self.patches.get(&line).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn insertions(&self) -> &[InsertionRecord] {
        &self.insertions
    }
}
