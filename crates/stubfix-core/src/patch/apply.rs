//! Deterministic two-phase application of a [`PatchLedger`].

use std::collections::BTreeMap;

use tracing::debug;

use crate::errors::{StubfixError, StubfixResult};
use crate::patch::ledger::{PatchLedger, PatchRecord, Scope};

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Find `needle` in `haystack` at or after byte offset `from`, skipping
/// matches that start or end in the middle of an identifier.
pub fn find_token_aligned(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    if needle.is_empty() || from > haystack.len() {
        return None;
    }
    let starts_ident = needle.chars().next().is_some_and(is_ident_char);
    let ends_ident = needle.chars().next_back().is_some_and(is_ident_char);
    haystack[from..]
        .match_indices(needle)
        .map(|(offset, _)| from + offset)
        .find(|&start| {
            let end = start + needle.len();
            let before_ok = !starts_ident
                || !haystack[..start].chars().next_back().is_some_and(is_ident_char);
            let after_ok = !ends_ident || !haystack[end..].chars().next().is_some_and(is_ident_char);
            before_ok && after_ok
        })
}

/// Apply one record to the current contents of its line.
fn substitute(current: &str, record: &PatchRecord) -> Option<String> {
    let first = find_token_aligned(current, &record.old, 0)?;
    let mut out = String::with_capacity(current.len() + record.new.len());
    out.push_str(&current[..first]);
    out.push_str(&record.new);
    let mut rest_from = first + record.old.len();
    if record.scope == Scope::Every {
        while let Some(next) = find_token_aligned(current, &record.old, rest_from) {
            out.push_str(&current[rest_from..next]);
            out.push_str(&record.new);
            rest_from = next + record.old.len();
        }
    }
    out.push_str(&current[rest_from..]);
    Some(out)
}

/// Turn `lines` plus `ledger` into a new line vector.
///
/// Phase one substitutes every record against the current contents of its
/// line; a line that had text and is left blank by its records is dropped.
/// Phase two splices insertions in before their original anchors, keeping
/// registration order among insertions that share an anchor.
pub fn apply(lines: &[String], ledger: &PatchLedger) -> StubfixResult<Vec<String>> {
    let mut patched: Vec<String> = lines.to_vec();
    let mut dropped = vec![false; lines.len()];

    for (line, records) in ledger.patches() {
        let Some(original) = lines.get(line) else {
            let old = records.first().map(|r| r.old.clone()).unwrap_or_default();
            return Err(StubfixError::SubstringNotFound {
                line: line + 1,
                old,
                current: String::new(),
            });
        };
        let mut current = original.clone();
        for record in records {
            current = substitute(&current, record).ok_or_else(|| {
                StubfixError::SubstringNotFound {
                    line: line + 1,
                    old: record.old.clone(),
                    current: current.clone(),
                }
            })?;
        }
        if current.trim().is_empty() && !original.trim().is_empty() {
            dropped[line] = true;
        }
        debug!(line = line + 1, before = %original, after = %current, "patched");
        patched[line] = current;
    }

    let mut pending: BTreeMap<usize, Vec<&str>> = BTreeMap::new();
    for insertion in ledger.insertions() {
        pending
            .entry(insertion.anchor.min(lines.len()))
            .or_default()
            .push(insertion.text.as_str());
    }

    let mut out = Vec::with_capacity(lines.len() + ledger.insertions().len());
    for (index, line) in patched.into_iter().enumerate() {
        if let Some(texts) = pending.remove(&index) {
            out.extend(texts.into_iter().map(str::to_string));
        }
        if !dropped[index] {
            out.push(line);
        }
    }
    for texts in pending.into_values() {
        out.extend(texts.into_iter().map(str::to_string));
    }
    Ok(out)
}
