// ============================================================================
// RBAC Core - Level Code Allocator
// File: crates/rbac-core/src/level_code.rs
// Description: Materialized tree ordering keys for menus
// ============================================================================
//! A level code is a concatenation of fixed-width two digit segments, one per
//! depth. A child's code is its parent's code plus one segment, so sorting
//! codes lexicographically yields a pre-order traversal of the tree:
//!
//! ```text
//! 01        Dashboard
//! 0101        Overview
//! 0102        Reports
//! 02        Settings
//! 0201        Users
//! ```
//!
//! Every function here is pure. Callers serialize the read-allocate-write
//! sequence themselves.

use std::collections::HashSet;

use thiserror::Error;

/// Width of one segment.
pub const SEGMENT_LEN: usize = 2;

/// Code of the first child of the virtual root.
pub const BASE_CODE: &str = "01";

/// Largest suffix a segment can hold.
pub const MAX_SIBLINGS: u32 = 99;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LevelCodeError {
    #[error("no free level code under parent '{parent}' (limit {MAX_SIBLINGS})")]
    Exhausted { parent: String },

    #[error("malformed level code '{0}'")]
    Malformed(String),
}

/// Smallest unused child code under `parent_code` (empty for the root level).
///
/// Sibling entries that are not direct children of `parent_code` are ignored.
pub fn next_child_code<S: AsRef<str>>(parent_code: &str, siblings: &[S]) -> Result<String, LevelCodeError> {
    let child_len = parent_code.len() + SEGMENT_LEN;
    let taken: HashSet<&str> = siblings
        .iter()
        .map(AsRef::as_ref)
        .filter(|code| code.len() == child_len && code.starts_with(parent_code))
        .collect();

    (1..=MAX_SIBLINGS)
        .map(|i| format!("{parent_code}{i:02}"))
        .find(|candidate| !taken.contains(candidate.as_str()))
        .ok_or_else(|| LevelCodeError::Exhausted {
            parent: parent_code.to_string(),
        })
}

/// Next code for an ordered list of existing codes.
///
/// - no entries: [`BASE_CODE`]
/// - one entry: that entry is the parent, so its first child is returned
/// - otherwise: the entries are siblings sharing the first entry's parent
///   prefix, and the smallest gap among them is returned
pub fn next_level_code<S: AsRef<str>>(codes: &[S]) -> Result<String, LevelCodeError> {
    match codes {
        [] => Ok(BASE_CODE.to_string()),
        [parent] => next_child_code(parent.as_ref(), &[] as &[&str]),
        [first, ..] => {
            let prefix = parent_code(first.as_ref())?;
            next_child_code(prefix, codes)
        }
    }
}

/// Parent prefix of `code`; `""` for a top-level code.
pub fn parent_code(code: &str) -> Result<&str, LevelCodeError> {
    if code.len() < SEGMENT_LEN || code.len() % SEGMENT_LEN != 0 {
        return Err(LevelCodeError::Malformed(code.to_string()));
    }
    code.get(..code.len() - SEGMENT_LEN)
        .ok_or_else(|| LevelCodeError::Malformed(code.to_string()))
}

/// Cumulative prefixes of every input code, de-duplicated, in order of first
/// appearance. `"010203"` yields `["01", "0102", "010203"]`. A trailing odd
/// character is ignored; codes shorter than one segment yield nothing.
pub fn parse_level_codes<I, S>(codes: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for code in codes {
        let code = code.as_ref();
        let mut end = SEGMENT_LEN;
        while end <= code.len() {
            let Some(prefix) = code.get(..end) else { break };
            if seen.insert(prefix.to_string()) {
                out.push(prefix.to_string());
            }
            end += SEGMENT_LEN;
        }
    }

    out
}

/// Rewrite `code` from under `old_prefix` to under `new_prefix`.
/// Returns `None` when `code` is not in the `old_prefix` subtree.
pub fn rebase_level_code(code: &str, old_prefix: &str, new_prefix: &str) -> Option<String> {
    code.strip_prefix(old_prefix)
        .map(|rest| format!("{new_prefix}{rest}"))
}

/// Whether `code` lies in the subtree rooted at `ancestor` (inclusive).
pub fn is_within(code: &str, ancestor: &str) -> bool {
    !ancestor.is_empty() && code.starts_with(ancestor)
}
