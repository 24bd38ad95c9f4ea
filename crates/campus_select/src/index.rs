//! Option index - case-insensitive substring filtering over candidate sets
//!
//! Filtering is a pure linear scan. That is fine up to a few thousand options,
//! the size of any course catalog or room list a form shows.

use std::sync::Arc;

use crate::choice::Choice;

/// Check if a label matches a search query (case-insensitive substring)
///
/// An empty query matches everything.
pub fn matches(label: &str, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    label.to_lowercase().contains(&query.to_lowercase())
}

/// Filter candidates by label, keeping their original relative order
pub fn filter<'a, T: Choice>(candidates: &'a [T], query: &str) -> Vec<&'a T> {
    filter_indices(candidates, query)
        .into_iter()
        .map(|i| &candidates[i])
        .collect()
}

/// Same as [`filter`], returning positions into `candidates`
pub fn filter_indices<T: Choice>(candidates: &[T], query: &str) -> Vec<usize> {
    if query.is_empty() {
        return (0..candidates.len()).collect();
    }

    let query_lower = query.to_lowercase();
    candidates
        .iter()
        .enumerate()
        .filter(|(_, opt)| opt.label().to_lowercase().contains(&query_lower))
        .map(|(i, _)| i)
        .collect()
}

/// Immutable snapshot of a candidate list
///
/// Snapshots are replaced wholesale and never patched, so a render never
/// observes a half-updated list. Cloning shares the underlying allocation.
#[derive(Debug)]
pub struct CandidateSet<T> {
    items: Arc<[T]>,
}

impl<T> Clone for CandidateSet<T> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
        }
    }
}

impl<T> Default for CandidateSet<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> From<Vec<T>> for CandidateSet<T> {
    fn from(items: Vec<T>) -> Self {
        Self::new(items)
    }
}

impl<T> CandidateSet<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: items.into(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

impl<T: Choice> CandidateSet<T> {
    /// Find the option carrying `key`
    pub fn find_by_key(&self, key: &T::Key) -> Option<&T> {
        self.items.iter().find(|opt| opt.key() == *key)
    }
}
