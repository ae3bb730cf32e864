//! Growable sequence backing both strings and arrays

use std::fmt;

/// Contiguous, growable, indexable sequence.
///
/// Indices are valid for `0 <= i < len()`; `range(b, e)` requires
/// `b <= e <= len()` and returns a copy of the span, never a view.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Buffer<T> {
    items: Vec<T>,
}

impl<T: Clone> Buffer<T> {
    pub fn new() -> Self {
        Buffer { items: Vec::new() }
    }

    pub fn from_vec(items: Vec<T>) -> Self {
        Buffer { items }
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

    /// Overwrite the element at `index`. Returns false when out of range.
    pub fn set(&mut self, index: usize, value: T) -> bool {
        match self.items.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Copy of the elements in `[begin, end)`
    pub fn range(&self, begin: usize, end: usize) -> Option<Buffer<T>> {
        if begin > end || end > self.items.len() {
            return None;
        }
        Some(Buffer::from_vec(self.items[begin..end].to_vec()))
    }

    /// New buffer holding `self` followed by `other`
    pub fn merge(&self, other: &Buffer<T>) -> Buffer<T> {
        let mut items = Vec::with_capacity(self.items.len() + other.items.len());
        items.extend_from_slice(&self.items);
        items.extend_from_slice(&other.items);
        Buffer { items }
    }

    pub fn push(&mut self, value: T) {
        self.items.push(value);
    }

    pub fn extend_from_slice(&mut self, values: &[T]) {
        self.items.extend_from_slice(values);
    }

    /// Insert `values` starting at `index` (`index == len()` appends).
    /// Returns false when `index > len()`.
    pub fn insert_slice(&mut self, index: usize, values: &[T]) -> bool {
        if index > self.items.len() {
            return false;
        }
        self.items.splice(index..index, values.iter().cloned());
        true
    }

    pub fn remove(&mut self, index: usize) -> Option<T> {
        if index < self.items.len() {
            Some(self.items.remove(index))
        } else {
            None
        }
    }

    /// Remove the span `[begin, end)`. Returns false when the span is invalid.
    pub fn remove_range(&mut self, begin: usize, end: usize) -> bool {
        if begin > end || end > self.items.len() {
            return false;
        }
        self.items.drain(begin..end);
        true
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

impl<T: PartialEq + Clone> Buffer<T> {
    /// Start of the first occurrence of `needle`
    pub fn find(&self, needle: &[T]) -> Option<usize> {
        if needle.is_empty() {
            return Some(0);
        }
        self.items
            .windows(needle.len())
            .position(|window| window == needle)
    }

    /// Number of non-overlapping occurrences of a non-empty `needle`
    pub fn count(&self, needle: &[T]) -> usize {
        if needle.is_empty() {
            return 0;
        }
        let mut count = 0;
        let mut i = 0;
        while i + needle.len() <= self.items.len() {
            if self.items[i..i + needle.len()] == *needle {
                count += 1;
                i += needle.len();
            } else {
                i += 1;
            }
        }
        count
    }
}

impl From<&str> for Buffer<char> {
    fn from(s: &str) -> Self {
        Buffer::from_vec(s.chars().collect())
    }
}

impl fmt::Display for Buffer<char> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.items {
            write!(f, "{c}")?;
        }
        Ok(())
    }
}
