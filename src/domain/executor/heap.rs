//! Array-backed binary min-heap with a position index, so that the priority of any entry can be
//! changed in `O(log n)`.
use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug, Clone)]
pub struct IndexedMinHeap<K> {
    entries: Vec<(K, u64)>,
    positions: HashMap<K, usize>,
}

impl<K> Default for IndexedMinHeap<K> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            positions: HashMap::new(),
        }
    }
}

impl<K: Hash + Eq + Clone> IndexedMinHeap<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts `key` with `priority`. Returns false if the key is already present.
    pub fn push(&mut self, key: K, priority: u64) -> bool {
        if self.positions.contains_key(&key) {
            return false;
        }
        let index = self.entries.len();
        self.positions.insert(key.clone(), index);
        self.entries.push((key, priority));
        self.sift_up(index);
        true
    }

    pub fn peek(&self) -> Option<(&K, u64)> {
        self.entries.first().map(|(key, priority)| (key, *priority))
    }

    pub fn priority(&self, key: &K) -> Option<u64> {
        self.positions.get(key).map(|&index| self.entries[index].1)
    }

    pub fn increment(&mut self, key: &K) -> Option<u64> {
        let index = *self.positions.get(key)?;
        self.entries[index].1 = self.entries[index].1.saturating_add(1);
        let priority = self.entries[index].1;
        self.sift_down(index);
        Some(priority)
    }

    /// Lowers the priority of `key` by one, never below zero.
    pub fn decrement(&mut self, key: &K) -> Option<u64> {
        let index = *self.positions.get(key)?;
        self.entries[index].1 = self.entries[index].1.saturating_sub(1);
        let priority = self.entries[index].1;
        self.sift_up(index);
        Some(priority)
    }

    /// Entries in heap order (not sorted).
    pub fn iter(&self) -> impl Iterator<Item = (&K, u64)> {
        self.entries.iter().map(|(key, priority)| (key, *priority))
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.entries.swap(a, b);
        if let Some(position) = self.positions.get_mut(&self.entries[a].0) {
            *position = a;
        }
        if let Some(position) = self.positions.get_mut(&self.entries[b].0) {
            *position = b;
        }
    }

    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if self.entries[parent].1 <= self.entries[index].1 {
                break;
            }
            self.swap(parent, index);
            index = parent;
        }
    }

    fn sift_down(&mut self, mut index: usize) {
        let len = self.entries.len();
        loop {
            let left = 2 * index + 1;
            let right = left + 1;
            let mut smallest = index;
            if left < len && self.entries[left].1 < self.entries[smallest].1 {
                smallest = left;
            }
            if right < len && self.entries[right].1 < self.entries[smallest].1 {
                smallest = right;
            }
            if smallest == index {
                break;
            }
            self.swap(index, smallest);
            index = smallest;
        }
    }

    /// Checks the heap property and the position index. Used by tests.
    pub fn is_consistent(&self) -> bool {
        let ordered = (1..self.entries.len())
            .all(|index| self.entries[(index - 1) / 2].1 <= self.entries[index].1);
        let indexed = self.positions.len() == self.entries.len()
            && self
                .entries
                .iter()
                .enumerate()
                .all(|(index, (key, _))| self.positions.get(key) == Some(&index));
        ordered && indexed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peek_tracks_minimum() {
        let mut heap = IndexedMinHeap::new();
        heap.push("a", 0);
        heap.push("b", 0);
        heap.push("c", 0);

        heap.increment(&"a");
        heap.increment(&"b");
        assert_eq!(heap.peek(), Some((&"c", 0)));

        heap.increment(&"c");
        heap.increment(&"c");
        heap.decrement(&"a");
        assert_eq!(heap.peek(), Some((&"a", 0)));
        assert_eq!(heap.priority(&"c"), Some(2));
        assert!(heap.is_consistent());
    }

    #[test]
    fn test_duplicates_and_unknown_keys() {
        let mut heap = IndexedMinHeap::new();
        assert!(heap.push(1u8, 3));
        assert!(!heap.push(1u8, 0));
        assert_eq!(heap.len(), 1);
        assert_eq!(heap.increment(&2), None);
        assert_eq!(heap.decrement(&1), Some(2));
    }

    #[test]
    fn test_decrement_saturates() {
        let mut heap = IndexedMinHeap::new();
        heap.push("a", 0);
        assert_eq!(heap.decrement(&"a"), Some(0));
    }
}
