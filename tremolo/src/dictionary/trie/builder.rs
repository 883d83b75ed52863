use crate::errors::{Result, TremoloError};

use super::tail::Tail;
use super::{Trie, INITIAL_INDEX};

/// Granularity of array growth.
const CHUNK_SIZE: usize = 256;

/// Offline builder of [`Trie`].
///
/// The input records must be sorted ascending by key byte-lexicographically
/// with no duplicates. The builder recursively partitions the sorted range by
/// successive byte positions; a range that collapses to one record becomes a
/// leaf whose remaining bytes and value go to the tail.
///
/// Vacant slots form a circular doubly-linked free list threaded through the
/// under-construction arrays: a free slot `i` keeps `-(prev + 1)` in `BASE[i]`
/// and `-(next + 1)` in `CHECK[i]`, with node 0 as the list sentinel.
pub struct TrieBuilder {
    base: Vec<i32>,
    check: Vec<i32>,
    tail: Vec<u8>,
}

impl TrieBuilder {
    /// Builds a trie from sorted records of keys and values.
    ///
    /// # Errors
    ///
    /// [`TremoloError`](crate::errors::TremoloError) is returned when the
    /// records are not sorted and unique, or when the structure outgrows its
    /// 32-bit address space.
    pub fn build<K>(records: &[(K, u32)]) -> Result<Trie>
    where
        K: AsRef<[u8]>,
    {
        for pair in records.windows(2) {
            if pair[0].0.as_ref() >= pair[1].0.as_ref() {
                return Err(TremoloError::invalid_argument(
                    "records",
                    "records must be sorted by key and unique",
                ));
            }
        }
        let mut b = Self {
            // Slot 0 is the free-list sentinel, slot 1 the root; the list
            // starts empty (both links point back at the sentinel).
            base: vec![-1, 0],
            check: vec![-1, 0],
            tail: vec![0],
        };
        if !records.is_empty() {
            b.arrange(records, 0, INITIAL_INDEX)?;
        }
        Ok(b.finish())
    }

    fn arrange<K>(&mut self, records: &[(K, u32)], depth: usize, node: u32) -> Result<()>
    where
        K: AsRef<[u8]>,
    {
        // Group the range by the byte at `depth`; exhausted keys sort first
        // and map to the end-of-key label 0.
        let mut groups = vec![];
        let mut start = 0;
        while start < records.len() {
            let label = label_at(records[start].0.as_ref(), depth);
            let mut end = start + 1;
            while end < records.len() && label_at(records[end].0.as_ref(), depth) == label {
                end += 1;
            }
            groups.push((label, start..end));
            start = end;
        }

        let labels: Vec<u8> = groups.iter().map(|&(label, _)| label).collect();
        let base = self.find_base(&labels);
        self.base[node as usize] = i32::try_from(base).map_err(|_| {
            TremoloError::invalid_argument("records", "trie outgrows the 32-bit node space")
        })?;
        // Reserve every child slot before recursing, so descendants cannot
        // steal them.
        for &label in &labels {
            self.occupy(base + u32::from(label), node);
        }

        for (label, range) in groups {
            let child = base + u32::from(label);
            let group = &records[range];
            if group.len() == 1 {
                let key = group[0].0.as_ref();
                let rest: &[u8] = if label == 0 { &[] } else { &key[depth + 1..] };
                self.write_leaf(child, rest, group[0].1)?;
            } else {
                debug_assert_ne!(label, 0);
                self.arrange(group, depth + 1, child)?;
            }
        }
        Ok(())
    }

    fn write_leaf(&mut self, node: u32, rest: &[u8], value: u32) -> Result<()> {
        let offset = i32::try_from(self.tail.len()).map_err(|_| {
            TremoloError::invalid_argument("records", "tail outgrows its 32-bit address space")
        })?;
        self.base[node as usize] = -offset;
        self.tail.extend_from_slice(rest);
        self.tail.push(0);
        self.tail.extend_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// Finds a base offset such that `base + label` is vacant for every
    /// label, scanning free slots as candidates for the first label.
    fn find_base(&mut self, labels: &[u8]) -> u32 {
        debug_assert!(!labels.is_empty());
        let first = u32::from(labels[0]);
        let mut slot = self.next_free(0);
        loop {
            if slot == 0 {
                // The list is exhausted; extend the arrays and rescan.
                self.grow();
                slot = self.next_free(0);
                continue;
            }
            let cand = slot as u32;
            if cand > first {
                let base = cand - first;
                if labels.iter().all(|&c| self.is_vacant(base + u32::from(c))) {
                    return base;
                }
            }
            slot = self.next_free(slot);
        }
    }

    #[inline(always)]
    fn is_vacant(&self, index: u32) -> bool {
        self.check.get(index as usize).map_or(true, |&c| c < 0)
    }

    /// Unlinks `slot` from the free list and marks it a child of `parent`.
    fn occupy(&mut self, slot: u32, parent: u32) {
        let slot = slot as usize;
        while slot >= self.check.len() {
            self.grow();
        }
        debug_assert!(self.check[slot] < 0);
        let prev = (-self.base[slot] - 1) as usize;
        let next = (-self.check[slot] - 1) as usize;
        self.set_next(prev, next);
        self.set_prev(next, prev);
        self.check[slot] = parent as i32;
        self.base[slot] = 0;
    }

    fn grow(&mut self) {
        let start = self.base.len();
        for i in start..start + CHUNK_SIZE {
            // Append slot i at the tail of the free list.
            let last = (-self.base[0] - 1) as usize;
            self.base.push(-((last as i32) + 1));
            self.check.push(-1);
            self.set_next(last, i);
            self.set_prev(0, i);
        }
    }

    #[inline(always)]
    fn next_free(&self, slot: usize) -> usize {
        (-self.check[slot] - 1) as usize
    }

    #[inline(always)]
    fn set_next(&mut self, slot: usize, next: usize) {
        self.check[slot] = -((next as i32) + 1);
    }

    #[inline(always)]
    fn set_prev(&mut self, slot: usize, prev: usize) {
        self.base[slot] = -((prev as i32) + 1);
    }

    fn finish(mut self) -> Trie {
        let mut len = self.check.len();
        while len > 2 && self.check[len - 1] < 0 {
            len -= 1;
        }
        self.base.truncate(len);
        self.check.truncate(len);
        let mut check = Vec::with_capacity(len);
        for i in 0..len {
            if self.check[i] < 0 {
                // Remaining free slots serialise as (0, 0); they can never
                // satisfy a check test because no reachable parent has id 0.
                self.base[i] = 0;
                check.push(0);
            } else {
                check.push(self.check[i] as u32);
            }
        }
        self.base[0] = 0;
        check[0] = 0;
        Trie {
            base: self.base,
            check,
            tail: Tail::from_data(self.tail),
        }
    }
}

#[inline(always)]
fn label_at(key: &[u8], depth: usize) -> u8 {
    key.get(depth).copied().unwrap_or(0)
}
