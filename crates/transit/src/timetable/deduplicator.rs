//! Interning of immutable sub-objects shared between many trips.
//!
//! Large schedules repeat the same relative time arrays, stop sequence
//! numbers and timepoint sets over and over. Interning them keeps one copy
//! of each in memory; every caller gets a clone of the same `Arc`.

use std::borrow::Borrow;
use std::collections::HashSet;
use std::hash::Hash;
use std::sync::Arc;

use fixedbitset::FixedBitSet;
use parking_lot::Mutex;

#[derive(Debug, Default)]
pub struct Deduplicator {
    int_arrays: Mutex<HashSet<Arc<[i32]>>>,
    sequence_arrays: Mutex<HashSet<Arc<[u32]>>>,
    bit_sets: Mutex<HashSet<Arc<FixedBitSet>>>,
    strings: Mutex<HashSet<Arc<str>>>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deduplicate_int_array(&self, values: &[i32]) -> Arc<[i32]> {
        intern(&self.int_arrays, values, |values| Arc::from(values))
    }

    pub fn deduplicate_sequence_array(&self, values: &[u32]) -> Arc<[u32]> {
        intern(&self.sequence_arrays, values, |values| Arc::from(values))
    }

    pub fn deduplicate_bit_set(&self, bits: &FixedBitSet) -> Arc<FixedBitSet> {
        intern(&self.bit_sets, bits, |bits| Arc::new(bits.clone()))
    }

    pub fn deduplicate_string(&self, value: &str) -> Arc<str> {
        intern(&self.strings, value, |value| Arc::from(value))
    }

    /// Number of distinct interned objects, across all kinds.
    pub fn len(&self) -> usize {
        self.int_arrays.lock().len()
            + self.sequence_arrays.lock().len()
            + self.bit_sets.lock().len()
            + self.strings.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.int_arrays.lock().clear();
        self.sequence_arrays.lock().clear();
        self.bit_sets.lock().clear();
        self.strings.lock().clear();
    }
}

fn intern<T>(set: &Mutex<HashSet<Arc<T>>>, value: &T, make: impl FnOnce(&T) -> Arc<T>) -> Arc<T>
where
    T: ?Sized + Hash + Eq,
    Arc<T>: Borrow<T>,
{
    let mut set = set.lock();
    if let Some(existing) = set.get(value) {
        return Arc::clone(existing);
    }
    let interned = make(value);
    set.insert(Arc::clone(&interned));
    interned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_arrays_are_shared() {
        let dedup = Deduplicator::new();
        let a = dedup.deduplicate_int_array(&[0, 60, 120]);
        let b = dedup.deduplicate_int_array(&vec![0, 60, 120]);
        let c = dedup.deduplicate_int_array(&[0, 60, 180]);

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(dedup.len(), 2);

        let s1 = dedup.deduplicate_sequence_array(&[1, 2, 3]);
        let s2 = dedup.deduplicate_sequence_array(&[1, 2, 3]);
        assert!(Arc::ptr_eq(&s1, &s2));
        assert_eq!(dedup.len(), 3);
    }

    #[test]
    fn test_bit_sets_and_strings() {
        let dedup = Deduplicator::new();
        let mut bits = FixedBitSet::with_capacity(4);
        bits.insert(1);

        let a = dedup.deduplicate_bit_set(&bits);
        let b = dedup.deduplicate_bit_set(&bits.clone());
        assert!(Arc::ptr_eq(&a, &b));

        let s1 = dedup.deduplicate_string("Downtown");
        let s2 = dedup.deduplicate_string(&String::from("Downtown"));
        assert!(Arc::ptr_eq(&s1, &s2));

        dedup.clear();
        assert!(dedup.is_empty());
    }
}
