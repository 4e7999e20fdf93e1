use std::cmp::min;
use std::ops::Index;

use crate::utils::MyHash;

#[derive(Clone)]
struct Entry<T> {
    value: T,
    next: usize,
    occupied: bool,
}

impl<T> Default for Entry<T>
where
    T: Default,
{
    fn default() -> Self {
        Self {
            value: T::default(),
            next: 0,
            occupied: false,
        }
    }
}

/// Returned by [`Table::put`] when every cell of the table is occupied.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TableFull {
    /// Number of usable cells (the sentry excluded).
    pub capacity: usize,
}

/// Hash-consing table with a fixed number of cells.
///
/// Cell 0 is a sentry and never holds a value, so index 0 doubles as "none" in bucket chains.
pub struct Table<T> {
    data: Vec<Entry<T>>,

    buckets: Vec<usize>,
    bitmask: u64,

    /// Index of the first *possibly* free (non-occupied) cell.
    min_free: usize,
    /// Index of the last cell ever occupied.
    last_index: usize,
    /// Number of occupied cells.
    real_size: usize,
}

impl<T> Table<T>
where
    T: Default,
{
    /// Create a new table of size `2^bits`.
    pub fn new(bits: usize) -> Self {
        assert!(bits <= 31, "Storage bits should be in the range 0..=31");

        let capacity = 1 << bits;
        let mut data: Vec<Entry<T>> = Vec::with_capacity(capacity);
        data.resize_with(capacity, Entry::default);
        data[0].occupied = true; // sentry

        let buckets_bits = min(bits, 20);
        let buckets_size = 1 << buckets_bits;
        let buckets = vec![0; buckets_size];
        let bitmask = (buckets_size - 1) as u64;

        Self {
            data,
            buckets,
            bitmask,
            min_free: 1,
            last_index: 0,
            real_size: 0,
        }
    }
}

impl<T> Table<T> {
    /// Total number of cells, including the sentry.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }
    /// Number of occupied cells.
    pub fn real_size(&self) -> usize {
        self.real_size
    }

    pub fn value(&self, index: usize) -> &T {
        assert_ne!(index, 0, "Index is 0");
        &self.data[index].value
    }

    pub fn is_occupied(&self, index: usize) -> bool {
        assert_ne!(index, 0, "Index is 0");
        self.data[index].occupied
    }

    fn alloc(&mut self) -> Option<usize> {
        let index = match (self.min_free..=self.last_index).find(|&i| !self.data[i].occupied) {
            Some(i) => i,
            None => {
                if self.last_index + 1 >= self.capacity() {
                    return None;
                }
                self.last_index += 1;
                self.last_index
            }
        };

        self.data[index].occupied = true;
        self.min_free = index + 1;
        self.real_size += 1;

        Some(index)
    }

    /// Add a value without registering it in any bucket.
    pub fn add(&mut self, value: T) -> Result<usize, TableFull> {
        let index = self.alloc().ok_or(TableFull {
            capacity: self.capacity() - 1,
        })?;
        self.data[index].value = value;
        self.data[index].next = 0;
        Ok(index)
    }
}

impl<T> Table<T>
where
    T: MyHash + Eq,
{
    fn bucket_index(&self, value: &T) -> usize {
        (value.hash() & self.bitmask) as usize
    }

    /// Return the index of `value`, inserting it if it is not present yet.
    pub fn put(&mut self, value: T) -> Result<usize, TableFull> {
        let bucket_index = self.bucket_index(&value);
        let mut index = self.buckets[bucket_index];

        if index == 0 {
            let i = self.add(value)?;
            self.buckets[bucket_index] = i;
            return Ok(i);
        }

        loop {
            if &value == self.value(index) {
                return Ok(index);
            }

            let next = self.data[index].next;
            if next == 0 {
                let i = self.add(value)?;
                self.data[index].next = i;
                return Ok(i);
            }
            index = next;
        }
    }

    /// Drop every occupied cell for which `keep` returns `false`, relinking the bucket chains.
    ///
    /// Returns the number of dropped cells.
    pub fn sweep(&mut self, keep: impl Fn(usize) -> bool) -> usize {
        let mut dropped = 0;
        for b in 0..self.buckets.len() {
            let mut prev = 0;
            let mut index = self.buckets[b];
            while index != 0 {
                let next = self.data[index].next;
                if keep(index) {
                    if prev == 0 {
                        self.buckets[b] = index;
                    } else {
                        self.data[prev].next = index;
                    }
                    prev = index;
                } else {
                    self.data[index].occupied = false;
                    self.data[index].next = 0;
                    self.min_free = min(self.min_free, index);
                    self.real_size -= 1;
                    dropped += 1;
                }
                index = next;
            }
            if prev == 0 {
                self.buckets[b] = 0;
            } else {
                self.data[prev].next = 0;
            }
        }
        dropped
    }
}

impl<T> Index<usize> for Table<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        self.value(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
    struct Item(i32);

    impl MyHash for Item {
        fn hash(&self) -> u64 {
            self.0.unsigned_abs() as u64
        }
    }

    #[test]
    fn test_add() {
        let mut table = Table::new(2);
        let index = table.add(Item(42)).unwrap();
        assert_eq!(table[index], Item(42));
        assert_eq!(table.real_size(), 1);
    }

    #[test]
    fn test_full() {
        let mut table = Table::<Item>::new(2);
        assert_eq!(table.add(Item(1)), Ok(1));
        assert_eq!(table.add(Item(2)), Ok(2));
        assert_eq!(table.add(Item(3)), Ok(3));
        assert_eq!(table.add(Item(4)), Err(TableFull { capacity: 3 }));
    }

    #[test]
    fn test_put_dedup() {
        let mut table = Table::new(3);
        let i1 = table.put(Item(5)).unwrap();
        let i2 = table.put(Item(-5)).unwrap();
        let i3 = table.put(Item(5)).unwrap();
        assert_ne!(i1, i2);
        assert_eq!(i1, i3);
        assert_eq!(table.real_size(), 2);
    }

    #[test]
    fn test_sweep_relinks_chain() {
        let mut table = Table::new(3);
        // Same bucket: hash(5) == hash(-5).
        let a = table.put(Item(5)).unwrap();
        let b = table.put(Item(-5)).unwrap();
        let c = table.put(Item(7)).unwrap();

        let dropped = table.sweep(|i| i != a);
        assert_eq!(dropped, 1);
        assert!(!table.is_occupied(a));
        assert!(table.is_occupied(b));
        assert!(table.is_occupied(c));

        // Still findable after relinking, and the freed cell is reused.
        assert_eq!(table.put(Item(-5)).unwrap(), b);
        assert_eq!(table.put(Item(5)).unwrap(), a);
        assert_eq!(table.real_size(), 3);
    }
}
