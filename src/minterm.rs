//! Reference-counted pool of state encodings.
//!
//! A *minterm* is a fixed-length vector assigning a value to every state variable.
//! Variables are 1-indexed: slot 0 is reserved and always zero, slot `k` holds the
//! value of variable `k`. All minterms of a pool have the same length `L = N + 1`.
//!
//! The pool hands out lightweight [`Minterm`] handles. Each handle carries one
//! reference: every [`acquire`][MintermPool::acquire] and [`share`][MintermPool::share]
//! must be matched by exactly one [`release`][MintermPool::release]. Released slots go
//! to a free list and are reused by later acquisitions.
//!
//! # Example
//!
//! ```
//! use ssgen_rs::minterm::MintermPool;
//!
//! let mut pool = MintermPool::new(2);
//! let a = pool.acquire();
//! pool.fill(a, &[0, 3, 1]);
//! let b = pool.share(a);
//! assert_eq!(pool.show(b), "[x1=3, x2=1]");
//! pool.release(a);
//! pool.release(b);
//! assert_eq!(pool.live(), 0);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::fmt::Write;
use std::hash::{Hash, Hasher};

/// Handle to a pooled state encoding.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Minterm(u32);

impl Minterm {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

struct Entry {
    slots: Box<[u32]>,
    refcount: u32,
    /// Next free entry, meaningful only while `refcount == 0`.
    next_free: Option<u32>,
}

pub struct MintermPool {
    entries: Vec<Entry>,
    width: usize,
    free_head: Option<u32>,
    live: usize,
    peak_live: usize,
}

impl MintermPool {
    /// Create a pool for encodings of `num_variables` state variables.
    pub fn new(num_variables: usize) -> Self {
        Self {
            entries: Vec::new(),
            width: num_variables + 1,
            free_head: None,
            live: 0,
            peak_live: 0,
        }
    }

    /// Length of every minterm (number of variables plus the reserved slot).
    pub fn width(&self) -> usize {
        self.width
    }
    /// Number of minterms currently held by someone.
    pub fn live(&self) -> usize {
        self.live
    }
    /// Number of entries ever allocated (live plus free).
    pub fn allocated(&self) -> usize {
        self.entries.len()
    }
    /// Maximal number of simultaneously live minterms.
    pub fn peak_live(&self) -> usize {
        self.peak_live
    }

    fn entry(&self, m: Minterm) -> &Entry {
        let entry = &self.entries[m.index()];
        assert!(entry.refcount > 0, "Minterm {} is not live", m.0);
        entry
    }

    /// Get a zero-filled minterm with refcount 1, reusing a free entry if possible.
    pub fn acquire(&mut self) -> Minterm {
        let index = match self.free_head {
            Some(index) => {
                let entry = &mut self.entries[index as usize];
                self.free_head = entry.next_free.take();
                entry.slots.fill(0);
                entry.refcount = 1;
                index
            }
            None => {
                let index = self.entries.len() as u32;
                self.entries.push(Entry {
                    slots: vec![0; self.width].into_boxed_slice(),
                    refcount: 1,
                    next_free: None,
                });
                index
            }
        };

        self.live += 1;
        self.peak_live = self.peak_live.max(self.live);
        Minterm(index)
    }

    /// Overwrite the variable slots of an exclusively held minterm.
    ///
    /// # Panics
    ///
    /// Panics if the minterm is shared or if `assignment` has the wrong length.
    pub fn fill(&mut self, m: Minterm, assignment: &[u32]) {
        assert_eq!(assignment.len(), self.width, "Assignment has wrong length");
        let slots = self.get_mut(m);
        slots.copy_from_slice(assignment);
        slots[0] = 0;
    }

    /// Read the slots of a minterm.
    pub fn get(&self, m: Minterm) -> &[u32] {
        &self.entry(m).slots
    }

    /// Mutable access to an exclusively held minterm.
    ///
    /// # Panics
    ///
    /// Panics if the minterm is shared: shared encodings are immutable.
    pub fn get_mut(&mut self, m: Minterm) -> &mut [u32] {
        let entry = &mut self.entries[m.index()];
        assert_eq!(entry.refcount, 1, "Minterm {} is not exclusively held", m.0);
        &mut entry.slots
    }

    /// Add a reference to the minterm and return the same handle.
    pub fn share(&mut self, m: Minterm) -> Minterm {
        let entry = &mut self.entries[m.index()];
        assert!(entry.refcount > 0, "Minterm {} is not live", m.0);
        entry.refcount += 1;
        m
    }

    /// Drop one reference; at zero the entry returns to the free list.
    pub fn release(&mut self, m: Minterm) {
        let entry = &mut self.entries[m.index()];
        assert!(entry.refcount > 0, "Minterm {} released twice", m.0);
        entry.refcount -= 1;
        if entry.refcount == 0 {
            entry.next_free = self.free_head;
            self.free_head = Some(m.0);
            self.live -= 1;
        }
    }

    /// Current refcount of the minterm (0 for free entries).
    pub fn refcount(&self, m: Minterm) -> u32 {
        self.entries[m.index()].refcount
    }

    /// Compare the variable slots of two minterms.
    pub fn equals(&self, a: Minterm, b: Minterm) -> bool {
        a == b || self.get(a)[1..] == self.get(b)[1..]
    }

    /// Hash of the variable slots, consistent with [`equals`][Self::equals].
    pub fn hash(&self, m: Minterm) -> u64 {
        hash_slots(self.get(m))
    }

    /// Render a minterm as `[x1=v1, x2=v2, ...]`.
    pub fn show(&self, m: Minterm) -> String {
        show_slots(self.get(m))
    }
}

pub(crate) fn hash_slots(slots: &[u32]) -> u64 {
    let mut hasher = DefaultHasher::new();
    slots[1..].hash(&mut hasher);
    hasher.finish()
}

pub(crate) fn show_slots(slots: &[u32]) -> String {
    let mut result = String::from("[");
    for (k, value) in slots.iter().enumerate().skip(1) {
        if k > 1 {
            result.push_str(", ");
        }
        write!(&mut result, "x{}={}", k, value).unwrap();
    }
    result.push(']');
    result
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_acquire_release_reuse() {
        let mut pool = MintermPool::new(3);
        let a = pool.acquire();
        let b = pool.acquire();
        assert_ne!(a, b);
        assert_eq!(pool.live(), 2);

        pool.release(a);
        assert_eq!(pool.live(), 1);

        let c = pool.acquire();
        assert_eq!(c, a, "free entry should be reused");
        assert_eq!(pool.get(c), &[0, 0, 0, 0]);
        assert_eq!(pool.allocated(), 2);
        assert_eq!(pool.peak_live(), 2);
    }

    #[test]
    fn test_share_keeps_entry_alive() {
        let mut pool = MintermPool::new(1);
        let a = pool.acquire();
        pool.fill(a, &[0, 7]);
        let b = pool.share(a);
        assert_eq!(pool.refcount(a), 2);

        pool.release(a);
        assert_eq!(pool.get(b), &[0, 7]);
        pool.release(b);
        assert_eq!(pool.refcount(a), 0);
        assert_eq!(pool.live(), 0);
    }

    #[test]
    fn test_equals_ignores_reserved_slot() {
        let mut pool = MintermPool::new(2);
        let a = pool.acquire();
        let b = pool.acquire();
        pool.fill(a, &[0, 1, 2]);
        pool.get_mut(b).copy_from_slice(&[9, 1, 2]);
        assert!(pool.equals(a, b));
        assert_eq!(pool.hash(a), pool.hash(b));

        pool.get_mut(b)[2] = 3;
        assert!(!pool.equals(a, b));
    }

    #[test]
    fn test_show() {
        let mut pool = MintermPool::new(3);
        let a = pool.acquire();
        pool.fill(a, &[0, 1, 0, 4]);
        assert_eq!(pool.show(a), "[x1=1, x2=0, x3=4]");
    }

    #[test]
    #[should_panic(expected = "is not exclusively held")]
    fn test_shared_minterm_is_immutable() {
        let mut pool = MintermPool::new(1);
        let a = pool.acquire();
        let _b = pool.share(a);
        pool.fill(a, &[0, 1]);
    }

    #[test]
    #[should_panic(expected = "released twice")]
    fn test_double_release_panics() {
        let mut pool = MintermPool::new(1);
        let a = pool.acquire();
        pool.release(a);
        pool.release(a);
    }
}
