//! Bounded top-k result containers.
//!
//! Both containers keep at most `k` `(score, id)` pairs sorted by rank. Rank 0
//! is the best entry: the largest score in a [`MaxKList`], the smallest in a
//! [`MinKList`]. Ties are broken by ascending id, so the ranked sequence is a
//! pure function of the multiset of inserted pairs, independent of insertion
//! order.
//!
//! ```rust
//! use amips::topk::{MaxKList, TopK};
//!
//! let mut list = MaxKList::new(2);
//! list.insert(0.5, 7);
//! list.insert(2.0, 3);
//! list.insert(1.0, 9);
//!
//! assert_eq!(list.ids(), vec![3, 9]);
//! ```

use std::cmp::Ordering;

/// Capability interface for a caller-owned ranked result sink.
///
/// The MIP engines only ever insert into a `TopK`; they never own one.
pub trait TopK {
    /// Offer a pair. Returns `true` if it was kept.
    ///
    /// NaN scores are never kept.
    fn insert(&mut self, score: f32, id: u32) -> bool;

    /// Maximum number of retained entries.
    fn capacity(&self) -> usize;

    /// Number of retained entries.
    fn len(&self) -> usize;

    /// Id at rank `i` (0 = best).
    fn ith_id(&self, i: usize) -> Option<u32>;

    /// Score at rank `i` (0 = best).
    fn ith_score(&self, i: usize) -> Option<f32>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_full(&self) -> bool {
        self.len() >= self.capacity()
    }
}

#[derive(Debug, Clone)]
struct Bounded {
    k: usize,
    /// Sorted by rank; never longer than `k`.
    entries: Vec<(f32, u32)>,
    descending: bool,
}

impl Bounded {
    fn new(k: usize, descending: bool) -> Self {
        Self {
            k,
            entries: Vec::with_capacity(k),
            descending,
        }
    }

    /// `Less` means `a` ranks ahead of `b`.
    fn rank_cmp(&self, a: &(f32, u32), b: &(f32, u32)) -> Ordering {
        let by_score = if self.descending {
            b.0.total_cmp(&a.0)
        } else {
            a.0.total_cmp(&b.0)
        };
        by_score.then(a.1.cmp(&b.1))
    }

    fn insert(&mut self, score: f32, id: u32) -> bool {
        if self.k == 0 || score.is_nan() {
            return false;
        }
        let item = (score, id);
        if self.entries.len() == self.k {
            // Full: only admit if strictly better than the current worst.
            let worst = &self.entries[self.k - 1];
            if self.rank_cmp(&item, worst) != Ordering::Less {
                return false;
            }
            self.entries.pop();
        }
        let pos = self
            .entries
            .partition_point(|e| self.rank_cmp(e, &item) == Ordering::Less);
        self.entries.insert(pos, item);
        true
    }
}

macro_rules! bounded_list {
    ($(#[$meta:meta])* $name:ident, descending = $desc:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name {
            inner: Bounded,
        }

        impl $name {
            /// Create an empty list retaining at most `k` entries.
            pub fn new(k: usize) -> Self {
                Self {
                    inner: Bounded::new(k, $desc),
                }
            }

            /// Score of the entry currently at the last kept rank.
            pub fn kth_score(&self) -> Option<f32> {
                self.inner.entries.last().map(|e| e.0)
            }

            /// Ids in rank order.
            pub fn ids(&self) -> Vec<u32> {
                self.inner.entries.iter().map(|e| e.1).collect()
            }

            /// `(id, score)` pairs in rank order.
            pub fn iter(&self) -> impl Iterator<Item = (u32, f32)> + '_ {
                self.inner.entries.iter().map(|&(s, id)| (id, s))
            }

            /// Drop every entry, keeping the capacity.
            pub fn clear(&mut self) {
                self.inner.entries.clear();
            }
        }

        impl TopK for $name {
            fn insert(&mut self, score: f32, id: u32) -> bool {
                self.inner.insert(score, id)
            }

            fn capacity(&self) -> usize {
                self.inner.k
            }

            fn len(&self) -> usize {
                self.inner.entries.len()
            }

            fn ith_id(&self, i: usize) -> Option<u32> {
                self.inner.entries.get(i).map(|e| e.1)
            }

            fn ith_score(&self, i: usize) -> Option<f32> {
                self.inner.entries.get(i).map(|e| e.0)
            }
        }
    };
}

bounded_list!(
    /// Keeps the `k` largest scores (inner products).
    MaxKList,
    descending = true
);

bounded_list!(
    /// Keeps the `k` smallest scores (distances).
    MinKList,
    descending = false
);
