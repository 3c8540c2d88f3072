//! Ordered insertion by rank.
//!
//! Slot lists are published as immutable snapshots, so insertion always
//! builds a new list instead of editing the old one.

/// Anything carrying an optional ordering rank.
///
/// A missing rank compares as `0`.
pub trait Ranked {
    fn rank(&self) -> Option<i32>;

    /// Rank used for comparisons.
    fn effective_rank(&self) -> i32 {
        self.rank().unwrap_or(0)
    }
}

/// Insert `item` before the first element whose rank is strictly greater,
/// or append if there is none.
///
/// Equal ranks keep arrival order. The input slice is left untouched.
pub fn insert_sorted<T: Ranked + Clone>(list: &[T], item: T) -> Vec<T> {
    let rank = item.effective_rank();
    let position = list
        .iter()
        .position(|existing| existing.effective_rank() > rank)
        .unwrap_or(list.len());

    let mut next = Vec::with_capacity(list.len() + 1);
    next.extend_from_slice(&list[..position]);
    next.push(item);
    next.extend_from_slice(&list[position..]);
    next
}
