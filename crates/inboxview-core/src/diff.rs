//! Ordered diffing of uniquely keyed sequences
//!
//! The edit script is computed from the longest common subsequence of keys.
//! Steps are ordered so that applying them left to right transforms the old
//! sequence into the new one: every deletion comes first, in descending
//! index order, followed by every insertion in ascending index order.
//! Items whose keys match are considered unchanged even if other fields
//! differ.

use crate::types::Item;
use std::hash::Hash;

/// Identity used for diffing
pub trait Keyed {
    type Key: Eq + Hash;

    fn key(&self) -> Self::Key;
}

impl Keyed for Item {
    type Key = String;

    fn key(&self) -> String {
        self.id.clone()
    }
}

impl<'a> Keyed for &'a str {
    type Key = &'a str;

    fn key(&self) -> &'a str {
        *self
    }
}

impl Keyed for String {
    type Key = String;

    fn key(&self) -> String {
        self.clone()
    }
}

/// One edit in a flat sequence
#[derive(Debug, Clone, PartialEq)]
pub enum DiffStep<T> {
    Insert { index: usize, value: T },
    Delete { index: usize, value: T },
}

impl<T> DiffStep<T> {
    pub fn index(&self) -> usize {
        match self {
            DiffStep::Insert { index, .. } | DiffStep::Delete { index, .. } => *index,
        }
    }

    pub fn value(&self) -> &T {
        match self {
            DiffStep::Insert { value, .. } | DiffStep::Delete { value, .. } => value,
        }
    }

    pub fn is_insert(&self) -> bool {
        matches!(self, DiffStep::Insert { .. })
    }
}

/// One edit addressed by (section, row)
#[derive(Debug, Clone, PartialEq)]
pub enum SectionedDiffStep<T> {
    Insert { section: usize, row: usize, value: T },
    Delete { section: usize, row: usize, value: T },
}

impl<T> SectionedDiffStep<T> {
    pub fn section(&self) -> usize {
        match self {
            SectionedDiffStep::Insert { section, .. } | SectionedDiffStep::Delete { section, .. } => {
                *section
            }
        }
    }

    pub fn row(&self) -> usize {
        match self {
            SectionedDiffStep::Insert { row, .. } | SectionedDiffStep::Delete { row, .. } => *row,
        }
    }

    pub fn value(&self) -> &T {
        match self {
            SectionedDiffStep::Insert { value, .. } | SectionedDiffStep::Delete { value, .. } => {
                value
            }
        }
    }

    /// Drop the section, keeping the row as a flat index
    pub fn into_flat(self) -> DiffStep<T> {
        match self {
            SectionedDiffStep::Insert { row, value, .. } => DiffStep::Insert { index: row, value },
            SectionedDiffStep::Delete { row, value, .. } => DiffStep::Delete { index: row, value },
        }
    }
}

/// Compute the edit script turning `old` into `new`
pub fn diff<T>(old: &[T], new: &[T]) -> Vec<DiffStep<T>>
where
    T: Keyed + Clone,
{
    let old_keys: Vec<T::Key> = old.iter().map(T::key).collect();
    let new_keys: Vec<T::Key> = new.iter().map(T::key).collect();

    let prefix = old_keys
        .iter()
        .zip(new_keys.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let suffix = old_keys[prefix..]
        .iter()
        .rev()
        .zip(new_keys[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let old_mid = &old_keys[prefix..old_keys.len() - suffix];
    let new_mid = &new_keys[prefix..new_keys.len() - suffix];

    let (old_kept, new_kept) = common_subsequence(old_mid, new_mid);

    let mut steps = Vec::new();
    for i in (0..old_mid.len()).rev() {
        if !old_kept[i] {
            let index = prefix + i;
            steps.push(DiffStep::Delete {
                index,
                value: old[index].clone(),
            });
        }
    }
    for j in 0..new_mid.len() {
        if !new_kept[j] {
            let index = prefix + j;
            steps.push(DiffStep::Insert {
                index,
                value: new[index].clone(),
            });
        }
    }
    steps
}

/// Diff where every row lives in the single section `section`
pub fn diff_sectioned<T>(old: &[T], new: &[T], section: usize) -> Vec<SectionedDiffStep<T>>
where
    T: Keyed + Clone,
{
    diff(old, new)
        .into_iter()
        .map(|step| match step {
            DiffStep::Insert { index, value } => SectionedDiffStep::Insert {
                section,
                row: index,
                value,
            },
            DiffStep::Delete { index, value } => SectionedDiffStep::Delete {
                section,
                row: index,
                value,
            },
        })
        .collect()
}

/// Apply steps in order. Out-of-range indices are skipped.
pub fn apply_diff<T: Clone>(target: &mut Vec<T>, steps: &[DiffStep<T>]) {
    for step in steps {
        match step {
            DiffStep::Delete { index, .. } => {
                if *index < target.len() {
                    target.remove(*index);
                }
            }
            DiffStep::Insert { index, value } => {
                if *index <= target.len() {
                    target.insert(*index, value.clone());
                }
            }
        }
    }
}

/// Upper bound on LCS table cells (16 MiB of `u32`)
const MAX_TABLE_CELLS: usize = 4_000_000;

/// Marks which positions of `a` and `b` belong to one longest common
/// subsequence.
///
/// Costs O(n * m) time and memory over the middle left after trimming the
/// shared prefix and suffix. Past [`MAX_TABLE_CELLS`] nothing is kept, which
/// turns the script into delete-all then insert-all.
fn common_subsequence<K: Eq>(a: &[K], b: &[K]) -> (Vec<bool>, Vec<bool>) {
    let n = a.len();
    let m = b.len();
    let mut a_kept = vec![false; n];
    let mut b_kept = vec![false; m];
    if n == 0 || m == 0 {
        return (a_kept, b_kept);
    }
    if n.saturating_mul(m) > MAX_TABLE_CELLS {
        tracing::debug!(old = n, new = m, "diff window too large, replacing wholesale");
        return (a_kept, b_kept);
    }

    // lengths[i][j] = LCS length of a[i..] and b[j..]
    let width = m + 1;
    let mut lengths = vec![0u32; (n + 1) * width];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lengths[i * width + j] = if a[i] == b[j] {
                lengths[(i + 1) * width + j + 1] + 1
            } else {
                lengths[(i + 1) * width + j].max(lengths[i * width + j + 1])
            };
        }
    }

    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if a[i] == b[j] {
            a_kept[i] = true;
            b_kept[j] = true;
            i += 1;
            j += 1;
        } else if lengths[(i + 1) * width + j] >= lengths[i * width + j + 1] {
            i += 1;
        } else {
            j += 1;
        }
    }
    (a_kept, b_kept)
}
