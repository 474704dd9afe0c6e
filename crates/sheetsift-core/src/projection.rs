//! Merge per-chunk index sets and project them back onto the dataset.

use std::collections::BTreeSet;

use tracing::warn;

use crate::Row;

/// Union of index sets, deduplicated and sorted ascending.
///
/// The result does not depend on the order the sets arrive in.
pub fn aggregate<I, S>(sets: I) -> Vec<usize>
where
    I: IntoIterator<Item = S>,
    S: IntoIterator<Item = usize>,
{
    sets.into_iter()
        .flatten()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Map 1-based indices onto `rows`, in the order given.
///
/// Indices that do not resolve (0, or past the end) are skipped.
pub fn project(indices: &[usize], rows: &[Row]) -> Vec<Row> {
    indices
        .iter()
        .filter_map(|&index| {
            let row = index.checked_sub(1).and_then(|i| rows.get(i));
            if row.is_none() {
                warn!(index, rows = rows.len(), "aggregated index out of bounds, skipping");
            }
            row.cloned()
        })
        .collect()
}
