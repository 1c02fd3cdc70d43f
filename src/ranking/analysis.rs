//! Reading a ranking matrix: best dimension per point, per-point order and aggregate importance.

use anyhow::bail;
use ndarray::{ArrayView1, ArrayView2, Axis};
use rayon::prelude::*;

use crate::{FloatOps, RankOrder};

fn check_mask<T: FloatOps>(ranks: &ArrayView2<'_, T>, excluded: &[bool]) -> anyhow::Result<()> {
    if excluded.len() != ranks.ncols() {
        bail!(
            "Length of exclusion mask ({}) does not match number of ranked dimensions ({})",
            excluded.len(),
            ranks.ncols()
        );
    }
    Ok(())
}

/// Best ranked dimension of one row, skipping excluded dimensions and NaN. Ties go to the
/// lowest index. `None` if nothing is left to choose from.
pub fn top_dimension<T: FloatOps>(
    row: ArrayView1<'_, T>,
    order: RankOrder,
    excluded: &[bool],
) -> Option<usize> {
    let mut best: Option<(usize, T)> = None;
    for (d, &rank) in row.iter().enumerate() {
        if excluded.get(d).copied().unwrap_or(false) || rank.is_nan() {
            continue;
        }
        match best {
            Some((_, current)) if !order.is_better(rank, current) => {}
            _ => best = Some((d, rank)),
        }
    }
    best.map(|(d, _)| d)
}

/// Best ranked dimension of every row of `ranks`.
pub fn top_dimensions<T: FloatOps>(
    ranks: ArrayView2<'_, T>,
    order: RankOrder,
    excluded: &[bool],
) -> anyhow::Result<Vec<Option<usize>>> {
    check_mask(&ranks, excluded)?;
    let rows: Vec<ArrayView1<'_, T>> = ranks.axis_iter(Axis(0)).collect();
    Ok(rows
        .into_par_iter()
        .map(|row| top_dimension(row, order, excluded))
        .collect())
}

/// Dimension indices of one row ordered best first. NaN ranks sort last.
pub fn sorted_dimensions<T: FloatOps>(row: ArrayView1<'_, T>, order: RankOrder) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..row.len()).collect();
    indices.sort_by(|&a, &b| {
        let (ra, rb) = (row[a], row[b]);
        match (ra.is_nan(), rb.is_nan()) {
            (true, true) => std::cmp::Ordering::Equal,
            (true, false) => std::cmp::Ordering::Greater,
            (false, true) => std::cmp::Ordering::Less,
            (false, false) => {
                let ordering = ra.partial_cmp(&rb).unwrap_or(std::cmp::Ordering::Equal);
                match order {
                    RankOrder::Ascending => ordering,
                    RankOrder::Descending => ordering.reverse(),
                }
            }
        }
    });
    indices
}

/// How often each dimension is the best ranked one. Every included dimension that ties with
/// a row's best rank is counted for that row; excluded dimensions always count zero.
pub fn top_counts<T: FloatOps>(
    ranks: ArrayView2<'_, T>,
    order: RankOrder,
    excluded: &[bool],
) -> anyhow::Result<Vec<usize>> {
    check_mask(&ranks, excluded)?;
    let mut counts = vec![0usize; ranks.ncols()];
    for row in ranks.axis_iter(Axis(0)) {
        let Some(top) = top_dimension(row, order, excluded) else {
            continue;
        };
        let best = row[top];
        for (d, &rank) in row.iter().enumerate() {
            if !excluded[d] && rank == best {
                counts[d] += 1;
            }
        }
    }
    Ok(counts)
}

/// Included dimensions ordered by how often they are the best ranked dimension, most
/// important first. Equal counts keep index order.
pub fn dimension_importance<T: FloatOps>(
    ranks: ArrayView2<'_, T>,
    order: RankOrder,
    excluded: &[bool],
) -> anyhow::Result<Vec<usize>> {
    let counts = top_counts(ranks, order, excluded)?;
    let mut dims: Vec<usize> = (0..counts.len()).filter(|&d| !excluded[d]).collect();
    dims.sort_by(|&a, &b| counts[b].cmp(&counts[a]));
    Ok(dims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_top_dimension_directions() {
        let ranks = array![[0.5f32, 0.2, 0.3], [0.1, 0.1, 0.8]];
        let none = [false; 3];

        let low = top_dimensions(ranks.view(), RankOrder::Ascending, &none).unwrap();
        assert_eq!(low, vec![Some(1), Some(0)]);

        let high = top_dimensions(ranks.view(), RankOrder::Descending, &none).unwrap();
        assert_eq!(high, vec![Some(0), Some(2)]);
    }

    #[test]
    fn test_top_dimension_skips_excluded() {
        let ranks = array![[0.5f32, 0.2, 0.3]];
        let top =
            top_dimensions(ranks.view(), RankOrder::Ascending, &[false, true, false]).unwrap();
        assert_eq!(top, vec![Some(2)]);

        let top = top_dimensions(ranks.view(), RankOrder::Ascending, &[true, true, true]).unwrap();
        assert_eq!(top, vec![None]);

        assert!(top_dimensions(ranks.view(), RankOrder::Ascending, &[true]).is_err());
    }

    #[test]
    fn test_top_dimension_skips_nan() {
        let ranks = array![[f32::NAN, 0.7, 0.3]];
        assert_eq!(
            top_dimension(ranks.row(0), RankOrder::Ascending, &[false; 3]),
            Some(2)
        );
        assert_eq!(
            top_dimension(ranks.row(0), RankOrder::Descending, &[false; 3]),
            Some(1)
        );
    }

    #[test]
    fn test_sorted_dimensions() {
        let row = array![0.3f64, f64::NAN, 0.1, 0.6];
        assert_eq!(sorted_dimensions(row.view(), RankOrder::Ascending), vec![2, 0, 3, 1]);
        assert_eq!(sorted_dimensions(row.view(), RankOrder::Descending), vec![3, 0, 2, 1]);
    }

    #[test]
    fn test_importance_order() {
        let ranks = array![
            [0.1f32, 0.5, 0.4, 0.0],
            [0.1, 0.5, 0.4, 0.9],
            [0.6, 0.2, 0.2, 0.9],
            [0.3, 0.3, 0.1, 0.9]
        ];
        let mask = [false, false, false, true];
        let counts = top_counts(ranks.view(), RankOrder::Ascending, &mask).unwrap();
        // row 2 ties between dimensions 1 and 2
        assert_eq!(counts, vec![2, 1, 2, 0]);

        let order = dimension_importance(ranks.view(), RankOrder::Ascending, &mask).unwrap();
        assert_eq!(order, vec![0, 2, 1]);
    }
}
