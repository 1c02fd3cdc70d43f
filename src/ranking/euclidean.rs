use std::time::Instant;

use log::debug;
use ndarray::{Array2, ArrayView2, Axis};
use rayon::prelude::*;

use super::{
    check_fit_inputs, check_selection, par_rows, shares, DimensionRanker, Metric, ScoreTable,
};
use crate::dense::DataTable;
use crate::neighborhood::NeighborhoodMatrix;
use crate::statistics::Moments;
use crate::utils::nonzero_or_one;
use crate::FloatOps;

/// Ranks dimensions by their share of the squared Euclidean distance between a point and its
/// neighbors, relative to the same share measured against the dataset centroid. Lower is
/// better: a dimension that barely separates neighbors is what keeps them together.
///
/// Pairs at zero distance carry no direction and are skipped.
#[derive(Debug, Clone)]
pub struct EuclideanRanking<T: FloatOps> {
    centroid: Vec<T>,
    global_contribution: Vec<T>,
    local_contribution: Array2<T>,
    scores: ScoreTable<T>,
}

/// Adds `(p_d - r_d)² / ‖p - r‖²` to `acc[d]` for every dimension. Returns `false` and leaves
/// `acc` untouched when the two points coincide.
fn accumulate_contributions<T: FloatOps>(p: &[T], r: &[T], acc: &mut [T]) -> bool {
    let total: T = p
        .iter()
        .zip(r)
        .map(|(&a, &b)| (a - b) * (a - b))
        .sum();
    if !(total > T::zero()) || !total.is_finite() {
        return false;
    }
    for ((out, &a), &b) in acc.iter_mut().zip(p).zip(r) {
        *out += (a - b) * (a - b) / total;
    }
    true
}

/// Mean contribution per dimension between `origin` and the rows in `points`.
fn mean_contributions<T: FloatOps>(
    table: &DataTable<T>,
    origin: &[T],
    points: impl Iterator<Item = usize>,
) -> Vec<T> {
    let mut acc = vec![T::zero(); table.num_dimensions()];
    let mut count = 0usize;
    for r in points {
        if accumulate_contributions(origin, table.row_slice(r), &mut acc) {
            count += 1;
        }
    }
    if count > 0 {
        let count = T::from_count(count);
        acc.iter_mut().for_each(|v| *v = *v / count);
    }
    acc
}

impl<T: FloatOps> EuclideanRanking<T> {
    pub fn fit(
        table: &DataTable<T>,
        neighborhoods: &NeighborhoodMatrix<T>,
    ) -> anyhow::Result<Self> {
        check_fit_inputs(table, neighborhoods)?;
        let start = Instant::now();

        let n = table.num_points();
        let d = table.num_dimensions();
        let centroid = table
            .view()
            .mean_axis(Axis(0))
            .map(|m| m.to_vec())
            .unwrap_or_else(|| vec![T::zero(); d]);

        let (sum, count) = (0..n)
            .into_par_iter()
            .fold(
                || (vec![T::zero(); d], 0usize),
                |(mut acc, count), i| {
                    let hit = accumulate_contributions(&centroid, table.row_slice(i), &mut acc);
                    (acc, count + usize::from(hit))
                },
            )
            .reduce(
                || (vec![T::zero(); d], 0usize),
                |(mut a, ca), (b, cb)| {
                    a.iter_mut().zip(b).for_each(|(x, y)| *x += y);
                    (a, ca + cb)
                },
            );
        let global_contribution: Vec<T> = sum
            .into_iter()
            .map(|s| {
                if count > 0 {
                    nonzero_or_one(s / T::from_count(count))
                } else {
                    T::one()
                }
            })
            .collect();

        let local_contribution = par_rows(n, d, |i, mut row| {
            let p = table.row_slice(i);
            let neighbors = neighborhoods.neighbors(i).iter().copied().filter(|&r| r != i);
            for (out, v) in row.iter_mut().zip(mean_contributions(table, p, neighbors)) {
                *out = v;
            }
        });

        let scores = ScoreTable::from_ratios(&local_contribution, &global_contribution);
        debug!(
            "Fitted euclidean ranking over {} points × {} dimensions in {:?}",
            n,
            d,
            start.elapsed()
        );

        Ok(Self {
            centroid,
            global_contribution,
            local_contribution,
            scores,
        })
    }

    pub fn centroid(&self) -> &[T] {
        &self.centroid
    }

    /// Mean contribution of each dimension to the distance from the centroid, zeros replaced by one.
    pub fn global_contribution(&self) -> &[T] {
        &self.global_contribution
    }

    pub fn local_contribution(&self) -> ArrayView2<'_, T> {
        self.local_contribution.view()
    }
}

impl<T: FloatOps> DimensionRanker<T> for EuclideanRanking<T> {
    fn metric(&self) -> Metric {
        Metric::Euclidean
    }

    fn num_points(&self) -> usize {
        self.scores.num_points()
    }

    fn num_dimensions(&self) -> usize {
        self.scores.num_dimensions()
    }

    #[inline]
    fn rank(&self, point: usize, dim: usize) -> T {
        self.scores.rank(point, dim)
    }

    /// Contributions are measured from the selection's own centroid to each selected point.
    fn rank_selection(&self, table: &DataTable<T>, selection: &[usize]) -> anyhow::Result<Vec<T>> {
        check_selection(table, self.num_dimensions(), selection)?;
        let centre = Moments::means(table, selection);
        let ratios: Vec<T> = mean_contributions(table, &centre, selection.iter().copied())
            .into_iter()
            .zip(&self.global_contribution)
            .map(|(local, &global)| local / global)
            .collect();
        Ok(shares(&ratios))
    }
}
