//! # Dimension ranking
//!
//! Scores every (point, dimension) pair by how well the dimension explains the point's local
//! neighborhood in the projection. Three strategies are available:
//!
//! - [`VarianceRanking`]: local variance relative to global variance, lower is better
//! - [`ValueRanking`]: deviation of the local mean from the global mean, higher is better
//! - [`EuclideanRanking`]: share of the neighbor distances carried by the dimension, lower is better
//!
//! Each strategy precomputes its global and per-point local statistics once (`fit`) and then
//! answers per-point queries in constant time. For a fixed point the ranks over all dimensions
//! form a normalized share and sum to one.
//!
//! [`Ranking`] is the closed set of strategies the engine switches between.

mod analysis;
mod euclidean;
mod value;
mod variance;

pub use analysis::{
    dimension_importance, sorted_dimensions, top_counts, top_dimension, top_dimensions,
};
pub use euclidean::EuclideanRanking;
pub use value::ValueRanking;
pub use variance::VarianceRanking;

use anyhow::bail;
use ndarray::{Array2, ArrayViewMut1, Axis};
use rayon::prelude::*;

use crate::dense::DataTable;
use crate::neighborhood::NeighborhoodMatrix;
use crate::{FloatOps, RankOrder};

/// Available ranking strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Metric {
    #[default]
    Variance,
    Value,
    Euclidean,
}

impl Metric {
    /// Direction in which the strategy's ranks improve.
    pub fn rank_order(&self) -> RankOrder {
        match self {
            Metric::Variance | Metric::Euclidean => RankOrder::Ascending,
            Metric::Value => RankOrder::Descending,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Metric::Variance => "variance",
            Metric::Value => "value",
            Metric::Euclidean => "euclidean",
        }
    }
}

/// A fitted ranking strategy.
pub trait DimensionRanker<T: FloatOps> {
    fn metric(&self) -> Metric;

    fn num_points(&self) -> usize;

    fn num_dimensions(&self) -> usize;

    /// Rank of dimension `dim` for the precomputed neighborhood of `point`.
    fn rank(&self, point: usize, dim: usize) -> T;

    /// Ranks of every dimension for `point`.
    fn point_ranks(&self, point: usize) -> Vec<T> {
        (0..self.num_dimensions())
            .map(|dim| self.rank(point, dim))
            .collect()
    }

    /// Aggregate ranks of every dimension for an arbitrary group of points, computed from the
    /// group's own statistics rather than from precomputed neighborhoods.
    fn rank_selection(&self, table: &DataTable<T>, selection: &[usize]) -> anyhow::Result<Vec<T>>;
}

/// Per-point raw scores plus their row totals; ranks are the normalized shares.
#[derive(Debug, Clone)]
pub(crate) struct ScoreTable<T: FloatOps> {
    scores: Array2<T>,
    totals: Vec<T>,
}

impl<T: FloatOps> ScoreTable<T> {
    pub(crate) fn new(scores: Array2<T>) -> Self {
        let totals = scores
            .axis_iter(Axis(0))
            .map(|row| row.iter().copied().sum())
            .collect();
        Self { scores, totals }
    }

    /// Scores `local / global` per dimension.
    pub(crate) fn from_ratios(local: &Array2<T>, global: &[T]) -> Self {
        let mut scores = local.clone();
        for mut row in scores.axis_iter_mut(Axis(0)) {
            for (s, &g) in row.iter_mut().zip(global) {
                *s = *s / g;
            }
        }
        Self::new(scores)
    }

    #[inline]
    pub(crate) fn rank(&self, point: usize, dim: usize) -> T {
        share(self.scores[(point, dim)], self.totals[point], self.scores.ncols())
    }

    pub(crate) fn num_points(&self) -> usize {
        self.scores.nrows()
    }

    pub(crate) fn num_dimensions(&self) -> usize {
        self.scores.ncols()
    }
}

/// `score / total`, or the uniform share `1 / num_dimensions` when the total carries no signal.
#[inline]
pub(crate) fn share<T: FloatOps>(score: T, total: T, num_dimensions: usize) -> T {
    if total > T::zero() && total.is_finite() {
        score / total
    } else {
        T::one() / T::from_count(num_dimensions.max(1))
    }
}

pub(crate) fn shares<T: FloatOps>(scores: &[T]) -> Vec<T> {
    let total: T = scores.iter().copied().sum();
    scores
        .iter()
        .map(|&s| share(s, total, scores.len()))
        .collect()
}

/// Fills a `num_points × num_dimensions` array row by row, in parallel over points.
pub(crate) fn par_rows<T, F>(num_points: usize, num_dimensions: usize, fill: F) -> Array2<T>
where
    T: FloatOps,
    F: Fn(usize, ArrayViewMut1<'_, T>) + Sync + Send,
{
    let mut out = Array2::zeros((num_points, num_dimensions));
    out.axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(i, row)| fill(i, row));
    out
}

pub(crate) fn check_fit_inputs<T: FloatOps>(
    table: &DataTable<T>,
    neighborhoods: &NeighborhoodMatrix<T>,
) -> anyhow::Result<()> {
    if neighborhoods.len() != table.num_points() {
        bail!(
            "Number of neighborhoods ({}) does not match number of points ({})",
            neighborhoods.len(),
            table.num_points()
        );
    }
    neighborhoods.check_bounds(table.num_points())
}

pub(crate) fn check_selection<T: FloatOps>(
    table: &DataTable<T>,
    num_dimensions: usize,
    selection: &[usize],
) -> anyhow::Result<()> {
    if selection.is_empty() {
        bail!("Cannot rank an empty selection");
    }
    if table.num_dimensions() != num_dimensions {
        bail!(
            "Ranking was fitted on {} dimensions but the table has {}",
            num_dimensions,
            table.num_dimensions()
        );
    }
    table.check_points(selection)
}

/// A fitted strategy of any [`Metric`].
#[derive(Debug, Clone)]
pub enum Ranking<T: FloatOps> {
    Variance(VarianceRanking<T>),
    Value(ValueRanking<T>),
    Euclidean(EuclideanRanking<T>),
}

impl<T: FloatOps> Ranking<T> {
    /// Precomputes the global and local statistics of `metric` over `neighborhoods`.
    pub fn fit(
        metric: Metric,
        table: &DataTable<T>,
        neighborhoods: &NeighborhoodMatrix<T>,
    ) -> anyhow::Result<Self> {
        Ok(match metric {
            Metric::Variance => Ranking::Variance(VarianceRanking::fit(table, neighborhoods)?),
            Metric::Value => Ranking::Value(ValueRanking::fit(table, neighborhoods)?),
            Metric::Euclidean => Ranking::Euclidean(EuclideanRanking::fit(table, neighborhoods)?),
        })
    }

    pub fn rank_order(&self) -> RankOrder {
        self.metric().rank_order()
    }

    /// Ranking matrix over every point (`num_points × num_dimensions`).
    pub fn rank_all(&self) -> Array2<T> {
        par_rows(self.num_points(), self.num_dimensions(), |i, mut row| {
            for (d, r) in row.iter_mut().enumerate() {
                *r = self.rank(i, d);
            }
        })
    }

    /// Ranking matrix over the given points, one row per selected point in selection order.
    pub fn rank_points(&self, selection: &[usize]) -> anyhow::Result<Array2<T>> {
        let n = self.num_points();
        if let Some(&bad) = selection.iter().find(|&&i| i >= n) {
            bail!("Point index {} out of range for {} ranked points", bad, n);
        }
        Ok(par_rows(selection.len(), self.num_dimensions(), |k, mut row| {
            for (d, r) in row.iter_mut().enumerate() {
                *r = self.rank(selection[k], d);
            }
        }))
    }
}

impl<T: FloatOps> DimensionRanker<T> for Ranking<T> {
    fn metric(&self) -> Metric {
        match self {
            Ranking::Variance(r) => r.metric(),
            Ranking::Value(r) => r.metric(),
            Ranking::Euclidean(r) => r.metric(),
        }
    }

    fn num_points(&self) -> usize {
        match self {
            Ranking::Variance(r) => r.num_points(),
            Ranking::Value(r) => r.num_points(),
            Ranking::Euclidean(r) => r.num_points(),
        }
    }

    fn num_dimensions(&self) -> usize {
        match self {
            Ranking::Variance(r) => r.num_dimensions(),
            Ranking::Value(r) => r.num_dimensions(),
            Ranking::Euclidean(r) => r.num_dimensions(),
        }
    }

    #[inline]
    fn rank(&self, point: usize, dim: usize) -> T {
        match self {
            Ranking::Variance(r) => r.rank(point, dim),
            Ranking::Value(r) => r.rank(point, dim),
            Ranking::Euclidean(r) => r.rank(point, dim),
        }
    }

    fn rank_selection(&self, table: &DataTable<T>, selection: &[usize]) -> anyhow::Result<Vec<T>> {
        match self {
            Ranking::Variance(r) => r.rank_selection(table, selection),
            Ranking::Value(r) => r.rank_selection(table, selection),
            Ranking::Euclidean(r) => r.rank_selection(table, selection),
        }
    }
}
