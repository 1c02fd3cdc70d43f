//! # Explanation confidence
//!
//! For every point, how strongly its neighbors in the projection agree that the same
//! dimension is the best explanation. The confidence neighborhoods are usually built at a
//! quarter of the explanation radius, so agreement is measured on a tighter patch than the
//! one the ranks were computed on.
//!
//! Raw confidences are min-max normalized over all points. If every point has the same raw
//! value the normalized confidences are all zero.

use std::time::Instant;

use anyhow::bail;
use log::debug;
use ndarray::ArrayView2;
use rayon::prelude::*;

use crate::neighborhood::NeighborhoodMatrix;
use crate::ranking::top_dimensions;
use crate::utils::normalize_min_max;
use crate::{FloatOps, RankOrder};

/// How agreement among neighbors is scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConfidenceMethod {
    /// Fraction of neighbors whose top dimension equals the point's own.
    #[default]
    MajorityCount,
    /// Rank magnitude carried by agreeing neighbors in the point's top dimension, divided by
    /// the magnitude of all neighbors in that dimension.
    RankMagnitude,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConfidenceModel {
    method: ConfidenceMethod,
}

impl ConfidenceModel {
    pub fn new(method: ConfidenceMethod) -> Self {
        Self { method }
    }

    pub fn method(&self) -> ConfidenceMethod {
        self.method
    }

    /// Normalized confidence per row of `ranks`, in `[0, 1]`.
    ///
    /// `ranks` must have one row per neighborhood, `excluded` one flag per column.
    pub fn compute<T: FloatOps>(
        &self,
        ranks: ArrayView2<'_, T>,
        order: RankOrder,
        excluded: &[bool],
        neighborhoods: &NeighborhoodMatrix<T>,
    ) -> anyhow::Result<Vec<T>> {
        let mut confidences = self.raw_confidences(ranks, order, excluded, neighborhoods)?;
        normalize_min_max(&mut confidences);
        Ok(confidences)
    }

    /// Confidences before normalization.
    pub fn raw_confidences<T: FloatOps>(
        &self,
        ranks: ArrayView2<'_, T>,
        order: RankOrder,
        excluded: &[bool],
        neighborhoods: &NeighborhoodMatrix<T>,
    ) -> anyhow::Result<Vec<T>> {
        if ranks.nrows() != neighborhoods.len() {
            bail!(
                "Ranking matrix has {} rows but there are {} confidence neighborhoods",
                ranks.nrows(),
                neighborhoods.len()
            );
        }
        neighborhoods.check_bounds(ranks.nrows())?;

        let start = Instant::now();
        let top = top_dimensions(ranks, order, excluded)?;

        let raw: Vec<T> = (0..ranks.nrows())
            .into_par_iter()
            .map(|i| {
                let neighbors = neighborhoods.neighbors(i);
                match (top[i], neighbors.is_empty()) {
                    (Some(dim), false) => match self.method {
                        ConfidenceMethod::MajorityCount => majority_count(dim, neighbors, &top),
                        ConfidenceMethod::RankMagnitude => {
                            rank_magnitude(dim, neighbors, &top, &ranks)
                        }
                    },
                    _ => T::zero(),
                }
            })
            .collect();

        debug!(
            "Computed {} {:?} confidences in {:?}",
            raw.len(),
            self.method,
            start.elapsed()
        );
        Ok(raw)
    }
}

fn majority_count<T: FloatOps>(dim: usize, neighbors: &[usize], top: &[Option<usize>]) -> T {
    let agreeing = neighbors.iter().filter(|&&j| top[j] == Some(dim)).count();
    T::from_count(agreeing) / T::from_count(neighbors.len())
}

fn rank_magnitude<T: FloatOps>(
    dim: usize,
    neighbors: &[usize],
    top: &[Option<usize>],
    ranks: &ArrayView2<'_, T>,
) -> T {
    let mut agreeing = T::zero();
    let mut total = T::zero();
    for &j in neighbors {
        let magnitude = ranks[(j, dim)].abs();
        if magnitude.is_nan() {
            continue;
        }
        total += magnitude;
        if top[j] == Some(dim) {
            agreeing += magnitude;
        }
    }
    if total > T::zero() && total.is_finite() {
        agreeing / total
    } else {
        T::zero()
    }
}
