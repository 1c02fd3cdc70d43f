//! # Radius neighborhoods over a 2-D projection
//!
//! For every point the indices of all points within a Euclidean radius, measured on two
//! designated projection axes. The boundary is inclusive (`distance == radius` is inside).
//!
//! The default search is the exhaustive O(N²) scan, parallel over the centre point. With the
//! `kdtree` feature a kd-tree backed search is available that returns exactly the same sets.

use std::time::Instant;

use anyhow::bail;
use log::debug;
use rayon::prelude::*;

use crate::dense::Projection;
use crate::FloatOps;

/// Parameters of a neighborhood search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeighborhoodParams<T: FloatOps> {
    pub radius: T,
    pub axis_x: usize,
    pub axis_y: usize,
    /// Whether a point is part of its own neighborhood. Local statistics assume it is.
    pub include_self: bool,
}

impl<T: FloatOps> NeighborhoodParams<T> {
    pub fn new(radius: T, axis_x: usize, axis_y: usize) -> Self {
        Self {
            radius,
            axis_x,
            axis_y,
            include_self: true,
        }
    }

    pub fn include_self(mut self, include_self: bool) -> Self {
        self.include_self = include_self;
        self
    }

    fn validate(&self, projection: &Projection<T>) -> anyhow::Result<()> {
        projection.check_axes(self.axis_x, self.axis_y)?;
        if !self.radius.is_finite() || self.radius < T::zero() {
            bail!(
                "Neighborhood radius must be finite and non-negative, got {:?}",
                self.radius
            );
        }
        Ok(())
    }
}

/// Largest side of the bounding box of `projection` on the two axes; the explanation radius is
/// expressed as a fraction of it.
pub fn projection_diameter<T: FloatOps>(
    projection: &Projection<T>,
    axis_x: usize,
    axis_y: usize,
) -> anyhow::Result<T> {
    projection.diameter(axis_x, axis_y)
}

/// Per-point neighbor index lists.
#[derive(Debug, Clone, PartialEq)]
pub struct NeighborhoodMatrix<T: FloatOps> {
    neighborhoods: Vec<Vec<usize>>,
    params: NeighborhoodParams<T>,
}

impl<T: FloatOps> NeighborhoodMatrix<T> {
    /// Self-including neighborhoods of radius `radius` on axes `(axis_x, axis_y)`.
    pub fn build(
        projection: &Projection<T>,
        radius: T,
        axis_x: usize,
        axis_y: usize,
    ) -> anyhow::Result<Self> {
        Self::build_with(projection, NeighborhoodParams::new(radius, axis_x, axis_y))
    }

    pub fn build_with(
        projection: &Projection<T>,
        params: NeighborhoodParams<T>,
    ) -> anyhow::Result<Self> {
        params.validate(projection)?;
        let start = Instant::now();

        let xs = projection.axis(params.axis_x);
        let ys = projection.axis(params.axis_y);
        let n = projection.num_points();
        let radius_squared = params.radius * params.radius;

        let neighborhoods: Vec<Vec<usize>> = (0..n)
            .into_par_iter()
            .map(|i| {
                let (x, y) = (xs[i], ys[i]);
                (0..n)
                    .filter(|&j| {
                        if j == i {
                            return params.include_self;
                        }
                        let dx = xs[j] - x;
                        let dy = ys[j] - y;
                        dx * dx + dy * dy <= radius_squared
                    })
                    .collect()
            })
            .collect();

        let matrix = Self {
            neighborhoods,
            params,
        };
        debug!(
            "Built {} neighborhoods (radius {:?}, mean size {:.1}) in {:?}",
            n,
            params.radius,
            matrix.mean_size(),
            start.elapsed()
        );
        Ok(matrix)
    }

    /// Same result as [`NeighborhoodMatrix::build_with`], with candidates drawn from a kd-tree.
    ///
    /// Candidates are queried with a slightly widened radius in `f64` and then filtered with
    /// the exact squared-distance test in `T`, so ties on the boundary resolve identically.
    /// The tree is built once from all points, which tolerates any amount of coordinate
    /// duplication.
    #[cfg(feature = "kdtree")]
    pub fn build_indexed(
        projection: &Projection<T>,
        params: NeighborhoodParams<T>,
    ) -> anyhow::Result<Self> {
        use kiddo::{ImmutableKdTree, SquaredEuclidean};

        params.validate(projection)?;
        let start = Instant::now();

        let xs = projection.axis(params.axis_x);
        let ys = projection.axis(params.axis_y);
        let n = projection.num_points();
        if n == 0 {
            return Ok(Self {
                neighborhoods: Vec::new(),
                params,
            });
        }

        let to_f64 = |v: T| v.to_f64().unwrap_or(f64::NAN);
        let points: Vec<[f64; 2]> = (0..n).map(|i| [to_f64(xs[i]), to_f64(ys[i])]).collect();
        let kdtree: ImmutableKdTree<f64, 2> = ImmutableKdTree::new_from_slice(&points);

        let radius_squared = params.radius * params.radius;
        let query_radius = to_f64(radius_squared) * (1.0 + 1e-6) + f64::EPSILON;

        let neighborhoods: Vec<Vec<usize>> = (0..n)
            .into_par_iter()
            .map(|i| {
                let (x, y) = (xs[i], ys[i]);
                let mut neighbors: Vec<usize> = kdtree
                    .within_unsorted::<SquaredEuclidean>(&[to_f64(x), to_f64(y)], query_radius)
                    .into_iter()
                    .map(|neighbor| neighbor.item as usize)
                    .filter(|&j| {
                        if j == i {
                            return params.include_self;
                        }
                        let dx = xs[j] - x;
                        let dy = ys[j] - y;
                        dx * dx + dy * dy <= radius_squared
                    })
                    .collect();
                neighbors.sort_unstable();
                neighbors
            })
            .collect();

        let matrix = Self {
            neighborhoods,
            params,
        };
        debug!(
            "Built {} indexed neighborhoods (radius {:?}) in {:?}",
            n,
            params.radius,
            start.elapsed()
        );
        Ok(matrix)
    }

    /// Number of points (one neighborhood each).
    pub fn len(&self) -> usize {
        self.neighborhoods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighborhoods.is_empty()
    }

    pub fn neighbors(&self, point: usize) -> &[usize] {
        &self.neighborhoods[point]
    }

    pub fn iter(&self) -> impl Iterator<Item = &[usize]> + '_ {
        self.neighborhoods.iter().map(Vec::as_slice)
    }

    pub fn params(&self) -> &NeighborhoodParams<T> {
        &self.params
    }

    pub fn radius(&self) -> T {
        self.params.radius
    }

    pub fn mean_size(&self) -> f64 {
        if self.neighborhoods.is_empty() {
            return 0.0;
        }
        let total: usize = self.neighborhoods.iter().map(Vec::len).sum();
        total as f64 / self.neighborhoods.len() as f64
    }

    /// Checks that every neighbor index addresses one of `num_points` rows.
    pub(crate) fn check_bounds(&self, num_points: usize) -> anyhow::Result<()> {
        for (i, neighbors) in self.neighborhoods.iter().enumerate() {
            if let Some(&bad) = neighbors.iter().find(|&&j| j >= num_points) {
                bail!(
                    "Neighborhood of point {} references point {} but only {} points exist",
                    i,
                    bad,
                    num_points
                );
            }
        }
        Ok(())
    }
}
