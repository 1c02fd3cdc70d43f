use std::time::Instant;

use log::debug;
use ndarray::{Array2, ArrayView2};

use super::{
    check_fit_inputs, check_selection, par_rows, shares, DimensionRanker, Metric, ScoreTable,
};
use crate::dense::DataTable;
use crate::neighborhood::NeighborhoodMatrix;
use crate::statistics::{DimensionStatistics, Moments};
use crate::utils::nonzero_or_one;
use crate::FloatOps;

/// Ranks dimensions by how much tighter a neighborhood is in them than the whole dataset.
///
/// `rank(i, d) = (local_var[i][d] / global_var[d]) / Σ_k (local_var[i][k] / global_var[k])`,
/// lower is better. Variances are population variances. A dimension with zero global variance
/// is divided by one instead.
#[derive(Debug, Clone)]
pub struct VarianceRanking<T: FloatOps> {
    global_variance: Vec<T>,
    local_variance: Array2<T>,
    scores: ScoreTable<T>,
}

impl<T: FloatOps> VarianceRanking<T> {
    pub fn fit(
        table: &DataTable<T>,
        neighborhoods: &NeighborhoodMatrix<T>,
    ) -> anyhow::Result<Self> {
        check_fit_inputs(table, neighborhoods)?;
        let start = Instant::now();

        let global_variance: Vec<T> = DimensionStatistics::compute(table)
            .variance
            .into_iter()
            .map(nonzero_or_one)
            .collect();

        let local_variance = par_rows(table.num_points(), table.num_dimensions(), |i, mut row| {
            let moments = Moments::over(table, neighborhoods.neighbors(i));
            for (out, v) in row.iter_mut().zip(moments.variance) {
                *out = v;
            }
        });

        let scores = ScoreTable::from_ratios(&local_variance, &global_variance);
        debug!(
            "Fitted variance ranking over {} points × {} dimensions in {:?}",
            table.num_points(),
            table.num_dimensions(),
            start.elapsed()
        );

        Ok(Self {
            global_variance,
            local_variance,
            scores,
        })
    }

    /// Global variance per dimension, with zeros already replaced by one.
    pub fn global_variance(&self) -> &[T] {
        &self.global_variance
    }

    pub fn local_variance(&self) -> ArrayView2<'_, T> {
        self.local_variance.view()
    }
}

impl<T: FloatOps> DimensionRanker<T> for VarianceRanking<T> {
    fn metric(&self) -> Metric {
        Metric::Variance
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

    fn rank_selection(&self, table: &DataTable<T>, selection: &[usize]) -> anyhow::Result<Vec<T>> {
        check_selection(table, self.num_dimensions(), selection)?;
        let moments = Moments::over(table, selection);
        let ratios: Vec<T> = moments
            .variance
            .iter()
            .zip(&self.global_variance)
            .map(|(&local, &global)| local / global)
            .collect();
        Ok(shares(&ratios))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dense::Projection;
    use crate::ranking::tests::random_dataset;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Axis};
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_tight_dimension_wins() {
        // Points 0..3 form a tight patch in the projection. Dimension 0 is constant inside the
        // patch but spread globally, dimension 1 is spread both locally and globally.
        let table = DataTable::new(array![
            [5.0f32, -10.0],
            [5.0, 0.0],
            [5.0, 10.0],
            [-50.0, 0.0]
        ])
        .unwrap();
        let projection =
            Projection::from_points(&[[0.0, 0.0], [0.1, 0.0], [0.2, 0.0], [100.0, 0.0]]).unwrap();
        let neighborhoods = NeighborhoodMatrix::build(&projection, 1.0, 0, 1).unwrap();
        let ranking = VarianceRanking::fit(&table, &neighborhoods).unwrap();

        for point in 0..3 {
            assert!(ranking.rank(point, 0) < ranking.rank(point, 1));
            assert_abs_diff_eq!(ranking.rank(point, 0), 0.0);
            assert_abs_diff_eq!(ranking.rank(point, 1), 1.0);
        }
    }

    #[test]
    fn test_global_and_local_variance() {
        let table = DataTable::new(array![[0.0f64, 1.0], [2.0, 1.0], [4.0, 1.0]]).unwrap();
        let projection = Projection::from_points(&[[0.0, 0.0], [1.0, 0.0], [2.0, 0.0]]).unwrap();
        let neighborhoods = NeighborhoodMatrix::build(&projection, 1.0, 0, 1).unwrap();
        let ranking = VarianceRanking::fit(&table, &neighborhoods).unwrap();

        assert_abs_diff_eq!(ranking.global_variance()[0], 8.0 / 3.0, epsilon = 1e-12);
        // constant dimension: zero variance replaced by one
        assert_abs_diff_eq!(ranking.global_variance()[1], 1.0);
        // point 0 sees {0, 1}: values 0 and 2
        assert_abs_diff_eq!(ranking.local_variance()[(0, 0)], 1.0, epsilon = 1e-12);
        // point 1 sees {0, 1, 2}
        assert_abs_diff_eq!(ranking.local_variance()[(1, 0)], 8.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_constant_dimension_is_finite() {
        let (table, projection) = random_dataset(40, 3, 11);
        let mut values = table.view().to_owned();
        values.column_mut(1).fill(7.5);
        let table = DataTable::new(values).unwrap();

        let neighborhoods = NeighborhoodMatrix::build(&projection, 0.5, 0, 1).unwrap();
        let ranking = VarianceRanking::fit(&table, &neighborhoods).unwrap();
        assert_abs_diff_eq!(ranking.global_variance()[1], 1.0);
        for i in 0..40 {
            let r = ranking.rank(i, 1);
            assert!(r.is_finite() && !r.is_nan());
            if neighborhoods.neighbors(i).len() > 1 {
                assert_abs_diff_eq!(r, 0.0);
            }
        }
        let selection = ranking.rank_selection(&table, &[0, 1, 2]).unwrap();
        assert!(selection.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_isolated_point_gets_uniform_share() {
        let table = DataTable::new(array![[1.0f32, 2.0], [3.0, -4.0]]).unwrap();
        let projection = Projection::from_points(&[[0.0, 0.0], [10.0, 0.0]]).unwrap();
        let neighborhoods = NeighborhoodMatrix::build(&projection, 1.0, 0, 1).unwrap();
        let ranking = VarianceRanking::fit(&table, &neighborhoods).unwrap();
        // only itself in the neighborhood: zero local variance everywhere
        assert_abs_diff_eq!(ranking.rank(0, 0), 0.5);
        assert_abs_diff_eq!(ranking.rank(0, 1), 0.5);
    }

    #[test]
    fn test_ranks_sum_to_one_over_random_datasets() {
        let mut rng = ChaCha8Rng::seed_from_u64(2024);
        for seed in 0..100 {
            let d = rng.random_range(1..=12);
            let n = rng.random_range(5..=40);
            let radius = rng.random_range(0.05f32..0.6);
            let (table, projection) = random_dataset(n, d, seed);

            let neighborhoods = NeighborhoodMatrix::build(&projection, radius, 0, 1).unwrap();
            let ranking = VarianceRanking::fit(&table, &neighborhoods).unwrap();
            for i in 0..n {
                let total: f32 = ranking.point_ranks(i).iter().sum();
                assert_abs_diff_eq!(total, 1.0, epsilon = 1e-4);
            }
        }
    }

    #[test]
    fn test_selection_matches_neighborhood_rank() {
        for seed in 0..10 {
            let (table, projection) = random_dataset(60, 5, seed);
            let neighborhoods = NeighborhoodMatrix::build(&projection, 0.25, 0, 1).unwrap();
            let ranking = VarianceRanking::fit(&table, &neighborhoods).unwrap();

            for i in [0, 17, 59] {
                let selection = ranking
                    .rank_selection(&table, neighborhoods.neighbors(i))
                    .unwrap();
                for (d, &r) in selection.iter().enumerate() {
                    assert_abs_diff_eq!(r, ranking.rank(i, d), epsilon = 1e-5);
                }
            }
        }
    }

    #[test]
    fn test_local_variance_shape() {
        let (table, projection) = random_dataset(12, 3, 8);
        let neighborhoods = NeighborhoodMatrix::build(&projection, 0.4, 0, 1).unwrap();
        let ranking = VarianceRanking::fit(&table, &neighborhoods).unwrap();
        assert_eq!(ranking.local_variance().dim(), (12, 3));
        assert!(ranking
            .local_variance()
            .axis_iter(Axis(0))
            .all(|row| row.iter().all(|&v| v >= 0.0)));
    }
}
