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

/// Ranks dimensions by how far a neighborhood's mean sits from the dataset mean, relative to
/// the dimension's value range. Higher is better.
#[derive(Debug, Clone)]
pub struct ValueRanking<T: FloatOps> {
    global_mean: Vec<T>,
    data_range: Vec<T>,
    local_mean: Array2<T>,
    scores: ScoreTable<T>,
}

impl<T: FloatOps> ValueRanking<T> {
    pub fn fit(
        table: &DataTable<T>,
        neighborhoods: &NeighborhoodMatrix<T>,
    ) -> anyhow::Result<Self> {
        check_fit_inputs(table, neighborhoods)?;
        let start = Instant::now();

        let stats = DimensionStatistics::compute(table);
        let data_range: Vec<T> = stats.ranges().into_iter().map(nonzero_or_one).collect();
        let global_mean = stats.mean;

        // An empty neighborhood carries no deviation: it falls back to the global mean.
        let local_mean = par_rows(table.num_points(), table.num_dimensions(), |i, mut row| {
            let neighbors = neighborhoods.neighbors(i);
            let means = if neighbors.is_empty() {
                global_mean.clone()
            } else {
                Moments::means(table, neighbors)
            };
            for (out, m) in row.iter_mut().zip(means) {
                *out = m;
            }
        });

        let mut deviations = local_mean.clone();
        for mut row in deviations.rows_mut() {
            for ((v, &mean), &range) in row.iter_mut().zip(&global_mean).zip(&data_range) {
                *v = deviation(*v, mean, range);
            }
        }
        let scores = ScoreTable::new(deviations);

        debug!(
            "Fitted value ranking over {} points × {} dimensions in {:?}",
            table.num_points(),
            table.num_dimensions(),
            start.elapsed()
        );

        Ok(Self {
            global_mean,
            data_range,
            local_mean,
            scores,
        })
    }

    pub fn global_mean(&self) -> &[T] {
        &self.global_mean
    }

    /// `max - min` per dimension, with zero ranges replaced by one.
    pub fn data_range(&self) -> &[T] {
        &self.data_range
    }

    pub fn local_mean(&self) -> ArrayView2<'_, T> {
        self.local_mean.view()
    }
}

#[inline]
fn deviation<T: FloatOps>(local: T, global: T, range: T) -> T {
    (local - global).abs() / range
}

impl<T: FloatOps> DimensionRanker<T> for ValueRanking<T> {
    fn metric(&self) -> Metric {
        Metric::Value
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
        let deviations: Vec<T> = Moments::means(table, selection)
            .into_iter()
            .zip(&self.global_mean)
            .zip(&self.data_range)
            .map(|((local, &global), &range)| deviation(local, global, range))
            .collect();
        Ok(shares(&deviations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dense::Projection;
    use crate::neighborhood::NeighborhoodParams;
    use crate::ranking::tests::random_dataset;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    /// Dimension 0 spans [-10, 10] with mean 0; points 0 and 1 sit together in the projection
    /// and both have value 8 there. Dimension 1 has mean 0 globally and inside the pair.
    fn extreme_pair() -> (DataTable<f32>, Projection<f32>) {
        let table = DataTable::new(array![
            [8.0, 1.0],
            [8.0, -1.0],
            [-10.0, 5.0],
            [-10.0, -5.0],
            [10.0, 2.0],
            [-6.0, -2.0]
        ])
        .unwrap();
        let projection = Projection::from_points(&[
            [0.0, 0.0],
            [0.1, 0.0],
            [50.0, 0.0],
            [50.0, 10.0],
            [60.0, 0.0],
            [60.0, 10.0],
        ])
        .unwrap();
        (table, projection)
    }

    #[test]
    fn test_extreme_mean_wins() {
        let (table, projection) = extreme_pair();
        let neighborhoods = NeighborhoodMatrix::build(&projection, 1.0, 0, 1).unwrap();
        let ranking = ValueRanking::fit(&table, &neighborhoods).unwrap();

        assert_abs_diff_eq!(ranking.global_mean()[0], 0.0);
        assert_abs_diff_eq!(ranking.global_mean()[1], 0.0);
        assert_abs_diff_eq!(ranking.data_range()[0], 20.0);
        assert_abs_diff_eq!(ranking.local_mean()[(0, 0)], 8.0);

        assert!(ranking.rank(0, 0) > ranking.rank(0, 1));
        assert_abs_diff_eq!(ranking.rank(0, 0), 1.0);
        assert_abs_diff_eq!(ranking.rank(0, 1), 0.0);
    }

    #[test]
    fn test_selection_ranks() {
        let (table, projection) = extreme_pair();
        let neighborhoods = NeighborhoodMatrix::build(&projection, 1.0, 0, 1).unwrap();
        let ranking = ValueRanking::fit(&table, &neighborhoods).unwrap();

        let ranks = ranking.rank_selection(&table, &[0, 1]).unwrap();
        assert_abs_diff_eq!(ranks[0], 1.0);
        assert_abs_diff_eq!(ranks[1], 0.0);

        // |-10 - 0| / 20 = 0.5 and |5 - 0| / 10 = 0.5
        let ranks = ranking.rank_selection(&table, &[2]).unwrap();
        assert_abs_diff_eq!(ranks[0], 0.5);
        assert_abs_diff_eq!(ranks[1], 0.5);
    }

    #[test]
    fn test_zero_range_dimension() {
        let table = DataTable::new(array![[3.0f64, 1.0], [3.0, 2.0], [3.0, 9.0]]).unwrap();
        let projection = Projection::from_points(&[[0.0, 0.0], [0.5, 0.0], [9.0, 0.0]]).unwrap();
        let neighborhoods = NeighborhoodMatrix::build(&projection, 1.0, 0, 1).unwrap();
        let ranking = ValueRanking::fit(&table, &neighborhoods).unwrap();

        assert_abs_diff_eq!(ranking.data_range()[0], 1.0);
        for i in 0..3 {
            assert!(ranking.point_ranks(i).iter().all(|r| r.is_finite()));
            assert_abs_diff_eq!(ranking.rank(i, 0), 0.0);
        }
    }

    #[test]
    fn test_empty_neighborhood_uses_global_mean() {
        let (table, projection) = extreme_pair();
        let params = NeighborhoodParams::new(0.01, 0, 1).include_self(false);
        let neighborhoods = NeighborhoodMatrix::build_with(&projection, params).unwrap();
        let ranking = ValueRanking::fit(&table, &neighborhoods).unwrap();

        for i in 0..6 {
            assert_eq!(ranking.local_mean().row(i).to_vec(), ranking.global_mean().to_vec());
            // no deviation anywhere: uniform shares
            assert_abs_diff_eq!(ranking.rank(i, 0), 0.5);
        }
    }

    #[test]
    fn test_all_ranks_finite() {
        for seed in 0..10 {
            let (table, projection) = random_dataset(40, 6, seed);
            let neighborhoods = NeighborhoodMatrix::build(&projection, 0.2, 0, 1).unwrap();
            let ranking = ValueRanking::fit(&table, &neighborhoods).unwrap();
            for i in 0..40 {
                let ranks = ranking.point_ranks(i);
                assert!(ranks.iter().all(|r| r.is_finite() && *r >= 0.0));
                assert_abs_diff_eq!(ranks.iter().sum::<f32>(), 1.0, epsilon = 1e-4);
            }
        }
    }
}
