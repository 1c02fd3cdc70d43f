//! Per-dimension summary statistics over a [`DataTable`] and over subsets of its rows.

use anyhow::bail;
use ndarray::{Array1, Array2, Axis};

use crate::dense::DataTable;
use crate::FloatOps;

/// Dataset-wide min, max, mean and population variance of every dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionStatistics<T: FloatOps> {
    pub min: Vec<T>,
    pub max: Vec<T>,
    pub mean: Vec<T>,
    pub variance: Vec<T>,
}

impl<T: FloatOps> DimensionStatistics<T> {
    /// Column reductions over the whole table. Variance is the population variance.
    ///
    /// An empty table yields zeros for every statistic.
    pub fn compute(table: &DataTable<T>) -> Self {
        let view = table.view();
        let d = table.num_dimensions();
        if table.num_points() == 0 {
            return Self {
                min: vec![T::zero(); d],
                max: vec![T::zero(); d],
                mean: vec![T::zero(); d],
                variance: vec![T::zero(); d],
            };
        }

        let min = view.fold_axis(Axis(0), T::infinity(), |&acc, &v| acc.min(v));
        let max = view.fold_axis(Axis(0), T::neg_infinity(), |&acc, &v| acc.max(v));
        let mean = view
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(d));
        let variance = view.var_axis(Axis(0), T::zero());

        Self {
            min: min.to_vec(),
            max: max.to_vec(),
            mean: mean.to_vec(),
            variance: variance.to_vec(),
        }
    }

    pub fn num_dimensions(&self) -> usize {
        self.mean.len()
    }

    pub fn range(&self, dim: usize) -> T {
        self.max[dim] - self.min[dim]
    }

    pub fn ranges(&self) -> Vec<T> {
        (0..self.num_dimensions()).map(|d| self.range(d)).collect()
    }

    /// Rescales every value of `table` to `[0, 1]` within its dimension's range.
    /// Values of a dimension with zero range map to 0.
    pub fn normalize(&self, table: &DataTable<T>) -> anyhow::Result<Array2<T>> {
        if table.num_dimensions() != self.num_dimensions() {
            bail!(
                "Statistics cover {} dimensions but the table has {}",
                self.num_dimensions(),
                table.num_dimensions()
            );
        }
        let mut out = table.view().to_owned();
        for ((_, d), v) in out.indexed_iter_mut() {
            let range = self.range(d);
            *v = if range > T::zero() {
                (*v - self.min[d]) / range
            } else {
                T::zero()
            };
        }
        Ok(out)
    }
}

/// Mean and population variance of every dimension over a subset of rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Moments<T: FloatOps> {
    pub count: usize,
    pub mean: Vec<T>,
    pub variance: Vec<T>,
}

impl<T: FloatOps> Moments<T> {
    /// Two-pass mean/variance over `indices`, walking whole rows. An empty subset yields
    /// zero means and zero variances. Indices are trusted.
    pub fn over(table: &DataTable<T>, indices: &[usize]) -> Self {
        let means = Self::means(table, indices);
        let d = table.num_dimensions();
        let mut variance = vec![T::zero(); d];

        if !indices.is_empty() {
            for &i in indices {
                for ((acc, &v), &m) in variance.iter_mut().zip(table.row_slice(i)).zip(&means) {
                    let x = v - m;
                    *acc += x * x;
                }
            }
            let count = T::from_count(indices.len());
            variance.iter_mut().for_each(|v| *v = *v / count);
        }

        Self {
            count: indices.len(),
            mean: means,
            variance,
        }
    }

    /// Per-dimension mean over `indices`; zeros for an empty subset.
    pub fn means(table: &DataTable<T>, indices: &[usize]) -> Vec<T> {
        let mut sums = vec![T::zero(); table.num_dimensions()];
        if indices.is_empty() {
            return sums;
        }
        for &i in indices {
            for (acc, &v) in sums.iter_mut().zip(table.row_slice(i)) {
                *acc += v;
            }
        }
        let count = T::from_count(indices.len());
        sums.iter_mut().for_each(|s| *s = *s / count);
        sums
    }
}

/// Fixed-width histogram over `[min, max]` used for per-dimension range displays.
#[derive(Debug, Clone)]
pub struct Histogram<T: FloatOps> {
    min: T,
    range: T,
    bins: Vec<usize>,
    num_values: usize,
    highest_bin_value: usize,
}

impl<T: FloatOps> Histogram<T> {
    pub fn new(num_bins: usize, min: T, max: T) -> anyhow::Result<Self> {
        if num_bins == 0 {
            bail!("A histogram needs at least one bin");
        }
        if !min.is_finite() || !max.is_finite() || max < min {
            bail!("Invalid histogram range [{:?}, {:?}]", min, max);
        }
        Ok(Self {
            min,
            range: max - min,
            bins: vec![0; num_bins],
            num_values: 0,
            highest_bin_value: 0,
        })
    }

    /// Histogram of one dimension of `table`, spanning that dimension's value range.
    pub fn of_dimension(
        table: &DataTable<T>,
        stats: &DimensionStatistics<T>,
        dim: usize,
        num_bins: usize,
    ) -> anyhow::Result<Self> {
        table.check_dimension(dim)?;
        let (min, max) = if table.num_points() == 0 {
            (T::zero(), T::zero())
        } else {
            (stats.min[dim], stats.max[dim])
        };
        let mut histogram = Self::new(num_bins, min, max)?;
        histogram.add_values(table.view().column(dim).iter().copied());
        Ok(histogram)
    }

    pub fn add_values<I: IntoIterator<Item = T>>(&mut self, values: I) {
        for v in values {
            self.add_value(v);
        }
    }

    /// Adds one value. Values outside the range land in the first or last bin; NaN is ignored.
    pub fn add_value(&mut self, value: T) {
        if value.is_nan() {
            return;
        }
        let last = self.bins.len() - 1;
        let bin = if self.range > T::zero() {
            let scaled = (value - self.min) / self.range * T::from_count(self.bins.len());
            if scaled <= T::zero() {
                0
            } else {
                scaled.to_usize().map_or(last, |b| b.min(last))
            }
        } else {
            0
        };

        self.bins[bin] += 1;
        self.num_values += 1;
        self.highest_bin_value = self.highest_bin_value.max(self.bins[bin]);
    }

    pub fn bins(&self) -> &[usize] {
        &self.bins
    }

    pub fn num_values(&self) -> usize {
        self.num_values
    }

    pub fn highest_bin_value(&self) -> usize {
        self.highest_bin_value
    }
}
