//! # Dense data holders
//!
//! [`DataTable`] holds the high-dimensional data (points × dimensions) together with the
//! per-dimension exclusion mask, [`Projection`] holds the low-dimensional embedding of the
//! same points. Neither type runs any algorithm; they only validate shapes and hand out views.

use anyhow::bail;
use ndarray::{Array2, ArrayView1, ArrayView2};

use crate::FloatOps;

/// Dense row-major table of `num_points × num_dimensions` values.
///
/// The shape is fixed at construction. The exclusion mask can be changed at any time and is
/// only consulted when a "top" dimension is picked; it never invalidates computed statistics.
#[derive(Debug, Clone)]
pub struct DataTable<T: FloatOps> {
    data: Array2<T>,
    excluded: Vec<bool>,
    names: Option<Vec<String>>,
}

impl<T: FloatOps> DataTable<T> {
    /// Creates a table from a 2-D array. Non-standard layouts are copied into row-major order.
    pub fn new(data: Array2<T>) -> anyhow::Result<Self> {
        if data.ncols() == 0 {
            bail!("A data table needs at least one dimension");
        }
        let data = if data.is_standard_layout() {
            data
        } else {
            data.as_standard_layout().into_owned()
        };
        let excluded = vec![false; data.ncols()];
        Ok(Self {
            data,
            excluded,
            names: None,
        })
    }

    /// Creates a table from a flat row-major buffer.
    pub fn from_row_major(
        num_points: usize,
        num_dimensions: usize,
        values: Vec<T>,
    ) -> anyhow::Result<Self> {
        let Some(expected) = num_points.checked_mul(num_dimensions) else {
            bail!(
                "Shape {} points × {} dimensions overflows the buffer size",
                num_points,
                num_dimensions
            );
        };
        if values.len() != expected {
            bail!(
                "Buffer length ({}) does not match {} points × {} dimensions",
                values.len(),
                num_points,
                num_dimensions
            );
        }
        Self::new(Array2::from_shape_vec((num_points, num_dimensions), values)?)
    }

    /// Attaches display names, one per dimension.
    pub fn with_dimension_names(mut self, names: Vec<String>) -> anyhow::Result<Self> {
        if names.len() != self.num_dimensions() {
            bail!(
                "Number of dimension names ({}) does not match number of dimensions ({})",
                names.len(),
                self.num_dimensions()
            );
        }
        self.names = Some(names);
        Ok(self)
    }

    /// Replaces the exclusion mask.
    pub fn with_exclusion_mask(mut self, mask: Vec<bool>) -> anyhow::Result<Self> {
        if mask.len() != self.num_dimensions() {
            bail!(
                "Length of exclusion mask ({}) does not match number of dimensions ({})",
                mask.len(),
                self.num_dimensions()
            );
        }
        self.excluded = mask;
        Ok(self)
    }

    pub fn num_points(&self) -> usize {
        self.data.nrows()
    }

    pub fn num_dimensions(&self) -> usize {
        self.data.ncols()
    }

    /// Value at `(row, col)`. Indices are trusted; debug builds assert them.
    #[inline]
    pub fn value(&self, row: usize, col: usize) -> T {
        debug_assert!(row < self.num_points(), "row {} out of range", row);
        debug_assert!(col < self.num_dimensions(), "column {} out of range", col);
        self.data[(row, col)]
    }

    /// Read-only view of one row (all dimensions of one point).
    #[inline]
    pub fn row(&self, row: usize) -> ArrayView1<'_, T> {
        debug_assert!(row < self.num_points(), "row {} out of range", row);
        self.data.row(row)
    }

    /// Contiguous slice of one row.
    #[inline]
    pub(crate) fn row_slice(&self, row: usize) -> &[T] {
        let d = self.num_dimensions();
        let start = row * d;
        // Standard layout is enforced in `new`.
        &self.data.as_slice().unwrap_or(&[])[start..start + d]
    }

    pub fn view(&self) -> ArrayView2<'_, T> {
        self.data.view()
    }

    pub fn is_excluded(&self, dim: usize) -> bool {
        self.excluded[dim]
    }

    /// Flips the exclusion flag of `dim` and returns the new state.
    pub fn toggle_excluded(&mut self, dim: usize) -> anyhow::Result<bool> {
        self.check_dimension(dim)?;
        self.excluded[dim] = !self.excluded[dim];
        Ok(self.excluded[dim])
    }

    pub fn set_excluded(&mut self, dim: usize, excluded: bool) -> anyhow::Result<()> {
        self.check_dimension(dim)?;
        self.excluded[dim] = excluded;
        Ok(())
    }

    pub fn exclusion_mask(&self) -> &[bool] {
        &self.excluded
    }

    pub fn included_dimensions(&self) -> Vec<usize> {
        (0..self.num_dimensions())
            .filter(|&d| !self.excluded[d])
            .collect()
    }

    pub fn dimension_name(&self, dim: usize) -> Option<&str> {
        self.names
            .as_ref()
            .and_then(|names| names.get(dim))
            .map(String::as_str)
    }

    pub fn dimension_names(&self) -> Option<&[String]> {
        self.names.as_deref()
    }

    pub(crate) fn check_dimension(&self, dim: usize) -> anyhow::Result<()> {
        if dim >= self.num_dimensions() {
            bail!(
                "Dimension index {} out of range for a table with {} dimensions",
                dim,
                self.num_dimensions()
            );
        }
        Ok(())
    }

    pub(crate) fn check_points(&self, indices: &[usize]) -> anyhow::Result<()> {
        let n = self.num_points();
        if let Some(&bad) = indices.iter().find(|&&i| i >= n) {
            bail!(
                "Point index {} out of range for a table with {} points",
                bad,
                n
            );
        }
        Ok(())
    }
}

/// Low-dimensional embedding of the points of a [`DataTable`], one row per point.
///
/// A projection can carry more than two columns; neighborhood searches pick two of them as
/// the explained axes.
#[derive(Debug, Clone)]
pub struct Projection<T: FloatOps> {
    coords: Array2<T>,
}

impl<T: FloatOps> Projection<T> {
    pub fn new(coords: Array2<T>) -> anyhow::Result<Self> {
        if coords.ncols() < 2 {
            bail!(
                "A projection needs at least two axes, got {}",
                coords.ncols()
            );
        }
        Ok(Self { coords })
    }

    pub fn from_points(points: &[[T; 2]]) -> anyhow::Result<Self> {
        let flat: Vec<T> = points.iter().flat_map(|p| p.iter().copied()).collect();
        Self::new(Array2::from_shape_vec((points.len(), 2), flat)?)
    }

    pub fn num_points(&self) -> usize {
        self.coords.nrows()
    }

    pub fn num_axes(&self) -> usize {
        self.coords.ncols()
    }

    #[inline]
    pub fn coordinate(&self, point: usize, axis: usize) -> T {
        self.coords[(point, axis)]
    }

    pub fn axis(&self, axis: usize) -> ArrayView1<'_, T> {
        self.coords.column(axis)
    }

    pub fn view(&self) -> ArrayView2<'_, T> {
        self.coords.view()
    }

    pub fn check_axes(&self, axis_x: usize, axis_y: usize) -> anyhow::Result<()> {
        for axis in [axis_x, axis_y] {
            if axis >= self.num_axes() {
                bail!(
                    "Axis index {} out of range for a projection with {} axes",
                    axis,
                    self.num_axes()
                );
            }
        }
        Ok(())
    }

    /// Largest side of the bounding box spanned by the two axes. Zero for an empty projection.
    pub fn diameter(&self, axis_x: usize, axis_y: usize) -> anyhow::Result<T> {
        self.check_axes(axis_x, axis_y)?;
        if self.num_points() == 0 {
            return Ok(T::zero());
        }
        let extent = |axis: usize| {
            let (lo, hi) = self
                .coords
                .column(axis)
                .iter()
                .fold((T::infinity(), T::neg_infinity()), |(lo, hi), &v| {
                    (lo.min(v), hi.max(v))
                });
            hi - lo
        };
        Ok(extent(axis_x).max(extent(axis_y)))
    }
}
