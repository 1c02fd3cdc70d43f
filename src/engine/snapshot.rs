//! Immutable pipeline stages. Each stage can only be built from the one before it, so a
//! neighborhood always belongs to the dataset it was computed on.

use anyhow::bail;
use log::{info, warn};

use super::EngineConfig;
use crate::dense::{DataTable, Projection};
use crate::neighborhood::{projection_diameter, NeighborhoodMatrix, NeighborhoodParams};
use crate::statistics::DimensionStatistics;
use crate::FloatOps;

/// A data table, its projection and the table's per-dimension statistics.
#[derive(Debug, Clone)]
pub struct Dataset<T: FloatOps> {
    pub(super) table: DataTable<T>,
    projection: Projection<T>,
    statistics: DimensionStatistics<T>,
}

impl<T: FloatOps> Dataset<T> {
    pub fn new(table: DataTable<T>, projection: Projection<T>) -> anyhow::Result<Self> {
        if table.num_points() != projection.num_points() {
            bail!(
                "Data table has {} points but the projection has {}",
                table.num_points(),
                projection.num_points()
            );
        }
        let statistics = DimensionStatistics::compute(&table);
        info!(
            "Loaded dataset with {} points and {} dimensions",
            table.num_points(),
            table.num_dimensions()
        );
        Ok(Self {
            table,
            projection,
            statistics,
        })
    }

    pub fn table(&self) -> &DataTable<T> {
        &self.table
    }

    pub fn projection(&self) -> &Projection<T> {
        &self.projection
    }

    pub fn statistics(&self) -> &DimensionStatistics<T> {
        &self.statistics
    }

    pub fn num_points(&self) -> usize {
        self.table.num_points()
    }
}

/// Explanation and confidence neighborhoods for one choice of radius and axes.
#[derive(Debug, Clone)]
pub struct Neighborhoods<T: FloatOps> {
    explanation: NeighborhoodMatrix<T>,
    confidence: NeighborhoodMatrix<T>,
    radius_fraction: T,
    diameter: T,
}

impl<T: FloatOps> Neighborhoods<T> {
    /// Explanation radius is `diameter * radius_fraction`, the confidence radius is the
    /// explanation radius times `config.confidence_radius_scale`.
    pub fn build(
        dataset: &Dataset<T>,
        radius_fraction: T,
        axis_x: usize,
        axis_y: usize,
        config: &EngineConfig,
    ) -> anyhow::Result<Self> {
        if !radius_fraction.is_finite() || radius_fraction < T::zero() {
            bail!(
                "Radius fraction must be finite and non-negative, got {:?}",
                radius_fraction
            );
        }
        if !config.confidence_radius_scale.is_finite() || config.confidence_radius_scale < 0.0 {
            bail!(
                "Confidence radius scale must be finite and non-negative, got {}",
                config.confidence_radius_scale
            );
        }

        let projection = dataset.projection();
        let diameter = projection_diameter(projection, axis_x, axis_y)?;
        if diameter == T::zero() && dataset.num_points() > 1 {
            warn!("Projection has zero extent on axes ({}, {})", axis_x, axis_y);
        }

        let radius = diameter * radius_fraction;
        let confidence_radius = radius * T::from_f64_lossy(config.confidence_radius_scale);

        let params =
            NeighborhoodParams::new(radius, axis_x, axis_y).include_self(config.include_self);
        let explanation = build_matrix(projection, params, config.spatial_index)?;
        let confidence = build_matrix(
            projection,
            NeighborhoodParams {
                radius: confidence_radius,
                ..params
            },
            config.spatial_index,
        )?;

        info!(
            "Computed neighborhoods on axes ({}, {}): radius {:?}, confidence radius {:?}, mean size {:.1}",
            axis_x,
            axis_y,
            radius,
            confidence_radius,
            explanation.mean_size()
        );

        Ok(Self {
            explanation,
            confidence,
            radius_fraction,
            diameter,
        })
    }

    pub fn explanation(&self) -> &NeighborhoodMatrix<T> {
        &self.explanation
    }

    pub fn confidence(&self) -> &NeighborhoodMatrix<T> {
        &self.confidence
    }

    pub fn axes(&self) -> (usize, usize) {
        let params = self.explanation.params();
        (params.axis_x, params.axis_y)
    }

    pub fn radius_fraction(&self) -> T {
        self.radius_fraction
    }

    pub fn diameter(&self) -> T {
        self.diameter
    }
}

#[cfg(feature = "kdtree")]
fn build_matrix<T: FloatOps>(
    projection: &Projection<T>,
    params: NeighborhoodParams<T>,
    spatial_index: bool,
) -> anyhow::Result<NeighborhoodMatrix<T>> {
    if spatial_index {
        NeighborhoodMatrix::build_indexed(projection, params)
    } else {
        NeighborhoodMatrix::build_with(projection, params)
    }
}

#[cfg(not(feature = "kdtree"))]
fn build_matrix<T: FloatOps>(
    projection: &Projection<T>,
    params: NeighborhoodParams<T>,
    spatial_index: bool,
) -> anyhow::Result<NeighborhoodMatrix<T>> {
    if spatial_index {
        warn!("Spatial index requested but the `kdtree` feature is disabled, using exhaustive search");
    }
    NeighborhoodMatrix::build_with(projection, params)
}
