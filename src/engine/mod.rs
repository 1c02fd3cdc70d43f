//! # Explanation engine
//!
//! Orchestrates the pipeline for one dataset:
//!
//! 1. [`ExplanationEngine::set_dataset`] stores the table and projection and computes
//!    per-dimension statistics.
//! 2. [`ExplanationEngine::recompute_neighborhood`] builds the explanation and confidence
//!    neighborhoods for a radius (a fraction of the projection diameter) and two axes.
//! 3. [`ExplanationEngine::recompute_metrics`] fits the active ranking metric.
//!
//! Queries that need a later stage than the one reached return an error naming the missing
//! step. Changing an earlier stage drops every stage after it.

mod config;
pub mod shared;
mod snapshot;

pub use config::{EngineConfig, EngineConfigBuilder};
pub use shared::SharedExplanationEngine;
pub use snapshot::{Dataset, Neighborhoods};

use anyhow::anyhow;
use log::{info, warn};
use ndarray::{Array2, ArrayView2};

use crate::confidence::{ConfidenceMethod, ConfidenceModel};
use crate::dense::{DataTable, Projection};
use crate::ranking::{self, DimensionRanker, Metric, Ranking};
use crate::statistics::{DimensionStatistics, Histogram};
use crate::{FloatOps, RankOrder};

/// How far the pipeline has progressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineState {
    Uninitialized,
    DatasetLoaded,
    NeighborhoodReady,
    MetricsReady,
}

/// Everything a host needs to color and annotate a projection.
#[derive(Debug, Clone)]
pub struct Explanation<T: FloatOps> {
    /// `num_points × num_dimensions` ranking matrix.
    pub ranks: Array2<T>,
    pub top_dimensions: Vec<Option<usize>>,
    /// Normalized confidence per point.
    pub confidences: Vec<T>,
    /// Included dimensions, most often top ranked first.
    pub importance: Vec<usize>,
    /// Direction of the metric that produced `ranks`.
    pub order: RankOrder,
}

#[derive(Debug, Clone)]
pub struct ExplanationEngine<T: FloatOps> {
    config: EngineConfig,
    metric: Metric,
    confidence: ConfidenceModel,
    dataset: Option<Dataset<T>>,
    neighborhoods: Option<Neighborhoods<T>>,
    ranking: Option<Ranking<T>>,
}

impl<T: FloatOps> Default for ExplanationEngine<T> {
    fn default() -> Self {
        Self::with_config(EngineConfig::default())
    }
}

impl<T: FloatOps> ExplanationEngine<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            metric: config.metric,
            confidence: ConfidenceModel::new(config.confidence_method),
            config,
            dataset: None,
            neighborhoods: None,
            ranking: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> EngineState {
        match (&self.dataset, &self.neighborhoods, &self.ranking) {
            (None, _, _) => EngineState::Uninitialized,
            (Some(_), None, _) => EngineState::DatasetLoaded,
            (Some(_), Some(_), None) => EngineState::NeighborhoodReady,
            (Some(_), Some(_), Some(_)) => EngineState::MetricsReady,
        }
    }

    /// Replaces the dataset. Neighborhoods and the fitted ranking are dropped.
    pub fn set_dataset(
        &mut self,
        table: DataTable<T>,
        projection: Projection<T>,
    ) -> anyhow::Result<()> {
        let dataset = Dataset::new(table, projection)?;
        self.dataset = Some(dataset);
        self.neighborhoods = None;
        self.ranking = None;
        Ok(())
    }

    pub fn reset_dataset(&mut self) {
        self.dataset = None;
        self.neighborhoods = None;
        self.ranking = None;
        info!("Dataset reset");
    }

    /// Rebuilds both neighborhoods. The explanation radius is `radius_fraction` of the
    /// projection diameter on the given axes. The fitted ranking is dropped.
    pub fn recompute_neighborhood(
        &mut self,
        radius_fraction: T,
        axis_x: usize,
        axis_y: usize,
    ) -> anyhow::Result<()> {
        let dataset = self.dataset()?;
        let neighborhoods =
            Neighborhoods::build(dataset, radius_fraction, axis_x, axis_y, &self.config)?;
        self.neighborhoods = Some(neighborhoods);
        self.ranking = None;
        Ok(())
    }

    /// Switches the active metric without refitting. A ranking fitted with a different metric
    /// is dropped, so rank queries fail until [`Self::recompute_metrics`] runs.
    pub fn set_metric(&mut self, metric: Metric) {
        if self.ranking.as_ref().is_some_and(|r| r.metric() != metric) {
            info!("Switched metric to {}, ranking needs to be recomputed", metric.name());
            self.ranking = None;
        }
        self.metric = metric;
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn set_confidence_method(&mut self, method: ConfidenceMethod) {
        self.confidence = ConfidenceModel::new(method);
    }

    pub fn confidence_method(&self) -> ConfidenceMethod {
        self.confidence.method()
    }

    /// Fits the active metric on the explanation neighborhoods.
    pub fn recompute_metrics(&mut self) -> anyhow::Result<()> {
        let dataset = self.dataset()?;
        let neighborhoods = self.neighborhoods()?;
        let ranking = Ranking::fit(self.metric, dataset.table(), neighborhoods.explanation())?;
        info!(
            "Computed {} ranking for {} points",
            self.metric.name(),
            ranking.num_points()
        );
        self.ranking = Some(ranking);
        Ok(())
    }

    pub fn dataset(&self) -> anyhow::Result<&Dataset<T>> {
        self.dataset
            .as_ref()
            .ok_or_else(|| anyhow!("dataset not set: call set_dataset first"))
    }

    pub fn neighborhoods(&self) -> anyhow::Result<&Neighborhoods<T>> {
        self.dataset()?;
        self.neighborhoods
            .as_ref()
            .ok_or_else(|| anyhow!("neighborhoods not computed: call recompute_neighborhood first"))
    }

    pub fn ranking(&self) -> anyhow::Result<&Ranking<T>> {
        self.neighborhoods()?;
        self.ranking
            .as_ref()
            .ok_or_else(|| anyhow!("metrics not computed: call recompute_metrics first"))
    }

    pub fn statistics(&self) -> anyhow::Result<&DimensionStatistics<T>> {
        Ok(self.dataset()?.statistics())
    }

    /// Ranks of every dimension over an ad-hoc group of points.
    pub fn rank_selection(&self, selection: &[usize]) -> anyhow::Result<Vec<T>> {
        let ranking = self.ranking()?;
        ranking.rank_selection(self.dataset()?.table(), selection)
    }

    pub fn rank_all(&self) -> anyhow::Result<Array2<T>> {
        Ok(self.ranking()?.rank_all())
    }

    pub fn rank_points(&self, selection: &[usize]) -> anyhow::Result<Array2<T>> {
        self.ranking()?.rank_points(selection)
    }

    /// Normalized confidence per point for a full ranking matrix.
    ///
    /// Top dimensions are picked with the active metric's direction, so `ranks` must come from
    /// that metric. Use [`Self::recompute_confidences`] for a matrix fitted before a metric switch.
    pub fn compute_confidences(&self, ranks: ArrayView2<'_, T>) -> anyhow::Result<Vec<T>> {
        self.confidences_with_order(ranks, self.metric.rank_order())
    }

    /// Confidences of an earlier explanation against the current neighborhoods, exclusion mask
    /// and confidence method, using the direction stored with its ranks.
    pub fn recompute_confidences(&self, explanation: &Explanation<T>) -> anyhow::Result<Vec<T>> {
        self.confidences_with_order(explanation.ranks.view(), explanation.order)
    }

    fn confidences_with_order(
        &self,
        ranks: ArrayView2<'_, T>,
        order: RankOrder,
    ) -> anyhow::Result<Vec<T>> {
        let dataset = self.dataset()?;
        let neighborhoods = self.neighborhoods()?;
        self.confidence.compute(
            ranks,
            order,
            dataset.table().exclusion_mask(),
            neighborhoods.confidence(),
        )
    }

    /// Best ranked included dimension per row of `ranks`.
    pub fn top_dimensions(&self, ranks: ArrayView2<'_, T>) -> anyhow::Result<Vec<Option<usize>>> {
        let mask = self.exclusion_mask()?;
        ranking::top_dimensions(ranks, self.metric.rank_order(), mask)
    }

    /// Included dimensions ordered by how often they are the top dimension in `ranks`.
    pub fn dimension_importance(&self, ranks: ArrayView2<'_, T>) -> anyhow::Result<Vec<usize>> {
        let mask = self.exclusion_mask()?;
        ranking::dimension_importance(ranks, self.metric.rank_order(), mask)
    }

    /// Ranks, top dimensions, confidences and importance over every point.
    pub fn explain(&self) -> anyhow::Result<Explanation<T>> {
        let ranks = self.rank_all()?;
        let top_dimensions = self.top_dimensions(ranks.view())?;
        let confidences = self.compute_confidences(ranks.view())?;
        let importance = self.dimension_importance(ranks.view())?;
        Ok(Explanation {
            ranks,
            top_dimensions,
            confidences,
            importance,
            order: self.metric.rank_order(),
        })
    }

    /// Toggles whether `dim` takes part in top-dimension and confidence queries. Returns the
    /// new state. Nothing is recomputed.
    pub fn exclude_dimension(&mut self, dim: usize) -> anyhow::Result<bool> {
        let dataset = self
            .dataset
            .as_mut()
            .ok_or_else(|| anyhow!("dataset not set: call set_dataset first"))?;
        let excluded = dataset.table.toggle_excluded(dim)?;
        if dataset.table.included_dimensions().is_empty() {
            warn!("Every dimension is excluded, no point has a top dimension");
        }
        Ok(excluded)
    }

    /// Histogram of one dimension over its value range.
    pub fn histogram(&self, dim: usize, num_bins: usize) -> anyhow::Result<Histogram<T>> {
        let dataset = self.dataset()?;
        Histogram::of_dimension(dataset.table(), dataset.statistics(), dim, num_bins)
    }

    fn exclusion_mask(&self) -> anyhow::Result<&[bool]> {
        Ok(self.dataset()?.table().exclusion_mask())
    }
}
