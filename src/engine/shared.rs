//! Thread-safe handle around an [`ExplanationEngine`]. Mutations take the write lock,
//! queries share the read lock.

use std::sync::Arc;

use ndarray::{Array2, ArrayView2};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{EngineState, Explanation, ExplanationEngine};
use crate::dense::{DataTable, Projection};
use crate::ranking::Metric;
use crate::FloatOps;

#[derive(Debug, Clone)]
pub struct SharedExplanationEngine<T: FloatOps> {
    inner: Arc<RwLock<ExplanationEngine<T>>>,
}

impl<T: FloatOps> Default for SharedExplanationEngine<T> {
    fn default() -> Self {
        Self::new(ExplanationEngine::default())
    }
}

impl<T: FloatOps> SharedExplanationEngine<T> {
    pub fn new(engine: ExplanationEngine<T>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(engine)),
        }
    }

    /// Holds the read lock for several queries against one consistent state.
    pub fn read(&self) -> RwLockReadGuard<'_, ExplanationEngine<T>> {
        self.inner.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, ExplanationEngine<T>> {
        self.inner.write()
    }

    pub fn set_dataset(
        &self,
        table: DataTable<T>,
        projection: Projection<T>,
    ) -> anyhow::Result<()> {
        self.inner.write().set_dataset(table, projection)
    }

    pub fn recompute_neighborhood(
        &self,
        radius_fraction: T,
        axis_x: usize,
        axis_y: usize,
    ) -> anyhow::Result<()> {
        self.inner
            .write()
            .recompute_neighborhood(radius_fraction, axis_x, axis_y)
    }

    pub fn set_metric(&self, metric: Metric) {
        self.inner.write().set_metric(metric)
    }

    pub fn recompute_metrics(&self) -> anyhow::Result<()> {
        self.inner.write().recompute_metrics()
    }

    pub fn exclude_dimension(&self, dim: usize) -> anyhow::Result<bool> {
        self.inner.write().exclude_dimension(dim)
    }

    pub fn state(&self) -> EngineState {
        self.inner.read().state()
    }

    pub fn rank_selection(&self, selection: &[usize]) -> anyhow::Result<Vec<T>> {
        self.inner.read().rank_selection(selection)
    }

    pub fn rank_all(&self) -> anyhow::Result<Array2<T>> {
        self.inner.read().rank_all()
    }

    pub fn rank_points(&self, selection: &[usize]) -> anyhow::Result<Array2<T>> {
        self.inner.read().rank_points(selection)
    }

    pub fn compute_confidences(&self, ranks: ArrayView2<'_, T>) -> anyhow::Result<Vec<T>> {
        self.inner.read().compute_confidences(ranks)
    }

    pub fn explain(&self) -> anyhow::Result<Explanation<T>> {
        self.inner.read().explain()
    }

    pub fn recompute_confidences(&self, explanation: &Explanation<T>) -> anyhow::Result<Vec<T>> {
        self.inner.read().recompute_confidences(explanation)
    }
}
