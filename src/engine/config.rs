use crate::confidence::ConfidenceMethod;
use crate::ranking::Metric;

/// Settings of an [`ExplanationEngine`](super::ExplanationEngine).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub metric: Metric,
    pub confidence_method: ConfidenceMethod,
    /// Confidence radius as a multiple of the explanation radius.
    pub confidence_radius_scale: f64,
    pub include_self: bool,
    /// Use the kd-tree neighborhood search. Only honoured with the `kdtree` feature.
    pub spatial_index: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfigBuilder::default().build()
    }
}

impl EngineConfig {
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::new()
    }
}

/// Builder for [`EngineConfig`].
///
/// ```ignore
/// let config = EngineConfigBuilder::new()
///     .metric(Metric::Value)
///     .confidence_method(ConfidenceMethod::RankMagnitude)
///     .confidence_radius_scale(0.5)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct EngineConfigBuilder {
    metric: Metric,
    confidence_method: ConfidenceMethod,
    confidence_radius_scale: f64,
    include_self: bool,
    spatial_index: bool,
}

impl Default for EngineConfigBuilder {
    fn default() -> Self {
        Self {
            metric: Metric::Variance,
            confidence_method: ConfidenceMethod::MajorityCount,
            confidence_radius_scale: 0.25,
            include_self: true,
            spatial_index: false,
        }
    }
}

impl EngineConfigBuilder {
    /// Creates a new builder with default parameters.
    ///
    /// Default values:
    /// - `metric`: Variance
    /// - `confidence_method`: MajorityCount
    /// - `confidence_radius_scale`: 0.25
    /// - `include_self`: true
    /// - `spatial_index`: false
    pub fn new() -> Self {
        Self::default()
    }

    pub fn metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    pub fn confidence_method(mut self, method: ConfidenceMethod) -> Self {
        self.confidence_method = method;
        self
    }

    /// Sets the confidence radius relative to the explanation radius.
    ///
    /// Smaller values measure agreement on a tighter patch around each point.
    pub fn confidence_radius_scale(mut self, scale: f64) -> Self {
        self.confidence_radius_scale = scale;
        self
    }

    /// Sets whether a point belongs to its own neighborhoods.
    ///
    /// Turning this off reproduces the older self-excluding behaviour; isolated points then
    /// have empty neighborhoods.
    pub fn include_self(mut self, include_self: bool) -> Self {
        self.include_self = include_self;
        self
    }

    pub fn spatial_index(mut self, spatial_index: bool) -> Self {
        self.spatial_index = spatial_index;
        self
    }

    pub fn build(self) -> EngineConfig {
        EngineConfig {
            metric: self.metric,
            confidence_method: self.confidence_method,
            confidence_radius_scale: self.confidence_radius_scale,
            include_self: self.include_self,
            spatial_index: self.spatial_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.metric, Metric::Variance);
        assert_eq!(config.confidence_method, ConfidenceMethod::MajorityCount);
        assert_eq!(config.confidence_radius_scale, 0.25);
        assert!(config.include_self);
        assert!(!config.spatial_index);
    }

    #[test]
    fn test_builder_overrides() {
        let config = EngineConfig::builder()
            .metric(Metric::Euclidean)
            .confidence_method(ConfidenceMethod::RankMagnitude)
            .confidence_radius_scale(0.5)
            .include_self(false)
            .spatial_index(true)
            .build();
        assert_eq!(config.metric, Metric::Euclidean);
        assert_eq!(config.confidence_method, ConfidenceMethod::RankMagnitude);
        assert_eq!(config.confidence_radius_scale, 0.5);
        assert!(!config.include_self);
        assert!(config.spatial_index);
    }
}
