pub mod confidence;
pub mod dense;
pub mod engine;
pub mod neighborhood;
pub mod ranking;
pub mod statistics;
mod utils;

pub use utils::normalize_min_max;
pub use utils::FloatOps;
pub use utils::RankOrder;

pub use confidence::{ConfidenceMethod, ConfidenceModel};
pub use dense::{DataTable, Projection};
pub use engine::{
    EngineConfig, EngineConfigBuilder, EngineState, Explanation, ExplanationEngine,
    SharedExplanationEngine,
};
pub use neighborhood::{NeighborhoodMatrix, NeighborhoodParams};
pub use ranking::{DimensionRanker, Metric, Ranking};
