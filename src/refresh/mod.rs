// Refresh pipeline: estimator, reconciliation engine, summary artifact

pub mod gdp;
pub mod reconcile;
pub mod render;
pub mod summary;

pub use gdp::{estimate_gdp, FixedMultiplier, MultiplierSource, RandomMultiplier};
pub use reconcile::{
    apply_batch, reconcile_record, RefreshEngine, RefreshError, RefreshOutcome, RefreshTally,
    SkipReason,
};
pub use render::PngSummaryRenderer;
pub use summary::{ArtifactSlot, SummaryBuilder, SummaryInput, SummaryRenderer};
