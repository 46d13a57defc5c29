#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/rbsa/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod export;
pub mod ranking;
pub mod report;
pub mod substitution;

pub use error::OutputError;
pub use export::{
    CandidateSummaryExport, ExportError, ExportFormat, Exporter, WeightExport, weight_rows,
};
pub use ranking::{
    CompositeWeights, LARGE_SAMPLE, RankedCandidate, composite_score, rank, rank_by_composite,
    selection_score,
};
pub use report::{
    ASSET_HIERARCHY, ReportBuilder, ReportError, StyleReport, composite_note, format_candidates,
    hierarchy_order,
};
pub use substitution::{
    Direction, FitComparison, RuleEvaluation, RuleOutcome, RuleTest, SubstitutionAnalysis,
    SubstitutionConfig, SubstitutionEngine, SubstitutionRule, SubstitutionRun, SwapTest,
};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
