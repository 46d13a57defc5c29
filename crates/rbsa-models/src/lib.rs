#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/rbsa/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod approach;
pub mod candidate;
pub mod clustering;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod hac;
pub mod linalg;
pub mod optimizer;

// Re-export main types
pub use approach::{
    ClusterGuidedSelector, PosteriorSamples, PosteriorSummary, RegularizedSelector,
    SpikeSlabSampler, StepwiseSelector, estimator,
};
pub use candidate::{
    Approach, AssetWeight, Candidate, StyleEstimator, SubstitutionRecord, WeightVector,
};
pub use clustering::Linkage;
pub use config::{
    AnalysisMode, BayesianConfig, ClusterConfig, ModelConfig, RegularizedConfig, StepwiseConfig,
    StyleOptions,
};
pub use diagnostics::Diagnostics;
pub use error::ModelError;
pub use hac::{HacConfig, HacEstimator};
pub use optimizer::{
    ConstrainedOptimizer, OptimizerConfig, OptimizerError, SolverOutput, SolverStatus,
    nnls_simplex,
};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
