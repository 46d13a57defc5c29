#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/rbsa/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod pipeline;

// Re-export main types from sub-crates
pub use rbsa_data as data;
pub use rbsa_models as models;
pub use rbsa_output as output;

pub use error::AnalysisError;
pub use pipeline::{AnalysisConfig, AnalysisOutcome, ApproachResult, StyleAnalysis};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
