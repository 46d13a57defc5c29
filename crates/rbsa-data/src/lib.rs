#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/rbsa/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod desmooth;
pub mod error;
pub mod matrix;
pub mod preprocess;
pub mod series;

pub use desmooth::{
    Ar1Test, DesmoothConfig, DesmoothReport, desmooth_if_needed, geltner_desmooth, test_ar1,
};
pub use error::{DataError, Result};
pub use matrix::ReturnMatrix;
pub use preprocess::{AlignedReturns, PreparedData, PreprocessConfig, prepare};
pub use series::ReturnSeries;

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
