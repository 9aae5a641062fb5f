//! Dimension root-cause analysis
//!
//! Explains a change between a baseline and a current aggregate by ranking the
//! dimensions that account for it and decomposing the change into a tree of
//! dimension-value combinations, from which a summary picks the few nodes
//! that explain most of it.

pub mod config;
pub mod cube;
pub mod error;
pub mod fetcher;
pub mod observability;
pub mod report;
pub mod summary;

pub use config::CubeConfig;
pub use cube::{Cube, CubeNode, Dimensions, Row};
pub use error::{CubeError, Result};
pub use fetcher::{CubeFetcher, InMemoryFetcher};
pub use summary::{Summary, SummaryResponse};
