//! Utility types for swarmgraph.
//!
//! - [`Error`] / [`Result`] - Error handling

mod error;

pub use error::*;
