//! Utility functions module
//!
//! This module contains HTTP client construction, network error
//! classification, and output formatting helpers.

pub mod format;
pub mod network;

pub use format::*;
pub use network::*;
