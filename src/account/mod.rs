//! Storage account reconciliation module
//!
//! This module reconciles a storage account's sub-service monitoring
//! settings and private endpoint connections against a desired state.

pub mod compare;
pub mod models;
pub mod operations;
pub mod reconciler;
pub mod wire;

pub use models::*;
pub use operations::*;
pub use reconciler::*;
