//! storsync - Azure Storage account reconciler
//!
//! Brings a storage account's per-service logging and metrics settings in
//! line with a requested retention, and approves pending private endpoint
//! connections.

pub mod account;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod utils;

// Re-export commonly used types
pub use error::{Result, StorsyncError};
