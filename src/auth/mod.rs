//! Authentication module for Azure services
//!
//! This module acquires tokens for Azure Resource Manager and the storage
//! data plane through the Azure SDK credential types.

pub mod provider;

pub use provider::*;
