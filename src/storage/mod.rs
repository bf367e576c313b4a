//! Storage Layer
//!
//! Handles data persistence: JSON config and the locked install record set.

pub mod config;
pub mod records;

pub use config::*;
pub use records::*;
