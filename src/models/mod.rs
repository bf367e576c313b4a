//! Data Models
//!
//! Configuration and response types shared by the CLI and services.

pub mod response;
pub mod settings;

pub use response::*;
pub use settings::*;
