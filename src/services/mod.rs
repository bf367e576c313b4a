//! Services
//!
//! Business logic services for the application.
//! Services handle the core functionality and are called by commands.

pub mod plugins;
pub mod skills;
