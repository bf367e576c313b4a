//! Integration Tests Module
//!
//! End-to-end tests over temporary install roots: marketplace-driven
//! install lifecycle, skill matching, and HTTP fetch behaviour.

// Shared fixtures
mod support;

// Install, update, remove and crash recovery
mod lifecycle_test;

// Skill activation over installed plugins
mod matching_test;

// Retry, checksum and index-URL marketplaces over HTTP
mod fetch_http_test;
