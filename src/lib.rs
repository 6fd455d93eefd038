//! PLUTUS: Research intelligence feed aggregator
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod api;
pub mod feed;
pub mod engine;
pub mod strategy;
pub mod dashboard;
