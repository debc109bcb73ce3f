//! LINK Pool Staker — staking pool deposit agent
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod chain;
pub mod config;
pub mod context;
pub mod engine;
pub mod report;
pub mod types;
