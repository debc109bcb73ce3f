//! Core engine — the read → decide → stake loop.
//!
//! - `reader` — pool snapshot and memoized token address
//! - `decision` — pure stake/skip policy
//! - `submitter` — transferAndCall build, sign, broadcast, confirmation watcher
//! - `scheduler` — fixed-interval loop with typed per-cycle error handling

pub mod decision;
pub mod reader;
pub mod scheduler;
pub mod submitter;
