// src/metrics/mod.rs

pub mod counters;
pub mod sha_tracker;

pub use counters::{Counter, Metrics};
pub use sha_tracker::{RepoInfo, ShaTracker};
