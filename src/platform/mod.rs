// src/platform/mod.rs

pub mod client;
pub mod token;

pub use client::PlatformClient;
pub use token::{TokenFetcher, UaaTokenFetcher};
