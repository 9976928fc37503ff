//! Scrape-filter-dedup-emit pipeline for the AFL.com.au news listing.
//!
//! - [`scrapers`]: listing extraction and bounded pagination
//! - [`filter`]: exclusion rules and the recency window
//! - [`dedup`]: persistent set of already-published urls
//! - [`outputs`]: RSS 2.0 rendering
//! - [`pipeline`]: run orchestration and the run summary
//!
//! The binary in `main.rs` wires these to the command line.

pub mod cli;
pub mod config;
pub mod dedup;
pub mod errors;
pub mod fetch;
pub mod filter;
pub mod models;
pub mod outputs;
pub mod pipeline;
pub mod scrapers;
pub mod utils;
