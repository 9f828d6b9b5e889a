// src/lib.rs

//! Chapter Feeds Library
//!
//! Scrapes serialized-novel hosts for chapter releases and publishes them as
//! aggregated free and paid RSS feeds, with a rolling per-novel history for
//! the paid side.

pub mod error;
pub mod feed;
pub mod hosts;
pub mod models;
pub mod overrides;
pub mod pipeline;
pub mod storage;
pub mod utils;
