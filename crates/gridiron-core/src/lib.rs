//! Core types and transforms for the gridiron NFL data loader.
//!
//! This crate has no HTTP or database dependencies. It turns validated API
//! payloads into flat warehouse rows and decides which of those rows are new;
//! the I/O lives behind the [`store::Warehouse`] and [`feed::SportsFeed`]
//! traits.

pub mod coerce;
pub mod dedup;
pub mod error;
pub mod feed;
pub mod flatten;
pub mod json;
pub mod row;
pub mod schedule;
pub mod store;

pub use error::{Error, Result};
