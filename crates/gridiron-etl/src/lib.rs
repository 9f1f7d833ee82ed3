//! The gridiron load pipeline.
//!
//! [`Pipeline`] sequences fetch → validate → flatten → dedup → write for each
//! configured job, over any [`Warehouse`](gridiron_core::store::Warehouse) and
//! [`SportsFeed`](gridiron_core::feed::SportsFeed). Work runs one unit at a
//! time; nothing here spawns tasks.

pub mod context;
pub mod error;
pub mod feed;
pub mod lookup;
pub mod pipeline;
pub mod settings;
pub mod writer;

pub use context::{RunContext, RunReport, Stage};
pub use error::{Error, Result};
pub use feed::{FeedConfig, RapidApiFeed};
pub use pipeline::Pipeline;
pub use settings::{Job, PipelineSettings};
