//! Rapid-scan satellite acquisition pipeline.
//!
//! Every tick resolves the newest available rapid-scan image, fetches the
//! configured bands, decodes, calibrates and geolocates them, and hands the
//! resulting grids to a [`RenderSink`].

pub mod cleanup;
pub mod config;
pub mod pipeline;
pub mod scheduler;
pub mod sink;
pub mod transfer;

pub use cleanup::BucketCleaner;
pub use config::PipelineConfig;
pub use pipeline::{Pipeline, TickReport};
pub use scheduler::Scheduler;
pub use sink::{LogSink, Product, RenderSink};
pub use transfer::{HttpTransfer, MirrorTransfer, Transfer, TransferError};
