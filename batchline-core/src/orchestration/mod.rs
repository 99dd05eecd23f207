//! Batch scheduling domain.
//!
//! An ingest request becomes an [`Ingestion`] owning its [`Batch`]es. The
//! batches are shared (never copied) with the [`BatchQueue`]; the single
//! [`Scheduler`] drain loop pops them in priority order and moves each one
//! through its status transitions, which status queries observe directly.

pub mod batch;
pub mod config;
pub mod processor;
pub mod queue;
pub mod registry;
pub mod scheduler;
pub mod status;

pub use batch::*;
pub use config::*;
pub use processor::*;
pub use queue::*;
pub use registry::*;
pub use scheduler::*;
pub use status::*;
