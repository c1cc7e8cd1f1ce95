//! HTTP server and analysis pipeline for whoisit.
//!
//! This crate provides:
//! - The upload endpoint that stores images and records uploads
//! - The analysis handler that recognizes stored images and merges identities
//! - Queue consumers (SQS and in-process) and the background analysis worker
//! - Read endpoints, health and Prometheus metrics

pub mod analysis;
pub mod aws;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod queue;
pub mod routes;
pub mod state;
pub mod worker;

pub use analysis::{AnalysisError, AnalysisHandler, BatchReport};
pub use error::ApiError;
pub use queue::{LocalQueue, MessageQueue, QueueError, QueueMessage, SqsQueue};
pub use routes::create_router;
pub use state::AppState;
pub use worker::AnalysisWorker;
