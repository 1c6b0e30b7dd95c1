//! Gallery ingestion, importance ranking and hue search
//!
//! - Upload requests and metadata alignment (request.rs)
//! - Entry building and the ingestion pipeline (builder.rs)
//! - Important-image rank slots (ranker.rs)
//! - Nearest-hue queries (nearest.rs)
//! - Ingestion counters (metrics.rs)

pub mod builder;
pub mod metrics;
pub mod nearest;
pub mod ranker;
pub mod request;
