//! Persistence layer for field tracking.
//!
//! This crate contains:
//! - Database connection management and migrations
//! - Entity definitions (database row mappings)
//! - Repository implementations, which double as the PostgreSQL zone store
//!   and asset catalog
//! - The PostgreSQL telemetry sink

pub mod db;
pub mod entities;
pub mod metrics;
pub mod repositories;
pub mod sink;

pub use sink::PgTelemetrySink;
