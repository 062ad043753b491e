//! Domain layer for field tracking.
//!
//! This crate contains:
//! - Domain models (Coordinate, Zone, TrackingSession, LocationUpdate, GeofenceEvent)
//! - Collaborator interfaces (zone store, asset catalog, sink, positioning source)
//! - In-memory collaborator implementations for tests and simulation

pub mod models;
pub mod services;
