//! Field tracking engine.
//!
//! Turns a stream of raw position fixes into a tracking session: fixes are
//! filtered, checked against the farm's zones for enter/exit/dwell
//! transitions, enriched with nearby assets, buffered for upload and
//! published to listeners.

pub mod config;
pub mod error;
pub mod geofence;
pub mod jobs;
pub mod listeners;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod proximity;
pub mod replay;
pub mod session;
pub mod upload_buffer;

pub use config::Config;
pub use error::TrackingError;
pub use listeners::{Listeners, Subscription, TrackingObserver};
pub use session::{FixOutcome, TrackingDeps, TrackingSessionManager};
