//! Raw fix filtering.
//!
//! Decides which fixes from the positioning source become part of the
//! track. Checks run in order: coordinate validity, freshness, accuracy,
//! then minimum movement against the last accepted fix.

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use validator::Validate;

use domain::models::{Coordinate, PositionFix};

use crate::config::TrackingConfig;

/// Why a fix was dropped. Rejection is a normal outcome, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum FixRejection {
    /// Out-of-range latitude, longitude, accuracy or telemetry.
    InvalidCoordinate(String),
    /// Older than the configured maximum fix age.
    Stale { age_ms: i64 },
    /// Accuracy radius above the configured limit.
    Inaccurate { accuracy: f64, limit: f64 },
    /// Too close to the previously accepted fix.
    TooClose { distance: f64, limit: f64 },
}

impl FixRejection {
    /// Metric label for the rejection.
    pub fn as_str(&self) -> &'static str {
        match self {
            FixRejection::InvalidCoordinate(_) => "invalid_coordinate",
            FixRejection::Stale { .. } => "stale",
            FixRejection::Inaccurate { .. } => "inaccurate",
            FixRejection::TooClose { .. } => "too_close",
        }
    }
}

impl fmt::Display for FixRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FixRejection::InvalidCoordinate(reason) => write!(f, "invalid coordinate: {}", reason),
            FixRejection::Stale { age_ms } => write!(f, "fix is {}ms old", age_ms),
            FixRejection::Inaccurate { accuracy, limit } => {
                write!(f, "accuracy {:.1}m exceeds {:.1}m", accuracy, limit)
            }
            FixRejection::TooClose { distance, limit } => {
                write!(f, "moved {:.2}m, less than {:.2}m", distance, limit)
            }
        }
    }
}

/// A fix that passed every check.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptedFix {
    pub coordinate: Coordinate,
    /// Meters from the previous accepted fix; 0 for the first one.
    pub distance_from_previous: f64,
}

/// Per-session fix filter with a bounded window of recent accepted fixes.
#[derive(Debug)]
pub struct SamplePipeline {
    min_accuracy: f64,
    min_distance: f64,
    max_fix_age: Option<chrono::Duration>,
    capacity: usize,
    recent: VecDeque<Coordinate>,
}

impl SamplePipeline {
    pub fn new(config: &TrackingConfig) -> Self {
        let capacity = config.recent_fix_buffer_size.max(1);
        Self {
            min_accuracy: config.min_accuracy_meters,
            min_distance: config.min_distance_meters,
            max_fix_age: config.max_fix_age(),
            capacity,
            recent: VecDeque::with_capacity(capacity),
        }
    }

    /// Run the checks and, on success, remember the fix as the latest one.
    pub fn accept(&mut self, fix: &PositionFix, now: DateTime<Utc>) -> Result<AcceptedFix, FixRejection> {
        fix.validate()
            .map_err(|e| FixRejection::InvalidCoordinate(e.to_string()))?;

        let coordinate = fix.coordinate;

        if let Some(max_age) = self.max_fix_age {
            let age = now - coordinate.timestamp;
            if age > max_age {
                return Err(FixRejection::Stale {
                    age_ms: age.num_milliseconds(),
                });
            }
        }

        if coordinate.accuracy > self.min_accuracy {
            return Err(FixRejection::Inaccurate {
                accuracy: coordinate.accuracy,
                limit: self.min_accuracy,
            });
        }

        let distance_from_previous = match self.recent.back() {
            Some(last) => {
                let distance = last.distance_to(&coordinate);
                if distance < self.min_distance {
                    return Err(FixRejection::TooClose {
                        distance,
                        limit: self.min_distance,
                    });
                }
                distance
            }
            None => 0.0,
        };

        if self.recent.len() == self.capacity {
            self.recent.pop_front();
        }
        self.recent.push_back(coordinate);

        Ok(AcceptedFix {
            coordinate,
            distance_from_previous,
        })
    }

    pub fn last(&self) -> Option<&Coordinate> {
        self.recent.back()
    }

    /// Recent accepted fixes, oldest first.
    pub fn recent(&self) -> impl Iterator<Item = &Coordinate> {
        self.recent.iter()
    }

    pub fn len(&self) -> usize {
        self.recent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recent.is_empty()
    }
}
