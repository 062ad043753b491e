//! Positioning source that replays recorded fixes.
//!
//! Input is newline-delimited JSON, one fix per line:
//!
//! ```text
//! {"latitude": 10.0005, "longitude": 106.0005, "accuracy": 6.0, "delayMs": 2000}
//! ```
//!
//! Blank lines and lines starting with `#` are ignored. Each fix is emitted
//! after its `delayMs` (or the default delay) and stamped with the emission
//! time, so replays pass the stale-fix check.

use std::io::BufRead;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use domain::models::{Coordinate, DeviceTelemetry, PositionFix};
use domain::services::{CollaboratorError, FixStream, PermissionState, PositionSource, WatchOptions};

const CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("Failed to read replay file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid fix on line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// One recorded fix.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayFix {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: f64,
    #[serde(default)]
    pub altitude: Option<f64>,
    #[serde(default)]
    pub heading: Option<f64>,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub battery_level: Option<i32>,
    #[serde(default)]
    pub network_type: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    /// Wait before emitting this fix.
    #[serde(default)]
    pub delay_ms: Option<u64>,
}

impl ReplayFix {
    fn to_position_fix(&self) -> PositionFix {
        let mut coordinate = Coordinate::new(self.latitude, self.longitude, self.accuracy, Utc::now());
        coordinate.altitude = self.altitude;
        coordinate.heading = self.heading;
        coordinate.speed = self.speed;

        PositionFix {
            coordinate,
            telemetry: DeviceTelemetry {
                battery_level: self.battery_level,
                is_charging: None,
                network_type: self.network_type.clone(),
            },
            provider: self.provider.clone(),
        }
    }
}

pub struct ReplayPositionSource {
    fixes: Vec<ReplayFix>,
    default_delay: Duration,
    running: Mutex<Option<CancellationToken>>,
}

impl ReplayPositionSource {
    pub fn new(fixes: Vec<ReplayFix>, default_delay: Duration) -> Self {
        Self {
            fixes,
            default_delay,
            running: Mutex::new(None),
        }
    }

    pub fn from_reader(reader: impl BufRead, default_delay: Duration) -> Result<Self, ReplayError> {
        let mut fixes = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let fix = serde_json::from_str(trimmed).map_err(|source| ReplayError::Parse {
                line: index + 1,
                source,
            })?;
            fixes.push(fix);
        }
        Ok(Self::new(fixes, default_delay))
    }

    pub fn from_file(path: impl AsRef<Path>, default_delay: Duration) -> Result<Self, ReplayError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file), default_delay)
    }

    pub fn len(&self) -> usize {
        self.fixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixes.is_empty()
    }

    fn replace_running(&self, token: Option<CancellationToken>) {
        let previous = {
            let mut running = self
                .running
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            std::mem::replace(&mut *running, token)
        };
        if let Some(previous) = previous {
            previous.cancel();
        }
    }
}

#[async_trait::async_trait]
impl PositionSource for ReplayPositionSource {
    fn is_available(&self) -> bool {
        true
    }

    async fn request_permission(&self) -> PermissionState {
        PermissionState::Granted
    }

    async fn subscribe(&self, _options: WatchOptions) -> Result<FixStream, CollaboratorError> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();
        self.replace_running(Some(cancel.clone()));

        let fixes = self.fixes.clone();
        let default_delay = self.default_delay;
        info!(fixes = fixes.len(), "Starting fix replay");

        tokio::spawn(async move {
            for (index, fix) in fixes.into_iter().enumerate() {
                let delay = fix.delay_ms.map(Duration::from_millis).unwrap_or(default_delay);
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(delay) => {}
                }
                if tx.send(fix.to_position_fix()).await.is_err() {
                    return;
                }
                debug!(index, "Replayed fix");
            }
            info!("Fix replay finished");
        });

        Ok(rx)
    }

    async fn unsubscribe(&self) {
        self.replace_running(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
# morning walk, block A
{"latitude": 10.0005, "longitude": 106.0005, "accuracy": 6.0, "delayMs": 0}

{"latitude": 10.0006, "longitude": 106.0005, "accuracy": 8.0, "batteryLevel": 77, "networkType": "4g", "delayMs": 0}
"#;

    #[test]
    fn test_parse_skips_comments_and_blank_lines() {
        let source = ReplayPositionSource::from_reader(SAMPLE.as_bytes(), Duration::ZERO).unwrap();
        assert_eq!(source.len(), 2);
        assert_eq!(source.fixes[1].battery_level, Some(77));
        assert_eq!(source.fixes[1].network_type.as_deref(), Some("4g"));
    }

    #[test]
    fn test_parse_reports_line_number() {
        let input = "{\"latitude\": 10.0, \"longitude\": 106.0, \"accuracy\": 5.0}\nnot json\n";
        let err = ReplayPositionSource::from_reader(input.as_bytes(), Duration::ZERO)
            .err()
            .unwrap();
        assert!(matches!(err, ReplayError::Parse { line: 2, .. }));
    }

    #[tokio::test]
    async fn test_replay_emits_fixes_then_closes() {
        let source = ReplayPositionSource::from_reader(SAMPLE.as_bytes(), Duration::ZERO).unwrap();
        let mut stream = source.subscribe(WatchOptions::default()).await.unwrap();

        let first = stream.recv().await.unwrap();
        assert_eq!(first.coordinate.latitude, 10.0005);
        let second = stream.recv().await.unwrap();
        assert_eq!(second.telemetry.battery_level, Some(77));
        assert!(second.coordinate.timestamp >= first.coordinate.timestamp);
        assert!(stream.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_replay() {
        let fixes = vec![
            ReplayFix {
                latitude: 10.0,
                longitude: 106.0,
                accuracy: 5.0,
                altitude: None,
                heading: None,
                speed: None,
                battery_level: None,
                network_type: None,
                provider: None,
                delay_ms: Some(10_000),
            };
            3
        ];
        let source = ReplayPositionSource::new(fixes, Duration::ZERO);
        let mut stream = source.subscribe(WatchOptions::default()).await.unwrap();

        source.unsubscribe().await;
        let next = tokio::time::timeout(Duration::from_secs(1), stream.recv()).await;
        assert!(matches!(next, Ok(None)));
    }
}
