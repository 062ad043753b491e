//! Zone transition detection for one tracking session.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use domain::models::{Coordinate, GeofenceEvent, GeofenceTransitionType, TrackingSession, Zone};

use super::catalog::ZoneSnapshot;

/// The zone the user is currently in and since when.
#[derive(Debug, Clone)]
struct ZonePresence {
    zone: Zone,
    entered_at: DateTime<Utc>,
    last_coordinate: Coordinate,
    dwell_reported: bool,
}

/// Tracks the last known zone and turns membership changes into events.
///
/// Only the most recent containing zone is remembered; overlapping zones
/// resolve to the first match in catalog order.
#[derive(Debug)]
pub struct GeofenceDetector {
    boundary_buffer_meters: f64,
    dwell_threshold: chrono::Duration,
    current: Option<ZonePresence>,
}

impl GeofenceDetector {
    pub fn new(boundary_buffer_meters: f64, dwell_threshold: chrono::Duration) -> Self {
        Self {
            boundary_buffer_meters,
            dwell_threshold,
            current: None,
        }
    }

    pub fn last_known_zone_id(&self) -> Option<&str> {
        self.current.as_ref().map(|p| p.zone.id.as_str())
    }

    pub fn current_zone(&self) -> Option<&Zone> {
        self.current.as_ref().map(|p| &p.zone)
    }

    /// Evaluate an accepted coordinate against the snapshot.
    ///
    /// Returns nothing when the zone did not change, one event for a plain
    /// enter or exit, and exit followed by enter when moving between zones.
    pub fn evaluate(
        &mut self,
        coordinate: &Coordinate,
        zones: &ZoneSnapshot,
        session: &TrackingSession,
    ) -> Vec<GeofenceEvent> {
        let resolved = self.resolve_zone(coordinate, zones, &session.user_id).cloned();
        let now_in = resolved.as_ref().map(|z| z.id.as_str());

        if now_in == self.last_known_zone_id() {
            if let Some(presence) = self.current.as_mut() {
                presence.last_coordinate = *coordinate;
            }
            return Vec::new();
        }

        let mut events = Vec::with_capacity(2);

        if let Some(previous) = self.current.take() {
            let stayed = coordinate.timestamp - previous.entered_at;
            events.push(build_event(
                session,
                &previous.zone,
                GeofenceTransitionType::Exit,
                coordinate,
                coordinate.timestamp,
                Some(stayed.num_milliseconds().max(0)),
            ));
        }

        if let Some(zone) = resolved {
            events.push(build_event(
                session,
                &zone,
                GeofenceTransitionType::Enter,
                coordinate,
                coordinate.timestamp,
                None,
            ));
            self.current = Some(ZonePresence {
                zone,
                entered_at: coordinate.timestamp,
                last_coordinate: *coordinate,
                dwell_reported: false,
            });
        }

        events
    }

    /// Emit a dwell event once per stay after the threshold has elapsed.
    pub fn check_dwell(&mut self, now: DateTime<Utc>, session: &TrackingSession) -> Option<GeofenceEvent> {
        let threshold = self.dwell_threshold;
        let presence = self.current.as_mut()?;
        if presence.dwell_reported {
            return None;
        }

        let stayed = now - presence.entered_at;
        if stayed < threshold {
            return None;
        }

        presence.dwell_reported = true;
        Some(build_event(
            session,
            &presence.zone,
            GeofenceTransitionType::Dwell,
            &presence.last_coordinate,
            now,
            Some(stayed.num_milliseconds()),
        ))
    }

    /// Containing zone, or the current zone when the point is just outside it.
    fn resolve_zone<'a>(
        &self,
        coordinate: &Coordinate,
        zones: &'a ZoneSnapshot,
        user_id: &str,
    ) -> Option<&'a Zone> {
        let point = coordinate.lat_lng();
        if let Some(zone) = zones.find_containing(point, user_id) {
            return Some(zone);
        }

        if self.boundary_buffer_meters <= 0.0 {
            return None;
        }

        // A zone dropped by a reload is left immediately.
        let current_id = self.last_known_zone_id()?;
        zones
            .get(current_id)
            .filter(|zone| zone.boundary_distance_meters(point) <= self.boundary_buffer_meters)
    }
}

fn build_event(
    session: &TrackingSession,
    zone: &Zone,
    event_type: GeofenceTransitionType,
    coordinate: &Coordinate,
    timestamp: DateTime<Utc>,
    duration_ms: Option<i64>,
) -> GeofenceEvent {
    GeofenceEvent {
        id: Uuid::new_v4(),
        session_id: session.id,
        user_id: session.user_id.clone(),
        farm_id: session.farm_id.clone(),
        zone_id: zone.id.clone(),
        zone_name: Some(zone.name.clone()),
        event_type,
        timestamp,
        coordinate: *coordinate,
        duration_ms,
        notify: zone.alerts_on(event_type),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use domain::models::ZoneMetadata;
    use shared::geo::LatLng;

    fn zone(id: &str, lng: f64) -> Zone {
        Zone {
            id: id.to_string(),
            name: format!("Block {}", id.to_uppercase()),
            farm_id: "farm-1".to_string(),
            polygon: vec![
                LatLng::new(10.000, lng),
                LatLng::new(10.000, lng + 0.001),
                LatLng::new(10.001, lng + 0.001),
                LatLng::new(10.001, lng),
            ],
            is_active: true,
            alert_on_entry: true,
            alert_on_exit: false,
            allowed_user_ids: None,
            metadata: ZoneMetadata::default(),
            updated_at: None,
        }
    }

    fn snapshot(zones: Vec<Zone>) -> ZoneSnapshot {
        ZoneSnapshot {
            farm_id: Some("farm-1".to_string()),
            zones,
            loaded_at: Some(Utc::now()),
        }
    }

    fn at(lat: f64, lng: f64) -> Coordinate {
        Coordinate::new(lat, lng, 5.0, Utc::now())
    }

    fn session() -> TrackingSession {
        TrackingSession::start("u1", "farm-1", Utc::now())
    }

    fn detector() -> GeofenceDetector {
        GeofenceDetector::new(0.0, Duration::minutes(5))
    }

    #[test]
    fn test_enter_then_stay_then_exit() {
        let zones = snapshot(vec![zone("a", 106.000)]);
        let session = session();
        let mut detector = detector();

        let events = detector.evaluate(&at(10.0005, 106.0005), &zones, &session);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, GeofenceTransitionType::Enter);
        assert_eq!(events[0].zone_id, "a");
        assert_eq!(events[0].zone_name.as_deref(), Some("Block A"));
        assert!(events[0].notify);
        assert_eq!(detector.last_known_zone_id(), Some("a"));

        assert!(detector.evaluate(&at(10.0006, 106.0006), &zones, &session).is_empty());

        let events = detector.evaluate(&at(10.0005, 106.0020), &zones, &session);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, GeofenceTransitionType::Exit);
        assert!(!events[0].notify);
        assert!(detector.last_known_zone_id().is_none());
    }

    #[test]
    fn test_no_events_while_outside() {
        let zones = snapshot(vec![zone("a", 106.000)]);
        let session = session();
        let mut detector = detector();

        assert!(detector.evaluate(&at(11.0, 107.0), &zones, &session).is_empty());
        assert!(detector.evaluate(&at(11.001, 107.0), &zones, &session).is_empty());
    }

    #[test]
    fn test_zone_to_zone_emits_exit_before_enter() {
        let zones = snapshot(vec![zone("a", 106.000), zone("b", 106.001)]);
        let session = session();
        let mut detector = detector();

        detector.evaluate(&at(10.0005, 106.0005), &zones, &session);
        let events = detector.evaluate(&at(10.0005, 106.0015), &zones, &session);

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, GeofenceTransitionType::Exit);
        assert_eq!(events[0].zone_id, "a");
        assert_eq!(events[1].event_type, GeofenceTransitionType::Enter);
        assert_eq!(events[1].zone_id, "b");
        assert_eq!(detector.last_known_zone_id(), Some("b"));
    }

    #[test]
    fn test_events_carry_session_identity() {
        let zones = snapshot(vec![zone("a", 106.000)]);
        let session = session();
        let mut detector = detector();

        let events = detector.evaluate(&at(10.0005, 106.0005), &zones, &session);
        assert_eq!(events[0].session_id, session.id);
        assert_eq!(events[0].user_id, "u1");
        assert_eq!(events[0].farm_id, "farm-1");
    }

    #[test]
    fn test_boundary_buffer_suppresses_edge_exit() {
        let zones = snapshot(vec![zone("a", 106.000)]);
        let session = session();
        let mut detector = GeofenceDetector::new(10.0, Duration::minutes(5));

        detector.evaluate(&at(10.0005, 106.0005), &zones, &session);

        // ~3m east of the eastern edge
        assert!(detector.evaluate(&at(10.0005, 106.00103), &zones, &session).is_empty());
        assert_eq!(detector.last_known_zone_id(), Some("a"));

        // ~50m east
        let events = detector.evaluate(&at(10.0005, 106.00145), &zones, &session);
        assert_eq!(events[0].event_type, GeofenceTransitionType::Exit);
    }

    #[test]
    fn test_boundary_buffer_does_not_cause_entry() {
        let zones = snapshot(vec![zone("a", 106.000)]);
        let session = session();
        let mut detector = GeofenceDetector::new(10.0, Duration::minutes(5));

        assert!(detector.evaluate(&at(10.0005, 106.00103), &zones, &session).is_empty());
        assert!(detector.last_known_zone_id().is_none());
    }

    #[test]
    fn test_zone_removed_from_catalog_exits() {
        let session = session();
        let mut detector = GeofenceDetector::new(10.0, Duration::minutes(5));
        detector.evaluate(&at(10.0005, 106.0005), &snapshot(vec![zone("a", 106.000)]), &session);

        let events = detector.evaluate(&at(10.0006, 106.0006), &snapshot(vec![]), &session);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, GeofenceTransitionType::Exit);
        assert_eq!(events[0].zone_id, "a");
    }

    #[test]
    fn test_dwell_emitted_once_after_threshold() {
        let zones = snapshot(vec![zone("a", 106.000)]);
        let session = session();
        let mut detector = detector();
        let entered = at(10.0005, 106.0005);
        detector.evaluate(&entered, &zones, &session);

        assert!(detector
            .check_dwell(entered.timestamp + Duration::minutes(4), &session)
            .is_none());

        let dwell = detector
            .check_dwell(entered.timestamp + Duration::minutes(6), &session)
            .unwrap();
        assert_eq!(dwell.event_type, GeofenceTransitionType::Dwell);
        assert_eq!(dwell.duration_ms, Some(360_000));
        assert!(dwell.notify);

        assert!(detector
            .check_dwell(entered.timestamp + Duration::minutes(10), &session)
            .is_none());
    }

    #[test]
    fn test_dwell_resets_on_new_stay() {
        let zones = snapshot(vec![zone("a", 106.000)]);
        let session = session();
        let mut detector = detector();
        let first = at(10.0005, 106.0005);
        detector.evaluate(&first, &zones, &session);
        detector.check_dwell(first.timestamp + Duration::minutes(6), &session).unwrap();

        detector.evaluate(&at(11.0, 107.0), &zones, &session);
        let back = at(10.0005, 106.0005);
        detector.evaluate(&back, &zones, &session);

        assert!(detector
            .check_dwell(back.timestamp + Duration::minutes(6), &session)
            .is_some());
    }

    #[test]
    fn test_dwell_requires_a_zone() {
        let session = session();
        let mut detector = detector();
        assert!(detector.check_dwell(Utc::now(), &session).is_none());
    }
}
