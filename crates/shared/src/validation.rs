//! Validation rules for incoming position fixes and zone geometry.
//!
//! These plug into `validator` derives via `#[validate(custom(function = ...))]`.

use validator::ValidationError;

use crate::geo::LatLng;

/// Minimum number of vertices for a zone ring.
pub const MIN_POLYGON_VERTICES: usize = 3;

fn range_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

/// Latitude must be within -90..=90 and finite.
pub fn validate_latitude(lat: f64) -> Result<(), ValidationError> {
    if (-90.0..=90.0).contains(&lat) {
        Ok(())
    } else {
        Err(range_error(
            "latitude_range",
            "Latitude must be between -90 and 90",
        ))
    }
}

/// Longitude must be within -180..=180 and finite.
pub fn validate_longitude(lon: f64) -> Result<(), ValidationError> {
    if (-180.0..=180.0).contains(&lon) {
        Ok(())
    } else {
        Err(range_error(
            "longitude_range",
            "Longitude must be between -180 and 180",
        ))
    }
}

/// Horizontal accuracy is a radius in meters and cannot be negative.
pub fn validate_accuracy(accuracy: f64) -> Result<(), ValidationError> {
    if accuracy >= 0.0 {
        Ok(())
    } else {
        Err(range_error(
            "accuracy_range",
            "Accuracy must be non-negative",
        ))
    }
}

/// Heading in degrees clockwise from true north.
pub fn validate_heading(heading: f64) -> Result<(), ValidationError> {
    if (0.0..=360.0).contains(&heading) {
        Ok(())
    } else {
        Err(range_error(
            "heading_range",
            "Heading must be between 0 and 360",
        ))
    }
}

/// Speed in meters per second.
pub fn validate_speed(speed: f64) -> Result<(), ValidationError> {
    if speed >= 0.0 {
        Ok(())
    } else {
        Err(range_error("speed_range", "Speed must be non-negative"))
    }
}

/// Battery level as a percentage.
pub fn validate_battery_level(level: i32) -> Result<(), ValidationError> {
    if (0..=100).contains(&level) {
        Ok(())
    } else {
        Err(range_error(
            "battery_range",
            "Battery level must be between 0 and 100",
        ))
    }
}

/// A zone ring needs at least three vertices, each a valid coordinate.
pub fn validate_polygon(ring: &[LatLng]) -> Result<(), ValidationError> {
    if ring.len() < MIN_POLYGON_VERTICES {
        return Err(range_error(
            "polygon_vertices",
            "Polygon must have at least 3 vertices",
        ));
    }
    for vertex in ring {
        validate_latitude(vertex.latitude)?;
        validate_longitude(vertex.longitude)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_latitude() {
        assert!(validate_latitude(0.0).is_ok());
        assert!(validate_latitude(90.0).is_ok());
        assert!(validate_latitude(-90.0).is_ok());
        assert!(validate_latitude(90.1).is_err());
        assert!(validate_latitude(f64::NAN).is_err());
    }

    #[test]
    fn test_validate_longitude() {
        assert!(validate_longitude(106.0005).is_ok());
        assert!(validate_longitude(-180.0).is_ok());
        assert!(validate_longitude(180.1).is_err());
    }

    #[test]
    fn test_validate_latitude_error_message() {
        let err = validate_latitude(100.0).unwrap_err();
        assert_eq!(
            err.message.unwrap().to_string(),
            "Latitude must be between -90 and 90"
        );
    }

    #[test]
    fn test_validate_accuracy() {
        assert!(validate_accuracy(0.0).is_ok());
        assert!(validate_accuracy(250.0).is_ok());
        assert!(validate_accuracy(-1.0).is_err());
    }

    #[test]
    fn test_validate_heading() {
        assert!(validate_heading(0.0).is_ok());
        assert!(validate_heading(359.9).is_ok());
        assert!(validate_heading(-0.1).is_err());
        assert!(validate_heading(360.1).is_err());
    }

    #[test]
    fn test_validate_speed_and_battery() {
        assert!(validate_speed(1.4).is_ok());
        assert!(validate_speed(-0.5).is_err());
        assert!(validate_battery_level(100).is_ok());
        assert!(validate_battery_level(101).is_err());
    }

    #[test]
    fn test_validate_polygon() {
        let ring = vec![
            LatLng::new(10.0, 106.0),
            LatLng::new(10.0, 106.001),
            LatLng::new(10.001, 106.001),
        ];
        assert!(validate_polygon(&ring).is_ok());
        assert_eq!(
            validate_polygon(&ring[..2]).unwrap_err().code,
            "polygon_vertices"
        );

        let bad = vec![
            LatLng::new(10.0, 106.0),
            LatLng::new(95.0, 106.001),
            LatLng::new(10.001, 106.001),
        ];
        assert_eq!(validate_polygon(&bad).unwrap_err().code, "latitude_range");
    }
}
