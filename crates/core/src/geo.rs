//! Great-circle distance helpers.

/// Mean earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance between two points, in kilometres.
#[must_use]
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().min(1.0).asin()
}

/// Human readable distance: whole metres below one kilometre, otherwise one
/// decimal. The unit switches on the rounded metre value, so `0.9996` reads
/// `1.0km` rather than `1000m`.
#[must_use]
pub fn format_distance(distance_km: f64) -> String {
    let metres = (distance_km * 1000.0).round();
    if metres < 1000.0 {
        format!("{metres:.0}m")
    } else {
        format!("{distance_km:.1}km")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_zero() {
        assert!(haversine_km(52.52, 13.405, 52.52, 13.405).abs() < 1e-9);
    }

    #[test]
    fn test_haversine_one_degree_latitude() {
        let d = haversine_km(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111.194_93).abs() < 0.001, "got {d}");
    }

    #[test]
    fn test_haversine_known_pair() {
        // Berlin to Paris, roughly 878 km
        let d = haversine_km(52.52, 13.405, 48.8566, 2.3522);
        assert!((d - 878.0).abs() < 5.0, "got {d}");
    }

    #[test]
    fn test_format_distance() {
        assert_eq!(format_distance(0.85), "850m");
        assert_eq!(format_distance(2.345), "2.3km");
        assert_eq!(format_distance(1.0), "1.0km");
    }

    #[test]
    fn test_format_distance_rounds_before_switching_unit() {
        assert_eq!(format_distance(0.9996), "1.0km");
        assert_eq!(format_distance(0.9994), "999m");
        assert_eq!(format_distance(0.0), "0m");
    }
}
