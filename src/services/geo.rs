//! Great-circle distance

/// Mean Earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance in meters between two (lat, lon) points in degrees.
///
/// Callers filter out records without coordinates before calling.
pub fn distance(lat_a: f64, lon_a: f64, lat_b: f64, lon_b: f64) -> f64 {
    let phi_a = lat_a.to_radians();
    let phi_b = lat_b.to_radians();
    let d_phi = (lat_b - lat_a).to_radians();
    let d_lambda = (lon_b - lon_a).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi_a.cos() * phi_b.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_value() {
        let d = distance(45.0, 5.0, 45.001, 5.001);
        assert!((d - 136.19).abs() < 1.0, "got {}", d);
    }

    #[test]
    fn test_zero_distance() {
        assert_eq!(distance(45.0, 5.0, 45.0, 5.0), 0.0);
        assert_eq!(distance(-33.86, 151.2, -33.86, 151.2), 0.0);
    }

    #[test]
    fn test_symmetry() {
        let points = [
            (45.0, 5.0),
            (46.0, 6.0),
            (-90.0, 0.0),
            (0.0, 180.0),
            (51.5, -0.12),
            (-33.86, 151.2),
        ];
        for &(lat_a, lon_a) in &points {
            for &(lat_b, lon_b) in &points {
                assert_eq!(
                    distance(lat_a, lon_a, lat_b, lon_b),
                    distance(lat_b, lon_b, lat_a, lon_a)
                );
            }
        }
    }

    #[test]
    fn test_antipodes_are_half_circumference() {
        let d = distance(0.0, 0.0, 0.0, 180.0);
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_M).abs() < 1.0);
    }

    #[test]
    fn test_one_degree_of_latitude() {
        // ~111.19 km per degree along a meridian
        let d = distance(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111_195.0).abs() < 10.0);
    }
}
