use crate::domain::model::{AreaOfInterest, Coordinate};

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance in kilometres (haversine).
pub fn distance(a: Coordinate, b: Coordinate) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = lat_b - lat_a;
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    // Rounding can push h a hair past 1 for antipodal points.
    2.0 * h.clamp(0.0, 1.0).sqrt().asin() * EARTH_RADIUS_KM
}

impl AreaOfInterest {
    pub fn contains(&self, point: Coordinate) -> bool {
        match self {
            Self::Buffer { center, radius_m } => distance(*center, point) * 1000.0 <= *radius_m,
            Self::Polygon { vertices } => polygon_contains(vertices, point),
        }
    }
}

// Even-odd ray casting in the lon/lat plane; fine for village-scale polygons.
fn polygon_contains(vertices: &[Coordinate], point: Coordinate) -> bool {
    if vertices.len() < 3 {
        return false;
    }

    let (x, y) = (point.longitude, point.latitude);
    let mut inside = false;
    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        let (xi, yi) = (vertices[i].longitude, vertices[i].latitude);
        let (xj, yj) = (vertices[j].longitude, vertices[j].latitude);
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_to_self_is_zero() {
        let a = Coordinate::new(22.6526, 86.3515);
        assert_eq!(distance(a, a), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = Coordinate::new(22.6526, 86.3515);
        let b = Coordinate::new(23.3441, 85.3096);
        assert!((distance(a, b) - distance(b, a)).abs() < 1e-9);
    }

    #[test]
    fn jaduguda_reference_distance() {
        let d = distance(
            Coordinate::new(22.6526, 86.3515),
            Coordinate::new(22.6560, 86.3529),
        );
        assert!((d - 0.40).abs() <= 0.01, "got {d}");
    }

    #[test]
    fn antipodal_points_are_half_circumference() {
        let d = distance(Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 180.0));
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-6);
    }

    #[test]
    fn buffer_contains_points_within_radius() {
        let aoi = AreaOfInterest::buffer(Coordinate::new(22.6526, 86.3515), 1000.0);
        assert!(aoi.contains(Coordinate::new(22.6560, 86.3529)));
        assert!(!aoi.contains(Coordinate::new(22.6700, 86.3515)));
    }

    #[test]
    fn polygon_containment() {
        let aoi = AreaOfInterest::Polygon {
            vertices: vec![
                Coordinate::new(22.0, 86.0),
                Coordinate::new(22.0, 87.0),
                Coordinate::new(23.0, 87.0),
                Coordinate::new(23.0, 86.0),
            ],
        };
        assert!(aoi.contains(Coordinate::new(22.5, 86.5)));
        assert!(!aoi.contains(Coordinate::new(23.5, 86.5)));

        let degenerate = AreaOfInterest::Polygon {
            vertices: vec![Coordinate::new(22.0, 86.0), Coordinate::new(23.0, 87.0)],
        };
        assert!(!degenerate.contains(Coordinate::new(22.5, 86.5)));
    }
}
