//! Geographic utilities: great-circle distance and a local planar projection.
//!
//! Clustering runs in meters. Geographic centroids are projected with an
//! equirectangular projection centred on the run's mean centroid, which is
//! accurate to well under a percent over the few kilometres a cluster spans.

use crate::{GpsPoint, GroupingError, Location, Result};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Square meters per hectare.
pub const M2_PER_HECTARE: f64 = 10_000.0;

/// Great-circle distance between two points in meters.
pub fn haversine_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    let lat1 = p1.latitude.to_radians();
    let lat2 = p2.latitude.to_radians();
    let dlat = (p2.latitude - p1.latitude).to_radians();
    let dlng = (p2.longitude - p1.longitude).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Euclidean distance between two projected points.
#[inline]
pub fn planar_distance(a: [f64; 2], b: [f64; 2]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    (dx * dx + dy * dy).sqrt()
}

/// Meters spanned by one degree of latitude.
pub fn meters_per_degree_lat() -> f64 {
    EARTH_RADIUS_M * std::f64::consts::PI / 180.0
}

/// Convert a distance in meters to degrees of longitude at a given latitude.
pub fn meters_to_degrees(meters: f64, latitude: f64) -> f64 {
    let per_degree = meters_per_degree_lat() * latitude.to_radians().cos();
    if per_degree.abs() < 1e-9 {
        return 0.0;
    }
    meters / per_degree
}

/// Mean of a set of GPS points. Returns (0, 0) for an empty slice.
pub fn compute_center(points: &[GpsPoint]) -> GpsPoint {
    if points.is_empty() {
        return GpsPoint::new(0.0, 0.0);
    }
    let n = points.len() as f64;
    let lat = points.iter().map(|p| p.latitude).sum::<f64>() / n;
    let lng = points.iter().map(|p| p.longitude).sum::<f64>() / n;
    GpsPoint::new(lat, lng)
}

/// Maps locations into the planar meter space used by clustering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Inputs are already planar meters
    Planar,
    /// Equirectangular projection around `origin`
    LocalEquirectangular {
        origin: GpsPoint,
        meters_per_deg_lat: f64,
        meters_per_deg_lng: f64,
    },
}

impl Projection {
    /// Projection centred on a geographic origin.
    pub fn local(origin: GpsPoint) -> Self {
        let meters_per_deg_lat = meters_per_degree_lat();
        Projection::LocalEquirectangular {
            origin,
            meters_per_deg_lat,
            meters_per_deg_lng: meters_per_deg_lat * origin.latitude.to_radians().cos(),
        }
    }

    /// Pick the projection for a run from its valid locations.
    ///
    /// Fails when geographic and projected locations are mixed. An empty
    /// input yields `Planar`.
    pub fn for_locations<'a, I>(locations: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a Location>,
    {
        let mut geographic = Vec::new();
        let mut planar = 0usize;
        for location in locations {
            match location {
                Location::Geographic(p) => geographic.push(*p),
                Location::Projected { .. } => planar += 1,
            }
        }

        match (geographic.is_empty(), planar) {
            (false, 0) => Ok(Projection::local(compute_center(&geographic))),
            (true, _) => Ok(Projection::Planar),
            (false, _) => Err(GroupingError::MixedCoordinateSystems),
        }
    }

    /// Project a location to planar meters.
    pub fn project(&self, location: &Location) -> [f64; 2] {
        match (self, location) {
            (
                Projection::LocalEquirectangular {
                    origin,
                    meters_per_deg_lat,
                    meters_per_deg_lng,
                },
                Location::Geographic(p),
            ) => [
                (p.longitude - origin.longitude) * meters_per_deg_lng,
                (p.latitude - origin.latitude) * meters_per_deg_lat,
            ],
            (_, Location::Projected { x, y }) => [*x, *y],
            // Planar runs never carry geographic points past validation
            (Projection::Planar, Location::Geographic(p)) => [p.longitude, p.latitude],
        }
    }

    /// Map planar meters back into the run's coordinate system.
    pub fn unproject(&self, xy: [f64; 2]) -> Location {
        match self {
            Projection::Planar => Location::Projected { x: xy[0], y: xy[1] },
            Projection::LocalEquirectangular {
                origin,
                meters_per_deg_lat,
                meters_per_deg_lng,
            } => {
                let longitude = if meters_per_deg_lng.abs() < 1e-9 {
                    origin.longitude
                } else {
                    origin.longitude + xy[0] / meters_per_deg_lng
                };
                Location::Geographic(GpsPoint::new(
                    origin.latitude + xy[1] / meters_per_deg_lat,
                    longitude,
                ))
            }
        }
    }
}
