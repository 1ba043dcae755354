//! Minimum bounding rectangles for spatial queries.
//!
//! Polygon edges are great-circle arcs, so an edge between two points at the
//! same latitude bulges toward the nearer pole and the rectangle has to grow
//! to cover it. Longitudes are tracked by unwrapping the ring so that shapes
//! crossing the antimeridian come out as `west > east`.

use crate::domain::model::Spatial;
use crate::utils::error::{Result, SearchError};
use serde::Serialize;
use std::f64::consts::{FRAC_PI_2, PI, TAU};

const EARTH_RADIUS_METERS: f64 = 6_371_000.0;
const EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mbr {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
    #[serde(skip)]
    labels: [String; 4],
}

impl Mbr {
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
            labels: [west, south, east, north].map(|edge| edge.to_string()),
        }
    }

    /// Edges as text in `west, south, east, north` order. A rectangle read
    /// from a bounding box keeps the caller's own digits.
    pub fn edge_labels(&self) -> &[String; 4] {
        &self.labels
    }

    /// `west,south,east,north`, the form CMR, CWIC and OUS accept.
    pub fn to_bounding_box(&self) -> String {
        self.labels.join(",")
    }

    pub fn crosses_antimeridian(&self) -> bool {
        self.west > self.east
    }
}

/// Bounding rectangle of the first spatial constraint present, checked in the
/// order bounding box, polygon, point, circle.
pub fn mbr(spatial: &Spatial) -> Result<Option<Mbr>> {
    if let Some(bounding_box) = spatial.bounding_box.first() {
        return parse_bounding_box(bounding_box).map(Some);
    }
    if let Some(polygon) = spatial.polygon.first() {
        let points = parse_points("polygon", polygon)?;
        return polygon_mbr(&points).map(Some);
    }
    if let Some(point) = spatial.point.first() {
        let points = parse_points("point", point)?;
        if points.len() != 1 {
            return Err(spatial_error(format!(
                "point must be a single lon,lat pair: {}",
                point
            )));
        }
        let (lon, lat) = points[0];
        return Ok(Some(Mbr::new(lon, lat, lon, lat)));
    }
    if let Some(circle) = spatial.circle.first() {
        return circle_mbr(circle).map(Some);
    }
    Ok(None)
}

fn spatial_error(message: String) -> SearchError {
    SearchError::SpatialError { message }
}

fn parse_numbers(field: &str, text: &str) -> Result<Vec<f64>> {
    text.split(',')
        .map(|part| {
            part.trim().parse::<f64>().map_err(|_| {
                spatial_error(format!("{} contains a non-numeric value: '{}'", field, part))
            })
        })
        .collect()
}

fn check_coordinate(field: &str, lon: f64, lat: f64) -> Result<()> {
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(spatial_error(format!(
            "{} coordinate out of range: {},{}",
            field, lon, lat
        )));
    }
    Ok(())
}

/// Parses `lon,lat,lon,lat,...` into `(lon, lat)` pairs.
fn parse_points(field: &str, text: &str) -> Result<Vec<(f64, f64)>> {
    let numbers = parse_numbers(field, text)?;
    if numbers.is_empty() || numbers.len() % 2 != 0 {
        return Err(spatial_error(format!(
            "{} must contain lon,lat pairs: {}",
            field, text
        )));
    }

    let points: Vec<(f64, f64)> = numbers.chunks(2).map(|pair| (pair[0], pair[1])).collect();
    for &(lon, lat) in &points {
        check_coordinate(field, lon, lat)?;
    }
    Ok(points)
}

fn parse_bounding_box(text: &str) -> Result<Mbr> {
    let numbers = parse_numbers("bounding_box", text)?;
    let [west, south, east, north] = numbers[..] else {
        return Err(spatial_error(format!(
            "bounding_box must have four values: {}",
            text
        )));
    };
    check_coordinate("bounding_box", west, south)?;
    check_coordinate("bounding_box", east, north)?;

    let mut rectangle = Mbr::new(west, south, east, north);
    for (label, part) in rectangle.labels.iter_mut().zip(text.split(',')) {
        *label = part.trim().to_string();
    }
    Ok(rectangle)
}

fn circle_mbr(text: &str) -> Result<Mbr> {
    let numbers = parse_numbers("circle", text)?;
    let [lon, lat, radius] = numbers[..] else {
        return Err(spatial_error(format!(
            "circle must be lon,lat,radius: {}",
            text
        )));
    };
    check_coordinate("circle", lon, lat)?;
    if radius <= 0.0 {
        return Err(spatial_error(format!("circle radius must be positive: {}", text)));
    }

    let distance = radius / EARTH_RADIUS_METERS;
    let south = (lat - distance.to_degrees()).max(-90.0);
    let north = (lat + distance.to_degrees()).min(90.0);

    let lat_rad = lat.to_radians();
    if south <= -90.0 || north >= 90.0 || distance.sin() >= lat_rad.cos() {
        return Ok(Mbr::new(-180.0, south, 180.0, north));
    }

    let delta_lon = (distance.sin() / lat_rad.cos()).asin().to_degrees();
    Ok(normalize_longitudes(lon - delta_lon, lon + delta_lon, south, north))
}

fn normalize_lon_delta(mut delta: f64) -> f64 {
    while delta > 180.0 {
        delta -= 360.0;
    }
    while delta <= -180.0 {
        delta += 360.0;
    }
    delta
}

/// Shifts an unwrapped longitude interval back onto [-180, 180].
fn normalize_longitudes(west: f64, east: f64, south: f64, north: f64) -> Mbr {
    if east - west >= 360.0 {
        return Mbr::new(-180.0, south, 180.0, north);
    }

    let shift = ((west + 180.0) / 360.0).floor() * 360.0;
    let west = west - shift;
    let mut east = east - shift;
    if east > 180.0 {
        east -= 360.0;
    }

    Mbr::new(west, south, east, north)
}

/// A point on the unit sphere. `phi` is the latitude and `theta` the
/// longitude, both in radians.
#[derive(Debug, Clone, Copy)]
struct Coordinate {
    phi: f64,
    theta: f64,
    x: f64,
    y: f64,
    z: f64,
}

impl Coordinate {
    /// Lifts `phi` a full turn above `PI` and folds it back onto
    /// [-PI/2, PI/2], moving `theta` half a turn on every fold. Holds for
    /// `phi` in [-PI, PI/2], which covers latitudes and the inflection
    /// offsets below.
    fn from_phi_theta(phi: f64, theta: f64) -> Self {
        let (mut phi, mut theta) = (phi, theta);
        while phi >= PI {
            phi -= TAU;
        }
        while phi < PI {
            phi += TAU;
        }
        if phi > FRAC_PI_2 {
            phi = PI - phi;
            theta += PI;
        }
        if phi < -FRAC_PI_2 {
            phi = -PI - phi;
            theta += PI;
        }
        while theta >= PI {
            theta -= TAU;
        }
        while theta < -PI {
            theta += TAU;
        }

        Self {
            phi,
            theta,
            x: phi.cos() * theta.cos(),
            y: phi.cos() * theta.sin(),
            z: phi.sin(),
        }
    }

    fn from_lat_lng(lat: f64, lng: f64) -> Self {
        Self::from_phi_theta(lat.to_radians(), lng.to_radians())
    }

    fn from_xyz(x: f64, y: f64, z: f64) -> Option<Self> {
        let length = (x * x + y * y + z * z).sqrt();
        (length > EPSILON).then(|| Self::from_phi_theta((z / length).asin(), y.atan2(x)))
    }

    fn cross(&self, other: &Coordinate) -> Option<Coordinate> {
        Self::from_xyz(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    fn lat(&self) -> f64 {
        self.phi.to_degrees()
    }

    fn lng(&self) -> f64 {
        self.theta.to_degrees()
    }
}

/// Great-circle arc, held west to east along the shorter way round.
struct Arc {
    west: Coordinate,
    east: Coordinate,
}

impl Arc {
    fn new(start: Coordinate, end: Coordinate) -> Self {
        if normalize_lon_delta(end.lng() - start.lng()) >= 0.0 {
            Self {
                west: start,
                east: end,
            }
        } else {
            Self {
                west: end,
                east: start,
            }
        }
    }

    fn covers_longitude(&self, lng: f64) -> bool {
        let span = (self.east.lng() - self.west.lng()).rem_euclid(360.0);
        let offset = (lng - self.west.lng()).rem_euclid(360.0);
        offset > 0.0 && offset < span
    }

    /// The northern or southern extreme of the great circle, when it lies
    /// strictly inside the arc.
    fn inflection(&self) -> Option<Coordinate> {
        let normal = self.west.cross(&self.east)?;

        // Both extremes sit a quarter turn away from the normal
        let south = Coordinate::from_lat_lng(normal.lat() - 90.0, normal.lng());
        let north = Coordinate::from_lat_lng(-south.lat(), south.lng() + 180.0);

        [north, south]
            .into_iter()
            .find(|extreme| self.covers_longitude(extreme.lng()))
    }
}

fn polygon_mbr(points: &[(f64, f64)]) -> Result<Mbr> {
    let mut ring: Vec<(f64, f64)> = points.to_vec();
    if ring.first() != ring.last() {
        if let Some(&first) = ring.first() {
            ring.push(first);
        }
    }
    ring.dedup();
    if ring.len() < 3 {
        return Err(spatial_error(
            "polygon must have at least three distinct points".to_string(),
        ));
    }

    let coordinates: Vec<Coordinate> = ring
        .iter()
        .map(|&(lon, lat)| Coordinate::from_lat_lng(lat, lon))
        .collect();

    let first = coordinates[0];
    let mut south = first.lat();
    let mut north = first.lat();
    let mut running_lon = first.lng();
    let mut min_lon = running_lon;
    let mut max_lon = running_lon;
    let mut winding = 0.0;

    for pair in coordinates.windows(2) {
        let (start, end) = (pair[0], pair[1]);

        south = south.min(end.lat());
        north = north.max(end.lat());
        if let Some(extreme) = Arc::new(start, end).inflection() {
            south = south.min(extreme.lat());
            north = north.max(extreme.lat());
        }

        let delta = normalize_lon_delta(end.lng() - start.lng());
        winding += delta;
        running_lon += delta;
        min_lon = min_lon.min(running_lon);
        max_lon = max_lon.max(running_lon);
    }

    // Counter-clockwise around the north pole winds +360, the south pole -360
    if winding > 180.0 {
        return Ok(Mbr::new(-180.0, south, 180.0, 90.0));
    }
    if winding < -180.0 {
        return Ok(Mbr::new(-180.0, -90.0, 180.0, north));
    }

    Ok(normalize_longitudes(min_lon, max_lon, south, north))
}
