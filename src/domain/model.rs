use serde::{Deserialize, Serialize};

/// WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// A village name qualified with the country it is searched in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceQuery {
    name: String,
    country: String,
}

impl PlaceQuery {
    pub fn new(name: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            country: country.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Text sent to the geocoding service, e.g. `Jaduguda, India`.
    pub fn text(&self) -> String {
        if self.country.is_empty() {
            self.name.clone()
        } else {
            format!("{}, {}", self.name, self.country)
        }
    }
}

/// Spatial filter for remote raster queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AreaOfInterest {
    Buffer { center: Coordinate, radius_m: f64 },
    Polygon { vertices: Vec<Coordinate> },
}

impl AreaOfInterest {
    pub fn buffer(center: Coordinate, radius_m: f64) -> Self {
        Self::Buffer { center, radius_m }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NdviLoss {
    Observed(f64),
    Synthesized(f64),
}

impl NdviLoss {
    pub fn value(&self) -> f64 {
        match self {
            Self::Observed(v) | Self::Synthesized(v) => *v,
        }
    }

    pub fn is_synthesized(&self) -> bool {
        matches!(self, Self::Synthesized(_))
    }

    pub fn source_label(&self) -> &'static str {
        match self {
            Self::Observed(_) => "observed",
            Self::Synthesized(_) => "synthesized",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VillageFeatureRecord {
    pub name: String,
    pub coordinate: Option<Coordinate>,
    pub distance_km: Option<f64>,
    pub ndvi_loss: Option<NdviLoss>,
}

impl VillageFeatureRecord {
    /// A village whose lookup failed keeps its name; every derived field stays empty.
    pub fn unresolved(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            coordinate: None,
            distance_km: None,
            ndvi_loss: None,
        }
    }

    pub fn resolved(name: impl Into<String>, coordinate: Coordinate, distance_km: f64) -> Self {
        Self {
            name: name.into(),
            coordinate: Some(coordinate),
            distance_km: Some(distance_km),
            ndvi_loss: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YearlyIndexSample {
    pub year: i32,
    pub mean_index: f64,
}

/// Deforested area for one year; `None` when the estimate could not be computed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LossRecord {
    pub year: i32,
    pub area_hectares: Option<f64>,
}

/// Real ndvi_loss values accepted so far in this run, in acceptance order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FallbackPool {
    values: Vec<f64>,
}

impl FallbackPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_observed(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// Appends observed values only; synthesized ones never seed later fallbacks.
    pub fn accept(&mut self, loss: NdviLoss) {
        if let NdviLoss::Observed(v) = loss {
            self.values.push(v);
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Result of one remote computation.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation<T> {
    Found(T),
    /// No source imagery for the requested period and area.
    EmptyCollection,
    ComputationFailure(String),
}

impl<T> Observation<T> {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Found(_) => "found",
            Self::EmptyCollection => "empty collection",
            Self::ComputationFailure(_) => "computation failure",
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Observation<U> {
        match self {
            Self::Found(v) => Observation::Found(f(v)),
            Self::EmptyCollection => Observation::EmptyCollection,
            Self::ComputationFailure(msg) => Observation::ComputationFailure(msg),
        }
    }

    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(v) => Some(v),
            _ => None,
        }
    }
}

impl<T> std::fmt::Display for Observation<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ComputationFailure(msg) => write!(f, "{}: {}", self.kind(), msg),
            _ => f.write_str(self.kind()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn place_query_appends_country() {
        let query = PlaceQuery::new("Jaduguda", "India");
        assert_eq!(query.text(), "Jaduguda, India");
        assert_eq!(query.name(), "Jaduguda");
        assert_eq!(PlaceQuery::new("Jaduguda", "").text(), "Jaduguda");
    }

    #[test]
    fn pool_ignores_synthesized_values() {
        let mut pool = FallbackPool::new();
        pool.accept(NdviLoss::Observed(0.0123));
        pool.accept(NdviLoss::Synthesized(0.5));
        pool.accept(NdviLoss::Observed(-0.02));
        assert_eq!(pool.values(), &[0.0123, -0.02]);
    }

    #[test]
    fn unresolved_record_keeps_name() {
        let record = VillageFeatureRecord::unresolved("NotARealPlace_xyz");
        assert_eq!(record.name, "NotARealPlace_xyz");
        assert!(record.coordinate.is_none());
        assert!(record.distance_km.is_none());
        assert!(record.ndvi_loss.is_none());
    }

    #[test]
    fn observation_display_names_kind() {
        let failed: Observation<f64> = Observation::ComputationFailure("503".to_string());
        assert_eq!(failed.to_string(), "computation failure: 503");
        assert_eq!(Observation::<f64>::EmptyCollection.to_string(), "empty collection");
        assert_eq!(Observation::Found(2.0).map(|v| v * 2.0).found(), Some(4.0));
    }

    #[test]
    fn coordinate_validity() {
        assert!(Coordinate::new(22.6526, 86.3515).is_valid());
        assert!(!Coordinate::new(f64::NAN, 86.0).is_valid());
        assert!(!Coordinate::new(95.0, 86.0).is_valid());
    }
}
