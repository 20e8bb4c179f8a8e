//! Request contract for the raster-analytics service.
//!
//! A request names a collection, optionally narrows it to a date range, maps
//! every scene through a band expression, composites the scenes per pixel and
//! reduces the composite over an area of interest to one scalar.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::model::AreaOfInterest;

/// Half-open date interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn calendar_year(year: i32) -> Option<Self> {
        Some(Self {
            start: NaiveDate::from_ymd_opt(year, 1, 1)?,
            end: NaiveDate::from_ymd_opt(year + 1, 1, 1)?,
        })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }

    pub fn year(&self) -> i32 {
        self.start.year()
    }
}

/// Linear reflectance calibration `raw * scale + offset`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub scale: f64,
    pub offset: f64,
}

impl Calibration {
    pub fn apply(&self, raw: f64) -> f64 {
        raw * self.scale + self.offset
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BandExpression {
    /// `(NIR - RED) / (NIR + RED)` on calibrated reflectance.
    NormalizedDifference {
        nir: String,
        red: String,
        calibration: Calibration,
    },
    /// Hectares of forest (baseline canopy at or above the threshold) whose
    /// loss-year code is one of `loss_year_codes`.
    ForestLossArea {
        canopy_band: String,
        loss_year_band: String,
        canopy_threshold: f64,
        loss_year_codes: Vec<u32>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Composite {
    Median,
    /// Single-image collections: take the first scene as is.
    First,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reducer {
    Mean,
    Sum,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReduceRequest {
    pub collection_id: String,
    pub date_range: Option<DateRange>,
    pub aoi: AreaOfInterest,
    pub expression: BandExpression,
    pub composite: Composite,
    pub reducer: Reducer,
    pub scale_m: f64,
    pub max_pixels: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReduceOutcome {
    Value(f64),
    /// Nothing matched the filters.
    Empty,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Coordinate;

    #[test]
    fn calendar_year_is_half_open() {
        let range = DateRange::calendar_year(2024).unwrap();
        assert!(range.contains(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));
        assert!(range.contains(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()));
        assert!(!range.contains(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()));
        assert_eq!(range.year(), 2024);
    }

    #[test]
    fn request_serializes_with_tagged_expression() {
        let request = ReduceRequest {
            collection_id: "LANDSAT/LC08/C02/T1_L2".to_string(),
            date_range: DateRange::calendar_year(2024),
            aoi: AreaOfInterest::buffer(Coordinate::new(22.6526, 86.3515), 1000.0),
            expression: BandExpression::NormalizedDifference {
                nir: "SR_B5".to_string(),
                red: "SR_B4".to_string(),
                calibration: Calibration {
                    scale: 0.0000275,
                    offset: -0.2,
                },
            },
            composite: Composite::Median,
            reducer: Reducer::Mean,
            scale_m: 30.0,
            max_pixels: 1_000_000_000,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["expression"]["kind"], "normalized_difference");
        assert_eq!(json["aoi"]["type"], "buffer");
        assert_eq!(json["composite"], "median");
        assert_eq!(json["date_range"]["start"], "2024-01-01");
    }
}
