use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::retry::RetryPolicy;
use crate::domain::model::{AreaOfInterest, Observation, YearlyIndexSample};
use crate::domain::ports::RasterAnalytics;
use crate::domain::raster::{BandExpression, Calibration, Composite, DateRange, ReduceRequest, Reducer};

/// Collection and band names for one sensor generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorBands {
    pub collection_id: String,
    pub nir: String,
    pub red: String,
}

impl SensorBands {
    pub fn landsat5() -> Self {
        Self {
            collection_id: "LANDSAT/LT05/C02/T1_L2".to_string(),
            nir: "SR_B4".to_string(),
            red: "SR_B3".to_string(),
        }
    }

    pub fn landsat8() -> Self {
        Self {
            collection_id: "LANDSAT/LC08/C02/T1_L2".to_string(),
            nir: "SR_B5".to_string(),
            red: "SR_B4".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VegetationSettings {
    /// First year served by `post_transition`.
    pub sensor_transition_year: i32,
    pub pre_transition: SensorBands,
    pub post_transition: SensorBands,
    pub calibration: Calibration,
    pub scale_m: f64,
    pub max_pixels: u64,
}

impl Default for VegetationSettings {
    fn default() -> Self {
        Self {
            sensor_transition_year: 2013,
            pre_transition: SensorBands::landsat5(),
            post_transition: SensorBands::landsat8(),
            calibration: Calibration {
                scale: 0.0000275,
                offset: -0.2,
            },
            scale_m: 30.0,
            max_pixels: 1_000_000_000,
        }
    }
}

pub struct VegetationIndexEngine {
    raster: Arc<dyn RasterAnalytics>,
    settings: VegetationSettings,
    retry: RetryPolicy,
}

impl VegetationIndexEngine {
    pub fn new(raster: Arc<dyn RasterAnalytics>, settings: VegetationSettings, retry: RetryPolicy) -> Self {
        Self {
            raster,
            settings,
            retry,
        }
    }

    pub fn sensor_for(&self, year: i32) -> &SensorBands {
        if year >= self.settings.sensor_transition_year {
            &self.settings.post_transition
        } else {
            &self.settings.pre_transition
        }
    }

    /// Median composite of calibrated NDVI over the calendar year, mean-reduced over `aoi`.
    pub fn index_request(&self, year: i32, aoi: &AreaOfInterest) -> Option<ReduceRequest> {
        let sensor = self.sensor_for(year);
        Some(ReduceRequest {
            collection_id: sensor.collection_id.clone(),
            date_range: Some(DateRange::calendar_year(year)?),
            aoi: aoi.clone(),
            expression: BandExpression::NormalizedDifference {
                nir: sensor.nir.clone(),
                red: sensor.red.clone(),
                calibration: self.settings.calibration,
            },
            composite: Composite::Median,
            reducer: Reducer::Mean,
            scale_m: self.settings.scale_m,
            max_pixels: self.settings.max_pixels,
        })
    }

    pub async fn annual_index(&self, year: i32, aoi: &AreaOfInterest) -> Observation<YearlyIndexSample> {
        let Some(request) = self.index_request(year, aoi) else {
            return Observation::ComputationFailure(format!("year {} is out of range", year));
        };

        match self.retry.reduce(self.raster.as_ref(), &request).await {
            Observation::Found(v) if v.is_finite() && (-1.0..=1.0).contains(&v) => {
                tracing::debug!("NDVI {} = {:.4} from {}", year, v, request.collection_id);
                Observation::Found(YearlyIndexSample {
                    year,
                    mean_index: v,
                })
            }
            Observation::Found(v) => {
                Observation::ComputationFailure(format!("NDVI {} for {} is outside [-1, 1]", v, year))
            }
            Observation::EmptyCollection => {
                tracing::debug!("No scenes in {} for {}", request.collection_id, year);
                Observation::EmptyCollection
            }
            Observation::ComputationFailure(msg) => Observation::ComputationFailure(msg),
        }
    }

    /// `annual_index(year_b) - annual_index(year_a)`. Stops at the first year without an index.
    pub async fn change(&self, aoi: &AreaOfInterest, year_a: i32, year_b: i32) -> Result<f64, MissingYear> {
        let earlier = self.required_index(year_a, aoi).await?;
        let later = self.required_index(year_b, aoi).await?;
        Ok(later.mean_index - earlier.mean_index)
    }

    async fn required_index(&self, year: i32, aoi: &AreaOfInterest) -> Result<YearlyIndexSample, MissingYear> {
        match self.annual_index(year, aoi).await {
            Observation::Found(sample) => Ok(sample),
            observation => Err(MissingYear { year, observation }),
        }
    }
}

/// The year that kept an index change from being computed, and what its reduction returned.
#[derive(Debug, Clone, PartialEq)]
pub struct MissingYear {
    pub year: i32,
    pub observation: Observation<YearlyIndexSample>,
}

impl std::fmt::Display for MissingYear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "year {}: {}", self.year, self.observation)
    }
}
