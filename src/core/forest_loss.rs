use std::ops::RangeInclusive;
use std::sync::Arc;

use crate::core::retry::RetryPolicy;
use crate::domain::model::{AreaOfInterest, LossRecord, Observation};
use crate::domain::ports::{EventLog, RasterAnalytics};
use crate::domain::raster::{BandExpression, Composite, ReduceRequest, Reducer};
use crate::utils::error::{EnrichError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct ForestLossSettings {
    pub dataset_id: String,
    pub canopy_band: String,
    pub loss_year_band: String,
    /// Minimum baseline canopy cover, in percent, for a pixel to count as forest.
    pub canopy_threshold: f64,
    /// Loss-year codes count years after this one (code 10 is 2010 when the base is 2000).
    pub loss_year_base: i32,
    pub scale_m: f64,
    pub max_pixels: u64,
}

impl Default for ForestLossSettings {
    fn default() -> Self {
        Self {
            dataset_id: "UMD/hansen/global_forest_change_2024_v1_12".to_string(),
            canopy_band: "treecover2000".to_string(),
            loss_year_band: "lossyear".to_string(),
            canopy_threshold: 30.0,
            loss_year_base: 2000,
            scale_m: 30.0,
            max_pixels: 1_000_000_000,
        }
    }
}

/// Hectares of baseline forest lost per year. There is no fallback here:
/// a year without data counts as zero loss.
pub struct ForestLossEstimator {
    raster: Arc<dyn RasterAnalytics>,
    settings: ForestLossSettings,
    retry: RetryPolicy,
}

impl ForestLossEstimator {
    pub fn new(raster: Arc<dyn RasterAnalytics>, settings: ForestLossSettings, retry: RetryPolicy) -> Self {
        Self {
            raster,
            settings,
            retry,
        }
    }

    pub fn loss_year_code(&self, year: i32) -> Result<u32> {
        let code = year - self.settings.loss_year_base;
        if code <= 0 || code > u8::MAX as i32 {
            return Err(EnrichError::ValidationError {
                message: format!(
                    "year {} has no loss-year code relative to {}",
                    year, self.settings.loss_year_base
                ),
            });
        }
        Ok(code as u32)
    }

    /// Sum of loss area over `aoi` for pixels whose loss year is any of `years`.
    pub fn loss_request(&self, years: &[i32], aoi: &AreaOfInterest) -> Result<ReduceRequest> {
        let loss_year_codes = years
            .iter()
            .map(|&year| self.loss_year_code(year))
            .collect::<Result<Vec<_>>>()?;

        Ok(ReduceRequest {
            collection_id: self.settings.dataset_id.clone(),
            date_range: None,
            aoi: aoi.clone(),
            expression: BandExpression::ForestLossArea {
                canopy_band: self.settings.canopy_band.clone(),
                loss_year_band: self.settings.loss_year_band.clone(),
                canopy_threshold: self.settings.canopy_threshold,
                loss_year_codes,
            },
            composite: Composite::First,
            reducer: Reducer::Sum,
            scale_m: self.settings.scale_m,
            max_pixels: self.settings.max_pixels,
        })
    }

    async fn reduce_hectares(&self, request: ReduceRequest) -> Result<f64> {
        match self.retry.reduce(self.raster.as_ref(), &request).await {
            Observation::Found(ha) if ha.is_finite() && ha >= 0.0 => Ok(ha),
            Observation::Found(ha) => Err(EnrichError::remote(format!(
                "loss area {} is not a valid hectare count",
                ha
            ))),
            Observation::EmptyCollection => Ok(0.0),
            Observation::ComputationFailure(message) => Err(EnrichError::RemoteComputation { message }),
        }
    }

    pub async fn annual_loss(&self, year: i32, aoi: &AreaOfInterest) -> Result<f64> {
        let request = self.loss_request(&[year], aoi)?;
        self.reduce_hectares(request).await
    }

    /// Loss over several years in a single reduction.
    pub async fn cumulative_loss(&self, years: &[i32], aoi: &AreaOfInterest) -> Result<f64> {
        let request = self.loss_request(years, aoi)?;
        self.reduce_hectares(request).await
    }

    /// One record per year; a year whose estimate fails is kept with no area.
    pub async fn series(
        &self,
        years: RangeInclusive<i32>,
        aoi: &AreaOfInterest,
        log: &dyn EventLog,
    ) -> Vec<LossRecord> {
        let mut records = Vec::new();
        for year in years {
            let area_hectares = match self.annual_loss(year, aoi).await {
                Ok(ha) => {
                    tracing::debug!("Forest loss {}: {:.4} ha", year, ha);
                    Some(ha)
                }
                Err(e) => {
                    log.warn(&format!("LOSS UNAVAILABLE: {} ({})", year, e));
                    None
                }
            };
            records.push(LossRecord {
                year,
                area_hectares,
            });
        }
        records
    }
}
