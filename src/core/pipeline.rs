use std::ops::RangeInclusive;
use std::sync::Arc;

use crate::core::fallback::FallbackSynthesizer;
use crate::core::forest_loss::ForestLossEstimator;
use crate::core::geo;
use crate::core::geocode::GeocodeResolver;
use crate::core::vegetation::VegetationIndexEngine;
use crate::domain::model::{
    AreaOfInterest, Coordinate, FallbackPool, LossRecord, NdviLoss, VillageFeatureRecord,
};
use crate::domain::ports::EventLog;
use crate::utils::error::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    /// Point every village distance is measured from.
    pub reference: Coordinate,
    pub baseline_year: i32,
    pub target_year: i32,
    pub buffer_radius_m: f64,
    /// Give villages without coordinates a synthesized ndvi_loss instead of none.
    pub synthesize_without_coordinates: bool,
    pub loss_years: RangeInclusive<i32>,
    pub loss_aoi: AreaOfInterest,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            reference: Coordinate::new(22.6526, 86.3515),
            baseline_year: 2010,
            target_year: 2024,
            buffer_radius_m: 1000.0,
            synthesize_without_coordinates: false,
            loss_years: 2010..=2023,
            loss_aoi: AreaOfInterest::buffer(Coordinate::new(22.6560, 86.3529), 1000.0),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub villages: usize,
    pub found: usize,
    pub not_found: usize,
    pub observed: usize,
    pub synthesized: usize,
}

impl RunSummary {
    pub fn from_records(records: &[VillageFeatureRecord]) -> Self {
        let mut summary = Self {
            villages: records.len(),
            ..Self::default()
        };
        for record in records {
            if record.coordinate.is_some() {
                summary.found += 1;
            } else {
                summary.not_found += 1;
            }
            match record.ndvi_loss {
                Some(NdviLoss::Observed(_)) => summary.observed += 1,
                Some(NdviLoss::Synthesized(_)) => summary.synthesized += 1,
                None => {}
            }
        }
        summary
    }
}

/// Drives geocoding, distance, vegetation change and forest loss for one run.
///
/// Villages are processed strictly in input order. A failure while deriving
/// one village's features ends up as an empty or synthesized field on that
/// village only.
pub struct EnrichmentPipeline {
    resolver: GeocodeResolver,
    vegetation: VegetationIndexEngine,
    forest: ForestLossEstimator,
    fallback: FallbackSynthesizer,
    log: Arc<dyn EventLog>,
    settings: PipelineSettings,
}

impl EnrichmentPipeline {
    pub fn new(
        resolver: GeocodeResolver,
        vegetation: VegetationIndexEngine,
        forest: ForestLossEstimator,
        fallback: FallbackSynthesizer,
        log: Arc<dyn EventLog>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            resolver,
            vegetation,
            forest,
            fallback,
            log,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub async fn geocode(&self, name: &str) -> VillageFeatureRecord {
        match self.resolver.resolve(name).await {
            Some(coordinate) => {
                let distance_km = geo::distance(self.settings.reference, coordinate);
                VillageFeatureRecord::resolved(name, coordinate, distance_km)
            }
            None => VillageFeatureRecord::unresolved(name),
        }
    }

    pub async fn geocode_all(&self, names: &[String]) -> Vec<VillageFeatureRecord> {
        let mut records = Vec::with_capacity(names.len());
        for (done, name) in names.iter().enumerate() {
            tracing::info!("🔎 [{}] {}", progress(done + 1, names.len()), name);
            records.push(self.geocode(name).await);
        }
        records
    }

    fn synthesize(&mut self, name: &str, pool: &FallbackPool, reason: &str) -> NdviLoss {
        let loss = self.fallback.synthesize(pool);
        self.log.warn(&format!(
            "FALLBACK: {} ndvi_loss={:.4} ({}, pool of {})",
            name,
            loss.value(),
            reason,
            pool.len()
        ));
        loss
    }

    async fn vegetation_loss(&mut self, record: &VillageFeatureRecord, pool: &mut FallbackPool) -> Option<NdviLoss> {
        let Some(coordinate) = record.coordinate else {
            if self.settings.synthesize_without_coordinates {
                return Some(self.synthesize(&record.name, pool, "no coordinates"));
            }
            return None;
        };

        let aoi = AreaOfInterest::buffer(coordinate, self.settings.buffer_radius_m);
        let (baseline, target) = (self.settings.baseline_year, self.settings.target_year);
        match self.vegetation.change(&aoi, baseline, target).await {
            Ok(delta) => {
                self.log
                    .info(&format!("NDVI: {} change {}-{} = {:.4}", record.name, baseline, target, delta));
                let loss = NdviLoss::Observed(delta);
                pool.accept(loss);
                Some(loss)
            }
            Err(missing) => Some(self.synthesize(&record.name, pool, &missing.to_string())),
        }
    }

    /// Adds ndvi_loss to already geocoded records, filling in distances the table did not carry.
    /// The fallback pool lives for this call only.
    pub async fn enrich_vegetation(&mut self, mut records: Vec<VillageFeatureRecord>) -> Vec<VillageFeatureRecord> {
        let mut pool = FallbackPool::new();
        let total = records.len();
        for (done, record) in records.iter_mut().enumerate() {
            tracing::info!("🌿 [{}] {}", progress(done + 1, total), record.name);
            if let (Some(coordinate), None) = (record.coordinate, record.distance_km) {
                record.distance_km = Some(geo::distance(self.settings.reference, coordinate));
            }
            record.ndvi_loss = self.vegetation_loss(record, &mut pool).await;
        }
        log_summary(&records);
        records
    }

    /// Geocodes each name and derives its features before moving to the next one.
    pub async fn run(&mut self, names: &[String]) -> Vec<VillageFeatureRecord> {
        let mut pool = FallbackPool::new();
        let mut records = Vec::with_capacity(names.len());
        for (done, name) in names.iter().enumerate() {
            tracing::info!("🌿 [{}] {}", progress(done + 1, names.len()), name);
            let mut record = self.geocode(name).await;
            record.ndvi_loss = self.vegetation_loss(&record, &mut pool).await;
            records.push(record);
        }
        log_summary(&records);
        records
    }

    pub async fn forest_loss_series(&self) -> Vec<LossRecord> {
        self.forest
            .series(
                self.settings.loss_years.clone(),
                &self.settings.loss_aoi,
                self.log.as_ref(),
            )
            .await
    }

    /// Loss over the whole configured year range in one reduction.
    pub async fn cumulative_forest_loss(&self) -> Result<f64> {
        let years: Vec<i32> = self.settings.loss_years.clone().collect();
        self.forest
            .cumulative_loss(&years, &self.settings.loss_aoi)
            .await
    }
}

/// `done/total (pct%)` for per-village progress lines.
fn progress(done: usize, total: usize) -> String {
    let percent = if total == 0 { 100 } else { done * 100 / total };
    format!("{}/{} ({}%)", done, total, percent)
}

fn log_summary(records: &[VillageFeatureRecord]) {
    let summary = RunSummary::from_records(records);
    tracing::info!(
        "📊 {} villages: {} found, {} not found, ndvi {} observed / {} synthesized",
        summary.villages,
        summary.found,
        summary.not_found,
        summary.observed,
        summary.synthesized
    );
}
