pub mod stages;

use std::sync::Arc;

use crate::adapters::nominatim::NominatimGeocoder;
use crate::adapters::raster_http::HttpRasterAnalytics;
use crate::adapters::raster_memory::SceneArchive;
use crate::config::toml_config::{EnrichConfig, RasterBackend};
use crate::core::fallback::FallbackSynthesizer;
use crate::core::forest_loss::ForestLossEstimator;
use crate::core::geocode::GeocodeResolver;
use crate::core::pipeline::EnrichmentPipeline;
use crate::core::vegetation::VegetationIndexEngine;
use crate::domain::ports::{EventLog, Geocoder, RasterAnalytics};
use crate::utils::error::{EnrichError, Result};

pub fn build_raster(config: &EnrichConfig) -> Result<Arc<dyn RasterAnalytics>> {
    match config.raster.backend {
        RasterBackend::Http => {
            tracing::debug!("Raster backend: {}", config.raster.endpoint);
            Ok(Arc::new(HttpRasterAnalytics::new(
                config.raster.endpoint.as_str(),
                config.raster_timeout(),
            )?))
        }
        RasterBackend::File => {
            let path = config
                .raster
                .archive_path
                .as_deref()
                .ok_or_else(|| EnrichError::MissingConfig {
                    field: "raster.archive_path".to_string(),
                })?;
            tracing::debug!("Raster backend: scene archive {}", path);
            Ok(Arc::new(SceneArchive::from_json_file(path)?))
        }
    }
}

/// Wires a pipeline from explicit adapters.
pub fn assemble_pipeline(
    config: &EnrichConfig,
    geocoder: Box<dyn Geocoder>,
    raster: Arc<dyn RasterAnalytics>,
    log: Arc<dyn EventLog>,
) -> EnrichmentPipeline {
    let retry = config.retry_policy();
    let fallback = match config.raster.seed {
        Some(seed) => FallbackSynthesizer::seeded(seed),
        None => FallbackSynthesizer::from_entropy(),
    };

    EnrichmentPipeline::new(
        GeocodeResolver::new(
            geocoder,
            config.geocoder.country.as_str(),
            config.geocode_delay(),
            log.clone(),
        ),
        VegetationIndexEngine::new(raster.clone(), config.vegetation_settings(), retry),
        ForestLossEstimator::new(raster, config.forest_loss_settings(), retry),
        fallback,
        log,
        config.pipeline_settings(),
    )
}

/// Wires a pipeline from configuration: Nominatim geocoding plus the configured raster backend.
pub fn build_pipeline(config: &EnrichConfig, log: Arc<dyn EventLog>) -> Result<EnrichmentPipeline> {
    let geocoder = NominatimGeocoder::new(
        config.geocoder.endpoint.as_str(),
        &config.geocoder.user_agent,
        config.geocode_timeout(),
    )?;
    let raster = build_raster(config)?;
    Ok(assemble_pipeline(config, Box::new(geocoder), raster, log))
}

/// Geocoding only: the raster section is never read, so an unset endpoint or archive is fine.
pub fn build_geocode_pipeline(config: &EnrichConfig, log: Arc<dyn EventLog>) -> Result<EnrichmentPipeline> {
    let geocoder = NominatimGeocoder::new(
        config.geocoder.endpoint.as_str(),
        &config.geocoder.user_agent,
        config.geocode_timeout(),
    )?;
    Ok(assemble_pipeline(config, Box::new(geocoder), Arc::new(SceneArchive::new()), log))
}
