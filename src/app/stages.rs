use std::path::Path;

use async_trait::async_trait;

use crate::adapters::table::{self, VillageColumns};
use crate::config::toml_config::OutputConfig;
use crate::core::pipeline::EnrichmentPipeline;
use crate::core::{Stage, Storage};
use crate::domain::model::{LossRecord, VillageFeatureRecord};
use crate::utils::error::Result;

fn output_path(output: &OutputConfig, file: &str) -> String {
    Path::new(&output.dir).join(file).display().to_string()
}

fn ndvi_columns(output: &OutputConfig) -> VillageColumns {
    VillageColumns::WithNdvi {
        provenance: output.include_provenance,
    }
}

async fn read_names<S: Storage>(storage: &S, path: &str) -> Result<Vec<String>> {
    let data = storage.read_file(path).await?;
    let names = table::parse_village_names(path, &data)?;
    tracing::info!("📥 Read {} village names from {}", names.len(), path);
    Ok(names)
}

/// Names file in, `Village, Latitude, Longitude, Distance_km` table out.
pub struct GeocodeStage<S: Storage> {
    storage: S,
    pipeline: EnrichmentPipeline,
    names_path: String,
    output: OutputConfig,
}

impl<S: Storage> GeocodeStage<S> {
    pub fn new(storage: S, pipeline: EnrichmentPipeline, names_path: impl Into<String>, output: OutputConfig) -> Self {
        Self {
            storage,
            pipeline,
            names_path: names_path.into(),
            output,
        }
    }
}

#[async_trait]
impl<S: Storage> Stage for GeocodeStage<S> {
    type Input = Vec<String>;
    type Output = Vec<VillageFeatureRecord>;

    fn name(&self) -> &str {
        "geocode"
    }

    async fn extract(&mut self) -> Result<Vec<String>> {
        read_names(&self.storage, &self.names_path).await
    }

    async fn transform(&mut self, names: Vec<String>) -> Result<Vec<VillageFeatureRecord>> {
        Ok(self.pipeline.geocode_all(&names).await)
    }

    async fn load(&mut self, records: Vec<VillageFeatureRecord>) -> Result<String> {
        let path = output_path(&self.output, &self.output.geocoded_file);
        let data = table::write_village_table(&records, VillageColumns::Geocoded)?;
        self.storage.write_file(&path, &data).await?;
        Ok(path)
    }
}

/// Geocoded table in, the same table with `NDVI_loss` out.
pub struct VegetationStage<S: Storage> {
    storage: S,
    pipeline: EnrichmentPipeline,
    table_path: String,
    output: OutputConfig,
}

impl<S: Storage> VegetationStage<S> {
    pub fn new(storage: S, pipeline: EnrichmentPipeline, table_path: impl Into<String>, output: OutputConfig) -> Self {
        Self {
            storage,
            pipeline,
            table_path: table_path.into(),
            output,
        }
    }
}

#[async_trait]
impl<S: Storage> Stage for VegetationStage<S> {
    type Input = Vec<VillageFeatureRecord>;
    type Output = Vec<VillageFeatureRecord>;

    fn name(&self) -> &str {
        "vegetation"
    }

    async fn extract(&mut self) -> Result<Vec<VillageFeatureRecord>> {
        let data = self.storage.read_file(&self.table_path).await?;
        let records = table::parse_village_table(&data)?;
        tracing::info!("📥 Read {} villages from {}", records.len(), self.table_path);
        Ok(records)
    }

    async fn transform(&mut self, records: Vec<VillageFeatureRecord>) -> Result<Vec<VillageFeatureRecord>> {
        Ok(self.pipeline.enrich_vegetation(records).await)
    }

    async fn load(&mut self, records: Vec<VillageFeatureRecord>) -> Result<String> {
        let path = output_path(&self.output, &self.output.ndvi_file);
        let data = table::write_village_table(&records, ndvi_columns(&self.output))?;
        self.storage.write_file(&path, &data).await?;
        Ok(path)
    }
}

/// Annual forest-loss series over the configured area.
pub struct ForestLossStage<S: Storage> {
    storage: S,
    pipeline: EnrichmentPipeline,
    output: OutputConfig,
}

impl<S: Storage> ForestLossStage<S> {
    pub fn new(storage: S, pipeline: EnrichmentPipeline, output: OutputConfig) -> Self {
        Self {
            storage,
            pipeline,
            output,
        }
    }
}

async fn loss_series(pipeline: &EnrichmentPipeline) -> Vec<LossRecord> {
    let series = pipeline.forest_loss_series().await;
    let annual_total: f64 = series.iter().filter_map(|r| r.area_hectares).sum();
    match pipeline.cumulative_forest_loss().await {
        Ok(cumulative) => tracing::info!(
            "🌳 Forest loss: {:.2} ha summed per year, {:.2} ha over the whole range",
            annual_total,
            cumulative
        ),
        Err(e) => tracing::warn!("Cumulative forest loss unavailable: {}", e),
    }
    series
}

#[async_trait]
impl<S: Storage> Stage for ForestLossStage<S> {
    type Input = ();
    type Output = Vec<LossRecord>;

    fn name(&self) -> &str {
        "forest-loss"
    }

    async fn extract(&mut self) -> Result<()> {
        Ok(())
    }

    async fn transform(&mut self, _input: ()) -> Result<Vec<LossRecord>> {
        Ok(loss_series(&self.pipeline).await)
    }

    async fn load(&mut self, records: Vec<LossRecord>) -> Result<String> {
        let path = output_path(&self.output, &self.output.forest_loss_file);
        let data = table::write_loss_table(&records)?;
        self.storage.write_file(&path, &data).await?;
        Ok(path)
    }
}

/// Every table in one pass. Villages are geocoded and enriched one at a time.
pub struct FullRunStage<S: Storage> {
    storage: S,
    pipeline: EnrichmentPipeline,
    names_path: String,
    output: OutputConfig,
}

impl<S: Storage> FullRunStage<S> {
    pub fn new(storage: S, pipeline: EnrichmentPipeline, names_path: impl Into<String>, output: OutputConfig) -> Self {
        Self {
            storage,
            pipeline,
            names_path: names_path.into(),
            output,
        }
    }
}

pub struct FullRunOutput {
    pub villages: Vec<VillageFeatureRecord>,
    pub forest_loss: Vec<LossRecord>,
}

#[async_trait]
impl<S: Storage> Stage for FullRunStage<S> {
    type Input = Vec<String>;
    type Output = FullRunOutput;

    fn name(&self) -> &str {
        "run"
    }

    async fn extract(&mut self) -> Result<Vec<String>> {
        read_names(&self.storage, &self.names_path).await
    }

    async fn transform(&mut self, names: Vec<String>) -> Result<FullRunOutput> {
        let villages = self.pipeline.run(&names).await;
        let forest_loss = loss_series(&self.pipeline).await;
        Ok(FullRunOutput { villages, forest_loss })
    }

    async fn load(&mut self, output: FullRunOutput) -> Result<String> {
        let geocoded = table::write_village_table(&output.villages, VillageColumns::Geocoded)?;
        self.storage
            .write_file(&output_path(&self.output, &self.output.geocoded_file), &geocoded)
            .await?;

        let with_ndvi = table::write_village_table(&output.villages, ndvi_columns(&self.output))?;
        self.storage
            .write_file(&output_path(&self.output, &self.output.ndvi_file), &with_ndvi)
            .await?;

        let losses = table::write_loss_table(&output.forest_loss)?;
        self.storage
            .write_file(&output_path(&self.output, &self.output.forest_loss_file), &losses)
            .await?;

        Ok(self.output.dir.clone())
    }
}
