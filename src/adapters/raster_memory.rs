//! Local raster evaluation over a JSON scene archive.
//!
//! Every collection is a stack of scenes sharing one regular lat/lon grid.
//! A pixel belongs to an area of interest when its centre does.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::model::Coordinate;
use crate::domain::ports::RasterAnalytics;
use crate::domain::raster::{BandExpression, Composite, ReduceOutcome, ReduceRequest, Reducer};
use crate::utils::error::{EnrichError, Result};

/// Mean Earth radius in metres, for pixel areas.
const EARTH_RADIUS_M: f64 = 6_371_008.8;
const SQUARE_METRES_PER_HECTARE: f64 = 10_000.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PixelGrid {
    /// Latitude of the top edge.
    pub north: f64,
    /// Longitude of the left edge.
    pub west: f64,
    pub cell_deg: f64,
    pub rows: usize,
    pub cols: usize,
}

impl PixelGrid {
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn center(&self, index: usize) -> Coordinate {
        let (row, col) = (index / self.cols, index % self.cols);
        Coordinate::new(
            self.north - (row as f64 + 0.5) * self.cell_deg,
            self.west + (col as f64 + 0.5) * self.cell_deg,
        )
    }

    /// Spherical area of the cell in square metres.
    pub fn area_m2(&self, index: usize) -> f64 {
        let row = index / self.cols;
        let top = (self.north - row as f64 * self.cell_deg).to_radians();
        let bottom = (self.north - (row + 1) as f64 * self.cell_deg).to_radians();
        EARTH_RADIUS_M * EARTH_RADIUS_M * self.cell_deg.to_radians() * (top.sin() - bottom.sin()).abs()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub acquired: NaiveDate,
    /// Row-major pixel values per band name.
    pub bands: HashMap<String, Vec<f64>>,
}

impl Scene {
    fn band(&self, name: &str, index: usize) -> Result<f64> {
        self.bands
            .get(name)
            .and_then(|values| values.get(index))
            .copied()
            .ok_or_else(|| EnrichError::remote(format!("band '{}' missing from scene {}", name, self.acquired)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneCollection {
    pub grid: PixelGrid,
    pub scenes: Vec<Scene>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneArchive {
    pub collections: HashMap<String, SceneCollection>,
}

impl SceneArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collection(mut self, id: impl Into<String>, collection: SceneCollection) -> Self {
        self.collections.insert(id.into(), collection);
        self
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let archive: Self = serde_json::from_str(content)?;
        archive.check_band_lengths()?;
        Ok(archive)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| EnrichError::InputUnreadable {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    fn check_band_lengths(&self) -> Result<()> {
        for (id, collection) in &self.collections {
            let expected = collection.grid.len();
            for scene in &collection.scenes {
                for (band, values) in &scene.bands {
                    if values.len() != expected {
                        return Err(EnrichError::ValidationError {
                            message: format!(
                                "{} scene {} band '{}' has {} pixels, grid has {}",
                                id,
                                scene.acquired,
                                band,
                                values.len(),
                                expected
                            ),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    pub fn evaluate(&self, request: &ReduceRequest) -> Result<ReduceOutcome> {
        let collection = self
            .collections
            .get(&request.collection_id)
            .ok_or_else(|| EnrichError::remote(format!("unknown collection '{}'", request.collection_id)))?;

        let scenes: Vec<&Scene> = collection
            .scenes
            .iter()
            .filter(|scene| request.date_range.map_or(true, |r| r.contains(scene.acquired)))
            .collect();
        let grid = &collection.grid;
        let pixels: Vec<usize> = (0..grid.len())
            .filter(|&i| request.aoi.contains(grid.center(i)))
            .collect();

        if scenes.is_empty() || pixels.is_empty() {
            return Ok(ReduceOutcome::Empty);
        }
        if pixels.len() as u64 > request.max_pixels {
            return Err(EnrichError::remote(format!(
                "{} pixels exceed max_pixels {}",
                pixels.len(),
                request.max_pixels
            )));
        }

        let mut composite = Vec::with_capacity(pixels.len());
        for &index in &pixels {
            let mut per_scene = Vec::with_capacity(scenes.len());
            for scene in &scenes {
                per_scene.push(pixel_value(&request.expression, scene, grid, index)?);
            }
            composite.push(match request.composite {
                Composite::Median => median(per_scene),
                Composite::First => per_scene[0],
            });
        }

        let valid: Vec<f64> = composite.into_iter().filter(|v| v.is_finite()).collect();
        Ok(match request.reducer {
            Reducer::Mean if valid.is_empty() => ReduceOutcome::Empty,
            Reducer::Mean => ReduceOutcome::Value(valid.iter().sum::<f64>() / valid.len() as f64),
            Reducer::Sum => ReduceOutcome::Value(valid.iter().sum()),
        })
    }
}

#[async_trait]
impl RasterAnalytics for SceneArchive {
    async fn reduce(&self, request: &ReduceRequest) -> Result<ReduceOutcome> {
        tracing::debug!(
            "Evaluating {} locally (requested scale {}m ignored, native grid used)",
            request.collection_id,
            request.scale_m
        );
        self.evaluate(request)
    }
}

/// Masked pixels are NaN.
fn pixel_value(expression: &BandExpression, scene: &Scene, grid: &PixelGrid, index: usize) -> Result<f64> {
    match expression {
        BandExpression::NormalizedDifference { nir, red, calibration } => {
            let nir = calibration.apply(scene.band(nir, index)?);
            let red = calibration.apply(scene.band(red, index)?);
            let total = nir + red;
            Ok(if total == 0.0 { f64::NAN } else { (nir - red) / total })
        }
        BandExpression::ForestLossArea {
            canopy_band,
            loss_year_band,
            canopy_threshold,
            loss_year_codes,
        } => {
            let canopy = scene.band(canopy_band, index)?;
            let code = scene.band(loss_year_band, index)?;
            let is_forest = canopy >= *canopy_threshold;
            let lost = code.is_finite() && code >= 0.0 && loss_year_codes.contains(&(code.round() as u32));
            Ok(if is_forest && lost {
                grid.area_m2(index) / SQUARE_METRES_PER_HECTARE
            } else {
                0.0
            })
        }
    }
}

fn median(values: Vec<f64>) -> f64 {
    let mut finite: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return f64::NAN;
    }
    finite.sort_by(|a, b| a.total_cmp(b));
    let mid = finite.len() / 2;
    if finite.len() % 2 == 0 {
        (finite[mid - 1] + finite[mid]) / 2.0
    } else {
        finite[mid]
    }
}
