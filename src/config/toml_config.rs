use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::forest_loss::ForestLossSettings;
use crate::core::pipeline::PipelineSettings;
use crate::core::retry::RetryPolicy;
use crate::core::vegetation::{SensorBands, VegetationSettings};
use crate::domain::model::{AreaOfInterest, Coordinate};
use crate::domain::raster::Calibration;
use crate::utils::error::{EnrichError, Result};
use crate::utils::validation::{self, Validate};

/// 完整的執行配置，每個欄位都有預設值
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichConfig {
    pub geocoder: GeocoderConfig,
    pub reference: ReferenceConfig,
    pub vegetation: VegetationConfig,
    pub forest_loss: ForestLossConfig,
    pub raster: RasterConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    pub endpoint: String,
    /// 附加在村名後的國家，例如 `Jaduguda, India`
    pub country: String,
    pub user_agent: String,
    pub min_delay_ms: u64,
    pub timeout_secs: u64,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://nominatim.openstreetmap.org/search".to_string(),
            country: "India".to_string(),
            user_agent: "village_locator".to_string(),
            min_delay_ms: 1000,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceConfig {
    pub latitude: f64,
    pub longitude: f64,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            latitude: 22.6526,
            longitude: 86.3515,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VegetationConfig {
    pub baseline_year: i32,
    pub target_year: i32,
    pub buffer_radius_m: f64,
    pub sensor_transition_year: i32,
    pub pre_transition: SensorBands,
    pub post_transition: SensorBands,
    pub reflectance_scale: f64,
    pub reflectance_offset: f64,
    pub scale_m: f64,
    pub max_pixels: u64,
    pub synthesize_without_coordinates: bool,
}

impl Default for VegetationConfig {
    fn default() -> Self {
        let settings = VegetationSettings::default();
        Self {
            baseline_year: 2010,
            target_year: 2024,
            buffer_radius_m: 1000.0,
            sensor_transition_year: settings.sensor_transition_year,
            pre_transition: settings.pre_transition,
            post_transition: settings.post_transition,
            reflectance_scale: settings.calibration.scale,
            reflectance_offset: settings.calibration.offset,
            scale_m: settings.scale_m,
            max_pixels: settings.max_pixels,
            synthesize_without_coordinates: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestLossConfig {
    pub dataset_id: String,
    pub canopy_band: String,
    pub loss_year_band: String,
    pub canopy_threshold: f64,
    pub loss_year_base: i32,
    pub first_year: i32,
    pub last_year: i32,
    pub aoi: AreaOfInterest,
    pub scale_m: f64,
    pub max_pixels: u64,
}

impl Default for ForestLossConfig {
    fn default() -> Self {
        let settings = ForestLossSettings::default();
        Self {
            dataset_id: settings.dataset_id,
            canopy_band: settings.canopy_band,
            loss_year_band: settings.loss_year_band,
            canopy_threshold: settings.canopy_threshold,
            loss_year_base: settings.loss_year_base,
            first_year: 2010,
            last_year: 2023,
            aoi: AreaOfInterest::buffer(Coordinate::new(22.6560, 86.3529), 1000.0),
            scale_m: settings.scale_m,
            max_pixels: settings.max_pixels,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RasterBackend {
    Http,
    File,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterConfig {
    pub backend: RasterBackend,
    pub endpoint: String,
    /// JSON scene archive, read when `backend = "file"`
    pub archive_path: Option<String>,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub base_backoff_ms: u64,
    /// 固定隨機種子，讓補值結果可重現
    pub seed: Option<u64>,
}

impl Default for RasterConfig {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            backend: RasterBackend::Http,
            endpoint: "http://localhost:8080/reduce".to_string(),
            archive_path: None,
            timeout_secs: retry.call_timeout.as_secs(),
            max_attempts: retry.max_attempts,
            base_backoff_ms: retry.base_backoff.as_millis() as u64,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: String,
    pub geocoded_file: String,
    pub ndvi_file: String,
    pub forest_loss_file: String,
    pub log_file: String,
    pub include_provenance: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: "./output".to_string(),
            geocoded_file: "villages_with_distance.csv".to_string(),
            ndvi_file: "village_with_ndvi_loss.csv".to_string(),
            forest_loss_file: "forest_loss.csv".to_string(),
            log_file: "geocode_log.txt".to_string(),
            include_provenance: false,
        }
    }
}

impl EnrichConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| EnrichError::InputUnreadable {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EnrichError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${RASTER_ENDPOINT})，未設定的變數保留原文
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EnrichError::ConfigError {
            message: format!("env substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn reference(&self) -> Coordinate {
        Coordinate::new(self.reference.latitude, self.reference.longitude)
    }

    pub fn geocode_delay(&self) -> Duration {
        Duration::from_millis(self.geocoder.min_delay_ms)
    }

    pub fn geocode_timeout(&self) -> Duration {
        Duration::from_secs(self.geocoder.timeout_secs)
    }

    pub fn raster_timeout(&self) -> Duration {
        Duration::from_secs(self.raster.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.raster.max_attempts,
            base_backoff: Duration::from_millis(self.raster.base_backoff_ms),
            call_timeout: self.raster_timeout(),
        }
    }

    pub fn vegetation_settings(&self) -> VegetationSettings {
        let v = &self.vegetation;
        VegetationSettings {
            sensor_transition_year: v.sensor_transition_year,
            pre_transition: v.pre_transition.clone(),
            post_transition: v.post_transition.clone(),
            calibration: Calibration {
                scale: v.reflectance_scale,
                offset: v.reflectance_offset,
            },
            scale_m: v.scale_m,
            max_pixels: v.max_pixels,
        }
    }

    pub fn forest_loss_settings(&self) -> ForestLossSettings {
        let f = &self.forest_loss;
        ForestLossSettings {
            dataset_id: f.dataset_id.clone(),
            canopy_band: f.canopy_band.clone(),
            loss_year_band: f.loss_year_band.clone(),
            canopy_threshold: f.canopy_threshold,
            loss_year_base: f.loss_year_base,
            scale_m: f.scale_m,
            max_pixels: f.max_pixels,
        }
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            reference: self.reference(),
            baseline_year: self.vegetation.baseline_year,
            target_year: self.vegetation.target_year,
            buffer_radius_m: self.vegetation.buffer_radius_m,
            synthesize_without_coordinates: self.vegetation.synthesize_without_coordinates,
            loss_years: self.forest_loss.first_year..=self.forest_loss.last_year,
            loss_aoi: self.forest_loss.aoi.clone(),
        }
    }

    pub fn output_dir(&self) -> PathBuf {
        PathBuf::from(&self.output.dir)
    }

    pub fn log_path(&self) -> PathBuf {
        self.output_dir().join(&self.output.log_file)
    }

    fn validate_aoi(field: &str, aoi: &AreaOfInterest) -> Result<()> {
        match aoi {
            AreaOfInterest::Buffer { center, radius_m } => {
                if !center.is_valid() {
                    return Err(EnrichError::InvalidConfigValue {
                        field: format!("{}.center", field),
                        value: format!("{}, {}", center.latitude, center.longitude),
                        reason: "Not a valid WGS84 coordinate".to_string(),
                    });
                }
                validation::validate_range(&format!("{}.radius_m", field), *radius_m, 1.0, 100_000.0)
            }
            AreaOfInterest::Polygon { vertices } => {
                if vertices.len() < 3 {
                    return Err(EnrichError::InvalidConfigValue {
                        field: format!("{}.vertices", field),
                        value: vertices.len().to_string(),
                        reason: "A polygon needs at least 3 vertices".to_string(),
                    });
                }
                match vertices.iter().find(|v| !v.is_valid()) {
                    Some(v) => Err(EnrichError::InvalidConfigValue {
                        field: format!("{}.vertices", field),
                        value: format!("{}, {}", v.latitude, v.longitude),
                        reason: "Not a valid WGS84 coordinate".to_string(),
                    }),
                    None => Ok(()),
                }
            }
        }
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        self.validate_without_raster()?;
        self.validate_raster()
    }

    /// 驗證 [raster] 以外的所有區段；只做地理編碼時使用
    pub fn validate_without_raster(&self) -> Result<()> {
        // 地理編碼服務
        validation::validate_url("geocoder.endpoint", &self.geocoder.endpoint)?;
        validation::validate_non_empty_string("geocoder.user_agent", &self.geocoder.user_agent)?;
        validation::validate_positive_number("geocoder.timeout_secs", self.geocoder.timeout_secs, 1)?;

        // 參考點
        validation::validate_range("reference.latitude", self.reference.latitude, -90.0, 90.0)?;
        validation::validate_range("reference.longitude", self.reference.longitude, -180.0, 180.0)?;

        // 植被指數
        let v = &self.vegetation;
        validation::validate_range("vegetation.baseline_year", v.baseline_year, 1984, 2100)?;
        validation::validate_range("vegetation.target_year", v.target_year, 1984, 2100)?;
        validation::validate_range("vegetation.buffer_radius_m", v.buffer_radius_m, 1.0, 100_000.0)?;
        validation::validate_positive_number("vegetation.max_pixels", v.max_pixels, 1)?;
        if v.scale_m <= 0.0 {
            return Err(EnrichError::InvalidConfigValue {
                field: "vegetation.scale_m".to_string(),
                value: v.scale_m.to_string(),
                reason: "Scale must be positive".to_string(),
            });
        }

        // 森林流失
        let f = &self.forest_loss;
        validation::validate_non_empty_string("forest_loss.dataset_id", &f.dataset_id)?;
        validation::validate_range("forest_loss.canopy_threshold", f.canopy_threshold, 0.0, 100.0)?;
        validation::validate_range("forest_loss.first_year", f.first_year, f.loss_year_base + 1, f.loss_year_base + 255)?;
        validation::validate_range("forest_loss.last_year", f.last_year, f.first_year, f.loss_year_base + 255)?;
        validation::validate_positive_number("forest_loss.max_pixels", f.max_pixels, 1)?;
        Self::validate_aoi("forest_loss.aoi", &f.aoi)?;

        // 輸出
        validation::validate_path("output.dir", &self.output.dir)?;
        for (field, name) in [
            ("output.geocoded_file", &self.output.geocoded_file),
            ("output.ndvi_file", &self.output.ndvi_file),
            ("output.forest_loss_file", &self.output.forest_loss_file),
            ("output.log_file", &self.output.log_file),
        ] {
            validation::validate_non_empty_string(field, name)?;
        }

        Ok(())
    }

    /// 遙測運算後端
    fn validate_raster(&self) -> Result<()> {
        match self.raster.backend {
            RasterBackend::Http => validation::validate_url("raster.endpoint", &self.raster.endpoint)?,
            RasterBackend::File => match &self.raster.archive_path {
                Some(path) => validation::validate_path("raster.archive_path", path)?,
                None => {
                    return Err(EnrichError::MissingConfig {
                        field: "raster.archive_path".to_string(),
                    })
                }
            },
        }
        validation::validate_positive_number("raster.timeout_secs", self.raster.timeout_secs, 1)?;
        validation::validate_positive_number("raster.max_attempts", self.raster.max_attempts as u64, 1)?;
        Ok(())
    }
}

impl Validate for EnrichConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
