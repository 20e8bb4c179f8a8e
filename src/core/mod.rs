pub mod etl;
pub mod fallback;
pub mod forest_loss;
pub mod geo;
pub mod geocode;
pub mod pipeline;
pub mod retry;
pub mod vegetation;

pub use crate::domain::model::{Coordinate, VillageFeatureRecord};
pub use crate::domain::ports::{EventLog, Geocoder, RasterAnalytics, Stage, Storage};
pub use crate::utils::error::Result;
