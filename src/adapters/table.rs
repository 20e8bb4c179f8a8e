use serde::Deserialize;

use crate::domain::model::{Coordinate, LossRecord, VillageFeatureRecord};
use crate::utils::error::{EnrichError, Result};

/// Which feature columns a village table carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VillageColumns {
    /// `Village, Latitude, Longitude, Distance_km`
    Geocoded,
    /// Geocoded columns plus `NDVI_loss`.
    WithNdvi { provenance: bool },
}

#[derive(Debug, Deserialize)]
struct VillageRow {
    #[serde(rename = "Village")]
    village: String,
    #[serde(rename = "Latitude")]
    latitude: Option<f64>,
    #[serde(rename = "Longitude")]
    longitude: Option<f64>,
    #[serde(rename = "Distance_km", default)]
    distance_km: Option<f64>,
}

/// One name per line; surrounding whitespace trimmed, blank lines skipped.
/// A list that is not UTF-8 is as unusable as a missing one.
pub fn parse_village_names(source: &str, data: &[u8]) -> Result<Vec<String>> {
    let text = std::str::from_utf8(data).map_err(|e| EnrichError::InputUnreadable {
        path: source.to_string(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
    })?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Reads `Village, Latitude, Longitude[, Distance_km]`; a row missing either
/// coordinate is kept without one.
pub fn parse_village_table(data: &[u8]) -> Result<Vec<VillageFeatureRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(data);

    let mut records = Vec::new();
    for row in reader.deserialize::<VillageRow>() {
        let row = row?;
        let coordinate = match (row.latitude, row.longitude) {
            (Some(lat), Some(lon)) => Some(Coordinate::new(lat, lon)),
            _ => None,
        };
        records.push(VillageFeatureRecord {
            name: row.village,
            coordinate,
            distance_km: coordinate.and(row.distance_km),
            ndvi_loss: None,
        });
    }
    Ok(records)
}

fn optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

pub fn write_village_table(records: &[VillageFeatureRecord], columns: VillageColumns) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec!["Village", "Latitude", "Longitude", "Distance_km"];
    if let VillageColumns::WithNdvi { provenance } = columns {
        header.push("NDVI_loss");
        if provenance {
            header.push("NDVI_source");
        }
    }
    writer.write_record(&header)?;

    for record in records {
        let mut row = vec![
            record.name.clone(),
            optional(record.coordinate.map(|c| c.latitude)),
            optional(record.coordinate.map(|c| c.longitude)),
            optional(record.distance_km),
        ];
        if let VillageColumns::WithNdvi { provenance } = columns {
            row.push(
                record
                    .ndvi_loss
                    .map(|loss| format!("{:.4}", loss.value()))
                    .unwrap_or_default(),
            );
            if provenance {
                row.push(
                    record
                        .ndvi_loss
                        .map(|loss| loss.source_label().to_string())
                        .unwrap_or_default(),
                );
            }
        }
        writer.write_record(&row)?;
    }

    writer
        .into_inner()
        .map_err(|e| EnrichError::IoError(std::io::Error::new(e.error().kind(), e.to_string())))
}

pub fn write_loss_table(records: &[LossRecord]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["year", "forest_loss_ha"])?;
    for record in records {
        writer.write_record([record.year.to_string(), optional(record.area_hectares)])?;
    }
    writer
        .into_inner()
        .map_err(|e| EnrichError::IoError(std::io::Error::new(e.error().kind(), e.to_string())))
}
