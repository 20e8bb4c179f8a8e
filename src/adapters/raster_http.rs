use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::domain::ports::RasterAnalytics;
use crate::domain::raster::{ReduceOutcome, ReduceRequest};
use crate::utils::error::{EnrichError, Result};

/// POSTs reduce requests as JSON to a raster-analytics gateway.
///
/// The gateway answers `{"value": <number>}`, or `{"value": null}` when no
/// scene matched the filters.
pub struct HttpRasterAnalytics {
    client: Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct ReduceResponse {
    value: Option<f64>,
}

impl HttpRasterAnalytics {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl RasterAnalytics for HttpRasterAnalytics {
    async fn reduce(&self, request: &ReduceRequest) -> Result<ReduceOutcome> {
        tracing::debug!(
            "Reducing {} over {:?} at {}m",
            request.collection_id,
            request.date_range,
            request.scale_m
        );
        let response = self.client.post(&self.endpoint).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EnrichError::RemoteComputation {
                message: format!("{} {}", status, body.trim()),
            });
        }

        let body: ReduceResponse = response.json().await?;
        Ok(match body.value {
            Some(v) => ReduceOutcome::Value(v),
            None => ReduceOutcome::Empty,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{AreaOfInterest, Coordinate};
    use crate::domain::raster::{BandExpression, Calibration, Composite, DateRange, Reducer};
    use httpmock::prelude::*;

    fn ndvi_request() -> ReduceRequest {
        ReduceRequest {
            collection_id: "LANDSAT/LC08/C02/T1_L2".to_string(),
            date_range: DateRange::calendar_year(2024),
            aoi: AreaOfInterest::buffer(Coordinate::new(22.6560, 86.3529), 1000.0),
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
        }
    }

    #[tokio::test]
    async fn test_reduce_posts_request_json() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/reduce")
                .json_body_partial(r#"{"collection_id": "LANDSAT/LC08/C02/T1_L2", "reducer": "mean"}"#);
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({"value": 0.3512}));
        });

        let raster = HttpRasterAnalytics::new(server.url("/reduce"), Duration::from_secs(5)).unwrap();
        let outcome = raster.reduce(&ndvi_request()).await.unwrap();

        api_mock.assert();
        assert_eq!(outcome, ReduceOutcome::Value(0.3512));
    }

    #[tokio::test]
    async fn test_reduce_null_value_is_empty() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/reduce");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({"value": null}));
        });

        let raster = HttpRasterAnalytics::new(server.url("/reduce"), Duration::from_secs(5)).unwrap();
        assert_eq!(raster.reduce(&ndvi_request()).await.unwrap(), ReduceOutcome::Empty);
    }

    #[tokio::test]
    async fn test_reduce_service_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/reduce");
            then.status(500).body("User memory limit exceeded");
        });

        let raster = HttpRasterAnalytics::new(server.url("/reduce"), Duration::from_secs(5)).unwrap();
        let err = raster.reduce(&ndvi_request()).await.unwrap_err();
        match err {
            EnrichError::RemoteComputation { message } => {
                assert!(message.contains("500"));
                assert!(message.contains("User memory limit exceeded"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
