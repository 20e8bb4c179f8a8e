use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::domain::model::Coordinate;
use crate::domain::ports::Geocoder;
use crate::utils::error::{EnrichError, Result};

/// Client for a Nominatim-compatible `/search` endpoint.
pub struct NominatimGeocoder {
    client: Client,
    endpoint: String,
}

// Nominatim returns coordinates as strings.
#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
}

impl NominatimGeocoder {
    pub fn new(endpoint: impl Into<String>, user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn lookup(&self, query: &str) -> Result<Option<Coordinate>> {
        tracing::debug!("Making geocoding request to: {}", self.endpoint);
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query), ("format", "json"), ("limit", "1")])
            .send()
            .await?
            .error_for_status()?;

        let hits: Vec<SearchHit> = response.json().await?;
        let Some(hit) = hits.into_iter().next() else {
            return Ok(None);
        };

        let parse = |field: &str, raw: &str| {
            raw.trim().parse::<f64>().map_err(|_| EnrichError::RemoteComputation {
                message: format!("geocoder returned non-numeric {} '{}'", field, raw),
            })
        };
        Ok(Some(Coordinate::new(
            parse("lat", &hit.lat)?,
            parse("lon", &hit.lon)?,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn geocoder(server: &MockServer) -> NominatimGeocoder {
        NominatimGeocoder::new(server.url("/search"), "village_locator", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_lookup_returns_first_hit() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/search")
                .query_param("q", "Jaduguda, India")
                .query_param("format", "json")
                .query_param("limit", "1")
                .header("user-agent", "village_locator");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!([
                    {"lat": "22.6560", "lon": "86.3529", "display_name": "Jaduguda, Jharkhand, India"}
                ]));
        });

        let result = geocoder(&server).lookup("Jaduguda, India").await.unwrap();

        api_mock.assert();
        assert_eq!(result, Some(Coordinate::new(22.6560, 86.3529)));
    }

    #[tokio::test]
    async fn test_lookup_no_match() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET).path("/search");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!([]));
        });

        let result = geocoder(&server).lookup("NotARealPlace_xyz, India").await.unwrap();

        api_mock.assert();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_lookup_server_error() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET).path("/search");
            then.status(429);
        });

        let err = geocoder(&server).lookup("Jaduguda, India").await.unwrap_err();

        api_mock.assert();
        assert!(matches!(err, EnrichError::HttpError(_)));
    }

    #[tokio::test]
    async fn test_lookup_malformed_coordinates() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/search");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!([{"lat": "north", "lon": "86.35"}]));
        });

        let err = geocoder(&server).lookup("Jaduguda, India").await.unwrap_err();
        assert!(matches!(err, EnrichError::RemoteComputation { .. }));
    }
}
