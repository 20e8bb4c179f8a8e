use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::model::Coordinate;
use crate::domain::raster::{ReduceOutcome, ReduceRequest};
use crate::utils::error::Result;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Name to coordinate lookup. `Ok(None)` means the service found no match.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn lookup(&self, query: &str) -> Result<Option<Coordinate>>;
}

#[async_trait]
pub trait RasterAnalytics: Send + Sync {
    async fn reduce(&self, request: &ReduceRequest) -> Result<ReduceOutcome>;
}

/// Append-only run log.
pub trait EventLog: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
}

/// One stage of the enrichment run: read its input, derive features, persist them.
#[async_trait]
pub trait Stage: Send {
    type Input: Send;
    type Output: Send;

    fn name(&self) -> &str;
    async fn extract(&mut self) -> Result<Self::Input>;
    async fn transform(&mut self, input: Self::Input) -> Result<Self::Output>;
    async fn load(&mut self, output: Self::Output) -> Result<String>;
}

#[async_trait]
impl<T: Geocoder + ?Sized> Geocoder for Arc<T> {
    async fn lookup(&self, query: &str) -> Result<Option<Coordinate>> {
        (**self).lookup(query).await
    }
}

#[async_trait]
impl<T: RasterAnalytics + ?Sized> RasterAnalytics for Arc<T> {
    async fn reduce(&self, request: &ReduceRequest) -> Result<ReduceOutcome> {
        (**self).reduce(request).await
    }
}

impl<T: EventLog + ?Sized> EventLog for Arc<T> {
    fn info(&self, message: &str) {
        (**self).info(message)
    }

    fn warn(&self, message: &str) {
        (**self).warn(message)
    }
}
