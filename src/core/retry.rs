use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing::warn;

use crate::domain::model::Observation;
use crate::domain::ports::RasterAnalytics;
use crate::domain::raster::{ReduceOutcome, ReduceRequest};
use crate::utils::error::{EnrichError, Result};

const MAX_BACKOFF_EXPONENT: u32 = 6;

/// Bounded retry with exponential backoff and a per-call timeout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub call_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(250),
            call_timeout: Duration::from_secs(120),
        }
    }
}

impl RetryPolicy {
    pub fn single_attempt(call_timeout: Duration) -> Self {
        Self {
            max_attempts: 1,
            base_backoff: Duration::ZERO,
            call_timeout,
        }
    }

    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
        self.base_backoff * (1u32 << exponent)
    }

    async fn reduce_once<R: RasterAnalytics + ?Sized>(
        &self,
        raster: &R,
        request: &ReduceRequest,
    ) -> Result<ReduceOutcome> {
        match timeout(self.call_timeout, raster.reduce(request)).await {
            Ok(result) => result,
            Err(_) => Err(EnrichError::Timeout {
                operation: format!("reduce on {}", request.collection_id),
                seconds: self.call_timeout.as_secs(),
            }),
        }
    }

    /// Runs one reduction. Empty collections are final; transient faults are
    /// retried until `max_attempts` is spent.
    pub async fn reduce<R: RasterAnalytics + ?Sized>(
        &self,
        raster: &R,
        request: &ReduceRequest,
    ) -> Observation<f64> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.reduce_once(raster, request).await {
                Ok(ReduceOutcome::Value(v)) => return Observation::Found(v),
                Ok(ReduceOutcome::Empty) => return Observation::EmptyCollection,
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    let delay = self.backoff_delay(attempt);
                    warn!(
                        %err,
                        attempt, "raster reduction failed; retrying after {:?}", delay
                    );
                    sleep(delay).await;
                }
                Err(err) => return Observation::ComputationFailure(err.to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{AreaOfInterest, Coordinate};
    use crate::domain::raster::{BandExpression, Composite, Reducer};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyRaster {
        failures_before_success: u32,
        calls: AtomicU32,
        outcome: ReduceOutcome,
    }

    #[async_trait]
    impl RasterAnalytics for FlakyRaster {
        async fn reduce(&self, _request: &ReduceRequest) -> Result<ReduceOutcome> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures_before_success {
                Err(EnrichError::remote("backend unavailable"))
            } else {
                Ok(self.outcome)
            }
        }
    }

    struct StalledRaster;

    #[async_trait]
    impl RasterAnalytics for StalledRaster {
        async fn reduce(&self, _request: &ReduceRequest) -> Result<ReduceOutcome> {
            sleep(Duration::from_secs(30)).await;
            Ok(ReduceOutcome::Value(0.0))
        }
    }

    fn request() -> ReduceRequest {
        ReduceRequest {
            collection_id: "UMD/hansen/global_forest_change_2024_v1_12".to_string(),
            date_range: None,
            aoi: AreaOfInterest::buffer(Coordinate::new(22.6560, 86.3529), 1000.0),
            expression: BandExpression::ForestLossArea {
                canopy_band: "treecover2000".to_string(),
                loss_year_band: "lossyear".to_string(),
                canopy_threshold: 30.0,
                loss_year_codes: vec![10],
            },
            composite: Composite::First,
            reducer: Reducer::Sum,
            scale_m: 30.0,
            max_pixels: 1_000_000_000,
        }
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_backoff: Duration::from_millis(1),
            call_timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            base_backoff: Duration::from_millis(100),
            ..RetryPolicy::default()
        };
        assert_eq!(policy.backoff_delay(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_delay(3), Duration::from_millis(400));
        assert_eq!(policy.backoff_delay(20), Duration::from_millis(6400));
    }

    #[tokio::test]
    async fn retries_transient_failures() {
        let raster = FlakyRaster {
            failures_before_success: 2,
            calls: AtomicU32::new(0),
            outcome: ReduceOutcome::Value(12.5),
        };
        let outcome = fast_policy(3).reduce(&raster, &request()).await;
        assert_eq!(outcome, Observation::Found(12.5));
        assert_eq!(raster.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let raster = FlakyRaster {
            failures_before_success: 5,
            calls: AtomicU32::new(0),
            outcome: ReduceOutcome::Value(1.0),
        };
        let outcome = fast_policy(2).reduce(&raster, &request()).await;
        assert!(matches!(outcome, Observation::ComputationFailure(_)));
        assert_eq!(raster.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn empty_collection_is_not_retried() {
        let raster = FlakyRaster {
            failures_before_success: 0,
            calls: AtomicU32::new(0),
            outcome: ReduceOutcome::Empty,
        };
        let outcome = fast_policy(3).reduce(&raster, &request()).await;
        assert_eq!(outcome, Observation::EmptyCollection);
        assert_eq!(raster.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stalled_call_times_out() {
        let policy = RetryPolicy::single_attempt(Duration::from_millis(20));
        let outcome = policy.reduce(&StalledRaster, &request()).await;
        match outcome {
            Observation::ComputationFailure(msg) => assert!(msg.contains("timed out")),
            other => panic!("expected timeout, got {:?}", other),
        }
    }
}
