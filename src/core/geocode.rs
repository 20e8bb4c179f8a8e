use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex as AsyncMutex;
use tokio::time::{sleep, Instant};

use crate::domain::model::{Coordinate, PlaceQuery};
use crate::domain::ports::{EventLog, Geocoder};

/// Enforces a minimum gap between the start of consecutive calls.
///
/// No burst allowance: every caller waits until `min_interval` has passed
/// since the previous call started, whoever made it.
pub struct RateLimiter {
    min_interval: Duration,
    last_start: AsyncMutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_start: AsyncMutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Blocks until the next call may start and returns that start instant.
    pub async fn wait(&self) -> Instant {
        let mut guard = self.last_start.lock().await;
        if let Some(prev) = *guard {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                sleep(self.min_interval - elapsed).await;
            }
        }
        let now = Instant::now();
        *guard = Some(now);
        now
    }
}

/// Rate-limited name to coordinate resolution. One attempt per name.
pub struct GeocodeResolver {
    geocoder: Box<dyn Geocoder>,
    country: String,
    limiter: RateLimiter,
    log: Arc<dyn EventLog>,
}

impl GeocodeResolver {
    pub fn new(
        geocoder: Box<dyn Geocoder>,
        country: impl Into<String>,
        min_delay: Duration,
        log: Arc<dyn EventLog>,
    ) -> Self {
        Self {
            geocoder,
            country: country.into(),
            limiter: RateLimiter::new(min_delay),
            log,
        }
    }

    pub fn query(&self, name: &str) -> PlaceQuery {
        PlaceQuery::new(name, self.country.as_str())
    }

    pub async fn resolve(&self, name: &str) -> Option<Coordinate> {
        let query = self.query(name);
        self.limiter.wait().await;
        tracing::debug!("Geocoding '{}'", query.text());

        match self.geocoder.lookup(&query.text()).await {
            Ok(Some(coordinate)) if coordinate.is_valid() => {
                self.log.info(&format!(
                    "FOUND: {} -> ({}, {})",
                    query.name(),
                    coordinate.latitude,
                    coordinate.longitude
                ));
                Some(coordinate)
            }
            Ok(Some(coordinate)) => {
                self.log.warn(&format!(
                    "LOOKUP FAILED: {} (invalid coordinate {}, {})",
                    query.name(),
                    coordinate.latitude,
                    coordinate.longitude
                ));
                None
            }
            Ok(None) => {
                self.log.warn(&format!("NOT FOUND: {}", query.name()));
                None
            }
            Err(e) => {
                self.log
                    .warn(&format!("LOOKUP FAILED: {} ({})", query.name(), e));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::event_log::{LogLevel, MemoryEventLog};
    use crate::utils::error::{EnrichError, Result};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct StubGeocoder {
        known: HashMap<String, Coordinate>,
        calls: Arc<Mutex<Vec<(String, Instant)>>>,
    }

    impl StubGeocoder {
        fn new(known: &[(&str, Coordinate)]) -> Self {
            Self {
                known: known
                    .iter()
                    .map(|(q, c)| (q.to_string(), *c))
                    .collect(),
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl Geocoder for StubGeocoder {
        async fn lookup(&self, query: &str) -> Result<Option<Coordinate>> {
            self.calls
                .lock()
                .unwrap()
                .push((query.to_string(), Instant::now()));
            if query.starts_with("Broken") {
                return Err(EnrichError::remote("503 Service Unavailable"));
            }
            Ok(self.known.get(query).copied())
        }
    }

    fn resolver(stub: StubGeocoder, delay_ms: u64, log: Arc<MemoryEventLog>) -> GeocodeResolver {
        GeocodeResolver::new(
            Box::new(stub),
            "India",
            Duration::from_millis(delay_ms),
            log,
        )
    }

    #[tokio::test]
    async fn resolves_with_country_qualifier_and_logs_found() {
        let log = Arc::new(MemoryEventLog::new());
        let stub = StubGeocoder::new(&[("Jaduguda, India", Coordinate::new(22.6560, 86.3529))]);
        let calls = stub.calls.clone();
        let resolver = resolver(stub, 0, log.clone());

        let found = resolver.resolve("Jaduguda").await;

        assert_eq!(found, Some(Coordinate::new(22.6560, 86.3529)));
        assert_eq!(calls.lock().unwrap()[0].0, "Jaduguda, India");
        let entries = log.entries();
        assert_eq!(entries[0].level, LogLevel::Info);
        assert_eq!(entries[0].message, "FOUND: Jaduguda -> (22.656, 86.3529)");
    }

    #[tokio::test]
    async fn missing_and_failed_lookups_are_warnings() {
        let log = Arc::new(MemoryEventLog::new());
        let resolver = resolver(StubGeocoder::new(&[]), 0, log.clone());

        assert_eq!(resolver.resolve("NotARealPlace_xyz").await, None);
        assert_eq!(resolver.resolve("Broken Hill").await, None);

        let entries = log.entries();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.level == LogLevel::Warn));
        assert_eq!(entries[0].message, "NOT FOUND: NotARealPlace_xyz");
        assert!(entries[1].message.starts_with("LOOKUP FAILED: Broken Hill"));
    }

    #[tokio::test]
    async fn limiter_spaces_consecutive_starts() {
        let limiter = RateLimiter::new(Duration::from_millis(40));
        let mut starts = Vec::new();
        for _ in 0..4 {
            starts.push(limiter.wait().await);
        }

        for pair in starts.windows(2) {
            let gap = pair[1].duration_since(pair[0]);
            assert!(gap >= Duration::from_millis(40), "gap was {:?}", gap);
        }
    }

    #[tokio::test]
    async fn resolver_calls_are_rate_limited_regardless_of_outcome() {
        let log = Arc::new(MemoryEventLog::new());
        let stub = StubGeocoder::new(&[("A, India", Coordinate::new(1.0, 1.0))]);
        let calls = stub.calls.clone();
        let resolver = resolver(stub, 50, log);

        let started = Instant::now();
        for name in ["A", "B", "Broken", "A"] {
            resolver.resolve(name).await;
        }

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 4);
        let last = calls[3].1;
        assert!(last.duration_since(started) >= Duration::from_millis(150));
    }

    #[tokio::test]
    async fn first_call_is_not_delayed() {
        let limiter = RateLimiter::new(Duration::from_secs(5));
        let started = Instant::now();
        limiter.wait().await;
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(limiter.min_interval(), Duration::from_secs(5));
    }
}
