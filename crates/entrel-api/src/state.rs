//! Application state management

use entrel_core::{AppConfig, Result};
use entrel_extractor::ExtractionService;
use entrel_parser::ParserRegistry;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::RwLock;
use utoipa::ToSchema;

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Extraction pipeline
    pub extraction: ExtractionService,
    /// Parsers for uploaded documents
    pub parsers: ParserRegistry,
    /// Server start time
    pub start_time: Instant,
    /// Request counter
    pub request_count: AtomicU64,
    /// Ready status
    pub is_ready: AtomicBool,
    /// Per-endpoint request metrics
    pub metrics: RwLock<HashMap<String, EndpointMetrics>>,
}

impl AppState {
    /// Create new application state, building the configured recognizer
    pub fn new(config: AppConfig) -> Result<Self> {
        let extraction = ExtractionService::from_config(&config)?;
        Ok(Self::with_service(config, extraction))
    }

    /// Create state around an existing extraction service
    pub fn with_service(config: AppConfig, extraction: ExtractionService) -> Self {
        Self {
            config,
            extraction,
            parsers: ParserRegistry::with_defaults(),
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
            is_ready: AtomicBool::new(true),
            metrics: RwLock::new(HashMap::new()),
        }
    }

    /// Increment request counter
    pub fn increment_requests(&self) -> u64 {
        self.request_count.fetch_add(1, Ordering::SeqCst)
    }

    /// Get total request count
    pub fn get_request_count(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Check if service is ready
    pub fn is_ready(&self) -> bool {
        self.is_ready.load(Ordering::SeqCst)
    }

    /// Set ready status
    pub fn set_ready(&self, ready: bool) {
        self.is_ready.store(ready, Ordering::SeqCst);
    }

    /// Name of the active recognizer backend
    pub fn backend(&self) -> &str {
        self.extraction.backend()
    }

    /// Record one completed request
    pub async fn record_request(&self, endpoint: String, status: u16, latency_us: u64) {
        self.increment_requests();
        let mut metrics = self.metrics.write().await;
        metrics.entry(endpoint).or_default().record(status, latency_us);
    }
}

/// Request metrics for one endpoint
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct EndpointMetrics {
    /// Requests by HTTP status code
    pub status_counts: BTreeMap<u16, u64>,
    /// Sum of latencies in microseconds
    pub total_latency_us: u64,
    pub min_latency_us: u64,
    pub max_latency_us: u64,
    /// Number of latency samples
    pub latency_count: u64,
    pub latency_buckets: LatencyBuckets,
}

impl EndpointMetrics {
    pub fn record(&mut self, status: u16, latency_us: u64) {
        *self.status_counts.entry(status).or_default() += 1;

        self.min_latency_us = if self.latency_count == 0 {
            latency_us
        } else {
            self.min_latency_us.min(latency_us)
        };
        self.max_latency_us = self.max_latency_us.max(latency_us);
        self.total_latency_us += latency_us;
        self.latency_count += 1;
        self.latency_buckets.record(latency_us);
    }

    /// Mean latency in milliseconds
    pub fn avg_latency_ms(&self) -> f64 {
        if self.latency_count == 0 {
            return 0.0;
        }
        self.total_latency_us as f64 / self.latency_count as f64 / 1000.0
    }
}

/// Latency histogram
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct LatencyBuckets {
    pub under_10ms: u64,
    pub ms_10_50: u64,
    pub ms_50_100: u64,
    pub ms_100_500: u64,
    pub ms_500_1000: u64,
    pub over_1s: u64,
}

impl LatencyBuckets {
    fn record(&mut self, latency_us: u64) {
        let bucket = match latency_us {
            0..=9_999 => &mut self.under_10ms,
            10_000..=49_999 => &mut self.ms_10_50,
            50_000..=99_999 => &mut self.ms_50_100,
            100_000..=499_999 => &mut self.ms_100_500,
            500_000..=999_999 => &mut self.ms_500_1000,
            _ => &mut self.over_1s,
        };
        *bucket += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_metrics_record() {
        let mut metrics = EndpointMetrics::default();
        metrics.record(200, 5_000);
        metrics.record(200, 120_000);
        metrics.record(400, 2_000_000);

        assert_eq!(metrics.status_counts[&200], 2);
        assert_eq!(metrics.status_counts[&400], 1);
        assert_eq!(metrics.min_latency_us, 5_000);
        assert_eq!(metrics.max_latency_us, 2_000_000);
        assert_eq!(metrics.latency_buckets.under_10ms, 1);
        assert_eq!(metrics.latency_buckets.ms_100_500, 1);
        assert_eq!(metrics.latency_buckets.over_1s, 1);
        assert!((metrics.avg_latency_ms() - 708.333).abs() < 0.01);
    }

    #[tokio::test]
    async fn test_record_request_counts() {
        let state = AppState::new(AppConfig::default()).unwrap();
        assert_eq!(state.backend(), "local");

        state.record_request("/health".to_string(), 200, 100).await;
        state.record_request("/health".to_string(), 200, 300).await;

        assert_eq!(state.get_request_count(), 2);
        let metrics = state.metrics.read().await;
        assert_eq!(metrics["/health"].latency_count, 2);
    }
}
