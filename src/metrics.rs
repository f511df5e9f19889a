use prometheus::{CounterVec, Histogram, HistogramOpts, Opts, Registry};
use std::sync::Arc;

/// Global metrics for the login gateway
pub struct Metrics {
    pub registry: Registry,

    // Callback outcomes: redirect, signed_in, upstream_rejection, expired_code, ...
    pub callback_total: CounterVec,

    // Token exchange round trip to GitHub
    pub exchange_duration_seconds: Histogram,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let callback_total = CounterVec::new(
            Opts::new("ghgate_callback_total", "OAuth callback requests by outcome"),
            &["outcome"],
        )?;

        let exchange_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "ghgate_exchange_duration_seconds",
                "GitHub token exchange duration in seconds",
            )
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        )?;

        registry.register(Box::new(callback_total.clone()))?;
        registry.register(Box::new(exchange_duration_seconds.clone()))?;

        Ok(Self {
            registry,
            callback_total,
            exchange_duration_seconds,
        })
    }

    /// Prometheus text exposition
    pub fn render(&self) -> anyhow::Result<String> {
        use prometheus::Encoder;

        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;

        Ok(String::from_utf8(buffer)?)
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics")
    }
}

/// Global metrics instance
pub static METRICS: once_cell::sync::Lazy<Arc<Metrics>> =
    once_cell::sync::Lazy::new(|| Arc::new(Metrics::default()));
