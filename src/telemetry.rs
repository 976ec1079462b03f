//! Telemetry seam.
//!
//! Emission itself is out of scope; the cascade only needs somewhere to
//! report that a provider fetch produced usable data. Injected through the
//! resolver builder so tests can substitute a counting double.

/// Narrow telemetry interface for the cascade.
pub trait Telemetry: Send + Sync {
    /// A provider fetch returned usable information for a number.
    fn provider_info_fetched(&self, provider_id: &str);
}

/// Telemetry sink that drops everything. The default.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTelemetry;

impl Telemetry for NoopTelemetry {
    fn provider_info_fetched(&self, _provider_id: &str) {}
}
