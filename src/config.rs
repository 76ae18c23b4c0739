use std::time::Duration;

use tracing_subscriber::EnvFilter;

use crate::error::ConfigError;

/// Runtime knobs for the dispatcher and the file-tail event source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Bound of the ordered inbound channel (events and commands).
    pub channel_capacity: usize,
    /// Poll interval of the stream-log tailer.
    pub poll_interval: Duration,
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
            poll_interval: Duration::from_millis(200),
            log_filter: "info".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        self.env_filter().map(|_| ())
    }

    /// `RUST_LOG` wins; otherwise the configured directive.
    pub fn env_filter(&self) -> Result<EnvFilter, ConfigError> {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }
        EnvFilter::try_new(&self.log_filter).map_err(|e| ConfigError::LogFilter {
            filter: self.log_filter.clone(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = EngineConfig::default();
        assert_eq!(config.channel_capacity, 1024);
        assert_eq!(config.poll_interval, Duration::from_millis(200));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_capacity_rejected() {
        let config = EngineConfig::default().with_channel_capacity(0);
        assert_eq!(config.validate(), Err(ConfigError::ZeroCapacity));
    }

    #[test]
    fn builder_overrides() {
        let config = EngineConfig::default()
            .with_channel_capacity(8)
            .with_poll_interval(Duration::from_millis(50))
            .with_log_filter("session_weave=debug");
        assert_eq!(config.channel_capacity, 8);
        assert_eq!(config.poll_interval, Duration::from_millis(50));
        assert_eq!(config.log_filter, "session_weave=debug");
    }
}
