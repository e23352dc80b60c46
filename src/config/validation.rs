//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, buffers within bounds)
//! - Validate addresses and path prefixes
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::schema::ServiceConfig;
use crate::store::memory::MAX_STREAM_BUFFER;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a socket address")]
    InvalidBindAddress(String),

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroRequestTimeout,

    #[error("api.prefix '{0}' must be empty or start with '/' and not end with '/'")]
    InvalidPrefix(String),

    #[error("store.stream_buffer must be greater than zero")]
    ZeroStreamBuffer,

    #[error("store.stream_buffer {0} exceeds the maximum of {max}", max = MAX_STREAM_BUFFER)]
    StreamBufferTooLarge(usize),

    #[error("observability.log_level '{0}' is not a valid filter directive")]
    InvalidLogLevel(String),

    #[error("observability.metrics_address '{0}' is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }

    let prefix = &config.api.prefix;
    if !prefix.is_empty() && (!prefix.starts_with('/') || prefix.ends_with('/')) {
        errors.push(ValidationError::InvalidPrefix(prefix.clone()));
    }

    match config.store.stream_buffer {
        0 => errors.push(ValidationError::ZeroStreamBuffer),
        n if n > MAX_STREAM_BUFFER => errors.push(ValidationError::StreamBufferTooLarge(n)),
        _ => {}
    }

    if EnvFilter::try_new(&config.observability.log_level).is_err() {
        errors.push(ValidationError::InvalidLogLevel(
            config.observability.log_level.clone(),
        ));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&ServiceConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ServiceConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.timeouts.request_secs = 0;
        config.api.prefix = "/v1/".into();
        config.store.stream_buffer = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::InvalidBindAddress("not-an-address".into()),
                ValidationError::ZeroRequestTimeout,
                ValidationError::InvalidPrefix("/v1/".into()),
                ValidationError::ZeroStreamBuffer,
            ]
        );
    }

    #[test]
    fn test_stream_buffer_bounds() {
        let mut config = ServiceConfig::default();
        config.store.stream_buffer = MAX_STREAM_BUFFER;
        assert!(validate_config(&config).is_ok());

        config.store.stream_buffer = MAX_STREAM_BUFFER + 1;
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::StreamBufferTooLarge(MAX_STREAM_BUFFER + 1)])
        );

        config.store.stream_buffer = usize::MAX;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_prefix_rules() {
        let mut config = ServiceConfig::default();
        for (prefix, ok) in [("", true), ("/api/v1", true), ("/", false), ("v1", false)] {
            config.api.prefix = prefix.to_string();
            assert_eq!(validate_config(&config).is_ok(), ok, "prefix {:?}", prefix);
        }
    }

    #[test]
    fn test_metrics_address_ignored_when_disabled() {
        let mut config = ServiceConfig::default();
        config.observability.metrics_address = "nowhere".into();
        assert!(validate_config(&config).is_err());

        config.observability.metrics_enabled = false;
        assert!(validate_config(&config).is_ok());
    }
}
