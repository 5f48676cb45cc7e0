// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use crate::config::ConfigError;
use crate::sink::SinkApiError;

/// Errors surfaced by the request logger.
///
/// Only `InvalidConfig` and `Unsupported` ever reach the host. `Build` and
/// `Delivery` are recorded as diagnostics on the logging path and the entry
/// is dropped.
#[derive(Debug, thiserror::Error)]
pub enum RequestLogsError {
    #[error("Invalid configuration: {}", join_errors(.0))]
    InvalidConfig(Vec<ConfigError>),

    #[error("Failed to build log entry: {0}")]
    Build(String),

    #[error("Failed to deliver log entry: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

fn join_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Provisioning or append failure for a single entry.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("could not provision log group '{group}': {source}")]
    ProvisionGroup {
        group: String,
        #[source]
        source: SinkApiError,
    },

    #[error("could not provision log stream '{stream}': {source}")]
    ProvisionStream {
        stream: String,
        #[source]
        source: SinkApiError,
    },

    #[error("could not encode log entry: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("could not put log events: {0}")]
    PutEvents(#[source] SinkApiError),

    #[error("delivery timed out after {0:?}")]
    Timeout(Duration),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_display_lists_every_error() {
        let error = RequestLogsError::InvalidConfig(vec![
            ConfigError::MissingAccessKeyId,
            ConfigError::InvalidRegion("mars-1".to_string()),
        ]);
        assert_eq!(
            error.to_string(),
            "Invalid configuration: AWS access key id is missing or empty; AWS region 'mars-1' is not a recognized region"
        );
    }

    #[test]
    fn test_delivery_display() {
        let error = RequestLogsError::from(DeliveryError::Timeout(Duration::from_secs(5)));
        assert_eq!(
            error.to_string(),
            "Failed to deliver log entry: delivery timed out after 5s"
        );

        let error = DeliveryError::ProvisionGroup {
            group: "orders".to_string(),
            source: SinkApiError::Service {
                status: 400,
                error_type: "AccessDeniedException".to_string(),
                message: "not allowed".to_string(),
            },
        };
        assert!(error.to_string().starts_with("could not provision log group 'orders'"));
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn test_unsupported_display() {
        let error = RequestLogsError::Unsupported("get_latest_logs".to_string());
        assert_eq!(error.to_string(), "Unsupported operation: get_latest_logs");
    }
}
