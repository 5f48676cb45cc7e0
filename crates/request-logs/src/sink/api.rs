// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogGroup {
    pub log_group_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogStream {
    pub log_stream_name: String,
}

/// One event appended to a stream; `timestamp` is milliseconds since epoch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputLogEvent {
    pub timestamp: i64,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SinkApiError {
    /// A create call found the resource already present.
    #[error("resource already exists")]
    AlreadyExists,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{error_type} (status {status}): {message}")]
    Service {
        status: u16,
        error_type: String,
        message: String,
    },

    #[error("could not encode request: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("could not decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("could not sign request: {0}")]
    Signing(String),
}

/// The remote calls the sink needs from a log service.
#[async_trait]
pub trait LogSinkApi: Send + Sync {
    /// Lists groups whose name starts with `prefix`.
    async fn list_groups(&self, prefix: &str) -> Result<Vec<LogGroup>, SinkApiError>;

    async fn create_group(&self, name: &str) -> Result<(), SinkApiError>;

    async fn list_streams(&self, group: &str) -> Result<Vec<LogStream>, SinkApiError>;

    async fn create_stream(&self, group: &str, name: &str) -> Result<(), SinkApiError>;

    async fn put_events(
        &self,
        group: &str,
        stream: &str,
        events: Vec<InputLogEvent>,
    ) -> Result<(), SinkApiError>;
}
