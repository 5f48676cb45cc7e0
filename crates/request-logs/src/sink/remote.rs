// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Lazily provisioned append target.
//!
//! The first append provisions the log group and stream:
//!
//! ```text
//!   NotProvisioned ──list/create group──> GroupReady
//!        GroupReady ──list/create stream──> StreamReady ──> Ready
//! ```
//!
//! Provisioning runs inside a [`OnceCell`] initializer, so concurrent first
//! appends share a single run. A failed run leaves the cell empty and the next
//! append starts over from the group listing. Creating a resource that
//! already exists counts as success, which covers other processes racing on
//! the same group and stream.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::config::{Config, ConfigError};
use crate::entry::LogEntry;
use crate::error::DeliveryError;
use crate::sink::{InputLogEvent, LogSinkApi, SinkApiError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ProvisionState {
    NotProvisioned = 0,
    GroupReady = 1,
    StreamReady = 2,
    Ready = 3,
}

impl ProvisionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ProvisionState::GroupReady,
            2 => ProvisionState::StreamReady,
            3 => ProvisionState::Ready,
            _ => ProvisionState::NotProvisioned,
        }
    }
}

pub struct RemoteSink {
    api: Arc<dyn LogSinkApi>,
    group: String,
    stream: String,
    timeout: Duration,
    provisioned: OnceCell<()>,
    state: AtomicU8,
}

impl std::fmt::Debug for RemoteSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteSink")
            .field("group", &self.group)
            .field("stream", &self.stream)
            .field("timeout", &self.timeout)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl RemoteSink {
    #[must_use]
    pub fn new(
        api: Arc<dyn LogSinkApi>,
        group: impl Into<String>,
        stream: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        RemoteSink {
            api,
            group: group.into(),
            stream: stream.into(),
            timeout,
            provisioned: OnceCell::new(),
            state: AtomicU8::new(ProvisionState::NotProvisioned as u8),
        }
    }

    /// Sink addressed by the configured group and stream, bounded by `flush_timeout`.
    pub fn from_config(api: Arc<dyn LogSinkApi>, config: &Config) -> Result<Self, ConfigError> {
        let group = config
            .log_group_name
            .clone()
            .ok_or(ConfigError::MissingLogGroupName)?;
        let stream = config
            .log_stream_name
            .clone()
            .ok_or(ConfigError::MissingLogStreamName)?;
        Ok(Self::new(
            api,
            group,
            stream,
            Duration::from_secs(config.flush_timeout),
        ))
    }

    #[must_use]
    pub fn state(&self) -> ProvisionState {
        ProvisionState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: ProvisionState) {
        self.state.store(state as u8, Ordering::Release);
    }

    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    #[must_use]
    pub fn stream(&self) -> &str {
        &self.stream
    }

    /// Makes sure the group and stream exist. Idempotent.
    pub async fn ensure_provisioned(&self) -> Result<(), DeliveryError> {
        self.provisioned
            .get_or_try_init(|| self.provision())
            .await
            .map(|_| ())
    }

    async fn provision(&self) -> Result<(), DeliveryError> {
        let group_err = |source| DeliveryError::ProvisionGroup {
            group: self.group.clone(),
            source,
        };
        let stream_err = |source| DeliveryError::ProvisionStream {
            stream: self.stream.clone(),
            source,
        };

        let groups = self.api.list_groups(&self.group).await.map_err(group_err)?;
        if groups.iter().any(|g| g.log_group_name == self.group) {
            debug!("SINK | Log group {} already exists", self.group);
        } else {
            match self.api.create_group(&self.group).await {
                Ok(()) => info!("SINK | Created log group {}", self.group),
                Err(SinkApiError::AlreadyExists) => {
                    debug!("SINK | Log group {} was created concurrently", self.group);
                }
                Err(e) => return Err(group_err(e)),
            }
        }
        self.set_state(ProvisionState::GroupReady);

        let streams = self
            .api
            .list_streams(&self.group)
            .await
            .map_err(stream_err)?;
        if streams.iter().any(|s| s.log_stream_name == self.stream) {
            debug!("SINK | Log stream {} already exists", self.stream);
        } else {
            match self.api.create_stream(&self.group, &self.stream).await {
                Ok(()) => info!(
                    "SINK | Created log stream {} in group {}",
                    self.stream, self.group
                ),
                Err(SinkApiError::AlreadyExists) => {
                    debug!("SINK | Log stream {} was created concurrently", self.stream);
                }
                Err(e) => return Err(stream_err(e)),
            }
        }
        self.set_state(ProvisionState::StreamReady);

        self.set_state(ProvisionState::Ready);
        Ok(())
    }

    /// Provisions if needed, then appends `entry` as a single event.
    ///
    /// The whole call is bounded by the sink timeout. Nothing is retried.
    pub async fn append(&self, entry: LogEntry) -> Result<(), DeliveryError> {
        let deliver = async {
            self.ensure_provisioned().await?;
            let event = InputLogEvent {
                timestamp: Utc::now().timestamp_millis(),
                message: entry.to_json()?,
            };
            self.api
                .put_events(&self.group, &self.stream, vec![event])
                .await
                .map_err(DeliveryError::PutEvents)
        };

        tokio::time::timeout(self.timeout, deliver)
            .await
            .map_err(|_| DeliveryError::Timeout(self.timeout))?
    }
}
