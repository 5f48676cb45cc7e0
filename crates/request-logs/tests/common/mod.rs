// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use request_logs::sink::{InputLogEvent, LogGroup, LogSinkApi, LogStream, SinkApiError};
use request_logs::{AppHost, Config, RequestLogger};
use serde_json::Value;

/// Log service kept in memory.
#[derive(Default)]
pub struct MemoryLogService {
    groups: Mutex<BTreeSet<String>>,
    streams: Mutex<BTreeSet<(String, String)>>,
    events: Mutex<Vec<InputLogEvent>>,
    pub create_group_calls: AtomicUsize,
    pub create_stream_calls: AtomicUsize,
}

impl MemoryLogService {
    pub fn entries(&self) -> Vec<Value> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|e| serde_json::from_str(&e.message).unwrap())
            .collect()
    }

    pub fn group_count(&self) -> usize {
        self.groups.lock().unwrap().len()
    }

    pub fn stream_count(&self) -> usize {
        self.streams.lock().unwrap().len()
    }
}

#[async_trait]
impl LogSinkApi for MemoryLogService {
    async fn list_groups(&self, prefix: &str) -> Result<Vec<LogGroup>, SinkApiError> {
        tokio::task::yield_now().await;
        Ok(self
            .groups
            .lock()
            .unwrap()
            .iter()
            .filter(|g| g.starts_with(prefix))
            .map(|g| LogGroup {
                log_group_name: g.clone(),
            })
            .collect())
    }

    async fn create_group(&self, name: &str) -> Result<(), SinkApiError> {
        self.create_group_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.groups.lock().unwrap().insert(name.to_string()) {
            Ok(())
        } else {
            Err(SinkApiError::AlreadyExists)
        }
    }

    async fn list_streams(&self, group: &str) -> Result<Vec<LogStream>, SinkApiError> {
        tokio::task::yield_now().await;
        Ok(self
            .streams
            .lock()
            .unwrap()
            .iter()
            .filter(|(g, _)| g == group)
            .map(|(_, s)| LogStream {
                log_stream_name: s.clone(),
            })
            .collect())
    }

    async fn create_stream(&self, group: &str, name: &str) -> Result<(), SinkApiError> {
        self.create_stream_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self
            .streams
            .lock()
            .unwrap()
            .insert((group.to_string(), name.to_string()))
        {
            Ok(())
        } else {
            Err(SinkApiError::AlreadyExists)
        }
    }

    async fn put_events(
        &self,
        _group: &str,
        _stream: &str,
        events: Vec<InputLogEvent>,
    ) -> Result<(), SinkApiError> {
        self.events.lock().unwrap().extend(events);
        Ok(())
    }
}

/// Host that records what the feature asked of it.
#[derive(Default)]
pub struct TestHost {
    pub calls: Vec<&'static str>,
    pub logger: Option<Arc<RequestLogger>>,
}

impl AppHost for TestHost {
    fn register_request_logger(&mut self, logger: Arc<RequestLogger>) {
        self.calls.push("register_request_logger");
        self.logger = Some(logger);
    }

    fn enable_buffered_request_body(&mut self) {
        self.calls.push("enable_buffered_request_body");
    }
}

pub fn sink_config(endpoint_url: Option<String>) -> Config {
    Config {
        region: Some("us-east-1".to_string()),
        aws_access_key_id: Some("AKIDEXAMPLE".to_string()),
        aws_secret_access_key: Some("wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".to_string()),
        log_group_name: Some("orders".to_string()),
        log_stream_name: Some("web-01".to_string()),
        endpoint_url,
        ..Default::default()
    }
}
