// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! In-memory [`LogSinkApi`] used by unit tests.

#![cfg(test)]
#![allow(clippy::unwrap_used)]

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::sink::{InputLogEvent, LogGroup, LogSinkApi, LogStream, SinkApiError};

#[derive(Default)]
pub(crate) struct FakeApi {
    pub groups: Mutex<BTreeSet<String>>,
    pub streams: Mutex<BTreeSet<(String, String)>>,
    pub events: Mutex<Vec<(String, String, InputLogEvent)>>,
    pub list_group_calls: AtomicUsize,
    pub create_group_calls: AtomicUsize,
    pub create_stream_calls: AtomicUsize,
    pub put_calls: AtomicUsize,
    /// Number of upcoming `list_groups` calls that fail.
    pub fail_list_groups: Mutex<usize>,
    pub fail_puts: bool,
    pub panic_puts: bool,
    pub delay: Duration,
}

impl FakeApi {
    pub fn messages(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(_, _, e)| e.message.clone())
            .collect()
    }
}

#[async_trait]
impl LogSinkApi for FakeApi {
    async fn list_groups(&self, prefix: &str) -> Result<Vec<LogGroup>, SinkApiError> {
        self.list_group_calls.fetch_add(1, Ordering::SeqCst);
        {
            let mut failures = self.fail_list_groups.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(SinkApiError::Signing("injected failure".to_string()));
            }
        }
        tokio::time::sleep(self.delay).await;
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
        tokio::time::sleep(self.delay).await;
        if self.groups.lock().unwrap().insert(name.to_string()) {
            Ok(())
        } else {
            Err(SinkApiError::AlreadyExists)
        }
    }

    async fn list_streams(&self, group: &str) -> Result<Vec<LogStream>, SinkApiError> {
        tokio::time::sleep(self.delay).await;
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
        tokio::time::sleep(self.delay).await;
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
        group: &str,
        stream: &str,
        events: Vec<InputLogEvent>,
    ) -> Result<(), SinkApiError> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        assert!(!self.panic_puts, "put_events exploded");
        if self.fail_puts {
            return Err(SinkApiError::Service {
                status: 400,
                error_type: "InvalidParameterException".to_string(),
                message: "injected failure".to_string(),
            });
        }
        let mut stored = self.events.lock().unwrap();
        for event in events {
            stored.push((group.to_string(), stream.to_string(), event));
        }
        Ok(())
    }
}
