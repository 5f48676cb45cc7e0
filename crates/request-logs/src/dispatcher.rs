// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Request logger entry point.
//!
//! [`RequestLogger::log`] runs on the host's request thread. It applies the
//! gates, builds the entry and hands it to a tracked delivery task without
//! awaiting it:
//!
//! ```text
//! raw event hook -> enabled? -> skip hook? -> excluded type? -> build -> spawn append
//! ```
//!
//! Nothing the logger does can fail the request. Build panics and delivery
//! failures end up as `error!` diagnostics and the entry is dropped.
//!
//! Deliveries run on the runtime current at `log` time, else on the runtime
//! the logger was built in. Host threads outside any runtime can log as long
//! as one of the two exists.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::Mutex;
use tokio_util::task::TaskTracker;
use tracing::{debug, error};

use crate::builder::{EntryBuilder, RequestCounter};
use crate::config::Config;
use crate::entry::LogEntry;
use crate::error::RequestLogsError;
use crate::hooks::Hooks;
use crate::request::{RequestContext, RequestPayload, Response};
use crate::sink::RemoteSink;

#[derive(Debug)]
pub struct RequestLogger {
    config: Arc<Config>,
    hooks: Hooks,
    builder: EntryBuilder,
    sink: Arc<RemoteSink>,
    tracker: TaskTracker,
    runtime: Option<Handle>,
    flush_lock: Mutex<()>,
}

impl RequestLogger {
    #[must_use]
    pub fn new(config: Arc<Config>, hooks: Hooks, sink: Arc<RemoteSink>) -> Self {
        Self::with_counter(config, hooks, sink, Arc::new(RequestCounter::new()))
    }

    /// Logger sharing `counter` with other loggers in the process.
    #[must_use]
    pub fn with_counter(
        config: Arc<Config>,
        hooks: Hooks,
        sink: Arc<RemoteSink>,
        counter: Arc<RequestCounter>,
    ) -> Self {
        let builder = EntryBuilder::new(Arc::clone(&config), hooks.clone(), counter);
        RequestLogger {
            config,
            hooks,
            builder,
            sink,
            tracker: TaskTracker::new(),
            runtime: Handle::try_current().ok(),
            flush_lock: Mutex::new(()),
        }
    }

    /// Runs deliveries on `handle` when `log` is called outside a runtime.
    #[must_use]
    pub fn with_runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Records one request/response cycle. Returns before delivery completes.
    pub fn log(
        &self,
        ctx: Option<&dyn RequestContext>,
        payload: Option<&RequestPayload>,
        response: Option<&Response>,
        duration: Duration,
    ) {
        if let Some(raw) = &self.hooks.raw_event_logger {
            if let Err(panic) =
                catch_unwind(AssertUnwindSafe(|| raw(ctx, payload, response, duration)))
            {
                error!(
                    "DISPATCH | Raw event hook panicked: {}",
                    panic_message(panic.as_ref())
                );
            }
        }

        let built = catch_unwind(AssertUnwindSafe(|| {
            self.gate_and_build(ctx, payload, response, duration)
        }));
        match built {
            Ok(Some(entry)) => self.dispatch(entry),
            Ok(None) => {}
            Err(panic) => {
                let err = RequestLogsError::Build(panic_message(panic.as_ref()));
                error!("DISPATCH | {}, dropping entry", err);
            }
        }
    }

    fn gate_and_build(
        &self,
        ctx: Option<&dyn RequestContext>,
        payload: Option<&RequestPayload>,
        response: Option<&Response>,
        duration: Duration,
    ) -> Option<LogEntry> {
        if !self.config.enabled {
            return None;
        }

        if let Some(skip) = &self.hooks.skip_logging {
            if skip(ctx) {
                debug!("DISPATCH | Request skipped by hook");
                return None;
            }
        }

        if let Some(payload) = payload {
            if self.config.is_excluded(&payload.request_type) {
                debug!(
                    "DISPATCH | Request type {} is excluded",
                    payload.request_type
                );
                return None;
            }
        }

        Some(self.builder.build(ctx, payload, response, duration))
    }

    fn dispatch(&self, entry: LogEntry) {
        let Some(handle) = Handle::try_current().ok().or_else(|| self.runtime.clone()) else {
            error!("DISPATCH | No async runtime available, dropping entry");
            return;
        };

        let sink = Arc::clone(&self.sink);
        let delivery = handle.spawn(async move {
            if let Err(e) = sink.append(entry).await {
                let err = RequestLogsError::from(e);
                error!("DISPATCH | {}", err);
            }
        });
        // The tracked task owns the delivery so that flush also waits on it.
        self.tracker.spawn_on(
            async move {
                if let Err(e) = delivery.await {
                    if e.is_panic() {
                        error!(
                            "DISPATCH | Delivery task panicked: {}",
                            panic_message(e.into_panic().as_ref())
                        );
                    }
                }
            },
            &handle,
        );
    }

    /// Log retrieval is not supported by this sink.
    pub fn get_latest_logs(&self, take: Option<usize>) -> Result<Vec<LogEntry>, RequestLogsError> {
        Err(RequestLogsError::Unsupported(format!(
            "get_latest_logs(take: {take:?}) is not available for CloudWatch request logs"
        )))
    }

    /// Waits until every delivery spawned so far has finished.
    ///
    /// Concurrent flushes run one after the other; entries logged while a
    /// flush waits are tracked and awaited by that same flush.
    pub async fn flush(&self) {
        let _guard = self.flush_lock.lock().await;
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Deliveries spawned but not yet finished.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    #[must_use]
    pub fn sink(&self) -> &Arc<RemoteSink> {
        &self.sink
    }

    #[must_use]
    pub fn counter(&self) -> &Arc<RequestCounter> {
        self.builder.counter()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
