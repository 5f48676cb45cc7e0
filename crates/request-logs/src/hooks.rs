// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::entry::PropertyValue;
use crate::request::{RequestContext, RequestPayload, Response};

/// Returns true when the request must not be logged.
pub type SkipPredicate = Arc<dyn Fn(Option<&dyn RequestContext>) -> bool + Send + Sync>;

/// Sees every call to the logger before any gate is applied.
pub type RawEventLogger = Arc<
    dyn Fn(Option<&dyn RequestContext>, Option<&RequestPayload>, Option<&Response>, Duration)
        + Send
        + Sync,
>;

/// Supplies extra properties. Keys already present on the entry win.
pub type PropertyAppender = Arc<
    dyn Fn(
            Option<&dyn RequestContext>,
            Option<&RequestPayload>,
            Option<&Response>,
            Duration,
        ) -> BTreeMap<String, PropertyValue>
        + Send
        + Sync,
>;

pub type RequestFilter = Arc<dyn Fn(&dyn RequestContext) -> bool + Send + Sync>;

/// Extension points invoked synchronously on the request thread.
///
/// Callbacks must not block. A panicking callback drops the entry being
/// built but never reaches the host.
///
/// `request_body_tracking_filter` and `response_tracking_filter` are carried
/// for hosts that configure them but are not consulted when building entries.
#[derive(Clone, Default)]
pub struct Hooks {
    pub skip_logging: Option<SkipPredicate>,
    pub raw_event_logger: Option<RawEventLogger>,
    pub append_properties: Option<PropertyAppender>,
    pub request_body_tracking_filter: Option<RequestFilter>,
    pub response_tracking_filter: Option<RequestFilter>,
}

impl Hooks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_skip_logging<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<&dyn RequestContext>) -> bool + Send + Sync + 'static,
    {
        self.skip_logging = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn with_raw_event_logger<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<&dyn RequestContext>, Option<&RequestPayload>, Option<&Response>, Duration)
            + Send
            + Sync
            + 'static,
    {
        self.raw_event_logger = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn with_append_properties<F>(mut self, f: F) -> Self
    where
        F: Fn(
                Option<&dyn RequestContext>,
                Option<&RequestPayload>,
                Option<&Response>,
                Duration,
            ) -> BTreeMap<String, PropertyValue>
            + Send
            + Sync
            + 'static,
    {
        self.append_properties = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn with_request_body_tracking_filter<F>(mut self, f: F) -> Self
    where
        F: Fn(&dyn RequestContext) -> bool + Send + Sync + 'static,
    {
        self.request_body_tracking_filter = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn with_response_tracking_filter<F>(mut self, f: F) -> Self
    where
        F: Fn(&dyn RequestContext) -> bool + Send + Sync + 'static,
    {
        self.response_tracking_filter = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("skip_logging", &self.skip_logging.is_some())
            .field("raw_event_logger", &self.raw_event_logger.is_some())
            .field("append_properties", &self.append_properties.is_some())
            .field(
                "request_body_tracking_filter",
                &self.request_body_tracking_filter.is_some(),
            )
            .field(
                "response_tracking_filter",
                &self.response_tracking_filter.is_some(),
            )
            .finish()
    }
}
