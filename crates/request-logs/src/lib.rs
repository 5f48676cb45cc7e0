// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! # Request Logs
//!
//! Builds one structured, policy-filtered log entry per completed HTTP
//! request and ships it to CloudWatch Logs without blocking the request path.
//!
//! ## Architecture
//!
//! - [`config`]: toggles, exclusion lists, sink addressing, layered loading
//! - [`hooks`]: host callbacks (skip, raw event, extra properties)
//! - [`entry`]: the log entry and its property tree
//! - [`request`]: what the host hands over for each request
//! - [`builder`]: request/response cycle to [`LogEntry`]
//! - [`sink`]: CloudWatch Logs client and the lazily provisioned [`RemoteSink`]
//! - [`dispatcher`]: [`RequestLogger`], gates plus fire-and-forget delivery
//! - [`feature`]: validation and registration with the host
//! - [`logger`]: diagnostics formatter and subscriber setup
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use request_logs::{AppHost, Config, Hooks, RequestLogger, RequestLogsFeature};
//!
//! struct Host(Option<Arc<RequestLogger>>);
//!
//! impl AppHost for Host {
//!     fn register_request_logger(&mut self, logger: Arc<RequestLogger>) {
//!         self.0 = Some(logger);
//!     }
//!     fn enable_buffered_request_body(&mut self) {}
//! }
//!
//! let config = Config {
//!     region: Some("us-east-1".to_string()),
//!     aws_access_key_id: Some("AKIDEXAMPLE".to_string()),
//!     aws_secret_access_key: Some("secret".to_string()),
//!     log_group_name: Some("orders".to_string()),
//!     log_stream_name: Some("web-01".to_string()),
//!     ..Default::default()
//! };
//! let mut host = Host(None);
//! RequestLogsFeature::new(config, Hooks::new())
//!     .register(&mut host)
//!     .expect("valid configuration");
//! ```

#![deny(clippy::all)]
#![deny(clippy::unwrap_used)]
#![deny(unused_extern_crates)]
#![deny(unused_allocation)]
#![deny(unused_assignments)]
#![deny(unused_comparisons)]
#![cfg_attr(
    not(test),
    deny(
        clippy::panic,
        clippy::expect_used,
        clippy::todo,
        clippy::unimplemented
    )
)]

pub mod builder;
pub mod config;
pub mod dispatcher;
pub mod entry;
pub mod error;
pub mod feature;
pub mod hooks;
pub mod http;
pub mod logger;
pub mod request;
pub mod sink;

pub use builder::{EntryBuilder, RequestCounter};
pub use config::{Config, ConfigError};
pub use dispatcher::RequestLogger;
pub use entry::{LogEntry, LogLevel, PropertyValue};
pub use error::{DeliveryError, RequestLogsError};
pub use feature::{AppHost, RequestLogsFeature};
pub use hooks::Hooks;
pub use request::{
    ErrorResponse, ExceptionInfo, RequestContext, RequestPayload, RequestSnapshot, RequestType,
    Response,
};
pub use sink::RemoteSink;
