// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Remote log sink.
//!
//! - [`api`]: the five remote calls ([`LogSinkApi`]) and their data types
//! - [`cloudwatch`]: CloudWatch Logs implementation of [`LogSinkApi`]
//! - [`sigv4`]: AWS Signature Version 4 signing used by the client
//! - [`remote`]: [`RemoteSink`], lazy provisioning plus append

pub mod api;
pub mod cloudwatch;
#[cfg(test)]
pub(crate) mod fake;
pub mod remote;
pub mod sigv4;

pub use api::{InputLogEvent, LogGroup, LogSinkApi, LogStream, SinkApiError};
pub use cloudwatch::CloudWatchLogsClient;
pub use remote::{ProvisionState, RemoteSink};
