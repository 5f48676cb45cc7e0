// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Diagnostics output for the request logger.
//!
//! Lines are prefixed so they can be told apart from the host's own logs:
//!
//! ```text
//! REQUEST_LOGS | LEVEL | [span_name{span_fields}:] message {event_fields}
//! ```

use std::error::Error;
use std::fmt;

use tracing_core::{Event, Subscriber};
use tracing_subscriber::fmt::{
    format::{self, FormatEvent, FormatFields},
    FmtContext, FormattedFields,
};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[derive(Debug, Clone, Copy)]
pub struct Formatter;

impl<S, N> FormatEvent<S, N> for Formatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        write!(&mut writer, "REQUEST_LOGS | {} | ", metadata.level())?;

        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                write!(writer, "{}", span.name())?;

                let ext = span.extensions();
                if let Some(fields) = ext.get::<FormattedFields<N>>() {
                    if !fields.is_empty() {
                        write!(writer, "{{{fields}}}")?;
                    }
                }
                write!(writer, ": ")?;
            }
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

/// Installs the global subscriber at `level` (an `EnvFilter` directive).
///
/// Fails if the directive does not parse or a global subscriber is already set.
pub fn init(level: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
    let env_filter = format!("h2=off,hyper=off,rustls=off,{level}");

    tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::try_new(env_filter)?)
        .with_ansi(false)
        .event_format(Formatter)
        .try_init()
}

/// Installs the global subscriber at the config's `log_level`.
pub fn init_from(config: &Config) -> Result<(), Box<dyn Error + Send + Sync>> {
    init(&config.log_level)
}
