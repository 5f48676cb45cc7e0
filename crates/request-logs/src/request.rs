// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Host-side view of a request/response cycle.
//!
//! The host pipeline hands the logger a [`RequestContext`] (transport level
//! details), a [`RequestPayload`] (the decoded request body tagged with its
//! [`RequestType`]) and an optional [`Response`].

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Explicit tag naming the kind of request payload.
///
/// Exclusion and body-hiding policies match on this tag.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestType(Cow<'static, str>);

impl RequestType {
    #[must_use]
    pub const fn from_static(name: &'static str) -> Self {
        RequestType(Cow::Borrowed(name))
    }

    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        RequestType(Cow::Owned(name.into()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RequestType {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RequestType {
    fn from(value: &str) -> Self {
        RequestType::new(value)
    }
}

impl From<String> for RequestType {
    fn from(value: String) -> Self {
        RequestType::new(value)
    }
}

/// Decoded request body together with its type tag.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestPayload {
    pub request_type: RequestType,
    pub body: serde_json::Value,
}

impl RequestPayload {
    #[must_use]
    pub fn new(request_type: impl Into<RequestType>, body: serde_json::Value) -> Self {
        RequestPayload {
            request_type: request_type.into(),
            body,
        }
    }
}

/// Transport level accessors supplied by the host for one request.
///
/// Implementations must be cheap and side-effect free. In particular
/// [`RequestContext::existing_session`] must never create a session.
pub trait RequestContext: Send + Sync {
    fn verb(&self) -> &str;
    fn absolute_uri(&self) -> &str;
    fn path_info(&self) -> &str;
    fn remote_addr(&self) -> Option<&str>;
    fn headers(&self) -> &[(String, String)];

    /// Case-insensitive header lookup returning the first match.
    fn header(&self, name: &str) -> Option<&str> {
        self.headers()
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn cookie(&self, _name: &str) -> Option<&str> {
        None
    }

    /// Request-scoped key/value bag.
    fn items(&self) -> &BTreeMap<String, serde_json::Value>;
    fn existing_session(&self) -> Option<serde_json::Value>;
    fn session_id(&self) -> Option<&str>;
    fn user_auth_id(&self) -> Option<&str>;
    fn form_data(&self) -> Option<&BTreeMap<String, String>>;
    fn raw_body(&self) -> Option<&str>;
    fn response_status_code(&self) -> u16;
    fn response_status_description(&self) -> Option<&str>;
    fn response_status_summary(&self) -> Option<serde_json::Value>;
    fn is_response_closed(&self) -> bool;
}

/// Owned, plain-data [`RequestContext`].
///
/// Hosts that already materialize request state can fill this in directly.
#[derive(Clone, Debug, Default)]
pub struct RequestSnapshot {
    pub verb: String,
    pub absolute_uri: String,
    pub path_info: String,
    pub remote_addr: Option<String>,
    pub headers: Vec<(String, String)>,
    pub cookies: BTreeMap<String, String>,
    pub items: BTreeMap<String, serde_json::Value>,
    pub session: Option<serde_json::Value>,
    pub session_id: Option<String>,
    pub user_auth_id: Option<String>,
    pub form_data: Option<BTreeMap<String, String>>,
    pub raw_body: Option<String>,
    pub status_code: u16,
    pub status_description: Option<String>,
    pub status_summary: Option<serde_json::Value>,
    pub response_closed: bool,
}

impl RequestSnapshot {
    #[must_use]
    pub fn new(verb: &str, absolute_uri: &str, path_info: &str) -> Self {
        RequestSnapshot {
            verb: verb.to_string(),
            absolute_uri: absolute_uri.to_string(),
            path_info: path_info.to_string(),
            status_code: 200,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    #[must_use]
    pub fn with_item(mut self, key: &str, value: serde_json::Value) -> Self {
        self.items.insert(key.to_string(), value);
        self
    }

    #[must_use]
    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = status_code;
        self
    }
}

impl RequestContext for RequestSnapshot {
    fn verb(&self) -> &str {
        &self.verb
    }

    fn absolute_uri(&self) -> &str {
        &self.absolute_uri
    }

    fn path_info(&self) -> &str {
        &self.path_info
    }

    fn remote_addr(&self) -> Option<&str> {
        self.remote_addr.as_deref()
    }

    fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    fn items(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.items
    }

    fn existing_session(&self) -> Option<serde_json::Value> {
        self.session.clone()
    }

    fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    fn user_auth_id(&self) -> Option<&str> {
        self.user_auth_id.as_deref()
    }

    fn form_data(&self) -> Option<&BTreeMap<String, String>> {
        self.form_data.as_ref()
    }

    fn raw_body(&self) -> Option<&str> {
        self.raw_body.as_deref()
    }

    fn response_status_code(&self) -> u16 {
        self.status_code
    }

    fn response_status_description(&self) -> Option<&str> {
        self.status_description.as_deref()
    }

    fn response_status_summary(&self) -> Option<serde_json::Value> {
        self.status_summary.clone()
    }

    fn is_response_closed(&self) -> bool {
        self.response_closed
    }
}

/// Outcome produced by the host for a request.
#[derive(Clone, Debug, PartialEq)]
pub enum Response {
    Success(serde_json::Value),
    Error(ErrorResponse),
}

impl Response {
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error(_))
    }
}

/// Error outcome with an optional exception chain.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ErrorResponse {
    pub status_code: u16,
    pub error_code: Option<String>,
    pub message: Option<String>,
    pub stack_trace: Option<String>,
    pub exception: Option<ExceptionInfo>,
}

impl ErrorResponse {
    #[must_use]
    pub fn new(status_code: u16, error_code: &str, message: &str) -> Self {
        ErrorResponse {
            status_code,
            error_code: Some(error_code.to_string()),
            message: Some(message.to_string()),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_exception(mut self, exception: ExceptionInfo) -> Self {
        self.exception = Some(exception);
        self
    }
}

/// Captured exception, possibly wrapping an inner cause.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExceptionInfo {
    pub kind: Option<String>,
    pub message: String,
    pub source: Option<String>,
    pub data: BTreeMap<String, String>,
    pub inner: Option<Box<ExceptionInfo>>,
}

impl ExceptionInfo {
    #[must_use]
    pub fn new(kind: &str, message: &str) -> Self {
        ExceptionInfo {
            kind: Some(kind.to_string()),
            message: message.to_string(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_inner(mut self, inner: ExceptionInfo) -> Self {
        self.inner = Some(Box::new(inner));
        self
    }

    /// Captures an error and its `source()` chain.
    pub fn from_error(error: &(dyn std::error::Error + 'static)) -> Self {
        ExceptionInfo {
            kind: None,
            message: error.to_string(),
            source: None,
            data: BTreeMap::new(),
            inner: error.source().map(|s| Box::new(ExceptionInfo::from_error(s))),
        }
    }
}

impl fmt::Display for ExceptionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            Some(kind) => write!(f, "{kind}: {}", self.message)?,
            None => f.write_str(&self.message)?,
        }
        if let Some(inner) = &self.inner {
            write!(f, " ---> {inner}")?;
        }
        Ok(())
    }
}
