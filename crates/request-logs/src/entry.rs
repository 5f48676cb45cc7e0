// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Structured log record produced for one request/response cycle.
//!
//! A [`LogEntry`] carries a property bag keyed by field name. Keys are unique
//! and always iterate in lexicographic order, both in memory and once encoded
//! to JSON, so downstream queries see a stable layout:
//!
//! ```text
//! {
//!   "timestamp": "2025-03-01T10:00:00.000000Z",
//!   "level": "Debug",
//!   "messageTemplate": "HTTP {httpMethod} {pathInfo} responded {statusCode} in {elapsedMilliseconds}ms",
//!   "properties": { "absoluteUri": "...", "elapsedMilliseconds": 12.5, ... }
//! }
//! ```

use std::collections::BTreeMap;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

/// Message template used when nothing more specific applies.
pub const DEFAULT_MESSAGE_TEMPLATE: &str = "Request Logs CloudWatch feature";

/// Severity of a request log entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum LogLevel {
    #[default]
    Debug,
    Warning,
    Error,
}

/// Heterogeneous value stored in the property bag.
///
/// `Opaque` holds an already-serialized object graph (request and response
/// bodies, sessions) that is emitted as-is.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    List(Vec<PropertyValue>),
    Map(BTreeMap<String, PropertyValue>),
    Opaque(serde_json::Value),
}

impl PropertyValue {
    /// Returns true when this value is the string `value`.
    #[must_use]
    pub fn is_str(&self, value: &str) -> bool {
        match self {
            PropertyValue::String(s) => s == value,
            PropertyValue::Opaque(serde_json::Value::String(s)) => s == value,
            _ => false,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropertyValue::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<&String> for PropertyValue {
    fn from(value: &String) -> Self {
        PropertyValue::String(value.clone())
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<u16> for PropertyValue {
    fn from(value: u16) -> Self {
        PropertyValue::Number(value.into())
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Number(value.into())
    }
}

impl From<u64> for PropertyValue {
    fn from(value: u64) -> Self {
        PropertyValue::Number(value.into())
    }
}

/// Non-finite floats have no JSON representation and become `Null`.
impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        serde_json::Number::from_f64(value).map_or(PropertyValue::Null, PropertyValue::Number)
    }
}

impl From<serde_json::Value> for PropertyValue {
    fn from(value: serde_json::Value) -> Self {
        PropertyValue::Opaque(value)
    }
}

impl<T: Into<PropertyValue>> From<Option<T>> for PropertyValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(PropertyValue::Null, Into::into)
    }
}

impl<T: Into<PropertyValue>> From<BTreeMap<String, T>> for PropertyValue {
    fn from(value: BTreeMap<String, T>) -> Self {
        PropertyValue::Map(value.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl<T: Into<PropertyValue>> From<Vec<T>> for PropertyValue {
    fn from(value: Vec<T>) -> Self {
        PropertyValue::List(value.into_iter().map(Into::into).collect())
    }
}

/// A single request log record.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    timestamp: String,
    level: LogLevel,
    message_template: String,
    properties: BTreeMap<String, PropertyValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exception: Option<String>,
}

impl Default for LogEntry {
    fn default() -> Self {
        Self::new()
    }
}

impl LogEntry {
    /// Creates an empty entry stamped with the current UTC time.
    #[must_use]
    pub fn new() -> Self {
        LogEntry {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            level: LogLevel::default(),
            message_template: DEFAULT_MESSAGE_TEMPLATE.to_string(),
            properties: BTreeMap::new(),
            exception: None,
        }
    }

    #[must_use]
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    #[must_use]
    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn set_level(&mut self, level: LogLevel) {
        self.level = level;
    }

    #[must_use]
    pub fn message_template(&self) -> &str {
        &self.message_template
    }

    pub fn set_message_template(&mut self, template: impl Into<String>) {
        self.message_template = template.into();
    }

    #[must_use]
    pub fn exception(&self) -> Option<&str> {
        self.exception.as_deref()
    }

    pub fn set_exception(&mut self, exception: impl Into<String>) {
        self.exception = Some(exception.into());
    }

    #[must_use]
    pub fn properties(&self) -> &BTreeMap<String, PropertyValue> {
        &self.properties
    }

    #[must_use]
    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// Adds `key` only when it is not already present. Returns whether the
    /// value was stored.
    pub fn insert_if_absent(
        &mut self,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> bool {
        let key = key.into();
        if self.properties.contains_key(&key) {
            return false;
        }
        self.properties.insert(key, value.into());
        true
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Returns true when any top-level property holds exactly the string `value`.
    #[must_use]
    pub fn contains_str_value(&self, value: &str) -> bool {
        self.properties.values().any(|v| v.is_str(value))
    }

    /// Encodes the entry as a single JSON document.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
