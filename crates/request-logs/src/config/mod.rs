// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Configuration Module
//!
//! Policy toggles, exclusion lists, sink addressing and HTTP client settings
//! for the request logger.
//!
//! ## Configuration Priority
//!
//! Sources are applied in order, later sources override earlier ones:
//!
//! 1. **Defaults** - Hard-coded defaults in [`Config::default`]
//! 2. **YAML file** - `request_logs.yaml` (if present)
//! 3. **Settings store** - keys under the `request_logs.` namespace
//! 4. **Environment variables** - `REQUEST_LOGS_*`, then the standard `AWS_*`
//!    credential variables for fields that are still unset
//!
//! A source that fails to load is logged and skipped. The resulting config
//! must pass [`Config::validate`] before the logger is registered.
//!
//! ## Edge Cases and Behaviors
//!
//! - **Flush timeout = 0**: Falls back to the default (5 seconds)
//! - **Endpoint without protocol**: `https://` is prepended
//! - **Empty strings**: Treated as missing
//! - **`HTTPS_PROXY`**: Used when no proxy is configured explicitly

pub mod env;
pub mod region;
pub mod settings;
pub mod yaml;

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Deserializer};
use serde_aux::prelude::deserialize_bool_from_anything;
use serde_json::Value;
use tracing::{debug, error};

use crate::config::env::EnvConfigSource;
use crate::config::region::Region;
use crate::config::settings::{Settings, SettingsConfigSource};
use crate::config::yaml::YamlConfigSource;
use crate::request::RequestType;

pub const CONFIG_FILE_NAME: &str = "request_logs.yaml";
pub const DEFAULT_SERVICE_NAME: &str = "request-logs";
pub const DEFAULT_FLUSH_TIMEOUT_SECS: u64 = 5;

/// Request type whose own log traffic is never logged.
pub const REQUEST_LOGS_TYPE: RequestType = RequestType::from_static("RequestLogs");
pub const AUTHENTICATE_TYPE: RequestType = RequestType::from_static("Authenticate");
pub const REGISTER_TYPE: RequestType = RequestType::from_static("Register");

/// Helper macro to merge `Option<T>` fields into `Option<T>` fields when the source is `Some`
macro_rules! merge_option {
    ($config:expr, $config_field:ident, $source:expr, $source_field:ident) => {
        if $source.$source_field.is_some() {
            $config.$config_field.clone_from(&$source.$source_field);
        }
    };
    ($config:expr, $source:expr, $field:ident) => {
        if $source.$field.is_some() {
            $config.$field.clone_from(&$source.$field);
        }
    };
}

/// Helper macro to merge `Option<T>` fields into `T` fields when the source is `Some`
macro_rules! merge_option_to_value {
    ($config:expr, $config_field:ident, $source:expr, $source_field:ident) => {
        if let Some(value) = &$source.$source_field {
            $config.$config_field = value.clone();
        }
    };
    ($config:expr, $source:expr, $field:ident) => {
        if let Some(value) = &$source.$field {
            $config.$field = value.clone();
        }
    };
}

/// Helper macro to replace a request type set with an `Option<Vec<String>>` when `Some`
///
/// An explicitly empty list clears the set.
macro_rules! merge_request_types {
    ($config:expr, $source:expr, $field:ident) => {
        if let Some(values) = &$source.$field {
            $config.$field = values
                .iter()
                .map(|v| $crate::request::RequestType::new(v.as_str()))
                .collect();
        }
    };
}

pub(crate) use {merge_option, merge_option_to_value, merge_request_types};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[allow(clippy::module_name_repetitions)]
pub enum ConfigError {
    #[error("AWS access key id is missing or empty")]
    MissingAccessKeyId,
    #[error("AWS secret access key is missing or empty")]
    MissingSecretAccessKey,
    #[error("AWS region is missing or empty")]
    MissingRegion,
    #[error("AWS region '{0}' is not a recognized region")]
    InvalidRegion(String),
    #[error("log group name is missing or empty")]
    MissingLogGroupName,
    #[error("log stream name is missing or empty")]
    MissingLogStreamName,
    #[error("endpoint url '{0}' is not a valid http(s) url")]
    InvalidEndpoint(String),
    #[error("failed to parse config: {0}")]
    ParseError(String),
}

#[allow(clippy::module_name_repetitions)]
pub trait ConfigSource {
    fn load(&self, config: &mut Config) -> Result<(), ConfigError>;
}

#[derive(Default)]
#[allow(clippy::module_name_repetitions)]
pub struct ConfigBuilder {
    sources: Vec<Box<dyn ConfigSource>>,
    config: Config,
}

#[allow(clippy::module_name_repetitions)]
impl ConfigBuilder {
    /// Starts from `config` instead of the defaults.
    #[must_use]
    pub fn from_config(config: Config) -> Self {
        ConfigBuilder {
            sources: Vec::new(),
            config,
        }
    }

    #[must_use]
    pub fn add_source(mut self, source: Box<dyn ConfigSource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn build(&mut self) -> Config {
        let mut failed_sources = 0;
        for source in &self.sources {
            match source.load(&mut self.config) {
                Ok(()) => (),
                Err(e) => {
                    error!("CONFIG | Failed to load config: {}", e);
                    failed_sources += 1;
                }
            }
        }

        if !self.sources.is_empty() && failed_sources == self.sources.len() {
            debug!("CONFIG | All sources failed to load config, using default config.");
        }

        if self.config.flush_timeout == 0 {
            self.config.flush_timeout = DEFAULT_FLUSH_TIMEOUT_SECS;
        }

        if self.config.service_name.trim().is_empty() {
            self.config.service_name = DEFAULT_SERVICE_NAME.to_string();
        }

        // If `proxy_https` is not set, set it from `HTTPS_PROXY` environment variable
        // if it exists
        if let Ok(https_proxy) = std::env::var("HTTPS_PROXY") {
            if self.config.proxy_https.is_none() && !https_proxy.trim().is_empty() {
                self.config.proxy_https = Some(https_proxy);
            }
        }

        self.config.endpoint_url = self
            .config
            .endpoint_url
            .as_deref()
            .map(normalize_url)
            .filter(|url| !url.is_empty());

        self.config.clone()
    }
}

/// Normalize a URL by ensuring it has a valid protocol
///
/// If the URL doesn't start with http:// or https://, adds https:// prefix
fn normalize_url(url: &str) -> String {
    let url = url.trim();

    if url.is_empty() || url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

#[derive(PartialEq, Clone)]
#[allow(clippy::module_name_repetitions)]
#[allow(clippy::struct_excessive_bools)]
pub struct Config {
    pub enabled: bool,
    pub session_tracking: bool,
    pub request_body_tracking: bool,
    pub response_tracking: bool,
    pub error_tracking: bool,

    // Carried for the host; not enforced when logging
    pub required_roles: Vec<String>,

    pub exclude_request_types: HashSet<RequestType>,
    pub hide_request_body_for_types: HashSet<RequestType>,

    pub service_name: String,
    pub log_level: String,

    // Sink
    pub region: Option<String>,
    pub log_group_name: Option<String>,
    pub log_stream_name: Option<String>,
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub aws_session_token: Option<String>,

    // HTTP
    pub endpoint_url: Option<String>,
    pub flush_timeout: u64,
    pub proxy_https: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: true,
            session_tracking: false,
            request_body_tracking: false,
            response_tracking: false,
            error_tracking: true,

            required_roles: Vec::new(),

            exclude_request_types: HashSet::from([REQUEST_LOGS_TYPE]),
            hide_request_body_for_types: HashSet::from([AUTHENTICATE_TYPE, REGISTER_TYPE]),

            service_name: DEFAULT_SERVICE_NAME.to_string(),
            log_level: "info".to_string(),

            region: None,
            log_group_name: None,
            log_stream_name: None,
            aws_access_key_id: None,
            aws_secret_access_key: None,
            aws_session_token: None,

            endpoint_url: None,
            flush_timeout: DEFAULT_FLUSH_TIMEOUT_SECS,
            proxy_https: None,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted = |v: &Option<String>| v.as_ref().map(|_| "***");
        f.debug_struct("Config")
            .field("enabled", &self.enabled)
            .field("session_tracking", &self.session_tracking)
            .field("request_body_tracking", &self.request_body_tracking)
            .field("response_tracking", &self.response_tracking)
            .field("error_tracking", &self.error_tracking)
            .field("required_roles", &self.required_roles)
            .field("exclude_request_types", &self.exclude_request_types)
            .field(
                "hide_request_body_for_types",
                &self.hide_request_body_for_types,
            )
            .field("service_name", &self.service_name)
            .field("log_level", &self.log_level)
            .field("region", &self.region)
            .field("log_group_name", &self.log_group_name)
            .field("log_stream_name", &self.log_stream_name)
            .field("aws_access_key_id", &self.aws_access_key_id)
            .field("aws_secret_access_key", &redacted(&self.aws_secret_access_key))
            .field("aws_session_token", &redacted(&self.aws_session_token))
            .field("endpoint_url", &self.endpoint_url)
            .field("flush_timeout", &self.flush_timeout)
            .field("proxy_https", &self.proxy_https)
            .finish()
    }
}

fn is_blank(value: Option<&String>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

impl Config {
    /// Checks everything the sink needs before the logger can be activated.
    ///
    /// Every problem is reported, not only the first one.
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();

        if is_blank(self.aws_access_key_id.as_ref()) {
            errors.push(ConfigError::MissingAccessKeyId);
        }
        if is_blank(self.aws_secret_access_key.as_ref()) {
            errors.push(ConfigError::MissingSecretAccessKey);
        }
        match self.region.as_deref().map(str::trim) {
            None | Some("") => errors.push(ConfigError::MissingRegion),
            Some(region) => {
                if let Err(e) = Region::from_str(region) {
                    errors.push(e);
                }
            }
        }
        if is_blank(self.log_group_name.as_ref()) {
            errors.push(ConfigError::MissingLogGroupName);
        }
        if is_blank(self.log_stream_name.as_ref()) {
            errors.push(ConfigError::MissingLogStreamName);
        }
        if let Some(endpoint) = &self.endpoint_url {
            let valid = reqwest::Url::parse(endpoint)
                .is_ok_and(|url| matches!(url.scheme(), "http" | "https") && url.has_host());
            if !valid {
                errors.push(ConfigError::InvalidEndpoint(endpoint.clone()));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Parsed region. Only meaningful after [`Config::validate`] passed.
    pub fn parsed_region(&self) -> Result<Region, ConfigError> {
        self.region
            .as_deref()
            .ok_or(ConfigError::MissingRegion)
            .and_then(Region::from_str)
    }

    /// Endpoint override, or the regional CloudWatch Logs endpoint.
    pub fn logs_endpoint(&self) -> Result<String, ConfigError> {
        match &self.endpoint_url {
            Some(url) => Ok(url.trim_end_matches('/').to_string()),
            None => Ok(self.parsed_region()?.logs_endpoint()),
        }
    }

    #[must_use]
    pub fn is_excluded(&self, request_type: &RequestType) -> bool {
        self.exclude_request_types.contains(request_type)
    }

    #[must_use]
    pub fn hides_body_for(&self, request_type: &RequestType) -> bool {
        self.hide_request_body_for_types.contains(request_type)
    }
}

/// Loads `request_logs.yaml` from `config_directory`, then the environment.
#[must_use]
pub fn get_config(config_directory: &Path) -> Config {
    let path = config_directory.join(CONFIG_FILE_NAME);
    ConfigBuilder::default()
        .add_source(Box::new(YamlConfigSource { path }))
        .add_source(Box::new(EnvConfigSource))
        .build()
}

/// Loads `request_logs.yaml`, then the settings store, then the environment.
#[must_use]
pub fn get_config_with_settings(config_directory: &Path, settings: Arc<dyn Settings>) -> Config {
    let path = config_directory.join(CONFIG_FILE_NAME);
    ConfigBuilder::default()
        .add_source(Box::new(YamlConfigSource { path }))
        .add_source(Box::new(SettingsConfigSource::new(settings)))
        .add_source(Box::new(EnvConfigSource))
        .build()
}

pub fn deserialize_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Null => Ok(None),
        other => {
            error!(
                "CONFIG | Failed to parse value, expected a string, got: {}, ignoring",
                other
            );
            Ok(None)
        }
    }
}

/// Strings that may have been read as numbers (keys, account ids).
pub fn deserialize_string_or_int<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Null => Ok(None),
        _ => {
            error!("CONFIG | Failed to parse value, expected a string or an integer, ignoring");
            Ok(None)
        }
    }
}

pub fn deserialize_optional_bool_from_anything<'de, D>(
    deserializer: D,
) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    // First try to deserialize as Option<_> to handle null/missing values
    let opt: Option<Value> = Option::deserialize(deserializer)?;

    match opt {
        None => Ok(None),
        Some(value) => match deserialize_bool_from_anything(value) {
            Ok(bool_result) => Ok(Some(bool_result)),
            Err(e) => {
                error!("CONFIG | Failed to parse bool value: {}, ignoring", e);
                Ok(None)
            }
        },
    }
}

/// Accepts either a list or a comma separated string.
pub fn deserialize_optional_string_list<'de, D>(
    deserializer: D,
) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(split_comma_separated(&s))),
        Value::Array(values) => Ok(Some(
            values
                .into_iter()
                .filter_map(|v| match v {
                    Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                    Value::String(_) => None,
                    other => {
                        error!("CONFIG | Failed to parse list item: {}, ignoring", other);
                        None
                    }
                })
                .collect(),
        )),
        other => {
            error!(
                "CONFIG | Failed to parse value, expected a list, got: {}, ignoring",
                other
            );
            Ok(None)
        }
    }
}

pub fn deserialize_optional_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(n.as_u64()),
        Value::String(s) => match s.trim().parse::<u64>() {
            Ok(v) => Ok(Some(v)),
            Err(e) => {
                error!("CONFIG | Failed to parse integer '{}': {}, ignoring", s, e);
                Ok(None)
            }
        },
        other => {
            error!(
                "CONFIG | Failed to parse value, expected an integer, got: {}, ignoring",
                other
            );
            Ok(None)
        }
    }
}

pub(crate) fn split_comma_separated(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}
