// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Host settings store.
//!
//! Hosts expose their application settings through [`Settings`]; the request
//! logger reads and writes its values under the fixed `request_logs.`
//! namespace (see [`keys`]).

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use tracing::error;

use crate::config::{split_comma_separated, Config, ConfigError, ConfigSource};
use crate::request::RequestType;

/// Setting keys read by [`SettingsConfigSource`].
pub mod keys {
    pub const PREFIX: &str = "request_logs.";

    pub const ENABLED: &str = "request_logs.enabled";
    pub const ERROR_TRACKING: &str = "request_logs.errortracking.enabled";
    pub const REQUEST_BODY_TRACKING: &str = "request_logs.requestbodytracking.enabled";
    pub const SESSION_TRACKING: &str = "request_logs.sessiontracking.enabled";
    pub const RESPONSE_TRACKING: &str = "request_logs.responsetracking.enabled";
    pub const REQUIRED_ROLES: &str = "request_logs.requiredroles";
    pub const EXCLUDE_REQUEST_TYPES: &str = "request_logs.excluderequesttypes";
    pub const HIDE_REQUEST_BODY_FOR_TYPES: &str = "request_logs.hiderequestbodyfortypes";
    pub const ACCESS_KEY_ID: &str = "request_logs.aws.access_key_id";
    pub const SECRET_ACCESS_KEY: &str = "request_logs.aws.secret_access_key";
    pub const SESSION_TOKEN: &str = "request_logs.aws.session_token";
    pub const REGION: &str = "request_logs.aws.region";
    pub const LOG_GROUP: &str = "request_logs.log_group";
    pub const LOG_STREAM: &str = "request_logs.log_stream";
}

/// String key/value store owned by the host.
pub trait Settings: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
}

#[derive(Default)]
pub struct InMemorySettings {
    values: RwLock<HashMap<String, String>>,
}

impl InMemorySettings {
    #[must_use]
    pub fn new<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        InMemorySettings {
            values: RwLock::new(
                values
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }
}

impl Settings for InMemorySettings {
    fn get(&self, key: &str) -> Option<String> {
        let values = self
            .values
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        values.get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        let mut values = self
            .values
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        values.insert(key.to_string(), value);
    }
}

impl fmt::Debug for InMemorySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values = self
            .values
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut keys: Vec<&String> = values.keys().collect();
        keys.sort();
        f.debug_struct("InMemorySettings")
            .field("keys", &keys)
            .finish()
    }
}

fn parse_bool(key: &str, value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        other => {
            error!(
                "CONFIG | Failed to parse bool setting '{}' = '{}', ignoring",
                key, other
            );
            None
        }
    }
}

/// Reads the `request_logs.` keys of a [`Settings`] store.
#[allow(clippy::module_name_repetitions)]
pub struct SettingsConfigSource {
    settings: Arc<dyn Settings>,
}

impl SettingsConfigSource {
    #[must_use]
    pub fn new(settings: Arc<dyn Settings>) -> Self {
        SettingsConfigSource { settings }
    }

    fn string(&self, key: &str) -> Option<String> {
        self.settings
            .get(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn bool(&self, key: &str) -> Option<bool> {
        self.string(key).and_then(|v| parse_bool(key, &v))
    }

    fn list(&self, key: &str) -> Option<Vec<String>> {
        self.settings.get(key).map(|v| split_comma_separated(&v))
    }
}

impl ConfigSource for SettingsConfigSource {
    fn load(&self, config: &mut Config) -> Result<(), ConfigError> {
        let toggles: [(&str, &mut bool); 5] = [
            (keys::ENABLED, &mut config.enabled),
            (keys::ERROR_TRACKING, &mut config.error_tracking),
            (keys::REQUEST_BODY_TRACKING, &mut config.request_body_tracking),
            (keys::SESSION_TRACKING, &mut config.session_tracking),
            (keys::RESPONSE_TRACKING, &mut config.response_tracking),
        ];
        for (key, field) in toggles {
            if let Some(value) = self.bool(key) {
                *field = value;
            }
        }

        if let Some(roles) = self.list(keys::REQUIRED_ROLES) {
            config.required_roles = roles;
        }
        if let Some(types) = self.list(keys::EXCLUDE_REQUEST_TYPES) {
            config.exclude_request_types = types.into_iter().map(RequestType::new).collect();
        }
        if let Some(types) = self.list(keys::HIDE_REQUEST_BODY_FOR_TYPES) {
            config.hide_request_body_for_types =
                types.into_iter().map(RequestType::new).collect();
        }

        let strings: [(&str, &mut Option<String>); 6] = [
            (keys::ACCESS_KEY_ID, &mut config.aws_access_key_id),
            (keys::SECRET_ACCESS_KEY, &mut config.aws_secret_access_key),
            (keys::SESSION_TOKEN, &mut config.aws_session_token),
            (keys::REGION, &mut config.region),
            (keys::LOG_GROUP, &mut config.log_group_name),
            (keys::LOG_STREAM, &mut config.log_stream_name),
        ];
        for (key, field) in strings {
            if let Some(value) = self.string(key) {
                *field = Some(value);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_round_trip() {
        let settings = InMemorySettings::default();
        assert_eq!(settings.get(keys::REGION), None);
        settings.set(keys::REGION, "us-east-1".to_string());
        assert_eq!(settings.get(keys::REGION).as_deref(), Some("us-east-1"));
    }

    #[test]
    fn test_keys_share_namespace() {
        for key in [
            keys::ENABLED,
            keys::ERROR_TRACKING,
            keys::REQUEST_BODY_TRACKING,
            keys::SESSION_TRACKING,
            keys::RESPONSE_TRACKING,
            keys::REQUIRED_ROLES,
            keys::ACCESS_KEY_ID,
            keys::SECRET_ACCESS_KEY,
            keys::REGION,
            keys::LOG_GROUP,
            keys::LOG_STREAM,
        ] {
            assert!(key.starts_with(keys::PREFIX), "{key}");
        }
    }

    #[test]
    fn test_load_overrides_config() {
        let settings = Arc::new(InMemorySettings::new([
            (keys::ENABLED, "False"),
            (keys::RESPONSE_TRACKING, "1"),
            (keys::REQUIRED_ROLES, "Admin, Ops"),
            (keys::HIDE_REQUEST_BODY_FOR_TYPES, ""),
            (keys::REGION, " eu-west-1 "),
            (keys::LOG_GROUP, "orders"),
        ]));
        let mut config = Config::default();
        SettingsConfigSource::new(settings)
            .load(&mut config)
            .expect("settings source never fails");

        assert!(!config.enabled);
        assert!(config.response_tracking);
        assert_eq!(config.required_roles, vec!["Admin", "Ops"]);
        assert!(config.hide_request_body_for_types.is_empty());
        assert_eq!(config.region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.log_group_name.as_deref(), Some("orders"));
        assert!(config.log_stream_name.is_none());
    }

    #[test]
    fn test_invalid_bool_is_ignored() {
        let settings = Arc::new(InMemorySettings::new([(keys::ERROR_TRACKING, "sometimes")]));
        let mut config = Config::default();
        SettingsConfigSource::new(settings)
            .load(&mut config)
            .expect("settings source never fails");
        assert!(config.error_tracking);
    }

    #[test]
    fn test_debug_lists_keys_only() {
        let settings = InMemorySettings::new([(keys::SECRET_ACCESS_KEY, "shh")]);
        let debug = format!("{settings:?}");
        assert!(debug.contains(keys::SECRET_ACCESS_KEY));
        assert!(!debug.contains("shh"));
    }
}
