// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Environment variable configuration.
//!
//! Every `REQUEST_LOGS_<FIELD>` variable maps to the matching field of
//! [`EnvConfig`], e.g. `REQUEST_LOGS_LOG_GROUP=my-app`. Lists are comma
//! separated: `REQUEST_LOGS_EXCLUDE_REQUEST_TYPES=RequestLogs,Ping`.
//!
//! After the prefixed variables are applied, the standard AWS variables
//! (`AWS_REGION`, `AWS_DEFAULT_REGION`, `AWS_ACCESS_KEY_ID`,
//! `AWS_SECRET_ACCESS_KEY`, `AWS_SESSION_TOKEN`) fill fields that are still
//! unset. They never override an explicit value from any source.

use figment::{providers::Env, Figment};
use serde::Deserialize;

use crate::{
    config::{
        deserialize_optional_bool_from_anything, deserialize_optional_string,
        deserialize_optional_string_list, deserialize_optional_u64, deserialize_string_or_int,
        merge_option, merge_option_to_value, merge_request_types, Config, ConfigError,
        ConfigSource,
    },
};

pub const ENV_PREFIX: &str = "REQUEST_LOGS_";

#[derive(Debug, PartialEq, Deserialize, Clone, Default)]
#[serde(default)]
#[allow(clippy::module_name_repetitions)]
pub struct EnvConfig {
    #[serde(deserialize_with = "deserialize_optional_bool_from_anything")]
    pub enabled: Option<bool>,
    #[serde(deserialize_with = "deserialize_optional_bool_from_anything")]
    pub session_tracking: Option<bool>,
    #[serde(deserialize_with = "deserialize_optional_bool_from_anything")]
    pub request_body_tracking: Option<bool>,
    #[serde(deserialize_with = "deserialize_optional_bool_from_anything")]
    pub response_tracking: Option<bool>,
    #[serde(deserialize_with = "deserialize_optional_bool_from_anything")]
    pub error_tracking: Option<bool>,

    #[serde(deserialize_with = "deserialize_optional_string_list")]
    pub required_roles: Option<Vec<String>>,
    #[serde(deserialize_with = "deserialize_optional_string_list")]
    pub exclude_request_types: Option<Vec<String>>,
    #[serde(deserialize_with = "deserialize_optional_string_list")]
    pub hide_request_body_for_types: Option<Vec<String>>,

    #[serde(deserialize_with = "deserialize_optional_string")]
    pub service_name: Option<String>,
    #[serde(deserialize_with = "deserialize_optional_string")]
    pub log_level: Option<String>,
    #[serde(deserialize_with = "deserialize_string_or_int")]
    pub log_group: Option<String>,
    #[serde(deserialize_with = "deserialize_string_or_int")]
    pub log_stream: Option<String>,

    #[serde(deserialize_with = "deserialize_optional_string")]
    pub region: Option<String>,
    #[serde(deserialize_with = "deserialize_string_or_int")]
    pub aws_access_key_id: Option<String>,
    #[serde(deserialize_with = "deserialize_string_or_int")]
    pub aws_secret_access_key: Option<String>,
    #[serde(deserialize_with = "deserialize_string_or_int")]
    pub aws_session_token: Option<String>,
    #[serde(deserialize_with = "deserialize_optional_string")]
    pub endpoint_url: Option<String>,

    #[serde(deserialize_with = "deserialize_optional_u64")]
    pub flush_timeout: Option<u64>,
    #[serde(deserialize_with = "deserialize_optional_string")]
    pub proxy_https: Option<String>,
}

fn merge_config(config: &mut Config, env_config: &EnvConfig) {
    merge_option_to_value!(config, env_config, enabled);
    merge_option_to_value!(config, env_config, session_tracking);
    merge_option_to_value!(config, env_config, request_body_tracking);
    merge_option_to_value!(config, env_config, response_tracking);
    merge_option_to_value!(config, env_config, error_tracking);

    merge_option_to_value!(config, env_config, required_roles);
    merge_request_types!(config, env_config, exclude_request_types);
    merge_request_types!(config, env_config, hide_request_body_for_types);

    merge_option_to_value!(config, env_config, service_name);
    merge_option_to_value!(config, env_config, log_level);
    merge_option!(config, log_group_name, env_config, log_group);
    merge_option!(config, log_stream_name, env_config, log_stream);

    merge_option!(config, env_config, region);
    merge_option!(config, env_config, aws_access_key_id);
    merge_option!(config, env_config, aws_secret_access_key);
    merge_option!(config, env_config, aws_session_token);
    merge_option!(config, env_config, endpoint_url);

    merge_option_to_value!(config, env_config, flush_timeout);
    merge_option!(config, env_config, proxy_https);
}

/// Fills unset AWS fields from the standard AWS environment variables.
fn merge_aws_defaults(config: &mut Config) {
    let read = |name: &str| {
        std::env::var(name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    if config.region.is_none() {
        config.region = read("AWS_REGION").or_else(|| read("AWS_DEFAULT_REGION"));
    }
    if config.aws_access_key_id.is_none() {
        config.aws_access_key_id = read("AWS_ACCESS_KEY_ID");
    }
    if config.aws_secret_access_key.is_none() {
        config.aws_secret_access_key = read("AWS_SECRET_ACCESS_KEY");
    }
    if config.aws_session_token.is_none() {
        config.aws_session_token = read("AWS_SESSION_TOKEN");
    }
}

#[allow(clippy::module_name_repetitions)]
pub struct EnvConfigSource;

impl ConfigSource for EnvConfigSource {
    fn load(&self, config: &mut Config) -> Result<(), ConfigError> {
        let figment = Figment::new().merge(Env::prefixed(ENV_PREFIX));

        match figment.extract::<EnvConfig>() {
            Ok(env_config) => merge_config(config, &env_config),
            Err(e) => {
                return Err(ConfigError::ParseError(format!(
                    "Failed to parse config from environment variables: {e}, using default config."
                )));
            }
        }

        merge_aws_defaults(config);

        Ok(())
    }
}
