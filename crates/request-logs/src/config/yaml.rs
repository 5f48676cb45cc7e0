// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! YAML file-based configuration.
//!
//! # Example Configuration
//!
//! ```yaml
//! enabled: true
//! error_tracking: true
//! request_body_tracking: false
//! exclude_request_types: [RequestLogs, Ping]
//! hide_request_body_for_types: [Authenticate, Register]
//! log_group: my-app-requests
//! log_stream: web-01
//! aws:
//!   region: us-east-1
//!   access_key_id: AKIDEXAMPLE
//!   secret_access_key: wJalrXUtnFEMI/K7MDENG
//! flush_timeout: 5
//! proxy:
//!   https: http://proxy.internal:3128
//! ```

use std::path::PathBuf;

use figment::{
    providers::{Format, Yaml},
    Figment,
};
use serde::Deserialize;

use crate::{
    config::{
        deserialize_optional_bool_from_anything, deserialize_optional_string,
        deserialize_optional_string_list, deserialize_optional_u64, deserialize_string_or_int,
        merge_option, merge_option_to_value, merge_request_types, Config, ConfigError,
        ConfigSource,
    },
};

/// `YamlConfig` represents the fields of `request_logs.yaml`.
#[derive(Debug, PartialEq, Deserialize, Clone, Default)]
#[serde(default)]
#[allow(clippy::module_name_repetitions)]
pub struct YamlConfig {
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
    #[serde(deserialize_with = "deserialize_optional_string")]
    pub log_group: Option<String>,
    #[serde(deserialize_with = "deserialize_optional_string")]
    pub log_stream: Option<String>,

    pub aws: AwsConfig,

    #[serde(deserialize_with = "deserialize_optional_u64")]
    pub flush_timeout: Option<u64>,

    pub proxy: ProxyConfig,
}

/// AWS credentials and addressing nested under `aws:`.
#[derive(Debug, PartialEq, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AwsConfig {
    #[serde(deserialize_with = "deserialize_optional_string")]
    pub region: Option<String>,
    #[serde(deserialize_with = "deserialize_string_or_int")]
    pub access_key_id: Option<String>,
    #[serde(deserialize_with = "deserialize_string_or_int")]
    pub secret_access_key: Option<String>,
    #[serde(deserialize_with = "deserialize_string_or_int")]
    pub session_token: Option<String>,
    #[serde(deserialize_with = "deserialize_optional_string")]
    pub endpoint_url: Option<String>,
}

/// Proxy Config
#[derive(Debug, PartialEq, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ProxyConfig {
    #[serde(deserialize_with = "deserialize_optional_string")]
    pub https: Option<String>,
}

fn merge_config(config: &mut Config, yaml_config: &YamlConfig) {
    merge_option_to_value!(config, yaml_config, enabled);
    merge_option_to_value!(config, yaml_config, session_tracking);
    merge_option_to_value!(config, yaml_config, request_body_tracking);
    merge_option_to_value!(config, yaml_config, response_tracking);
    merge_option_to_value!(config, yaml_config, error_tracking);

    merge_option_to_value!(config, yaml_config, required_roles);
    merge_request_types!(config, yaml_config, exclude_request_types);
    merge_request_types!(config, yaml_config, hide_request_body_for_types);

    merge_option_to_value!(config, yaml_config, service_name);
    merge_option_to_value!(config, yaml_config, log_level);
    merge_option!(config, log_group_name, yaml_config, log_group);
    merge_option!(config, log_stream_name, yaml_config, log_stream);

    // AWS
    merge_option!(config, region, yaml_config.aws, region);
    merge_option!(config, aws_access_key_id, yaml_config.aws, access_key_id);
    merge_option!(config, aws_secret_access_key, yaml_config.aws, secret_access_key);
    merge_option!(config, aws_session_token, yaml_config.aws, session_token);
    merge_option!(config, endpoint_url, yaml_config.aws, endpoint_url);

    merge_option_to_value!(config, yaml_config, flush_timeout);

    // Proxy
    merge_option!(config, proxy_https, yaml_config.proxy, https);
}

#[derive(Debug, PartialEq, Clone)]
#[allow(clippy::module_name_repetitions)]
pub struct YamlConfigSource {
    pub path: PathBuf,
}

impl ConfigSource for YamlConfigSource {
    fn load(&self, config: &mut Config) -> Result<(), ConfigError> {
        let figment = Figment::new().merge(Yaml::file(self.path.clone()));

        match figment.extract::<YamlConfig>() {
            Ok(yaml_config) => merge_config(config, &yaml_config),
            Err(e) => {
                return Err(ConfigError::ParseError(format!(
                    "Failed to parse config from yaml file: {e}, using default config."
                )));
            }
        }

        Ok(())
    }
}
