// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Activation of the request logger inside a host application.
//!
//! [`RequestLogsFeature`] owns the configuration inputs until the host calls
//! [`RequestLogsFeature::register`]. Registration validates the effective
//! config, builds the CloudWatch Logs client and the [`RequestLogger`], and
//! hands the logger to the host through [`AppHost`]. A config that fails
//! validation aborts activation with every problem listed.
//!
//! Feature setters write through to the settings store, so values set on the
//! feature and values set directly in the store by the host are equivalent.

use std::fmt;
use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::{debug, error, info};

use crate::config::settings::{keys, InMemorySettings, Settings, SettingsConfigSource};
use crate::config::{Config, ConfigBuilder, ConfigError};
use crate::dispatcher::RequestLogger;
use crate::error::RequestLogsError;
use crate::hooks::Hooks;
use crate::request::RequestType;
use crate::sink::{CloudWatchLogsClient, LogSinkApi, RemoteSink};

/// What the request logger needs from the hosting application.
pub trait AppHost {
    /// Installs the logger the host calls once per completed request.
    fn register_request_logger(&mut self, logger: Arc<RequestLogger>);

    /// Keeps raw request bodies readable after the host has parsed them.
    fn enable_buffered_request_body(&mut self);
}

pub struct RequestLogsFeature {
    settings: Arc<dyn Settings>,
    base: Config,
    hooks: Hooks,
    sink_api: Option<Arc<dyn LogSinkApi>>,
    runtime: Option<Handle>,
}

impl fmt::Debug for RequestLogsFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestLogsFeature")
            .field("base", &self.base)
            .field("hooks", &self.hooks)
            .field("custom_sink_api", &self.sink_api.is_some())
            .field("runtime", &self.runtime.is_some())
            .finish_non_exhaustive()
    }
}

impl RequestLogsFeature {
    /// Feature starting from `config`, with an empty in-memory settings store.
    #[must_use]
    pub fn new(config: Config, hooks: Hooks) -> Self {
        RequestLogsFeature {
            settings: Arc::new(InMemorySettings::default()),
            base: config,
            hooks,
            sink_api: None,
            runtime: None,
        }
    }

    /// Feature reading its values from the host's settings store.
    #[must_use]
    pub fn from_settings(settings: Arc<dyn Settings>, hooks: Hooks) -> Self {
        RequestLogsFeature {
            settings,
            base: Config::default(),
            hooks,
            sink_api: None,
            runtime: None,
        }
    }

    /// Replaces the CloudWatch Logs client with `api`.
    #[must_use]
    pub fn with_sink_api(mut self, api: Arc<dyn LogSinkApi>) -> Self {
        self.sink_api = Some(api);
        self
    }

    /// Runtime the logger delivers on when the host logs from a thread outside
    /// any runtime. Defaults to the runtime current at registration.
    #[must_use]
    pub fn with_runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    #[must_use]
    pub fn settings(&self) -> &Arc<dyn Settings> {
        &self.settings
    }

    /// Effective config: the base config overlaid with the settings store.
    #[must_use]
    pub fn config(&self) -> Config {
        ConfigBuilder::from_config(self.base.clone())
            .add_source(Box::new(SettingsConfigSource::new(Arc::clone(
                &self.settings,
            ))))
            .build()
    }

    pub fn set_enabled(&self, value: bool) {
        self.set_bool(keys::ENABLED, value);
    }

    pub fn set_session_tracking(&self, value: bool) {
        self.set_bool(keys::SESSION_TRACKING, value);
    }

    pub fn set_request_body_tracking(&self, value: bool) {
        self.set_bool(keys::REQUEST_BODY_TRACKING, value);
    }

    pub fn set_response_tracking(&self, value: bool) {
        self.set_bool(keys::RESPONSE_TRACKING, value);
    }

    pub fn set_error_tracking(&self, value: bool) {
        self.set_bool(keys::ERROR_TRACKING, value);
    }

    pub fn set_required_roles<I, S>(&self, roles: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.set_list(keys::REQUIRED_ROLES, roles);
    }

    pub fn set_exclude_request_types<I>(&self, types: I)
    where
        I: IntoIterator<Item = RequestType>,
    {
        self.set_list(keys::EXCLUDE_REQUEST_TYPES, types);
    }

    pub fn set_hide_request_body_for_types<I>(&self, types: I)
    where
        I: IntoIterator<Item = RequestType>,
    {
        self.set_list(keys::HIDE_REQUEST_BODY_FOR_TYPES, types);
    }

    pub fn set_access_key_id(&self, value: impl Into<String>) {
        self.settings.set(keys::ACCESS_KEY_ID, value.into());
    }

    pub fn set_secret_access_key(&self, value: impl Into<String>) {
        self.settings.set(keys::SECRET_ACCESS_KEY, value.into());
    }

    pub fn set_session_token(&self, value: impl Into<String>) {
        self.settings.set(keys::SESSION_TOKEN, value.into());
    }

    pub fn set_region(&self, value: impl Into<String>) {
        self.settings.set(keys::REGION, value.into());
    }

    pub fn set_log_group(&self, value: impl Into<String>) {
        self.settings.set(keys::LOG_GROUP, value.into());
    }

    pub fn set_log_stream(&self, value: impl Into<String>) {
        self.settings.set(keys::LOG_STREAM, value.into());
    }

    fn set_bool(&self, key: &str, value: bool) {
        self.settings.set(key, value.to_string());
    }

    fn set_list<I, S>(&self, key: &str, values: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = values
            .into_iter()
            .map(|v| v.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.settings.set(key, joined);
    }

    /// Validates the effective config and installs the logger in `host`.
    ///
    /// With request-body tracking on, the buffered body pre-filter is enabled
    /// before the logger is registered.
    pub fn register<H: AppHost + ?Sized>(
        &self,
        host: &mut H,
    ) -> Result<Arc<RequestLogger>, RequestLogsError> {
        let config = self.config();
        if let Err(errors) = config.validate() {
            let err = RequestLogsError::InvalidConfig(errors);
            error!("CONFIG | {}", err);
            return Err(err);
        }
        debug!("CONFIG | Activating request logs with {:?}", config);

        let invalid = |e: ConfigError| RequestLogsError::InvalidConfig(vec![e]);
        let api: Arc<dyn LogSinkApi> = match &self.sink_api {
            Some(api) => Arc::clone(api),
            None => Arc::new(CloudWatchLogsClient::from_config(&config).map_err(invalid)?),
        };
        let sink = RemoteSink::from_config(api, &config).map_err(invalid)?;

        if config.request_body_tracking {
            host.enable_buffered_request_body();
        }

        info!(
            "CONFIG | Request logs enabled, shipping to {}/{}",
            sink.group(),
            sink.stream()
        );
        let mut logger = RequestLogger::new(Arc::new(config), self.hooks.clone(), Arc::new(sink));
        if let Some(handle) = &self.runtime {
            logger = logger.with_runtime(handle.clone());
        }
        let logger = Arc::new(logger);
        host.register_request_logger(Arc::clone(&logger));
        Ok(logger)
    }
}
