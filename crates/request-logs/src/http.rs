// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! HTTP client used to reach the log service.
//!
//! The client carries:
//! - **Timeouts**: `flush_timeout` seconds per request
//! - **Connection pooling**: 270s idle timeout and 120s TCP keep-alive
//! - **Proxy support**: `proxy_https` (or `HTTPS_PROXY`) for HTTPS traffic
//!
//! An unusable proxy setting is logged and the client falls back to a direct
//! connection, so a bad proxy never disables request logging by itself.

use core::time::Duration;
use std::error::Error;

use tracing::error;

use crate::config::Config;

#[must_use]
pub fn get_client(config: &Config) -> reqwest::Client {
    match build_client(config, true) {
        Ok(client) => client,
        Err(e) => {
            error!(
                "HTTP | Unable to parse proxy configuration: {}, falling back to direct connection",
                e
            );
            match build_client(config, false) {
                Ok(client) => client,
                Err(inner) => {
                    error!(
                        "HTTP | Failed to build HTTP client without proxy: {}, using reqwest defaults",
                        inner
                    );
                    reqwest::Client::new()
                }
            }
        }
    }
}

fn build_client(config: &Config, allow_proxy: bool) -> Result<reqwest::Client, Box<dyn Error>> {
    let mut client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.flush_timeout))
        .pool_idle_timeout(Some(Duration::from_secs(270)))
        .tcp_keepalive(Some(Duration::from_secs(120)));

    if allow_proxy {
        if let Some(https_uri) = &config.proxy_https {
            let proxy = reqwest::Proxy::https(https_uri.clone())?;
            client = client.proxy(proxy);
        }
    }

    Ok(client.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_client_with_defaults() {
        assert!(build_client(&Config::default(), true).is_ok());
    }

    #[test]
    fn test_invalid_proxy_is_rejected() {
        let config = Config {
            proxy_https: Some("::not a url::".to_string()),
            ..Default::default()
        };
        assert!(build_client(&config, true).is_err());
        assert!(build_client(&config, false).is_ok());
    }

    #[test]
    fn test_get_client_falls_back_without_proxy() {
        let config = Config {
            proxy_https: Some("::not a url::".to_string()),
            ..Default::default()
        };
        let _client = get_client(&config);
    }
}
