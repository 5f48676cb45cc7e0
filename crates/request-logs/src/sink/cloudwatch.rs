// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! CloudWatch Logs client speaking the AWS JSON 1.1 protocol.
//!
//! Every call is a signed `POST /` whose operation is named by the
//! `X-Amz-Target` header:
//!
//! ```text
//!   POST / HTTP/1.1
//!   Host: logs.us-east-1.amazonaws.com
//!   Content-Type: application/x-amz-json-1.1
//!   X-Amz-Target: Logs_20140328.PutLogEvents
//!   X-Amz-Date: 20250301T100000Z
//!   Authorization: AWS4-HMAC-SHA256 Credential=.../us-east-1/logs/aws4_request, ...
//!
//!   {"logGroupName":"...","logStreamName":"...","logEvents":[...]}
//! ```
//!
//! Failures come back as `{"__type": "...#ResourceAlreadyExistsException", "message": "..."}`.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::AUTHORIZATION;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{Config, ConfigError};
use crate::http::get_client;
use crate::sink::sigv4::{self, Credentials, SignableRequest};
use crate::sink::{InputLogEvent, LogGroup, LogSinkApi, LogStream, SinkApiError};

pub const SERVICE: &str = "logs";
const TARGET_PREFIX: &str = "Logs_20140328";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";
const ALREADY_EXISTS: &str = "ResourceAlreadyExistsException";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DescribeLogGroupsRequest<'a> {
    log_group_name_prefix: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_token: Option<String>,
}

#[derive(Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct DescribeLogGroupsResponse {
    log_groups: Vec<LogGroup>,
    next_token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DescribeLogStreamsRequest<'a> {
    log_group_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_token: Option<String>,
}

#[derive(Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct DescribeLogStreamsResponse {
    log_streams: Vec<LogStream>,
    next_token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateLogGroupRequest<'a> {
    log_group_name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateLogStreamRequest<'a> {
    log_group_name: &'a str,
    log_stream_name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PutLogEventsRequest<'a> {
    log_group_name: &'a str,
    log_stream_name: &'a str,
    log_events: Vec<InputLogEvent>,
}

#[derive(Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PutLogEventsResponse {
    rejected_log_events_info: Option<serde_json::Value>,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct ServiceErrorBody {
    #[serde(rename = "__type")]
    error_type: Option<String>,
    #[serde(alias = "Message")]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Empty {}

/// Maps an error response to [`SinkApiError`].
fn service_error(status: u16, body: &[u8]) -> SinkApiError {
    let parsed: ServiceErrorBody = serde_json::from_slice(body).unwrap_or_default();
    let error_type = parsed
        .error_type
        .as_deref()
        .map(|t| t.rsplit('#').next().unwrap_or(t).to_string())
        .unwrap_or_else(|| "UnknownError".to_string());

    if error_type == ALREADY_EXISTS {
        return SinkApiError::AlreadyExists;
    }

    SinkApiError::Service {
        status,
        error_type,
        message: parsed
            .message
            .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned()),
    }
}

#[derive(Debug, Clone)]
pub struct CloudWatchLogsClient {
    client: reqwest::Client,
    endpoint: reqwest::Url,
    host: String,
    region: String,
    credentials: Credentials,
}

impl CloudWatchLogsClient {
    pub fn new(
        client: reqwest::Client,
        endpoint: &str,
        region: &str,
        credentials: Credentials,
    ) -> Result<Self, ConfigError> {
        let endpoint = reqwest::Url::parse(endpoint)
            .map_err(|_| ConfigError::InvalidEndpoint(endpoint.to_string()))?;
        let Some(host) = endpoint.host_str() else {
            return Err(ConfigError::InvalidEndpoint(endpoint.to_string()));
        };
        let host = match endpoint.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };

        Ok(CloudWatchLogsClient {
            client,
            endpoint,
            host,
            region: region.to_string(),
            credentials,
        })
    }

    /// Client for the configured region, endpoint and credentials.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let region = config.parsed_region()?;
        let credentials = Credentials {
            access_key_id: config
                .aws_access_key_id
                .clone()
                .ok_or(ConfigError::MissingAccessKeyId)?,
            secret_access_key: config
                .aws_secret_access_key
                .clone()
                .ok_or(ConfigError::MissingSecretAccessKey)?,
            session_token: config.aws_session_token.clone(),
        };
        Self::new(
            get_client(config),
            &config.logs_endpoint()?,
            region.as_str(),
            credentials,
        )
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    async fn call<Req, Resp>(&self, operation: &str, body: &Req) -> Result<Resp, SinkApiError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let payload = serde_json::to_vec(body).map_err(SinkApiError::Encode)?;
        let now = Utc::now();

        let mut headers = vec![
            ("content-type".to_string(), CONTENT_TYPE.to_string()),
            ("host".to_string(), self.host.clone()),
            ("x-amz-date".to_string(), sigv4::amz_date(&now)),
            (
                "x-amz-target".to_string(),
                format!("{TARGET_PREFIX}.{operation}"),
            ),
        ];
        if let Some(token) = &self.credentials.session_token {
            headers.push(("x-amz-security-token".to_string(), token.clone()));
        }

        let authorization = sigv4::authorization(
            &self.credentials,
            &self.region,
            SERVICE,
            &now,
            &SignableRequest {
                method: "POST",
                path: self.endpoint.path(),
                headers: &headers,
                payload: &payload,
            },
        )?;

        // reqwest derives Host from the url, matching the signed value
        let mut request = self
            .client
            .post(self.endpoint.clone())
            .header(AUTHORIZATION, authorization);
        for (name, value) in headers.iter().filter(|(name, _)| name != "host") {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.body(payload).send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            let error = service_error(status.as_u16(), &bytes);
            debug!("SINK | {} failed: {}", operation, error);
            return Err(error);
        }

        let body: &[u8] = if bytes.is_empty() { b"{}" } else { &bytes };
        Ok(serde_json::from_slice(body)?)
    }
}

#[async_trait]
impl LogSinkApi for CloudWatchLogsClient {
    async fn list_groups(&self, prefix: &str) -> Result<Vec<LogGroup>, SinkApiError> {
        let mut groups = Vec::new();
        let mut next_token = None;
        loop {
            let request = DescribeLogGroupsRequest {
                log_group_name_prefix: prefix,
                next_token: next_token.clone(),
            };
            let page: DescribeLogGroupsResponse = self.call("DescribeLogGroups", &request).await?;
            groups.extend(page.log_groups);
            match page.next_token {
                Some(token) if !token.is_empty() && Some(&token) != next_token.as_ref() => {
                    next_token = Some(token);
                }
                _ => return Ok(groups),
            }
        }
    }

    async fn create_group(&self, name: &str) -> Result<(), SinkApiError> {
        let _: Empty = self
            .call(
                "CreateLogGroup",
                &CreateLogGroupRequest {
                    log_group_name: name,
                },
            )
            .await?;
        Ok(())
    }

    async fn list_streams(&self, group: &str) -> Result<Vec<LogStream>, SinkApiError> {
        let mut streams = Vec::new();
        let mut next_token = None;
        loop {
            let request = DescribeLogStreamsRequest {
                log_group_name: group,
                next_token: next_token.clone(),
            };
            let page: DescribeLogStreamsResponse =
                self.call("DescribeLogStreams", &request).await?;
            streams.extend(page.log_streams);
            match page.next_token {
                Some(token) if !token.is_empty() && Some(&token) != next_token.as_ref() => {
                    next_token = Some(token);
                }
                _ => return Ok(streams),
            }
        }
    }

    async fn create_stream(&self, group: &str, name: &str) -> Result<(), SinkApiError> {
        let _: Empty = self
            .call(
                "CreateLogStream",
                &CreateLogStreamRequest {
                    log_group_name: group,
                    log_stream_name: name,
                },
            )
            .await?;
        Ok(())
    }

    async fn put_events(
        &self,
        group: &str,
        stream: &str,
        events: Vec<InputLogEvent>,
    ) -> Result<(), SinkApiError> {
        let response: PutLogEventsResponse = self
            .call(
                "PutLogEvents",
                &PutLogEventsRequest {
                    log_group_name: group,
                    log_stream_name: stream,
                    log_events: events,
                },
            )
            .await?;
        if let Some(rejected) = response.rejected_log_events_info {
            warn!("SINK | Log events rejected by {}: {}", self.host, rejected);
        }
        Ok(())
    }
}
