// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! AWS Signature Version 4 request signing.
//!
//! Only what the CloudWatch Logs client needs: root path, no query string,
//! and a caller-supplied header set that already contains `host` and
//! `x-amz-date`.

use std::fmt;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::sink::SinkApiError;

type HmacSha256 = Hmac<Sha256>;

pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Basic format date time, e.g. `20150830T123600Z`.
#[must_use]
pub fn amz_date(time: &DateTime<Utc>) -> String {
    time.format("%Y%m%dT%H%M%SZ").to_string()
}

fn short_date(time: &DateTime<Utc>) -> String {
    time.format("%Y%m%d").to_string()
}

#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn hmac(key: &[u8], data: &[u8]) -> Result<Vec<u8>, SinkApiError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| SinkApiError::Signing(format!("invalid HMAC key: {e}")))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Derives the per-day signing key for `region` and `service`.
pub fn signing_key(
    secret_access_key: &str,
    date: &str,
    region: &str,
    service: &str,
) -> Result<Vec<u8>, SinkApiError> {
    let k_date = hmac(format!("AWS4{secret_access_key}").as_bytes(), date.as_bytes())?;
    let k_region = hmac(&k_date, region.as_bytes())?;
    let k_service = hmac(&k_region, service.as_bytes())?;
    hmac(&k_service, b"aws4_request")
}

/// Request parts covered by the signature.
#[derive(Debug)]
pub struct SignableRequest<'a> {
    pub method: &'a str,
    pub path: &'a str,
    pub headers: &'a [(String, String)],
    pub payload: &'a [u8],
}

impl SignableRequest<'_> {
    /// Lowercased, trimmed and sorted header lines plus the signed header list.
    fn canonical_headers(&self) -> (String, String) {
        let mut headers: Vec<(String, String)> = self
            .headers
            .iter()
            .map(|(k, v)| {
                let value = v.split_whitespace().collect::<Vec<_>>().join(" ");
                (k.to_ascii_lowercase(), value)
            })
            .collect();
        headers.sort();

        let canonical = headers
            .iter()
            .map(|(k, v)| format!("{k}:{v}\n"))
            .collect::<String>();
        let signed = headers
            .iter()
            .map(|(k, _)| k.as_str())
            .collect::<Vec<_>>()
            .join(";");
        (canonical, signed)
    }

    fn canonical_request(&self) -> (String, String) {
        let (canonical_headers, signed_headers) = self.canonical_headers();
        let request = format!(
            "{}\n{}\n\n{}\n{}\n{}",
            self.method,
            self.path,
            canonical_headers,
            signed_headers,
            sha256_hex(self.payload)
        );
        (request, signed_headers)
    }
}

/// Builds the `Authorization` header value for `request` signed at `time`.
pub fn authorization(
    credentials: &Credentials,
    region: &str,
    service: &str,
    time: &DateTime<Utc>,
    request: &SignableRequest<'_>,
) -> Result<String, SinkApiError> {
    let date = short_date(time);
    let scope = format!("{date}/{region}/{service}/aws4_request");
    let (canonical_request, signed_headers) = request.canonical_request();

    let string_to_sign = format!(
        "{ALGORITHM}\n{}\n{scope}\n{}",
        amz_date(time),
        sha256_hex(canonical_request.as_bytes())
    );

    let key = signing_key(&credentials.secret_access_key, &date, region, service)?;
    let signature = hex::encode(hmac(&key, string_to_sign.as_bytes())?);

    Ok(format!(
        "{ALGORITHM} Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
        credentials.access_key_id
    ))
}
