// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! AWS region names accepted for the CloudWatch Logs endpoint.
//!
//! Parsing is case-insensitive and trims whitespace; anything outside
//! [`KNOWN_REGIONS`] is rejected:
//!
//! ```
//! use request_logs::config::region::Region;
//! use std::str::FromStr;
//!
//! let region = Region::from_str(" EU-West-2 ").unwrap();
//! assert_eq!(region.as_str(), "eu-west-2");
//! assert!(Region::from_str("moon-base-1").is_err());
//! ```

use std::fmt;
use std::str::FromStr;

use crate::config::ConfigError;

/// System names of the commercial, GovCloud and China partitions.
pub const KNOWN_REGIONS: &[&str] = &[
    "af-south-1",
    "ap-east-1",
    "ap-northeast-1",
    "ap-northeast-2",
    "ap-northeast-3",
    "ap-south-1",
    "ap-south-2",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-southeast-3",
    "ap-southeast-4",
    "ap-southeast-5",
    "ap-southeast-7",
    "ca-central-1",
    "ca-west-1",
    "cn-north-1",
    "cn-northwest-1",
    "eu-central-1",
    "eu-central-2",
    "eu-north-1",
    "eu-south-1",
    "eu-south-2",
    "eu-west-1",
    "eu-west-2",
    "eu-west-3",
    "il-central-1",
    "me-central-1",
    "me-south-1",
    "mx-central-1",
    "sa-east-1",
    "us-east-1",
    "us-east-2",
    "us-gov-east-1",
    "us-gov-west-1",
    "us-west-1",
    "us-west-2",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Region(&'static str);

impl Region {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        self.0
    }

    /// Default CloudWatch Logs endpoint for this region.
    #[must_use]
    pub fn logs_endpoint(&self) -> String {
        if self.0.starts_with("cn-") {
            format!("https://logs.{}.amazonaws.com.cn", self.0)
        } else {
            format!("https://logs.{}.amazonaws.com", self.0)
        }
    }
}

impl FromStr for Region {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        KNOWN_REGIONS
            .iter()
            .copied()
            .find(|name| name.eq_ignore_ascii_case(wanted))
            .map(Region)
            .ok_or_else(|| ConfigError::InvalidRegion(s.to_string()))
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}
