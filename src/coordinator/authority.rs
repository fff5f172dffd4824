//! Reference time authority
//!
//! A synchronization round needs one reference timestamp from an external
//! world-clock service. The authority is a trait so the engine can be tested
//! against a mock; the production implementation speaks the `timeapi.io`
//! JSON contract (`GET -> { "dateTime": ... }`).

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Default world-clock endpoint
pub const DEFAULT_WORLD_TIME_URL: &str =
    "https://timeapi.io/api/time/current/zone?timeZone=Etc%2FUTC";

// ============================================================================
// Authority Errors
// ============================================================================

/// Time authority errors
///
/// Any of these aborts the synchronization round that triggered the fetch;
/// there is no fallback reference.
#[derive(Error, Debug)]
pub enum AuthorityError {
    /// Service unreachable or request failed in transit
    #[error("time authority unreachable: {0}")]
    Unreachable(String),

    /// Service answered with a non-success status
    #[error("time authority returned status {0}")]
    BadStatus(u16),

    /// Response body could not be interpreted as a timestamp
    #[error("time authority payload unusable: {0}")]
    BadPayload(String),
}

// ============================================================================
// Time Authority
// ============================================================================

/// Source of the per-round reference time
#[async_trait]
pub trait TimeAuthority: Send + Sync {
    async fn reference_time(&self) -> Result<DateTime<Utc>, AuthorityError>;
}

// ============================================================================
// World Time Client
// ============================================================================

#[derive(Debug, Deserialize)]
struct WorldTimeResponse {
    #[serde(rename = "dateTime")]
    date_time: String,
}

/// HTTP client for the external world-clock service
pub struct WorldTimeClient {
    url: String,
    http: reqwest::Client,
}

impl WorldTimeClient {
    /// Create a client for the given endpoint with a bounded request timeout
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, AuthorityError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthorityError::Unreachable(e.to_string()))?;

        Ok(Self {
            url: url.into(),
            http,
        })
    }
}

#[async_trait]
impl TimeAuthority for WorldTimeClient {
    async fn reference_time(&self) -> Result<DateTime<Utc>, AuthorityError> {
        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| AuthorityError::Unreachable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthorityError::BadStatus(response.status().as_u16()));
        }

        let payload: WorldTimeResponse = response
            .json()
            .await
            .map_err(|e| AuthorityError::BadPayload(e.to_string()))?;

        parse_authority_datetime(&payload.date_time)
    }
}

/// Parse the authority's `dateTime` field.
///
/// `timeapi.io` emits a zone-less local timestamp with a variable-width
/// fractional part; some deployments front it with a proxy that answers in
/// RFC3339. Both are accepted, zone-less values are taken as UTC.
fn parse_authority_datetime(raw: &str) -> Result<DateTime<Utc>, AuthorityError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| AuthorityError::BadPayload(format!("{raw:?}: {e}")))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_rfc3339_datetime() {
        let parsed = parse_authority_datetime("2024-05-21T10:33:41Z").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 5, 21, 10, 33, 41).unwrap());
    }

    #[test]
    fn test_parse_zoneless_datetime_with_fraction() {
        let parsed = parse_authority_datetime("2024-05-21T10:33:41.1241518").unwrap();
        assert_eq!(parsed.format("%Y-%m-%dT%H:%M:%S").to_string(), "2024-05-21T10:33:41");
    }

    #[test]
    fn test_parse_zoneless_datetime_without_fraction() {
        let parsed = parse_authority_datetime("2024-05-21T10:33:41").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 5, 21, 10, 33, 41).unwrap());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let result = parse_authority_datetime("not a timestamp");
        assert!(matches!(result, Err(AuthorityError::BadPayload(_))));
    }
}
