//! Synchronization engine
//!
//! One synchronization round implements a simplified Berkeley-style
//! averaging pass: fetch a reference time from the external authority, poll
//! every registered node's clock, average the observed offsets, then push a
//! per-node correction that moves each clock toward the mean.
//!
//! The protocol is deliberately best-effort and non-atomic: a node that
//! cannot be polled is excluded from the round, a node that misses its
//! correction stays unsynchronized until the next round, and nothing rolls
//! back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::coordinator::authority::{AuthorityError, TimeAuthority};
use crate::coordinator::client::ClientError;
use crate::coordinator::registry::{Instance, InstanceRegistry};
use crate::journal::Journal;
use crate::metrics;

// ============================================================================
// Offset Math
// ============================================================================

/// One node's observation within a round
#[derive(Debug, Clone)]
pub struct Offset {
    pub instance: Instance,
    pub observed: DateTime<Utc>,
    pub offset_seconds: f64,
}

/// Signed offset of an observed clock against the reference, in seconds
pub fn offset_seconds(observed: DateTime<Utc>, reference: DateTime<Utc>) -> f64 {
    (observed - reference).num_milliseconds() as f64 / 1000.0
}

/// Arithmetic mean of the collected offsets; `None` when nothing was polled
pub fn average_offset(offsets: &[Offset]) -> Option<f64> {
    if offsets.is_empty() {
        return None;
    }
    let sum: f64 = offsets.iter().map(|o| o.offset_seconds).sum();
    Some(sum / offsets.len() as f64)
}

/// Correction that moves one node's clock onto the round average
pub fn correction_for(average: f64, offset: &Offset) -> f64 {
    average - offset.offset_seconds
}

// ============================================================================
// Sync Errors
// ============================================================================

/// Synchronization round errors
///
/// Failures local to one instance never appear here: they are journaled and
/// the round continues. Only round-level preconditions abort.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Reference time unobtainable; there is no fallback reference
    #[error("reference time unobtainable: {0}")]
    TimeAuthority(#[from] AuthorityError),

    /// Zero instances could be polled, so there is no average to compute
    #[error("no instances available for synchronization")]
    NoInstancesAvailable,

    /// Engine could not be constructed
    #[error("initialization error: {0}")]
    InitError(String),
}

// ============================================================================
// Round Report
// ============================================================================

/// Outcome of one synchronization round
#[derive(Debug, Clone, Serialize)]
pub struct RoundReport {
    pub reference_time: DateTime<Utc>,
    pub polled: usize,
    pub failed_polls: usize,
    pub average_offset: f64,
    pub corrected: usize,
    pub failed_corrections: usize,
}

// ============================================================================
// Sync Engine
// ============================================================================

#[derive(Debug, Deserialize)]
struct TimeResponse {
    time: DateTime<Utc>,
}

/// Executes synchronization rounds on external trigger
///
/// No round-level mutual exclusion: two concurrent triggers interleave their
/// polling phases, which the protocol accepts.
pub struct SyncEngine {
    registry: Arc<InstanceRegistry>,
    journal: Arc<Journal>,
    authority: Arc<dyn TimeAuthority>,
    http: reqwest::Client,
}

impl SyncEngine {
    /// Create an engine with a bounded per-call timeout for node traffic
    pub fn new(
        registry: Arc<InstanceRegistry>,
        journal: Arc<Journal>,
        authority: Arc<dyn TimeAuthority>,
        timeout: Duration,
    ) -> Result<Self, SyncError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::InitError(e.to_string()))?;

        Ok(Self {
            registry,
            journal,
            authority,
            http,
        })
    }

    /// Run one complete synchronization round
    pub async fn run_round(&self) -> Result<RoundReport, SyncError> {
        metrics::inc_sync_rounds();

        let reference = match self.authority.reference_time().await {
            Ok(reference) => reference,
            Err(e) => {
                self.journal
                    .record(format!("Error fetching reference time: {e}"))
                    .await;
                metrics::inc_sync_round_failures();
                return Err(e.into());
            }
        };

        let instances = self.registry.list().await;
        let mut offsets = Vec::with_capacity(instances.len());
        let mut failed_polls = 0;

        for instance in instances {
            match self.poll_instance(&instance).await {
                Ok(observed) => {
                    self.journal
                        .record(format!(
                            "Instance {instance} reports {}",
                            observed.to_rfc3339()
                        ))
                        .await;
                    offsets.push(Offset {
                        offset_seconds: offset_seconds(observed, reference),
                        instance,
                        observed,
                    });
                }
                Err(e) => {
                    failed_polls += 1;
                    metrics::inc_poll_failures();
                    self.journal
                        .record(format!("Failed to read time from instance {instance}: {e}"))
                        .await;
                }
            }
        }

        let Some(average) = average_offset(&offsets) else {
            self.journal
                .record("No instances available for synchronization")
                .await;
            metrics::inc_sync_round_failures();
            return Err(SyncError::NoInstancesAvailable);
        };

        let mut corrected = 0;
        let mut failed_corrections = 0;

        for offset in &offsets {
            let correction = correction_for(average, offset);
            match self.push_correction(&offset.instance, correction).await {
                Ok(()) => {
                    corrected += 1;
                    self.journal
                        .record(format!(
                            "Synchronized {} with correction {correction:.3} seconds",
                            offset.instance
                        ))
                        .await;
                }
                Err(e) => {
                    failed_corrections += 1;
                    self.journal
                        .record(format!(
                            "Failed to synchronize instance {}: {e}",
                            offset.instance
                        ))
                        .await;
                }
            }
        }

        metrics::inc_corrections_pushed(corrected as u64);

        Ok(RoundReport {
            reference_time: reference,
            polled: offsets.len(),
            failed_polls,
            average_offset: average,
            corrected,
            failed_corrections,
        })
    }

    /// Read one node's current clock value
    async fn poll_instance(&self, instance: &Instance) -> Result<DateTime<Utc>, ClientError> {
        let url = format!("{}/time", instance.base_url());

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ClientError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ClientError::HttpError {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let payload: TimeResponse = response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(e.to_string()))?;

        Ok(payload.time)
    }

    /// Push one node's correction to its `/sync` endpoint
    async fn push_correction(
        &self,
        instance: &Instance,
        correction: f64,
    ) -> Result<(), ClientError> {
        let url = format!("{}/sync", instance.base_url());
        let body = serde_json::json!({ "offset": correction });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ClientError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ClientError::HttpError {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
