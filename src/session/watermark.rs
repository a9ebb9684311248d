//! Watermark: the last instant up to which a source is known to be fully indexed
//!
//! Stored in the parameter store as a decimal epoch-seconds string. A missing
//! parameter reads as [`Watermark::UNSET`], which means "crawl everything".

use crate::storage::{ParameterStore, StoreError};
use crate::SyncError;
use chrono::{DateTime, TimeZone, Utc};
use std::fmt;
use std::time::Duration;

/// Epoch-seconds watermark
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Watermark(f64);

impl Watermark {
    /// Value used when no watermark has been stored yet
    pub const UNSET: Watermark = Watermark(1.0);

    pub fn from_epoch_secs(secs: f64) -> Self {
        Self(secs)
    }

    /// Current wall-clock time
    pub fn now() -> Self {
        let now = Utc::now();
        Self(now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) / 1_000_000.0)
    }

    pub fn epoch_secs(&self) -> f64 {
        self.0
    }

    pub fn is_unset(&self) -> bool {
        self.0 <= Self::UNSET.0
    }

    /// Lower bound for the change filter: the watermark minus `buffer`
    ///
    /// Returns `None` when no watermark is stored, i.e. no filter applies.
    pub fn filter_boundary(&self, buffer: Duration) -> Option<DateTime<Utc>> {
        if self.is_unset() {
            return None;
        }
        let secs = self.0 - buffer.as_secs_f64();
        let whole = secs.floor();
        let nanos = ((secs - whole) * 1_000_000_000.0) as u32;
        Utc.timestamp_opt(whole as i64, nanos).single()
    }

    pub fn parse(value: &str) -> Option<Self> {
        value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Self)
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reads the watermark stored under `name`
///
/// A missing parameter yields [`Watermark::UNSET`]; every other failure is
/// fatal and carries the parameter name.
pub async fn read_watermark(
    store: &dyn ParameterStore,
    name: &str,
) -> Result<Watermark, SyncError> {
    match store.get_parameter(name).await {
        Ok(value) => Watermark::parse(&value).ok_or_else(|| SyncError::Watermark {
            name: name.to_string(),
            source: StoreError::Serialization(format!("not an epoch timestamp: {:?}", value)),
        }),
        Err(StoreError::ParameterNotFound(_)) => {
            tracing::info!("No watermark stored under {}, crawling everything", name);
            Ok(Watermark::UNSET)
        }
        Err(e) => Err(SyncError::Watermark {
            name: name.to_string(),
            source: e,
        }),
    }
}

/// Overwrites the watermark stored under `name`
pub async fn write_watermark(
    store: &dyn ParameterStore,
    name: &str,
    watermark: Watermark,
) -> Result<(), SyncError> {
    store
        .put_parameter(name, &watermark.to_string(), true)
        .await
        .map_err(|source| SyncError::WatermarkWrite {
            name: name.to_string(),
            source,
        })?;
    tracing::info!("Watermark {} advanced to {}", name, watermark);
    Ok(())
}
