use chrono::NaiveDateTime;
use thiserror::Error;

use weatherbell_common::error::{DualStorageError, StorageError};
use weatherbell_notifier::DeliveryError;

use crate::provider::ProviderError;

#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A single-tier call, such as a job log read, failed.
    #[error("Storage tier error: {0}")]
    Tier(#[from] StorageError),

    #[error("Storage error: {0}")]
    Storage(#[from] DualStorageError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("User {0} not found")]
    UnknownUser(i64),

    #[error("User {0} has no city selected")]
    NoCitySelected(i64),

    #[error("No forecast for city {city_id} on {date}")]
    NoForecastForDate { city_id: i64, date: chrono::NaiveDate },

    #[error("Local time {0} does not exist")]
    NonexistentLocalTime(NaiveDateTime),
}

impl SchedulerError {
    /// The recipient can never be reached again.
    pub fn is_recipient_unreachable(&self) -> bool {
        matches!(self, SchedulerError::Delivery(e) if e.is_recipient_unreachable())
    }
}
