//! Forecast source contract and the cache-through service on top of it.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use weatherbell_common::types::WeatherForecast;

use crate::context::Services;
use crate::error::SchedulerError;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Provider returned no forecast slots for city {0}")]
    Empty(i64),
}

/// Upstream weather source.
#[async_trait]
pub trait ForecastProvider: Send + Sync {
    /// Fetch and aggregate a fresh forecast for `city_id`.
    async fn fetch(&self, city_id: i64) -> Result<WeatherForecast, ProviderError>;
}

pub struct ForecastService {
    services: Arc<Services>,
    provider: Arc<dyn ForecastProvider>,
}

impl ForecastService {
    pub fn new(services: Arc<Services>, provider: Arc<dyn ForecastProvider>) -> Self {
        Self { services, provider }
    }

    /// Stored forecast if either tier has one, otherwise a fresh one.
    ///
    /// A fresh forecast is stored through the facade. Failing to store it does
    /// not fail the call.
    pub async fn get(&self, city_id: i64) -> Result<WeatherForecast, SchedulerError> {
        match self.services.forecasts.get(city_id).await {
            Ok(forecast) => return Ok(forecast),
            Err(e) if e.is_not_found() => {
                tracing::debug!(city_id, "No stored forecast, fetching from provider");
            }
            Err(e) => {
                tracing::warn!(city_id, error = %e, "Stored forecast unreadable, fetching from provider");
            }
        }

        let forecast = self.provider.fetch(city_id).await?;
        if let Err(e) = self.services.forecasts.save(&forecast).await {
            tracing::error!(city_id, error = %e, "Failed to store fetched forecast");
        }
        tracing::info!(city_id, "Fetched fresh forecast");
        Ok(forecast)
    }

    /// Fetch a fresh forecast and replace the stored one.
    pub async fn refresh(&self, city_id: i64) -> Result<WeatherForecast, SchedulerError> {
        let forecast = self.provider.fetch(city_id).await?;
        self.services.forecasts.save(&forecast).await?;
        Ok(forecast)
    }
}
