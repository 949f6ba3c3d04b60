//! Gazetteer import.
//!
//! The gazetteer is a JSON array of city objects. Both the short field names
//! used by [`City`] and the long ones of the address-service export
//! (`city`, `region_with_type`, ...) are accepted.

use std::path::Path;

use anyhow::Context;

use weatherbell_common::types::City;
use weatherbell_scheduler::Services;

pub async fn load_gazetteer(path: impl AsRef<Path>) -> anyhow::Result<Vec<City>> {
    let path = path.as_ref();
    let raw = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read gazetteer {}", path.display()))?;
    let cities: Vec<City> = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse gazetteer {}", path.display()))?;
    Ok(cities)
}

/// Load the gazetteer into both tiers. Returns the number of cities stored.
pub async fn import_cities(services: &Services, path: impl AsRef<Path>) -> anyhow::Result<usize> {
    let path = path.as_ref();
    let cities = load_gazetteer(path).await?;
    let stored = services.cities.load(&cities).await?;
    tracing::info!(path = %path.display(), stored, "Gazetteer imported");
    Ok(stored)
}
