//! Unified vehicle-data facade
//!
//! One method per capability. Every lookup goes through the layered cache
//! under its own domain, and VINs are validated before any cache or network
//! access.

use crate::cache::{DurableStore, LayeredCache};
use crate::config::{CachePolicies, ClientConfig};
use crate::error::{ClientResult, ServiceError};
use crate::matching::select_candidate;
use crate::models::{
    ComplaintRecord, FuelEconomyCandidate, FuelEconomyRecord, RecallRecord, SafetyRatingRecord,
    VehicleSpecification,
};
use crate::sources::{
    ComplaintsClient, FuelEconomyClient, RecallsClient, SafetyRatingsClient, VpicClient,
};
use crate::vin;
use std::sync::Arc;
use tracing::{debug, info};

const DOMAIN_VIN: &str = "vin";
const DOMAIN_RECALLS: &str = "recalls";
const DOMAIN_COMPLAINTS: &str = "complaints";
const DOMAIN_SAFETY: &str = "safety";
const DOMAIN_FUEL_SEARCH: &str = "fuel-search";
const DOMAIN_FUEL_RECORD: &str = "fuel";

pub struct VehicleDataClient {
    cache: LayeredCache,
    policies: CachePolicies,
    vpic: VpicClient,
    recalls: RecallsClient,
    complaints: ComplaintsClient,
    safety_ratings: SafetyRatingsClient,
    fuel_economy: FuelEconomyClient,
}

impl VehicleDataClient {
    /// Build every adapter from `config`
    ///
    /// Without a durable store the client caches in memory only.
    pub fn new(
        config: &ClientConfig,
        durable: Option<Arc<dyn DurableStore>>,
    ) -> Result<Self, ServiceError> {
        let endpoints = &config.endpoints;
        let limits = &config.rate_limits;
        let http = &config.http;

        let client = Self {
            cache: LayeredCache::new(durable),
            policies: config.cache,
            vpic: VpicClient::new(&endpoints.vpic, http, limits.vpic)?,
            recalls: RecallsClient::new(&endpoints.nhtsa, http, limits.nhtsa)?,
            complaints: ComplaintsClient::new(&endpoints.nhtsa, http, limits.nhtsa)?,
            safety_ratings: SafetyRatingsClient::new(&endpoints.nhtsa, http, limits.nhtsa)?,
            fuel_economy: FuelEconomyClient::new(
                &endpoints.fuel_economy,
                http,
                limits.fuel_economy,
            )?,
        };

        info!(
            durable = client.cache.has_durable_tier(),
            vpic = %endpoints.vpic,
            nhtsa = %endpoints.nhtsa,
            fuel_economy = %endpoints.fuel_economy,
            "Vehicle data client ready"
        );

        Ok(client)
    }

    /// Decode a VIN into its specification
    ///
    /// Malformed VINs fail with a validation error before any lookup.
    pub async fn decode_vin(&self, raw_vin: &str) -> ClientResult<VehicleSpecification> {
        let vin = vin::validate(raw_vin)?;

        let spec = self
            .cache
            .get_or_fetch(DOMAIN_VIN, &vin, self.policies.vin_decode, || {
                self.vpic.decode(&vin)
            })
            .await?;
        Ok(spec)
    }

    pub async fn get_recalls(
        &self,
        make: &str,
        model: &str,
        year: u16,
    ) -> ClientResult<Vec<RecallRecord>> {
        let key = vehicle_key(make, model, year);
        let recalls = self
            .cache
            .get_or_fetch(DOMAIN_RECALLS, &key, self.policies.recalls, || {
                self.recalls.fetch(make, model, year)
            })
            .await?;
        Ok(recalls)
    }

    pub async fn get_complaints(
        &self,
        make: &str,
        model: &str,
        year: u16,
    ) -> ClientResult<Vec<ComplaintRecord>> {
        let key = vehicle_key(make, model, year);
        let complaints = self
            .cache
            .get_or_fetch(DOMAIN_COMPLAINTS, &key, self.policies.complaints, || {
                self.complaints.fetch(make, model, year)
            })
            .await?;
        Ok(complaints)
    }

    /// Crash-test ratings, or `None` when the registry has not rated the vehicle
    pub async fn get_safety_ratings(
        &self,
        year: u16,
        make: &str,
        model: &str,
    ) -> ClientResult<Option<SafetyRatingRecord>> {
        let key = vehicle_key(make, model, year);
        let ratings = self
            .cache
            .get_or_fetch(DOMAIN_SAFETY, &key, self.policies.safety_ratings, || {
                self.safety_ratings.fetch(year, make, model)
            })
            .await?;
        Ok(ratings)
    }

    /// Engine/transmission variants for a year/make/model, in registry order
    pub async fn search_fuel_economy(
        &self,
        year: u16,
        make: &str,
        model: &str,
    ) -> ClientResult<Vec<FuelEconomyCandidate>> {
        let key = vehicle_key(make, model, year);
        let candidates = self
            .cache
            .get_or_fetch(DOMAIN_FUEL_SEARCH, &key, self.policies.fuel_economy, || {
                self.fuel_economy.search(year, make, model)
            })
            .await?;
        Ok(candidates)
    }

    /// Registry id of the variant best matching the engine attributes
    ///
    /// `None` only when the search found nothing. Filters that match no
    /// variant are ignored, and ties go to the first variant listed.
    pub async fn match_fuel_economy(
        &self,
        year: u16,
        make: &str,
        model: &str,
        cylinders: Option<u32>,
        displacement_liters: Option<f64>,
    ) -> ClientResult<Option<String>> {
        let candidates = self.search_fuel_economy(year, make, model).await?;

        let selected = select_candidate(&candidates, cylinders, displacement_liters);
        debug!(
            year,
            make,
            model,
            ?cylinders,
            ?displacement_liters,
            candidates = candidates.len(),
            selected = selected.map(|c| c.id.as_str()),
            "Fuel economy match"
        );

        Ok(selected.map(|c| c.id.clone()))
    }

    pub async fn get_fuel_economy(&self, id: &str) -> ClientResult<FuelEconomyRecord> {
        let key = id.trim().to_string();
        let record = self
            .cache
            .get_or_fetch(DOMAIN_FUEL_RECORD, &key, self.policies.fuel_economy, || {
                self.fuel_economy.get(id)
            })
            .await?;
        Ok(record)
    }

    /// Empty both cache tiers
    pub async fn clear_cache(&self) {
        self.cache.clear().await;
        info!("Vehicle data cache cleared");
    }

    /// Drop expired durable entries; returns how many were removed
    pub async fn purge_expired_cache(&self) -> u64 {
        let purged = self.cache.purge_expired().await;
        info!(purged, "Purged expired cache entries");
        purged
    }

    /// Wait for pending durable-tier writes; call before closing the store
    pub async fn flush_cache_writes(&self) {
        self.cache.flush().await;
    }

    /// Entries currently held in the in-memory tier
    pub fn memory_cache_size(&self) -> usize {
        self.cache.memory_size()
    }
}

/// Case-insensitive cache key for year/make/model lookups
fn vehicle_key(make: &str, model: &str, year: u16) -> String {
    format!(
        "{}:{}:{}",
        make.trim().to_lowercase(),
        model.trim().to_lowercase(),
        year
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::vin::VinError;

    fn offline_client() -> VehicleDataClient {
        // Nothing listens here; only paths that never reach the network are exercised
        let config = ClientConfig::with_single_base_url("http://127.0.0.1:9");
        VehicleDataClient::new(&config, None).unwrap()
    }

    #[test]
    fn test_vehicle_key_is_case_insensitive() {
        assert_eq!(vehicle_key("Jeep", " Cherokee ", 2017), "jeep:cherokee:2017");
        assert_eq!(vehicle_key("JEEP", "CHEROKEE", 2017), vehicle_key("jeep", "cherokee", 2017));
    }

    #[tokio::test]
    async fn test_decode_rejects_bad_vin_before_lookup() {
        let client = offline_client();

        let error = client.decode_vin("1FTFW1ET7BFA5137I").await.unwrap_err();
        assert!(matches!(error, ClientError::Validation(VinError::ForbiddenLetters)));
        assert_eq!(error.service(), None);
        assert_eq!(client.memory_cache_size(), 0);
    }

    #[tokio::test]
    async fn test_blank_make_is_invalid_request() {
        let client = offline_client();

        let error = client.get_recalls("  ", "Cherokee", 2017).await.unwrap_err();
        assert_eq!(error.service(), Some(crate::sources::recalls::SERVICE));
    }

    #[test]
    fn test_bad_endpoint_fails_construction() {
        let config = ClientConfig::with_single_base_url("not a url");
        let error = VehicleDataClient::new(&config, None).err().unwrap();
        assert_eq!(error.service, crate::sources::vpic::SERVICE);
    }
}
