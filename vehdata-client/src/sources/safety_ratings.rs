//! NHTSA 5-Star Safety Ratings
//!
//! Ratings are addressed by a registry vehicle id, so a lookup is two calls:
//! `/SafetyRatings/modelyear/{y}/make/{make}/model/{model}` lists the rated
//! variants and `/SafetyRatings/VehicleId/{id}` returns the ratings of one.

use super::{de_lossy_string, message_failure, number_from_value, HttpSettings, RegistryHttp};
use crate::error::{ServiceError, ServiceFailure};
use crate::models::SafetyRatingRecord;
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info};

pub const SERVICE: &str = "NHTSA Safety Ratings";

/// Registry feature fields and the names they are reported under
const FEATURE_FIELDS: [(&str, &str); 3] = [
    ("NHTSAElectronicStabilityControl", "electronic_stability_control"),
    ("NHTSAForwardCollisionWarning", "forward_collision_warning"),
    ("NHTSALaneDepartureWarning", "lane_departure_warning"),
];

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "Message")]
    message: Option<String>,
    #[serde(rename = "Results", default)]
    results: Vec<RatedVariant>,
}

#[derive(Debug, Deserialize)]
struct RatedVariant {
    #[serde(rename = "VehicleId")]
    vehicle_id: u64,
    #[serde(rename = "VehicleDescription", default, deserialize_with = "de_lossy_string")]
    description: String,
}

/// Detail rows are kept as raw maps; ratings arrive as "5", 5 or "Not Rated"
#[derive(Debug, Deserialize)]
struct DetailResponse {
    #[serde(rename = "Message")]
    message: Option<String>,
    #[serde(rename = "Results", default)]
    results: Vec<serde_json::Map<String, Value>>,
}

pub struct SafetyRatingsClient {
    http: RegistryHttp,
}

impl SafetyRatingsClient {
    pub fn new(
        base_url: &str,
        settings: &HttpSettings,
        requests_per_second: u32,
    ) -> Result<Self, ServiceError> {
        Ok(Self {
            http: RegistryHttp::new(SERVICE, base_url, settings, requests_per_second)?,
        })
    }

    /// Ratings of the first rated variant, or `None` when nothing is rated
    pub async fn fetch(
        &self,
        year: u16,
        make: &str,
        model: &str,
    ) -> Result<Option<SafetyRatingRecord>, ServiceError> {
        let make = self.http.require("make", make)?;
        let model = self.http.require("model", model)?;
        let year = year.to_string();
        let search: SearchResponse = self
            .http
            .get_json(
                &["SafetyRatings", "modelyear", &year, "make", make, "model", model],
                &[],
            )
            .await?;

        let Some(variant) = first_variant(search).map_err(|cause| self.http.fail(cause))? else {
            info!(year = %year, make, model, "No safety rating published");
            return Ok(None);
        };
        debug!(vehicle_id = variant.vehicle_id, description = %variant.description, "Rated variant selected");

        let vehicle_id = variant.vehicle_id.to_string();
        let detail: DetailResponse = self
            .http
            .get_json(&["SafetyRatings", "VehicleId", &vehicle_id], &[])
            .await?;

        let record = map_detail(variant, detail).map_err(|cause| self.http.fail(cause))?;

        info!(
            year = %year,
            make,
            model,
            vehicle_id = record.vehicle_id,
            overall = record.overall,
            "Fetched safety ratings"
        );
        Ok(Some(record))
    }
}

fn first_variant(search: SearchResponse) -> Result<Option<RatedVariant>, ServiceFailure> {
    if search.results.is_empty() {
        if let Some(failure) = message_failure(search.message.as_deref()) {
            return Err(failure);
        }
    }
    Ok(search.results.into_iter().next())
}

fn map_detail(
    variant: RatedVariant,
    detail: DetailResponse,
) -> Result<SafetyRatingRecord, ServiceFailure> {
    let row = match detail.results.into_iter().next() {
        Some(row) => row,
        None => {
            return Err(message_failure(detail.message.as_deref())
                .unwrap_or(ServiceFailure::EmptyResult))
        }
    };

    let stars = |field: &str| row.get(field).map_or(0, star_value);

    let rollover_risk_percent = row
        .get("RolloverPossibility")
        .and_then(number_from_value)
        .map_or(0.0, |fraction| fraction * 100.0);

    let features: BTreeMap<String, bool> = FEATURE_FIELDS
        .iter()
        .map(|(field, name)| (name.to_string(), feature_available(row.get(*field))))
        .collect();

    let description = row
        .get("VehicleDescription")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| (!variant.description.is_empty()).then_some(variant.description));

    Ok(SafetyRatingRecord {
        vehicle_id: variant.vehicle_id,
        description,
        overall: stars("OverallRating"),
        front_driver: stars("FrontCrashDriversideRating"),
        front_passenger: stars("FrontCrashPassengersideRating"),
        side: stars("OverallSideCrashRating"),
        rollover: stars("RolloverRating"),
        rollover_risk_percent,
        features,
        last_updated: Utc::now(),
    })
}

/// Star count rounded to a whole number and never clamped; "Not Rated" and other non-numbers read as 0
fn star_value(value: &Value) -> i32 {
    number_from_value(value).map_or(0, |n| n.round() as i32)
}

fn feature_available(value: Option<&Value>) -> bool {
    match value.and_then(Value::as_str) {
        Some(text) => {
            let text = text.trim();
            text.eq_ignore_ascii_case("standard") || text.eq_ignore_ascii_case("optional")
        }
        None => false,
    }
}
