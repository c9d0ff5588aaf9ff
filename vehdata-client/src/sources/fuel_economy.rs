//! FuelEconomy.gov web services
//!
//! `/vehicle/menu/options` lists engine/transmission variants of a
//! year/make/model; `/vehicle/{id}` returns the figures of one variant. The
//! menu endpoint sends a bare object instead of an array when there is a
//! single option and an empty body when there are none.

use super::{de_lossy_string, de_opt_number, HttpSettings, OneOrMany, RegistryHttp};
use crate::error::{ServiceError, ServiceFailure};
use crate::models::{FuelEconomyCandidate, FuelEconomyRecord};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

pub const SERVICE: &str = "FuelEconomy.gov";

#[derive(Debug, Deserialize)]
struct MenuResponse {
    #[serde(rename = "menuItem")]
    menu_item: Option<OneOrMany<MenuItem>>,
}

#[derive(Debug, Deserialize)]
struct MenuItem {
    #[serde(default, deserialize_with = "de_lossy_string")]
    text: String,
    #[serde(default, deserialize_with = "de_lossy_string")]
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawVehicle {
    #[serde(default, deserialize_with = "de_lossy_string")]
    id: String,
    #[serde(default, deserialize_with = "de_opt_number")]
    city08: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_number")]
    highway08: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_number")]
    comb08: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_number")]
    fuel_cost08: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_number")]
    co2_tailpipe_gpm: Option<f64>,
}

pub struct FuelEconomyClient {
    http: RegistryHttp,
}

impl FuelEconomyClient {
    pub fn new(
        base_url: &str,
        settings: &HttpSettings,
        requests_per_second: u32,
    ) -> Result<Self, ServiceError> {
        Ok(Self {
            http: RegistryHttp::new(SERVICE, base_url, settings, requests_per_second)?,
        })
    }

    /// Variants listed for a year/make/model, in registry order
    pub async fn search(
        &self,
        year: u16,
        make: &str,
        model: &str,
    ) -> Result<Vec<FuelEconomyCandidate>, ServiceError> {
        let make = self.http.require("make", make)?;
        let model = self.http.require("model", model)?;
        let year = year.to_string();
        let body = self
            .http
            .get_text(
                &["vehicle", "menu", "options"],
                &[("year", &year), ("make", make), ("model", model)],
            )
            .await?;

        let candidates = self.parse_menu(&body)?;

        info!(year = %year, make, model, count = candidates.len(), "Fuel economy search");
        Ok(candidates)
    }

    /// Figures for one registry vehicle id
    pub async fn get(&self, id: &str) -> Result<FuelEconomyRecord, ServiceError> {
        let id = self.http.require("vehicle id", id)?;
        let body = self.http.get_text(&["vehicle", id], &[]).await?;
        if is_blank_body(&body) {
            return Err(self.http.fail(ServiceFailure::EmptyResult));
        }

        let raw: RawVehicle = self.http.parse(&body)?;
        let record = map_vehicle(raw).map_err(|cause| self.http.fail(cause))?;

        info!(id = %record.id, combined_mpg = record.combined_mpg, "Fetched fuel economy");
        Ok(record)
    }

    fn parse_menu(&self, body: &str) -> Result<Vec<FuelEconomyCandidate>, ServiceError> {
        if is_blank_body(body) {
            return Ok(Vec::new());
        }

        let menu: MenuResponse = self.http.parse(body)?;
        Ok(map_menu(menu))
    }
}

fn is_blank_body(body: &str) -> bool {
    let body = body.trim();
    body.is_empty() || body == "null"
}

fn map_menu(menu: MenuResponse) -> Vec<FuelEconomyCandidate> {
    menu.menu_item
        .map(OneOrMany::into_vec)
        .unwrap_or_default()
        .into_iter()
        .filter(|item| !item.value.trim().is_empty())
        .map(|item| FuelEconomyCandidate {
            id: item.value.trim().to_string(),
            description: item.text,
        })
        .collect()
}

fn map_vehicle(raw: RawVehicle) -> Result<FuelEconomyRecord, ServiceFailure> {
    if raw.id.trim().is_empty() {
        return Err(ServiceFailure::EmptyResult);
    }

    Ok(FuelEconomyRecord {
        id: raw.id.trim().to_string(),
        city_mpg: raw.city08.unwrap_or(0.0),
        highway_mpg: raw.highway08.unwrap_or(0.0),
        combined_mpg: raw.comb08.unwrap_or(0.0),
        annual_fuel_cost: raw.fuel_cost08.unwrap_or(0.0),
        co2_grams_per_mile: raw.co2_tailpipe_gpm.unwrap_or(0.0),
        last_updated: Utc::now(),
    })
}
