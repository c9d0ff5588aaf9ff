//! NHTSA complaint registry (`/complaints/complaintsByVehicle`)

use super::{
    de_lossy_bool, de_lossy_count, de_lossy_string, message_failure, HttpSettings, RegistryHttp,
};
use crate::error::{ServiceError, ServiceFailure};
use crate::models::ComplaintRecord;
use serde::Deserialize;
use tracing::info;

pub const SERVICE: &str = "NHTSA Complaints";

#[derive(Debug, Deserialize)]
struct ComplaintsResponse {
    message: Option<String>,
    #[serde(default)]
    results: Vec<RawComplaint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawComplaint {
    odi_number: u64,
    #[serde(default, deserialize_with = "de_lossy_string")]
    manufacturer: String,
    #[serde(default, deserialize_with = "de_lossy_bool")]
    crash: bool,
    #[serde(default, deserialize_with = "de_lossy_bool")]
    fire: bool,
    #[serde(default, deserialize_with = "de_lossy_count")]
    number_of_injuries: u32,
    #[serde(default, deserialize_with = "de_lossy_count")]
    number_of_deaths: u32,
    date_of_incident: Option<String>,
    date_complaint_filed: Option<String>,
    #[serde(default, deserialize_with = "de_lossy_string")]
    components: String,
    #[serde(default, deserialize_with = "de_lossy_string")]
    summary: String,
    vin: Option<String>,
}

impl From<RawComplaint> for ComplaintRecord {
    fn from(raw: RawComplaint) -> Self {
        Self {
            odi_number: raw.odi_number,
            manufacturer: raw.manufacturer,
            crash: raw.crash,
            fire: raw.fire,
            injuries: raw.number_of_injuries,
            deaths: raw.number_of_deaths,
            incident_date: raw.date_of_incident,
            filed_date: raw.date_complaint_filed,
            components: raw.components,
            summary: raw.summary,
            vin: raw.vin,
        }
    }
}

pub struct ComplaintsClient {
    http: RegistryHttp,
}

impl ComplaintsClient {
    pub fn new(
        base_url: &str,
        settings: &HttpSettings,
        requests_per_second: u32,
    ) -> Result<Self, ServiceError> {
        Ok(Self {
            http: RegistryHttp::new(SERVICE, base_url, settings, requests_per_second)?,
        })
    }

    /// Complaints filed for a make/model/year; an empty list is a valid answer
    pub async fn fetch(
        &self,
        make: &str,
        model: &str,
        year: u16,
    ) -> Result<Vec<ComplaintRecord>, ServiceError> {
        let make = self.http.require("make", make)?;
        let model = self.http.require("model", model)?;
        let year = year.to_string();
        let response: ComplaintsResponse = self
            .http
            .get_json(
                &["complaints", "complaintsByVehicle"],
                &[("make", make), ("model", model), ("modelYear", &year)],
            )
            .await?;

        let complaints = map_complaints(response).map_err(|cause| self.http.fail(cause))?;

        info!(make, model, year = %year, count = complaints.len(), "Fetched complaints");
        Ok(complaints)
    }
}

fn map_complaints(response: ComplaintsResponse) -> Result<Vec<ComplaintRecord>, ServiceFailure> {
    if response.results.is_empty() {
        if let Some(failure) = message_failure(response.message.as_deref()) {
            return Err(failure);
        }
    }

    Ok(response.results.into_iter().map(ComplaintRecord::from).collect())
}
