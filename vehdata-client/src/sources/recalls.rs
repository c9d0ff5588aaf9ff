//! NHTSA recall registry (`/recalls/recallsByVehicle`)

use super::{de_lossy_string, message_failure, HttpSettings, RegistryHttp};
use crate::error::{ServiceError, ServiceFailure};
use crate::models::RecallRecord;
use serde::Deserialize;
use tracing::info;

pub const SERVICE: &str = "NHTSA Recalls";

#[derive(Debug, Deserialize)]
struct RecallsResponse {
    #[serde(rename = "Message")]
    message: Option<String>,
    #[serde(default)]
    results: Vec<RawRecall>,
}

#[derive(Debug, Deserialize)]
struct RawRecall {
    #[serde(rename = "Manufacturer", default, deserialize_with = "de_lossy_string")]
    manufacturer: String,
    #[serde(rename = "NHTSACampaignNumber", default, deserialize_with = "de_lossy_string")]
    campaign_number: String,
    #[serde(rename = "ReportReceivedDate", default, deserialize_with = "de_lossy_string")]
    report_received_date: String,
    #[serde(rename = "Component", default, deserialize_with = "de_lossy_string")]
    component: String,
    #[serde(rename = "Summary", default, deserialize_with = "de_lossy_string")]
    summary: String,
    #[serde(rename = "Consequence", default, deserialize_with = "de_lossy_string")]
    consequence: String,
    #[serde(rename = "Remedy", default, deserialize_with = "de_lossy_string")]
    remedy: String,
    #[serde(rename = "ModelYear", default, deserialize_with = "de_lossy_string")]
    model_year: String,
    #[serde(rename = "Make", default, deserialize_with = "de_lossy_string")]
    make: String,
    #[serde(rename = "Model", default, deserialize_with = "de_lossy_string")]
    model: String,
}

impl From<RawRecall> for RecallRecord {
    fn from(raw: RawRecall) -> Self {
        Self {
            manufacturer: raw.manufacturer,
            campaign_number: raw.campaign_number,
            received_date: raw.report_received_date,
            component: raw.component,
            summary: raw.summary,
            consequence: raw.consequence,
            remedy: raw.remedy,
            model_year: raw.model_year,
            make: raw.make,
            model: raw.model,
        }
    }
}

pub struct RecallsClient {
    http: RegistryHttp,
}

impl RecallsClient {
    pub fn new(
        base_url: &str,
        settings: &HttpSettings,
        requests_per_second: u32,
    ) -> Result<Self, ServiceError> {
        Ok(Self {
            http: RegistryHttp::new(SERVICE, base_url, settings, requests_per_second)?,
        })
    }

    /// Recall campaigns for a make/model/year; an empty list is a valid answer
    pub async fn fetch(
        &self,
        make: &str,
        model: &str,
        year: u16,
    ) -> Result<Vec<RecallRecord>, ServiceError> {
        let make = self.http.require("make", make)?;
        let model = self.http.require("model", model)?;
        let year = year.to_string();
        let response: RecallsResponse = self
            .http
            .get_json(
                &["recalls", "recallsByVehicle"],
                &[("make", make), ("model", model), ("modelYear", &year)],
            )
            .await?;

        let recalls = map_recalls(response).map_err(|cause| self.http.fail(cause))?;

        info!(make, model, year = %year, count = recalls.len(), "Fetched recalls");
        Ok(recalls)
    }
}

fn map_recalls(response: RecallsResponse) -> Result<Vec<RecallRecord>, ServiceFailure> {
    if response.results.is_empty() {
        if let Some(failure) = message_failure(response.message.as_deref()) {
            return Err(failure);
        }
    }

    Ok(response.results.into_iter().map(RecallRecord::from).collect())
}
