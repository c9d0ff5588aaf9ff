//! NHTSA vPIC VIN decoder
//!
//! `DecodeVinValues` answers 200 even for undecodable VINs and reports the
//! problem through `ErrorCode`/`ErrorText` in the single result row.

use super::{non_empty, parse_leading_number, HttpSettings, RegistryHttp};
use crate::error::{ServiceError, ServiceFailure};
use crate::models::{
    BodySpec, EngineSpec, SafetyEquipment, TransmissionSpec, VehicleSpecification, WeightSpec,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

pub const SERVICE: &str = "NHTSA vPIC";
pub const SOURCE_TAG: &str = "nhtsa-vpic";

#[derive(Debug, Deserialize)]
struct DecodeResponse {
    #[serde(rename = "Results", default)]
    results: Vec<DecodeRow>,
}

/// One flat vPIC row; every value arrives as a string or null
#[derive(Debug, Default, Deserialize)]
struct DecodeRow {
    #[serde(rename = "Make")]
    make: Option<String>,
    #[serde(rename = "Model")]
    model: Option<String>,
    #[serde(rename = "ModelYear")]
    model_year: Option<String>,
    #[serde(rename = "Trim")]
    trim: Option<String>,
    #[serde(rename = "EngineCylinders")]
    engine_cylinders: Option<String>,
    #[serde(rename = "DisplacementL")]
    displacement_l: Option<String>,
    #[serde(rename = "FuelTypePrimary")]
    fuel_type_primary: Option<String>,
    #[serde(rename = "EngineHP")]
    engine_hp: Option<String>,
    #[serde(rename = "EngineManufacturer")]
    engine_manufacturer: Option<String>,
    #[serde(rename = "BodyClass")]
    body_class: Option<String>,
    #[serde(rename = "Doors")]
    doors: Option<String>,
    #[serde(rename = "ABS")]
    abs: Option<String>,
    #[serde(rename = "ESC")]
    esc: Option<String>,
    #[serde(rename = "TransmissionStyle")]
    transmission_style: Option<String>,
    #[serde(rename = "TransmissionSpeeds")]
    transmission_speeds: Option<String>,
    #[serde(rename = "GVWR")]
    gvwr: Option<String>,
    #[serde(rename = "CurbWeightLB")]
    curb_weight_lb: Option<String>,
    #[serde(rename = "ErrorCode")]
    error_code: Option<String>,
    #[serde(rename = "ErrorText")]
    error_text: Option<String>,
}

pub struct VpicClient {
    http: RegistryHttp,
}

impl VpicClient {
    pub fn new(
        base_url: &str,
        settings: &HttpSettings,
        requests_per_second: u32,
    ) -> Result<Self, ServiceError> {
        Ok(Self {
            http: RegistryHttp::new(SERVICE, base_url, settings, requests_per_second)?,
        })
    }

    /// Decode a normalized, already-validated VIN
    pub async fn decode(&self, vin: &str) -> Result<VehicleSpecification, ServiceError> {
        let response: DecodeResponse = self
            .http
            .get_json(&["vehicles", "DecodeVinValues", vin], &[("format", "json")])
            .await?;

        let spec = map_decode(vin, response).map_err(|cause| self.http.fail(cause))?;

        info!(
            vin = %vin,
            make = spec.make.as_deref().unwrap_or("unknown"),
            model = spec.model.as_deref().unwrap_or("unknown"),
            "Decoded VIN"
        );

        Ok(spec)
    }
}

fn map_decode(vin: &str, response: DecodeResponse) -> Result<VehicleSpecification, ServiceFailure> {
    let row = response
        .results
        .into_iter()
        .next()
        .ok_or(ServiceFailure::EmptyResult)?;

    check_error_code(&row)?;

    let number = |field: &Option<String>| field.as_deref().and_then(parse_leading_number);

    // Absent counts and sizes read as zero; absent ratings and weights stay
    // absent.
    let cylinders = number(&row.engine_cylinders).map_or(0, |n| n as u32);
    let displacement_liters = number(&row.displacement_l).unwrap_or(0.0);
    let doors = number(&row.doors).map_or(0, |n| n as u32);
    let horsepower = number(&row.engine_hp);
    let gvwr = number(&row.gvwr);
    let curb_weight = number(&row.curb_weight_lb);

    let transmission =
        non_empty(row.transmission_style.as_deref()).map(|transmission_type| TransmissionSpec {
            transmission_type,
            speeds: number(&row.transmission_speeds).map(|n| n as u32),
        });

    let weight = (gvwr.is_some() || curb_weight.is_some()).then_some(WeightSpec {
        gross_vehicle_weight_rating_lbs: gvwr,
        curb_weight_lbs: curb_weight,
    });

    Ok(VehicleSpecification {
        vin: vin.to_string(),
        make: non_empty(row.make.as_deref()),
        model: non_empty(row.model.as_deref()),
        model_year: row
            .model_year
            .as_deref()
            .and_then(|y| y.trim().parse::<u16>().ok()),
        trim: non_empty(row.trim.as_deref()),
        engine: EngineSpec {
            cylinders,
            displacement_liters,
            fuel_type: non_empty(row.fuel_type_primary.as_deref()).unwrap_or_default(),
            horsepower,
            manufacturer: non_empty(row.engine_manufacturer.as_deref()),
        },
        body: BodySpec {
            body_type: non_empty(row.body_class.as_deref()).unwrap_or_default(),
            doors,
        },
        safety: SafetyEquipment {
            anti_lock_brakes: says_yes(row.abs.as_deref()),
            electronic_stability_control: says_yes(row.esc.as_deref()),
        },
        transmission,
        weight,
        decoded_at: Utc::now(),
        source: SOURCE_TAG.to_string(),
    })
}

/// `ErrorCode` is a comma-separated list; anything other than "0" fails
fn check_error_code(row: &DecodeRow) -> Result<(), ServiceFailure> {
    let Some(code) = row.error_code.as_deref().map(str::trim) else {
        return Ok(());
    };

    if code.is_empty() || code.split(',').all(|c| c.trim() == "0") {
        return Ok(());
    }

    Err(ServiceFailure::Registry {
        code: code.to_string(),
        message: row.error_text.clone().unwrap_or_default(),
    })
}

fn says_yes(raw: Option<&str>) -> bool {
    raw.is_some_and(|value| value.to_ascii_lowercase().contains("yes"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_json(json: &str) -> Result<VehicleSpecification, ServiceFailure> {
        let response: DecodeResponse = serde_json::from_str(json).unwrap();
        map_decode("1C4PJMBS9HW664582", response)
    }

    #[test]
    fn test_full_row_maps() {
        let spec = decode_json(
            r#"{"Count":136,"Message":"Results returned successfully","Results":[{
                "Make":"JEEP","Model":"Cherokee","ModelYear":"2017","Trim":"Limited",
                "EngineCylinders":"6","DisplacementL":"3.2","FuelTypePrimary":"Gasoline",
                "EngineHP":"271","EngineManufacturer":"FCA","BodyClass":"Sport Utility Vehicle (SUV)/Multi-Purpose Vehicle (MPV)",
                "Doors":"4","ABS":"Yes","ESC":"Standard (yes)","TransmissionStyle":"Automatic",
                "TransmissionSpeeds":"9","GVWR":"5000","CurbWeightLB":"",
                "ErrorCode":"0","ErrorText":"0 - VIN decoded clean. Check Digit (9th position) is correct"
            }]}"#,
        )
        .unwrap();

        assert_eq!(spec.make.as_deref(), Some("JEEP"));
        assert_eq!(spec.model_year, Some(2017));
        assert_eq!(spec.engine.cylinders, 6);
        assert_eq!(spec.engine.displacement_liters, 3.2);
        assert_eq!(spec.engine.horsepower, Some(271.0));
        assert_eq!(spec.body.doors, 4);
        assert!(spec.safety.anti_lock_brakes);
        assert!(spec.safety.electronic_stability_control);
        assert_eq!(
            spec.transmission,
            Some(TransmissionSpec {
                transmission_type: "Automatic".to_string(),
                speeds: Some(9)
            })
        );
        let weight = spec.weight.unwrap();
        assert_eq!(weight.gross_vehicle_weight_rating_lbs, Some(5000.0));
        assert_eq!(weight.curb_weight_lbs, None);
        assert_eq!(spec.source, SOURCE_TAG);
    }

    #[test]
    fn test_missing_numbers_default_asymmetrically() {
        let spec = decode_json(
            r#"{"Results":[{"EngineCylinders":"","DisplacementL":null,"Doors":"n/a",
                "EngineHP":"","ABS":"Standard","ErrorCode":"0"}]}"#,
        )
        .unwrap();

        assert_eq!(spec.engine.cylinders, 0);
        assert_eq!(spec.engine.displacement_liters, 0.0);
        assert_eq!(spec.body.doors, 0);
        assert_eq!(spec.engine.horsepower, None);
        assert!(spec.weight.is_none());
        assert!(spec.transmission.is_none());
        // Only an explicit "yes" counts
        assert!(!spec.safety.anti_lock_brakes);
        assert!(!spec.safety.electronic_stability_control);
    }

    #[test]
    fn test_in_body_error_code_fails() {
        let result = decode_json(
            r#"{"Results":[{"Make":"","ErrorCode":"1,11",
                "ErrorText":"1 - Check Digit (9th position) does not calculate properly"}]}"#,
        );

        match result {
            Err(ServiceFailure::Registry { code, message }) => {
                assert_eq!(code, "1,11");
                assert!(message.contains("Check Digit"));
            }
            other => panic!("expected registry error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_results_fail() {
        assert!(matches!(
            decode_json(r#"{"Count":0,"Results":[]}"#),
            Err(ServiceFailure::EmptyResult)
        ));
    }
}
