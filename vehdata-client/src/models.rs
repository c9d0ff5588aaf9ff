//! Normalized record types returned by the client
//!
//! Registry responses never leave the source adapters; everything callers
//! see is one of these shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Decoded identity/specification for one VIN
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleSpecification {
    pub vin: String,
    pub make: Option<String>,
    pub model: Option<String>,
    pub model_year: Option<u16>,
    pub trim: Option<String>,
    pub engine: EngineSpec,
    pub body: BodySpec,
    pub safety: SafetyEquipment,
    pub transmission: Option<TransmissionSpec>,
    pub weight: Option<WeightSpec>,
    pub decoded_at: DateTime<Utc>,
    /// Registry that produced the record
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSpec {
    /// 0 when the registry has no value
    pub cylinders: u32,
    /// Liters; 0.0 when the registry has no value
    pub displacement_liters: f64,
    pub fuel_type: String,
    pub horsepower: Option<f64>,
    pub manufacturer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodySpec {
    pub body_type: String,
    pub doors: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyEquipment {
    pub anti_lock_brakes: bool,
    pub electronic_stability_control: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransmissionSpec {
    pub transmission_type: String,
    pub speeds: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightSpec {
    pub gross_vehicle_weight_rating_lbs: Option<f64>,
    pub curb_weight_lbs: Option<f64>,
}

/// One recall campaign as published by the recall registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecallRecord {
    pub manufacturer: String,
    /// Natural key within a manufacturer
    pub campaign_number: String,
    pub received_date: String,
    pub component: String,
    pub summary: String,
    pub consequence: String,
    pub remedy: String,
    pub model_year: String,
    pub make: String,
    pub model: String,
}

/// One consumer complaint as published by the complaint registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplaintRecord {
    /// Registry identifier (natural key)
    pub odi_number: u64,
    pub manufacturer: String,
    pub crash: bool,
    pub fire: bool,
    pub injuries: u32,
    pub deaths: u32,
    pub incident_date: Option<String>,
    pub filed_date: Option<String>,
    pub components: String,
    pub summary: String,
    pub vin: Option<String>,
}

/// Crash-test ratings for one registry vehicle
///
/// Stars are 0-5 with 0 meaning "not rated". Values outside that range are
/// kept as sent; a fractional rating is rounded to the nearest whole star.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyRatingRecord {
    pub vehicle_id: u64,
    pub description: Option<String>,
    pub overall: i32,
    pub front_driver: i32,
    pub front_passenger: i32,
    pub side: i32,
    pub rollover: i32,
    /// Rollover risk in percent
    pub rollover_risk_percent: f64,
    /// Feature name to availability (standard or optional equipment)
    pub features: BTreeMap<String, bool>,
    pub last_updated: DateTime<Utc>,
}

/// Unresolved fuel-economy search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuelEconomyCandidate {
    pub id: String,
    /// Engine/transmission summary, e.g. "Auto 9-spd, 6 cyl, 3.2 L, 4WD"
    pub description: String,
}

/// Fuel-economy figures for one resolved registry vehicle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelEconomyRecord {
    pub id: String,
    pub city_mpg: f64,
    pub highway_mpg: f64,
    pub combined_mpg: f64,
    pub annual_fuel_cost: f64,
    pub co2_grams_per_mile: f64,
    pub last_updated: DateTime<Utc>,
}
