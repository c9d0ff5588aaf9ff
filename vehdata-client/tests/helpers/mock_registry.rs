//! In-process stand-in for the vPIC, NHTSA and FuelEconomy.gov services
//!
//! Serves canned responses for a 2017 Jeep Cherokee on an ephemeral port and
//! counts the hits per endpoint so tests can tell cache hits from fetches.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use vehdata_client::cache::DurableStore;
use vehdata_client::config::RateLimits;
use vehdata_client::{ClientConfig, VehicleDataClient};

pub const CHEROKEE_VIN: &str = "1C4PJMBS9HW664582";
/// Valid check digit, but the mock registry reports a decode error for it
pub const UNDECODABLE_VIN: &str = "1HGCM82633A004352";
pub const CHEROKEE_SAFETY_ID: u64 = 11901;
/// First 6-cylinder 3.2 L variant in the Cherokee menu
pub const CHEROKEE_V6_ID: &str = "38122";
/// Fuel-economy id that never answers within the test timeout
pub const SLOW_ID: &str = "99999";

#[derive(Default)]
pub struct Hits {
    pub decode: AtomicUsize,
    pub recalls: AtomicUsize,
    pub complaints: AtomicUsize,
    pub safety_search: AtomicUsize,
    pub safety_detail: AtomicUsize,
    pub fuel_menu: AtomicUsize,
    pub fuel_vehicle: AtomicUsize,
}

pub struct MockRegistry {
    pub base_url: String,
    pub hits: Arc<Hits>,
}

impl MockRegistry {
    pub async fn start() -> Self {
        let hits = Arc::new(Hits::default());

        let app = Router::new()
            .route("/vehicles/DecodeVinValues/:vin", get(decode_vin))
            .route("/recalls/recallsByVehicle", get(recalls))
            .route("/complaints/complaintsByVehicle", get(complaints))
            .route(
                "/SafetyRatings/modelyear/:year/make/:make/model/:model",
                get(safety_search),
            )
            .route("/SafetyRatings/VehicleId/:id", get(safety_detail))
            .route("/vehicle/menu/options", get(fuel_menu))
            .route("/vehicle/:id", get(fuel_vehicle))
            .with_state(Arc::clone(&hits));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            hits,
        }
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

/// Every registry pointed at `base_url`, without throttling
pub fn test_config(base_url: &str) -> ClientConfig {
    let mut config = ClientConfig::with_single_base_url(base_url);
    config.rate_limits = RateLimits {
        vpic: 1000,
        nhtsa: 1000,
        fuel_economy: 1000,
    };
    config.http.timeout = Duration::from_millis(500);
    config
}

pub fn test_client(
    registry: &MockRegistry,
    durable: Option<Arc<dyn DurableStore>>,
) -> VehicleDataClient {
    VehicleDataClient::new(&test_config(&registry.base_url), durable).unwrap()
}

type Hit = State<Arc<Hits>>;
type Params = Query<HashMap<String, String>>;

fn is_cherokee(make: &str, model: &str, year: &str) -> bool {
    make.eq_ignore_ascii_case("jeep") && model.eq_ignore_ascii_case("cherokee") && year == "2017"
}

fn vehicle_params(params: &HashMap<String, String>, year_key: &str) -> (String, String, String) {
    let field = |name: &str| params.get(name).cloned().unwrap_or_default();
    (field("make"), field("model"), field(year_key))
}

async fn decode_vin(State(hits): Hit, Path(vin): Path<String>) -> Json<Value> {
    hits.decode.fetch_add(1, Ordering::SeqCst);

    if vin == UNDECODABLE_VIN {
        return Json(json!({
            "Count": 1,
            "Message": "Results returned successfully",
            "Results": [{
                "Make": "", "Model": "", "ModelYear": "",
                "ErrorCode": "8",
                "ErrorText": "8 - No detailed data available currently"
            }]
        }));
    }

    Json(json!({
        "Count": 1,
        "Message": "Results returned successfully",
        "Results": [{
            "Make": "JEEP", "Model": "Cherokee", "ModelYear": "2017", "Trim": "Limited",
            "EngineCylinders": "6", "DisplacementL": "3.2", "FuelTypePrimary": "Gasoline",
            "EngineHP": "271", "EngineManufacturer": "",
            "BodyClass": "Sport Utility Vehicle (SUV)/Multi-Purpose Vehicle (MPV)",
            "Doors": "4", "ABS": "", "ESC": "Standard",
            "TransmissionStyle": "Automatic", "TransmissionSpeeds": "9",
            "GVWR": "Class 1D: 5,001 - 6,000 lb (2,268 - 2,722 kg)", "CurbWeightLB": "",
            "ErrorCode": "0",
            "ErrorText": "0 - VIN decoded clean. Check Digit (9th position) is correct"
        }]
    }))
}

async fn recalls(State(hits): Hit, Query(params): Params) -> Response {
    hits.recalls.fetch_add(1, Ordering::SeqCst);
    let (make, model, year) = vehicle_params(&params, "modelYear");

    if model.eq_ignore_ascii_case("broken") {
        return (StatusCode::INTERNAL_SERVER_ERROR, "upstream unavailable").into_response();
    }
    if year.parse::<u16>().is_err() {
        return Json(json!({"Count": 0, "Message": "Invalid parameter: modelYear", "results": []}))
            .into_response();
    }
    if !is_cherokee(&make, &model, &year) {
        return Json(json!({"Count": 0, "Message": "Results returned successfully", "results": []}))
            .into_response();
    }

    Json(json!({
        "Count": 2,
        "Message": "Results returned successfully",
        "results": [
            {
                "Manufacturer": "FCA US LLC", "NHTSACampaignNumber": "17V477000",
                "ReportReceivedDate": "26/07/2017", "Component": "ELECTRICAL SYSTEM",
                "Summary": "The alternator may fail.", "Consequence": "The vehicle may stall.",
                "Remedy": "Dealers will replace the alternator.",
                "ModelYear": "2017", "Make": "JEEP", "Model": "CHEROKEE"
            },
            {
                "Manufacturer": "FCA US LLC", "NHTSACampaignNumber": "18V332000",
                "ReportReceivedDate": "17/05/2018", "Component": "SPEED CONTROL",
                "Summary": "Cruise control may not disengage.", "Consequence": "Crash risk.",
                "Remedy": "Software update.",
                "ModelYear": "2017", "Make": "JEEP", "Model": "CHEROKEE"
            }
        ]
    }))
    .into_response()
}

async fn complaints(State(hits): Hit, Query(params): Params) -> Json<Value> {
    hits.complaints.fetch_add(1, Ordering::SeqCst);
    let (make, model, year) = vehicle_params(&params, "modelYear");

    if !is_cherokee(&make, &model, &year) {
        return Json(json!({"count": 0, "message": "Results returned successfully", "results": []}));
    }

    Json(json!({
        "count": 1,
        "message": "Results returned successfully",
        "results": [{
            "odiNumber": 11033475, "manufacturer": "FCA US LLC",
            "crash": false, "fire": false, "numberOfInjuries": 0, "numberOfDeaths": 0,
            "dateOfIncident": "09/23/2017", "dateComplaintFiled": "10/05/2017",
            "vin": "1C4PJMBS9HW", "components": "ELECTRICAL SYSTEM",
            "summary": "Vehicle lost power while driving.", "products": []
        }]
    }))
}

async fn safety_search(
    State(hits): Hit,
    Path((year, make, model)): Path<(String, String, String)>,
) -> Json<Value> {
    hits.safety_search.fetch_add(1, Ordering::SeqCst);

    if !is_cherokee(&make, &model, &year) {
        return Json(json!({"Count": 0, "Message": "No results found for this request", "Results": []}));
    }

    Json(json!({
        "Count": 1,
        "Message": "Results returned successfully",
        "Results": [
            {"VehicleDescription": "2017 Jeep Cherokee SUV FWD", "VehicleId": CHEROKEE_SAFETY_ID}
        ]
    }))
}

async fn safety_detail(State(hits): Hit, Path(id): Path<u64>) -> Json<Value> {
    hits.safety_detail.fetch_add(1, Ordering::SeqCst);

    if id != CHEROKEE_SAFETY_ID {
        return Json(json!({"Count": 0, "Message": "No results found for this request", "Results": []}));
    }

    Json(json!({
        "Count": 1,
        "Message": "Results returned successfully",
        "Results": [{
            "VehicleId": CHEROKEE_SAFETY_ID,
            "VehicleDescription": "2017 Jeep Cherokee SUV FWD",
            "OverallRating": "4",
            "FrontCrashDriversideRating": "4",
            "FrontCrashPassengersideRating": "4",
            "OverallSideCrashRating": "5",
            "RolloverRating": "4",
            "RolloverPossibility": 0.169,
            "NHTSAElectronicStabilityControl": "Standard",
            "NHTSAForwardCollisionWarning": "Optional",
            "NHTSALaneDepartureWarning": "Optional"
        }]
    }))
}

async fn fuel_menu(State(hits): Hit, Query(params): Params) -> Response {
    hits.fuel_menu.fetch_add(1, Ordering::SeqCst);
    let (make, model, year) = vehicle_params(&params, "year");

    if is_cherokee(&make, &model, &year) {
        return Json(json!({
            "menuItem": [
                {"text": "Auto (S9), 4 cyl, 2.4 L", "value": "38120"},
                {"text": "Auto (S9), 4 cyl, 2.4 L, 4WD", "value": "38121"},
                {"text": "Auto (S9), 6 cyl, 3.2 L", "value": "38122"},
                {"text": "Auto (S9), 6 cyl, 3.2 L, 4WD", "value": "38123"},
                {"text": "Auto (S9), 6 cyl, 3.2 L, SIDI", "value": "38124"},
                {"text": "Auto (S9), 6 cyl, 3.2 L, 4WD, SIDI", "value": "38125"}
            ]
        }))
        .into_response();
    }

    if model.eq_ignore_ascii_case("renegade") {
        return Json(json!({"menuItem": {"text": "Auto (S9), 4 cyl, 2.4 L", "value": "38200"}}))
            .into_response();
    }

    // The real service answers an unknown vehicle with an empty body
    (StatusCode::OK, "").into_response()
}

async fn fuel_vehicle(State(hits): Hit, Path(id): Path<String>) -> Response {
    hits.fuel_vehicle.fetch_add(1, Ordering::SeqCst);

    match id.as_str() {
        CHEROKEE_V6_ID => Json(json!({
            "id": 38122, "make": "Jeep", "model": "Cherokee FWD", "year": 2017,
            "city08": 21, "highway08": 29, "comb08": 24,
            "fuelCost08": 1800, "co2TailpipeGpm": 370.0
        }))
        .into_response(),
        SLOW_ID => {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({"id": 99999})).into_response()
        }
        _ => (StatusCode::OK, "").into_response(),
    }
}
