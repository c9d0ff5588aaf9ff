//! Registry adapters
//!
//! One adapter per external registry. Each builds its request, performs the
//! call through [`RegistryHttp`], and maps the response into a
//! [`crate::models`] record. Raw response shapes stay private to their
//! adapter module.

pub mod complaints;
pub mod fuel_economy;
pub mod recalls;
pub mod safety_ratings;
pub mod vpic;

pub use complaints::ComplaintsClient;
pub use fuel_economy::FuelEconomyClient;
pub use recalls::RecallsClient;
pub use safety_ratings::SafetyRatingsClient;
pub use vpic::VpicClient;

use crate::error::{ServiceError, ServiceFailure};
use governor::{Quota, RateLimiter};
use reqwest::header::ACCEPT;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::num::NonZeroU32;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::debug;

/// Longest error body kept in [`ServiceFailure::Status`]
const MAX_ERROR_BODY: usize = 512;

type DirectRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Outbound HTTP settings applied to every registry client
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: concat!("vehdata/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Rate-limited JSON GETs against one registry
pub struct RegistryHttp {
    service: &'static str,
    base_url: Url,
    client: reqwest::Client,
    rate_limiter: DirectRateLimiter,
}

impl RegistryHttp {
    pub fn new(
        service: &'static str,
        base_url: &str,
        settings: &HttpSettings,
        requests_per_second: u32,
    ) -> Result<Self, ServiceError> {
        let base_url = Url::parse(base_url).map_err(|e| {
            ServiceError::new(
                service,
                ServiceFailure::InvalidRequest(format!("bad base URL {}: {}", base_url, e)),
            )
        })?;

        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(settings.timeout)
            .build()
            .map_err(|e| ServiceError::new(service, ServiceFailure::Network(e.to_string())))?;

        let per_second = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            service,
            base_url,
            client,
            rate_limiter: RateLimiter::direct(Quota::per_second(per_second)),
        })
    }

    pub fn fail(&self, cause: ServiceFailure) -> ServiceError {
        ServiceError::new(self.service, cause)
    }

    /// Trimmed lookup parameter; blank values never reach the registry
    pub fn require<'a>(&self, name: &str, value: &'a str) -> Result<&'a str, ServiceError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(self.fail(ServiceFailure::InvalidRequest(format!(
                "{} must not be empty",
                name
            ))));
        }
        Ok(value)
    }

    /// Base URL extended by percent-encoded path segments
    pub fn url(&self, segments: &[&str]) -> Result<Url, ServiceError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                self.fail(ServiceFailure::InvalidRequest(format!(
                    "base URL {} cannot take a path",
                    self.base_url
                )))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Response body of a successful GET
    pub async fn get_text(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<String, ServiceError> {
        self.rate_limiter.until_ready().await;

        let url = self.url(segments)?;
        debug!(service = self.service, url = %url, "Querying registry");

        let response = self
            .client
            .get(url)
            .query(query)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            truncate_at_char_boundary(&mut body, MAX_ERROR_BODY);
            return Err(self.fail(ServiceFailure::Status {
                status: status.as_u16(),
                body,
            }));
        }

        response.text().await.map_err(|e| self.transport_error(e))
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<T, ServiceError> {
        let body = self.get_text(segments, query).await?;
        self.parse(&body)
    }

    pub fn parse<T: DeserializeOwned>(&self, body: &str) -> Result<T, ServiceError> {
        serde_json::from_str(body).map_err(|e| self.fail(ServiceFailure::Parse(e.to_string())))
    }

    fn transport_error(&self, error: reqwest::Error) -> ServiceError {
        if error.is_timeout() {
            self.fail(ServiceFailure::Timeout)
        } else {
            self.fail(ServiceFailure::Network(error.to_string()))
        }
    }
}

fn truncate_at_char_boundary(text: &mut String, max: usize) {
    if text.len() > max {
        let mut end = max;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
    }
}

/// Leading decimal number of a registry string ("3.2", "285 hp", "6")
pub(crate) fn parse_leading_number(raw: &str) -> Option<f64> {
    static LEADING_NUMBER: OnceLock<regex::Regex> = OnceLock::new();
    let pattern = LEADING_NUMBER.get_or_init(|| {
        regex::Regex::new(r"^\s*([+-]?(?:\d+(?:\.\d*)?|\.\d+))").expect("static pattern")
    });

    pattern
        .captures(raw)
        .and_then(|c| c[1].parse::<f64>().ok())
        .filter(|n| n.is_finite())
}

/// Trimmed registry string, treating blanks and "Not Applicable" as absent
pub(crate) fn non_empty(raw: Option<&str>) -> Option<String> {
    let value = raw?.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("not applicable") {
        None
    } else {
        Some(value.to_string())
    }
}

/// Number from a JSON number or numeric string
pub(crate) fn number_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

/// `deserialize_with` helper accepting numbers, numeric strings or null
pub(crate) fn de_opt_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(number_from_value))
}

/// `deserialize_with` helper for counts; null, negative or non-numeric reads as 0
pub(crate) fn de_lossy_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let count = de_opt_number(deserializer)?;
    Ok(count.map_or(0, |n| n.round() as u32))
}

/// `deserialize_with` helper for flags; accepts booleans, "Y"/"N", "true"/"false", 0/1 or null
pub(crate) fn de_lossy_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(flag)) => flag,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(s)) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "y" | "yes" | "true" | "1"
        ),
        _ => false,
    })
}

/// `deserialize_with` helper accepting strings, numbers or null as text
pub(crate) fn de_lossy_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => s,
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    })
}

/// Registry message that signals a failure inside a 200 response
///
/// The NHTSA endpoints report problems in a `Message` field while still
/// answering 200 with an empty result list.
pub(crate) fn message_failure(message: Option<&str>) -> Option<ServiceFailure> {
    let message = message?.trim();
    let lower = message.to_ascii_lowercase();
    if lower.contains("error") || lower.contains("invalid") {
        Some(ServiceFailure::Registry {
            code: "message".to_string(),
            message: message.to_string(),
        })
    } else {
        None
    }
}

/// A JSON field that is either a single object or an array of them
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}
