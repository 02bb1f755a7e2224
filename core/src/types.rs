//! Domain DTOs for the waste reporting API.
//!
//! # Design
//! Request payloads are typed. Most responses are handed back as
//! `serde_json::Value` because the UI renders them directly and the server
//! shape drifts; only the analysis result gets a fixed record (see
//! `normalize`).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Parsed JSON body plus the HTTP status it arrived with.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedResponse {
    pub status: u16,
    pub body: Value,
}

/// Flattened outcome of a waste analysis. Every field is always populated;
/// missing server fields fall back to fixed defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WasteAnalysisResult {
    pub waste_type: String,
    pub urgency: String,
    pub severity: String,
    pub reasoning: String,
    pub segregation: String,
    pub segregation_reason: String,
    pub id: String,
    pub created_at: String,
}

/// Input for `RemoteServiceClient::analyze_waste`.
///
/// Coordinates are optional so that a caller passing through whatever the
/// location service produced gets a typed validation error instead of a
/// server round-trip.
#[derive(Debug, Clone, Default)]
pub struct AnalysisRequest {
    pub location_text: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub image: Option<String>,
}

/// Input for `RemoteServiceClient::submit_report`. The image is required;
/// missing coordinates are replaced by the configured fallback.
#[derive(Debug, Clone, Default)]
pub struct ReportRequest {
    pub image: Option<String>,
    pub location_text: String,
    pub coordinates: Option<Coordinates>,
}

/// Token and user record returned by login and signup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub token: String,
    #[serde(default)]
    pub user: Value,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct LoginPayload<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct SignupPayload<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

/// Page selector for history reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub limit: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self { page: 1, limit: 10 }
    }
}
