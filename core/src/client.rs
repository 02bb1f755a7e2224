//! Request executor and the waste reporting operations built on it.
//!
//! # Design
//! `build_request` and `parse_response` are pure: the first turns a method,
//! path and body into an `HttpRequest` with normalized headers, the second
//! turns an `HttpResponse` into parsed JSON or an error. `RemoteServiceClient`
//! glues them to an injected `Transport`. Operations add endpoint-specific
//! field mapping on top and never retry: a failed attempt is returned to the
//! caller as is.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::credential::{CredentialHolder, TokenStore};
use crate::error::{ClientError, StoreError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, MultipartForm, RequestBody};
use crate::image::{BlobImageEncoder, FileImageEncoder, ImageEncoder};
use crate::task::AbandonableTask;
use crate::transport::{ReqwestTransport, Transport};
use crate::types::{
    AnalysisRequest, AuthSession, Coordinates, LoginPayload, NormalizedResponse, Page, ReportRequest,
    SignupPayload, WasteAnalysisResult,
};

pub const CONTENT_TYPE: &str = "content-type";
pub const AUTHORIZATION: &str = "authorization";
pub const JSON_CONTENT_TYPE: &str = "application/json";

pub struct RemoteServiceClient {
    config: ClientConfig,
    credentials: Arc<CredentialHolder>,
    transport: Arc<dyn Transport>,
    images: Arc<dyn ImageEncoder>,
}

impl std::fmt::Debug for RemoteServiceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteServiceClient")
            .field("base_url", &self.config.base_url)
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

impl RemoteServiceClient {
    pub fn new(
        config: ClientConfig,
        credentials: Arc<CredentialHolder>,
        transport: Arc<dyn Transport>,
        images: Arc<dyn ImageEncoder>,
    ) -> Self {
        let config = ClientConfig {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            ..config
        };
        Self {
            config,
            credentials,
            transport,
            images,
        }
    }

    /// Client whose credential is read once from `store` under
    /// `config.token_key` and written back there on login and logout.
    pub fn with_store(
        config: ClientConfig,
        store: Arc<dyn TokenStore>,
        transport: Arc<dyn Transport>,
        images: Arc<dyn ImageEncoder>,
    ) -> Result<Self, StoreError> {
        let credentials = Arc::new(CredentialHolder::load(store, &config.token_key)?);
        Ok(Self::new(config, credentials, transport, images))
    }

    /// Client for native hosts: images are sent from local file URIs.
    pub fn native(config: ClientConfig, credentials: Arc<CredentialHolder>) -> Result<Self, ClientError> {
        let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new()?);
        Ok(Self::new(config, credentials, transport, Arc::new(FileImageEncoder)))
    }

    /// Client for browser-like hosts: image URIs are fetched and uploaded as
    /// blobs.
    pub fn browser(config: ClientConfig, credentials: Arc<CredentialHolder>) -> Result<Self, ClientError> {
        let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new()?);
        let images = Arc::new(BlobImageEncoder::new(transport.clone()));
        Ok(Self::new(config, credentials, transport, images))
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Credential
    // -----------------------------------------------------------------------

    pub fn token(&self) -> Option<String> {
        self.credentials.get()
    }

    /// Overwrite the held token. Requests already built are unaffected.
    pub fn set_token(&self, token: &str) {
        if let Err(e) = self.credentials.set(token) {
            warn!(error = %e, "token held in memory but not persisted");
        }
        info!("auth token set");
    }

    pub fn logout(&self) {
        if let Err(e) = self.credentials.clear() {
            warn!(error = %e, "token cleared in memory but not removed from storage");
        }
        info!("auth token cleared");
    }

    // -----------------------------------------------------------------------
    // Executor
    // -----------------------------------------------------------------------

    /// Build a request for `path` under the base endpoint.
    ///
    /// Extra headers come first and may override the JSON content type.
    /// A multipart body never carries a content type so the transport can
    /// set the boundary. The authorization header reflects the token held
    /// right now.
    pub fn build_request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<RequestBody>,
        extra_headers: &[(&str, &str)],
    ) -> HttpRequest {
        let multipart = body.as_ref().is_some_and(RequestBody::is_multipart);
        let mut headers: Vec<(String, String)> = extra_headers
            .iter()
            .filter(|(name, _)| !(multipart && name.eq_ignore_ascii_case(CONTENT_TYPE)))
            .filter(|(name, _)| !name.eq_ignore_ascii_case(AUTHORIZATION))
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();

        if !multipart && !headers.iter().any(|(name, _)| name.eq_ignore_ascii_case(CONTENT_TYPE)) {
            headers.push((CONTENT_TYPE.to_string(), JSON_CONTENT_TYPE.to_string()));
        }
        if let Some(token) = self.credentials.get() {
            headers.push((AUTHORIZATION.to_string(), format!("Bearer {token}")));
        }

        HttpRequest {
            method,
            url: format!("{}{path}", self.config.base_url),
            headers,
            body,
        }
    }

    /// Send one request and return its parsed JSON.
    pub async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<RequestBody>,
        extra_headers: &[(&str, &str)],
    ) -> Result<NormalizedResponse, ClientError> {
        let request = self.build_request(method, path, body, extra_headers);
        debug!(method = method.as_str(), url = %request.url, "sending request");
        let response = self.transport.execute(request).await?;
        parse_response(response)
    }

    async fn get(&self, path: &str) -> Result<Value, ClientError> {
        Ok(self.request(HttpMethod::Get, path, None, &[]).await?.body)
    }

    async fn send_json<T: Serialize>(&self, method: HttpMethod, path: &str, payload: &T) -> Result<Value, ClientError> {
        let body = json_body(payload)?;
        Ok(self.request(method, path, Some(body), &[]).await?.body)
    }

    async fn send_form(&self, path: &str, form: MultipartForm) -> Result<Value, ClientError> {
        Ok(self
            .request(HttpMethod::Post, path, Some(RequestBody::Multipart(form)), &[])
            .await?
            .body)
    }

    // -----------------------------------------------------------------------
    // Auth and profile
    // -----------------------------------------------------------------------

    /// Log in and hold the returned token.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, ClientError> {
        let response = self
            .request(
                HttpMethod::Post,
                "/auth/login",
                Some(json_body(&LoginPayload { email, password })?),
                &[],
            )
            .await?;
        self.start_session(response)
    }

    /// Register and hold the returned token.
    pub async fn signup(&self, name: &str, email: &str, password: &str) -> Result<AuthSession, ClientError> {
        let response = self
            .request(
                HttpMethod::Post,
                "/auth/signup",
                Some(json_body(&SignupPayload { name, email, password })?),
                &[],
            )
            .await?;
        self.start_session(response)
    }

    fn start_session(&self, response: NormalizedResponse) -> Result<AuthSession, ClientError> {
        let session: AuthSession =
            serde_json::from_value(response.body.clone()).map_err(|_| ClientError::MalformedResponse {
                status: response.status,
                body: response.body.to_string(),
            })?;
        self.set_token(&session.token);
        Ok(session)
    }

    pub async fn profile(&self) -> Result<Value, ClientError> {
        self.get("/auth/profile").await
    }

    pub async fn update_profile(&self, patch: &Value) -> Result<Value, ClientError> {
        self.send_json(HttpMethod::Patch, "/auth/profile", patch).await
    }

    // -----------------------------------------------------------------------
    // Analysis, classification and reports
    // -----------------------------------------------------------------------

    /// Multipart form for an analysis request, after validating its inputs.
    pub async fn build_analysis_form(&self, input: &AnalysisRequest) -> Result<MultipartForm, ClientError> {
        if input.location_text.trim().is_empty() {
            return Err(ClientError::Validation("location text is required".to_string()));
        }
        let lat = input
            .lat
            .filter(|v| v.is_finite())
            .ok_or_else(|| ClientError::Validation("latitude must be a number".to_string()))?;
        let lng = input
            .lng
            .filter(|v| v.is_finite())
            .ok_or_else(|| ClientError::Validation("longitude must be a number".to_string()))?;

        self.location_form(input.image.as_deref(), &input.location_text, Coordinates::new(lat, lng))
            .await
    }

    /// Submit a location and optional photo for AI analysis, bounded by the
    /// configured timeout.
    pub async fn analyze_waste(&self, input: &AnalysisRequest) -> Result<WasteAnalysisResult, ClientError> {
        let form = self.build_analysis_form(input).await?;
        let request = self.build_request(HttpMethod::Post, "/cleanup", Some(RequestBody::Multipart(form)), &[]);
        debug!(url = %request.url, "sending analysis request");

        let transport = Arc::clone(&self.transport);
        let task = AbandonableTask::spawn(async move { parse_response(transport.execute(request).await?) });
        let response = task.race(self.config.analysis_timeout).await??;
        Ok(WasteAnalysisResult::from_response(&response.body))
    }

    /// Classify waste from a text prompt and/or a photo. Whether at least
    /// one is present is for the server to judge.
    pub async fn classify(&self, prompt: Option<&str>, image: Option<&str>) -> Result<Value, ClientError> {
        let mut form = MultipartForm::new();
        if let Some(prompt) = prompt {
            form = form.text("prompt", prompt);
        }
        if let Some(uri) = image {
            form = form.field(self.images.encode(uri).await?);
        }
        self.send_form("/waste/classify", form).await
    }

    /// Persist a waste report and return the server's acknowledgment.
    pub async fn submit_report(&self, input: &ReportRequest) -> Result<Value, ClientError> {
        let image = input
            .image
            .as_deref()
            .ok_or_else(|| ClientError::Validation("an image is required to submit a report".to_string()))?;
        let coordinates = match input.coordinates {
            Some(coordinates) => coordinates,
            None => {
                let fallback = self.config.fallback_coordinates;
                warn!(lat = fallback.lat, lng = fallback.lng, "report has no coordinates, using fallback");
                fallback
            }
        };
        if !(coordinates.lat.is_finite() && coordinates.lng.is_finite()) {
            return Err(ClientError::Validation(format!(
                "report coordinates must be finite, got ({}, {})",
                coordinates.lat, coordinates.lng
            )));
        }
        let form = self.location_form(Some(image), &input.location_text, coordinates).await?;
        self.send_form("/reports", form).await
    }

    pub async fn update_report(&self, id: &str, patch: &Value) -> Result<Value, ClientError> {
        self.send_json(HttpMethod::Patch, &format!("/reports/{id}"), patch).await
    }

    async fn location_form(
        &self,
        image: Option<&str>,
        location_text: &str,
        coordinates: Coordinates,
    ) -> Result<MultipartForm, ClientError> {
        let mut form = MultipartForm::new()
            .text("locationText", location_text)
            .text("lat", coordinates.lat.to_string())
            .text("lng", coordinates.lng.to_string());
        if let Some(uri) = image {
            form = form.field(self.images.encode(uri).await?);
        }
        Ok(form)
    }

    // -----------------------------------------------------------------------
    // History and notifications
    // -----------------------------------------------------------------------

    pub async fn waste_history(&self, page: Page) -> Result<Value, ClientError> {
        self.get(&format!("/waste/history?page={}&limit={}", page.page, page.limit))
            .await
    }

    pub async fn cleanup_history(&self) -> Result<Value, ClientError> {
        self.get("/cleanup/history").await
    }

    pub async fn notifications(&self) -> Result<Value, ClientError> {
        self.get("/notifications").await
    }

    pub async fn mark_notification_read(&self, id: &str) -> Result<Value, ClientError> {
        Ok(self
            .request(HttpMethod::Patch, &format!("/notifications/{id}/read"), None, &[])
            .await?
            .body)
    }
}

fn json_body<T: Serialize>(payload: &T) -> Result<RequestBody, ClientError> {
    serde_json::to_string(payload)
        .map(RequestBody::Json)
        .map_err(|e| ClientError::Serialization(e.to_string()))
}

/// Interpret a raw response.
///
/// The body's first character must be `{` or `[`, with no leading
/// whitespace, and the text must parse; otherwise the raw text comes back
/// in `MalformedResponse`. A status outside 200..=299 then fails with the
/// body's `message`, its `error`, or a generic `HTTP Error: <status>`.
pub fn parse_response(response: HttpResponse) -> Result<NormalizedResponse, ClientError> {
    let HttpResponse { status, body, .. } = response;
    if !(body.starts_with('{') || body.starts_with('[')) {
        return Err(ClientError::MalformedResponse { status, body });
    }
    let parsed: Value = match serde_json::from_str(&body) {
        Ok(value) => value,
        Err(_) => return Err(ClientError::MalformedResponse { status, body }),
    };

    if !(200..300).contains(&status) {
        let message = server_message(&parsed).unwrap_or_else(|| format!("HTTP Error: {status}"));
        return Err(ClientError::Api { status, message });
    }
    Ok(NormalizedResponse { status, body: parsed })
}

fn server_message(body: &Value) -> Option<String> {
    ["message", "error"].iter().find_map(|key| match body.get(*key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    })
}
