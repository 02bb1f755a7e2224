//! In-memory stand-in for the waste reporting backend.
//!
//! Every route lives under `/api`. Errors are JSON `{"message": ...}`
//! bodies except for classification, which reports input problems under
//! `error`, and unknown routes, which answer with plain text.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
}

#[derive(Deserialize)]
pub struct Signup {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct Login {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Deserialize)]
pub struct ReportPatch {
    pub status: Option<String>,
    pub notes: Option<String>,
}

#[derive(Deserialize)]
pub struct PageQuery {
    #[serde(default = "first_page")]
    pub page: usize,
    #[serde(default = "page_limit")]
    pub limit: usize,
}

fn first_page() -> usize {
    1
}

fn page_limit() -> usize {
    10
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub waste_type: String,
    pub urgency: String,
    pub severity: String,
    pub reasoning: String,
    pub segregation: String,
    pub segregation_reason: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cleanup {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub location_text: String,
    pub lat: f64,
    pub lng: f64,
    pub image_name: Option<String>,
    pub analysis: Analysis,
    pub created_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub location_text: String,
    pub lat: f64,
    pub lng: f64,
    pub image_name: String,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub prompt: Option<String>,
    pub waste_type: String,
    pub confidence: f64,
    pub tips: String,
    pub created_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub message: String,
    pub read: bool,
    pub created_at: String,
}

#[derive(Default)]
pub struct Store {
    pub users: HashMap<String, User>,
    pub sessions: HashMap<String, String>,
    pub cleanups: Vec<Cleanup>,
    pub reports: Vec<Report>,
    pub classifications: Vec<Classification>,
    pub notifications: Vec<Notification>,
}

pub type Db = Arc<RwLock<Store>>;

/// A failed request rendered as a JSON body.
pub struct Failure {
    status: StatusCode,
    key: &'static str,
    message: String,
}

impl Failure {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            key: "message",
            message: message.into(),
        }
    }

    fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized")
    }

    fn under_error_key(mut self) -> Self {
        self.key = "error";
        self
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        let mut body = serde_json::Map::new();
        body.insert(self.key.to_string(), Value::String(self.message));
        (self.status, Json(Value::Object(body))).into_response()
    }
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    let api = Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/profile", get(profile).patch(update_profile))
        .route("/cleanup", post(analyze_cleanup))
        .route("/cleanup/history", get(cleanup_history))
        .route("/waste/classify", post(classify))
        .route("/waste/history", get(waste_history))
        .route("/reports", post(submit_report))
        .route("/reports/{id}", patch(update_report))
        .route("/notifications", get(list_notifications))
        .route("/notifications/{id}/read", patch(mark_read))
        .with_state(db);
    Router::new().nest("/api", api).fallback(not_found)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not Found")
}

/// Resolve the bearer token to a user id.
async fn authenticate(db: &Db, headers: &HeaderMap) -> Result<String, Failure> {
    let token = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(Failure::unauthorized)?;
    let store = db.read().await;
    store.sessions.get(token).cloned().ok_or_else(Failure::unauthorized)
}

fn issue_session(store: &mut Store, user: &User) -> Value {
    let token = new_id();
    store.sessions.insert(token.clone(), user.id.clone());
    json!({ "token": token, "user": user })
}

async fn signup(State(db): State<Db>, Json(input): Json<Signup>) -> Result<(StatusCode, Json<Value>), Failure> {
    if input.name.trim().is_empty() || input.email.trim().is_empty() || input.password.is_empty() {
        return Err(Failure::new(StatusCode::BAD_REQUEST, "Name, email and password are required"));
    }
    let mut store = db.write().await;
    if store.users.values().any(|u| u.email == input.email) {
        return Err(Failure::new(StatusCode::CONFLICT, "User already exists"));
    }
    let user = User {
        id: new_id(),
        name: input.name,
        email: input.email,
        password: input.password,
    };
    store.users.insert(user.id.clone(), user.clone());
    info!(email = %user.email, "user registered");
    Ok((StatusCode::CREATED, Json(issue_session(&mut store, &user))))
}

async fn login(State(db): State<Db>, Json(input): Json<Login>) -> Result<Json<Value>, Failure> {
    let mut store = db.write().await;
    let user = store
        .users
        .values()
        .find(|u| u.email == input.email && u.password == input.password)
        .cloned()
        .ok_or_else(|| Failure::new(StatusCode::UNAUTHORIZED, "Invalid credentials"))?;
    Ok(Json(issue_session(&mut store, &user)))
}

async fn profile(State(db): State<Db>, headers: HeaderMap) -> Result<Json<Value>, Failure> {
    let user_id = authenticate(&db, &headers).await?;
    let store = db.read().await;
    let user = store
        .users
        .get(&user_id)
        .ok_or_else(|| Failure::new(StatusCode::NOT_FOUND, "User not found"))?;
    Ok(Json(json!({ "user": user })))
}

async fn update_profile(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<ProfilePatch>,
) -> Result<Json<Value>, Failure> {
    let user_id = authenticate(&db, &headers).await?;
    let mut store = db.write().await;
    let user = store
        .users
        .get_mut(&user_id)
        .ok_or_else(|| Failure::new(StatusCode::NOT_FOUND, "User not found"))?;
    if let Some(name) = input.name {
        user.name = name;
    }
    if let Some(email) = input.email {
        user.email = email;
    }
    Ok(Json(json!({ "user": user })))
}

/// Text fields and the image (if any) of a multipart upload.
#[derive(Default)]
struct Upload {
    text: HashMap<String, String>,
    image_name: Option<String>,
}

impl Upload {
    fn required(&self, name: &str) -> Result<&str, Failure> {
        self.text
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| Failure::new(StatusCode::BAD_REQUEST, format!("{name} is required")))
    }

    fn coordinate(&self, name: &str) -> Result<f64, Failure> {
        self.required(name)?
            .parse()
            .map_err(|_| Failure::new(StatusCode::BAD_REQUEST, format!("{name} must be a number")))
    }
}

async fn read_upload(mut multipart: Multipart) -> Result<Upload, Failure> {
    let mut upload = Upload::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Failure::new(StatusCode::BAD_REQUEST, e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "image" {
            let filename = field.file_name().unwrap_or("upload").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| Failure::new(StatusCode::BAD_REQUEST, e.body_text()))?;
            if !bytes.is_empty() {
                upload.image_name = Some(filename);
            }
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| Failure::new(StatusCode::BAD_REQUEST, e.body_text()))?;
            upload.text.insert(name, value);
        }
    }
    Ok(upload)
}

/// Keyword classifier standing in for the AI model.
fn classify_text(text: &str) -> &'static str {
    let text = text.to_lowercase();
    [
        ("plastic", "Plastic"),
        ("bottle", "Plastic"),
        ("food", "Organic"),
        ("organic", "Organic"),
        ("glass", "Glass"),
        ("metal", "Metal"),
        ("can", "Metal"),
        ("paper", "Paper"),
        ("battery", "E-waste"),
    ]
    .iter()
    .find(|(keyword, _)| text.contains(keyword))
    .map(|(_, label)| *label)
    .unwrap_or("Mixed")
}

fn analyze(location_text: &str, has_image: bool) -> Analysis {
    let waste_type = classify_text(location_text);
    let (urgency, severity) = match (waste_type, has_image) {
        ("Mixed", true) | ("E-waste", _) => ("High", "Major"),
        (_, true) => ("Medium", "Moderate"),
        _ => ("Low", "Minor"),
    };
    Analysis {
        waste_type: waste_type.to_string(),
        urgency: urgency.to_string(),
        severity: severity.to_string(),
        reasoning: format!("Reported near {location_text}"),
        segregation: if waste_type == "Mixed" { "Not segregated" } else { "Segregated" }.to_string(),
        segregation_reason: if waste_type == "Mixed" {
            "Multiple waste streams detected".to_string()
        } else {
            format!("Only {waste_type} detected")
        },
    }
}

async fn analyze_cleanup(
    State(db): State<Db>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Cleanup>), Failure> {
    let user_id = authenticate(&db, &headers).await?;
    let upload = read_upload(multipart).await?;
    let location_text = upload.required("locationText")?.to_string();
    let cleanup = Cleanup {
        id: new_id(),
        user_id,
        analysis: analyze(&location_text, upload.image_name.is_some()),
        lat: upload.coordinate("lat")?,
        lng: upload.coordinate("lng")?,
        location_text,
        image_name: upload.image_name,
        created_at: now(),
    };
    db.write().await.cleanups.push(cleanup.clone());
    Ok((StatusCode::CREATED, Json(cleanup)))
}

async fn cleanup_history(State(db): State<Db>, headers: HeaderMap) -> Result<Json<Value>, Failure> {
    let user_id = authenticate(&db, &headers).await?;
    let store = db.read().await;
    let cleanups: Vec<&Cleanup> = store.cleanups.iter().filter(|c| c.user_id == user_id).collect();
    Ok(Json(json!({ "cleanups": cleanups })))
}

async fn classify(
    State(db): State<Db>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Json<Classification>, Failure> {
    let user_id = authenticate(&db, &headers).await?;
    let upload = read_upload(multipart).await?;
    let prompt = upload.text.get("prompt").filter(|p| !p.trim().is_empty()).cloned();
    if prompt.is_none() && upload.image_name.is_none() {
        return Err(Failure::new(StatusCode::BAD_REQUEST, "Provide a prompt or an image").under_error_key());
    }
    let source = prompt.clone().or_else(|| upload.image_name.clone()).unwrap_or_default();
    let waste_type = classify_text(&source);
    let classification = Classification {
        id: new_id(),
        user_id,
        prompt,
        waste_type: waste_type.to_string(),
        confidence: if waste_type == "Mixed" { 0.4 } else { 0.9 },
        tips: format!("Dispose of {waste_type} waste at the matching collection point"),
        created_at: now(),
    };
    db.write().await.classifications.push(classification.clone());
    Ok(Json(classification))
}

async fn waste_history(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>, Failure> {
    let user_id = authenticate(&db, &headers).await?;
    let store = db.read().await;
    let mine: Vec<&Classification> = store
        .classifications
        .iter()
        .rev()
        .filter(|c| c.user_id == user_id)
        .collect();
    let limit = query.limit.max(1);
    let items: Vec<&Classification> = mine
        .iter()
        .skip(query.page.saturating_sub(1).saturating_mul(limit))
        .take(limit)
        .copied()
        .collect();
    Ok(Json(json!({
        "items": items,
        "page": query.page,
        "limit": limit,
        "total": mine.len(),
    })))
}

async fn submit_report(
    State(db): State<Db>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), Failure> {
    let user_id = authenticate(&db, &headers).await?;
    let upload = read_upload(multipart).await?;
    let image_name = upload
        .image_name
        .clone()
        .ok_or_else(|| Failure::new(StatusCode::BAD_REQUEST, "Image is required"))?;
    let report = Report {
        id: new_id(),
        user_id: user_id.clone(),
        location_text: upload.required("locationText")?.to_string(),
        lat: upload.coordinate("lat")?,
        lng: upload.coordinate("lng")?,
        image_name,
        status: "pending".to_string(),
        notes: None,
        created_at: now(),
    };
    let mut store = db.write().await;
    store.reports.push(report.clone());
    store.notifications.push(Notification {
        id: new_id(),
        user_id,
        message: format!("Your report at {} was received", report.location_text),
        read: false,
        created_at: now(),
    });
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Report submitted", "report": report })),
    ))
}

async fn update_report(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(input): Json<ReportPatch>,
) -> Result<Json<Value>, Failure> {
    authenticate(&db, &headers).await?;
    let mut store = db.write().await;
    let report = store
        .reports
        .iter_mut()
        .find(|r| r.id == id)
        .ok_or_else(|| Failure::new(StatusCode::NOT_FOUND, "Report not found"))?;
    let status_changed = input.status.is_some();
    if let Some(status) = input.status {
        report.status = status;
    }
    if let Some(notes) = input.notes {
        report.notes = Some(notes);
    }
    let report = report.clone();
    if status_changed {
        store.notifications.push(Notification {
            id: new_id(),
            user_id: report.user_id.clone(),
            message: format!("Your report is now {}", report.status),
            read: false,
            created_at: now(),
        });
    }
    Ok(Json(json!({ "report": report })))
}

async fn list_notifications(State(db): State<Db>, headers: HeaderMap) -> Result<Json<Value>, Failure> {
    let user_id = authenticate(&db, &headers).await?;
    let store = db.read().await;
    let notifications: Vec<&Notification> = store
        .notifications
        .iter()
        .filter(|n| n.user_id == user_id)
        .collect();
    Ok(Json(json!({ "notifications": notifications })))
}

async fn mark_read(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, Failure> {
    let user_id = authenticate(&db, &headers).await?;
    let mut store = db.write().await;
    let notification = store
        .notifications
        .iter_mut()
        .find(|n| n.id == id && n.user_id == user_id)
        .ok_or_else(|| Failure::new(StatusCode::NOT_FOUND, "Notification not found"))?;
    notification.read = true;
    Ok(Json(json!({ "notification": notification })))
}
