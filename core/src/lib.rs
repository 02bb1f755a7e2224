//! Async API client for the waste reporting service.
//!
//! # Overview
//! `RemoteServiceClient` talks to the reporting backend: authentication,
//! AI-backed waste analysis and classification, report submission, history
//! and notifications. UI code supplies text, image URIs and credentials and
//! renders whatever comes back.
//!
//! # Design
//! - Request building and response parsing are pure (`build_request`,
//!   `parse_response`); the round-trip goes through an injected `Transport`
//!   (`ReqwestTransport` in production).
//! - The bearer token lives in an injected `CredentialHolder`, optionally
//!   backed by a persistent `TokenStore`.
//! - Image attachment goes through an `ImageEncoder` chosen per platform.
//! - Analysis runs as an `AbandonableTask` raced against a deadline.
//! - No retries: every failure surfaces once as a `ClientError`.

pub mod client;
pub mod config;
pub mod credential;
pub mod error;
pub mod http;
pub mod image;
pub mod normalize;
pub mod task;
pub mod transport;
pub mod types;

pub use client::{parse_response, RemoteServiceClient};
pub use config::ClientConfig;
pub use credential::{CredentialHolder, FileTokenStore, MemoryTokenStore, TokenStore};
pub use error::{ClientError, ConfigError, StoreError};
pub use http::{FileContent, HttpMethod, HttpRequest, HttpResponse, MultipartField, MultipartForm, RequestBody};
pub use image::{BlobImageEncoder, FileImageEncoder, ImageEncoder};
pub use transport::{BoxFuture, ReqwestTransport, Transport};
pub use types::{
    AnalysisRequest, AuthSession, Coordinates, NormalizedResponse, Page, ReportRequest, WasteAnalysisResult,
};
