//! The network boundary.
//!
//! `Transport` executes one `HttpRequest` and returns the raw
//! `HttpResponse`; it never interprets status codes or bodies. It also
//! dereferences image URIs for the blob encoder. Futures are boxed so the
//! trait stays object safe and the client can hold an `Arc<dyn Transport>`.

use std::future::Future;
use std::pin::Pin;

use reqwest::multipart::{Form, Part};
use tracing::debug;

use crate::error::ClientError;
use crate::http::{FileContent, HttpMethod, HttpRequest, HttpResponse, MultipartField, MultipartForm, RequestBody};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait Transport: Send + Sync {
    /// Perform the round-trip. Non-2xx statuses are data, not errors; only
    /// a failure of the transport itself is `Err`.
    fn execute(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, ClientError>>;

    /// Download the bytes behind `uri`.
    fn fetch_bytes<'a>(&'a self, uri: &'a str) -> BoxFuture<'a, Result<Vec<u8>, ClientError>>;
}

/// Production transport backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Transport for ReqwestTransport {
    fn execute(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, ClientError>> {
        Box::pin(async move {
            let method = match request.method {
                HttpMethod::Get => reqwest::Method::GET,
                HttpMethod::Post => reqwest::Method::POST,
                HttpMethod::Patch => reqwest::Method::PATCH,
            };
            let mut builder = self.client.request(method, &request.url);
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            builder = match request.body {
                None => builder,
                Some(RequestBody::Json(text)) => builder.body(text),
                Some(RequestBody::Multipart(form)) => builder.multipart(into_reqwest_form(form).await?),
            };

            let response = builder.send().await.map_err(network_error)?;
            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|v| (name.as_str().to_string(), v.to_string()))
                })
                .collect();
            let body = response.text().await.map_err(network_error)?;
            debug!(status, bytes = body.len(), "response received");
            Ok(HttpResponse {
                status,
                headers,
                body,
            })
        })
    }

    fn fetch_bytes<'a>(&'a self, uri: &'a str) -> BoxFuture<'a, Result<Vec<u8>, ClientError>> {
        Box::pin(async move {
            let response = self
                .client
                .get(uri)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(network_error)?;
            let bytes = response.bytes().await.map_err(network_error)?;
            Ok(bytes.to_vec())
        })
    }
}

fn network_error(e: reqwest::Error) -> ClientError {
    ClientError::Network(e.to_string())
}

/// Strip a `file://` scheme so the remainder can be opened as a path.
pub fn local_path(uri: &str) -> &str {
    uri.strip_prefix("file://").unwrap_or(uri)
}

async fn into_reqwest_form(form: MultipartForm) -> Result<Form, ClientError> {
    let mut out = Form::new();
    for field in form.fields {
        out = match field {
            MultipartField::Text { name, value } => out.text(name, value),
            MultipartField::File {
                name,
                filename,
                mime,
                content,
            } => {
                let bytes = match content {
                    FileContent::Bytes(bytes) => bytes,
                    FileContent::Uri(uri) => tokio::fs::read(local_path(&uri))
                        .await
                        .map_err(|e| ClientError::Network(format!("cannot read image {uri}: {e}")))?,
                };
                let part = Part::bytes(bytes)
                    .file_name(filename)
                    .mime_str(&mime)
                    .map_err(network_error)?;
                out.part(name, part)
            }
        };
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_path_strips_file_scheme() {
        assert_eq!(local_path("file:///data/photo.png"), "/data/photo.png");
        assert_eq!(local_path("/data/photo.png"), "/data/photo.png");
    }

    #[tokio::test]
    async fn missing_local_image_is_a_network_error() {
        let form = MultipartForm::new().field(MultipartField::File {
            name: "image".to_string(),
            filename: "gone.jpg".to_string(),
            mime: "image/jpeg".to_string(),
            content: FileContent::Uri("file:///definitely/not/here/gone.jpg".to_string()),
        });
        let err = into_reqwest_form(form).await.unwrap_err();
        assert!(matches!(err, ClientError::Network(msg) if msg.contains("gone.jpg")));
    }
}
