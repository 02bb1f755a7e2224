//! Fake transports shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use waste_client::{
    BoxFuture, ClientConfig, ClientError, CredentialHolder, FileImageEncoder, HttpRequest, HttpResponse,
    ImageEncoder, RemoteServiceClient, Transport,
};

/// Records every request and answers from a queue of canned responses.
/// An empty queue answers `200 {}`.
#[derive(Default)]
pub struct RecordingTransport {
    requests: Mutex<Vec<HttpRequest>>,
    responses: Mutex<VecDeque<Result<HttpResponse, ClientError>>>,
    fetched: Mutex<Vec<String>>,
    delay: Option<Duration>,
    blob: Vec<u8>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `execute` sleeps this long (on tokio's clock) before answering.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn with_blob(blob: &[u8]) -> Self {
        Self {
            blob: blob.to_vec(),
            ..Self::default()
        }
    }

    pub fn respond(&self, status: u16, body: &str) -> &Self {
        self.responses.lock().unwrap().push_back(Ok(HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }));
        self
    }

    pub fn fail(&self, error: ClientError) -> &Self {
        self.responses.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> HttpRequest {
        self.requests.lock().unwrap().last().cloned().expect("no request recorded")
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

impl Transport for RecordingTransport {
    fn execute(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, ClientError>> {
        Box::pin(async move {
            self.requests.lock().unwrap().push(request);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let next = self.responses.lock().unwrap().pop_front();
            next.unwrap_or_else(|| {
                Ok(HttpResponse {
                    status: 200,
                    headers: Vec::new(),
                    body: "{}".to_string(),
                })
            })
        })
    }

    fn fetch_bytes<'a>(&'a self, uri: &'a str) -> BoxFuture<'a, Result<Vec<u8>, ClientError>> {
        Box::pin(async move {
            self.fetched.lock().unwrap().push(uri.to_string());
            Ok(self.blob.clone())
        })
    }
}

pub fn client_for(transport: Arc<RecordingTransport>) -> RemoteServiceClient {
    client_with(transport, Arc::new(CredentialHolder::new()), Arc::new(FileImageEncoder))
}

pub fn client_with(
    transport: Arc<RecordingTransport>,
    credentials: Arc<CredentialHolder>,
    images: Arc<dyn ImageEncoder>,
) -> RemoteServiceClient {
    RemoteServiceClient::new(
        ClientConfig::new("https://waste.example.org/api"),
        credentials,
        transport,
        images,
    )
}
