//! End-to-end flow against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives every client
//! operation over real HTTP through `ReqwestTransport`, including multipart
//! uploads of a real file on disk. Catches drift between the client's field
//! names and what the server actually reads.

use std::sync::Arc;

use serde_json::json;
use waste_client::{
    AnalysisRequest, ClientConfig, ClientError, Coordinates, CredentialHolder, FileImageEncoder, FileTokenStore,
    Page, RemoteServiceClient, ReportRequest, ReqwestTransport, TokenStore,
};

async fn start_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(mock_server::run(listener));
    format!("http://{addr}/api")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn reporting_lifecycle() {
    let base_url = start_server().await;
    let dir = tempfile::tempdir().unwrap();
    let photo = dir.path().join("bottles.png");
    std::fs::write(&photo, b"\x89PNG\r\n\x1a\nfake").unwrap();
    let photo_uri = format!("file://{}", photo.display());

    let store = Arc::new(FileTokenStore::new(dir.path().join("credentials.json")));
    let config = ClientConfig {
        token_key: "reporter".to_string(),
        ..ClientConfig::new(&base_url)
    };
    let transport = Arc::new(ReqwestTransport::new().unwrap());
    let client =
        RemoteServiceClient::with_store(config.clone(), store.clone(), transport.clone(), Arc::new(FileImageEncoder))
            .unwrap();

    // Step 1: unauthenticated access fails with the server's message.
    let err = client.notifications().await.unwrap_err();
    assert!(matches!(err, ClientError::Api { status: 401, ref message } if message == "Unauthorized"));

    // Step 2: sign up, which holds and persists the token.
    let session = client.signup("Asha", "asha@example.org", "pw").await.unwrap();
    assert_eq!(session.user["email"], "asha@example.org");
    assert_eq!(client.token().as_deref(), Some(session.token.as_str()));

    // Step 3: analysis with an image, nested response shape.
    let analysis = client
        .analyze_waste(&AnalysisRequest {
            location_text: "plastic bottles by the lake".to_string(),
            lat: Some(12.34),
            lng: Some(56.78),
            image: Some(photo_uri.clone()),
        })
        .await
        .unwrap();
    assert_eq!(analysis.waste_type, "Plastic");
    assert_eq!(analysis.urgency, "Medium");
    assert!(!analysis.id.is_empty());

    let history = client.cleanup_history().await.unwrap();
    let cleanups = history["cleanups"].as_array().unwrap();
    assert_eq!(cleanups.len(), 1);
    assert_eq!(cleanups[0]["lat"], 12.34);
    assert_eq!(cleanups[0]["imageName"], "bottles.png");

    // Step 4: classification, text only and then nothing at all.
    let classified = client.classify(Some("broken glass"), None).await.unwrap();
    assert_eq!(classified["wasteType"], "Glass");
    let err = client.classify(None, None).await.unwrap_err();
    assert!(matches!(err, ClientError::Api { status: 400, ref message } if message == "Provide a prompt or an image"));

    let page = client.waste_history(Page::default()).await.unwrap();
    assert_eq!(page["total"], 1);

    // Step 5: report submission and status update.
    let ack = client
        .submit_report(&ReportRequest {
            image: Some(photo_uri),
            location_text: "Bus stand".to_string(),
            coordinates: Some(Coordinates::new(1.5, 2.5)),
        })
        .await
        .unwrap();
    assert_eq!(ack["message"], "Report submitted");
    let report_id = ack["report"]["_id"].as_str().unwrap().to_string();

    let updated = client.update_report(&report_id, &json!({"status": "resolved"})).await.unwrap();
    assert_eq!(updated["report"]["status"], "resolved");

    // Step 6: notifications were generated and can be marked read.
    let notifications = client.notifications().await.unwrap();
    let list = notifications["notifications"].as_array().unwrap();
    assert_eq!(list.len(), 2);
    let id = list[0]["_id"].as_str().unwrap();
    let marked = client.mark_notification_read(id).await.unwrap();
    assert_eq!(marked["notification"]["read"], true);

    // Step 7: profile read and update.
    let updated = client.update_profile(&json!({"name": "Asha K"})).await.unwrap();
    assert_eq!(updated["user"]["name"], "Asha K");
    assert_eq!(client.profile().await.unwrap()["user"]["name"], "Asha K");

    // Step 8: a fresh client on the same store and key starts logged in.
    assert_eq!(store.load("reporter").unwrap(), client.token());
    let second =
        RemoteServiceClient::with_store(config.clone(), store.clone(), transport, Arc::new(FileImageEncoder)).unwrap();
    assert!(second.profile().await.is_ok());

    // Step 9: logout, then protected routes fail again.
    second.logout();
    let err = second.profile().await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    let fresh = CredentialHolder::load(store, &config.token_key).unwrap();
    assert!(fresh.get().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn login_after_signup_and_bad_password() {
    let base_url = start_server().await;
    let client = RemoteServiceClient::native(ClientConfig::new(&base_url), Arc::new(CredentialHolder::new())).unwrap();

    client.signup("Ravi", "ravi@example.org", "pw").await.unwrap();
    client.logout();

    let err = client.login("ravi@example.org", "wrong").await.unwrap_err();
    assert!(matches!(err, ClientError::Api { status: 401, ref message } if message == "Invalid credentials"));
    assert!(client.token().is_none());

    let session = client.login("ravi@example.org", "pw").await.unwrap();
    assert_eq!(client.token(), Some(session.token));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unknown_route_is_malformed_response() {
    let base_url = start_server().await;
    let client = RemoteServiceClient::native(ClientConfig::new(&base_url), Arc::new(CredentialHolder::new())).unwrap();

    let err = client
        .request(waste_client::HttpMethod::Get, "/does-not-exist", None, &[])
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::MalformedResponse { status: 404, ref body } if body == "Not Found"));
}

#[tokio::test]
async fn unreachable_server_is_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = RemoteServiceClient::native(
        ClientConfig::new(&format!("http://{addr}/api")),
        Arc::new(CredentialHolder::new()),
    )
    .unwrap();
    let err = client.notifications().await.unwrap_err();
    assert!(matches!(err, ClientError::Network(_)));
}
