/* Copyright (C) 2025 Pedro Henrique / phkaiser13
* File: src/modules/key_rotator/tests/flashblade_client.rs
* Exercises the FlashBlade client and a full rotation run against a mock
* REST server.
* SPDX-License-Identifier: Apache-2.0 */

use std::time::Duration;

use clap::Parser;
use key_rotator::cli::Cli;
use key_rotator::models::Identity;
use key_rotator::providers::{FlashBladeClient, FlashBladeSettings, StorageClient};
use key_rotator::{runner, Error};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API: &str = "/api/2.12";

async fn mock_array() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/api_version"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "versions": ["1.12", "2.0", "2.12"] })),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .and(header("api-token", "mock-token"))
        .respond_with(ResponseTemplate::new(200).insert_header("x-auth-token", "session-1"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/logout"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    server
}

fn settings(server: &MockServer) -> FlashBladeSettings {
    FlashBladeSettings {
        url: server.uri(),
        api_token: "mock-token".to_string(),
        verify_tls: false,
        timeout: Duration::from_secs(5),
    }
}

async fn connect(server: &MockServer) -> FlashBladeClient {
    FlashBladeClient::connect(&settings(server)).await.unwrap()
}

fn key_json(name: &str, created_ms: i64, secret: Option<&str>) -> serde_json::Value {
    let mut key = json!({
        "name": name,
        "created": created_ms,
        "enabled": true,
        "user": { "id": "u-1", "name": "mock_fake/pytest" }
    });
    if let Some(secret) = secret {
        key["secret_access_key"] = json!(secret);
    }
    key
}

#[tokio::test]
async fn test_connect_negotiates_version_and_logs_in() {
    let server = mock_array().await;
    let client = connect(&server).await;
    assert_eq!(client.api_version(), "2.12");
}

#[tokio::test]
async fn test_connect_fails_without_session_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/api_version"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "versions": ["2.1"] })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let err = FlashBladeClient::connect(&settings(&server)).await.err().unwrap();
    assert!(matches!(err, Error::MissingAuthToken));
}

#[tokio::test]
async fn test_connect_fails_on_rejected_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/api_version"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "versions": ["2.1"] })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad token"))
        .mount(&server)
        .await;

    let err = FlashBladeClient::connect(&settings(&server)).await.err().unwrap();
    assert!(matches!(err, Error::Api { status: 401, .. }));
}

#[tokio::test]
async fn test_user_exists() {
    let server = mock_array().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/object-store-users", API)))
        .and(header("x-auth-token", "session-1"))
        .and(query_param("filter", "name=\"mock_fake/pytest\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{ "name": "mock_fake/pytest", "id": "u-1" }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/object-store-users", API)))
        .and(query_param("filter", "name=\"mock_fake/nobody\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/object-store-users", API)))
        .and(query_param("filter", "name=\"mock_fake/broken\""))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = connect(&server).await;
    assert!(client.user_exists("mock_fake/pytest").await.unwrap());
    assert!(!client.user_exists("mock_fake/nobody").await.unwrap());
    assert!(!client.user_exists("mock_fake/broken").await.unwrap());
}

#[tokio::test]
async fn test_list_keys_by_id_follows_pages() {
    let server = mock_array().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/object-store-access-keys", API)))
        .and(query_param("filter", "user.id=\"u-1\""))
        .and(query_param_is_missing("continuation_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [key_json("PSFBONE", 1_000, None)],
            "continuation_token": "page-2"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/object-store-access-keys", API)))
        .and(query_param("continuation_token", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [key_json("PSFBTWO", 2_000, None)]
        })))
        .mount(&server)
        .await;

    let client = connect(&server).await;
    let identity = Identity {
        id: Some("u-1".to_string()),
        ..Identity::named("mock_fake/pytest")
    };
    let keys = client.list_keys(&identity).await.unwrap();
    let names: Vec<&str> = keys.iter().map(|k| k.name.as_str()).collect();
    assert_eq!(names, vec!["PSFBONE", "PSFBTWO"]);
    assert!(keys.iter().all(|k| k.secret.is_none()));
}

#[tokio::test]
async fn test_list_keys_error_is_reported() {
    let server = mock_array().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/object-store-access-keys", API)))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = connect(&server).await;
    let err = client
        .list_keys(&Identity::named("mock_fake/pytest"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Api { status: 503, .. }));
}

#[tokio::test]
async fn test_create_key() {
    let server = mock_array().await;
    Mock::given(method("POST"))
        .and(path(format!("{}/object-store-access-keys", API)))
        .and(body_json(json!({ "user": { "name": "mock_fake/pytest" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [key_json("PSFBNEW", 3_000, Some("s3cr3t"))]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{}/object-store-access-keys", API)))
        .and(body_json(json!({ "user": { "name": "mock_fake/full" } })))
        .respond_with(ResponseTemplate::new(400).set_body_string("too many keys"))
        .mount(&server)
        .await;

    let client = connect(&server).await;
    let key = client
        .create_key(&Identity::named("mock_fake/pytest"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(key.name, "PSFBNEW");
    assert_eq!(key.secret.as_deref(), Some("s3cr3t"));

    let refused = client.create_key(&Identity::named("mock_fake/full")).await.unwrap();
    assert!(refused.is_none());
}

#[tokio::test]
async fn test_delete_keys() {
    let server = mock_array().await;
    Mock::given(method("DELETE"))
        .and(path(format!("{}/object-store-access-keys", API)))
        .and(query_param("names", "PSFBOLD"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("{}/object-store-access-keys", API)))
        .and(query_param("names", "PSFBGONE"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = connect(&server).await;
    assert!(client.delete_keys(&["PSFBOLD".to_string()]).await.unwrap());
    assert!(!client.delete_keys(&["PSFBGONE".to_string()]).await.unwrap());
}

#[tokio::test]
async fn test_list_users_maps_account() {
    let server = mock_array().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/object-store-users", API)))
        .and(query_param_is_missing("filter"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                { "name": "mock_hai/one", "id": "u-1", "account": { "name": "mock_hai", "id": "a-1" } }
            ]
        })))
        .mount(&server)
        .await;

    let client = connect(&server).await;
    let users = client.list_users().await.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].account.as_deref(), Some("mock_hai"));
    assert_eq!(users[0].id.as_deref(), Some("u-1"));
}

#[tokio::test]
async fn test_rotation_run_writes_local_credentials() {
    let server = mock_array().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/object-store-users", API)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{ "name": "mock_fake/pytest", "id": "u-1" }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/object-store-access-keys", API)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{}/object-store-access-keys", API)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [key_json("PSFBNEW", 3_000, Some("s3cr3t"))]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("{}/object-store-access-keys", API)))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("credentials.json");
    let uri = server.uri();
    let output_arg = output.to_string_lossy().to_string();
    let cli = Cli::try_parse_from([
        "key_rotator",
        "--fb-url",
        uri.as_str(),
        "--api-token",
        "mock-token",
        "--interesting-users",
        r#"["mock_fake/pytest"]"#,
        "--credentials-output-path",
        output_arg.as_str(),
    ])
    .unwrap();

    let summary = runner::rotate(&cli.settings).await.unwrap();
    assert_eq!(summary.created, 1);
    assert!(summary.is_success());

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(written["Version"], 1);
    assert_eq!(written["AccessKeyId"], "PSFBNEW");
    assert_eq!(written["SecretAccessKey"], "s3cr3t");
    assert_eq!(written["SessionToken"], "");
    assert!(written["Expiration"].as_str().unwrap().ends_with('Z'));
}
