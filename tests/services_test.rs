//! Full-stack tests: the three processes started the way the binaries start them.

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio::sync::oneshot;

use service_gateway::config::{AuthServiceConfig, ContactServiceConfig, StoreKind};
use service_gateway::lifecycle::{start_auth_service, start_contact_service, RunningService};

mod common;

use common::{gateway_config, http_client, spawn_gateway, JWT_SECRET};

fn run_in_background(running: RunningService) -> oneshot::Sender<()> {
    let (tx, rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        let _ = running
            .run_until(async move {
                let _ = rx.await;
            })
            .await;
    });
    tx
}

fn auth_config() -> AuthServiceConfig {
    let mut config = AuthServiceConfig::default();
    config.listener.host = "127.0.0.1".into();
    config.listener.port = 0;
    config.grpc.host = "127.0.0.1".into();
    config.grpc.port = 0;
    config.store.kind = StoreKind::Memory;
    config.jwt.secret = JWT_SECRET.into();
    config.shutdown_grace_secs = 2;
    config
}

fn contact_config() -> ContactServiceConfig {
    let mut config = ContactServiceConfig::default();
    config.listener.host = "127.0.0.1".into();
    config.listener.port = 0;
    config.grpc.host = "127.0.0.1".into();
    config.grpc.port = 0;
    config.store.kind = StoreKind::Memory;
    config.turnstile.disabled = true;
    config.shutdown_grace_secs = 2;
    config
}

#[tokio::test]
async fn register_through_gateway_then_login() {
    let auth = start_auth_service(&auth_config()).await.unwrap();
    let contact = start_contact_service(&contact_config()).await.unwrap();
    let auth_http = auth.http_addr;
    let auth_grpc = auth.grpc_addr.unwrap();
    let contact_grpc = contact.grpc_addr.unwrap();
    let _auth = run_in_background(auth);
    let _contact = run_in_background(contact);

    let gateway = spawn_gateway(gateway_config(auth_grpc, contact_grpc, auth_http)).await;
    let client = http_client();

    let res = client
        .post(format!("{}/auth/register", gateway.base))
        .json(&json!({ "email": "grace@example.com", "password": "hopper1", "fullname": "Grace" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let profile: Value = res.json().await.unwrap();
    assert_eq!(profile["email"], "grace@example.com");

    let res = client
        .post(format!("{}/auth/register", gateway.base))
        .json(&json!({ "email": "grace@example.com", "password": "hopper1", "fullname": "Grace" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = client
        .post(format!("{}/auth/login", gateway.base))
        .json(&json!({ "email": "grace@example.com", "password": "hopper1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let session: Value = res.json().await.unwrap();
    assert_eq!(session["user"]["id"], profile["id"]);

    let res = client
        .post(format!("{}/contact", gateway.base))
        .json(&json!({ "name": "Grace", "email": "grace@example.com", "message": "Nice site!" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn contact_service_rest_surface() {
    let contact = start_contact_service(&contact_config()).await.unwrap();
    let base = format!("http://{}", contact.http_addr);
    let _stop = run_in_background(contact);
    let client = http_client();

    let res = client.get(format!("{base}/healthz")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "OK");

    let res = client
        .post(format!("{base}/contact"))
        .json(&json!({ "name": "Ada", "email": "ada@example.com", "message": "Hello there" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let record: Value = res.json().await.unwrap();
    assert_eq!(record["id"].as_str().unwrap().len(), 24);
    assert_eq!(record["name"], "Ada");

    let res = client
        .post(format!("{base}/contact"))
        .json(&json!({ "name": "Ada", "email": "a@b", "message": "Hello there" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // No SMTP configured.
    let res = client
        .post(format!("{base}/contact/dev/sendmail"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn auth_service_rest_surface() {
    let auth = start_auth_service(&auth_config()).await.unwrap();
    let base = format!("http://{}", auth.http_addr);
    let _stop = run_in_background(auth);
    let client = http_client();

    let res = client.get(format!("{base}/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .post(format!("{base}/auth/register"))
        .json(&json!({ "email": "x@example.com", "password": "123", "fullname": "X" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(format!("{base}/auth/login"))
        .json(&json!({ "email": "x@example.com", "password": "whatever" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn service_stops_accepting_after_shutdown() {
    let auth = start_auth_service(&auth_config()).await.unwrap();
    let base = format!("http://{}", auth.http_addr);
    let (tx, rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(async move {
        auth.run_until(async move {
            let _ = rx.await;
        })
        .await
    });

    let client = http_client();
    assert_eq!(
        client.get(format!("{base}/")).send().await.unwrap().status(),
        StatusCode::OK
    );

    tx.send(()).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
    assert!(client.get(format!("{base}/")).send().await.is_err());
}
