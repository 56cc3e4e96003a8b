//! HTTP surface: routing, status codes, response envelope and request ids.

mod common;

use axum::http::{Method, StatusCode};
use common::{ligne, response_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;

#[tokio::test]
async fn health_reports_database_up() {
    let app = TestApp::new().await;
    let response = app.request(Method::GET, "/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "up");
    assert_eq!(body["database"], "up");
}

#[tokio::test]
async fn client_crud_over_http() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/clients",
            Some(json!({ "nom": "Société Ndiaye", "email": "contact@ndiaye.sn" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    assert_eq!(body["success"], true);
    let id = body["data"]["id"].as_str().expect("client id").to_string();

    let response = app
        .request(Method::GET, &format!("/api/v1/clients/{id}"), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["nom"], "Société Ndiaye");

    let response = app
        .request(Method::GET, "/api/v1/clients?search=Ndiaye&per_page=5", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["pagination"]["total"], 1);
    assert_eq!(body["data"]["pagination"]["per_page"], 5);

    let response = app
        .request(Method::DELETE, &format!("/api/v1/clients/{id}"), None)
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .request(Method::GET, &format!("/api/v1/clients/{id}"), None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_payload_is_a_bad_request() {
    let app = TestApp::new().await;
    let response = app
        .request(Method::POST, "/api/v1/clients", Some(json!({ "nom": "" })))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn request_id_is_echoed() {
    let app = TestApp::new().await;
    let response = app
        .request_with_headers(
            Method::GET,
            "/api/v1/dashboard",
            None,
            &[("x-request-id", "test-req-42")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok()),
        Some("test-req-42")
    );
    let body = response_json(response).await;
    assert_eq!(body["meta"]["request_id"], "test-req-42");
    assert_eq!(body["data"]["devise"], "XOF");
}

#[tokio::test]
async fn status_endpoints_follow_the_lifecycle() {
    let app = TestApp::new().await;
    let client = app.seed_client("Client HTTP").await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/proformas",
            Some(json!({
                "client_id": client.id,
                "lignes": [ligne("Ciment", dec!(10), dec!(5000))],
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let id = response_json(response).await["data"]["id"]
        .as_str()
        .expect("proforma id")
        .to_string();

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/proformas/{id}/next-statuses"),
            None,
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["statut"], "BROUILLON");
    assert_eq!(body["data"]["next"], json!(["ENVOYE"]));
    assert_eq!(body["data"]["can_generate"], false);

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/proformas/{id}/status"),
            Some(json!({ "statut": "VALIDE" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/proformas/{id}/status"),
            Some(json!({ "statut": "INCONNU" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    for statut in ["ENVOYE", "VALIDE"] {
        let response = app
            .request(
                Method::POST,
                &format!("/api/v1/proformas/{id}/status"),
                Some(json!({ "statut": statut })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .request(Method::POST, &format!("/api/v1/proformas/{id}/bdc"), None)
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    assert_eq!(body["data"]["statut"], "BROUILLON");
    assert_eq!(body["data"]["proforma_id"], id.as_str());
}

#[tokio::test]
async fn over_delivery_maps_to_unprocessable_entity() {
    let app = TestApp::new().await;
    let client = app.seed_client("Client Livré").await;
    let order = app
        .seed_approved_bdc(client.id, vec![ligne("Sable", dec!(10), dec!(1000))])
        .await;

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/bdcs/{}/bdls", order.id),
            Some(json!({
                "lignes": [{ "ligne_id": order.lignes.0[0].id, "quantite": "11" }],
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/bdcs/{}/progress", order.id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["is_complete"], false);
}
