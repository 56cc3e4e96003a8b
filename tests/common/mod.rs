#![allow(dead_code)]

use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use chrono::NaiveDate;
use gestion_api::{
    config::AppConfig,
    db,
    entities::{bdc, client, facture},
    events::EventSender,
    services::{
        bdls::{CreateBdlRequest, LigneLivraisonInput},
        clients::CreateClientRequest,
        factures::{CreateFactureRequest, EmitFactureRequest},
        LigneInput,
    },
    AppState,
};
use gestion_api::entities::{bdc::BdcStatus, bdl::BdlStatus};
use rust_decimal::Decimal;
use serde_json::Value;
use tower::ServiceExt;

/// Application state and router backed by a private in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Builds the app after letting the caller adjust the configuration.
    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        // An in-memory database lives and dies with its single connection.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        adjust(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_sender, event_rx) = EventSender::channel(cfg.event_channel_capacity);
        tokio::spawn(gestion_api::events::process_events(event_rx));

        let state = AppState::new(pool, cfg, event_sender);
        let router = gestion_api::build_router(state.clone());
        Self { router, state }
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        self.request_with_headers(method, uri, body, &[]).await
    }

    pub async fn request_with_headers(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    pub async fn seed_client(&self, nom: &str) -> client::Model {
        self.state
            .services
            .clients
            .create(CreateClientRequest {
                nom: nom.to_string(),
                email: None,
                telephone: None,
                adresse: None,
            })
            .await
            .expect("seed client")
    }

    /// An approved purchase order with the given lines, created without a quote.
    pub async fn seed_approved_bdc(&self, client_id: uuid::Uuid, lignes: Vec<LigneInput>) -> bdc::Model {
        let bdcs = &self.state.services.bdcs;
        let order = bdcs
            .create(gestion_api::services::bdcs::CreateBdcRequest {
                client_id,
                lignes,
                notes: None,
            })
            .await
            .expect("seed bdc");
        bdcs.transition(order.id, BdcStatus::Envoye)
            .await
            .expect("send bdc");
        bdcs.transition(order.id, BdcStatus::Approuve)
            .await
            .expect("approve bdc")
    }

    /// Issues and delivers a note for the given quantities of the order lines.
    pub async fn deliver(&self, order: &bdc::Model, quantites: &[Decimal]) -> gestion_api::entities::bdl::Model {
        let bdls = &self.state.services.bdls;
        let lignes = order
            .lignes
            .iter()
            .zip(quantites)
            .map(|(ligne, quantite)| LigneLivraisonInput {
                ligne_id: ligne.id,
                quantite: *quantite,
            })
            .collect();
        let note = bdls
            .create(order.id, CreateBdlRequest { lignes, notes: None })
            .await
            .expect("create bdl");
        bdls.transition(note.id, BdlStatus::EnRoute)
            .await
            .expect("dispatch bdl");
        bdls.transition(note.id, BdlStatus::Livre)
            .await
            .expect("deliver bdl")
    }

    /// Drafts and emits an invoice over the given delivered notes.
    pub async fn emit_invoice(&self, bdl_ids: Vec<uuid::Uuid>) -> facture::Model {
        let factures = &self.state.services.factures;
        let draft = factures
            .create_from_bdls(CreateFactureRequest {
                bdl_ids,
                remise: None,
                date_echeance: None,
            })
            .await
            .expect("create facture");
        factures
            .emit(
                draft.id,
                EmitFactureRequest {
                    date_echeance: NaiveDate::from_ymd_opt(2026, 12, 31),
                },
            )
            .await
            .expect("emit facture")
    }
}

pub fn ligne(designation: &str, quantite: Decimal, prix_unitaire: Decimal) -> LigneInput {
    LigneInput {
        designation: designation.to_string(),
        unite: "pièce".to_string(),
        quantite,
        prix_unitaire,
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}
