//! Gestion API
//!
//! Commercial back office covering the proforma to payment chain, clients and
//! expenses, served over a JSON HTTP API.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod lifecycle;
pub mod middleware_helpers;
pub mod migrator;
pub mod reconciliation;
pub mod rules;
pub mod services;
pub mod tracing;

use axum::{
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer};

use handlers::{
    bdcs, bdls, clients, dashboard, depenses, factures, health, paiements, proformas,
};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<db::DbPool>,
    pub config: config::AppConfig,
    pub event_sender: Arc<events::EventSender>,
    pub services: handlers::AppServices,
}

impl AppState {
    pub fn new(db: db::DbPool, config: config::AppConfig, event_sender: events::EventSender) -> Self {
        let db = Arc::new(db);
        let event_sender = Arc::new(event_sender);
        let services = handlers::AppServices::new(db.clone(), event_sender.clone(), &config);
        Self {
            db,
            config,
            event_sender,
            services,
        }
    }
}

// Common response wrappers
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
            meta: Some(ResponseMeta::capture()),
        }
    }
}


/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

pub fn api_v1_routes() -> Router<AppState> {
    let clients = Router::new()
        .route(
            "/clients",
            get(clients::list_clients).post(clients::create_client),
        )
        .route(
            "/clients/:id",
            get(clients::get_client)
                .put(clients::update_client)
                .delete(clients::delete_client),
        )
        .route(
            "/clients/:id/recalculate",
            post(clients::recalculate_client),
        );

    let proformas = Router::new()
        .route(
            "/proformas",
            get(proformas::list_proformas).post(proformas::create_proforma),
        )
        .route(
            "/proformas/:id",
            get(proformas::get_proforma)
                .put(proformas::update_proforma)
                .delete(proformas::delete_proforma),
        )
        .route(
            "/proformas/:id/next-statuses",
            get(proformas::proforma_next_statuses),
        )
        .route(
            "/proformas/:id/status",
            post(proformas::change_proforma_status),
        )
        .route("/proformas/:id/bdc", post(proformas::generate_bdc));

    let bdcs = Router::new()
        .route("/bdcs", get(bdcs::list_bdcs).post(bdcs::create_bdc))
        .route("/bdcs/:id", get(bdcs::get_bdc).delete(bdcs::delete_bdc))
        .route("/bdcs/:id/next-statuses", get(bdcs::bdc_next_statuses))
        .route("/bdcs/:id/status", post(bdcs::change_bdc_status))
        .route("/bdcs/:id/progress", get(bdcs::bdc_progress))
        .route("/bdcs/:id/bdls", post(bdcs::create_bdl_for_bdc));

    let bdls = Router::new()
        .route("/bdls", get(bdls::list_bdls))
        .route("/bdls/:id", get(bdls::get_bdl).delete(bdls::delete_bdl))
        .route("/bdls/:id/next-statuses", get(bdls::bdl_next_statuses))
        .route("/bdls/:id/status", post(bdls::change_bdl_status));

    let factures = Router::new()
        .route(
            "/factures",
            get(factures::list_factures).post(factures::create_facture),
        )
        .route(
            "/factures/:id",
            get(factures::get_facture).delete(factures::delete_facture),
        )
        .route(
            "/factures/:id/next-statuses",
            get(factures::facture_next_statuses),
        )
        .route(
            "/factures/:id/status",
            post(factures::change_facture_status),
        )
        .route("/factures/:id/emit", post(factures::emit_facture))
        .route("/factures/:id/cancel", post(factures::cancel_facture));

    let paiements = Router::new()
        .route(
            "/paiements",
            get(paiements::list_paiements).post(paiements::record_paiement),
        )
        .route(
            "/paiements/:id",
            get(paiements::get_paiement).delete(paiements::delete_paiement),
        );

    let depenses = Router::new()
        .route(
            "/depenses",
            get(depenses::list_depenses).post(depenses::create_depense),
        )
        .route(
            "/depenses/:id",
            get(depenses::get_depense)
                .put(depenses::update_depense)
                .delete(depenses::delete_depense),
        );

    Router::new()
        .merge(clients)
        .merge(proformas)
        .merge(bdcs)
        .merge(bdls)
        .merge(factures)
        .merge(paiements)
        .merge(depenses)
        .route("/dashboard", get(dashboard::get_dashboard))
}

/// Full application router with the HTTP middleware stack applied.
pub fn build_router(state: AppState) -> Router {
    let cors_layer = if state.config.is_development() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    };

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1", api_v1_routes())
        .layer(crate::tracing::configure_http_tracing())
        .layer(CompressionLayer::new())
        .layer(cors_layer)
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .with_state(state)
}
