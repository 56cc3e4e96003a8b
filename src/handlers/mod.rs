pub mod bdcs;
pub mod bdls;
pub mod clients;
pub mod common;
pub mod dashboard;
pub mod depenses;
pub mod factures;
pub mod health;
pub mod paiements;
pub mod proformas;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::{
    bdcs::BdcService, bdls::BdlService, clients::ClientService, dashboard::DashboardService,
    depenses::DepenseService, factures::FactureService, paiements::PaiementService,
    proformas::ProformaService,
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub clients: Arc<ClientService>,
    pub proformas: Arc<ProformaService>,
    pub bdcs: Arc<BdcService>,
    pub bdls: Arc<BdlService>,
    pub factures: Arc<FactureService>,
    pub paiements: Arc<PaiementService>,
    pub depenses: Arc<DepenseService>,
    pub dashboard: Arc<DashboardService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, config: &AppConfig) -> Self {
        Self {
            clients: Arc::new(ClientService::new(db_pool.clone(), event_sender.clone())),
            proformas: Arc::new(ProformaService::new(db_pool.clone(), event_sender.clone())),
            bdcs: Arc::new(BdcService::new(db_pool.clone(), event_sender.clone())),
            bdls: Arc::new(BdlService::new(
                db_pool.clone(),
                event_sender.clone(),
                config.enforce_delivery_limits,
            )),
            factures: Arc::new(FactureService::new(db_pool.clone(), event_sender.clone())),
            paiements: Arc::new(PaiementService::new(db_pool.clone(), event_sender.clone())),
            depenses: Arc::new(DepenseService::new(db_pool.clone(), event_sender)),
            dashboard: Arc::new(DashboardService::new(
                db_pool,
                config.default_currency.clone(),
            )),
        }
    }
}
