use std::sync::Arc;

use sea_orm::EntityTrait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
    db::DbPool,
    entities::{depense, facture, paiement},
    errors::ServiceError,
    reconciliation::{dashboard_summary, DashboardSummary},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dashboard {
    pub devise: String,
    #[serde(flatten)]
    pub summary: DashboardSummary,
}

#[derive(Clone)]
pub struct DashboardService {
    db_pool: Arc<DbPool>,
    currency: String,
}

impl DashboardService {
    pub fn new(db_pool: Arc<DbPool>, currency: impl Into<String>) -> Self {
        Self {
            db_pool,
            currency: currency.into(),
        }
    }

    /// Billed and outstanding amounts over all invoices, plus collected cash net
    /// of expenses.
    #[instrument(skip(self))]
    pub async fn summary(&self) -> Result<Dashboard, ServiceError> {
        let db = &*self.db_pool;
        let factures = facture::Entity::find().all(db).await?;
        let paiements = paiement::Entity::find().all(db).await?;
        let depenses = depense::Entity::find().all(db).await?;
        debug!(
            factures = factures.len(),
            paiements = paiements.len(),
            depenses = depenses.len(),
            "Computing dashboard"
        );

        Ok(Dashboard {
            devise: self.currency.clone(),
            summary: dashboard_summary(&factures, &paiements, &depenses),
        })
    }
}
