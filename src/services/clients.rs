use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use super::{check_expected_version, paginate, Page, PageRequest};
use crate::{
    db::{documents::found, update_versioned, DbPool},
    entities::{bdc, bdl, client, facture, paiement, proforma},
    errors::ServiceError,
    events::{Event, EventSender, RecordKind},
    reconciliation::recalculate_client_totals,
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateClientRequest {
    #[validate(length(min = 1, max = 255, message = "Le nom est requis"))]
    pub nom: String,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 32))]
    pub telephone: Option<String>,
    pub adresse: Option<String>,
}

/// Identity fields only; rollups are owned by reconciliation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateClientRequest {
    #[validate(length(min = 1, max = 255, message = "Le nom est requis"))]
    pub nom: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 32))]
    pub telephone: Option<String>,
    pub adresse: Option<String>,
    pub version: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientFilter {
    /// Case-sensitive substring of the client name
    pub search: Option<String>,
}

#[derive(Clone)]
pub struct ClientService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl ClientService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self, request), fields(nom = %request.nom))]
    pub async fn create(&self, request: CreateClientRequest) -> Result<client::Model, ServiceError> {
        request.validate()?;
        if request.nom.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "le nom du client ne peut pas être vide".to_string(),
            ));
        }

        let now = Utc::now();
        let model = client::ActiveModel {
            id: Set(Uuid::new_v4()),
            nom: Set(request.nom.trim().to_string()),
            email: Set(request.email),
            telephone: Set(request.telephone),
            adresse: Set(request.adresse),
            total_livre: Set(Decimal::ZERO),
            total_facture: Set(Decimal::ZERO),
            total_paye: Set(Decimal::ZERO),
            total_du: Set(Decimal::ZERO),
            version: Set(1),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db_pool)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to insert client");
            ServiceError::DatabaseError(e)
        })?;

        info!(client_id = %model.id, "Client created");
        self.event_sender.send_or_log(Event::DocumentCreated {
            kind: RecordKind::Client,
            id: model.id,
            numero: None,
        });
        Ok(model)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, client_id: Uuid) -> Result<client::Model, ServiceError> {
        let row = client::Entity::find_by_id(client_id)
            .one(&*self.db_pool)
            .await?;
        found(row, "Client", client_id)
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: ClientFilter,
        page: PageRequest,
    ) -> Result<Page<client::Model>, ServiceError> {
        let mut select = client::Entity::find().order_by_asc(client::Column::Nom);
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            select = select.filter(client::Column::Nom.contains(search));
        }
        paginate(select, &self.db_pool, page).await
    }

    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        client_id: Uuid,
        request: UpdateClientRequest,
    ) -> Result<client::Model, ServiceError> {
        request.validate()?;
        let current = self.get(client_id).await?;
        check_expected_version(client_id, current.version, request.version)?;

        let mut updated = current.clone();
        if let Some(nom) = request.nom {
            if nom.trim().is_empty() {
                return Err(ServiceError::ValidationError(
                    "le nom du client ne peut pas être vide".to_string(),
                ));
            }
            updated.nom = nom.trim().to_string();
        }
        if request.email.is_some() {
            updated.email = request.email;
        }
        if request.telephone.is_some() {
            updated.telephone = request.telephone;
        }
        if request.adresse.is_some() {
            updated.adresse = request.adresse;
        }
        updated.version = current.version + 1;
        updated.updated_at = Utc::now();

        update_versioned(
            &*self.db_pool,
            client::ActiveModel::from(updated.clone()),
            client_id,
            current.version,
        )
        .await?;
        info!(%client_id, "Client updated");
        Ok(updated)
    }

    /// Deletes a client that has no document attached.
    #[instrument(skip(self))]
    pub async fn delete(&self, client_id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        let txn = db.begin().await?;
        let current = found(
            client::Entity::find_by_id(client_id).one(&txn).await?,
            "Client",
            client_id,
        )?;

        let documents = proforma::Entity::find()
            .filter(proforma::Column::ClientId.eq(client_id))
            .count(&txn)
            .await?
            + bdc::Entity::find()
                .filter(bdc::Column::ClientId.eq(client_id))
                .count(&txn)
                .await?
            + bdl::Entity::find()
                .filter(bdl::Column::ClientId.eq(client_id))
                .count(&txn)
                .await?
            + facture::Entity::find()
                .filter(facture::Column::ClientId.eq(client_id))
                .count(&txn)
                .await?
            + paiement::Entity::find()
                .filter(paiement::Column::ClientId.eq(client_id))
                .count(&txn)
                .await?;

        if documents > 0 {
            warn!(%client_id, documents, "Refusing to delete client with documents");
            return Err(ServiceError::Conflict(format!(
                "le client {} possède {} document(s) et ne peut pas être supprimé",
                current.nom, documents
            )));
        }

        client::Entity::delete_by_id(client_id).exec(&txn).await?;
        txn.commit().await?;

        info!(%client_id, "Client deleted");
        self.event_sender.send_or_log(Event::DocumentDeleted {
            kind: RecordKind::Client,
            id: client_id,
        });
        Ok(())
    }

    /// Recomputes the rollups of one client from its documents.
    #[instrument(skip(self))]
    pub async fn recalculate(&self, client_id: Uuid) -> Result<client::Model, ServiceError> {
        let txn = self.db_pool.begin().await?;
        let updated = recalculate_client_totals(&txn, client_id).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::ClientTotalsRecalculated {
                client_id,
                total_du: updated.total_du,
            });
        Ok(updated)
    }

    /// Recomputes every client's rollups; returns how many were processed.
    #[instrument(skip(self))]
    pub async fn recalculate_all(&self) -> Result<usize, ServiceError> {
        let ids: Vec<Uuid> = client::Entity::find()
            .select_only()
            .column(client::Column::Id)
            .into_tuple()
            .all(&*self.db_pool)
            .await?;

        for client_id in &ids {
            self.recalculate(*client_id).await?;
        }
        info!(count = ids.len(), "Client totals recalculated");
        Ok(ids.len())
    }
}
