use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveValue::NotSet, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use super::{build_lignes, paginate, LigneInput, Page, PageRequest};
use crate::{
    db::{documents::found, insert_numbered, update_versioned, DbPool},
    entities::{
        bdc::{self, BdcStatus},
        bdl::{self, BdlStatus},
        client,
    },
    errors::ServiceError,
    events::{Event, EventSender, RecordKind},
    lifecycle::{ensure_transition, DocumentType},
    reconciliation::{compute_delivery_progress, DeliveryProgress},
    rules,
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateBdcRequest {
    pub client_id: Uuid,
    pub lignes: Vec<LigneInput>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BdcFilter {
    pub client_id: Option<Uuid>,
    pub proforma_id: Option<Uuid>,
    pub statut: Option<BdcStatus>,
}

#[derive(Clone)]
pub struct BdcService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl BdcService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates a purchase order without a quote.
    #[instrument(skip(self, request), fields(client_id = %request.client_id))]
    pub async fn create(&self, request: CreateBdcRequest) -> Result<bdc::Model, ServiceError> {
        request.validate()?;
        let lignes = build_lignes(request.lignes)?;

        let txn = self.db_pool.begin().await?;
        found(
            client::Entity::find_by_id(request.client_id).one(&txn).await?,
            "Client",
            request.client_id,
        )?;

        let now = Utc::now();
        let model = insert_numbered(
            &txn,
            bdc::ActiveModel {
                id: Set(Uuid::new_v4()),
                numero: NotSet,
                client_id: Set(request.client_id),
                proforma_id: Set(None),
                statut: Set(BdcStatus::Brouillon),
                total_ht: Set(lignes.total()),
                lignes: Set(lignes),
                notes: Set(request.notes),
                version: Set(1),
                created_at: Set(now),
                updated_at: Set(now),
            },
        )
        .await?;
        txn.commit().await?;

        info!(bdc_id = %model.id, numero = %model.numero, "BDC created");
        self.event_sender.send_or_log(Event::DocumentCreated {
            kind: RecordKind::Bdc,
            id: model.id,
            numero: Some(model.numero.clone()),
        });
        Ok(model)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, bdc_id: Uuid) -> Result<bdc::Model, ServiceError> {
        let row = bdc::Entity::find_by_id(bdc_id).one(&*self.db_pool).await?;
        found(row, "BDC", bdc_id)
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: BdcFilter,
        page: PageRequest,
    ) -> Result<Page<bdc::Model>, ServiceError> {
        let mut select = bdc::Entity::find().order_by_desc(bdc::Column::CreatedAt);
        if let Some(client_id) = filter.client_id {
            select = select.filter(bdc::Column::ClientId.eq(client_id));
        }
        if let Some(proforma_id) = filter.proforma_id {
            select = select.filter(bdc::Column::ProformaId.eq(proforma_id));
        }
        if let Some(statut) = filter.statut {
            select = select.filter(bdc::Column::Statut.eq(statut));
        }
        paginate(select, &self.db_pool, page).await
    }

    /// Moves the order along its lifecycle. Cancelling is refused while a
    /// non-cancelled delivery note references it.
    #[instrument(skip(self))]
    pub async fn transition(&self, bdc_id: Uuid, to: BdcStatus) -> Result<bdc::Model, ServiceError> {
        let txn = self.db_pool.begin().await?;
        let current = found(bdc::Entity::find_by_id(bdc_id).one(&txn).await?, "BDC", bdc_id)?;
        ensure_transition(current.statut, to)?;

        if to == BdcStatus::Annule {
            let active = bdl::Entity::find()
                .filter(bdl::Column::BdcId.eq(bdc_id))
                .filter(bdl::Column::Statut.ne(BdlStatus::Annule))
                .count(&txn)
                .await?;
            if active > 0 {
                warn!(%bdc_id, active, "Refusing to cancel BDC with active deliveries");
                return Err(ServiceError::InvalidOperation(format!(
                    "le bon de commande {} a {} bon(s) de livraison actif(s)",
                    current.numero, active
                )));
            }
        }

        let mut updated = current.clone();
        updated.statut = to;
        updated.version = current.version + 1;
        updated.updated_at = Utc::now();
        update_versioned(
            &txn,
            bdc::ActiveModel::from(updated.clone()),
            bdc_id,
            current.version,
        )
        .await?;
        txn.commit().await?;

        info!(%bdc_id, from = %current.statut, %to, "BDC status changed");
        self.event_sender.send_or_log(Event::status_changed(
            DocumentType::Bdc,
            bdc_id,
            current.statut,
            to,
        ));
        Ok(updated)
    }

    async fn with_bdls(&self, bdc_id: Uuid) -> Result<(bdc::Model, Vec<bdl::Model>), ServiceError> {
        let order = self.get(bdc_id).await?;
        let bdls = bdl::Entity::find()
            .filter(bdl::Column::BdcId.eq(bdc_id))
            .all(&*self.db_pool)
            .await?;
        Ok((order, bdls))
    }

    /// Ordered, delivered and remaining quantity per line.
    #[instrument(skip(self))]
    pub async fn delivery_progress(&self, bdc_id: Uuid) -> Result<DeliveryProgress, ServiceError> {
        let (order, bdls) = self.with_bdls(bdc_id).await?;
        Ok(compute_delivery_progress(&order, &bdls))
    }

    /// The order with whether a delivery note may be issued against it now.
    pub async fn get_with_bdl_generable(
        &self,
        bdc_id: Uuid,
    ) -> Result<(bdc::Model, bool), ServiceError> {
        let (order, bdls) = self.with_bdls(bdc_id).await?;
        let generable = rules::is_bdl_generable(&order, &bdls);
        Ok((order, generable))
    }

    /// Deletes a draft order that no delivery note references.
    #[instrument(skip(self))]
    pub async fn delete(&self, bdc_id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db_pool.begin().await?;
        let current = found(bdc::Entity::find_by_id(bdc_id).one(&txn).await?, "BDC", bdc_id)?;
        if current.statut != BdcStatus::Brouillon {
            return Err(ServiceError::InvalidOperation(format!(
                "seul un bon de commande en brouillon peut être supprimé ({} est {})",
                current.numero, current.statut
            )));
        }
        let notes = bdl::Entity::find()
            .filter(bdl::Column::BdcId.eq(bdc_id))
            .count(&txn)
            .await?;
        if notes > 0 {
            return Err(ServiceError::Conflict(format!(
                "le bon de commande {} est référencé par des bons de livraison",
                current.numero
            )));
        }
        if let Some(proforma_id) = current.proforma_id {
            unlink_proforma(&txn, proforma_id).await?;
        }
        bdc::Entity::delete_by_id(bdc_id).exec(&txn).await?;
        txn.commit().await?;

        self.event_sender.send_or_log(Event::DocumentDeleted {
            kind: RecordKind::Bdc,
            id: bdc_id,
        });
        Ok(())
    }
}

/// Clears the quote's link so a new order may be generated from it.
async fn unlink_proforma(
    txn: &sea_orm::DatabaseTransaction,
    proforma_id: Uuid,
) -> Result<(), ServiceError> {
    use crate::entities::proforma;

    let Some(source) = proforma::Entity::find_by_id(proforma_id).one(txn).await? else {
        return Ok(());
    };
    let mut unlinked = source.clone();
    unlinked.bdc_id = None;
    unlinked.version = source.version + 1;
    unlinked.updated_at = Utc::now();
    update_versioned(
        txn,
        proforma::ActiveModel::from(unlinked),
        proforma_id,
        source.version,
    )
    .await
}
