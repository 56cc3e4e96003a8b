use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveValue::NotSet, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use super::{apply_remise, build_lignes, check_expected_version, paginate, LigneInput, Page, PageRequest};
use crate::{
    db::{documents::found, insert_numbered, update_versioned, DbPool},
    entities::{
        bdc::{self, BdcStatus},
        client,
        proforma::{self, ProformaStatus},
    },
    errors::ServiceError,
    events::{Event, EventSender, RecordKind},
    lifecycle::{ensure_transition, DocumentType},
    rules,
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateProformaRequest {
    pub client_id: Uuid,
    pub lignes: Vec<LigneInput>,
    #[serde(default)]
    pub remise: Option<Decimal>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateProformaRequest {
    pub lignes: Option<Vec<LigneInput>>,
    pub remise: Option<Decimal>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    pub version: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProformaFilter {
    pub client_id: Option<Uuid>,
    pub statut: Option<ProformaStatus>,
}

#[derive(Clone)]
pub struct ProformaService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl ProformaService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates a draft quote; totals are computed from the lines and the discount.
    #[instrument(skip(self, request), fields(client_id = %request.client_id))]
    pub async fn create(
        &self,
        request: CreateProformaRequest,
    ) -> Result<proforma::Model, ServiceError> {
        request.validate()?;
        let lignes = build_lignes(request.lignes)?;
        let total_ht = lignes.total();
        let remise = request.remise.unwrap_or(Decimal::ZERO);
        let total_net = apply_remise(total_ht, remise)?;

        let txn = self.db_pool.begin().await?;
        found(
            client::Entity::find_by_id(request.client_id).one(&txn).await?,
            "Client",
            request.client_id,
        )?;

        let now = Utc::now();
        let model = insert_numbered(
            &txn,
            proforma::ActiveModel {
                id: Set(Uuid::new_v4()),
                numero: NotSet,
                client_id: Set(request.client_id),
                statut: Set(ProformaStatus::Brouillon),
                lignes: Set(lignes),
                total_ht: Set(total_ht),
                remise: Set(remise),
                total_net: Set(total_net),
                bdc_id: Set(None),
                notes: Set(request.notes),
                version: Set(1),
                created_at: Set(now),
                updated_at: Set(now),
            },
        )
        .await?;
        txn.commit().await?;

        info!(proforma_id = %model.id, numero = %model.numero, "Proforma created");
        self.event_sender.send_or_log(Event::DocumentCreated {
            kind: RecordKind::Proforma,
            id: model.id,
            numero: Some(model.numero.clone()),
        });
        Ok(model)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, proforma_id: Uuid) -> Result<proforma::Model, ServiceError> {
        let row = proforma::Entity::find_by_id(proforma_id)
            .one(&*self.db_pool)
            .await?;
        found(row, "Proforma", proforma_id)
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: ProformaFilter,
        page: PageRequest,
    ) -> Result<Page<proforma::Model>, ServiceError> {
        let mut select = proforma::Entity::find().order_by_desc(proforma::Column::CreatedAt);
        if let Some(client_id) = filter.client_id {
            select = select.filter(proforma::Column::ClientId.eq(client_id));
        }
        if let Some(statut) = filter.statut {
            select = select.filter(proforma::Column::Statut.eq(statut));
        }
        paginate(select, &self.db_pool, page).await
    }

    /// Edits lines, discount or notes of a draft quote.
    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        proforma_id: Uuid,
        request: UpdateProformaRequest,
    ) -> Result<proforma::Model, ServiceError> {
        request.validate()?;
        let current = self.get(proforma_id).await?;
        check_expected_version(proforma_id, current.version, request.version)?;
        if current.statut != ProformaStatus::Brouillon {
            return Err(ServiceError::InvalidOperation(format!(
                "la proforma {} n'est plus modifiable (statut {})",
                current.numero, current.statut
            )));
        }

        let mut updated = current.clone();
        if let Some(lignes) = request.lignes {
            updated.lignes = build_lignes(lignes)?;
        }
        if let Some(remise) = request.remise {
            updated.remise = remise;
        }
        if request.notes.is_some() {
            updated.notes = request.notes;
        }
        updated.total_ht = updated.lignes.total();
        updated.total_net = apply_remise(updated.total_ht, updated.remise)?;
        updated.version = current.version + 1;
        updated.updated_at = Utc::now();

        update_versioned(
            &*self.db_pool,
            proforma::ActiveModel::from(updated.clone()),
            proforma_id,
            current.version,
        )
        .await?;
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn transition(
        &self,
        proforma_id: Uuid,
        to: ProformaStatus,
    ) -> Result<proforma::Model, ServiceError> {
        let current = self.get(proforma_id).await?;
        ensure_transition(current.statut, to)?;

        let mut updated = current.clone();
        updated.statut = to;
        updated.version = current.version + 1;
        updated.updated_at = Utc::now();
        update_versioned(
            &*self.db_pool,
            proforma::ActiveModel::from(updated.clone()),
            proforma_id,
            current.version,
        )
        .await?;

        info!(%proforma_id, from = %current.statut, %to, "Proforma status changed");
        self.event_sender.send_or_log(Event::status_changed(
            DocumentType::Proforma,
            proforma_id,
            current.statut,
            to,
        ));
        Ok(updated)
    }

    /// Creates the purchase order of a validated quote and links both ways.
    #[instrument(skip(self))]
    pub async fn generate_bdc(&self, proforma_id: Uuid) -> Result<bdc::Model, ServiceError> {
        let txn = self.db_pool.begin().await?;
        let source = found(
            proforma::Entity::find_by_id(proforma_id).one(&txn).await?,
            "Proforma",
            proforma_id,
        )?;
        rules::can_generate_bdc(&source)?;

        let now = Utc::now();
        let order = insert_numbered(
            &txn,
            bdc::ActiveModel {
                id: Set(Uuid::new_v4()),
                numero: NotSet,
                client_id: Set(source.client_id),
                proforma_id: Set(Some(source.id)),
                statut: Set(BdcStatus::Brouillon),
                total_ht: Set(source.lignes.total()),
                lignes: Set(source.lignes.clone()),
                notes: Set(source.notes.clone()),
                version: Set(1),
                created_at: Set(now),
                updated_at: Set(now),
            },
        )
        .await?;

        let mut linked = source.clone();
        linked.bdc_id = Some(order.id);
        linked.version = source.version + 1;
        linked.updated_at = now;
        update_versioned(
            &txn,
            proforma::ActiveModel::from(linked),
            proforma_id,
            source.version,
        )
        .await?;
        txn.commit().await?;

        info!(%proforma_id, bdc_id = %order.id, numero = %order.numero, "BDC generated from proforma");
        self.event_sender.send_or_log(Event::DocumentCreated {
            kind: RecordKind::Bdc,
            id: order.id,
            numero: Some(order.numero.clone()),
        });
        Ok(order)
    }

    /// Deletes a draft quote.
    #[instrument(skip(self))]
    pub async fn delete(&self, proforma_id: Uuid) -> Result<(), ServiceError> {
        let current = self.get(proforma_id).await?;
        if current.statut != ProformaStatus::Brouillon {
            return Err(ServiceError::InvalidOperation(format!(
                "seule une proforma en brouillon peut être supprimée ({} est {})",
                current.numero, current.statut
            )));
        }
        proforma::Entity::delete_by_id(proforma_id)
            .exec(&*self.db_pool)
            .await?;
        self.event_sender.send_or_log(Event::DocumentDeleted {
            kind: RecordKind::Proforma,
            id: proforma_id,
        });
        Ok(())
    }
}
