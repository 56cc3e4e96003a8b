use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveValue::NotSet, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use uuid::Uuid;
use validator::Validate;

use super::{paginate, Page, PageRequest};
use crate::{
    db::{documents::found, insert_numbered, update_versioned, DbPool},
    entities::{
        bdc,
        bdl::{self, BdlStatus},
        LigneLivree, LignesLivrees,
    },
    errors::ServiceError,
    events::{Event, EventSender, RecordKind},
    lifecycle::{ensure_transition, DocumentType},
    reconciliation::{check_delivery_quantities, recalculate_client_totals},
    rules,
};

/// Quantity to deliver against one line of the order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LigneLivraisonInput {
    pub ligne_id: Uuid,
    pub quantite: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateBdlRequest {
    pub lignes: Vec<LigneLivraisonInput>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BdlFilter {
    pub bdc_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub statut: Option<BdlStatus>,
    pub facture_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct BdlService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    enforce_delivery_limits: bool,
}

impl BdlService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        enforce_delivery_limits: bool,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            enforce_delivery_limits,
        }
    }

    /// Issues a draft delivery note against an approved order.
    ///
    /// The order row is version-bumped in the same transaction, so two notes
    /// racing for the remaining quantity cannot both commit.
    #[instrument(skip(self, request))]
    pub async fn create(
        &self,
        bdc_id: Uuid,
        request: CreateBdlRequest,
    ) -> Result<bdl::Model, ServiceError> {
        request.validate()?;

        let txn = self.db_pool.begin().await?;
        let order = found(bdc::Entity::find_by_id(bdc_id).one(&txn).await?, "BDC", bdc_id)?;
        let existing = bdl::Entity::find()
            .filter(bdl::Column::BdcId.eq(bdc_id))
            .all(&txn)
            .await?;
        rules::can_generate_bdl(&order, &existing)?;

        let lignes = delivery_lines(&order, &request.lignes)?;
        check_delivery_quantities(&order, &existing, &lignes, self.enforce_delivery_limits)?;

        let now = Utc::now();
        let note = insert_numbered(
            &txn,
            bdl::ActiveModel {
                id: Set(Uuid::new_v4()),
                numero: NotSet,
                bdc_id: Set(order.id),
                client_id: Set(order.client_id),
                statut: Set(BdlStatus::Brouillon),
                lignes: Set(LignesLivrees(lignes)),
                facture_id: Set(None),
                date_livraison: Set(None),
                notes: Set(request.notes),
                version: Set(1),
                created_at: Set(now),
                updated_at: Set(now),
            },
        )
        .await?;

        let mut touched = order.clone();
        touched.version = order.version + 1;
        touched.updated_at = now;
        update_versioned(&txn, bdc::ActiveModel::from(touched), bdc_id, order.version).await?;
        txn.commit().await?;

        info!(bdl_id = %note.id, numero = %note.numero, %bdc_id, "BDL created");
        self.event_sender.send_or_log(Event::DocumentCreated {
            kind: RecordKind::Bdl,
            id: note.id,
            numero: Some(note.numero.clone()),
        });
        Ok(note)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, bdl_id: Uuid) -> Result<bdl::Model, ServiceError> {
        let row = bdl::Entity::find_by_id(bdl_id).one(&*self.db_pool).await?;
        found(row, "BDL", bdl_id)
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: BdlFilter,
        page: PageRequest,
    ) -> Result<Page<bdl::Model>, ServiceError> {
        let mut select = bdl::Entity::find().order_by_desc(bdl::Column::CreatedAt);
        if let Some(bdc_id) = filter.bdc_id {
            select = select.filter(bdl::Column::BdcId.eq(bdc_id));
        }
        if let Some(client_id) = filter.client_id {
            select = select.filter(bdl::Column::ClientId.eq(client_id));
        }
        if let Some(statut) = filter.statut {
            select = select.filter(bdl::Column::Statut.eq(statut));
        }
        if let Some(facture_id) = filter.facture_id {
            select = select.filter(bdl::Column::FactureId.eq(facture_id));
        }
        paginate(select, &self.db_pool, page).await
    }

    /// Moves the note along its lifecycle. Reaching LIVRE stamps the delivery
    /// date and refreshes the client rollups in the same transaction; ANNULE
    /// frees the note's quantities for new deliveries.
    #[instrument(skip(self))]
    pub async fn transition(&self, bdl_id: Uuid, to: BdlStatus) -> Result<bdl::Model, ServiceError> {
        let txn = self.db_pool.begin().await?;
        let current = found(bdl::Entity::find_by_id(bdl_id).one(&txn).await?, "BDL", bdl_id)?;
        ensure_transition(current.statut, to)?;

        let now = Utc::now();
        let mut updated = current.clone();
        updated.statut = to;
        if to == BdlStatus::Livre {
            updated.date_livraison = Some(now);
        }
        updated.version = current.version + 1;
        updated.updated_at = now;
        update_versioned(
            &txn,
            bdl::ActiveModel::from(updated.clone()),
            bdl_id,
            current.version,
        )
        .await?;

        let totals = if to == BdlStatus::Livre {
            Some(recalculate_client_totals(&txn, current.client_id).await?)
        } else {
            None
        };
        txn.commit().await?;

        info!(%bdl_id, from = %current.statut, %to, "BDL status changed");
        self.event_sender.send_or_log(Event::status_changed(
            DocumentType::Bdl,
            bdl_id,
            current.statut,
            to,
        ));
        if let Some(client) = totals {
            self.event_sender.send_or_log(Event::ClientTotalsRecalculated {
                client_id: client.id,
                total_du: client.total_du,
            });
        }
        Ok(updated)
    }

    /// Deletes a draft note.
    #[instrument(skip(self))]
    pub async fn delete(&self, bdl_id: Uuid) -> Result<(), ServiceError> {
        let current = self.get(bdl_id).await?;
        if current.statut != BdlStatus::Brouillon {
            return Err(ServiceError::InvalidOperation(format!(
                "seul un bon de livraison en brouillon peut être supprimé ({} est {})",
                current.numero, current.statut
            )));
        }
        bdl::Entity::delete_by_id(bdl_id).exec(&*self.db_pool).await?;
        self.event_sender.send_or_log(Event::DocumentDeleted {
            kind: RecordKind::Bdl,
            id: bdl_id,
        });
        Ok(())
    }
}

/// Resolves requested quantities against the order lines, copying the line's
/// label, unit and ordered unit price.
fn delivery_lines(
    order: &bdc::Model,
    requested: &[LigneLivraisonInput],
) -> Result<Vec<LigneLivree>, ServiceError> {
    requested
        .iter()
        .map(|input| {
            let source = order.lignes.find(input.ligne_id).ok_or_else(|| {
                ServiceError::ValidationError(format!(
                    "la ligne {} n'appartient pas au bon de commande {}",
                    input.ligne_id, order.numero
                ))
            })?;
            debug!(ligne_id = %input.ligne_id, quantite = %input.quantite, "delivery line");
            Ok(LigneLivree {
                ligne_id: source.id,
                designation: source.designation.clone(),
                unite: source.unite.clone(),
                quantite: input.quantite,
                prix_unitaire: source.prix_unitaire,
            })
        })
        .collect()
}
