use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveValue::NotSet, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use super::{ensure_positive, paginate, Page, PageRequest};
use crate::{
    db::{documents::found, insert_numbered, update_versioned, DbPool},
    entities::{
        facture::{self, FactureStatus},
        paiement::{self, ModePaiement},
    },
    errors::ServiceError,
    events::{Event, EventSender, RecordKind},
    lifecycle::{ensure_transition, DocumentType},
    reconciliation::{recalculate_client_totals, settle_facture},
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RecordPaiementRequest {
    pub facture_id: Uuid,
    pub montant: Decimal,
    pub mode: ModePaiement,
    #[validate(length(max = 128))]
    pub reference: Option<String>,
    pub date_paiement: Option<chrono::NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaiementFilter {
    pub facture_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
}

/// Payment together with the invoice it settled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaiementReceipt {
    pub paiement: paiement::Model,
    pub facture: facture::Model,
}

#[derive(Clone)]
pub struct PaiementService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl PaiementService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Records a payment against an emitted invoice, re-settles the invoice and
    /// refreshes the client rollups, all in one transaction.
    #[instrument(skip(self, request), fields(facture_id = %request.facture_id, montant = %request.montant))]
    pub async fn record(
        &self,
        request: RecordPaiementRequest,
    ) -> Result<PaiementReceipt, ServiceError> {
        request.validate()?;
        ensure_positive("montant", request.montant)?;

        let txn = self.db_pool.begin().await?;
        let invoice = found(
            facture::Entity::find_by_id(request.facture_id)
                .one(&txn)
                .await?,
            "Facture",
            request.facture_id,
        )?;
        if !matches!(
            invoice.statut,
            FactureStatus::Emise | FactureStatus::PayeePartielle
        ) {
            return Err(ServiceError::InvalidOperation(format!(
                "la facture {} n'accepte pas de paiement (statut {})",
                invoice.numero, invoice.statut
            )));
        }
        if request.montant > invoice.solde_restant {
            warn!(solde = %invoice.solde_restant, "Payment exceeds remaining balance");
            return Err(ServiceError::ValidationError(format!(
                "le paiement de {} dépasse le solde restant de {} sur la facture {}",
                request.montant, invoice.solde_restant, invoice.numero
            )));
        }

        let now = Utc::now();
        let payment = insert_numbered(
            &txn,
            paiement::ActiveModel {
                id: Set(Uuid::new_v4()),
                numero: NotSet,
                facture_id: Set(invoice.id),
                client_id: Set(invoice.client_id),
                montant: Set(request.montant),
                mode: Set(request.mode),
                reference: Set(request.reference),
                date_paiement: Set(request.date_paiement.unwrap_or_else(|| now.date_naive())),
                version: Set(1),
                created_at: Set(now),
            },
        )
        .await?;

        let settled = resettle(&txn, &invoice, false).await?;
        let client = recalculate_client_totals(&txn, invoice.client_id).await?;
        txn.commit().await?;

        info!(
            paiement_id = %payment.id,
            numero = %payment.numero,
            statut = %settled.statut,
            solde_restant = %settled.solde_restant,
            "Payment recorded"
        );
        self.event_sender.send_or_log(Event::PaiementRecorded {
            paiement_id: payment.id,
            facture_id: settled.id,
            montant: payment.montant,
            solde_restant: settled.solde_restant,
        });
        if settled.statut != invoice.statut {
            self.event_sender.send_or_log(Event::status_changed(
                DocumentType::Facture,
                settled.id,
                invoice.statut,
                settled.statut,
            ));
        }
        self.event_sender.send_or_log(Event::ClientTotalsRecalculated {
            client_id: client.id,
            total_du: client.total_du,
        });

        Ok(PaiementReceipt {
            paiement: payment,
            facture: settled,
        })
    }

    #[instrument(skip(self))]
    pub async fn get(&self, paiement_id: Uuid) -> Result<paiement::Model, ServiceError> {
        let row = paiement::Entity::find_by_id(paiement_id)
            .one(&*self.db_pool)
            .await?;
        found(row, "Paiement", paiement_id)
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: PaiementFilter,
        page: PageRequest,
    ) -> Result<Page<paiement::Model>, ServiceError> {
        let mut select = paiement::Entity::find().order_by_desc(paiement::Column::CreatedAt);
        if let Some(facture_id) = filter.facture_id {
            select = select.filter(paiement::Column::FactureId.eq(facture_id));
        }
        if let Some(client_id) = filter.client_id {
            select = select.filter(paiement::Column::ClientId.eq(client_id));
        }
        paginate(select, &self.db_pool, page).await
    }

    /// Administrative removal of a payment. The invoice is re-settled from the
    /// remaining payments and may move back to EMISE or PAYEE_PARTIELLE.
    #[instrument(skip(self))]
    pub async fn delete(&self, paiement_id: Uuid) -> Result<facture::Model, ServiceError> {
        let txn = self.db_pool.begin().await?;
        let payment = found(
            paiement::Entity::find_by_id(paiement_id).one(&txn).await?,
            "Paiement",
            paiement_id,
        )?;
        let invoice = found(
            facture::Entity::find_by_id(payment.facture_id)
                .one(&txn)
                .await?,
            "Facture",
            payment.facture_id,
        )?;

        paiement::Entity::delete_by_id(paiement_id).exec(&txn).await?;
        let settled = resettle(&txn, &invoice, true).await?;
        let client = recalculate_client_totals(&txn, invoice.client_id).await?;
        txn.commit().await?;

        warn!(
            %paiement_id,
            facture_id = %settled.id,
            statut = %settled.statut,
            "Payment deleted"
        );
        self.event_sender.send_or_log(Event::PaiementDeleted {
            paiement_id,
            facture_id: settled.id,
            solde_restant: settled.solde_restant,
        });
        self.event_sender.send_or_log(Event::DocumentDeleted {
            kind: RecordKind::Paiement,
            id: paiement_id,
        });
        self.event_sender.send_or_log(Event::ClientTotalsRecalculated {
            client_id: client.id,
            total_du: client.total_du,
        });
        Ok(settled)
    }
}

/// Rewrites `total_paye`, `solde_restant` and the payment status of `invoice`
/// from the payments currently stored.
///
/// Forward moves go through the transition guard; `allow_backward` is the
/// deletion path. Draft and cancelled invoices keep their status.
async fn resettle(
    txn: &DatabaseTransaction,
    invoice: &facture::Model,
    allow_backward: bool,
) -> Result<facture::Model, ServiceError> {
    let montants: Vec<Decimal> = paiement::Entity::find()
        .select_only()
        .column(paiement::Column::Montant)
        .filter(paiement::Column::FactureId.eq(invoice.id))
        .into_tuple()
        .all(txn)
        .await?;
    let settlement = settle_facture(invoice.total_net, montants);

    let statut = if invoice.statut.is_billed() {
        if settlement.statut != invoice.statut && !allow_backward {
            ensure_transition(invoice.statut, settlement.statut)?;
        }
        settlement.statut
    } else {
        invoice.statut
    };

    let mut updated = invoice.clone();
    updated.total_paye = settlement.total_paye;
    updated.solde_restant = settlement.solde_restant;
    updated.statut = statut;
    updated.version = invoice.version + 1;
    updated.updated_at = Utc::now();
    update_versioned(
        txn,
        facture::ActiveModel::from(updated.clone()),
        invoice.id,
        invoice.version,
    )
    .await?;
    Ok(updated)
}
