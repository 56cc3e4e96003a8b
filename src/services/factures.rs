use std::collections::HashSet;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveValue::NotSet, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder,
    Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use super::{apply_remise, paginate, Page, PageRequest};
use crate::{
    db::{documents::found, insert_numbered, update_versioned, DbPool},
    entities::{
        bdl,
        client,
        facture::{self, FactureStatus},
        BdlIds, Ligne, Lignes,
    },
    errors::ServiceError,
    events::{Event, EventSender, RecordKind},
    lifecycle::{ensure_transition, DocumentType},
    reconciliation::recalculate_client_totals,
    rules,
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateFactureRequest {
    #[validate(length(min = 1, message = "Au moins un bon de livraison est requis"))]
    pub bdl_ids: Vec<Uuid>,
    #[serde(default)]
    pub remise: Option<Decimal>,
    pub date_echeance: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmitFactureRequest {
    pub date_echeance: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CancelFactureRequest {
    #[validate(length(max = 2000))]
    pub motif: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FactureFilter {
    pub client_id: Option<Uuid>,
    pub statut: Option<FactureStatus>,
}

#[derive(Clone)]
pub struct FactureService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl FactureService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Drafts an invoice consolidating delivered notes of one client and links
    /// the notes to it.
    #[instrument(skip(self, request), fields(bdl_count = request.bdl_ids.len()))]
    pub async fn create_from_bdls(
        &self,
        request: CreateFactureRequest,
    ) -> Result<facture::Model, ServiceError> {
        request.validate()?;
        let mut seen = HashSet::new();
        let bdl_ids: Vec<Uuid> = request
            .bdl_ids
            .into_iter()
            .filter(|id| seen.insert(*id))
            .collect();

        let txn = self.db_pool.begin().await?;
        let mut notes = bdl::Entity::find()
            .filter(bdl::Column::Id.is_in(bdl_ids.clone()))
            .all(&txn)
            .await?;
        if let Some(missing) = bdl_ids.iter().find(|id| !notes.iter().any(|n| n.id == **id)) {
            return Err(ServiceError::not_found("BDL", *missing));
        }
        notes.sort_by_key(|n| bdl_ids.iter().position(|id| *id == n.id));
        rules::can_generate_facture(&notes)?;

        let lignes = invoice_lines(&notes);
        let total = lignes.total();
        let remise = request.remise.unwrap_or(Decimal::ZERO);
        let total_net = apply_remise(total, remise)?;
        if total_net <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "le montant net de la facture doit être strictement positif".to_string(),
            ));
        }

        let client_id = notes[0].client_id;
        let now = Utc::now();
        let invoice = insert_numbered(
            &txn,
            facture::ActiveModel {
                id: Set(Uuid::new_v4()),
                numero: NotSet,
                client_id: Set(client_id),
                statut: Set(FactureStatus::Brouillon),
                bdl_ids: Set(BdlIds(bdl_ids)),
                lignes: Set(lignes),
                total: Set(total),
                remise: Set(remise),
                total_net: Set(total_net),
                total_paye: Set(Decimal::ZERO),
                solde_restant: Set(total_net),
                motif_annulation: Set(None),
                date_emission: Set(None),
                date_echeance: Set(request.date_echeance),
                version: Set(1),
                created_at: Set(now),
                updated_at: Set(now),
            },
        )
        .await?;

        for note in notes {
            let mut linked = note.clone();
            linked.facture_id = Some(invoice.id);
            linked.version = note.version + 1;
            linked.updated_at = now;
            update_versioned(&txn, bdl::ActiveModel::from(linked), note.id, note.version).await?;
        }
        txn.commit().await?;

        info!(facture_id = %invoice.id, numero = %invoice.numero, %total_net, "Facture created");
        self.event_sender.send_or_log(Event::DocumentCreated {
            kind: RecordKind::Facture,
            id: invoice.id,
            numero: Some(invoice.numero.clone()),
        });
        Ok(invoice)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, facture_id: Uuid) -> Result<facture::Model, ServiceError> {
        let row = facture::Entity::find_by_id(facture_id)
            .one(&*self.db_pool)
            .await?;
        found(row, "Facture", facture_id)
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: FactureFilter,
        page: PageRequest,
    ) -> Result<Page<facture::Model>, ServiceError> {
        let mut select = facture::Entity::find().order_by_desc(facture::Column::CreatedAt);
        if let Some(client_id) = filter.client_id {
            select = select.filter(facture::Column::ClientId.eq(client_id));
        }
        if let Some(statut) = filter.statut {
            select = select.filter(facture::Column::Statut.eq(statut));
        }
        paginate(select, &self.db_pool, page).await
    }

    /// BROUILLON → EMISE. The invoice starts counting towards the client's
    /// rollups from here.
    #[instrument(skip(self, request))]
    pub async fn emit(
        &self,
        facture_id: Uuid,
        request: EmitFactureRequest,
    ) -> Result<facture::Model, ServiceError> {
        let txn = self.db_pool.begin().await?;
        let current = load(&txn, facture_id).await?;
        ensure_transition(current.statut, FactureStatus::Emise)?;

        let now = Utc::now();
        let mut updated = current.clone();
        updated.statut = FactureStatus::Emise;
        updated.date_emission = Some(now);
        if request.date_echeance.is_some() {
            updated.date_echeance = request.date_echeance;
        }
        updated.solde_restant = updated.total_net - updated.total_paye;
        updated.version = current.version + 1;
        updated.updated_at = now;
        update_versioned(
            &txn,
            facture::ActiveModel::from(updated.clone()),
            facture_id,
            current.version,
        )
        .await?;
        let client = recalculate_client_totals(&txn, current.client_id).await?;
        txn.commit().await?;

        info!(%facture_id, numero = %updated.numero, "Facture emitted");
        self.publish_transition(&current, &updated, &client);
        Ok(updated)
    }

    /// Cancels the invoice and unlinks its delivery notes so they can be
    /// invoiced again. Once emitted, a non-blank motif is mandatory.
    #[instrument(skip(self, request))]
    pub async fn cancel(
        &self,
        facture_id: Uuid,
        request: CancelFactureRequest,
    ) -> Result<facture::Model, ServiceError> {
        request.validate()?;
        let txn = self.db_pool.begin().await?;
        let current = load(&txn, facture_id).await?;
        ensure_transition(current.statut, FactureStatus::Annulee)?;

        let motif = request
            .motif
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string);
        if motif.is_none() && current.statut != FactureStatus::Brouillon {
            warn!(%facture_id, "Cancellation without motif refused");
            return Err(ServiceError::ValidationError(format!(
                "un motif d'annulation est obligatoire pour la facture {}",
                current.numero
            )));
        }

        let now = Utc::now();
        let mut updated = current.clone();
        updated.statut = FactureStatus::Annulee;
        updated.motif_annulation = motif;
        updated.version = current.version + 1;
        updated.updated_at = now;
        update_versioned(
            &txn,
            facture::ActiveModel::from(updated.clone()),
            facture_id,
            current.version,
        )
        .await?;
        let unlinked = unlink_bdls(&txn, facture_id).await?;
        let client = recalculate_client_totals(&txn, current.client_id).await?;
        txn.commit().await?;

        info!(%facture_id, unlinked, "Facture cancelled");
        self.publish_transition(&current, &updated, &client);
        Ok(updated)
    }

    /// Generic status endpoint. Payment statuses are derived from recorded
    /// payments and cannot be set by hand.
    #[instrument(skip(self, motif))]
    pub async fn transition(
        &self,
        facture_id: Uuid,
        to: FactureStatus,
        motif: Option<String>,
    ) -> Result<facture::Model, ServiceError> {
        match to {
            FactureStatus::Emise => self.emit(facture_id, EmitFactureRequest::default()).await,
            FactureStatus::Annulee => {
                self.cancel(facture_id, CancelFactureRequest { motif })
                    .await
            }
            FactureStatus::PayeePartielle | FactureStatus::Payee => {
                let current = self.get(facture_id).await?;
                ensure_transition(current.statut, to)?;
                Err(ServiceError::InvalidOperation(format!(
                    "le statut {} découle des paiements enregistrés",
                    to
                )))
            }
            FactureStatus::Brouillon => {
                let current = self.get(facture_id).await?;
                ensure_transition(current.statut, to)?;
                Ok(current)
            }
        }
    }

    /// Deletes a draft invoice and releases its notes.
    #[instrument(skip(self))]
    pub async fn delete(&self, facture_id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db_pool.begin().await?;
        let current = load(&txn, facture_id).await?;
        if current.statut != FactureStatus::Brouillon {
            return Err(ServiceError::InvalidOperation(format!(
                "seule une facture en brouillon peut être supprimée ({} est {})",
                current.numero, current.statut
            )));
        }
        unlink_bdls(&txn, facture_id).await?;
        facture::Entity::delete_by_id(facture_id).exec(&txn).await?;
        txn.commit().await?;

        self.event_sender.send_or_log(Event::DocumentDeleted {
            kind: RecordKind::Facture,
            id: facture_id,
        });
        Ok(())
    }

    fn publish_transition(
        &self,
        before: &facture::Model,
        after: &facture::Model,
        client: &client::Model,
    ) {
        self.event_sender.send_or_log(Event::status_changed(
            DocumentType::Facture,
            after.id,
            before.statut,
            after.statut,
        ));
        self.event_sender.send_or_log(Event::ClientTotalsRecalculated {
            client_id: client.id,
            total_du: client.total_du,
        });
    }
}

async fn load(txn: &DatabaseTransaction, facture_id: Uuid) -> Result<facture::Model, ServiceError> {
    found(
        facture::Entity::find_by_id(facture_id).one(txn).await?,
        "Facture",
        facture_id,
    )
}

/// Clears `facture_id` on every note linked to the invoice.
async fn unlink_bdls(txn: &DatabaseTransaction, facture_id: Uuid) -> Result<usize, ServiceError> {
    let notes = bdl::Entity::find()
        .filter(bdl::Column::FactureId.eq(facture_id))
        .all(txn)
        .await?;
    let now = Utc::now();
    for note in &notes {
        let mut unlinked = note.clone();
        unlinked.facture_id = None;
        unlinked.version = note.version + 1;
        unlinked.updated_at = now;
        update_versioned(txn, bdl::ActiveModel::from(unlinked), note.id, note.version).await?;
    }
    Ok(notes.len())
}

/// Invoice lines from delivered notes; quantities of the same order line are
/// summed, first appearance order kept.
pub fn invoice_lines(notes: &[bdl::Model]) -> Lignes {
    let mut lignes: Vec<Ligne> = Vec::new();
    for line in notes.iter().flat_map(|n| n.lignes.iter()) {
        match lignes
            .iter_mut()
            .find(|l| l.id == line.ligne_id && l.prix_unitaire == line.prix_unitaire)
        {
            Some(existing) => existing.quantite += line.quantite,
            None => lignes.push(Ligne {
                id: line.ligne_id,
                designation: line.designation.clone(),
                unite: line.unite.clone(),
                quantite: line.quantite,
                prix_unitaire: line.prix_unitaire,
            }),
        }
    }
    Lignes(lignes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{bdl::BdlStatus, LigneLivree, LignesLivrees};
    use rust_decimal_macros::dec;

    fn note(lines: Vec<LigneLivree>) -> bdl::Model {
        let now = Utc::now();
        bdl::Model {
            id: Uuid::new_v4(),
            numero: "BDL-2026-0001".into(),
            bdc_id: Uuid::nil(),
            client_id: Uuid::nil(),
            statut: BdlStatus::Livre,
            lignes: LignesLivrees(lines),
            facture_id: None,
            date_livraison: Some(now),
            notes: None,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    fn line(ligne_id: Uuid, designation: &str, quantite: Decimal) -> LigneLivree {
        LigneLivree {
            ligne_id,
            designation: designation.into(),
            unite: "sac".into(),
            quantite,
            prix_unitaire: dec!(5000),
        }
    }

    #[test]
    fn invoice_lines_merge_partial_deliveries_of_one_line() {
        let ciment = Uuid::new_v4();
        let fer = Uuid::new_v4();
        let lignes = invoice_lines(&[
            note(vec![line(ciment, "Ciment", dec!(60))]),
            note(vec![line(fer, "Fer", dec!(5)), line(ciment, "Ciment", dec!(40))]),
        ]);
        assert_eq!(lignes.0.len(), 2);
        assert_eq!(lignes.0[0].id, ciment);
        assert_eq!(lignes.0[0].quantite, dec!(100));
        assert_eq!(lignes.total(), dec!(525000));
    }
}
