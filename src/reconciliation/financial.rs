use std::collections::BTreeMap;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::db::update_versioned;
use crate::entities::{
    bdl::{self, BdlStatus},
    client, depense,
    facture::{self, FactureStatus},
    paiement,
};
use crate::errors::ServiceError;

/// Payment state of an invoice derived from its recorded payments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub total_paye: Decimal,
    pub solde_restant: Decimal,
    pub statut: FactureStatus,
}

/// Folds payment amounts into the paid total, remaining balance and status of an
/// emitted invoice. Recomputed from scratch on every payment insert or delete.
pub fn settle_facture<I>(total_net: Decimal, montants: I) -> Settlement
where
    I: IntoIterator<Item = Decimal>,
{
    let total_paye: Decimal = montants.into_iter().sum();
    let statut = if total_paye > Decimal::ZERO && total_paye >= total_net {
        FactureStatus::Payee
    } else if total_paye > Decimal::ZERO {
        FactureStatus::PayeePartielle
    } else {
        FactureStatus::Emise
    };
    Settlement {
        total_paye,
        solde_restant: total_net - total_paye,
        statut,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientTotals {
    pub total_livre: Decimal,
    pub total_facture: Decimal,
    pub total_paye: Decimal,
    pub total_du: Decimal,
}

/// Client rollups over billed invoices and delivered notes.
pub fn client_totals(factures: &[facture::Model], bdls: &[bdl::Model]) -> ClientTotals {
    let (total_facture, total_paye) = factures
        .iter()
        .filter(|f| f.statut.is_billed())
        .fold((Decimal::ZERO, Decimal::ZERO), |(net, paid), f| {
            (net + f.total_net, paid + f.total_paye)
        });
    let total_livre = bdls
        .iter()
        .filter(|note| note.statut == BdlStatus::Livre)
        .map(|note| note.lignes.total())
        .sum();

    ClientTotals {
        total_livre,
        total_facture,
        total_paye,
        total_du: total_facture - total_paye,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub total_facture: Decimal,
    pub total_paye: Decimal,
    pub total_du: Decimal,
    /// Every recorded payment, including those on invoices cancelled after
    /// collection.
    pub total_encaisse: Decimal,
    pub total_depenses: Decimal,
    /// Cash collected minus expenses.
    pub tresorerie: Decimal,
    pub factures_par_statut: BTreeMap<String, u64>,
}

pub fn dashboard_summary(
    factures: &[facture::Model],
    paiements: &[paiement::Model],
    depenses: &[depense::Model],
) -> DashboardSummary {
    let totals = client_totals(factures, &[]);
    let total_encaisse: Decimal = paiements.iter().map(|p| p.montant).sum();
    let total_depenses: Decimal = depenses.iter().map(|d| d.montant).sum();

    let mut factures_par_statut = BTreeMap::new();
    for f in factures {
        *factures_par_statut.entry(f.statut.to_string()).or_insert(0) += 1;
    }

    DashboardSummary {
        total_facture: totals.total_facture,
        total_paye: totals.total_paye,
        total_du: totals.total_du,
        total_encaisse,
        total_depenses,
        tresorerie: total_encaisse - total_depenses,
        factures_par_statut,
    }
}

/// Recomputes and persists the rollups of one client on `conn`.
///
/// Callers pass the transaction of the triggering write so the status change and
/// the rollups commit together. Running it twice without intervening writes leaves
/// the rollup values unchanged.
#[instrument(skip(conn))]
pub async fn recalculate_client_totals<C>(
    conn: &C,
    client_id: Uuid,
) -> Result<client::Model, ServiceError>
where
    C: ConnectionTrait,
{
    let current = client::Entity::find_by_id(client_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Client", client_id))?;

    let factures = facture::Entity::find()
        .filter(facture::Column::ClientId.eq(client_id))
        .all(conn)
        .await?;
    let bdls = bdl::Entity::find()
        .filter(bdl::Column::ClientId.eq(client_id))
        .filter(bdl::Column::Statut.eq(BdlStatus::Livre))
        .all(conn)
        .await?;

    let totals = client_totals(&factures, &bdls);
    debug!(?totals, "client totals recomputed");

    let mut updated = current.clone();
    updated.total_livre = totals.total_livre;
    updated.total_facture = totals.total_facture;
    updated.total_paye = totals.total_paye;
    updated.total_du = totals.total_du;
    updated.version = current.version + 1;
    updated.updated_at = Utc::now();

    update_versioned(conn, client::ActiveModel::from(updated.clone()), client_id, current.version)
        .await?;
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{BdlIds, Lignes, LignesLivrees};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn facture(statut: FactureStatus, total_net: Decimal, total_paye: Decimal) -> facture::Model {
        let now = Utc::now();
        facture::Model {
            id: Uuid::new_v4(),
            numero: "FAC-2026-0001".into(),
            client_id: Uuid::nil(),
            statut,
            bdl_ids: BdlIds::default(),
            lignes: Lignes::default(),
            total: total_net,
            remise: Decimal::ZERO,
            total_net,
            total_paye,
            solde_restant: total_net - total_paye,
            motif_annulation: None,
            date_emission: None,
            date_echeance: None,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn payments_move_invoice_to_partial_then_paid() {
        let first = settle_facture(dec!(1000000), [dec!(400000)]);
        assert_eq!(first.statut, FactureStatus::PayeePartielle);
        assert_eq!(first.solde_restant, dec!(600000));

        let second = settle_facture(dec!(1000000), [dec!(400000), dec!(600000)]);
        assert_eq!(second.statut, FactureStatus::Payee);
        assert_eq!(second.solde_restant, Decimal::ZERO);
        assert_eq!(second.total_paye, dec!(1000000));
    }

    #[test]
    fn no_payment_keeps_invoice_emitted() {
        let settlement = settle_facture(dec!(500), std::iter::empty());
        assert_eq!(settlement.statut, FactureStatus::Emise);
        assert_eq!(settlement.solde_restant, dec!(500));
    }

    #[test]
    fn client_totals_skip_draft_and_cancelled_invoices() {
        let factures = vec![
            facture(FactureStatus::Emise, dec!(1000), dec!(0)),
            facture(FactureStatus::PayeePartielle, dec!(2000), dec!(500)),
            facture(FactureStatus::Payee, dec!(300), dec!(300)),
            facture(FactureStatus::Brouillon, dec!(9999), dec!(0)),
            facture(FactureStatus::Annulee, dec!(7777), dec!(100)),
        ];
        let totals = client_totals(&factures, &[]);
        assert_eq!(totals.total_facture, dec!(3300));
        assert_eq!(totals.total_paye, dec!(800));
        assert_eq!(totals.total_du, dec!(2500));
        assert_eq!(totals.total_du, totals.total_facture - totals.total_paye);
    }

    #[test]
    fn delivered_total_counts_only_livre_notes() {
        let now = Utc::now();
        let note = |statut| bdl::Model {
            id: Uuid::new_v4(),
            numero: "BDL-2026-0001".into(),
            bdc_id: Uuid::nil(),
            client_id: Uuid::nil(),
            statut,
            lignes: LignesLivrees(vec![crate::entities::LigneLivree {
                ligne_id: Uuid::nil(),
                designation: "Gravier".into(),
                unite: "m3".into(),
                quantite: dec!(4),
                prix_unitaire: dec!(25000),
            }]),
            facture_id: None,
            date_livraison: None,
            notes: None,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        let totals = client_totals(&[], &[note(BdlStatus::Livre), note(BdlStatus::EnRoute)]);
        assert_eq!(totals.total_livre, dec!(100000));
    }

    #[test]
    fn dashboard_nets_expenses_against_collected_cash() {
        let now = Utc::now();
        let depense = depense::Model {
            id: Uuid::new_v4(),
            numero: "DEP-2026-0001".into(),
            libelle: "Carburant".into(),
            categorie: "transport".into(),
            montant: dec!(150),
            date_depense: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            notes: None,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        let paid = facture(FactureStatus::Payee, dec!(1000), dec!(1000));
        let cancelled = facture(FactureStatus::Annulee, dec!(800), dec!(300));
        let encaissement = |facture_id, montant| paiement::Model {
            id: Uuid::new_v4(),
            numero: "PAY-2026-0001".into(),
            facture_id,
            client_id: Uuid::nil(),
            montant,
            mode: paiement::ModePaiement::Virement,
            reference: None,
            date_paiement: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            version: 1,
            created_at: now,
        };
        let paiements = vec![
            encaissement(paid.id, dec!(1000)),
            encaissement(cancelled.id, dec!(300)),
        ];
        let factures = vec![
            paid,
            cancelled,
            facture(FactureStatus::Emise, dec!(500), dec!(0)),
            facture(FactureStatus::Emise, dec!(200), dec!(0)),
        ];
        let summary = dashboard_summary(&factures, &paiements, &[depense]);
        assert_eq!(summary.total_facture, dec!(1700));
        assert_eq!(summary.total_paye, dec!(1000));
        assert_eq!(summary.total_du, dec!(700));
        assert_eq!(summary.total_encaisse, dec!(1300));
        assert_eq!(summary.tresorerie, dec!(1150));
        assert_eq!(summary.factures_par_statut.get("EMISE"), Some(&2));
        assert_eq!(summary.factures_par_statut.get("PAYEE"), Some(&1));
    }
}
