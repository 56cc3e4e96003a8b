use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{bdc, bdl, LigneLivree};
use crate::errors::ServiceError;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineProgress {
    pub ligne_id: Uuid,
    pub designation: String,
    pub ordered: Decimal,
    pub delivered: Decimal,
    pub remaining: Decimal,
    pub pct: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryProgress {
    pub bdc_id: Uuid,
    pub per_line: Vec<LineProgress>,
    pub global_pct: Decimal,
    pub is_complete: bool,
}

/// Sums delivered quantities per purchase order line over the active notes of `bdc_id`.
pub fn delivered_by_line<'a, I>(bdc_id: Uuid, bdls: I) -> HashMap<Uuid, Decimal>
where
    I: IntoIterator<Item = &'a bdl::Model>,
{
    let mut delivered: HashMap<Uuid, Decimal> = HashMap::new();
    for note in bdls
        .into_iter()
        .filter(|note| note.bdc_id == bdc_id && note.is_active())
    {
        for ligne in note.lignes.iter() {
            *delivered.entry(ligne.ligne_id).or_default() += ligne.quantite;
        }
    }
    delivered
}

fn percentage(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        Decimal::ZERO
    } else {
        (part / whole * HUNDRED).round_dp(2)
    }
}

/// Per-line and value-weighted global delivery progress of a purchase order.
pub fn compute_delivery_progress(bdc: &bdc::Model, bdls: &[bdl::Model]) -> DeliveryProgress {
    let delivered = delivered_by_line(bdc.id, bdls);

    let mut ordered_value = Decimal::ZERO;
    let mut delivered_value = Decimal::ZERO;
    let per_line: Vec<LineProgress> = bdc
        .lignes
        .iter()
        .map(|ligne| {
            let done = delivered.get(&ligne.id).copied().unwrap_or_default();
            ordered_value += ligne.montant();
            delivered_value += done.min(ligne.quantite) * ligne.prix_unitaire;
            LineProgress {
                ligne_id: ligne.id,
                designation: ligne.designation.clone(),
                ordered: ligne.quantite,
                delivered: done,
                remaining: (ligne.quantite - done).max(Decimal::ZERO),
                pct: percentage(done, ligne.quantite),
            }
        })
        .collect();

    let is_complete = per_line.iter().all(|line| line.remaining.is_zero());
    // Value weighting ignores zero-priced lines, so completion alone decides 100%.
    let global_pct = if is_complete {
        HUNDRED
    } else {
        percentage(delivered_value, ordered_value).min(dec_99_99())
    };

    DeliveryProgress {
        bdc_id: bdc.id,
        per_line,
        global_pct,
        is_complete,
    }
}

fn dec_99_99() -> Decimal {
    Decimal::new(9999, 2)
}

/// Validates the lines of a new delivery note against what remains to deliver.
///
/// When `enforce_limits` is false only structural checks run (known line, positive
/// quantity) and over-deliveries are accepted.
pub fn check_delivery_quantities(
    bdc: &bdc::Model,
    existing: &[bdl::Model],
    new_lines: &[LigneLivree],
    enforce_limits: bool,
) -> Result<(), ServiceError> {
    if new_lines.is_empty() {
        return Err(ServiceError::ValidationError(
            "le bon de livraison doit contenir au moins une ligne".to_string(),
        ));
    }

    let mut requested: HashMap<Uuid, Decimal> = HashMap::new();
    for line in new_lines {
        if bdc.lignes.find(line.ligne_id).is_none() {
            return Err(ServiceError::ValidationError(format!(
                "la ligne {} n'appartient pas au bon de commande {}",
                line.ligne_id, bdc.numero
            )));
        }
        if line.quantite <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "quantité livrée invalide pour '{}' : {}",
                line.designation, line.quantite
            )));
        }
        *requested.entry(line.ligne_id).or_default() += line.quantite;
    }

    if !enforce_limits {
        return Ok(());
    }

    let delivered = delivered_by_line(bdc.id, existing);
    for ligne in bdc.lignes.iter() {
        let Some(&wanted) = requested.get(&ligne.id) else {
            continue;
        };
        let already = delivered.get(&ligne.id).copied().unwrap_or_default();
        let remaining = (ligne.quantite - already).max(Decimal::ZERO);
        if wanted > remaining {
            return Err(ServiceError::QuantityOverrun {
                ligne_id: ligne.id,
                designation: ligne.designation.clone(),
                ordered: ligne.quantite,
                requested: wanted,
                remaining,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{bdc::BdcStatus, bdl::BdlStatus, Ligne, Lignes, LignesLivrees};
    use assert_matches::assert_matches;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn bdc_with(lignes: Vec<Ligne>) -> bdc::Model {
        let now = Utc::now();
        bdc::Model {
            id: Uuid::new_v4(),
            numero: "BDC-2026-0001".into(),
            client_id: Uuid::new_v4(),
            proforma_id: None,
            statut: BdcStatus::Approuve,
            total_ht: Lignes(lignes.clone()).total(),
            lignes: Lignes(lignes),
            notes: None,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    fn ligne(quantite: Decimal, prix: Decimal) -> Ligne {
        Ligne {
            id: Uuid::new_v4(),
            designation: "Tôle ondulée".into(),
            unite: "pièce".into(),
            quantite,
            prix_unitaire: prix,
        }
    }

    fn livraison(bdc: &bdc::Model, statut: BdlStatus, lines: &[(usize, Decimal)]) -> bdl::Model {
        let now = Utc::now();
        bdl::Model {
            id: Uuid::new_v4(),
            numero: "BDL-2026-0001".into(),
            bdc_id: bdc.id,
            client_id: bdc.client_id,
            statut,
            lignes: LignesLivrees(
                lines
                    .iter()
                    .map(|(idx, qty)| {
                        let source = &bdc.lignes.0[*idx];
                        LigneLivree {
                            ligne_id: source.id,
                            designation: source.designation.clone(),
                            unite: source.unite.clone(),
                            quantite: *qty,
                            prix_unitaire: source.prix_unitaire,
                        }
                    })
                    .collect(),
            ),
            facture_id: None,
            date_livraison: None,
            notes: None,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn partial_then_complete_delivery() {
        let bdc = bdc_with(vec![ligne(dec!(100), dec!(10))]);
        let a = livraison(&bdc, BdlStatus::Livre, &[(0, dec!(60))]);

        let progress = compute_delivery_progress(&bdc, &[a.clone()]);
        let line = &progress.per_line[0];
        assert_eq!(line.delivered, dec!(60));
        assert_eq!(line.remaining, dec!(40));
        assert_eq!(line.pct, dec!(60));
        assert_eq!(progress.global_pct, dec!(60));
        assert!(!progress.is_complete);

        let b = livraison(&bdc, BdlStatus::Livre, &[(0, dec!(40))]);
        let progress = compute_delivery_progress(&bdc, &[a, b]);
        assert_eq!(progress.per_line[0].delivered, dec!(100));
        assert_eq!(progress.per_line[0].remaining, Decimal::ZERO);
        assert_eq!(progress.global_pct, dec!(100));
        assert!(progress.is_complete);
    }

    #[test]
    fn global_percentage_is_value_weighted() {
        let bdc = bdc_with(vec![ligne(dec!(10), dec!(900)), ligne(dec!(10), dec!(100))]);
        let note = livraison(&bdc, BdlStatus::Livre, &[(0, dec!(10))]);
        let progress = compute_delivery_progress(&bdc, &[note]);
        // line average would be 50%, value weighting gives 9000 / 10000
        assert_eq!(progress.global_pct, dec!(90));
    }

    #[test]
    fn cancelled_and_foreign_notes_are_ignored() {
        let bdc = bdc_with(vec![ligne(dec!(50), dec!(2))]);
        let other = bdc_with(vec![ligne(dec!(50), dec!(2))]);
        let cancelled = livraison(&bdc, BdlStatus::Annule, &[(0, dec!(50))]);
        let mut foreign = livraison(&other, BdlStatus::Livre, &[(0, dec!(50))]);
        foreign.lignes.0[0].ligne_id = bdc.lignes.0[0].id;

        let progress = compute_delivery_progress(&bdc, &[cancelled, foreign]);
        assert_eq!(progress.per_line[0].delivered, Decimal::ZERO);
        assert_eq!(progress.global_pct, Decimal::ZERO);
    }

    #[test]
    fn zero_ordered_line_has_zero_pct() {
        let bdc = bdc_with(vec![ligne(dec!(0), dec!(10)), ligne(dec!(5), dec!(10))]);
        let progress = compute_delivery_progress(&bdc, &[]);
        assert_eq!(progress.per_line[0].pct, Decimal::ZERO);
        assert_eq!(progress.per_line[0].remaining, Decimal::ZERO);
        assert!(!progress.is_complete);
    }

    #[test]
    fn undelivered_free_line_keeps_order_incomplete() {
        let bdc = bdc_with(vec![ligne(dec!(10), dec!(100)), ligne(dec!(3), dec!(0))]);
        let note = livraison(&bdc, BdlStatus::Livre, &[(0, dec!(10))]);
        let progress = compute_delivery_progress(&bdc, &[note]);
        assert!(!progress.is_complete);
        assert!(progress.global_pct < dec!(100));
    }

    #[test]
    fn overrun_is_rejected() {
        let bdc = bdc_with(vec![ligne(dec!(100), dec!(10))]);
        let existing = vec![livraison(&bdc, BdlStatus::EnRoute, &[(0, dec!(70))])];
        let request = livraison(&bdc, BdlStatus::Brouillon, &[(0, dec!(20)), (0, dec!(20))]);

        let err = check_delivery_quantities(&bdc, &existing, &request.lignes.0, true).unwrap_err();
        assert_matches!(
            err,
            ServiceError::QuantityOverrun { requested, remaining, .. }
                if requested == dec!(40) && remaining == dec!(30)
        );
        assert!(check_delivery_quantities(&bdc, &existing, &request.lignes.0, false).is_ok());
    }

    #[test]
    fn cancelled_delivery_releases_quantity() {
        let bdc = bdc_with(vec![ligne(dec!(100), dec!(10))]);
        let mut first = livraison(&bdc, BdlStatus::EnRoute, &[(0, dec!(100))]);
        let request = livraison(&bdc, BdlStatus::Brouillon, &[(0, dec!(30))]);
        assert!(check_delivery_quantities(
            &bdc,
            std::slice::from_ref(&first),
            &request.lignes.0,
            true
        )
        .is_err());

        first.statut = BdlStatus::Annule;
        assert!(check_delivery_quantities(&bdc, &[first], &request.lignes.0, true).is_ok());
    }

    #[test]
    fn unknown_line_and_non_positive_quantity_are_invalid() {
        let bdc = bdc_with(vec![ligne(dec!(10), dec!(1))]);
        let mut request = livraison(&bdc, BdlStatus::Brouillon, &[(0, dec!(1))]);
        request.lignes.0[0].ligne_id = Uuid::new_v4();
        assert_matches!(
            check_delivery_quantities(&bdc, &[], &request.lignes.0, true),
            Err(ServiceError::ValidationError(_))
        );

        let zero = livraison(&bdc, BdlStatus::Brouillon, &[(0, dec!(0))]);
        assert_matches!(
            check_delivery_quantities(&bdc, &[], &zero.lignes.0, true),
            Err(ServiceError::ValidationError(_))
        );
        assert_matches!(
            check_delivery_quantities(&bdc, &[], &[], true),
            Err(ServiceError::ValidationError(_))
        );
    }
}
