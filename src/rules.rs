//! Which downstream document a document may spawn.
//!
//! Violations are user-facing validation messages, never panics.

use crate::entities::{
    bdc::{self, BdcStatus},
    bdl::{self, BdlStatus},
    proforma::{self, ProformaStatus},
};
use crate::errors::ServiceError;
use crate::reconciliation::compute_delivery_progress;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("la proforma {numero} doit être validée (statut actuel : {statut})")]
    ProformaNotValidated {
        numero: String,
        statut: ProformaStatus,
    },
    #[error("la proforma {0} a déjà un bon de commande")]
    BdcAlreadyLinked(String),
    #[error("le bon de commande {numero} doit être approuvé (statut actuel : {statut})")]
    BdcNotApproved { numero: String, statut: BdcStatus },
    #[error("le bon de commande {0} est entièrement livré")]
    DeliveryComplete(String),
    #[error("aucun bon de livraison sélectionné")]
    NoBdlSelected,
    #[error("les bons de livraison sélectionnés appartiennent à des clients différents")]
    MixedClients,
    #[error("le bon de livraison {numero} n'est pas livré (statut actuel : {statut})")]
    BdlNotDelivered { numero: String, statut: BdlStatus },
    #[error("le bon de livraison {0} est déjà facturé")]
    BdlAlreadyInvoiced(String),
}

impl From<GenerationError> for ServiceError {
    fn from(err: GenerationError) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

pub fn can_generate_bdc(proforma: &proforma::Model) -> Result<(), GenerationError> {
    if proforma.statut != ProformaStatus::Valide {
        return Err(GenerationError::ProformaNotValidated {
            numero: proforma.numero.clone(),
            statut: proforma.statut,
        });
    }
    if proforma.bdc_id.is_some() {
        return Err(GenerationError::BdcAlreadyLinked(proforma.numero.clone()));
    }
    Ok(())
}

/// `bdls` are the delivery notes already issued against `bdc`.
pub fn can_generate_bdl(bdc: &bdc::Model, bdls: &[bdl::Model]) -> Result<(), GenerationError> {
    if bdc.statut != BdcStatus::Approuve {
        return Err(GenerationError::BdcNotApproved {
            numero: bdc.numero.clone(),
            statut: bdc.statut,
        });
    }
    if compute_delivery_progress(bdc, bdls).is_complete {
        return Err(GenerationError::DeliveryComplete(bdc.numero.clone()));
    }
    Ok(())
}

/// Cancelling an invoice unlinks its notes, so a linked note always belongs to a
/// live invoice.
pub fn can_generate_facture(bdls: &[bdl::Model]) -> Result<(), GenerationError> {
    let first = bdls.first().ok_or(GenerationError::NoBdlSelected)?;
    if bdls.iter().any(|note| note.client_id != first.client_id) {
        return Err(GenerationError::MixedClients);
    }
    for note in bdls {
        if note.statut != BdlStatus::Livre {
            return Err(GenerationError::BdlNotDelivered {
                numero: note.numero.clone(),
                statut: note.statut,
            });
        }
        if note.facture_id.is_some() {
            return Err(GenerationError::BdlAlreadyInvoiced(note.numero.clone()));
        }
    }
    Ok(())
}

pub fn is_bdc_generable(proforma: &proforma::Model) -> bool {
    can_generate_bdc(proforma).is_ok()
}

pub fn is_bdl_generable(bdc: &bdc::Model, bdls: &[bdl::Model]) -> bool {
    can_generate_bdl(bdc, bdls).is_ok()
}

pub fn is_facture_generable(bdls: &[bdl::Model]) -> bool {
    can_generate_facture(bdls).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Ligne, LigneLivree, Lignes, LignesLivrees};
    use chrono::Utc;
    use rstest::rstest;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn proforma(statut: ProformaStatus, bdc_id: Option<Uuid>) -> proforma::Model {
        let now = Utc::now();
        proforma::Model {
            id: Uuid::new_v4(),
            numero: "PF-2026-0004".into(),
            client_id: Uuid::nil(),
            statut,
            lignes: Lignes::default(),
            total_ht: dec!(0),
            remise: dec!(0),
            total_net: dec!(0),
            bdc_id,
            notes: None,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    fn bdc(statut: BdcStatus) -> bdc::Model {
        let now = Utc::now();
        bdc::Model {
            id: Uuid::new_v4(),
            numero: "BDC-2026-0002".into(),
            client_id: Uuid::nil(),
            proforma_id: None,
            statut,
            lignes: Lignes(vec![Ligne {
                id: Uuid::new_v4(),
                designation: "Parpaing 15".into(),
                unite: "pièce".into(),
                quantite: dec!(500),
                prix_unitaire: dec!(350),
            }]),
            total_ht: dec!(175000),
            notes: None,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    fn bdl_for(order: &bdc::Model, statut: BdlStatus, quantite: rust_decimal::Decimal) -> bdl::Model {
        let now = Utc::now();
        let source = &order.lignes.0[0];
        bdl::Model {
            id: Uuid::new_v4(),
            numero: "BDL-2026-0010".into(),
            bdc_id: order.id,
            client_id: order.client_id,
            statut,
            lignes: LignesLivrees(vec![LigneLivree {
                ligne_id: source.id,
                designation: source.designation.clone(),
                unite: source.unite.clone(),
                quantite,
                prix_unitaire: source.prix_unitaire,
            }]),
            facture_id: None,
            date_livraison: None,
            notes: None,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[rstest]
    #[case(ProformaStatus::Brouillon)]
    #[case(ProformaStatus::Envoye)]
    #[case(ProformaStatus::Rejete)]
    fn bdc_requires_validated_proforma(#[case] statut: ProformaStatus) {
        assert!(matches!(
            can_generate_bdc(&proforma(statut, None)),
            Err(GenerationError::ProformaNotValidated { .. })
        ));
    }

    #[test]
    fn bdc_generated_once_per_proforma() {
        assert!(is_bdc_generable(&proforma(ProformaStatus::Valide, None)));
        assert_eq!(
            can_generate_bdc(&proforma(ProformaStatus::Valide, Some(Uuid::new_v4()))),
            Err(GenerationError::BdcAlreadyLinked("PF-2026-0004".into()))
        );
    }

    #[test]
    fn bdl_requires_approved_and_incomplete_order() {
        let draft = bdc(BdcStatus::Envoye);
        assert!(!is_bdl_generable(&draft, &[]));

        let approved = bdc(BdcStatus::Approuve);
        let partial = bdl_for(&approved, BdlStatus::Livre, dec!(200));
        assert!(is_bdl_generable(&approved, std::slice::from_ref(&partial)));

        let rest = bdl_for(&approved, BdlStatus::EnRoute, dec!(300));
        assert_eq!(
            can_generate_bdl(&approved, &[partial, rest]),
            Err(GenerationError::DeliveryComplete("BDC-2026-0002".into()))
        );
    }

    #[test]
    fn facture_requires_delivered_uninvoiced_notes_of_one_client() {
        let order = bdc(BdcStatus::Approuve);
        assert_eq!(can_generate_facture(&[]), Err(GenerationError::NoBdlSelected));

        let delivered = bdl_for(&order, BdlStatus::Livre, dec!(10));
        assert!(is_facture_generable(std::slice::from_ref(&delivered)));

        let in_transit = bdl_for(&order, BdlStatus::EnRoute, dec!(10));
        assert!(matches!(
            can_generate_facture(&[delivered.clone(), in_transit]),
            Err(GenerationError::BdlNotDelivered { .. })
        ));

        let mut other_client = bdl_for(&order, BdlStatus::Livre, dec!(10));
        other_client.client_id = Uuid::new_v4();
        assert_eq!(
            can_generate_facture(&[delivered.clone(), other_client]),
            Err(GenerationError::MixedClients)
        );

        let mut invoiced = delivered;
        invoiced.facture_id = Some(Uuid::new_v4());
        assert_eq!(
            can_generate_facture(&[invoiced]),
            Err(GenerationError::BdlAlreadyInvoiced("BDL-2026-0010".into()))
        );
    }

    #[test]
    fn generation_errors_become_validation_errors() {
        let err: ServiceError = GenerationError::NoBdlSelected.into();
        assert!(matches!(err, ServiceError::ValidationError(msg) if msg.contains("aucun")));
    }
}
