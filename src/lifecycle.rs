//! Document status registry and transition guard.
//!
//! Each document type has its own status enum; the legal moves live in one
//! exhaustive `match` per type so adding a status forces the table to be
//! revisited. The string-keyed functions serve callers that only hold raw
//! status names (HTTP payloads, the CLI).

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::entities::{
    bdc::BdcStatus, bdl::BdlStatus, facture::FactureStatus, proforma::ProformaStatus,
};
use crate::errors::ServiceError;

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DocumentType {
    Proforma,
    Bdc,
    Bdl,
    Facture,
}

pub trait Lifecycle: Copy + Eq + fmt::Display + FromStr + 'static {
    const DOCUMENT: DocumentType;

    /// Statuses reachable in one step from `self`.
    fn next_statuses(self) -> &'static [Self];

    fn is_terminal(self) -> bool {
        self.next_statuses().is_empty()
    }

    fn can_transition_to(self, to: Self) -> bool {
        self.next_statuses().contains(&to)
    }
}

impl Lifecycle for ProformaStatus {
    const DOCUMENT: DocumentType = DocumentType::Proforma;

    fn next_statuses(self) -> &'static [Self] {
        use ProformaStatus::*;
        match self {
            Brouillon => &[Envoye],
            Envoye => &[Valide, Rejete],
            Valide | Rejete => &[],
        }
    }
}

impl Lifecycle for BdcStatus {
    const DOCUMENT: DocumentType = DocumentType::Bdc;

    fn next_statuses(self) -> &'static [Self] {
        use BdcStatus::*;
        match self {
            Brouillon => &[Envoye, Annule],
            Envoye => &[Approuve, Annule],
            Approuve => &[Annule],
            Annule => &[],
        }
    }
}

impl Lifecycle for BdlStatus {
    const DOCUMENT: DocumentType = DocumentType::Bdl;

    fn next_statuses(self) -> &'static [Self] {
        use BdlStatus::*;
        match self {
            Brouillon => &[EnRoute, Annule],
            EnRoute => &[Livre, Annule],
            Livre | Annule => &[],
        }
    }
}

impl Lifecycle for FactureStatus {
    const DOCUMENT: DocumentType = DocumentType::Facture;

    fn next_statuses(self) -> &'static [Self] {
        use FactureStatus::*;
        match self {
            Brouillon => &[Emise, Annulee],
            Emise => &[PayeePartielle, Payee, Annulee],
            PayeePartielle => &[Payee, Annulee],
            Payee | Annulee => &[],
        }
    }
}

/// Rejects any move that is not in the transition table, self-transitions included.
pub fn ensure_transition<S: Lifecycle>(from: S, to: S) -> Result<(), ServiceError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(ServiceError::InvalidTransition {
            document: S::DOCUMENT,
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

/// Parses a raw status name for the given document type.
pub fn parse_status<S: Lifecycle>(raw: &str) -> Result<S, ServiceError> {
    raw.trim().parse::<S>().map_err(|_| {
        ServiceError::ValidationError(format!("statut inconnu pour {} : {}", S::DOCUMENT, raw))
    })
}

fn names<S: Lifecycle>(current: &str) -> BTreeSet<String> {
    current
        .parse::<S>()
        .map(|status| {
            status
                .next_statuses()
                .iter()
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Legal next statuses of `current`; empty for terminal or unknown statuses.
pub fn next_statuses(doc_type: DocumentType, current: &str) -> BTreeSet<String> {
    match doc_type {
        DocumentType::Proforma => names::<ProformaStatus>(current),
        DocumentType::Bdc => names::<BdcStatus>(current),
        DocumentType::Bdl => names::<BdlStatus>(current),
        DocumentType::Facture => names::<FactureStatus>(current),
    }
}

pub fn can_transition(doc_type: DocumentType, from: &str, to: &str) -> bool {
    next_statuses(doc_type, from).contains(to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use sea_orm::Iterable;

    fn check_table<S: Lifecycle + sea_orm::Iterable>() {
        for from in S::iter() {
            for to in S::iter() {
                let expected = from.next_statuses().contains(&to);
                assert_eq!(
                    can_transition(S::DOCUMENT, &from.to_string(), &to.to_string()),
                    expected,
                    "{} {} -> {}",
                    S::DOCUMENT,
                    from,
                    to
                );
                assert_eq!(ensure_transition(from, to).is_ok(), expected);
            }
            assert!(!from.can_transition_to(from), "{} self transition", from);
        }
    }

    #[test]
    fn string_api_matches_typed_tables() {
        check_table::<ProformaStatus>();
        check_table::<BdcStatus>();
        check_table::<BdlStatus>();
        check_table::<FactureStatus>();
    }

    #[test]
    fn bdc_cannot_skip_to_approved() {
        assert!(!BdcStatus::Brouillon.can_transition_to(BdcStatus::Approuve));
        assert_matches!(
            ensure_transition(BdcStatus::Brouillon, BdcStatus::Approuve),
            Err(ServiceError::InvalidTransition { document: DocumentType::Bdc, .. })
        );
    }

    #[test]
    fn terminal_statuses_have_no_successor() {
        assert!(ProformaStatus::Valide.is_terminal());
        assert!(ProformaStatus::Rejete.is_terminal());
        assert!(BdcStatus::Annule.is_terminal());
        assert!(BdlStatus::Livre.is_terminal());
        assert!(BdlStatus::Annule.is_terminal());
        assert!(FactureStatus::Payee.is_terminal());
        assert!(FactureStatus::Annulee.is_terminal());
        assert!(!FactureStatus::PayeePartielle.is_terminal());
    }

    #[test]
    fn next_statuses_by_name() {
        let next = next_statuses(DocumentType::Facture, "EMISE");
        let expected: BTreeSet<String> = ["ANNULEE", "PAYEE", "PAYEE_PARTIELLE"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(next, expected);
        assert!(next_statuses(DocumentType::Bdl, "LIVRE").is_empty());
        assert!(next_statuses(DocumentType::Bdl, "PERDU").is_empty());
        assert!(!can_transition(DocumentType::Bdl, "PERDU", "LIVRE"));
    }

    #[test]
    fn document_type_parses_case_insensitively() {
        assert_eq!("Facture".parse::<DocumentType>().ok(), Some(DocumentType::Facture));
        assert_eq!(DocumentType::Bdl.to_string(), "bdl");
    }

    #[test]
    fn parse_status_rejects_unknown_names() {
        assert_eq!(parse_status::<BdlStatus>(" EN_ROUTE ").unwrap(), BdlStatus::EnRoute);
        assert_matches!(
            parse_status::<BdlStatus>("en route"),
            Err(ServiceError::ValidationError(_))
        );
    }
}
