use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::lifecycle::DocumentType;

/// Kind of record an event is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RecordKind {
    Client,
    Proforma,
    Bdc,
    Bdl,
    Facture,
    Paiement,
    Depense,
}

impl From<DocumentType> for RecordKind {
    fn from(doc: DocumentType) -> Self {
        match doc {
            DocumentType::Proforma => RecordKind::Proforma,
            DocumentType::Bdc => RecordKind::Bdc,
            DocumentType::Bdl => RecordKind::Bdl,
            DocumentType::Facture => RecordKind::Facture,
        }
    }
}

/// Domain events published after a write commits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    DocumentCreated {
        kind: RecordKind,
        id: Uuid,
        numero: Option<String>,
    },
    DocumentDeleted {
        kind: RecordKind,
        id: Uuid,
    },
    StatusChanged {
        document: DocumentType,
        id: Uuid,
        from: String,
        to: String,
        at: DateTime<Utc>,
    },
    PaiementRecorded {
        paiement_id: Uuid,
        facture_id: Uuid,
        montant: Decimal,
        solde_restant: Decimal,
    },
    PaiementDeleted {
        paiement_id: Uuid,
        facture_id: Uuid,
        solde_restant: Decimal,
    },
    ClientTotalsRecalculated {
        client_id: Uuid,
        total_du: Decimal,
    },
}

impl Event {
    pub fn status_changed(
        document: DocumentType,
        id: Uuid,
        from: impl ToString,
        to: impl ToString,
    ) -> Self {
        Event::StatusChanged {
            document,
            id,
            from: from.to_string(),
            to: to.to_string(),
            at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Bounded channel pair sized from configuration.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    /// Sends without waiting; the write that produced the event has already
    /// committed, so a full or closed channel is only logged.
    pub fn send_or_log(&self, event: Event) {
        if let Err(e) = self.sender.try_send(event) {
            warn!("Dropping event: {}", e);
        }
    }
}

/// Drains the event channel, logging every event.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::StatusChanged {
                document,
                id,
                from,
                to,
                ..
            } => info!(%document, %id, %from, %to, "status changed"),
            Event::PaiementRecorded {
                facture_id,
                montant,
                solde_restant,
                ..
            } => info!(%facture_id, %montant, %solde_restant, "payment recorded"),
            Event::ClientTotalsRecalculated { client_id, total_du } => {
                info!(%client_id, %total_du, "client totals recalculated")
            }
            other => info!("Received event: {:?}", other),
        }
    }

    info!("Event channel closed; stopping event processing loop");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_reach_the_receiver_in_order() {
        let (sender, mut rx) = EventSender::channel(4);
        let id = Uuid::new_v4();
        sender.send_or_log(Event::DocumentCreated {
            kind: RecordKind::Bdl,
            id,
            numero: Some("BDL-2026-0001".into()),
        });
        sender.send_or_log(Event::status_changed(
            DocumentType::Bdl,
            id,
            "BROUILLON",
            "EN_ROUTE",
        ));

        assert!(matches!(
            rx.recv().await,
            Some(Event::DocumentCreated { kind: RecordKind::Bdl, .. })
        ));
        match rx.recv().await {
            Some(Event::StatusChanged { from, to, .. }) => {
                assert_eq!(from, "BROUILLON");
                assert_eq!(to, "EN_ROUTE");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn full_channel_does_not_block_or_fail() {
        let (sender, _rx) = EventSender::channel(1);
        let kind = RecordKind::from(DocumentType::Facture);
        sender.send_or_log(Event::DocumentDeleted { kind, id: Uuid::nil() });
        sender.send_or_log(Event::DocumentDeleted { kind, id: Uuid::nil() });
    }

    #[tokio::test]
    async fn closed_channel_is_only_logged() {
        let (sender, rx) = EventSender::channel(1);
        drop(rx);
        sender.send_or_log(Event::ClientTotalsRecalculated {
            client_id: Uuid::nil(),
            total_du: Decimal::ZERO,
        });
    }
}
