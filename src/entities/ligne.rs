use rust_decimal::Decimal;
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ordered or quoted line item, stored inside the owning document as JSON.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ligne {
    pub id: Uuid,
    pub designation: String,
    pub unite: String,
    pub quantite: Decimal,
    pub prix_unitaire: Decimal,
}

impl Ligne {
    pub fn montant(&self) -> Decimal {
        self.quantite * self.prix_unitaire
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct Lignes(pub Vec<Ligne>);

impl Lignes {
    pub fn total(&self) -> Decimal {
        self.0.iter().map(Ligne::montant).sum()
    }

    pub fn find(&self, ligne_id: Uuid) -> Option<&Ligne> {
        self.0.iter().find(|ligne| ligne.id == ligne_id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Ligne> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Delivered line of a delivery note. `ligne_id` points at the purchase order line
/// being delivered; the unit price is copied from that line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LigneLivree {
    pub ligne_id: Uuid,
    pub designation: String,
    pub unite: String,
    pub quantite: Decimal,
    pub prix_unitaire: Decimal,
}

impl LigneLivree {
    pub fn montant(&self) -> Decimal {
        self.quantite * self.prix_unitaire
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct LignesLivrees(pub Vec<LigneLivree>);

impl LignesLivrees {
    pub fn total(&self) -> Decimal {
        self.0.iter().map(LigneLivree::montant).sum()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LigneLivree> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Delivery notes consolidated by an invoice.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct BdlIds(pub Vec<Uuid>);
