use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::{BdlIds, Lignes};

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum FactureStatus {
    #[sea_orm(string_value = "BROUILLON")]
    Brouillon,
    #[sea_orm(string_value = "EMISE")]
    Emise,
    #[sea_orm(string_value = "PAYEE_PARTIELLE")]
    PayeePartielle,
    #[sea_orm(string_value = "PAYEE")]
    Payee,
    #[sea_orm(string_value = "ANNULEE")]
    Annulee,
}

impl FactureStatus {
    /// Statuses whose amounts count towards client and dashboard totals.
    pub fn is_billed(self) -> bool {
        matches!(
            self,
            FactureStatus::Emise | FactureStatus::PayeePartielle | FactureStatus::Payee
        )
    }
}

/// Invoice consolidating one or more delivery notes of a single client.
///
/// `total_paye` and `solde_restant` are derived from the payments recorded
/// against the invoice and are rewritten on every payment insert or delete.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "factures")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub numero: String,
    pub client_id: Uuid,
    pub statut: FactureStatus,
    #[sea_orm(column_type = "Json")]
    pub bdl_ids: BdlIds,
    #[sea_orm(column_type = "Json")]
    pub lignes: Lignes,
    pub total: Decimal,
    pub remise: Decimal,
    pub total_net: Decimal,
    pub total_paye: Decimal,
    pub solde_restant: Decimal,
    pub motif_annulation: Option<String>,
    pub date_emission: Option<DateTime<Utc>>,
    pub date_echeance: Option<NaiveDate>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::client::Entity",
        from = "Column::ClientId",
        to = "super::client::Column::Id"
    )]
    Client,
    #[sea_orm(has_many = "super::paiement::Entity")]
    Paiements,
}

impl Related<super::client::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Client.def()
    }
}

impl Related<super::paiement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Paiements.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

super::document_entity!("FAC");
