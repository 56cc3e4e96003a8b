use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::Lignes;

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
pub enum BdcStatus {
    #[sea_orm(string_value = "BROUILLON")]
    Brouillon,
    #[sea_orm(string_value = "ENVOYE")]
    Envoye,
    #[sea_orm(string_value = "APPROUVE")]
    Approuve,
    #[sea_orm(string_value = "ANNULE")]
    Annule,
}

/// Purchase order (bon de commande). Delivered quantities are never stored here;
/// they are derived from the delivery notes referencing it.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bdcs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub numero: String,
    pub client_id: Uuid,
    pub proforma_id: Option<Uuid>,
    pub statut: BdcStatus,
    #[sea_orm(column_type = "Json")]
    pub lignes: Lignes,
    pub total_ht: Decimal,
    pub notes: Option<String>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::bdl::Entity")]
    Bdls,
}

impl Related<super::bdl::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bdls.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

super::document_entity!("BDC");
