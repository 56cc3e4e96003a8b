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
pub enum ProformaStatus {
    #[sea_orm(string_value = "BROUILLON")]
    Brouillon,
    #[sea_orm(string_value = "ENVOYE")]
    Envoye,
    #[sea_orm(string_value = "VALIDE")]
    Valide,
    #[sea_orm(string_value = "REJETE")]
    Rejete,
}

/// Quotation sent to a client; once validated it spawns a purchase order.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "proformas")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub numero: String,
    pub client_id: Uuid,
    pub statut: ProformaStatus,
    #[sea_orm(column_type = "Json")]
    pub lignes: Lignes,
    pub total_ht: Decimal,
    pub remise: Decimal,
    pub total_net: Decimal,
    pub bdc_id: Option<Uuid>,
    pub notes: Option<String>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

super::document_entity!("PF");
