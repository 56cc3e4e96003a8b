use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

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
pub enum ModePaiement {
    #[sea_orm(string_value = "ESPECES")]
    Especes,
    #[sea_orm(string_value = "VIREMENT")]
    Virement,
    #[sea_orm(string_value = "CHEQUE")]
    Cheque,
    #[sea_orm(string_value = "MOBILE_MONEY")]
    MobileMoney,
}

/// Payment applied against one invoice. Rows are never updated; an erroneous
/// payment is deleted and recorded again.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "paiements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub numero: String,
    pub facture_id: Uuid,
    pub client_id: Uuid,
    pub montant: Decimal,
    pub mode: ModePaiement,
    pub reference: Option<String>,
    pub date_paiement: NaiveDate,
    pub version: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::facture::Entity",
        from = "Column::FactureId",
        to = "super::facture::Column::Id"
    )]
    Facture,
}

impl Related<super::facture::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Facture.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

super::document_entity!("PAY");
