use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::LignesLivrees;

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
pub enum BdlStatus {
    #[sea_orm(string_value = "BROUILLON")]
    Brouillon,
    #[sea_orm(string_value = "EN_ROUTE")]
    EnRoute,
    #[sea_orm(string_value = "LIVRE")]
    Livre,
    #[sea_orm(string_value = "ANNULE")]
    Annule,
}

/// Delivery note (bon de livraison) recording goods shipped against one purchase order.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bdls")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub numero: String,
    pub bdc_id: Uuid,
    pub client_id: Uuid,
    pub statut: BdlStatus,
    #[sea_orm(column_type = "Json")]
    pub lignes: LignesLivrees,
    pub facture_id: Option<Uuid>,
    pub date_livraison: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    /// Cancelled notes no longer consume ordered quantities.
    pub fn is_active(&self) -> bool {
        self.statut != BdlStatus::Annule
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::bdc::Entity",
        from = "Column::BdcId",
        to = "super::bdc::Column::Id"
    )]
    Bdc,
}

impl Related<super::bdc::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bdc.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

super::document_entity!("BDL");
