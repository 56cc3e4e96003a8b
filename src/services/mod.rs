//! Business services. Each owns a handle on the pool and the event sender and
//! runs every multi-row write inside one transaction.

pub mod bdcs;
pub mod bdls;
pub mod clients;
pub mod dashboard;
pub mod depenses;
pub mod factures;
pub mod paiements;
pub mod proformas;

use rust_decimal::Decimal;
use sea_orm::{EntityTrait, PaginatorTrait, Select};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::db::DbPool;
use crate::entities::{Ligne, Lignes};
use crate::errors::ServiceError;

/// One page of a listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PageRequest {
    pub page: u64,
    pub per_page: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 20,
        }
    }
}

impl PageRequest {
    pub fn new(page: u64, per_page: u64) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }
}

pub(crate) async fn paginate<E>(
    select: Select<E>,
    db: &DbPool,
    request: PageRequest,
) -> Result<Page<E::Model>, ServiceError>
where
    E: EntityTrait,
    E::Model: Send + Sync,
{
    let request = PageRequest::new(request.page, request.per_page);
    let paginator = select.paginate(db, request.per_page);
    let total = paginator.num_items().await?;
    let items = paginator.fetch_page(request.page - 1).await?;

    Ok(Page {
        items,
        total,
        page: request.page,
        per_page: request.per_page,
    })
}

/// Line item as submitted by callers; ids are assigned server side.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LigneInput {
    #[validate(length(min = 1, max = 255, message = "La désignation est requise"))]
    pub designation: String,
    #[validate(length(min = 1, max = 32, message = "L'unité est requise"))]
    pub unite: String,
    pub quantite: Decimal,
    pub prix_unitaire: Decimal,
}

/// Validates submitted lines and assigns their ids.
pub(crate) fn build_lignes(inputs: Vec<LigneInput>) -> Result<Lignes, ServiceError> {
    if inputs.is_empty() {
        return Err(ServiceError::ValidationError(
            "le document doit contenir au moins une ligne".to_string(),
        ));
    }

    let mut lignes = Vec::with_capacity(inputs.len());
    for input in inputs {
        input.validate()?;
        if input.designation.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "la désignation ne peut pas être vide".to_string(),
            ));
        }
        ensure_positive("quantite", input.quantite)?;
        ensure_not_negative("prix_unitaire", input.prix_unitaire)?;
        lignes.push(Ligne {
            id: Uuid::new_v4(),
            designation: input.designation.trim().to_string(),
            unite: input.unite.trim().to_string(),
            quantite: input.quantite,
            prix_unitaire: input.prix_unitaire,
        });
    }
    Ok(Lignes(lignes))
}

pub(crate) fn ensure_positive(field: &str, value: Decimal) -> Result<(), ServiceError> {
    if value <= Decimal::ZERO {
        return Err(ServiceError::ValidationError(format!(
            "{} doit être strictement positif (reçu {})",
            field, value
        )));
    }
    Ok(())
}

pub(crate) fn ensure_not_negative(field: &str, value: Decimal) -> Result<(), ServiceError> {
    if value < Decimal::ZERO {
        return Err(ServiceError::ValidationError(format!(
            "{} ne peut pas être négatif (reçu {})",
            field, value
        )));
    }
    Ok(())
}

/// Checks `remise` against the gross total and returns the net total.
pub(crate) fn apply_remise(total: Decimal, remise: Decimal) -> Result<Decimal, ServiceError> {
    ensure_not_negative("remise", remise)?;
    if remise > total {
        return Err(ServiceError::ValidationError(format!(
            "la remise ({}) dépasse le total ({})",
            remise, total
        )));
    }
    Ok(total - remise)
}

/// Rejects an update carrying a stale version token.
pub(crate) fn check_expected_version(
    id: Uuid,
    current: i32,
    expected: Option<i32>,
) -> Result<(), ServiceError> {
    match expected {
        Some(expected) if expected != current => Err(ServiceError::ConcurrentModification(id)),
        _ => Ok(()),
    }
}
