use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveValue::NotSet, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use super::{check_expected_version, ensure_positive, paginate, Page, PageRequest};
use crate::{
    db::{documents::found, insert_numbered, update_versioned, DbPool},
    entities::depense,
    errors::ServiceError,
    events::{Event, EventSender, RecordKind},
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateDepenseRequest {
    #[validate(length(min = 1, max = 255, message = "Le libellé est requis"))]
    pub libelle: String,
    #[validate(length(min = 1, max = 64, message = "La catégorie est requise"))]
    pub categorie: String,
    pub montant: Decimal,
    pub date_depense: NaiveDate,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateDepenseRequest {
    #[validate(length(min = 1, max = 255))]
    pub libelle: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub categorie: Option<String>,
    pub montant: Option<Decimal>,
    pub date_depense: Option<NaiveDate>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    pub version: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DepenseFilter {
    pub categorie: Option<String>,
    /// Inclusive lower bound on `date_depense`
    pub du: Option<NaiveDate>,
    /// Inclusive upper bound on `date_depense`
    pub au: Option<NaiveDate>,
}

#[derive(Clone)]
pub struct DepenseService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl DepenseService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self, request), fields(categorie = %request.categorie))]
    pub async fn create(&self, request: CreateDepenseRequest) -> Result<depense::Model, ServiceError> {
        request.validate()?;
        ensure_positive("montant", request.montant)?;

        let now = Utc::now();
        let model = insert_numbered(
            &*self.db_pool,
            depense::ActiveModel {
                id: Set(Uuid::new_v4()),
                numero: NotSet,
                libelle: Set(request.libelle.trim().to_string()),
                categorie: Set(request.categorie.trim().to_lowercase()),
                montant: Set(request.montant),
                date_depense: Set(request.date_depense),
                notes: Set(request.notes),
                version: Set(1),
                created_at: Set(now),
                updated_at: Set(now),
            },
        )
        .await?;

        info!(depense_id = %model.id, numero = %model.numero, "Expense recorded");
        self.event_sender.send_or_log(Event::DocumentCreated {
            kind: RecordKind::Depense,
            id: model.id,
            numero: Some(model.numero.clone()),
        });
        Ok(model)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, depense_id: Uuid) -> Result<depense::Model, ServiceError> {
        let row = depense::Entity::find_by_id(depense_id)
            .one(&*self.db_pool)
            .await?;
        found(row, "Dépense", depense_id)
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: DepenseFilter,
        page: PageRequest,
    ) -> Result<Page<depense::Model>, ServiceError> {
        let mut select = depense::Entity::find().order_by_desc(depense::Column::DateDepense);
        if let Some(categorie) = filter.categorie.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            select = select.filter(depense::Column::Categorie.eq(categorie.to_lowercase()));
        }
        if let Some(du) = filter.du {
            select = select.filter(depense::Column::DateDepense.gte(du));
        }
        if let Some(au) = filter.au {
            select = select.filter(depense::Column::DateDepense.lte(au));
        }
        paginate(select, &self.db_pool, page).await
    }

    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        depense_id: Uuid,
        request: UpdateDepenseRequest,
    ) -> Result<depense::Model, ServiceError> {
        request.validate()?;
        let current = self.get(depense_id).await?;
        check_expected_version(depense_id, current.version, request.version)?;

        let mut updated = current.clone();
        if let Some(libelle) = request.libelle {
            updated.libelle = libelle.trim().to_string();
        }
        if let Some(categorie) = request.categorie {
            updated.categorie = categorie.trim().to_lowercase();
        }
        if let Some(montant) = request.montant {
            ensure_positive("montant", montant)?;
            updated.montant = montant;
        }
        if let Some(date_depense) = request.date_depense {
            updated.date_depense = date_depense;
        }
        if request.notes.is_some() {
            updated.notes = request.notes;
        }
        updated.version = current.version + 1;
        updated.updated_at = Utc::now();

        update_versioned(
            &*self.db_pool,
            depense::ActiveModel::from(updated.clone()),
            depense_id,
            current.version,
        )
        .await?;
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, depense_id: Uuid) -> Result<(), ServiceError> {
        let result = depense::Entity::delete_by_id(depense_id)
            .exec(&*self.db_pool)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::not_found("Dépense", depense_id));
        }
        self.event_sender.send_or_log(Event::DocumentDeleted {
            kind: RecordKind::Depense,
            id: depense_id,
        });
        Ok(())
    }
}
