use std::collections::BTreeSet;

use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::config::AppConfig;
use crate::errors::ServiceError;
use crate::lifecycle::{next_statuses, parse_status, DocumentType, Lifecycle};
use crate::services::{Page, PageRequest};
use crate::ApiResponse;

pub type Created<T> = (StatusCode, Json<ApiResponse<T>>);

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse::success(data))
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Created<T> {
    (StatusCode::CREATED, Json(ApiResponse::success(data)))
}

/// Validate request input
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ServiceError> {
    input.validate().map_err(ServiceError::from)
}

/// Pagination parameters for list operations
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct PaginationParams {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl PaginationParams {
    /// Page request clamped to the configured page sizes
    pub fn to_request(&self, config: &AppConfig) -> PageRequest {
        PageRequest::new(self.page.unwrap_or(1), config.page_size(self.per_page))
    }
}

/// Standard pagination response metadata
#[derive(Debug, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
    pub total_pages: u64,
}

impl PaginationMeta {
    pub fn new(page: u64, per_page: u64, total: u64) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            (total + per_page - 1) / per_page
        };
        Self {
            page,
            per_page,
            total,
            total_pages,
        }
    }
}

/// Standard paginated response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

impl<T> From<Page<T>> for PaginatedResponse<T> {
    fn from(page: Page<T>) -> Self {
        Self {
            pagination: PaginationMeta::new(page.page, page.per_page, page.total),
            data: page.items,
        }
    }
}

/// Body of `POST /:id/status`
#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct StatusChangeRequest {
    #[validate(length(min = 1, message = "Le statut est requis"))]
    pub statut: String,
    #[validate(length(max = 2000))]
    pub motif: Option<String>,
}

impl StatusChangeRequest {
    pub fn target<S: Lifecycle>(&self) -> Result<S, ServiceError> {
        validate_input(self)?;
        parse_status::<S>(&self.statut)
    }
}

/// Reply of `GET /:id/next-statuses`
#[derive(Debug, Serialize, Deserialize)]
pub struct NextStatusesResponse {
    pub document: DocumentType,
    pub statut: String,
    pub next: BTreeSet<String>,
    /// Whether the downstream document can be generated now, where one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_generate: Option<bool>,
}

impl NextStatusesResponse {
    pub fn new<S: Lifecycle>(statut: S, can_generate: Option<bool>) -> Self {
        let statut = statut.to_string();
        Self {
            document: S::DOCUMENT,
            next: next_statuses(S::DOCUMENT, &statut),
            statut,
            can_generate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::bdl::BdlStatus;
    use assert_matches::assert_matches;

    #[test]
    fn pagination_meta_rounds_up() {
        assert_eq!(PaginationMeta::new(1, 20, 41).total_pages, 3);
        assert_eq!(PaginationMeta::new(1, 20, 0).total_pages, 0);
    }

    #[test]
    fn status_request_parses_target() {
        let request = StatusChangeRequest {
            statut: "EN_ROUTE".into(),
            motif: None,
        };
        assert_eq!(request.target::<BdlStatus>().unwrap(), BdlStatus::EnRoute);

        let empty = StatusChangeRequest {
            statut: String::new(),
            motif: None,
        };
        assert_matches!(empty.target::<BdlStatus>(), Err(ServiceError::ValidationError(_)));
    }

    #[test]
    fn next_statuses_response_lists_successors() {
        let reply = NextStatusesResponse::new(BdlStatus::Brouillon, None);
        assert_eq!(reply.document, DocumentType::Bdl);
        assert!(reply.next.contains("EN_ROUTE"));
        assert!(reply.next.contains("ANNULE"));
    }
}
