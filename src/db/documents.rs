//! Persistence helpers shared by every numbered, versioned document table.

use chrono::{Datelike, Utc};
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait,
    IntoActiveModel, QueryFilter, QuerySelect, SqlErr,
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::entities::{NumberedEntity, VersionedEntity};
use crate::errors::ServiceError;

pub fn format_numero(prefix: &str, year: i32, sequence: u32) -> String {
    format!("{}-{}-{:04}", prefix, year, sequence)
}

/// Sequence part of `numero` when it belongs to `prefix` and `year`.
pub fn parse_sequence(numero: &str, prefix: &str, year: i32) -> Option<u32> {
    numero
        .strip_prefix(prefix)?
        .strip_prefix('-')?
        .strip_prefix(year.to_string().as_str())?
        .strip_prefix('-')?
        .parse()
        .ok()
}

/// Next free number of the current year for entity `E`.
pub async fn next_numero<E, C>(conn: &C) -> Result<String, ServiceError>
where
    E: NumberedEntity,
    C: ConnectionTrait,
{
    let year = Utc::now().year();
    let pattern = format!("{}-{}-", E::PREFIX, year);

    let numeros: Vec<String> = E::find()
        .select_only()
        .column(E::numero_column())
        .filter(E::numero_column().starts_with(pattern.as_str()))
        .into_tuple()
        .all(conn)
        .await?;

    let last = numeros
        .iter()
        .filter_map(|n| parse_sequence(n, E::PREFIX, year))
        .max()
        .unwrap_or(0);

    Ok(format_numero(E::PREFIX, year, last + 1))
}

/// Assigns the next number to `active` and inserts it.
///
/// A concurrent insert that grabbed the same number surfaces as `Conflict`.
pub async fn insert_numbered<A, C>(
    conn: &C,
    mut active: A,
) -> Result<<A::Entity as EntityTrait>::Model, ServiceError>
where
    A: ActiveModelTrait + ActiveModelBehavior + Send,
    A::Entity: NumberedEntity,
    <A::Entity as EntityTrait>::Model: IntoActiveModel<A>,
    C: ConnectionTrait,
{
    let numero = next_numero::<A::Entity, C>(conn).await?;
    debug!(%numero, "assigning document number");
    active.set(<A::Entity as NumberedEntity>::numero_column(), numero.clone().into());

    active.insert(conn).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            warn!(%numero, "document number already taken");
            ServiceError::Conflict(format!("le numéro {} est déjà attribué", numero))
        }
        _ => ServiceError::DatabaseError(e),
    })
}

/// Writes every column of `active` only if the stored row still carries
/// `expected_version`.
///
/// The caller bumps the version inside `active`. Zero rows affected means the
/// row changed (or vanished) since it was read.
pub async fn update_versioned<A, C>(
    conn: &C,
    active: A,
    id: Uuid,
    expected_version: i32,
) -> Result<(), ServiceError>
where
    A: ActiveModelTrait + Send,
    A::Entity: VersionedEntity,
    C: ConnectionTrait,
{
    let result = A::Entity::update_many()
        .set(active.reset_all())
        .filter(<A::Entity as VersionedEntity>::id_column().eq(id))
        .filter(<A::Entity as VersionedEntity>::version_column().eq(expected_version))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        warn!(%id, expected_version, "stale version on update");
        return Err(ServiceError::ConcurrentModification(id));
    }
    Ok(())
}

/// Maps a missing row to the typed not-found error.
pub fn found<T>(row: Option<T>, kind: &str, id: Uuid) -> Result<T, ServiceError> {
    row.ok_or_else(|| ServiceError::not_found(kind, id))
}
