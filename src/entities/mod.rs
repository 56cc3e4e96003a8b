use sea_orm::EntityTrait;

pub mod bdc;
pub mod bdl;
pub mod client;
pub mod depense;
pub mod facture;
pub mod ligne;
pub mod paiement;
pub mod proforma;

pub use ligne::{BdlIds, Ligne, LigneLivree, Lignes, LignesLivrees};

/// Entities whose rows carry an optimistic concurrency token.
pub trait VersionedEntity: EntityTrait {
    fn id_column() -> Self::Column;
    fn version_column() -> Self::Column;
}

/// Entities carrying a human readable `PREFIX-YEAR-SEQ` number.
pub trait NumberedEntity: EntityTrait {
    const PREFIX: &'static str;

    fn numero_column() -> Self::Column;
}

macro_rules! document_entity {
    ($prefix:literal) => {
        impl $crate::entities::VersionedEntity for Entity {
            fn id_column() -> Column {
                Column::Id
            }

            fn version_column() -> Column {
                Column::Version
            }
        }

        impl $crate::entities::NumberedEntity for Entity {
            const PREFIX: &'static str = $prefix;

            fn numero_column() -> Column {
                Column::Numero
            }
        }
    };
}

pub(crate) use document_entity;
