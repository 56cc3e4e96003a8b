use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260101_000001_create_clients_table::Migration),
            Box::new(m20260101_000002_create_sales_documents_tables::Migration),
            Box::new(m20260101_000003_create_paiements_depenses_tables::Migration),
        ]
    }
}

fn money(col: impl IntoIden) -> ColumnDef {
    ColumnDef::new(col)
        .decimal_len(16, 2)
        .not_null()
        .default(0)
        .to_owned()
}

fn version(col: impl IntoIden) -> ColumnDef {
    ColumnDef::new(col).integer().not_null().default(1).to_owned()
}

fn timestamp(col: impl IntoIden) -> ColumnDef {
    ColumnDef::new(col)
        .timestamp_with_time_zone()
        .not_null()
        .to_owned()
}

async fn index(
    manager: &SchemaManager<'_>,
    name: &str,
    table: impl IntoIden + 'static,
    col: impl IntoIden + 'static,
    unique: bool,
) -> Result<(), DbErr> {
    let mut stmt = Index::create();
    stmt.if_not_exists().name(name).table(table).col(col);
    if unique {
        stmt.unique();
    }
    manager.create_index(stmt.to_owned()).await
}

mod m20260101_000001_create_clients_table {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000001_create_clients_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Clients::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Clients::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Clients::Nom).string().not_null())
                        .col(ColumnDef::new(Clients::Email).string().null())
                        .col(ColumnDef::new(Clients::Telephone).string().null())
                        .col(ColumnDef::new(Clients::Adresse).string().null())
                        .col(&mut money(Clients::TotalLivre))
                        .col(&mut money(Clients::TotalFacture))
                        .col(&mut money(Clients::TotalPaye))
                        .col(&mut money(Clients::TotalDu))
                        .col(&mut version(Clients::Version))
                        .col(&mut timestamp(Clients::CreatedAt))
                        .col(&mut timestamp(Clients::UpdatedAt))
                        .to_owned(),
                )
                .await?;

            index(manager, "idx_clients_nom", Clients::Table, Clients::Nom, false).await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Clients::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Clients {
        Table,
        Id,
        Nom,
        Email,
        Telephone,
        Adresse,
        TotalLivre,
        TotalFacture,
        TotalPaye,
        TotalDu,
        Version,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20260101_000002_create_sales_documents_tables {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000002_create_sales_documents_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Proformas::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Proformas::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Proformas::Numero).string().not_null())
                        .col(ColumnDef::new(Proformas::ClientId).uuid().not_null())
                        .col(ColumnDef::new(Proformas::Statut).string_len(32).not_null())
                        .col(ColumnDef::new(Proformas::Lignes).json().not_null())
                        .col(&mut money(Proformas::TotalHt))
                        .col(&mut money(Proformas::Remise))
                        .col(&mut money(Proformas::TotalNet))
                        .col(ColumnDef::new(Proformas::BdcId).uuid().null())
                        .col(ColumnDef::new(Proformas::Notes).text().null())
                        .col(&mut version(Proformas::Version))
                        .col(&mut timestamp(Proformas::CreatedAt))
                        .col(&mut timestamp(Proformas::UpdatedAt))
                        .to_owned(),
                )
                .await?;
            index(manager, "idx_proformas_numero", Proformas::Table, Proformas::Numero, true)
                .await?;
            index(manager, "idx_proformas_client_id", Proformas::Table, Proformas::ClientId, false)
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Bdcs::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Bdcs::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Bdcs::Numero).string().not_null())
                        .col(ColumnDef::new(Bdcs::ClientId).uuid().not_null())
                        .col(ColumnDef::new(Bdcs::ProformaId).uuid().null())
                        .col(ColumnDef::new(Bdcs::Statut).string_len(32).not_null())
                        .col(ColumnDef::new(Bdcs::Lignes).json().not_null())
                        .col(&mut money(Bdcs::TotalHt))
                        .col(ColumnDef::new(Bdcs::Notes).text().null())
                        .col(&mut version(Bdcs::Version))
                        .col(&mut timestamp(Bdcs::CreatedAt))
                        .col(&mut timestamp(Bdcs::UpdatedAt))
                        .to_owned(),
                )
                .await?;
            index(manager, "idx_bdcs_numero", Bdcs::Table, Bdcs::Numero, true).await?;
            index(manager, "idx_bdcs_client_id", Bdcs::Table, Bdcs::ClientId, false).await?;

            manager
                .create_table(
                    Table::create()
                        .table(Bdls::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Bdls::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Bdls::Numero).string().not_null())
                        .col(ColumnDef::new(Bdls::BdcId).uuid().not_null())
                        .col(ColumnDef::new(Bdls::ClientId).uuid().not_null())
                        .col(ColumnDef::new(Bdls::Statut).string_len(32).not_null())
                        .col(ColumnDef::new(Bdls::Lignes).json().not_null())
                        .col(ColumnDef::new(Bdls::FactureId).uuid().null())
                        .col(
                            ColumnDef::new(Bdls::DateLivraison)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Bdls::Notes).text().null())
                        .col(&mut version(Bdls::Version))
                        .col(&mut timestamp(Bdls::CreatedAt))
                        .col(&mut timestamp(Bdls::UpdatedAt))
                        .to_owned(),
                )
                .await?;
            index(manager, "idx_bdls_numero", Bdls::Table, Bdls::Numero, true).await?;
            index(manager, "idx_bdls_bdc_id", Bdls::Table, Bdls::BdcId, false).await?;
            index(manager, "idx_bdls_client_id", Bdls::Table, Bdls::ClientId, false).await?;

            manager
                .create_table(
                    Table::create()
                        .table(Factures::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Factures::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Factures::Numero).string().not_null())
                        .col(ColumnDef::new(Factures::ClientId).uuid().not_null())
                        .col(ColumnDef::new(Factures::Statut).string_len(32).not_null())
                        .col(ColumnDef::new(Factures::BdlIds).json().not_null())
                        .col(ColumnDef::new(Factures::Lignes).json().not_null())
                        .col(&mut money(Factures::Total))
                        .col(&mut money(Factures::Remise))
                        .col(&mut money(Factures::TotalNet))
                        .col(&mut money(Factures::TotalPaye))
                        .col(&mut money(Factures::SoldeRestant))
                        .col(ColumnDef::new(Factures::MotifAnnulation).text().null())
                        .col(
                            ColumnDef::new(Factures::DateEmission)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Factures::DateEcheance).date().null())
                        .col(&mut version(Factures::Version))
                        .col(&mut timestamp(Factures::CreatedAt))
                        .col(&mut timestamp(Factures::UpdatedAt))
                        .to_owned(),
                )
                .await?;
            index(manager, "idx_factures_numero", Factures::Table, Factures::Numero, true).await?;
            index(manager, "idx_factures_client_id", Factures::Table, Factures::ClientId, false)
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Factures::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Bdls::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Bdcs::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Proformas::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Proformas {
        Table,
        Id,
        Numero,
        ClientId,
        Statut,
        Lignes,
        TotalHt,
        Remise,
        TotalNet,
        BdcId,
        Notes,
        Version,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Bdcs {
        Table,
        Id,
        Numero,
        ClientId,
        ProformaId,
        Statut,
        Lignes,
        TotalHt,
        Notes,
        Version,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Bdls {
        Table,
        Id,
        Numero,
        BdcId,
        ClientId,
        Statut,
        Lignes,
        FactureId,
        DateLivraison,
        Notes,
        Version,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Factures {
        Table,
        Id,
        Numero,
        ClientId,
        Statut,
        BdlIds,
        Lignes,
        Total,
        Remise,
        TotalNet,
        TotalPaye,
        SoldeRestant,
        MotifAnnulation,
        DateEmission,
        DateEcheance,
        Version,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20260101_000003_create_paiements_depenses_tables {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000003_create_paiements_depenses_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Paiements::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Paiements::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Paiements::Numero).string().not_null())
                        .col(ColumnDef::new(Paiements::FactureId).uuid().not_null())
                        .col(ColumnDef::new(Paiements::ClientId).uuid().not_null())
                        .col(&mut money(Paiements::Montant))
                        .col(ColumnDef::new(Paiements::Mode).string_len(32).not_null())
                        .col(ColumnDef::new(Paiements::Reference).string().null())
                        .col(ColumnDef::new(Paiements::DatePaiement).date().not_null())
                        .col(&mut version(Paiements::Version))
                        .col(&mut timestamp(Paiements::CreatedAt))
                        .to_owned(),
                )
                .await?;
            index(manager, "idx_paiements_numero", Paiements::Table, Paiements::Numero, true)
                .await?;
            index(
                manager,
                "idx_paiements_facture_id",
                Paiements::Table,
                Paiements::FactureId,
                false,
            )
            .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Depenses::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Depenses::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Depenses::Numero).string().not_null())
                        .col(ColumnDef::new(Depenses::Libelle).string().not_null())
                        .col(ColumnDef::new(Depenses::Categorie).string().not_null())
                        .col(&mut money(Depenses::Montant))
                        .col(ColumnDef::new(Depenses::DateDepense).date().not_null())
                        .col(ColumnDef::new(Depenses::Notes).text().null())
                        .col(&mut version(Depenses::Version))
                        .col(&mut timestamp(Depenses::CreatedAt))
                        .col(&mut timestamp(Depenses::UpdatedAt))
                        .to_owned(),
                )
                .await?;
            index(manager, "idx_depenses_numero", Depenses::Table, Depenses::Numero, true).await?;
            index(
                manager,
                "idx_depenses_categorie",
                Depenses::Table,
                Depenses::Categorie,
                false,
            )
            .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Depenses::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Paiements::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Paiements {
        Table,
        Id,
        Numero,
        FactureId,
        ClientId,
        Montant,
        Mode,
        Reference,
        DatePaiement,
        Version,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Depenses {
        Table,
        Id,
        Numero,
        Libelle,
        Categorie,
        Montant,
        DateDepense,
        Notes,
        Version,
        CreatedAt,
        UpdatedAt,
    }
}
