use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProductVariants::Table)
                    .if_not_exists()
                    .col(pk_uuid(ProductVariants::Id))
                    .col(uuid(ProductVariants::ProductId))
                    .col(string_len(ProductVariants::Sku, 100))
                    .col(string(ProductVariants::Name))
                    .col(decimal_len_null(ProductVariants::Price, 10, 2))
                    // The check backs up the conditional-decrement path; no
                    // code path is allowed to write a negative quantity.
                    .col(
                        integer(ProductVariants::StockQuantity)
                            .default(0)
                            .check(Expr::col(ProductVariants::StockQuantity).gte(0)),
                    )
                    .col(integer(ProductVariants::LowStockThreshold).default(5))
                    .col(decimal_len_null(ProductVariants::Weight, 8, 2))
                    .col(decimal_len_null(ProductVariants::Length, 8, 2))
                    .col(decimal_len_null(ProductVariants::Width, 8, 2))
                    .col(decimal_len_null(ProductVariants::Height, 8, 2))
                    .col(boolean(ProductVariants::IsActive).default(true))
                    .col(
                        timestamp_with_time_zone(ProductVariants::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(ProductVariants::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(timestamp_with_time_zone_null(ProductVariants::DeletedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_product_variants_product")
                            .from(ProductVariants::Table, ProductVariants::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // SKUs are never reused, so the unique index spans tombstoned rows.
        manager
            .create_index(
                Index::create()
                    .name("idx_product_variants_sku")
                    .table(ProductVariants::Table)
                    .col(ProductVariants::Sku)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_product_variants_product_id")
                    .table(ProductVariants::Table)
                    .col(ProductVariants::ProductId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_product_variants_is_active")
                    .table(ProductVariants::Table)
                    .col(ProductVariants::IsActive)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ProductVariants::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ProductVariants {
    Table,
    Id,
    ProductId,
    Sku,
    Name,
    Price,
    StockQuantity,
    LowStockThreshold,
    Weight,
    Length,
    Width,
    Height,
    IsActive,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum Products {
    Table,
    Id,
}
