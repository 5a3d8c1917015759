use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProductAttributes::Table)
                    .if_not_exists()
                    .col(pk_uuid(ProductAttributes::Id))
                    .col(string_len(ProductAttributes::Name, 100))
                    .col(
                        timestamp_with_time_zone(ProductAttributes::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(ProductAttributes::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(timestamp_with_time_zone_null(ProductAttributes::DeletedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_product_attributes_name")
                    .table(ProductAttributes::Table)
                    .col(ProductAttributes::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ProductAttributeValues::Table)
                    .if_not_exists()
                    .col(pk_uuid(ProductAttributeValues::Id))
                    .col(uuid(ProductAttributeValues::AttributeId))
                    .col(string_len(ProductAttributeValues::Value, 100))
                    .col(
                        timestamp_with_time_zone(ProductAttributeValues::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(ProductAttributeValues::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(timestamp_with_time_zone_null(ProductAttributeValues::DeletedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_product_attribute_values_attribute")
                            .from(
                                ProductAttributeValues::Table,
                                ProductAttributeValues::AttributeId,
                            )
                            .to(ProductAttributes::Table, ProductAttributes::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_product_attribute_values_attribute_value")
                    .table(ProductAttributeValues::Table)
                    .col(ProductAttributeValues::AttributeId)
                    .col(ProductAttributeValues::Value)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(VariantAttributeValues::Table)
                    .if_not_exists()
                    .col(pk_uuid(VariantAttributeValues::Id))
                    .col(uuid(VariantAttributeValues::VariantId))
                    .col(uuid(VariantAttributeValues::AttributeValueId))
                    .col(
                        timestamp_with_time_zone(VariantAttributeValues::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(VariantAttributeValues::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(timestamp_with_time_zone_null(VariantAttributeValues::DeletedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_variant_attribute_values_variant")
                            .from(
                                VariantAttributeValues::Table,
                                VariantAttributeValues::VariantId,
                            )
                            .to(ProductVariants::Table, ProductVariants::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_variant_attribute_values_value")
                            .from(
                                VariantAttributeValues::Table,
                                VariantAttributeValues::AttributeValueId,
                            )
                            .to(ProductAttributeValues::Table, ProductAttributeValues::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_variant_attribute_values_pair")
                    .table(VariantAttributeValues::Table)
                    .col(VariantAttributeValues::VariantId)
                    .col(VariantAttributeValues::AttributeValueId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_variant_attribute_values_value")
                    .table(VariantAttributeValues::Table)
                    .col(VariantAttributeValues::AttributeValueId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(VariantAttributeValues::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProductAttributeValues::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProductAttributes::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ProductAttributes {
    Table,
    Id,
    Name,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum ProductAttributeValues {
    Table,
    Id,
    AttributeId,
    Value,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum VariantAttributeValues {
    Table,
    Id,
    VariantId,
    AttributeValueId,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum ProductVariants {
    Table,
    Id,
}
