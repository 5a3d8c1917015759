use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Categories::Table)
                    .if_not_exists()
                    .col(pk_uuid(Categories::Id))
                    .col(string(Categories::Name))
                    .col(string(Categories::Slug))
                    .col(text(Categories::Description).default(""))
                    .col(string_len_null(Categories::ImageUrl, 500))
                    .col(boolean(Categories::IsActive).default(true))
                    .col(uuid_null(Categories::ParentId))
                    // Nested-set interval: every descendant's bounds fall
                    // strictly inside its ancestor's bounds.
                    .col(big_integer(Categories::TreeLeft))
                    .col(big_integer(Categories::TreeRight))
                    .col(integer(Categories::Depth).default(0))
                    .col(
                        timestamp_with_time_zone(Categories::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Categories::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(timestamp_with_time_zone_null(Categories::DeletedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_categories_parent")
                            .from(Categories::Table, Categories::ParentId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Slug uniqueness spans tombstoned rows too; slugs are never reused.
        manager
            .create_index(
                Index::create()
                    .name("idx_categories_slug")
                    .table(Categories::Table)
                    .col(Categories::Slug)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_categories_parent_id")
                    .table(Categories::Table)
                    .col(Categories::ParentId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_categories_tree_left")
                    .table(Categories::Table)
                    .col(Categories::TreeLeft)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_categories_tree_right")
                    .table(Categories::Table)
                    .col(Categories::TreeRight)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_categories_is_active")
                    .table(Categories::Table)
                    .col(Categories::IsActive)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_categories_deleted_at")
                    .table(Categories::Table)
                    .col(Categories::DeletedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Categories::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Categories {
    Table,
    Id,
    Name,
    Slug,
    Description,
    ImageUrl,
    IsActive,
    ParentId,
    TreeLeft,
    TreeRight,
    Depth,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}
