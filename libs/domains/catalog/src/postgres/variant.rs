use async_trait::async_trait;
use sea_orm::sea_query::{Expr, ExprTrait};
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QuerySelect, TransactionTrait,
};
use uuid::Uuid;

use crate::entity::{product, product_attribute_value, product_variant, variant_attribute_value};
use crate::error::{CatalogError, CatalogResult};
use crate::models::{CreateVariant, UpdateVariant, Variant};
use crate::repository::VariantRepository;

/// PostgreSQL variant repository. The three stock primitives are the only
/// statements in the system that write `stock_quantity`; the decrement is a
/// single conditional UPDATE judged by its affected-row count, so two
/// concurrent reducers can never drive the quantity negative.
#[derive(Clone)]
pub struct PgVariantRepository {
    db: DatabaseConnection,
}

impl PgVariantRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl VariantRepository for PgVariantRepository {
    async fn create(
        &self,
        input: CreateVariant,
        attribute_value_ids: Vec<Uuid>,
    ) -> CatalogResult<Variant> {
        let txn = self.db.begin().await?;

        let model: product_variant::ActiveModel = input.into();
        let created = model.insert(&txn).await?;

        for value_id in attribute_value_ids {
            variant_attribute_value::Model::link(created.id, value_id)
                .insert(&txn)
                .await?;
        }

        txn.commit().await?;
        tracing::info!(variant_id = %created.id, sku = %created.sku, "created variant");
        Ok(created.into())
    }

    async fn get_by_id(&self, id: Uuid) -> CatalogResult<Option<Variant>> {
        let model = product_variant::Entity::find_by_id(id)
            .filter(product_variant::Column::DeletedAt.is_null())
            .one(&self.db)
            .await?;
        Ok(model.map(Into::into))
    }

    async fn update(
        &self,
        id: Uuid,
        input: UpdateVariant,
        replacement_values: Option<Vec<Uuid>>,
    ) -> CatalogResult<Variant> {
        let txn = self.db.begin().await?;

        product_variant::Entity::find_by_id(id)
            .filter(product_variant::Column::DeletedAt.is_null())
            .one(&txn)
            .await?
            .ok_or(CatalogError::VariantNotFound(id))?;

        let mut fields = product_variant::ActiveModel {
            updated_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        };
        if let Some(sku) = input.sku {
            fields.sku = Set(sku);
        }
        if let Some(name) = input.name {
            fields.name = Set(name);
        }
        if let Some(price) = input.price {
            fields.price = Set(price);
        }
        if let Some(threshold) = input.low_stock_threshold {
            fields.low_stock_threshold = Set(threshold);
        }
        if let Some(weight) = input.weight {
            fields.weight = Set(weight);
        }
        if let Some(length) = input.length {
            fields.length = Set(length);
        }
        if let Some(width) = input.width {
            fields.width = Set(width);
        }
        if let Some(height) = input.height {
            fields.height = Set(height);
        }
        if let Some(is_active) = input.is_active {
            fields.is_active = Set(is_active);
        }
        product_variant::Entity::update_many()
            .set(fields)
            .filter(product_variant::Column::Id.eq(id))
            .exec(&txn)
            .await?;

        // Full replacement of the association set: the join rows are
        // disposable, so they are hard-deleted and reinserted.
        if let Some(value_ids) = replacement_values {
            variant_attribute_value::Entity::delete_many()
                .filter(variant_attribute_value::Column::VariantId.eq(id))
                .exec(&txn)
                .await?;
            for value_id in value_ids {
                variant_attribute_value::Model::link(id, value_id)
                    .insert(&txn)
                    .await?;
            }
        }

        let refreshed = product_variant::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(CatalogError::VariantNotFound(id))?;
        txn.commit().await?;

        tracing::info!(variant_id = %id, "updated variant");
        Ok(refreshed.into())
    }

    async fn soft_delete(&self, id: Uuid) -> CatalogResult<bool> {
        let now = chrono::Utc::now();
        let tombstone = product_variant::ActiveModel {
            deleted_at: Set(Some(now.into())),
            updated_at: Set(now.into()),
            ..Default::default()
        };
        let result = product_variant::Entity::update_many()
            .set(tombstone)
            .filter(product_variant::Column::Id.eq(id))
            .filter(product_variant::Column::DeletedAt.is_null())
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn sku_exists(&self, sku: &str, exclude: Option<Uuid>) -> CatalogResult<bool> {
        // Spans tombstoned rows: SKUs are never reused.
        let mut query = product_variant::Entity::find().filter(product_variant::Column::Sku.eq(sku));
        if let Some(exclude_id) = exclude {
            query = query.filter(product_variant::Column::Id.ne(exclude_id));
        }
        Ok(query.count(&self.db).await? > 0)
    }

    async fn product_exists(&self, product_id: Uuid) -> CatalogResult<bool> {
        let count = product::Entity::find()
            .filter(product::Column::Id.eq(product_id))
            .filter(product::Column::DeletedAt.is_null())
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    async fn known_attribute_value_ids(&self, ids: Vec<Uuid>) -> CatalogResult<Vec<Uuid>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let known: Vec<Uuid> = product_attribute_value::Entity::find()
            .select_only()
            .column(product_attribute_value::Column::Id)
            .filter(product_attribute_value::Column::Id.is_in(ids))
            .filter(product_attribute_value::Column::DeletedAt.is_null())
            .into_tuple()
            .all(&self.db)
            .await?;
        Ok(known)
    }

    async fn set_stock(&self, id: Uuid, quantity: i32) -> CatalogResult<bool> {
        let fields = product_variant::ActiveModel {
            stock_quantity: Set(quantity),
            updated_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        };
        let result = product_variant::Entity::update_many()
            .set(fields)
            .filter(product_variant::Column::Id.eq(id))
            .filter(product_variant::Column::DeletedAt.is_null())
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn increment_stock(&self, id: Uuid, delta: i32) -> CatalogResult<bool> {
        let result = product_variant::Entity::update_many()
            .col_expr(
                product_variant::Column::StockQuantity,
                Expr::col(product_variant::Column::StockQuantity).add(delta),
            )
            .col_expr(
                product_variant::Column::UpdatedAt,
                Expr::value(chrono::Utc::now()),
            )
            .filter(product_variant::Column::Id.eq(id))
            .filter(product_variant::Column::DeletedAt.is_null())
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn decrement_stock_if_available(&self, id: Uuid, delta: i32) -> CatalogResult<bool> {
        // UPDATE ... SET stock_quantity = stock_quantity - δ
        // WHERE id = ? AND stock_quantity >= δ
        // The store decides; there is no read-check-write window.
        let result = product_variant::Entity::update_many()
            .col_expr(
                product_variant::Column::StockQuantity,
                Expr::col(product_variant::Column::StockQuantity).sub(delta),
            )
            .col_expr(
                product_variant::Column::UpdatedAt,
                Expr::value(chrono::Utc::now()),
            )
            .filter(product_variant::Column::Id.eq(id))
            .filter(product_variant::Column::DeletedAt.is_null())
            .filter(product_variant::Column::StockQuantity.gte(delta))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn low_stock(&self) -> CatalogResult<Vec<Variant>> {
        let models = product_variant::Entity::find()
            .filter(product_variant::Column::IsActive.eq(true))
            .filter(product_variant::Column::DeletedAt.is_null())
            .filter(
                Expr::col(product_variant::Column::StockQuantity)
                    .lte(Expr::col(product_variant::Column::LowStockThreshold)),
            )
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }
}
