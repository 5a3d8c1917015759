use std::collections::HashMap;

use async_trait::async_trait;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::sea_query::{Expr, ExprTrait, Query, SelectStatement};
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, Order,
    PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use uuid::Uuid;

use crate::entity::{
    product, product_attribute, product_attribute_value, product_image, product_variant,
    variant_attribute_value,
};
use crate::error::{CatalogError, CatalogResult};
use crate::models::{
    CreateImage, CreateProduct, Product, ProductImage, ProductQuery, SortField, SortOrder,
    UpdateImage, UpdateProduct, Variant, VariantAttributeLink,
};
use crate::repository::ProductRepository;

use super::escape_like;

/// PostgreSQL product repository. Also owns the product's images and the
/// listing query.
///
/// The listing predicates that reach into variants are expressed as
/// `IN (subquery)` conditions rather than joins, so no DISTINCT is needed
/// and each predicate stays independent of the others.
#[derive(Clone)]
pub struct PgProductRepository {
    db: DatabaseConnection,
}

impl PgProductRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// `SELECT product_id FROM product_variants WHERE is_active AND live`,
    /// for the price / stock / attribute predicates.
    fn live_variant_products() -> SelectStatement {
        Query::select()
            .column((product_variant::Entity, product_variant::Column::ProductId))
            .from(product_variant::Entity)
            .and_where(
                Expr::col((product_variant::Entity, product_variant::Column::IsActive)).eq(true),
            )
            .and_where(
                Expr::col((product_variant::Entity, product_variant::Column::DeletedAt)).is_null(),
            )
            .to_owned()
    }

    /// Products having at least one live variant carrying the given
    /// attribute value.
    fn attribute_value_products(value_id: Uuid) -> SelectStatement {
        Self::live_variant_products()
            .inner_join(
                variant_attribute_value::Entity,
                Expr::col((
                    variant_attribute_value::Entity,
                    variant_attribute_value::Column::VariantId,
                ))
                .equals((product_variant::Entity, product_variant::Column::Id)),
            )
            .and_where(
                Expr::col((
                    variant_attribute_value::Entity,
                    variant_attribute_value::Column::AttributeValueId,
                ))
                .eq(value_id),
            )
            .and_where(
                Expr::col((
                    variant_attribute_value::Entity,
                    variant_attribute_value::Column::DeletedAt,
                ))
                .is_null(),
            )
            .to_owned()
    }
}

#[async_trait]
impl ProductRepository for PgProductRepository {
    async fn create(&self, input: CreateProduct, slug: String) -> CatalogResult<Product> {
        let now = chrono::Utc::now();
        let model = product::ActiveModel {
            id: Set(Uuid::now_v7()),
            name: Set(input.name),
            slug: Set(slug),
            description: Set(input.description),
            category_id: Set(input.category_id),
            base_price: Set(input.base_price),
            is_active: Set(input.is_active.unwrap_or(true)),
            is_featured: Set(input.is_featured.unwrap_or(false)),
            meta_title: Set(input.meta_title.unwrap_or_default()),
            meta_description: Set(input.meta_description.unwrap_or_default()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            deleted_at: Set(None),
        };
        let created = model.insert(&self.db).await?;

        tracing::info!(product_id = %created.id, slug = %created.slug, "created product");
        Ok(created.into())
    }

    async fn get_by_id(&self, id: Uuid) -> CatalogResult<Option<Product>> {
        let model = product::Entity::find_by_id(id)
            .filter(product::Column::DeletedAt.is_null())
            .one(&self.db)
            .await?;
        Ok(model.map(Into::into))
    }

    async fn get_by_slug(&self, slug: &str) -> CatalogResult<Option<Product>> {
        let model = product::Entity::find()
            .filter(product::Column::Slug.eq(slug))
            .filter(product::Column::IsActive.eq(true))
            .filter(product::Column::DeletedAt.is_null())
            .one(&self.db)
            .await?;
        Ok(model.map(Into::into))
    }

    async fn update(&self, id: Uuid, input: UpdateProduct) -> CatalogResult<Product> {
        let existing = product::Entity::find_by_id(id)
            .filter(product::Column::DeletedAt.is_null())
            .one(&self.db)
            .await?
            .ok_or(CatalogError::ProductNotFound(id))?;

        let mut fields = product::ActiveModel {
            updated_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        };
        if let Some(name) = input.name {
            fields.name = Set(name);
        }
        if let Some(description) = input.description {
            fields.description = Set(description);
        }
        if let Some(category_id) = input.category_id {
            fields.category_id = Set(category_id);
        }
        if let Some(base_price) = input.base_price {
            fields.base_price = Set(base_price);
        }
        if let Some(is_active) = input.is_active {
            fields.is_active = Set(is_active);
        }
        if let Some(is_featured) = input.is_featured {
            fields.is_featured = Set(is_featured);
        }
        if let Some(meta_title) = input.meta_title {
            fields.meta_title = Set(meta_title);
        }
        if let Some(meta_description) = input.meta_description {
            fields.meta_description = Set(meta_description);
        }
        product::Entity::update_many()
            .set(fields)
            .filter(product::Column::Id.eq(id))
            .exec(&self.db)
            .await?;

        let refreshed = product::Entity::find_by_id(existing.id)
            .one(&self.db)
            .await?
            .ok_or(CatalogError::ProductNotFound(id))?;

        tracing::info!(product_id = %id, "updated product");
        Ok(refreshed.into())
    }

    async fn soft_delete_cascade(&self, id: Uuid) -> CatalogResult<()> {
        let txn = self.db.begin().await?;

        let model = product::Entity::find_by_id(id)
            .filter(product::Column::DeletedAt.is_null())
            .one(&txn)
            .await?
            .ok_or(CatalogError::ProductNotFound(id))?;

        let now = chrono::Utc::now();
        let tombstone_product = product::ActiveModel {
            deleted_at: Set(Some(now.into())),
            updated_at: Set(now.into()),
            ..Default::default()
        };
        product::Entity::update_many()
            .set(tombstone_product)
            .filter(product::Column::Id.eq(model.id))
            .exec(&txn)
            .await?;

        let tombstone_variants = product_variant::ActiveModel {
            deleted_at: Set(Some(now.into())),
            updated_at: Set(now.into()),
            ..Default::default()
        };
        product_variant::Entity::update_many()
            .set(tombstone_variants)
            .filter(product_variant::Column::ProductId.eq(model.id))
            .filter(product_variant::Column::DeletedAt.is_null())
            .exec(&txn)
            .await?;

        let tombstone_images = product_image::ActiveModel {
            deleted_at: Set(Some(now.into())),
            updated_at: Set(now.into()),
            ..Default::default()
        };
        product_image::Entity::update_many()
            .set(tombstone_images)
            .filter(product_image::Column::ProductId.eq(model.id))
            .filter(product_image::Column::DeletedAt.is_null())
            .exec(&txn)
            .await?;

        txn.commit().await?;
        tracing::info!(product_id = %id, "deleted product with variants and images");
        Ok(())
    }

    async fn slug_exists(&self, slug: &str) -> CatalogResult<bool> {
        let count = product::Entity::find()
            .filter(product::Column::Slug.eq(slug))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    async fn search(&self, query: ProductQuery) -> CatalogResult<(Vec<Product>, u64)> {
        let mut select = product::Entity::find()
            .filter(product::Column::DeletedAt.is_null())
            .filter(product::Column::IsActive.eq(true));

        if let Some(category_ids) = &query.category_ids {
            select = select.filter(product::Column::CategoryId.is_in(category_ids.iter().copied()));
        }

        if let Some(featured) = query.is_featured {
            select = select.filter(product::Column::IsFeatured.eq(featured));
        }

        // A product is in range when its base price qualifies OR any live
        // variant's override does.
        if let Some(min_price) = query.min_price {
            let variant_min = Self::live_variant_products()
                .and_where(
                    Expr::col((product_variant::Entity, product_variant::Column::Price))
                        .gte(min_price),
                )
                .to_owned();
            select = select.filter(
                Condition::any()
                    .add(product::Column::BasePrice.gte(min_price))
                    .add(product::Column::Id.in_subquery(variant_min)),
            );
        }
        if let Some(max_price) = query.max_price {
            let variant_max = Self::live_variant_products()
                .and_where(
                    Expr::col((product_variant::Entity, product_variant::Column::Price))
                        .lte(max_price),
                )
                .to_owned();
            select = select.filter(
                Condition::any()
                    .add(product::Column::BasePrice.lte(max_price))
                    .add(product::Column::Id.in_subquery(variant_max)),
            );
        }

        if query.in_stock_only {
            let stocked = Self::live_variant_products()
                .and_where(
                    Expr::col((
                        product_variant::Entity,
                        product_variant::Column::StockQuantity,
                    ))
                    .gt(0),
                )
                .to_owned();
            select = select.filter(product::Column::Id.in_subquery(stocked));
        }

        // One predicate per value id: every listed value must be present on
        // some live variant (intersection, not union).
        for value_id in &query.attribute_values {
            select = select
                .filter(product::Column::Id.in_subquery(Self::attribute_value_products(*value_id)));
        }

        if let Some(term) = query.search.as_deref().filter(|t| !t.is_empty()) {
            let pattern = format!("%{}%", escape_like(term));
            let sku_match = Query::select()
                .column((product_variant::Entity, product_variant::Column::ProductId))
                .from(product_variant::Entity)
                .and_where(
                    Expr::col((product_variant::Entity, product_variant::Column::DeletedAt))
                        .is_null(),
                )
                .and_where(
                    Expr::col((product_variant::Entity, product_variant::Column::Sku))
                        .ilike(pattern.clone()),
                )
                .to_owned();
            select = select.filter(
                Condition::any()
                    .add(Expr::col((product::Entity, product::Column::Name)).ilike(pattern.clone()))
                    .add(
                        Expr::col((product::Entity, product::Column::Description))
                            .ilike(pattern.clone()),
                    )
                    .add(product::Column::Id.in_subquery(sku_match)),
            );
        }

        let sort_column = match query.sort_by {
            SortField::CreatedAt => product::Column::CreatedAt,
            SortField::Price => product::Column::BasePrice,
            SortField::Name => product::Column::Name,
        };
        let order = match query.sort_order {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        };
        // Secondary id ordering keeps pages stable between equal sort keys.
        select = select
            .order_by(sort_column, order)
            .order_by(product::Column::Id, Order::Desc);

        let paginator = select.paginate(&self.db, query.page_size);
        let total = paginator.num_items().await?;
        let models = paginator.fetch_page(query.page.saturating_sub(1)).await?;

        Ok((models.into_iter().map(Into::into).collect(), total))
    }

    async fn variants_for_products(&self, product_ids: Vec<Uuid>) -> CatalogResult<Vec<Variant>> {
        if product_ids.is_empty() {
            return Ok(Vec::new());
        }
        let models = product_variant::Entity::find()
            .filter(product_variant::Column::ProductId.is_in(product_ids))
            .filter(product_variant::Column::DeletedAt.is_null())
            .order_by_asc(product_variant::Column::Name)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn images_for_products(
        &self,
        product_ids: Vec<Uuid>,
    ) -> CatalogResult<Vec<ProductImage>> {
        if product_ids.is_empty() {
            return Ok(Vec::new());
        }
        let models = product_image::Entity::find()
            .filter(product_image::Column::ProductId.is_in(product_ids))
            .filter(product_image::Column::DeletedAt.is_null())
            .order_by_asc(product_image::Column::Position)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn attribute_values_for_variants(
        &self,
        variant_ids: Vec<Uuid>,
    ) -> CatalogResult<Vec<VariantAttributeLink>> {
        if variant_ids.is_empty() {
            return Ok(Vec::new());
        }

        let links = variant_attribute_value::Entity::find()
            .filter(variant_attribute_value::Column::VariantId.is_in(variant_ids))
            .filter(variant_attribute_value::Column::DeletedAt.is_null())
            .all(&self.db)
            .await?;
        if links.is_empty() {
            return Ok(Vec::new());
        }

        let value_ids: Vec<Uuid> = links.iter().map(|l| l.attribute_value_id).collect();
        let values = product_attribute_value::Entity::find()
            .filter(product_attribute_value::Column::Id.is_in(value_ids))
            .filter(product_attribute_value::Column::DeletedAt.is_null())
            .all(&self.db)
            .await?;
        let attribute_ids: Vec<Uuid> = values.iter().map(|v| v.attribute_id).collect();
        let attributes: HashMap<Uuid, String> = product_attribute::Entity::find()
            .filter(product_attribute::Column::Id.is_in(attribute_ids))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|a| (a.id, a.name))
            .collect();
        let values_by_id: HashMap<Uuid, &product_attribute_value::Model> =
            values.iter().map(|v| (v.id, v)).collect();

        let mut resolved = Vec::with_capacity(links.len());
        for link in &links {
            let Some(value) = values_by_id.get(&link.attribute_value_id) else {
                continue;
            };
            let Some(attribute) = attributes.get(&value.attribute_id) else {
                continue;
            };
            resolved.push(VariantAttributeLink {
                variant_id: link.variant_id,
                attribute_id: value.attribute_id,
                attribute: attribute.clone(),
                value_id: value.id,
                value: value.value.clone(),
            });
        }
        Ok(resolved)
    }

    async fn create_image(&self, input: CreateImage) -> CatalogResult<ProductImage> {
        let txn = self.db.begin().await?;

        let has_primary = product_image::Entity::find()
            .filter(product_image::Column::ProductId.eq(input.product_id))
            .filter(product_image::Column::IsPrimary.eq(true))
            .filter(product_image::Column::DeletedAt.is_null())
            .count(&txn)
            .await?
            > 0;

        // First image is always primary; an explicit primary displaces the
        // current one.
        let is_primary = !has_primary || input.is_primary.unwrap_or(false);
        if has_primary && is_primary {
            let clear = product_image::ActiveModel {
                is_primary: Set(false),
                updated_at: Set(chrono::Utc::now().into()),
                ..Default::default()
            };
            product_image::Entity::update_many()
                .set(clear)
                .filter(product_image::Column::ProductId.eq(input.product_id))
                .filter(product_image::Column::IsPrimary.eq(true))
                .filter(product_image::Column::DeletedAt.is_null())
                .exec(&txn)
                .await?;
        }

        let mut model: product_image::ActiveModel = input.into();
        model.is_primary = Set(is_primary);
        let created = model.insert(&txn).await?;

        txn.commit().await?;
        tracing::info!(image_id = %created.id, product_id = %created.product_id, "created image");
        Ok(created.into())
    }

    async fn get_image(&self, id: Uuid) -> CatalogResult<Option<ProductImage>> {
        let model = product_image::Entity::find_by_id(id)
            .filter(product_image::Column::DeletedAt.is_null())
            .one(&self.db)
            .await?;
        Ok(model.map(Into::into))
    }

    async fn update_image(&self, id: Uuid, input: UpdateImage) -> CatalogResult<ProductImage> {
        let txn = self.db.begin().await?;

        let model = product_image::Entity::find_by_id(id)
            .filter(product_image::Column::DeletedAt.is_null())
            .one(&txn)
            .await?
            .ok_or(CatalogError::ImageNotFound(id))?;

        if input.is_primary == Some(true) {
            let clear = product_image::ActiveModel {
                is_primary: Set(false),
                updated_at: Set(chrono::Utc::now().into()),
                ..Default::default()
            };
            product_image::Entity::update_many()
                .set(clear)
                .filter(product_image::Column::ProductId.eq(model.product_id))
                .filter(product_image::Column::Id.ne(id))
                .filter(product_image::Column::IsPrimary.eq(true))
                .filter(product_image::Column::DeletedAt.is_null())
                .exec(&txn)
                .await?;
        }

        let mut fields = product_image::ActiveModel {
            updated_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        };
        if let Some(image_url) = input.image_url {
            fields.image_url = Set(image_url);
        }
        if let Some(alt_text) = input.alt_text {
            fields.alt_text = Set(alt_text);
        }
        if let Some(position) = input.position {
            fields.position = Set(position);
        }
        if let Some(is_primary) = input.is_primary {
            fields.is_primary = Set(is_primary);
        }
        product_image::Entity::update_many()
            .set(fields)
            .filter(product_image::Column::Id.eq(id))
            .exec(&txn)
            .await?;

        let refreshed = product_image::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(CatalogError::ImageNotFound(id))?;
        txn.commit().await?;

        Ok(refreshed.into())
    }

    async fn soft_delete_image(&self, id: Uuid) -> CatalogResult<bool> {
        let now = chrono::Utc::now();
        let tombstone = product_image::ActiveModel {
            deleted_at: Set(Some(now.into())),
            updated_at: Set(now.into()),
            ..Default::default()
        };
        let result = product_image::Entity::update_many()
            .set(tombstone)
            .filter(product_image::Column::Id.eq(id))
            .filter(product_image::Column::DeletedAt.is_null())
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn reorder_images(&self, image_ids: Vec<Uuid>) -> CatalogResult<u64> {
        let txn = self.db.begin().await?;

        let mut repositioned = 0;
        for (position, image_id) in image_ids.into_iter().enumerate() {
            let fields = product_image::ActiveModel {
                position: Set(position as i32),
                updated_at: Set(chrono::Utc::now().into()),
                ..Default::default()
            };
            let result = product_image::Entity::update_many()
                .set(fields)
                .filter(product_image::Column::Id.eq(image_id))
                .filter(product_image::Column::DeletedAt.is_null())
                .exec(&txn)
                .await?;
            if result.rows_affected == 0 {
                tracing::debug!(image_id = %image_id, "skipping unknown image during reorder");
            }
            repositioned += result.rows_affected;
        }

        txn.commit().await?;
        Ok(repositioned)
    }
}
