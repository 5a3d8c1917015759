use std::collections::HashMap;

use async_trait::async_trait;
use sea_orm::sea_query::{Expr, ExprTrait};
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use uuid::Uuid;

use crate::entity::{category, product};
use crate::error::{CatalogError, CatalogResult};
use crate::models::{Category, CategoryProductCount, CreateCategory, UpdateCategory};
use crate::repository::CategoryRepository;
use crate::tree::{self, NodeInterval};

/// PostgreSQL category repository. Owns the nested-set interval columns:
/// every structural change (insert, move, cascade delete) renumbers them
/// inside a single transaction so readers never observe a half-shifted tree.
#[derive(Clone)]
pub struct PgCategoryRepository {
    db: DatabaseConnection,
}

impl PgCategoryRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn interval(model: &category::Model) -> NodeInterval {
        NodeInterval {
            left: model.tree_left,
            right: model.tree_right,
            depth: model.depth,
        }
    }

    async fn max_tree_right<C: ConnectionTrait>(conn: &C) -> CatalogResult<i64> {
        let last = category::Entity::find()
            .order_by_desc(category::Column::TreeRight)
            .one(conn)
            .await?;
        Ok(last.map_or(0, |m| m.tree_right))
    }

    async fn find_live<C: ConnectionTrait>(
        conn: &C,
        id: Uuid,
    ) -> CatalogResult<Option<category::Model>> {
        Ok(category::Entity::find_by_id(id)
            .filter(category::Column::DeletedAt.is_null())
            .one(conn)
            .await?)
    }

    /// Relocate `node`'s subtree under `new_parent_id` within `txn`.
    ///
    /// Detach (negate the subtree's values), close the gap it left, open a
    /// gap at the target, then reinsert shifted. Tombstoned rows keep their
    /// positions and shift along with everything else.
    async fn apply_move(
        &self,
        txn: &DatabaseTransaction,
        node: &category::Model,
        new_parent_id: Option<Uuid>,
    ) -> CatalogResult<()> {
        let parent_interval = match new_parent_id {
            Some(parent_id) => {
                let parent = Self::find_live(txn, parent_id)
                    .await?
                    .ok_or(CatalogError::ParentCategoryNotFound(parent_id))?;
                Some(Self::interval(&parent))
            }
            None => None,
        };

        let max_right = Self::max_tree_right(txn).await?;
        let plan = tree::plan_move(&Self::interval(node), parent_interval.as_ref(), max_right)?;

        // Detach: negate the subtree so the shifts below cannot touch it.
        category::Entity::update_many()
            .col_expr(
                category::Column::TreeLeft,
                Expr::col(category::Column::TreeLeft).mul(-1),
            )
            .col_expr(
                category::Column::TreeRight,
                Expr::col(category::Column::TreeRight).mul(-1),
            )
            .filter(category::Column::TreeLeft.between(plan.source.left, plan.source.right))
            .exec(txn)
            .await?;

        // Close the gap the subtree left behind.
        category::Entity::update_many()
            .col_expr(
                category::Column::TreeLeft,
                Expr::col(category::Column::TreeLeft).sub(plan.width),
            )
            .filter(category::Column::TreeLeft.gt(plan.source.right))
            .exec(txn)
            .await?;
        category::Entity::update_many()
            .col_expr(
                category::Column::TreeRight,
                Expr::col(category::Column::TreeRight).sub(plan.width),
            )
            .filter(category::Column::TreeRight.gt(plan.source.right))
            .exec(txn)
            .await?;

        // Open a gap at the target position.
        category::Entity::update_many()
            .col_expr(
                category::Column::TreeLeft,
                Expr::col(category::Column::TreeLeft).add(plan.width),
            )
            .filter(category::Column::TreeLeft.gte(plan.target_left))
            .exec(txn)
            .await?;
        category::Entity::update_many()
            .col_expr(
                category::Column::TreeRight,
                Expr::col(category::Column::TreeRight).add(plan.width),
            )
            .filter(category::Column::TreeRight.gte(plan.target_left))
            .exec(txn)
            .await?;

        // Reinsert the detached rows at their new position and depth.
        category::Entity::update_many()
            .col_expr(
                category::Column::TreeLeft,
                Expr::col(category::Column::TreeLeft)
                    .mul(-1)
                    .add(plan.offset),
            )
            .col_expr(
                category::Column::TreeRight,
                Expr::col(category::Column::TreeRight)
                    .mul(-1)
                    .add(plan.offset),
            )
            .col_expr(
                category::Column::Depth,
                Expr::col(category::Column::Depth).add(plan.depth_delta),
            )
            .filter(category::Column::TreeLeft.lt(0))
            .exec(txn)
            .await?;

        // Reparent the moved node itself.
        let reparent = category::ActiveModel {
            parent_id: Set(new_parent_id),
            updated_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        };
        category::Entity::update_many()
            .set(reparent)
            .filter(category::Column::Id.eq(node.id))
            .exec(txn)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl CategoryRepository for PgCategoryRepository {
    async fn create(&self, input: CreateCategory, slug: String) -> CatalogResult<Category> {
        let txn = self.db.begin().await?;

        let plan = match input.parent_id {
            Some(parent_id) => {
                let parent = Self::find_live(&txn, parent_id)
                    .await?
                    .ok_or(CatalogError::ParentCategoryNotFound(parent_id))?;
                tree::plan_child_insert(&Self::interval(&parent))
            }
            None => tree::plan_root_insert(Self::max_tree_right(&txn).await?),
        };

        if let Some(shift_at) = plan.shift_at {
            category::Entity::update_many()
                .col_expr(
                    category::Column::TreeLeft,
                    Expr::col(category::Column::TreeLeft).add(2),
                )
                .filter(category::Column::TreeLeft.gte(shift_at))
                .exec(&txn)
                .await?;
            category::Entity::update_many()
                .col_expr(
                    category::Column::TreeRight,
                    Expr::col(category::Column::TreeRight).add(2),
                )
                .filter(category::Column::TreeRight.gte(shift_at))
                .exec(&txn)
                .await?;
        }

        let now = chrono::Utc::now();
        let model = category::ActiveModel {
            id: Set(Uuid::now_v7()),
            name: Set(input.name),
            slug: Set(slug),
            description: Set(input.description),
            image_url: Set(input.image_url),
            is_active: Set(input.is_active.unwrap_or(true)),
            parent_id: Set(input.parent_id),
            tree_left: Set(plan.left),
            tree_right: Set(plan.right),
            depth: Set(plan.depth),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            deleted_at: Set(None),
        };
        let created = model.insert(&txn).await?;
        txn.commit().await?;

        tracing::info!(category_id = %created.id, slug = %created.slug, "created category");
        Ok(created.into())
    }

    async fn get_by_id(&self, id: Uuid) -> CatalogResult<Option<Category>> {
        Ok(Self::find_live(&self.db, id).await?.map(Into::into))
    }

    async fn get_by_slug(&self, slug: &str) -> CatalogResult<Option<Category>> {
        let model = category::Entity::find()
            .filter(category::Column::Slug.eq(slug))
            .filter(category::Column::IsActive.eq(true))
            .filter(category::Column::DeletedAt.is_null())
            .one(&self.db)
            .await?;
        Ok(model.map(Into::into))
    }

    async fn list(&self, include_inactive: bool) -> CatalogResult<Vec<Category>> {
        let mut query = category::Entity::find().filter(category::Column::DeletedAt.is_null());
        if !include_inactive {
            query = query.filter(category::Column::IsActive.eq(true));
        }
        let models = query
            .order_by_asc(category::Column::TreeLeft)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn update(&self, id: Uuid, input: UpdateCategory) -> CatalogResult<Category> {
        let txn = self.db.begin().await?;

        let model = Self::find_live(&txn, id)
            .await?
            .ok_or(CatalogError::CategoryNotFound(id))?;

        if let Some(new_parent) = input.parent_id {
            if new_parent != model.parent_id {
                self.apply_move(&txn, &model, new_parent).await?;
            }
        }

        let mut fields = category::ActiveModel {
            updated_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        };
        if let Some(name) = input.name {
            fields.name = Set(name);
        }
        if let Some(description) = input.description {
            fields.description = Set(description);
        }
        if let Some(image_url) = input.image_url {
            fields.image_url = Set(image_url);
        }
        if let Some(is_active) = input.is_active {
            fields.is_active = Set(is_active);
        }
        category::Entity::update_many()
            .set(fields)
            .filter(category::Column::Id.eq(id))
            .exec(&txn)
            .await?;

        let refreshed = Self::find_live(&txn, id)
            .await?
            .ok_or(CatalogError::CategoryNotFound(id))?;
        txn.commit().await?;

        tracing::info!(category_id = %id, "updated category");
        Ok(refreshed.into())
    }

    async fn move_node(&self, id: Uuid, new_parent_id: Option<Uuid>) -> CatalogResult<Category> {
        let txn = self.db.begin().await?;

        let model = Self::find_live(&txn, id)
            .await?
            .ok_or(CatalogError::CategoryNotFound(id))?;
        self.apply_move(&txn, &model, new_parent_id).await?;

        let refreshed = Self::find_live(&txn, id)
            .await?
            .ok_or(CatalogError::CategoryNotFound(id))?;
        txn.commit().await?;

        tracing::info!(category_id = %id, new_parent = ?new_parent_id, "moved category");
        Ok(refreshed.into())
    }

    async fn soft_delete_subtree(&self, id: Uuid) -> CatalogResult<u64> {
        let txn = self.db.begin().await?;

        let model = Self::find_live(&txn, id)
            .await?
            .ok_or(CatalogError::CategoryNotFound(id))?;

        let now = chrono::Utc::now();
        let tombstone = category::ActiveModel {
            deleted_at: Set(Some(now.into())),
            updated_at: Set(now.into()),
            ..Default::default()
        };
        let result = category::Entity::update_many()
            .set(tombstone)
            .filter(category::Column::TreeLeft.between(model.tree_left, model.tree_right))
            .filter(category::Column::DeletedAt.is_null())
            .exec(&txn)
            .await?;

        txn.commit().await?;
        tracing::info!(category_id = %id, tombstoned = result.rows_affected, "deleted category subtree");
        Ok(result.rows_affected)
    }

    async fn ancestors(&self, id: Uuid) -> CatalogResult<Vec<Category>> {
        let model = Self::find_live(&self.db, id)
            .await?
            .ok_or(CatalogError::CategoryNotFound(id))?;

        let models = category::Entity::find()
            .filter(category::Column::TreeLeft.lt(model.tree_left))
            .filter(category::Column::TreeRight.gt(model.tree_right))
            .filter(category::Column::DeletedAt.is_null())
            .order_by_asc(category::Column::TreeLeft)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn descendant_ids(&self, id: Uuid, include_self: bool) -> CatalogResult<Vec<Uuid>> {
        let model = Self::find_live(&self.db, id)
            .await?
            .ok_or(CatalogError::CategoryNotFound(id))?;

        let mut query = category::Entity::find()
            .select_only()
            .column(category::Column::Id)
            .filter(category::Column::DeletedAt.is_null());
        query = if include_self {
            query
                .filter(category::Column::TreeLeft.gte(model.tree_left))
                .filter(category::Column::TreeRight.lte(model.tree_right))
        } else {
            query
                .filter(category::Column::TreeLeft.gt(model.tree_left))
                .filter(category::Column::TreeRight.lt(model.tree_right))
        };

        Ok(query.into_tuple().all(&self.db).await?)
    }

    async fn slug_exists(&self, slug: &str) -> CatalogResult<bool> {
        // Spans tombstoned rows: slugs are never reused.
        let count = category::Entity::find()
            .filter(category::Column::Slug.eq(slug))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    async fn has_undeleted_products(&self, id: Uuid) -> CatalogResult<bool> {
        let count = product::Entity::find()
            .filter(product::Column::CategoryId.eq(id))
            .filter(product::Column::DeletedAt.is_null())
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    async fn product_counts(&self) -> CatalogResult<Vec<CategoryProductCount>> {
        let categories = category::Entity::find()
            .filter(category::Column::DeletedAt.is_null())
            .all(&self.db)
            .await?;

        let counts: Vec<(Uuid, i64)> = product::Entity::find()
            .select_only()
            .column(product::Column::CategoryId)
            .column_as(product::Column::Id.count(), "product_count")
            .filter(product::Column::IsActive.eq(true))
            .filter(product::Column::DeletedAt.is_null())
            .group_by(product::Column::CategoryId)
            .into_tuple()
            .all(&self.db)
            .await?;
        let by_category: HashMap<Uuid, i64> = counts.into_iter().collect();

        Ok(categories
            .into_iter()
            .map(|c| CategoryProductCount {
                category_id: c.id,
                tree_left: c.tree_left,
                tree_right: c.tree_right,
                product_count: by_category.get(&c.id).copied().unwrap_or(0) as u64,
            })
            .collect())
    }
}
