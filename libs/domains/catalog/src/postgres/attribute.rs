use std::collections::HashMap;

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};
use uuid::Uuid;

use crate::entity::{product_attribute, product_attribute_value};
use crate::error::CatalogResult;
use crate::models::{
    Attribute, AttributeValue, AttributeWithValues, CreateAttribute, CreateAttributeValue,
};
use crate::repository::AttributeRepository;

/// PostgreSQL attribute repository.
#[derive(Clone)]
pub struct PgAttributeRepository {
    db: DatabaseConnection,
}

impl PgAttributeRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AttributeRepository for PgAttributeRepository {
    async fn create_attribute(&self, input: CreateAttribute) -> CatalogResult<Attribute> {
        let model: product_attribute::ActiveModel = input.into();
        let created = model.insert(&self.db).await?;
        tracing::info!(attribute_id = %created.id, name = %created.name, "created attribute");
        Ok(created.into())
    }

    async fn create_value(&self, input: CreateAttributeValue) -> CatalogResult<AttributeValue> {
        let model: product_attribute_value::ActiveModel = input.into();
        let created = model.insert(&self.db).await?;
        tracing::info!(value_id = %created.id, "created attribute value");
        Ok(created.into())
    }

    async fn get_attribute(&self, id: Uuid) -> CatalogResult<Option<Attribute>> {
        let model = product_attribute::Entity::find_by_id(id)
            .filter(product_attribute::Column::DeletedAt.is_null())
            .one(&self.db)
            .await?;
        Ok(model.map(Into::into))
    }

    async fn attribute_name_exists(&self, name: &str) -> CatalogResult<bool> {
        let count = product_attribute::Entity::find()
            .filter(product_attribute::Column::Name.eq(name))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    async fn value_exists(&self, attribute_id: Uuid, value: &str) -> CatalogResult<bool> {
        let count = product_attribute_value::Entity::find()
            .filter(product_attribute_value::Column::AttributeId.eq(attribute_id))
            .filter(product_attribute_value::Column::Value.eq(value))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    async fn list_with_values(&self) -> CatalogResult<Vec<AttributeWithValues>> {
        let attributes = product_attribute::Entity::find()
            .filter(product_attribute::Column::DeletedAt.is_null())
            .order_by_asc(product_attribute::Column::Name)
            .all(&self.db)
            .await?;
        let values = product_attribute_value::Entity::find()
            .filter(product_attribute_value::Column::DeletedAt.is_null())
            .order_by_asc(product_attribute_value::Column::Value)
            .all(&self.db)
            .await?;

        let mut grouped: HashMap<Uuid, Vec<AttributeValue>> = HashMap::new();
        for value in values {
            grouped
                .entry(value.attribute_id)
                .or_default()
                .push(value.into());
        }

        Ok(attributes
            .into_iter()
            .map(|attribute| AttributeWithValues {
                values: grouped.remove(&attribute.id).unwrap_or_default(),
                id: attribute.id,
                name: attribute.name,
            })
            .collect())
    }
}
