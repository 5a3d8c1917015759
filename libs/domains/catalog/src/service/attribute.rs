use std::sync::Arc;

use tracing::instrument;
use validator::Validate;

use crate::error::{CatalogError, CatalogResult};
use crate::models::{
    Attribute, AttributeValue, AttributeWithValues, CreateAttribute, CreateAttributeValue,
};
use crate::repository::AttributeRepository;

/// Service layer for attribute dimensions and their values.
pub struct AttributeService<R: AttributeRepository> {
    repository: Arc<R>,
}

impl<R: AttributeRepository> AttributeService<R> {
    pub fn new(repository: R) -> Self {
        Self {
            repository: Arc::new(repository),
        }
    }

    /// Create a dimension ("Size"). Names are unique across all rows ever
    /// created, matching the unique index.
    #[instrument(skip(self, input), fields(attribute_name = %input.name))]
    pub async fn create_attribute(&self, input: CreateAttribute) -> CatalogResult<Attribute> {
        input
            .validate()
            .map_err(|e| CatalogError::Validation(e.to_string()))?;

        if self.repository.attribute_name_exists(&input.name).await? {
            return Err(CatalogError::DuplicateAttribute(input.name.clone()));
        }

        self.repository.create_attribute(input).await
    }

    /// Create one value of a dimension ("Large"), unique per dimension.
    #[instrument(skip(self, input), fields(attribute_id = %input.attribute_id))]
    pub async fn create_attribute_value(
        &self,
        input: CreateAttributeValue,
    ) -> CatalogResult<AttributeValue> {
        input
            .validate()
            .map_err(|e| CatalogError::Validation(e.to_string()))?;

        self.repository
            .get_attribute(input.attribute_id)
            .await?
            .ok_or(CatalogError::AttributeNotFound(input.attribute_id))?;

        if self
            .repository
            .value_exists(input.attribute_id, &input.value)
            .await?
        {
            return Err(CatalogError::DuplicateAttributeValue(input.value.clone()));
        }

        self.repository.create_value(input).await
    }

    /// All attributes with their values, name-ordered.
    pub async fn list_attributes(&self) -> CatalogResult<Vec<AttributeWithValues>> {
        self.repository.list_with_values().await
    }
}

impl<R: AttributeRepository> Clone for AttributeService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}
