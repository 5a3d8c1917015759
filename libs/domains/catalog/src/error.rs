use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Category not found: {0}")]
    CategoryNotFound(Uuid),

    #[error("Category not found: {0}")]
    UnknownCategorySlug(String),

    #[error("Parent category not found: {0}")]
    ParentCategoryNotFound(Uuid),

    #[error("Product not found: {0}")]
    ProductNotFound(Uuid),

    #[error("Product not found: {0}")]
    UnknownProductSlug(String),

    #[error("Variant not found: {0}")]
    VariantNotFound(Uuid),

    #[error("Attribute not found: {0}")]
    AttributeNotFound(Uuid),

    #[error("Image not found: {0}")]
    ImageNotFound(Uuid),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Invalid stock quantity: {0}")]
    InvalidQuantity(i32),

    #[error("SKU already exists: {0}")]
    DuplicateSku(String),

    #[error("Attribute already exists: {0}")]
    DuplicateAttribute(String),

    #[error("Attribute value already exists: {0}")]
    DuplicateAttributeValue(String),

    #[error("Category cannot be moved under itself or one of its descendants")]
    CircularReference,

    #[error("Insufficient stock for variant {0}")]
    InsufficientStock(Uuid),

    #[error("Cannot delete category {0}: it still has products")]
    CategoryHasProducts(Uuid),

    #[error("Database error: {0}")]
    Database(String),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Coarse classification the API layer maps onto response codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    InsufficientStock,
    Conflict,
    Internal,
}

impl CatalogError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::CategoryNotFound(_)
            | CatalogError::UnknownCategorySlug(_)
            | CatalogError::ParentCategoryNotFound(_)
            | CatalogError::ProductNotFound(_)
            | CatalogError::UnknownProductSlug(_)
            | CatalogError::VariantNotFound(_)
            | CatalogError::AttributeNotFound(_)
            | CatalogError::ImageNotFound(_) => ErrorKind::NotFound,

            CatalogError::Validation(_)
            | CatalogError::InvalidQuantity(_)
            | CatalogError::DuplicateSku(_)
            | CatalogError::DuplicateAttribute(_)
            | CatalogError::DuplicateAttributeValue(_)
            | CatalogError::CircularReference => ErrorKind::Validation,

            CatalogError::InsufficientStock(_) => ErrorKind::InsufficientStock,

            CatalogError::CategoryHasProducts(_) => ErrorKind::Conflict,

            CatalogError::Database(_) => ErrorKind::Internal,
        }
    }
}

impl From<sea_orm::DbErr> for CatalogError {
    fn from(err: sea_orm::DbErr) -> Self {
        CatalogError::Database(err.to_string())
    }
}
