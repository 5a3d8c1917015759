//! Catalog Domain
//!
//! Category tree, product querying, and variant inventory for the commerce
//! backend. The HTTP layer lives elsewhere; this crate is the whole of the
//! catalog's business logic.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────┐
//! │          Services            │  ← validation, business rules
//! │  Category / Product /        │
//! │  Variant / Attribute         │
//! │  + InventoryLedger           │  ← sole mutator of stock
//! │  + ProductQueryEngine        │  ← filtering, sorting, pagination
//! └──────────────┬───────────────┘
//!                │
//! ┌──────────────▼───────────────┐
//! │     Repositories (traits)    │  ← data access, atomic primitives
//! └──────────────┬───────────────┘
//! ┌──────────────▼───────────────┐
//! │   PostgreSQL (SeaORM)        │  ← entities, transactions
//! └──────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_catalog::{CategoryService, PgCategoryRepository};
//! use sea_orm::Database;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::connect("postgres://...").await?;
//! let categories = CategoryService::new(PgCategoryRepository::new(db));
//! # Ok(())
//! # }
//! ```

pub mod entity;
pub mod error;
pub mod inventory;
pub mod models;
pub mod postgres;
pub mod query;
pub mod repository;
pub mod service;
pub mod slug;
pub mod tree;

pub use error::{CatalogError, CatalogResult, ErrorKind};
pub use inventory::InventoryLedger;
pub use models::{
    Attribute, AttributeValue, AttributeWithValues, BulkOperationSummary, Category,
    CategoryProductCount, CategoryTreeNode, CreateAttribute, CreateAttributeValue, CreateCategory,
    CreateImage, CreateProduct, CreateVariant, Page, PageInfo, Product, ProductDetail,
    ProductFilter, ProductImage, ProductQuery, ProductSummary, SortField, SortOrder,
    StockOperation, StockUpdate, UpdateCategory, UpdateImage, UpdateProduct, UpdateVariant,
    Variant, VariantAttributeLink, VariantDetail, MAX_PAGE_SIZE,
};
pub use postgres::{
    PgAttributeRepository, PgCategoryRepository, PgProductRepository, PgVariantRepository,
};
pub use query::ProductQueryEngine;
pub use repository::{
    AttributeRepository, CategoryRepository, ProductRepository, VariantRepository,
};
pub use service::{AttributeService, CategoryService, ProductService, VariantService};
