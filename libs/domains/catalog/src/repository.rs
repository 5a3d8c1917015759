//! Data-access traits. One implementation per store; services stay generic
//! so unit tests can mock the store entirely.
//!
//! Conventions shared by all implementations:
//! - default reads exclude tombstoned rows (`deleted_at IS NULL`);
//! - slug/SKU existence checks span tombstoned rows — identifiers are never
//!   reused;
//! - multi-step mutations run inside a single transaction.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::CatalogResult;
use crate::models::{
    Attribute, AttributeValue, AttributeWithValues, Category, CategoryProductCount,
    CreateAttribute, CreateAttributeValue, CreateCategory, CreateImage, CreateProduct,
    CreateVariant, Product, ProductImage, ProductQuery, UpdateCategory, UpdateImage,
    UpdateProduct, UpdateVariant, Variant, VariantAttributeLink,
};

/// Category persistence, including every structural tree operation. The
/// nested-set interval columns are touched here and nowhere else.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Insert with a computed tree placement. `slug` is already resolved.
    /// Fails with `ParentCategoryNotFound` when `input.parent_id` misses.
    async fn create(&self, input: CreateCategory, slug: String) -> CatalogResult<Category>;

    async fn get_by_id(&self, id: Uuid) -> CatalogResult<Option<Category>>;

    /// Active, non-deleted only.
    async fn get_by_slug(&self, slug: &str) -> CatalogResult<Option<Category>>;

    /// Non-deleted categories ordered by tree position.
    async fn list(&self, include_inactive: bool) -> CatalogResult<Vec<Category>>;

    /// Partial field update; routes a `parent_id` change through the tree
    /// move (with `CircularReference` validation) in the same transaction.
    async fn update(&self, id: Uuid, input: UpdateCategory) -> CatalogResult<Category>;

    /// Relocate a subtree under a new parent (`None` = root level).
    async fn move_node(&self, id: Uuid, new_parent_id: Option<Uuid>) -> CatalogResult<Category>;

    /// Tombstone the category and all its descendants. Returns the number of
    /// rows affected.
    async fn soft_delete_subtree(&self, id: Uuid) -> CatalogResult<u64>;

    /// Root → immediate parent.
    async fn ancestors(&self, id: Uuid) -> CatalogResult<Vec<Category>>;

    /// Ids of all non-deleted categories in the subtree — one range
    /// predicate, no recursion.
    async fn descendant_ids(&self, id: Uuid, include_self: bool) -> CatalogResult<Vec<Uuid>>;

    /// Spans tombstoned rows.
    async fn slug_exists(&self, slug: &str) -> CatalogResult<bool>;

    /// Any non-deleted product referencing the category directly.
    async fn has_undeleted_products(&self, id: Uuid) -> CatalogResult<bool>;

    /// Direct active-product counts for every non-deleted category, with
    /// intervals for subtree aggregation.
    async fn product_counts(&self) -> CatalogResult<Vec<CategoryProductCount>>;
}

/// Product persistence plus the listing query and image ownership.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Insert with a resolved slug.
    async fn create(&self, input: CreateProduct, slug: String) -> CatalogResult<Product>;

    async fn get_by_id(&self, id: Uuid) -> CatalogResult<Option<Product>>;

    /// Active, non-deleted only.
    async fn get_by_slug(&self, slug: &str) -> CatalogResult<Option<Product>>;

    async fn update(&self, id: Uuid, input: UpdateProduct) -> CatalogResult<Product>;

    /// Tombstone the product together with its variants and images, in one
    /// transaction.
    async fn soft_delete_cascade(&self, id: Uuid) -> CatalogResult<()>;

    /// Spans tombstoned rows.
    async fn slug_exists(&self, slug: &str) -> CatalogResult<bool>;

    /// Filtered, sorted, paginated ids over active, non-deleted products.
    /// Returns the page of products and the total match count.
    async fn search(&self, query: ProductQuery) -> CatalogResult<(Vec<Product>, u64)>;

    /// Non-deleted variants of the given products, for derived values.
    async fn variants_for_products(&self, product_ids: Vec<Uuid>) -> CatalogResult<Vec<Variant>>;

    /// Non-deleted images of the given products, ordered by position.
    async fn images_for_products(&self, product_ids: Vec<Uuid>) -> CatalogResult<Vec<ProductImage>>;

    /// Resolved attribute name/value pairs for the given variants.
    async fn attribute_values_for_variants(
        &self,
        variant_ids: Vec<Uuid>,
    ) -> CatalogResult<Vec<VariantAttributeLink>>;

    /// Insert an image, keeping the one-primary-per-product invariant: the
    /// product's first image becomes primary regardless of the input, and an
    /// explicit primary clears the previous one.
    async fn create_image(&self, input: CreateImage) -> CatalogResult<ProductImage>;

    async fn get_image(&self, id: Uuid) -> CatalogResult<Option<ProductImage>>;

    /// Partial image update; setting `is_primary` clears the product's other
    /// primary flag in the same transaction.
    async fn update_image(&self, id: Uuid, input: UpdateImage) -> CatalogResult<ProductImage>;

    async fn soft_delete_image(&self, id: Uuid) -> CatalogResult<bool>;

    /// Rewrite positions to the order of `image_ids` (0-based). Unknown ids
    /// are skipped; returns how many rows were repositioned.
    async fn reorder_images(&self, image_ids: Vec<Uuid>) -> CatalogResult<u64>;
}

/// Variant persistence and the atomic stock primitives. Every stock write in
/// the system lands on one of the three `*_stock` methods below.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VariantRepository: Send + Sync {
    /// Insert the variant and its attribute links in one transaction.
    /// `attribute_value_ids` is already filtered to known values.
    async fn create(
        &self,
        input: CreateVariant,
        attribute_value_ids: Vec<Uuid>,
    ) -> CatalogResult<Variant>;

    async fn get_by_id(&self, id: Uuid) -> CatalogResult<Option<Variant>>;

    /// Partial update; `replacement_values: Some(_)` swaps the whole
    /// attribute link set inside the same transaction.
    async fn update(
        &self,
        id: Uuid,
        input: UpdateVariant,
        replacement_values: Option<Vec<Uuid>>,
    ) -> CatalogResult<Variant>;

    async fn soft_delete(&self, id: Uuid) -> CatalogResult<bool>;

    /// Spans tombstoned rows; `exclude` skips the variant being updated.
    async fn sku_exists(&self, sku: &str, exclude: Option<Uuid>) -> CatalogResult<bool>;

    async fn product_exists(&self, product_id: Uuid) -> CatalogResult<bool>;

    /// Subset of `ids` that name existing, non-deleted attribute values.
    async fn known_attribute_value_ids(&self, ids: Vec<Uuid>) -> CatalogResult<Vec<Uuid>>;

    /// Overwrite the quantity. Returns false when the variant is missing.
    async fn set_stock(&self, id: Uuid, quantity: i32) -> CatalogResult<bool>;

    /// Unconditional increment. Returns false when the variant is missing.
    async fn increment_stock(&self, id: Uuid, delta: i32) -> CatalogResult<bool>;

    /// Single conditional update: decrements only when the current quantity
    /// covers `delta`, judged by the store, not by a prior read. Returns
    /// false when nothing was updated (missing variant or not enough stock).
    async fn decrement_stock_if_available(&self, id: Uuid, delta: i32) -> CatalogResult<bool>;

    /// Active variants at or under their low-stock threshold.
    async fn low_stock(&self) -> CatalogResult<Vec<Variant>>;
}

/// Attribute dimension / value persistence.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AttributeRepository: Send + Sync {
    async fn create_attribute(&self, input: CreateAttribute) -> CatalogResult<Attribute>;

    async fn create_value(&self, input: CreateAttributeValue) -> CatalogResult<AttributeValue>;

    async fn get_attribute(&self, id: Uuid) -> CatalogResult<Option<Attribute>>;

    /// Spans tombstoned rows (the unique index does too).
    async fn attribute_name_exists(&self, name: &str) -> CatalogResult<bool>;

    async fn value_exists(&self, attribute_id: Uuid, value: &str) -> CatalogResult<bool>;

    /// Attributes with their values, both name-ordered.
    async fn list_with_values(&self) -> CatalogResult<Vec<AttributeWithValues>>;
}
