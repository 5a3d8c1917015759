use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;
use validator::Validate;

/// Hard cap on page size, regardless of what the caller asks for.
pub const MAX_PAGE_SIZE: u64 = 100;
pub const DEFAULT_PAGE_SIZE: u64 = 20;

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

/// Category node. `tree_left`/`tree_right` are the nested-set interval; all
/// descendants fall strictly inside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub parent_id: Option<Uuid>,
    pub tree_left: i64,
    pub tree_right: i64,
    /// Root = 0.
    pub depth: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Tombstone timestamp; set means the row is excluded from default reads.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Category {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// DTO for creating a category.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCategory {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// Explicit slug; generated from the name when absent.
    #[validate(length(min = 1, max = 255))]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    #[validate(length(max = 500))]
    pub image_url: Option<String>,
    pub parent_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

/// DTO for partial category updates. `parent_id: Some(None)` moves the node
/// to the root level; `None` leaves the tree untouched.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateCategory {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<Option<String>>,
    pub parent_id: Option<Option<Uuid>>,
    pub is_active: Option<bool>,
}

/// One node of the materialized category tree.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryTreeNode {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub depth: i32,
    /// Active, non-deleted products in this node's whole subtree.
    pub product_count: u64,
    pub children: Vec<CategoryTreeNode>,
}

/// Per-category direct product count with the category's interval, used to
/// aggregate subtree counts without further queries.
#[derive(Debug, Clone, Copy)]
pub struct CategoryProductCount {
    pub category_id: Uuid,
    pub tree_left: i64,
    pub tree_right: i64,
    pub product_count: u64,
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub category_id: Uuid,
    /// Default price; variants may override it.
    pub base_price: Decimal,
    pub is_active: bool,
    pub is_featured: bool,
    pub meta_title: String,
    pub meta_description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Product {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Minimum of the base price and all active variants' overrides.
    pub fn min_price(&self, variants: &[Variant]) -> Decimal {
        self.active_prices(variants)
            .min()
            .map_or(self.base_price, |p| p.min(self.base_price))
    }

    /// Maximum of the base price and all active variants' overrides.
    pub fn max_price(&self, variants: &[Variant]) -> Decimal {
        self.active_prices(variants)
            .max()
            .map_or(self.base_price, |p| p.max(self.base_price))
    }

    /// Stock summed over active variants.
    pub fn total_stock(&self, variants: &[Variant]) -> i64 {
        variants
            .iter()
            .filter(|v| v.is_live())
            .map(|v| i64::from(v.stock_quantity))
            .sum()
    }

    /// True when any active variant has stock.
    pub fn is_in_stock(&self, variants: &[Variant]) -> bool {
        variants.iter().any(|v| v.is_live() && v.stock_quantity > 0)
    }

    fn active_prices<'a>(&self, variants: &'a [Variant]) -> impl Iterator<Item = Decimal> + 'a {
        variants.iter().filter(|v| v.is_live()).filter_map(|v| v.price)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateProduct {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 255))]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    pub category_id: Uuid,
    pub base_price: Decimal,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
    #[validate(length(max = 70))]
    pub meta_title: Option<String>,
    #[validate(length(max = 160))]
    pub meta_description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateProduct {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub base_price: Option<Decimal>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
    #[validate(length(max = 70))]
    pub meta_title: Option<String>,
    #[validate(length(max = 160))]
    pub meta_description: Option<String>,
}

/// Listing row: product plus values derived from its variants and images.
#[derive(Debug, Clone, Serialize)]
pub struct ProductSummary {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub category_id: Uuid,
    pub base_price: Decimal,
    pub min_price: Decimal,
    pub max_price: Decimal,
    pub total_stock: i64,
    pub is_in_stock: bool,
    pub is_featured: bool,
    pub primary_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ProductSummary {
    /// `variants` and `images` are the product's own rows (non-deleted);
    /// active-variant filtering happens in the derivations.
    pub fn from_parts(product: &Product, variants: &[Variant], images: &[ProductImage]) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            slug: product.slug.clone(),
            category_id: product.category_id,
            base_price: product.base_price,
            min_price: product.min_price(variants),
            max_price: product.max_price(variants),
            total_stock: product.total_stock(variants),
            is_in_stock: product.is_in_stock(variants),
            is_featured: product.is_featured,
            primary_image_url: primary_image(images).map(|i| i.image_url.clone()),
            created_at: product.created_at,
        }
    }
}

/// The flagged primary image, else the first by position.
pub fn primary_image(images: &[ProductImage]) -> Option<&ProductImage> {
    images.iter().find(|i| i.is_primary).or_else(|| images.first())
}

/// Detail view: the product composed with its category, images, and variants.
#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail {
    pub product: Product,
    pub category: Category,
    pub images: Vec<ProductImage>,
    pub variants: Vec<VariantDetail>,
    pub min_price: Decimal,
    pub max_price: Decimal,
    pub total_stock: i64,
    pub is_in_stock: bool,
}

// ---------------------------------------------------------------------------
// Variants
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variant {
    pub id: Uuid,
    pub product_id: Uuid,
    pub sku: String,
    pub name: String,
    /// `None` means "use the product's base price".
    pub price: Option<Decimal>,
    pub stock_quantity: i32,
    pub low_stock_threshold: i32,
    /// Grams.
    pub weight: Option<Decimal>,
    pub length: Option<Decimal>,
    pub width: Option<Decimal>,
    pub height: Option<Decimal>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Variant {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Active and not tombstoned.
    pub fn is_live(&self) -> bool {
        self.is_active && !self.is_deleted()
    }

    /// Own price if set, else the given base price.
    pub fn effective_price(&self, base_price: Decimal) -> Decimal {
        self.price.unwrap_or(base_price)
    }

    pub fn is_in_stock(&self) -> bool {
        self.stock_quantity > 0
    }

    pub fn is_low_stock(&self) -> bool {
        self.stock_quantity <= self.low_stock_threshold
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateVariant {
    pub product_id: Uuid,
    #[validate(length(min = 1, max = 100))]
    pub sku: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub price: Option<Decimal>,
    pub stock_quantity: Option<i32>,
    pub low_stock_threshold: Option<i32>,
    pub weight: Option<Decimal>,
    pub length: Option<Decimal>,
    pub width: Option<Decimal>,
    pub height: Option<Decimal>,
    pub is_active: Option<bool>,
    /// Attribute values this variant represents (e.g. Red + Large). Unknown
    /// ids are skipped, not rejected.
    #[serde(default)]
    pub attribute_value_ids: Vec<Uuid>,
}

/// Partial variant update. Stock is absent on purpose: quantity changes go
/// through the inventory ledger only. `attribute_value_ids: Some(_)` (even
/// empty) replaces the whole association set; `None` leaves it alone.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateVariant {
    #[validate(length(min = 1, max = 100))]
    pub sku: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub price: Option<Option<Decimal>>,
    pub low_stock_threshold: Option<i32>,
    pub weight: Option<Option<Decimal>>,
    pub length: Option<Option<Decimal>>,
    pub width: Option<Option<Decimal>>,
    pub height: Option<Option<Decimal>>,
    pub is_active: Option<bool>,
    pub attribute_value_ids: Option<Vec<Uuid>>,
}

/// Variant with its attribute name/value pairs resolved.
#[derive(Debug, Clone, Serialize)]
pub struct VariantDetail {
    pub variant: Variant,
    pub attributes: Vec<VariantAttributeLink>,
}

/// One resolved variant↔attribute-value association.
#[derive(Debug, Clone, Serialize)]
pub struct VariantAttributeLink {
    pub variant_id: Uuid,
    pub attribute_id: Uuid,
    pub attribute: String,
    pub value_id: Uuid,
    pub value: String,
}

// ---------------------------------------------------------------------------
// Stock
// ---------------------------------------------------------------------------

/// How a stock update is applied.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StockOperation {
    /// Replace the quantity.
    #[default]
    Set,
    /// Increment.
    Add,
    /// Conditional decrement; fails rather than going negative.
    Reduce,
}

/// One entry of a bulk stock update.
#[derive(Debug, Clone, Deserialize)]
pub struct StockUpdate {
    pub variant_id: Uuid,
    pub quantity: i32,
    #[serde(default)]
    pub operation: StockOperation,
}

/// Outcome of a bulk operation. Entries are attempted independently; one
/// failure never rolls back the others.
#[derive(Debug, Clone, Serialize)]
pub struct BulkOperationSummary {
    pub success_count: usize,
    pub failed_count: usize,
    pub failed_ids: Vec<Uuid>,
    pub message: String,
}

impl BulkOperationSummary {
    pub fn new(success_count: usize, failed_ids: Vec<Uuid>, noun: &str) -> Self {
        Self {
            success_count,
            failed_count: failed_ids.len(),
            message: format!("Updated {} {}.", success_count, noun),
            failed_ids,
        }
    }
}

// ---------------------------------------------------------------------------
// Attributes
// ---------------------------------------------------------------------------

/// A named dimension, e.g. "Size".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attribute {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// One instance of an attribute, e.g. "Large".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeValue {
    pub id: Uuid,
    pub attribute_id: Uuid,
    pub value: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttributeWithValues {
    pub id: Uuid,
    pub name: String,
    pub values: Vec<AttributeValue>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAttribute {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAttributeValue {
    pub attribute_id: Uuid,
    #[validate(length(min = 1, max = 100))]
    pub value: String,
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductImage {
    pub id: Uuid,
    pub product_id: Uuid,
    pub image_url: String,
    pub alt_text: String,
    pub position: i32,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateImage {
    pub product_id: Uuid,
    #[validate(length(min = 1, max = 500))]
    pub image_url: String,
    #[serde(default)]
    pub alt_text: String,
    pub position: Option<i32>,
    pub is_primary: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateImage {
    #[validate(length(min = 1, max = 500))]
    pub image_url: Option<String>,
    pub alt_text: Option<String>,
    pub position: Option<i32>,
    pub is_primary: Option<bool>,
}

// ---------------------------------------------------------------------------
// Listing filters & pagination
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, Default)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SortField {
    #[default]
    CreatedAt,
    /// Sorts on the base price.
    Price,
    Name,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, Default)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Caller-facing listing filter. All predicates are optional and AND'd.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductFilter {
    /// Matches the category and its whole subtree.
    pub category_slug: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub is_featured: Option<bool>,
    #[serde(default)]
    pub in_stock_only: bool,
    /// Every listed value id must be carried by at least one active variant.
    #[serde(default)]
    pub attribute_values: Vec<Uuid>,
    /// Case-insensitive substring over name, description, and variant SKUs.
    pub search: Option<String>,
    #[serde(default)]
    pub sort_by: SortField,
    #[serde(default)]
    pub sort_order: SortOrder,
    /// 1-indexed.
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

impl Default for ProductFilter {
    fn default() -> Self {
        Self {
            category_slug: None,
            min_price: None,
            max_price: None,
            is_featured: None,
            in_stock_only: false,
            attribute_values: Vec::new(),
            search: None,
            sort_by: SortField::default(),
            sort_order: SortOrder::default(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ProductFilter {
    pub fn normalized_page(&self) -> u64 {
        self.page.max(1)
    }

    pub fn normalized_page_size(&self) -> u64 {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }
}

fn default_page() -> u64 {
    1
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

/// Store-facing query: the filter with the category subtree already resolved
/// to concrete ids and page values normalized.
#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
    /// `None` = no category predicate. Never empty: an unknown slug is
    /// short-circuited before the store is queried.
    pub category_ids: Option<Vec<Uuid>>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub is_featured: Option<bool>,
    pub in_stock_only: bool,
    pub attribute_values: Vec<Uuid>,
    pub search: Option<String>,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
    pub page: u64,
    pub page_size: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: PageInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    pub page: u64,
    pub page_size: u64,
    pub total_items: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PageInfo {
    /// `total_pages` is at least 1 so "page 1 of 1" holds for empty results;
    /// a page past the end simply reports no neighbors forward.
    pub fn new(page: u64, page_size: u64, total_items: u64) -> Self {
        let total_pages = if total_items == 0 {
            1
        } else {
            total_items.div_ceil(page_size)
        };
        Self {
            page,
            page_size,
            total_items,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}
