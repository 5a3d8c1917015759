use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::error::{CatalogError, CatalogResult};
use crate::models::{
    BulkOperationSummary, CreateImage, CreateProduct, Page, Product, ProductDetail, ProductFilter,
    ProductImage, ProductSummary, UpdateImage, UpdateProduct, VariantDetail,
};
use crate::query::ProductQueryEngine;
use crate::repository::{CategoryRepository, ProductRepository};
use crate::slug;

/// Service layer for product business logic: CRUD orchestration, the listing
/// entry point, image management, and the composed detail view.
pub struct ProductService<P: ProductRepository, C: CategoryRepository> {
    products: Arc<P>,
    categories: Arc<C>,
    query_engine: ProductQueryEngine<P, C>,
}

impl<P: ProductRepository, C: CategoryRepository> ProductService<P, C> {
    pub fn new(products: P, categories: C) -> Self {
        let products = Arc::new(products);
        let categories = Arc::new(categories);
        Self {
            query_engine: ProductQueryEngine::new(Arc::clone(&products), Arc::clone(&categories)),
            products,
            categories,
        }
    }

    /// Create a product under an active category. Slug generation mirrors
    /// categories: slugified name, `-1`, `-2`… on collision, scoped across
    /// all products ever created.
    #[instrument(skip(self, input), fields(product_name = %input.name))]
    pub async fn create_product(&self, input: CreateProduct) -> CatalogResult<Product> {
        input
            .validate()
            .map_err(|e| CatalogError::Validation(e.to_string()))?;
        if input.base_price < Decimal::ZERO {
            return Err(CatalogError::Validation(
                "base price cannot be negative".to_string(),
            ));
        }

        self.require_active_category(input.category_id).await?;

        let slug = match &input.slug {
            Some(explicit) => explicit.clone(),
            None => self.generate_unique_slug(&input.name).await?,
        };

        self.products.create(input, slug).await
    }

    /// Partial update; a category change must point at an active category.
    #[instrument(skip(self, input), fields(product_id = %id))]
    pub async fn update_product(&self, id: Uuid, input: UpdateProduct) -> CatalogResult<Product> {
        input
            .validate()
            .map_err(|e| CatalogError::Validation(e.to_string()))?;
        if let Some(base_price) = input.base_price {
            if base_price < Decimal::ZERO {
                return Err(CatalogError::Validation(
                    "base price cannot be negative".to_string(),
                ));
            }
        }

        if let Some(category_id) = input.category_id {
            self.require_active_category(category_id).await?;
        }

        self.products.update(id, input).await
    }

    /// Tombstone the product and, in the same transaction, its variants and
    /// images.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn delete_product(&self, id: Uuid) -> CatalogResult<()> {
        self.products.soft_delete_cascade(id).await
    }

    pub async fn get_product(&self, id: Uuid) -> CatalogResult<Product> {
        self.products
            .get_by_id(id)
            .await?
            .ok_or(CatalogError::ProductNotFound(id))
    }

    /// Composed detail view for public reads: category, ordered images, and
    /// variants with resolved attribute values.
    #[instrument(skip(self))]
    pub async fn get_by_slug(&self, slug: &str) -> CatalogResult<ProductDetail> {
        let product = self
            .products
            .get_by_slug(slug)
            .await?
            .ok_or_else(|| CatalogError::UnknownProductSlug(slug.to_string()))?;

        let category = self
            .categories
            .get_by_id(product.category_id)
            .await?
            .ok_or(CatalogError::CategoryNotFound(product.category_id))?;

        let variants = self
            .products
            .variants_for_products(vec![product.id])
            .await?;
        let images = self.products.images_for_products(vec![product.id]).await?;

        let variant_ids: Vec<Uuid> = variants.iter().map(|v| v.id).collect();
        let mut links_by_variant: HashMap<Uuid, Vec<_>> = HashMap::new();
        for link in self
            .products
            .attribute_values_for_variants(variant_ids)
            .await?
        {
            links_by_variant
                .entry(link.variant_id)
                .or_default()
                .push(link);
        }

        let min_price = product.min_price(&variants);
        let max_price = product.max_price(&variants);
        let total_stock = product.total_stock(&variants);
        let is_in_stock = product.is_in_stock(&variants);

        let variants = variants
            .into_iter()
            .map(|variant| VariantDetail {
                attributes: links_by_variant.remove(&variant.id).unwrap_or_default(),
                variant,
            })
            .collect();

        Ok(ProductDetail {
            product,
            category,
            images,
            variants,
            min_price,
            max_price,
            total_stock,
            is_in_stock,
        })
    }

    /// Listing via the query engine.
    pub async fn list_products(&self, filter: ProductFilter) -> CatalogResult<Page<ProductSummary>> {
        self.query_engine.list(filter).await
    }

    /// Apply one partial update to many products, each attempted
    /// independently: a failing id is recorded and the rest proceed.
    #[instrument(skip(self, updates), fields(products = ids.len()))]
    pub async fn bulk_update_products(
        &self,
        ids: Vec<Uuid>,
        updates: UpdateProduct,
    ) -> BulkOperationSummary {
        let mut success_count = 0;
        let mut failed_ids = Vec::new();

        for id in ids {
            match self.update_product(id, updates.clone()).await {
                Ok(_) => success_count += 1,
                Err(error) => {
                    tracing::warn!(product_id = %id, %error, "bulk product entry failed");
                    failed_ids.push(id);
                }
            }
        }

        BulkOperationSummary::new(success_count, failed_ids, "products")
    }

    /// Attach an image. The product's first image becomes primary
    /// automatically; an explicit primary displaces the previous one.
    #[instrument(skip(self, input), fields(product_id = %input.product_id))]
    pub async fn add_image(&self, input: CreateImage) -> CatalogResult<ProductImage> {
        input
            .validate()
            .map_err(|e| CatalogError::Validation(e.to_string()))?;

        self.products
            .get_by_id(input.product_id)
            .await?
            .ok_or(CatalogError::ProductNotFound(input.product_id))?;

        self.products.create_image(input).await
    }

    /// Partial image update; promoting to primary demotes the current one.
    #[instrument(skip(self, input), fields(image_id = %id))]
    pub async fn update_image(&self, id: Uuid, input: UpdateImage) -> CatalogResult<ProductImage> {
        input
            .validate()
            .map_err(|e| CatalogError::Validation(e.to_string()))?;

        self.products.update_image(id, input).await
    }

    #[instrument(skip(self), fields(image_id = %id))]
    pub async fn delete_image(&self, id: Uuid) -> CatalogResult<()> {
        if !self.products.soft_delete_image(id).await? {
            return Err(CatalogError::ImageNotFound(id));
        }
        Ok(())
    }

    /// Rewrite positions to match the given order (0-based). Unknown ids are
    /// skipped; returns how many images moved.
    #[instrument(skip(self, image_ids), fields(images = image_ids.len()))]
    pub async fn reorder_images(&self, image_ids: Vec<Uuid>) -> CatalogResult<u64> {
        self.products.reorder_images(image_ids).await
    }

    async fn require_active_category(&self, category_id: Uuid) -> CatalogResult<()> {
        match self.categories.get_by_id(category_id).await? {
            Some(category) if category.is_active => Ok(()),
            _ => Err(CatalogError::CategoryNotFound(category_id)),
        }
    }

    async fn generate_unique_slug(&self, name: &str) -> CatalogResult<String> {
        let base = slug::slugify(name);
        let base = if base.is_empty() {
            "product".to_string()
        } else {
            base
        };

        if !self.products.slug_exists(&base).await? {
            return Ok(base);
        }
        let mut counter = 1;
        loop {
            let candidate = slug::suffixed(&base, counter);
            if !self.products.slug_exists(&candidate).await? {
                return Ok(candidate);
            }
            counter += 1;
        }
    }
}

impl<P: ProductRepository, C: CategoryRepository> Clone for ProductService<P, C> {
    fn clone(&self) -> Self {
        Self {
            products: Arc::clone(&self.products),
            categories: Arc::clone(&self.categories),
            query_engine: self.query_engine.clone(),
        }
    }
}
