//! Product query engine: multi-predicate filtering, sorting, and pagination
//! over products, composed into listing rows with derived price/stock values.
//!
//! The engine resolves the category slug to subtree ids up front, normalizes
//! paging, pushes the predicates to the store, then batch-fetches variants
//! and images for just the returned page.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::instrument;
use uuid::Uuid;

use crate::error::CatalogResult;
use crate::models::{
    Page, PageInfo, Product, ProductFilter, ProductImage, ProductQuery, ProductSummary, Variant,
};
use crate::repository::{CategoryRepository, ProductRepository};

pub struct ProductQueryEngine<P: ProductRepository, C: CategoryRepository> {
    products: Arc<P>,
    categories: Arc<C>,
}

impl<P: ProductRepository, C: CategoryRepository> ProductQueryEngine<P, C> {
    pub fn new(products: Arc<P>, categories: Arc<C>) -> Self {
        Self {
            products,
            categories,
        }
    }

    /// Run the listing. All supplied predicates are AND'd; an unknown
    /// category slug short-circuits to an empty page rather than an error.
    #[instrument(skip(self, filter), fields(page = filter.page))]
    pub async fn list(&self, filter: ProductFilter) -> CatalogResult<Page<ProductSummary>> {
        let page = filter.normalized_page();
        let page_size = filter.normalized_page_size();

        let category_ids = match &filter.category_slug {
            Some(slug) => match self.categories.get_by_slug(slug).await? {
                Some(category) => Some(self.categories.descendant_ids(category.id, true).await?),
                None => {
                    return Ok(Page {
                        items: Vec::new(),
                        pagination: PageInfo::new(page, page_size, 0),
                    });
                }
            },
            None => None,
        };

        let query = ProductQuery {
            category_ids,
            min_price: filter.min_price,
            max_price: filter.max_price,
            is_featured: filter.is_featured,
            in_stock_only: filter.in_stock_only,
            attribute_values: filter.attribute_values,
            search: filter.search,
            sort_by: filter.sort_by,
            sort_order: filter.sort_order,
            page,
            page_size,
        };

        let (products, total_items) = self.products.search(query).await?;
        let items = self.summarize(products).await?;

        Ok(Page {
            items,
            pagination: PageInfo::new(page, page_size, total_items),
        })
    }

    /// Derive listing rows from one batched variant fetch and one batched
    /// image fetch for the page.
    async fn summarize(&self, products: Vec<Product>) -> CatalogResult<Vec<ProductSummary>> {
        if products.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = products.iter().map(|p| p.id).collect();
        let mut variants_by_product: HashMap<Uuid, Vec<Variant>> = HashMap::new();
        for variant in self.products.variants_for_products(ids.clone()).await? {
            variants_by_product
                .entry(variant.product_id)
                .or_default()
                .push(variant);
        }
        let mut images_by_product: HashMap<Uuid, Vec<ProductImage>> = HashMap::new();
        for image in self.products.images_for_products(ids).await? {
            images_by_product
                .entry(image.product_id)
                .or_default()
                .push(image);
        }

        Ok(products
            .iter()
            .map(|product| {
                let variants = variants_by_product
                    .get(&product.id)
                    .map_or(&[][..], |v| v.as_slice());
                let images = images_by_product
                    .get(&product.id)
                    .map_or(&[][..], |v| v.as_slice());
                ProductSummary::from_parts(product, variants, images)
            })
            .collect())
    }
}

impl<P: ProductRepository, C: CategoryRepository> Clone for ProductQueryEngine<P, C> {
    fn clone(&self) -> Self {
        Self {
            products: Arc::clone(&self.products),
            categories: Arc::clone(&self.categories),
        }
    }
}
