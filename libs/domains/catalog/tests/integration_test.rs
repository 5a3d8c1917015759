//! Integration tests for the catalog domain.
//!
//! These run against real PostgreSQL via testcontainers to cover what mocks
//! cannot: tree renumbering, the conditional stock decrement under
//! concurrency, unique-index-backed slug/SKU behavior, and the listing
//! predicates.

use domain_catalog::*;
use futures::future::join_all;
use test_utils::{assertions::*, TestDatabase, TestDataBuilder};
use uuid::Uuid;

fn category_input(name: &str, parent_id: Option<Uuid>) -> CreateCategory {
    CreateCategory {
        name: name.to_string(),
        slug: None,
        description: String::new(),
        image_url: None,
        parent_id,
        is_active: None,
    }
}

fn product_input(name: &str, category_id: Uuid, base_price: &str) -> CreateProduct {
    CreateProduct {
        name: name.to_string(),
        slug: None,
        description: String::new(),
        category_id,
        base_price: base_price.parse().unwrap(),
        is_active: None,
        is_featured: None,
        meta_title: None,
        meta_description: None,
    }
}

fn variant_input(product_id: Uuid, sku: String, stock: i32) -> CreateVariant {
    CreateVariant {
        product_id,
        sku,
        name: "Default".to_string(),
        price: None,
        stock_quantity: Some(stock),
        low_stock_threshold: None,
        weight: None,
        length: None,
        width: None,
        height: None,
        is_active: None,
        attribute_value_ids: Vec::new(),
    }
}

// ============================================================================
// Category tree
// ============================================================================

#[tokio::test]
async fn tree_scenario_ancestors_descendants_and_full_path() {
    let db = TestDatabase::new().await;
    let service = CategoryService::new(PgCategoryRepository::new(db.connection()));

    let electronics = service
        .create_category(category_input("Electronics", None))
        .await
        .unwrap();
    let phones = service
        .create_category(category_input("Phones", Some(electronics.id)))
        .await
        .unwrap();
    let smartphones = service
        .create_category(category_input("Smartphones", Some(phones.id)))
        .await
        .unwrap();

    assert_eq!(electronics.depth, 0);
    assert_eq!(phones.depth, 1);
    assert_eq!(smartphones.depth, 2);

    let path = service.full_path(smartphones.id).await.unwrap();
    assert_eq!(path, "Electronics > Phones > Smartphones");

    let repo = PgCategoryRepository::new(db.connection());
    let ancestors = CategoryRepository::ancestors(&repo, smartphones.id)
        .await
        .unwrap();
    let ancestor_names: Vec<&str> = ancestors.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(ancestor_names, ["Electronics", "Phones"]);

    let descendants = CategoryRepository::descendant_ids(&repo, electronics.id, true)
        .await
        .unwrap();
    assert!(descendants.contains(&electronics.id));
    assert!(descendants.contains(&phones.id));
    assert!(descendants.contains(&smartphones.id));
    assert_eq!(descendants.len(), 3);

    let without_self = CategoryRepository::descendant_ids(&repo, electronics.id, false)
        .await
        .unwrap();
    assert!(!without_self.contains(&electronics.id));
    assert_eq!(without_self.len(), 2);
}

#[tokio::test]
async fn creating_child_keeps_intervals_nested() {
    let db = TestDatabase::new().await;
    let service = CategoryService::new(PgCategoryRepository::new(db.connection()));

    let root = service
        .create_category(category_input("Clothing", None))
        .await
        .unwrap();
    let child = service
        .create_category(category_input("Shirts", Some(root.id)))
        .await
        .unwrap();

    let root = service.get_category(root.id).await.unwrap();
    assert!(root.tree_left < child.tree_left);
    assert!(child.tree_right < root.tree_right);
}

#[tokio::test]
async fn move_under_own_descendant_fails_and_leaves_tree_unchanged() {
    let db = TestDatabase::new().await;
    let service = CategoryService::new(PgCategoryRepository::new(db.connection()));

    let root = service
        .create_category(category_input("Electronics", None))
        .await
        .unwrap();
    let child = service
        .create_category(category_input("Phones", Some(root.id)))
        .await
        .unwrap();

    let result = service
        .update_category(
            root.id,
            UpdateCategory {
                parent_id: Some(Some(child.id)),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(result, Err(CatalogError::CircularReference)));

    // Tree unchanged.
    let root_after = service.get_category(root.id).await.unwrap();
    let child_after = service.get_category(child.id).await.unwrap();
    assert_eq!(root_after.parent_id, None);
    assert_eq!(root_after.tree_left, root.tree_left);
    assert_eq!(root_after.tree_right, root.tree_right);
    assert_eq!(child_after.parent_id, Some(root.id));
}

#[tokio::test]
async fn moving_a_subtree_carries_descendants_along() {
    let db = TestDatabase::new().await;
    let service = CategoryService::new(PgCategoryRepository::new(db.connection()));

    let electronics = service
        .create_category(category_input("Electronics", None))
        .await
        .unwrap();
    let outlet = service
        .create_category(category_input("Outlet", None))
        .await
        .unwrap();
    let phones = service
        .create_category(category_input("Phones", Some(electronics.id)))
        .await
        .unwrap();
    let smartphones = service
        .create_category(category_input("Smartphones", Some(phones.id)))
        .await
        .unwrap();

    service
        .update_category(
            phones.id,
            UpdateCategory {
                parent_id: Some(Some(outlet.id)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let path = service.full_path(smartphones.id).await.unwrap();
    assert_eq!(path, "Outlet > Phones > Smartphones");

    let moved = service.get_category(phones.id).await.unwrap();
    assert_eq!(moved.parent_id, Some(outlet.id));
    assert_eq!(moved.depth, 1);

    let leaf = service.get_category(smartphones.id).await.unwrap();
    assert_eq!(leaf.depth, 2);

    let repo = PgCategoryRepository::new(db.connection());
    let old_subtree = CategoryRepository::descendant_ids(&repo, electronics.id, false)
        .await
        .unwrap();
    assert!(old_subtree.is_empty());
}

#[tokio::test]
async fn same_name_categories_get_suffixed_slugs() {
    let db = TestDatabase::new().await;
    let service = CategoryService::new(PgCategoryRepository::new(db.connection()));

    let first = service
        .create_category(category_input("Phones", None))
        .await
        .unwrap();
    let second = service
        .create_category(category_input("Phones", None))
        .await
        .unwrap();

    assert_eq!(first.slug, "phones");
    assert_eq!(second.slug, "phones-1");
}

#[tokio::test]
async fn deleted_category_slug_is_never_reused() {
    let db = TestDatabase::new().await;
    let service = CategoryService::new(PgCategoryRepository::new(db.connection()));

    let first = service
        .create_category(category_input("Audio", None))
        .await
        .unwrap();
    service.delete_category(first.id).await.unwrap();

    let second = service
        .create_category(category_input("Audio", None))
        .await
        .unwrap();
    assert_eq!(second.slug, "audio-1");
}

#[tokio::test]
async fn delete_with_live_product_is_refused_and_cascade_tombstones_subtree() {
    let db = TestDatabase::new().await;
    let categories = CategoryService::new(PgCategoryRepository::new(db.connection()));
    let products = ProductService::new(
        PgProductRepository::new(db.connection()),
        PgCategoryRepository::new(db.connection()),
    );

    let root = categories
        .create_category(category_input("Electronics", None))
        .await
        .unwrap();
    let child = categories
        .create_category(category_input("Phones", Some(root.id)))
        .await
        .unwrap();

    let product = products
        .create_product(product_input("Test Phone", root.id, "999.99"))
        .await
        .unwrap();

    // Refused: a non-deleted product references the category directly.
    let result = categories.delete_category(root.id).await;
    assert!(matches!(result, Err(CatalogError::CategoryHasProducts(c)) if c == root.id));
    assert!(categories.get_category(root.id).await.is_ok());

    // A product in the subtree does not block deleting an ancestor.
    categories.delete_category(child.id).await.unwrap();

    // After the product is gone, the cascade takes the whole subtree.
    products.delete_product(product.id).await.unwrap();
    categories.delete_category(root.id).await.unwrap();
    assert!(matches!(
        categories.get_category(root.id).await,
        Err(CatalogError::CategoryNotFound(_))
    ));
}

#[tokio::test]
async fn tree_view_counts_products_per_subtree() {
    let db = TestDatabase::new().await;
    let categories = CategoryService::new(PgCategoryRepository::new(db.connection()));
    let products = ProductService::new(
        PgProductRepository::new(db.connection()),
        PgCategoryRepository::new(db.connection()),
    );

    let root = categories
        .create_category(category_input("Electronics", None))
        .await
        .unwrap();
    let child = categories
        .create_category(category_input("Phones", Some(root.id)))
        .await
        .unwrap();

    products
        .create_product(product_input("Hub", root.id, "10.00"))
        .await
        .unwrap();
    products
        .create_product(product_input("Handset", child.id, "20.00"))
        .await
        .unwrap();

    let tree = categories.get_tree(false).await.unwrap();
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].product_count, 2);
    assert_eq!(tree[0].children.len(), 1);
    assert_eq!(tree[0].children[0].product_count, 1);
}

// ============================================================================
// Inventory ledger
// ============================================================================

#[tokio::test]
async fn concurrent_reducers_never_oversell() {
    let db = TestDatabase::new().await;
    let builder = TestDataBuilder::from_test_name("concurrent_reducers");
    let categories = CategoryService::new(PgCategoryRepository::new(db.connection()));
    let products = ProductService::new(
        PgProductRepository::new(db.connection()),
        PgCategoryRepository::new(db.connection()),
    );
    let variants = VariantService::new(PgVariantRepository::new(db.connection()));

    let category = categories
        .create_category(category_input("Electronics", None))
        .await
        .unwrap();
    let product = products
        .create_product(product_input("Test Phone", category.id, "999.99"))
        .await
        .unwrap();
    let variant = variants
        .create_variant(variant_input(product.id, builder.sku("race"), 10))
        .await
        .unwrap();

    let attempts: Vec<_> = (0..25)
        .map(|_| {
            let service = variants.clone();
            let id = variant.id;
            async move { service.update_stock(id, 1, StockOperation::Reduce).await }
        })
        .collect();
    let outcomes = join_all(attempts).await;

    let successes = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 10, "successful reductions must not exceed stock");
    for failure in outcomes.iter().filter_map(|r| r.as_ref().err()) {
        assert!(matches!(failure, CatalogError::InsufficientStock(_)));
    }

    let final_state = variants.get_variant(variant.id).await.unwrap();
    assert_eq!(final_state.stock_quantity, 0);
}

#[tokio::test]
async fn reduce_beyond_stock_fails_without_mutation() {
    let db = TestDatabase::new().await;
    let builder = TestDataBuilder::from_test_name("reduce_beyond");
    let categories = CategoryService::new(PgCategoryRepository::new(db.connection()));
    let products = ProductService::new(
        PgProductRepository::new(db.connection()),
        PgCategoryRepository::new(db.connection()),
    );
    let variants = VariantService::new(PgVariantRepository::new(db.connection()));

    let category = categories
        .create_category(category_input("Electronics", None))
        .await
        .unwrap();
    let product = products
        .create_product(product_input("Test Phone", category.id, "999.99"))
        .await
        .unwrap();
    let variant = variants
        .create_variant(variant_input(product.id, builder.sku("over"), 10))
        .await
        .unwrap();

    let result = variants
        .update_stock(variant.id, 100, StockOperation::Reduce)
        .await;
    assert!(matches!(result, Err(CatalogError::InsufficientStock(_))));

    let unchanged = variants.get_variant(variant.id).await.unwrap();
    assert_eq!(unchanged.stock_quantity, 10);
}

#[tokio::test]
async fn add_then_reduce_round_trips() {
    let db = TestDatabase::new().await;
    let builder = TestDataBuilder::from_test_name("round_trip");
    let categories = CategoryService::new(PgCategoryRepository::new(db.connection()));
    let products = ProductService::new(
        PgProductRepository::new(db.connection()),
        PgCategoryRepository::new(db.connection()),
    );
    let variants = VariantService::new(PgVariantRepository::new(db.connection()));

    let category = categories
        .create_category(category_input("Electronics", None))
        .await
        .unwrap();
    let product = products
        .create_product(product_input("Test Phone", category.id, "999.99"))
        .await
        .unwrap();
    let variant = variants
        .create_variant(variant_input(product.id, builder.sku("rt"), 7))
        .await
        .unwrap();

    variants
        .update_stock(variant.id, 5, StockOperation::Add)
        .await
        .unwrap();
    let after = variants
        .update_stock(variant.id, 5, StockOperation::Reduce)
        .await
        .unwrap();
    assert_eq!(after.stock_quantity, 7);
}

#[tokio::test]
async fn set_rejects_negative_and_low_stock_listing_works() {
    let db = TestDatabase::new().await;
    let builder = TestDataBuilder::from_test_name("low_stock");
    let categories = CategoryService::new(PgCategoryRepository::new(db.connection()));
    let products = ProductService::new(
        PgProductRepository::new(db.connection()),
        PgCategoryRepository::new(db.connection()),
    );
    let variants = VariantService::new(PgVariantRepository::new(db.connection()));

    let category = categories
        .create_category(category_input("Electronics", None))
        .await
        .unwrap();
    let product = products
        .create_product(product_input("Test Phone", category.id, "999.99"))
        .await
        .unwrap();
    let mut input = variant_input(product.id, builder.sku("low"), 3);
    input.low_stock_threshold = Some(5);
    let variant = variants.create_variant(input).await.unwrap();

    let result = variants
        .update_stock(variant.id, -1, StockOperation::Set)
        .await;
    assert!(matches!(result, Err(CatalogError::InvalidQuantity(-1))));

    let low = variants.low_stock_variants().await.unwrap();
    assert!(low.iter().any(|v| v.id == variant.id));

    variants
        .update_stock(variant.id, 50, StockOperation::Set)
        .await
        .unwrap();
    let low = variants.low_stock_variants().await.unwrap();
    assert!(!low.iter().any(|v| v.id == variant.id));
}

#[tokio::test]
async fn duplicate_sku_spans_tombstoned_variants() {
    let db = TestDatabase::new().await;
    let builder = TestDataBuilder::from_test_name("sku_reuse");
    let categories = CategoryService::new(PgCategoryRepository::new(db.connection()));
    let products = ProductService::new(
        PgProductRepository::new(db.connection()),
        PgCategoryRepository::new(db.connection()),
    );
    let variants = VariantService::new(PgVariantRepository::new(db.connection()));

    let category = categories
        .create_category(category_input("Electronics", None))
        .await
        .unwrap();
    let product = products
        .create_product(product_input("Test Phone", category.id, "999.99"))
        .await
        .unwrap();

    let sku = builder.sku("dup");
    let first = variants
        .create_variant(variant_input(product.id, sku.clone(), 1))
        .await
        .unwrap();
    variants.delete_variant(first.id).await.unwrap();

    let result = variants
        .create_variant(variant_input(product.id, sku.clone(), 1))
        .await;
    assert!(matches!(result, Err(CatalogError::DuplicateSku(s)) if s == sku));
}

// ============================================================================
// Product queries
// ============================================================================

#[tokio::test]
async fn page_size_is_capped_at_one_hundred() {
    let db = TestDatabase::new().await;
    let categories = CategoryService::new(PgCategoryRepository::new(db.connection()));
    let products = ProductService::new(
        PgProductRepository::new(db.connection()),
        PgCategoryRepository::new(db.connection()),
    );

    let category = categories
        .create_category(category_input("Electronics", None))
        .await
        .unwrap();
    products
        .create_product(product_input("Hub", category.id, "10.00"))
        .await
        .unwrap();

    let page = products
        .list_products(ProductFilter {
            page_size: 500,
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(page.pagination.page_size, 100);
    assert_eq!(page.items.len(), 1);
}

#[tokio::test]
async fn page_beyond_the_end_is_empty_not_an_error() {
    let db = TestDatabase::new().await;
    let categories = CategoryService::new(PgCategoryRepository::new(db.connection()));
    let products = ProductService::new(
        PgProductRepository::new(db.connection()),
        PgCategoryRepository::new(db.connection()),
    );

    let category = categories
        .create_category(category_input("Electronics", None))
        .await
        .unwrap();
    products
        .create_product(product_input("Hub", category.id, "10.00"))
        .await
        .unwrap();

    let page = products
        .list_products(ProductFilter {
            page: 50,
            ..Default::default()
        })
        .await
        .unwrap();

    assert!(page.items.is_empty());
    assert_eq!(page.pagination.total_items, 1);
    assert!(!page.pagination.has_next);
    assert!(page.pagination.has_prev);
}

#[tokio::test]
async fn category_filter_includes_the_whole_subtree() {
    let db = TestDatabase::new().await;
    let categories = CategoryService::new(PgCategoryRepository::new(db.connection()));
    let products = ProductService::new(
        PgProductRepository::new(db.connection()),
        PgCategoryRepository::new(db.connection()),
    );

    let root = categories
        .create_category(category_input("Electronics", None))
        .await
        .unwrap();
    let child = categories
        .create_category(category_input("Phones", Some(root.id)))
        .await
        .unwrap();
    let other = categories
        .create_category(category_input("Garden", None))
        .await
        .unwrap();

    products
        .create_product(product_input("Hub", root.id, "10.00"))
        .await
        .unwrap();
    products
        .create_product(product_input("Handset", child.id, "20.00"))
        .await
        .unwrap();
    products
        .create_product(product_input("Hose", other.id, "5.00"))
        .await
        .unwrap();

    let page = products
        .list_products(ProductFilter {
            category_slug: Some("electronics".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.pagination.total_items, 2);

    let page = products
        .list_products(ProductFilter {
            category_slug: Some("no-such".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.pagination.total_items, 0);
    assert!(page.items.is_empty());
}

#[tokio::test]
async fn attribute_filter_requires_every_listed_value() {
    let db = TestDatabase::new().await;
    let builder = TestDataBuilder::from_test_name("attribute_and");
    let categories = CategoryService::new(PgCategoryRepository::new(db.connection()));
    let products = ProductService::new(
        PgProductRepository::new(db.connection()),
        PgCategoryRepository::new(db.connection()),
    );
    let variants = VariantService::new(PgVariantRepository::new(db.connection()));
    let attributes = AttributeService::new(PgAttributeRepository::new(db.connection()));

    let color = attributes
        .create_attribute(CreateAttribute { name: "Color".into() })
        .await
        .unwrap();
    let size = attributes
        .create_attribute(CreateAttribute { name: "Size".into() })
        .await
        .unwrap();
    let red = attributes
        .create_attribute_value(CreateAttributeValue {
            attribute_id: color.id,
            value: "Red".into(),
        })
        .await
        .unwrap();
    let large = attributes
        .create_attribute_value(CreateAttributeValue {
            attribute_id: size.id,
            value: "Large".into(),
        })
        .await
        .unwrap();

    let category = categories
        .create_category(category_input("Clothing", None))
        .await
        .unwrap();

    // Shirt has a Red+Large variant; Cap only a Red one.
    let shirt = products
        .create_product(product_input("Shirt", category.id, "25.00"))
        .await
        .unwrap();
    let mut input = variant_input(shirt.id, builder.sku("shirt"), 5);
    input.attribute_value_ids = vec![red.id, large.id];
    variants.create_variant(input).await.unwrap();

    let cap = products
        .create_product(product_input("Cap", category.id, "9.00"))
        .await
        .unwrap();
    let mut input = variant_input(cap.id, builder.sku("cap"), 5);
    input.attribute_value_ids = vec![red.id];
    variants.create_variant(input).await.unwrap();

    let both = products
        .list_products(ProductFilter {
            attribute_values: vec![red.id, large.id],
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(both.pagination.total_items, 1);
    assert_eq!(both.items[0].name, "Shirt");

    let red_only = products
        .list_products(ProductFilter {
            attribute_values: vec![red.id],
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(red_only.pagination.total_items, 2);
}

#[tokio::test]
async fn price_range_matches_base_or_variant_override() {
    let db = TestDatabase::new().await;
    let builder = TestDataBuilder::from_test_name("price_range");
    let categories = CategoryService::new(PgCategoryRepository::new(db.connection()));
    let products = ProductService::new(
        PgProductRepository::new(db.connection()),
        PgCategoryRepository::new(db.connection()),
    );
    let variants = VariantService::new(PgVariantRepository::new(db.connection()));

    let category = categories
        .create_category(category_input("Electronics", None))
        .await
        .unwrap();

    // Base 999.99, one variant discounted to 899.99.
    let phone = products
        .create_product(product_input("Test Phone", category.id, "999.99"))
        .await
        .unwrap();
    let mut input = variant_input(phone.id, builder.sku("disc"), 10);
    input.price = Some("899.99".parse().unwrap());
    variants.create_variant(input).await.unwrap();

    products
        .create_product(product_input("Hub", category.id, "10.00"))
        .await
        .unwrap();

    // The discounted variant keeps the phone inside a max=900 filter even
    // though its base price is out of range.
    let page = products
        .list_products(ProductFilter {
            max_price: Some("900.00".parse().unwrap()),
            ..Default::default()
        })
        .await
        .unwrap();
    let names: Vec<&str> = page.items.iter().map(|p| p.name.as_str()).collect();
    assert!(names.contains(&"Test Phone"));
    assert!(names.contains(&"Hub"));

    let page = products
        .list_products(ProductFilter {
            min_price: Some("900.00".parse().unwrap()),
            ..Default::default()
        })
        .await
        .unwrap();
    let names: Vec<&str> = page.items.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["Test Phone"]);
}

#[tokio::test]
async fn search_matches_name_description_and_sku() {
    let db = TestDatabase::new().await;
    let categories = CategoryService::new(PgCategoryRepository::new(db.connection()));
    let products = ProductService::new(
        PgProductRepository::new(db.connection()),
        PgCategoryRepository::new(db.connection()),
    );
    let variants = VariantService::new(PgVariantRepository::new(db.connection()));

    let category = categories
        .create_category(category_input("Electronics", None))
        .await
        .unwrap();
    let phone = products
        .create_product(product_input("Test Phone", category.id, "999.99"))
        .await
        .unwrap();
    variants
        .create_variant(variant_input(phone.id, "GALAXY-ULTRA-512".into(), 3))
        .await
        .unwrap();
    products
        .create_product(product_input("Hub", category.id, "10.00"))
        .await
        .unwrap();

    let page = products
        .list_products(ProductFilter {
            search: Some("test ph".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.pagination.total_items, 1);

    let page = products
        .list_products(ProductFilter {
            search: Some("galaxy-ultra".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.pagination.total_items, 1);
    assert_eq!(page.items[0].name, "Test Phone");
}

#[tokio::test]
async fn in_stock_and_featured_filters() {
    let db = TestDatabase::new().await;
    let builder = TestDataBuilder::from_test_name("stock_featured");
    let categories = CategoryService::new(PgCategoryRepository::new(db.connection()));
    let products = ProductService::new(
        PgProductRepository::new(db.connection()),
        PgCategoryRepository::new(db.connection()),
    );
    let variants = VariantService::new(PgVariantRepository::new(db.connection()));

    let category = categories
        .create_category(category_input("Electronics", None))
        .await
        .unwrap();

    let stocked = products
        .create_product(product_input("Stocked", category.id, "10.00"))
        .await
        .unwrap();
    variants
        .create_variant(variant_input(stocked.id, builder.sku("in"), 4))
        .await
        .unwrap();

    let empty = products
        .create_product(product_input("Empty", category.id, "10.00"))
        .await
        .unwrap();
    variants
        .create_variant(variant_input(empty.id, builder.sku("out"), 0))
        .await
        .unwrap();

    products
        .bulk_update_products(
            vec![stocked.id],
            UpdateProduct {
                is_featured: Some(true),
                ..Default::default()
            },
        )
        .await;

    let page = products
        .list_products(ProductFilter {
            in_stock_only: true,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.pagination.total_items, 1);
    assert_eq!(page.items[0].name, "Stocked");

    let page = products
        .list_products(ProductFilter {
            is_featured: Some(true),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.pagination.total_items, 1);
    assert_eq!(page.items[0].name, "Stocked");
}

// ============================================================================
// Product detail & cascade
// ============================================================================

#[tokio::test]
async fn detail_view_carries_derived_values_and_attributes() {
    let db = TestDatabase::new().await;
    let builder = TestDataBuilder::from_test_name("detail_view");
    let categories = CategoryService::new(PgCategoryRepository::new(db.connection()));
    let products = ProductService::new(
        PgProductRepository::new(db.connection()),
        PgCategoryRepository::new(db.connection()),
    );
    let variants = VariantService::new(PgVariantRepository::new(db.connection()));
    let attributes = AttributeService::new(PgAttributeRepository::new(db.connection()));

    let category = categories
        .create_category(category_input("Electronics", None))
        .await
        .unwrap();
    let product = products
        .create_product(product_input("Test Phone", category.id, "999.99"))
        .await
        .unwrap();

    let color = attributes
        .create_attribute(CreateAttribute { name: "Color".into() })
        .await
        .unwrap();
    let red = attributes
        .create_attribute_value(CreateAttributeValue {
            attribute_id: color.id,
            value: "Red".into(),
        })
        .await
        .unwrap();

    let mut discounted = variant_input(product.id, builder.sku("v1"), 10);
    discounted.price = Some("899.99".parse().unwrap());
    discounted.attribute_value_ids = vec![red.id];
    variants.create_variant(discounted).await.unwrap();

    variants
        .create_variant(variant_input(product.id, builder.sku("v2"), 5))
        .await
        .unwrap();

    let mut premium = variant_input(product.id, builder.sku("v3"), 0);
    premium.price = Some("1099.99".parse().unwrap());
    variants.create_variant(premium).await.unwrap();

    let detail = products.get_by_slug("test-phone").await.unwrap();
    assert_eq!(detail.min_price, "899.99".parse().unwrap());
    assert_eq!(detail.max_price, "1099.99".parse().unwrap());
    assert_eq!(detail.total_stock, 15);
    assert!(detail.is_in_stock);
    assert_eq!(detail.category.id, category.id);
    assert_eq!(detail.variants.len(), 3);

    let with_attrs: Vec<_> = detail
        .variants
        .iter()
        .filter(|v| !v.attributes.is_empty())
        .collect();
    assert_eq!(with_attrs.len(), 1);
    assert_eq!(with_attrs[0].attributes[0].attribute, "Color");
    assert_eq!(with_attrs[0].attributes[0].value, "Red");
}

#[tokio::test]
async fn deleting_a_product_tombstones_variants_and_images() {
    let db = TestDatabase::new().await;
    let builder = TestDataBuilder::from_test_name("cascade");
    let categories = CategoryService::new(PgCategoryRepository::new(db.connection()));
    let products = ProductService::new(
        PgProductRepository::new(db.connection()),
        PgCategoryRepository::new(db.connection()),
    );
    let variants = VariantService::new(PgVariantRepository::new(db.connection()));

    let category = categories
        .create_category(category_input("Electronics", None))
        .await
        .unwrap();
    let product = products
        .create_product(product_input("Test Phone", category.id, "999.99"))
        .await
        .unwrap();
    let variant = variants
        .create_variant(variant_input(product.id, builder.sku("gone"), 1))
        .await
        .unwrap();
    products
        .add_image(CreateImage {
            product_id: product.id,
            image_url: "https://cdn.example.com/a.jpg".into(),
            alt_text: String::new(),
            position: None,
            is_primary: None,
        })
        .await
        .unwrap();

    products.delete_product(product.id).await.unwrap();

    assert!(matches!(
        products.get_product(product.id).await,
        Err(CatalogError::ProductNotFound(_))
    ));
    assert!(matches!(
        variants.get_variant(variant.id).await,
        Err(CatalogError::VariantNotFound(_))
    ));
    assert!(matches!(
        products.get_by_slug("test-phone").await,
        Err(CatalogError::UnknownProductSlug(_))
    ));
}

// ============================================================================
// Images
// ============================================================================

#[tokio::test]
async fn first_image_is_auto_primary_and_new_primary_displaces_it() {
    let db = TestDatabase::new().await;
    let categories = CategoryService::new(PgCategoryRepository::new(db.connection()));
    let products = ProductService::new(
        PgProductRepository::new(db.connection()),
        PgCategoryRepository::new(db.connection()),
    );

    let category = categories
        .create_category(category_input("Electronics", None))
        .await
        .unwrap();
    let product = products
        .create_product(product_input("Test Phone", category.id, "999.99"))
        .await
        .unwrap();

    // First image: primary even though the input did not ask for it.
    let first = products
        .add_image(CreateImage {
            product_id: product.id,
            image_url: "https://cdn.example.com/1.jpg".into(),
            alt_text: String::new(),
            position: Some(0),
            is_primary: Some(false),
        })
        .await
        .unwrap();
    assert!(first.is_primary);

    // Second explicit primary flips the first.
    let second = products
        .add_image(CreateImage {
            product_id: product.id,
            image_url: "https://cdn.example.com/2.jpg".into(),
            alt_text: String::new(),
            position: Some(1),
            is_primary: Some(true),
        })
        .await
        .unwrap();
    assert!(second.is_primary);

    let detail = products.get_by_slug("test-phone").await.unwrap();
    let primary: Vec<_> = detail.images.iter().filter(|i| i.is_primary).collect();
    assert_eq!(primary.len(), 1);
    assert_eq!(primary[0].id, second.id);

    // Reorder rewrites positions in the given order.
    let moved = products
        .reorder_images(vec![second.id, first.id])
        .await
        .unwrap();
    assert_eq!(moved, 2);
    let detail = products.get_by_slug("test-phone").await.unwrap();
    assert_eq!(detail.images[0].id, second.id);
    assert_eq!(detail.images[0].position, 0);
    assert_eq!(detail.images[1].id, first.id);
    assert_eq!(detail.images[1].position, 1);
}

// ============================================================================
// Misc
// ============================================================================

#[tokio::test]
async fn get_by_slug_hides_inactive_categories() {
    let db = TestDatabase::new().await;
    let service = CategoryService::new(PgCategoryRepository::new(db.connection()));

    let category = service
        .create_category(category_input("Electronics", None))
        .await
        .unwrap();
    let fetched = service.get_by_slug("electronics").await.unwrap();
    assert_uuid_eq(fetched.id, category.id, "slug lookup");

    service
        .update_category(
            category.id,
            UpdateCategory {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(matches!(
        service.get_by_slug("electronics").await,
        Err(CatalogError::UnknownCategorySlug(_))
    ));

    // Still reachable by id and visible in the unfiltered tree.
    let by_id = service.get_category(category.id).await.unwrap();
    assert!(!by_id.is_active);
    let tree = service.get_tree(true).await.unwrap();
    assert_eq!(tree.len(), 1);
    let tree = service.get_tree(false).await.unwrap();
    assert!(tree.is_empty());
}

#[tokio::test]
async fn update_variant_replaces_attribute_set_when_given() {
    let db = TestDatabase::new().await;
    let builder = TestDataBuilder::from_test_name("attr_replace");
    let categories = CategoryService::new(PgCategoryRepository::new(db.connection()));
    let products = ProductService::new(
        PgProductRepository::new(db.connection()),
        PgCategoryRepository::new(db.connection()),
    );
    let variants = VariantService::new(PgVariantRepository::new(db.connection()));
    let attributes = AttributeService::new(PgAttributeRepository::new(db.connection()));

    let category = categories
        .create_category(category_input("Clothing", None))
        .await
        .unwrap();
    let product = products
        .create_product(product_input("Shirt", category.id, "25.00"))
        .await
        .unwrap();

    let color = attributes
        .create_attribute(CreateAttribute { name: "Color".into() })
        .await
        .unwrap();
    let red = attributes
        .create_attribute_value(CreateAttributeValue {
            attribute_id: color.id,
            value: "Red".into(),
        })
        .await
        .unwrap();
    let blue = attributes
        .create_attribute_value(CreateAttributeValue {
            attribute_id: color.id,
            value: "Blue".into(),
        })
        .await
        .unwrap();

    let mut input = variant_input(product.id, builder.sku("swap"), 1);
    input.attribute_value_ids = vec![red.id];
    let variant = variants.create_variant(input).await.unwrap();

    // Unknown ids are skipped silently; the known one replaces the set.
    variants
        .update_variant(
            variant.id,
            UpdateVariant {
                attribute_value_ids: Some(vec![blue.id, Uuid::now_v7()]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let detail = products.get_by_slug("shirt").await.unwrap();
    let attrs = &detail.variants[0].attributes;
    assert_eq!(attrs.len(), 1);
    assert_eq!(attrs[0].value, "Blue");
}
