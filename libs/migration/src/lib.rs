pub use sea_orm_migration::prelude::*;

mod m20250610_000001_create_categories;
mod m20250610_000002_create_products;
mod m20250610_000003_create_product_variants;
mod m20250610_000004_create_attributes;
mod m20250610_000005_create_product_images;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250610_000001_create_categories::Migration),
            Box::new(m20250610_000002_create_products::Migration),
            Box::new(m20250610_000003_create_product_variants::Migration),
            Box::new(m20250610_000004_create_attributes::Migration),
            Box::new(m20250610_000005_create_product_images::Migration),
        ]
    }
}
