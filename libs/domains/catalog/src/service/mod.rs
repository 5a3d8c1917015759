//! Service layer: validation and business rules in front of the repositories.

mod attribute;
mod category;
mod product;
mod variant;

pub use attribute::AttributeService;
pub use category::CategoryService;
pub use product::ProductService;
pub use variant::VariantService;
