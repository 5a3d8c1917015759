//! SeaORM entities, one per table. Domain conversions live next to each
//! entity; repositories are the only consumers.

pub mod category;
pub mod product;
pub mod product_attribute;
pub mod product_attribute_value;
pub mod product_image;
pub mod product_variant;
pub mod variant_attribute_value;
