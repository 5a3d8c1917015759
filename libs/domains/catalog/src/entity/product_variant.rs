use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};

/// Sea-ORM entity for the product_variants table.
///
/// `stock_quantity` is only ever written through the variant repository's
/// stock primitives; a table check backs the non-negative invariant.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "product_variants")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Uuid,
    #[sea_orm(unique, column_type = "String(StringLen::N(100))")]
    pub sku: String,
    pub name: String,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))", nullable)]
    pub price: Option<Decimal>,
    pub stock_quantity: i32,
    pub low_stock_threshold: i32,
    #[sea_orm(column_type = "Decimal(Some((8, 2)))", nullable)]
    pub weight: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((8, 2)))", nullable)]
    pub length: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((8, 2)))", nullable)]
    pub width: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((8, 2)))", nullable)]
    pub height: Option<Decimal>,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub deleted_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for crate::models::Variant {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            product_id: model.product_id,
            sku: model.sku,
            name: model.name,
            price: model.price,
            stock_quantity: model.stock_quantity,
            low_stock_threshold: model.low_stock_threshold,
            weight: model.weight,
            length: model.length,
            width: model.width,
            height: model.height,
            is_active: model.is_active,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
            deleted_at: model.deleted_at.map(Into::into),
        }
    }
}

impl From<crate::models::CreateVariant> for ActiveModel {
    fn from(input: crate::models::CreateVariant) -> Self {
        let now = chrono::Utc::now();
        ActiveModel {
            id: Set(Uuid::now_v7()),
            product_id: Set(input.product_id),
            sku: Set(input.sku),
            name: Set(input.name),
            price: Set(input.price),
            stock_quantity: Set(input.stock_quantity.unwrap_or(0)),
            low_stock_threshold: Set(input.low_stock_threshold.unwrap_or(5)),
            weight: Set(input.weight),
            length: Set(input.length),
            width: Set(input.width),
            height: Set(input.height),
            is_active: Set(input.is_active.unwrap_or(true)),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            deleted_at: Set(None),
        }
    }
}
