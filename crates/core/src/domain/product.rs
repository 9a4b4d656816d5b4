use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::category::CategoryId;
use crate::domain::supplier::SupplierId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductId(pub i64);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<CategoryId>,
    pub supplier_id: Option<SupplierId>,
    pub purchase_price: Decimal,
    pub sale_price: Decimal,
    pub quantity_on_hand: i64,
    pub alert_threshold: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<CategoryId>,
    pub supplier_id: Option<SupplierId>,
    pub purchase_price: Decimal,
    pub sale_price: Decimal,
    pub quantity_on_hand: i64,
    pub alert_threshold: i64,
}

/// Descriptive, pricing, and threshold fields of a product. On-hand quantity
/// is deliberately absent: stock moves only through recorded transactions.
#[derive(Clone, Debug, PartialEq)]
pub struct ProductUpdate {
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<CategoryId>,
    pub supplier_id: Option<SupplierId>,
    pub purchase_price: Decimal,
    pub sale_price: Decimal,
    pub alert_threshold: i64,
}

/// One row of the low-stock report: a product whose on-hand quantity has
/// reached its alert threshold (inclusive).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowStockProduct {
    pub name: String,
    pub quantity_on_hand: i64,
    pub alert_threshold: i64,
}
