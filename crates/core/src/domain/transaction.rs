use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::client::ClientId;
use crate::domain::product::ProductId;
use crate::domain::supplier::SupplierId;
use crate::domain::user::UserId;
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Sale,
    Purchase,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sale => "sale",
            Self::Purchase => "purchase",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "sale" => Some(Self::Sale),
            "purchase" => Some(Self::Purchase),
            _ => None,
        }
    }

    /// Signed on-hand change applied when a line of this kind is recorded.
    /// A sale removes stock, a purchase receives it; reversal negates this.
    pub fn stock_delta(&self, quantity: u32) -> i64 {
        let quantity = i64::from(quantity);
        match self {
            Self::Sale => -quantity,
            Self::Purchase => quantity,
        }
    }
}

/// The party on the other side of a transaction: a client buys in a sale,
/// a supplier delivers in a purchase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Counterparty {
    Client(ClientId),
    Supplier(SupplierId),
}

impl Counterparty {
    pub fn raw_id(&self) -> i64 {
        match self {
            Self::Client(id) => id.0,
            Self::Supplier(id) => id.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewTransactionLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Decimal,
}

impl NewTransactionLine {
    pub fn line_total(&self) -> Decimal {
        Decimal::from(self.quantity) * self.unit_price
    }
}

/// Fully-typed input for recording one sale or purchase. The header total is
/// the caller's figure and is persisted as given; line totals are always
/// recomputed from quantity and unit price.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub kind: TransactionKind,
    pub counterparty: Counterparty,
    pub occurred_at: DateTime<Utc>,
    pub total: Decimal,
    pub recorded_by: Option<UserId>,
    pub lines: Vec<NewTransactionLine>,
}

impl NewTransaction {
    /// Rejects malformed input before anything touches the store. Any failure
    /// here rejects the whole transaction, not just the offending line.
    pub fn validate(&self) -> Result<(), DomainError> {
        match (self.kind, &self.counterparty) {
            (TransactionKind::Sale, Counterparty::Client(_))
            | (TransactionKind::Purchase, Counterparty::Supplier(_)) => {}
            _ => return Err(DomainError::CounterpartyMismatch { kind: self.kind }),
        }

        if self.lines.is_empty() {
            return Err(DomainError::EmptyLines);
        }
        if self.total < Decimal::ZERO {
            return Err(DomainError::NegativeAmount { field: "total" });
        }

        for (index, line) in self.lines.iter().enumerate() {
            if line.quantity == 0 {
                return Err(DomainError::NonPositiveQuantity { line: index });
            }
            if line.unit_price < Decimal::ZERO {
                return Err(DomainError::NegativeAmount { field: "unit_price" });
            }
        }

        Ok(())
    }
}

/// One row of a transaction listing, joined with the counterparty name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransactionSummary {
    pub id: TransactionId,
    pub counterparty_name: String,
    pub total: Decimal,
    pub occurred_at: DateTime<Utc>,
    pub recorded_by: Option<UserId>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransactionLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransactionDetail {
    pub id: TransactionId,
    pub kind: TransactionKind,
    pub counterparty_id: i64,
    pub counterparty_name: String,
    pub total: Decimal,
    pub occurred_at: DateTime<Utc>,
    pub recorded_by: Option<UserId>,
    pub lines: Vec<TransactionLine>,
}
