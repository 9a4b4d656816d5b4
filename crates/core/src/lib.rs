pub mod config;
pub mod domain;
pub mod errors;

pub use chrono;

pub use domain::category::{Category, CategoryId, NewCategory};
pub use domain::client::{Client, ClientId, NewClient};
pub use domain::product::{LowStockProduct, NewProduct, Product, ProductId, ProductUpdate};
pub use domain::supplier::{NewSupplier, Supplier, SupplierId};
pub use domain::transaction::{
    Counterparty, NewTransaction, NewTransactionLine, TransactionDetail, TransactionId,
    TransactionKind, TransactionLine, TransactionSummary,
};
pub use domain::user::{NewUser, User, UserId, UserRole};
pub use errors::{ApplicationError, DomainError, InterfaceError};
