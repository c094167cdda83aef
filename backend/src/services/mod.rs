//! Business logic services for the Inventory Management Platform

pub mod alerts;
pub mod category;
pub mod expiry;
pub mod ledger;
pub mod product;
pub mod purchase;
pub mod sale;
pub mod supplier;
pub mod warehouse;

pub use alerts::AlertService;
pub use category::CategoryService;
pub use expiry::ExpiryService;
pub use ledger::LedgerService;
pub use product::ProductService;
pub use purchase::PurchaseService;
pub use sale::SaleService;
pub use supplier::SupplierService;
pub use warehouse::WarehouseService;
