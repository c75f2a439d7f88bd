pub mod catalog;
pub mod stores;

pub use catalog::{CatalogClient, CatalogError};
pub use stores::{DomainCheck, StoreApiError, StoreClient};
