//! Pure storefront logic shared by the HTTP application.
//!
//! Nothing in this crate performs I/O or reads the clock on its own.

pub mod availability;
pub mod debounce;
pub mod form;
pub mod product;
pub mod theme;
pub mod validation;

pub use availability::{
    AvailabilityChecker, AvailabilitySnapshot, DomainStatus, LookupOutcome, LookupTicket,
};
pub use debounce::Debouncer;
pub use form::{Category, Country, CreateStoreRequest, Currency, FormErrors, StoreDraft, SubmissionGate};
pub use product::{find_product, Product, ProductEnvelope};
pub use theme::Theme;
pub use validation::FieldError;
