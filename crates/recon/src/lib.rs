//! `milla-recon`: blind reception reconciliation engine.
//!
//! Pure engine crate: collaborators (store, catalog, recipients, notifier)
//! are injected through the `milla-core` port traits.

pub mod config;
pub mod engine;
pub mod matcher;
pub mod model;
pub mod notice;

pub use config::ReceptionPolicy;
pub use engine::ReconciliationEngine;
pub use matcher::QUANTITY_TOLERANCE;
pub use model::{ArticleRef, CountReceipt, CountSubmission, Discrepancy, ProgressLine, ValidationOutcome};
