//! `milla-core`: shared data model for reception and dispatch routing.
//!
//! Pure types crate: loads, manifests, reception sessions, vehicles, invoices
//! and route plans, plus the collaborator traits the engines are injected with.

pub mod article;
pub mod despatch;
pub mod error;
pub mod fleet;
pub mod load;
pub mod ports;
pub mod session;

pub use article::{Article, ArticleId, ArticleKey, UnitTier};
pub use despatch::{DespatchDraft, DespatchId, DespatchLine, DespatchStatus, Invoice, InvoiceLine, RoutePlan, VehicleRoute};
pub use error::CoreError;
pub use ports::{Notification, NotifyError};
pub use fleet::{Vehicle, VehicleId};
pub use load::{Load, LoadId, LoadStatus, ManifestLine, PlanKind};
pub use session::{CountedLine, LoadLedger, ReceptionSession, SessionStatus};
