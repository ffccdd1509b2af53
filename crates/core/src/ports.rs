//! Collaborator contracts the engines are injected with.
//!
//! Adapters live in `milla-store` (SQLite, in-memory) and in the CLI
//! (notification sinks).

use std::fmt;

use serde::Serialize;

use crate::article::{Article, ArticleId};
use crate::despatch::{DespatchDraft, DespatchId};
use crate::error::CoreError;
use crate::fleet::Vehicle;
use crate::load::LoadId;
use crate::session::LoadLedger;

/// Manifest provider and reception-session persistence.
pub trait ReceptionStore {
    /// Read-only snapshot of a load and its session.
    fn ledger(&self, load_id: LoadId) -> Result<LoadLedger, CoreError>;

    /// Run `f` on the load's ledger while holding the exclusive per-load
    /// guarantee. Changes made by `f` are persisted only when it returns `Ok`;
    /// on `Err` the stored ledger is left untouched.
    ///
    /// Fails with `NotFound` when the load does not exist.
    fn with_ledger<T>(
        &self,
        load_id: LoadId,
        f: impl FnOnce(&mut LoadLedger) -> Result<T, CoreError>,
    ) -> Result<T, CoreError>;
}

pub trait ArticleCatalog {
    fn lookup_by_code(&self, code: &str) -> Result<Option<Article>, CoreError>;
    fn get(&self, id: ArticleId) -> Result<Option<Article>, CoreError>;
}

pub trait VehicleRegistry {
    /// Vehicles marked available and not soft-deleted.
    fn list_available(&self) -> Result<Vec<Vehicle>, CoreError>;
}

pub trait RecipientDirectory {
    fn list_active_recipients(&self) -> Result<Vec<String>, CoreError>;
}

/// Persistence side of a route commit. All drafts land or none do.
pub trait DespatchStore {
    fn create_despatches(&self, drafts: &[DespatchDraft]) -> Result<Vec<DespatchId>, CoreError>;
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyError(pub String);

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "notification failed: {}", self.0)
    }
}

impl std::error::Error for NotifyError {}

/// Best-effort delivery. Callers log failures and carry on.
pub trait NotificationSink {
    fn send(&self, recipients: &[String], notification: &Notification) -> Result<(), NotifyError>;
}
