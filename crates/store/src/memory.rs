//! In-process store implementing every collaborator contract.
//!
//! Used by tests and by callers that do not need durability. Each load has
//! its own mutex, so `with_ledger` serializes work per load only.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;

use milla_core::ports::{
    ArticleCatalog, DespatchStore, NotificationSink, RecipientDirectory, ReceptionStore, VehicleRegistry,
};
use milla_core::{
    Article, ArticleId, ArticleKey, CoreError, DespatchDraft, DespatchId, Load, LoadId, LoadLedger, LoadStatus,
    Notification, NotifyError, Vehicle,
};

use crate::dataset::{Dataset, LoadRecord, Recipient};

#[derive(Default)]
pub struct MemoryStore {
    loads: Mutex<BTreeMap<LoadId, Arc<Mutex<LoadLedger>>>>,
    articles: Mutex<Vec<Article>>,
    vehicles: Mutex<Vec<Vehicle>>,
    recipients: Mutex<Vec<Recipient>>,
    despatches: Mutex<Vec<(DespatchId, DespatchDraft)>>,
    fail_despatch_writes: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_dataset(dataset: Dataset) -> Result<Self, CoreError> {
        dataset.validate()?;
        let store = Self::new();
        for article in dataset.articles {
            store.add_article(article);
        }
        for vehicle in dataset.vehicles {
            store.add_vehicle(vehicle);
        }
        for recipient in dataset.recipients {
            store.add_recipient(recipient);
        }
        for load in dataset.loads {
            store.insert_load(load)?;
        }
        Ok(store)
    }

    pub fn insert_load(&self, record: LoadRecord) -> Result<LoadId, CoreError> {
        record.validate()?;
        let mut loads = self.loads.lock();
        let duplicate = loads.values().any(|l| {
            let l = l.lock();
            l.load.load_number == record.load_number && l.load.plate == record.plate
        });
        if duplicate {
            return Err(CoreError::validation(format!(
                "load {}/{} already exists",
                record.load_number, record.plate
            )));
        }
        let id = LoadId(loads.keys().next_back().map(|k| k.0 + 1).unwrap_or(1));
        loads.insert(id, Arc::new(Mutex::new(LoadLedger::new(record.into_load(id)))));
        Ok(id)
    }

    pub fn add_article(&self, mut article: Article) -> ArticleId {
        let mut articles = self.articles.lock();
        let id = article
            .id
            .unwrap_or_else(|| ArticleId(articles.iter().filter_map(|a| a.id).map(|i| i.0).max().unwrap_or(0) + 1));
        article.id = Some(id);
        articles.retain(|a| a.id != Some(id));
        articles.push(article);
        id
    }

    pub fn add_vehicle(&self, vehicle: Vehicle) {
        let mut vehicles = self.vehicles.lock();
        vehicles.retain(|v| v.id != vehicle.id);
        vehicles.push(vehicle);
    }

    pub fn add_recipient(&self, recipient: Recipient) {
        self.recipients.lock().push(recipient);
    }

    pub fn loads_with_status(&self, status: LoadStatus) -> Vec<Load> {
        self.loads
            .lock()
            .values()
            .map(|l| l.lock().load.clone())
            .filter(|l| l.status == status)
            .collect()
    }

    pub fn dispatched_refs(&self) -> HashSet<String> {
        self.despatches
            .lock()
            .iter()
            .flat_map(|(_, d)| d.lines.iter().map(|l| l.invoice_ref.clone()))
            .collect()
    }

    pub fn despatches(&self) -> Vec<(DespatchId, DespatchDraft)> {
        self.despatches.lock().clone()
    }

    /// Make every following `create_despatches` call fail, as a broken database would.
    pub fn fail_despatch_writes(&self, fail: bool) {
        *self.fail_despatch_writes.lock() = fail;
    }

    fn ledger_handle(&self, load_id: LoadId) -> Result<Arc<Mutex<LoadLedger>>, CoreError> {
        self.loads
            .lock()
            .get(&load_id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("load", load_id))
    }
}

impl ReceptionStore for MemoryStore {
    fn ledger(&self, load_id: LoadId) -> Result<LoadLedger, CoreError> {
        Ok(self.ledger_handle(load_id)?.lock().clone())
    }

    fn with_ledger<T>(
        &self,
        load_id: LoadId,
        f: impl FnOnce(&mut LoadLedger) -> Result<T, CoreError>,
    ) -> Result<T, CoreError> {
        let handle = self.ledger_handle(load_id)?;
        let mut guard = handle.lock();
        let mut working = guard.clone();
        let value = f(&mut working)?;
        *guard = working;
        Ok(value)
    }
}

impl ArticleCatalog for MemoryStore {
    fn lookup_by_code(&self, code: &str) -> Result<Option<Article>, CoreError> {
        let key = ArticleKey::new(code);
        Ok(self.articles.lock().iter().find(|a| a.key() == key).cloned())
    }

    fn get(&self, id: ArticleId) -> Result<Option<Article>, CoreError> {
        Ok(self.articles.lock().iter().find(|a| a.id == Some(id)).cloned())
    }
}

impl VehicleRegistry for MemoryStore {
    fn list_available(&self) -> Result<Vec<Vehicle>, CoreError> {
        Ok(self.vehicles.lock().iter().filter(|v| v.available).cloned().collect())
    }
}

impl RecipientDirectory for MemoryStore {
    fn list_active_recipients(&self) -> Result<Vec<String>, CoreError> {
        Ok(self
            .recipients
            .lock()
            .iter()
            .filter(|r| r.active)
            .map(|r| r.address.clone())
            .collect())
    }
}

impl DespatchStore for MemoryStore {
    fn create_despatches(&self, drafts: &[DespatchDraft]) -> Result<Vec<DespatchId>, CoreError> {
        if *self.fail_despatch_writes.lock() {
            return Err(CoreError::persistence("despatch storage unavailable"));
        }

        let mut despatches = self.despatches.lock();
        let mut seen: HashSet<String> = despatches
            .iter()
            .flat_map(|(_, d)| d.lines.iter().map(|l| l.invoice_ref.clone()))
            .collect();
        for line in drafts.iter().flat_map(|d| d.lines.iter()) {
            if !seen.insert(line.invoice_ref.clone()) {
                return Err(CoreError::persistence(format!(
                    "invoice {} is already attached to a despatch",
                    line.invoice_ref
                )));
            }
        }

        let mut next = despatches.last().map(|(id, _)| id.0 + 1).unwrap_or(1);
        let mut ids = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let id = DespatchId(next);
            next += 1;
            despatches.push((id, draft.clone()));
            ids.push(id);
        }
        Ok(ids)
    }
}

// ---------------------------------------------------------------------------
// Recording notification sink
// ---------------------------------------------------------------------------

/// Sink that keeps every notification it is handed. Can be told to fail.
#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<(Vec<String>, Notification)>>,
    fail: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self { sent: Mutex::new(Vec::new()), fail: true }
    }

    pub fn sent(&self) -> Vec<(Vec<String>, Notification)> {
        self.sent.lock().clone()
    }
}

impl NotificationSink for RecordingSink {
    fn send(&self, recipients: &[String], notification: &Notification) -> Result<(), NotifyError> {
        self.sent.lock().push((recipients.to_vec(), notification.clone()));
        if self.fail {
            return Err(NotifyError("smtp relay refused connection".into()));
        }
        Ok(())
    }
}
