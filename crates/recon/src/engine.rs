use chrono::Utc;
use log::{debug, info, warn};

use milla_core::ports::{ArticleCatalog, NotificationSink, RecipientDirectory, ReceptionStore};
use milla_core::{Article, ArticleKey, CoreError, LoadId, LoadLedger, LoadStatus, Notification, SessionStatus};

use crate::config::ReceptionPolicy;
use crate::matcher::blind_compare;
use crate::model::{ArticleRef, CountReceipt, CountSubmission, ProgressLine, ValidationOutcome};
use crate::notice::novelty_notification;

/// Blind reconciliation of counted quantities against a load's manifest.
///
/// Every mutation goes through `ReceptionStore::with_ledger`, so counts and
/// validations for the same load are serialized by the store. The novelty
/// notification is sent after that transaction has been committed.
pub struct ReconciliationEngine<'a, S: ReceptionStore> {
    store: &'a S,
    catalog: &'a dyn ArticleCatalog,
    recipients: &'a dyn RecipientDirectory,
    notifier: &'a dyn NotificationSink,
    policy: ReceptionPolicy,
}

/// Article as known before the load is locked.
enum Resolved {
    Catalog(Article),
    /// Raw code plus its catalog entry, if any. Checked against the manifest under lock.
    Code(String, Option<Article>),
}

impl<'a, S: ReceptionStore> ReconciliationEngine<'a, S> {
    pub fn new(
        store: &'a S,
        catalog: &'a dyn ArticleCatalog,
        recipients: &'a dyn RecipientDirectory,
        notifier: &'a dyn NotificationSink,
    ) -> Self {
        Self {
            store,
            catalog,
            recipients,
            notifier,
            policy: ReceptionPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ReceptionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Add a physical count to the load's running total for that article.
    pub fn record_count(&self, load_id: LoadId, submission: &CountSubmission) -> Result<CountReceipt, CoreError> {
        if !(submission.quantity.is_finite() && submission.quantity > 0.0) {
            return Err(CoreError::validation(format!(
                "quantity must be a positive number, got {}",
                submission.quantity
            )));
        }

        // Catalog reads happen outside the per-load lock.
        let resolved = match &submission.article {
            ArticleRef::Id(id) => Resolved::Catalog(
                self.catalog
                    .get(*id)?
                    .ok_or_else(|| CoreError::not_found("article", id))?,
            ),
            ArticleRef::Code(code) => {
                if code.trim().is_empty() {
                    return Err(CoreError::validation("article code is empty"));
                }
                Resolved::Code(code.clone(), self.catalog.lookup_by_code(code)?)
            }
        };

        let now = Utc::now();
        let receipt = self.store.with_ledger(load_id, |ledger| {
            ensure_open(ledger)?;

            let article = match resolved {
                Resolved::Catalog(article) => article,
                Resolved::Code(code, found) => {
                    let key = ArticleKey::new(&code);
                    if !ledger.load.lists_article(&key) {
                        return Err(CoreError::validation(format!(
                            "article {key} is not part of this load's manifest"
                        )));
                    }
                    found.unwrap_or_else(|| Article::placeholder(&code))
                }
            };

            let added = article.to_base_units(submission.quantity, submission.unit);
            let session = ledger.session_or_start(submission.operator.clone(), now);
            let running_total = session.accumulate(&article, added);

            Ok(CountReceipt {
                article: article.key(),
                description: article.description.clone(),
                added,
                running_total,
            })
        })?;

        debug!(
            "load {load_id}: counted {} {} of {} (total {})",
            submission.quantity, submission.unit, receipt.article, receipt.running_total
        );
        Ok(receipt)
    }

    /// Compare counts against the manifest and advance the reception state machine.
    pub fn validate(&self, load_id: LoadId) -> Result<ValidationOutcome, CoreError> {
        let now = Utc::now();
        let policy = self.policy;

        let (outcome, notification) = self.store.with_ledger(load_id, |ledger| {
            ensure_open(ledger)?;

            let expected = ledger.load.expected_by_article();
            let session = ledger.session_or_start(None, now);
            let mismatches = blind_compare(&expected, &session.counted_by_article());

            if mismatches.is_empty() {
                session.close(SessionStatus::ValidatedOk, now)?;
                ledger.load.status = ledger.load.status.transition(LoadStatus::ValidatedOk)?;
                return Ok((ValidationOutcome::Accepted, None));
            }

            session.failed_attempts += 1;
            let attempt = session.failed_attempts;

            if !policy.should_escalate(attempt) {
                return Ok((ValidationOutcome::RetryRequested { attempt, mismatches }, None));
            }

            session.close(SessionStatus::ValidatedWithNovelty, now)?;
            let operator = session.operator.clone();
            ledger.load.status = ledger.load.status.transition(LoadStatus::ValidatedWithNovelty)?;

            let notification = novelty_notification(&ledger.load, operator.as_deref(), &mismatches);
            Ok((ValidationOutcome::Escalated { attempt, mismatches }, Some(notification)))
        })?;

        match &outcome {
            ValidationOutcome::Accepted => info!("load {load_id}: reception accepted"),
            ValidationOutcome::RetryRequested { attempt, mismatches } => info!(
                "load {load_id}: {} article(s) differ, recount requested (attempt {attempt})",
                mismatches.len()
            ),
            ValidationOutcome::Escalated { attempt, mismatches } => warn!(
                "load {load_id}: closed with novelty after {attempt} attempt(s), {} article(s) differ",
                mismatches.len()
            ),
        }

        if let Some(notification) = notification {
            self.notify(load_id, &notification);
        }

        Ok(outcome)
    }

    /// Counted totals so far (never the expected quantities).
    pub fn progress(&self, load_id: LoadId) -> Result<Vec<ProgressLine>, CoreError> {
        let ledger = self.store.ledger(load_id)?;
        let Some(session) = ledger.session else {
            return Ok(Vec::new());
        };

        Ok(session
            .counts
            .into_iter()
            .filter(|(_, line)| line.total > 0.0)
            .map(|(article, line)| ProgressLine {
                article,
                code: line.code,
                description: line.description,
                total: line.total,
            })
            .collect())
    }

    /// Best effort: failures are logged and never reach the caller.
    fn notify(&self, load_id: LoadId, notification: &Notification) {
        let recipients = match self.recipients.list_active_recipients() {
            Ok(r) => r,
            Err(e) => {
                warn!("load {load_id}: cannot list notification recipients: {e}");
                return;
            }
        };

        if recipients.is_empty() {
            warn!("load {load_id}: no active notification recipients, novelty not sent");
            return;
        }

        match self.notifier.send(&recipients, notification) {
            Ok(()) => info!("load {load_id}: novelty sent to {} recipient(s)", recipients.len()),
            Err(e) => warn!("load {load_id}: {e}"),
        }
    }
}

fn ensure_open(ledger: &LoadLedger) -> Result<(), CoreError> {
    let session_closed = ledger
        .session
        .as_ref()
        .map(|s| s.status.is_terminal())
        .unwrap_or(false);

    if ledger.load.status.is_terminal() || session_closed {
        return Err(CoreError::validation(format!(
            "reception for load {} is already closed ({})",
            ledger.load.id, ledger.load.status
        )));
    }
    Ok(())
}
