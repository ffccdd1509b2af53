use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::article::{Article, ArticleKey};
use crate::error::CoreError;
use crate::load::Load;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Counting,
    ValidatedOk,
    ValidatedWithNovelty,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Counting)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Counting => "counting",
            Self::ValidatedOk => "validated_ok",
            Self::ValidatedWithNovelty => "validated_with_novelty",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "counting" => Some(Self::Counting),
            "validated_ok" => Some(Self::ValidatedOk),
            "validated_with_novelty" => Some(Self::ValidatedWithNovelty),
            _ => None,
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Running total for one article, in base units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountedLine {
    pub code: String,
    pub description: String,
    pub total: f64,
}

/// Counting state of one load. Owned by exactly one load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceptionSession {
    pub operator: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub failed_attempts: u32,
    pub status: SessionStatus,
    pub counts: BTreeMap<ArticleKey, CountedLine>,
}

impl ReceptionSession {
    pub fn start(operator: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            operator,
            started_at: now,
            ended_at: None,
            failed_attempts: 0,
            status: SessionStatus::Counting,
            counts: BTreeMap::new(),
        }
    }

    /// Add base units for an article and return its new running total.
    pub fn accumulate(&mut self, article: &Article, base_qty: f64) -> f64 {
        let line = self.counts.entry(article.key()).or_insert_with(|| CountedLine {
            code: article.code.clone(),
            description: article.description.clone(),
            total: 0.0,
        });
        line.total += base_qty;
        line.total
    }

    pub fn counted_by_article(&self) -> BTreeMap<ArticleKey, f64> {
        self.counts.iter().map(|(k, l)| (k.clone(), l.total)).collect()
    }

    pub fn close(&mut self, status: SessionStatus, now: DateTime<Utc>) -> Result<(), CoreError> {
        if self.status.is_terminal() {
            return Err(CoreError::validation(format!(
                "illegal session transition {} -> {status}",
                self.status
            )));
        }
        self.status = status;
        self.ended_at = Some(now);
        Ok(())
    }
}

/// A load together with its (lazily created) reception session.
///
/// This is the unit a `ReceptionStore` locks, hands to the engine and
/// persists back.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadLedger {
    pub load: Load,
    pub session: Option<ReceptionSession>,
}

impl LoadLedger {
    pub fn new(load: Load) -> Self {
        Self { load, session: None }
    }

    pub fn session_or_start(
        &mut self,
        operator: Option<String>,
        now: DateTime<Utc>,
    ) -> &mut ReceptionSession {
        self.session.get_or_insert_with(|| ReceptionSession::start(operator, now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulate_adds_to_existing_total() {
        let mut session = ReceptionSession::start(None, Utc::now());
        let art = Article::placeholder("sku-1");
        assert_eq!(session.accumulate(&art, 2.0), 2.0);
        assert_eq!(session.accumulate(&art, 3.5), 5.5);
        assert_eq!(session.counts.len(), 1);
        assert_eq!(session.counted_by_article()[&ArticleKey::new("SKU-1")], 5.5);
    }

    #[test]
    fn close_stamps_end_once() {
        let now = Utc::now();
        let mut session = ReceptionSession::start(Some("ana".into()), now);
        session.close(SessionStatus::ValidatedOk, now).unwrap();
        assert_eq!(session.ended_at, Some(now));
        assert!(session.close(SessionStatus::ValidatedWithNovelty, now).is_err());
    }
}
