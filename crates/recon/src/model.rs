use serde::Serialize;

use milla_core::{ArticleId, ArticleKey, UnitTier};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// How the operator identified the counted article.
#[derive(Debug, Clone, PartialEq)]
pub enum ArticleRef {
    /// Catalog id picked from a list; not checked against the manifest.
    Id(ArticleId),
    /// Raw (scanned or typed) code; must appear on the load's manifest.
    Code(String),
}

/// One physical count entered by an operator.
#[derive(Debug, Clone, PartialEq)]
pub struct CountSubmission {
    pub article: ArticleRef,
    /// Quantity in the selected unit tier.
    pub quantity: f64,
    pub unit: UnitTier,
    pub operator: Option<String>,
}

impl CountSubmission {
    pub fn by_code(code: &str, quantity: f64, unit: UnitTier) -> Self {
        Self {
            article: ArticleRef::Code(code.to_string()),
            quantity,
            unit,
            operator: None,
        }
    }

    pub fn with_operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = Some(operator.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountReceipt {
    pub article: ArticleKey,
    pub description: String,
    /// Quantity just added, in base units.
    pub added: f64,
    pub running_total: f64,
}

/// A mismatched article. Blind mode: no expected or counted magnitude,
/// only which article disagrees with the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Discrepancy {
    pub article: ArticleKey,
    pub message: &'static str,
}

pub(crate) const DISCREPANCY_MESSAGE: &str = "Cantidad no coincide con documento.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ValidationOutcome {
    /// Counts match the manifest; the load is ready for routing.
    Accepted,
    /// Counts disagree; the operator may recount and validate again.
    RetryRequested { attempt: u32, mismatches: Vec<Discrepancy> },
    /// Counts disagreed too many times; the load is closed with a novelty
    /// and the recipients were notified.
    Escalated { attempt: u32, mismatches: Vec<Discrepancy> },
}

impl ValidationOutcome {
    pub fn mismatches(&self) -> &[Discrepancy] {
        match self {
            Self::Accepted => &[],
            Self::RetryRequested { mismatches, .. } | Self::Escalated { mismatches, .. } => mismatches,
        }
    }
}

/// Running total shown to the operator while counting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressLine {
    pub article: ArticleKey,
    pub code: String,
    pub description: String,
    pub total: f64,
}
