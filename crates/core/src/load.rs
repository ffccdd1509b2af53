use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::article::ArticleKey;
use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoadId(pub i64);

impl fmt::Display for LoadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which manifest layout a load was imported from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanKind {
    #[default]
    Normal,
    R,
}

impl PlanKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::R => "r",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "normal" => Some(Self::Normal),
            "r" => Some(Self::R),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStatus {
    #[default]
    Pending,
    ValidatedOk,
    ValidatedWithNovelty,
}

impl LoadStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Apply a transition. Terminal states never move; an administrative
    /// override is the only way out and it does not go through here.
    pub fn transition(self, to: LoadStatus) -> Result<LoadStatus, CoreError> {
        match (self, to) {
            (Self::Pending, _) => Ok(to),
            (from, to) => Err(CoreError::validation(format!(
                "illegal load transition {from} -> {to}"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::ValidatedOk => "validated_ok",
            Self::ValidatedWithNovelty => "validated_with_novelty",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "validated_ok" => Some(Self::ValidatedOk),
            "validated_with_novelty" => Some(Self::ValidatedWithNovelty),
            _ => None,
        }
    }
}

impl fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

/// One expected line of a delivery manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestLine {
    pub article_code: String,
    pub expected_qty: f64,
    #[serde(default)]
    pub unit: String,
    /// Total volume of the line, when the manifest carries one.
    #[serde(default)]
    pub volume: Option<f64>,
    /// Invoice or transfer remission printed on the line.
    #[serde(default)]
    pub remission: Option<String>,
}

impl ManifestLine {
    pub fn key(&self) -> ArticleKey {
        ArticleKey::new(&self.article_code)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Load {
    pub id: LoadId,
    /// Carga number printed on the manifest.
    pub load_number: String,
    pub plate: String,
    pub order_ref: Option<String>,
    pub origin: Option<String>,
    pub address: Option<String>,
    pub plan: PlanKind,
    pub status: LoadStatus,
    pub lines: Vec<ManifestLine>,
}

impl Load {
    /// Expected base quantity per article; repeated codes are summed.
    pub fn expected_by_article(&self) -> BTreeMap<ArticleKey, f64> {
        let mut expected = BTreeMap::new();
        for line in &self.lines {
            *expected.entry(line.key()).or_insert(0.0) += line.expected_qty;
        }
        expected
    }

    pub fn lists_article(&self, key: &ArticleKey) -> bool {
        self.lines.iter().any(|l| &l.key() == key)
    }

    /// Reference a despatch line is filed under: order number, else the load number.
    pub fn invoice_ref(&self) -> String {
        match self.order_ref.as_deref().map(str::trim) {
            Some(r) if !r.is_empty() => r.to_string(),
            _ => self.load_number.clone(),
        }
    }

    pub fn total_volume(&self) -> f64 {
        self.lines.iter().filter_map(|l| l.volume).filter(|v| v.is_finite()).sum()
    }
}
