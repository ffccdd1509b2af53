use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArticleId(pub i64);

impl fmt::Display for ArticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Article identity used for comparisons: trimmed and uppercased code.
///
/// Manifest codes and counted codes arrive from different hands (spreadsheet
/// import vs. scanner/operator), so every comparison goes through this key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArticleKey(String);

impl ArticleKey {
    pub fn new(code: &str) -> Self {
        Self(code.trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArticleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unit of measure tier an operator counts in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitTier {
    #[default]
    General,
    Intermediate,
    Special,
}

impl UnitTier {
    /// Lenient parse: accepts English and Spanish tags in any case.
    /// Anything unrecognized counts as the general unit.
    pub fn parse_lenient(tag: &str) -> Self {
        match tag.trim().to_uppercase().as_str() {
            "INTERMEDIATE" | "INTERMEDIO" | "INTERMEDIA" => Self::Intermediate,
            "SPECIAL" | "ESPECIAL" => Self::Special,
            _ => Self::General,
        }
    }
}

impl fmt::Display for UnitTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::General => write!(f, "general"),
            Self::Intermediate => write!(f, "intermediate"),
            Self::Special => write!(f, "special"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: Option<ArticleId>,
    pub code: String,
    pub description: String,
    #[serde(default = "default_factor")]
    pub factor_general: f64,
    #[serde(default = "default_factor")]
    pub factor_intermediate: f64,
    #[serde(default = "default_factor")]
    pub factor_special: f64,
}

fn default_factor() -> f64 {
    1.0
}

impl Article {
    /// Stand-in for a manifest code the catalog does not know yet.
    pub fn placeholder(code: &str) -> Self {
        Self {
            id: None,
            code: code.trim().to_string(),
            description: format!("Item de Carga {}", code.trim()),
            factor_general: 1.0,
            factor_intermediate: 1.0,
            factor_special: 1.0,
        }
    }

    pub fn key(&self) -> ArticleKey {
        ArticleKey::new(&self.code)
    }

    /// Conversion factor to base units. Zero, negative or NaN factors fall back to 1.0.
    pub fn factor(&self, tier: UnitTier) -> f64 {
        let raw = match tier {
            UnitTier::General => self.factor_general,
            UnitTier::Intermediate => self.factor_intermediate,
            UnitTier::Special => self.factor_special,
        };
        if raw.is_finite() && raw > 0.0 {
            raw
        } else {
            1.0
        }
    }

    pub fn to_base_units(&self, quantity: f64, tier: UnitTier) -> f64 {
        quantity * self.factor(tier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed(factor_intermediate: f64) -> Article {
        Article {
            id: Some(ArticleId(7)),
            code: " ab-100 ".into(),
            description: "Caja x12".into(),
            factor_general: 1.0,
            factor_intermediate,
            factor_special: 0.0,
        }
    }

    #[test]
    fn key_is_trimmed_and_uppercased() {
        assert_eq!(ArticleKey::new("  ab-100 ").as_str(), "AB-100");
        assert_eq!(boxed(12.0).key(), ArticleKey::new("AB-100"));
    }

    #[test]
    fn intermediate_factor_scales_quantity() {
        assert_eq!(boxed(12.0).to_base_units(2.0, UnitTier::Intermediate), 24.0);
    }

    #[test]
    fn missing_factor_defaults_to_one() {
        let art = boxed(f64::NAN);
        assert_eq!(art.factor(UnitTier::Intermediate), 1.0);
        assert_eq!(art.factor(UnitTier::Special), 1.0);
    }

    #[test]
    fn unit_tags_parse_leniently() {
        assert_eq!(UnitTier::parse_lenient("INTERMEDIO"), UnitTier::Intermediate);
        assert_eq!(UnitTier::parse_lenient("especial"), UnitTier::Special);
        assert_eq!(UnitTier::parse_lenient("GENERAL"), UnitTier::General);
        assert_eq!(UnitTier::parse_lenient("pallet"), UnitTier::General);
    }

    #[test]
    fn placeholder_uses_unit_factors() {
        let art = Article::placeholder("X9");
        assert_eq!(art.description, "Item de Carga X9");
        assert_eq!(art.to_base_units(3.0, UnitTier::Special), 3.0);
    }
}
