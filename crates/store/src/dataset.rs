// Typed seed data: master records plus already-parsed manifests.

use serde::Deserialize;

use milla_core::{Article, CoreError, Load, LoadId, LoadStatus, ManifestLine, PlanKind, Vehicle};

/// A notification recipient (correo de notificación).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Recipient {
    pub address: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// A load as handed over by the import layer, before it gets an id.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoadRecord {
    pub load_number: String,
    pub plate: String,
    #[serde(default)]
    pub order_ref: Option<String>,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub plan: PlanKind,
    #[serde(default)]
    pub lines: Vec<ManifestLine>,
}

impl LoadRecord {
    pub fn into_load(self, id: LoadId) -> Load {
        Load {
            id,
            load_number: self.load_number,
            plate: self.plate,
            order_ref: self.order_ref,
            origin: self.origin,
            address: self.address,
            plan: self.plan,
            status: LoadStatus::Pending,
            lines: self.lines,
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.load_number.trim().is_empty() || self.plate.trim().is_empty() {
            return Err(CoreError::validation("load number and plate are required"));
        }
        for line in &self.lines {
            if line.article_code.trim().is_empty() {
                return Err(CoreError::validation(format!(
                    "load {}/{}: manifest line without article code",
                    self.load_number, self.plate
                )));
            }
            if !line.expected_qty.is_finite() || line.expected_qty < 0.0 {
                return Err(CoreError::validation(format!(
                    "load {}/{}: article {} has invalid expected quantity",
                    self.load_number, self.plate, line.article_code
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub articles: Vec<Article>,
    #[serde(default)]
    pub vehicles: Vec<Vehicle>,
    #[serde(default)]
    pub recipients: Vec<Recipient>,
    #[serde(default)]
    pub loads: Vec<LoadRecord>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub articles: usize,
    pub vehicles: usize,
    pub recipients: usize,
    pub loads: usize,
}

impl Dataset {
    pub fn from_toml(input: &str) -> Result<Self, CoreError> {
        let dataset: Dataset =
            toml::from_str(input).map_err(|e| CoreError::validation(format!("dataset parse error: {e}")))?;
        dataset.validate()?;
        Ok(dataset)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        for article in &self.articles {
            if article.code.trim().is_empty() {
                return Err(CoreError::validation("article without code"));
            }
        }
        for load in &self.loads {
            load.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[[articles]]
code = "CJ-12"
description = "Caja x12"
factor_intermediate = 12.0

[[vehicles]]
id = 1
plate = "TRK100"
capacity = 100.0

[[vehicles]]
id = 2
plate = "TRK000"
available = false

[[recipients]]
address = "bodega@milla7.com"

[[loads]]
load_number = "C-1"
plate = "TRK100"
order_ref = "PED-1"
address = "Calle 1"

[[loads.lines]]
article_code = "CJ-12"
expected_qty = 24.0
unit = "UND"
volume = 1.5
"#;

    #[test]
    fn parse_sample_dataset() {
        let ds = Dataset::from_toml(SAMPLE).unwrap();
        assert_eq!(ds.articles.len(), 1);
        assert_eq!(ds.articles[0].factor_general, 1.0);
        assert_eq!(ds.articles[0].factor_intermediate, 12.0);
        assert_eq!(ds.vehicles[1].capacity, None);
        assert!(!ds.vehicles[1].available);
        assert!(ds.recipients[0].active);
        assert_eq!(ds.loads[0].plan, PlanKind::Normal);
        assert_eq!(ds.loads[0].lines[0].volume, Some(1.5));
    }

    #[test]
    fn reject_load_without_plate() {
        let input = r#"
[[loads]]
load_number = "C-1"
plate = " "
"#;
        let err = Dataset::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("plate"));
    }

    #[test]
    fn reject_negative_expected_quantity() {
        let input = r#"
[[loads]]
load_number = "C-1"
plate = "P1"

[[loads.lines]]
article_code = "X"
expected_qty = -1.0
"#;
        assert!(Dataset::from_toml(input).is_err());
    }
}
