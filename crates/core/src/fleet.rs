use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleId(pub i64);

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    pub plate: String,
    /// Declared volumetric capacity (cubicaje). `None` or non-positive means unknown.
    #[serde(default)]
    pub capacity: Option<f64>,
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}

impl Vehicle {
    /// Capacity used for packing; `None` is unbounded.
    pub fn effective_capacity(&self) -> Option<f64> {
        self.capacity.filter(|c| c.is_finite() && *c > 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_positive_capacity_is_unbounded() {
        let mut v = Vehicle { id: VehicleId(1), plate: "XYZ".into(), capacity: Some(0.0), available: true };
        assert_eq!(v.effective_capacity(), None);
        v.capacity = Some(-3.0);
        assert_eq!(v.effective_capacity(), None);
        v.capacity = None;
        assert_eq!(v.effective_capacity(), None);
        v.capacity = Some(30.0);
        assert_eq!(v.effective_capacity(), Some(30.0));
    }
}
