use std::fmt;

use serde::{Deserialize, Serialize};

use crate::fleet::VehicleId;
use crate::load::LoadId;

// ---------------------------------------------------------------------------
// Routing input
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub article_code: String,
    pub quantity: f64,
}

/// A reconciled order waiting for a vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub reference: String,
    pub address: String,
    pub volume: f64,
    #[serde(default)]
    pub load_id: Option<LoadId>,
    #[serde(default)]
    pub lines: Vec<InvoiceLine>,
}

// ---------------------------------------------------------------------------
// Routing output
// ---------------------------------------------------------------------------

/// Invoices assigned to one vehicle in a proposed plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleRoute {
    pub vehicle_id: VehicleId,
    pub plate: String,
    /// Declared capacity; `None` when unknown (packed as unbounded).
    pub capacity: Option<f64>,
    /// Capacity after the safety margin; `None` means unbounded.
    pub usable_capacity: Option<f64>,
    pub assigned_volume: f64,
    pub invoices: Vec<Invoice>,
}

impl VehicleRoute {
    pub fn fits(&self, extra_volume: f64) -> bool {
        match self.usable_capacity {
            Some(limit) => self.assigned_volume + extra_volume <= limit,
            None => true,
        }
    }

    /// Share of the declared capacity in use, when the capacity is known.
    pub fn utilization(&self) -> Option<f64> {
        self.capacity.map(|c| self.assigned_volume / c)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutePlan {
    /// Vehicles that received at least one invoice, in packing order.
    pub routes: Vec<VehicleRoute>,
    /// Invoices no vehicle could take; they need manual assignment.
    pub unassigned: Vec<Invoice>,
    pub vehicles_considered: usize,
}

impl RoutePlan {
    pub fn assigned_invoice_count(&self) -> usize {
        self.routes.iter().map(|r| r.invoices.len()).sum()
    }

    pub fn assigned_volume(&self) -> f64 {
        self.routes.iter().map(|r| r.assigned_volume).sum()
    }

    pub fn unassigned_volume(&self) -> f64 {
        self.unassigned.iter().map(|i| i.volume).sum()
    }
}

// ---------------------------------------------------------------------------
// Despatch records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DespatchId(pub i64);

impl fmt::Display for DespatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DespatchStatus {
    #[default]
    Planned,
}

impl DespatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planned => "planned",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DespatchLine {
    pub invoice_ref: String,
    pub address: String,
    pub volume: f64,
}

/// A despatch about to be persisted, one per non-empty vehicle route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DespatchDraft {
    pub vehicle_id: VehicleId,
    pub status: DespatchStatus,
    pub occupied_volume: f64,
    pub created_by: Option<String>,
    pub lines: Vec<DespatchLine>,
}

impl DespatchDraft {
    pub fn from_route(route: &VehicleRoute, created_by: Option<&str>) -> Self {
        Self {
            vehicle_id: route.vehicle_id,
            status: DespatchStatus::Planned,
            occupied_volume: route.assigned_volume,
            created_by: created_by.map(str::to_string),
            lines: route
                .invoices
                .iter()
                .map(|inv| DespatchLine {
                    invoice_ref: inv.reference.clone(),
                    address: inv.address.clone(),
                    volume: inv.volume,
                })
                .collect(),
        }
    }
}
