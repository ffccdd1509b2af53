use std::collections::HashSet;

use log::info;

use milla_core::ports::DespatchStore;
use milla_core::{CoreError, DespatchDraft, DespatchId, RoutePlan};

use crate::planner::SAFETY_MARGIN;

// Slack for volumes that went through a JSON round trip.
const VOLUME_EPSILON: f64 = 1e-6;

/// Persist an accepted plan: one planned despatch per vehicle route with at
/// least one invoice, all in a single store transaction.
///
/// The plan is checked again first, since it may have been read back from a
/// file the operator edited.
pub fn commit_routes(
    plan: &RoutePlan,
    store: &dyn DespatchStore,
    created_by: Option<&str>,
) -> Result<Vec<DespatchId>, CoreError> {
    check_plan(plan)?;

    let drafts: Vec<DespatchDraft> = plan
        .routes
        .iter()
        .filter(|r| !r.invoices.is_empty())
        .map(|r| DespatchDraft::from_route(r, created_by))
        .collect();

    if drafts.is_empty() {
        info!("route plan has no assigned invoices, nothing to commit");
        return Ok(Vec::new());
    }

    let ids = store.create_despatches(&drafts)?;
    info!(
        "committed {} despatch(es) carrying {} invoice(s)",
        ids.len(),
        plan.assigned_invoice_count()
    );
    Ok(ids)
}

fn check_plan(plan: &RoutePlan) -> Result<(), CoreError> {
    let mut seen = HashSet::new();

    for route in &plan.routes {
        let volume: f64 = route.invoices.iter().map(|i| i.volume).sum();
        if !volume.is_finite() || (volume - route.assigned_volume).abs() > VOLUME_EPSILON {
            return Err(CoreError::validation(format!(
                "vehicle {}: assigned volume {} does not match its invoices ({volume})",
                route.vehicle_id, route.assigned_volume
            )));
        }

        if let Some(capacity) = route.capacity {
            if !(capacity.is_finite() && capacity > 0.0) {
                return Err(CoreError::validation(format!(
                    "vehicle {}: invalid capacity {capacity}",
                    route.vehicle_id
                )));
            }
        }
        // Usable capacity must equal the declared capacity times the margin.
        let limit = route.capacity.map(|c| c * SAFETY_MARGIN);
        let consistent = match (limit, route.usable_capacity) {
            (None, None) => true,
            (Some(l), Some(u)) => (l - u).abs() <= VOLUME_EPSILON,
            _ => false,
        };
        if !consistent {
            return Err(CoreError::validation(format!(
                "vehicle {}: usable capacity {:?} is not {}% of capacity {:?}",
                route.vehicle_id,
                route.usable_capacity,
                SAFETY_MARGIN * 100.0,
                route.capacity
            )));
        }
        if let Some(limit) = limit {
            if volume > limit + VOLUME_EPSILON {
                return Err(CoreError::validation(format!(
                    "vehicle {}: volume {volume} exceeds usable capacity {limit}",
                    route.vehicle_id
                )));
            }
        }

        for invoice in &route.invoices {
            if invoice.reference.trim().is_empty() {
                return Err(CoreError::validation(format!(
                    "vehicle {}: invoice without reference",
                    route.vehicle_id
                )));
            }
            if !seen.insert(invoice.reference.as_str()) {
                return Err(CoreError::validation(format!(
                    "invoice {} is assigned more than once",
                    invoice.reference
                )));
            }
        }
    }
    Ok(())
}
