use std::collections::HashMap;

use log::{debug, info};

use milla_core::{CoreError, Invoice, RoutePlan, Vehicle, VehicleRoute};

/// Share of a vehicle's declared capacity the planner may fill.
pub const SAFETY_MARGIN: f64 = 0.90;

/// Delivery stop identity: invoices whose addresses share this key ride together.
pub fn cluster_key(address: &str) -> String {
    address.trim().to_uppercase()
}

/// Invoices bound for the same stop. Never split across vehicles.
#[derive(Debug)]
struct Cluster {
    key: String,
    volume: f64,
    invoices: Vec<Invoice>,
}

fn clusters(invoices: &[Invoice]) -> Vec<Cluster> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<Cluster> = Vec::new();

    for invoice in invoices {
        let key = cluster_key(&invoice.address);
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            out.push(Cluster { key, volume: 0.0, invoices: Vec::new() });
            out.len() - 1
        });
        out[slot].volume += invoice.volume;
        out[slot].invoices.push(invoice.clone());
    }
    out
}

/// Sort key for vehicles: unbounded capacity ranks above any finite one.
fn usable_rank(usable: Option<f64>) -> f64 {
    usable.unwrap_or(f64::INFINITY)
}

/// Propose routes with first-fit-decreasing over address clusters.
///
/// Vehicles are tried largest usable capacity first (unbounded ones lead),
/// clusters largest volume first; both sorts are stable so equal keys keep
/// input order and the result is deterministic. A cluster that fits no
/// vehicle goes to `unassigned` whole. Only vehicles that received at least
/// one invoice appear in `routes`.
pub fn plan_routes(invoices: &[Invoice], vehicles: &[Vehicle]) -> Result<RoutePlan, CoreError> {
    if invoices.is_empty() {
        return Err(CoreError::validation("no invoices provided"));
    }
    for invoice in invoices {
        if !(invoice.volume.is_finite() && invoice.volume >= 0.0) {
            return Err(CoreError::validation(format!(
                "invoice {} has invalid volume {}",
                invoice.reference, invoice.volume
            )));
        }
    }

    let mut routes: Vec<VehicleRoute> = vehicles
        .iter()
        .filter(|v| v.available)
        .map(|v| {
            let capacity = v.effective_capacity();
            VehicleRoute {
                vehicle_id: v.id,
                plate: v.plate.clone(),
                capacity,
                usable_capacity: capacity.map(|c| c * SAFETY_MARGIN),
                assigned_volume: 0.0,
                invoices: Vec::new(),
            }
        })
        .collect();
    if routes.is_empty() {
        return Err(CoreError::validation("no vehicles available"));
    }
    routes.sort_by(|a, b| usable_rank(b.usable_capacity).total_cmp(&usable_rank(a.usable_capacity)));
    let vehicles_considered = routes.len();

    let mut clusters = clusters(invoices);
    clusters.sort_by(|a, b| b.volume.total_cmp(&a.volume));

    let mut unassigned = Vec::new();
    for cluster in clusters {
        match routes.iter_mut().find(|r| r.fits(cluster.volume)) {
            Some(route) => {
                debug!(
                    "cluster {} ({:.2}) -> vehicle {} ({})",
                    cluster.key, cluster.volume, route.vehicle_id, route.plate
                );
                route.assigned_volume += cluster.volume;
                route.invoices.extend(cluster.invoices);
            }
            None => {
                debug!("cluster {} ({:.2}) fits no vehicle", cluster.key, cluster.volume);
                unassigned.extend(cluster.invoices);
            }
        }
    }

    routes.retain(|r| !r.invoices.is_empty());

    let plan = RoutePlan { routes, unassigned, vehicles_considered };
    info!(
        "route plan: {} invoice(s) on {} of {} vehicle(s), {} unassigned",
        plan.assigned_invoice_count(),
        plan.routes.len(),
        vehicles_considered,
        plan.unassigned.len()
    );
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use milla_core::VehicleId;

    fn inv(reference: &str, address: &str, volume: f64) -> Invoice {
        Invoice {
            reference: reference.into(),
            address: address.into(),
            volume,
            load_id: None,
            lines: Vec::new(),
        }
    }

    fn truck(id: i64, capacity: Option<f64>) -> Vehicle {
        Vehicle { id: VehicleId(id), plate: format!("TRK{id:03}"), capacity, available: true }
    }

    #[test]
    fn addresses_cluster_case_and_space_insensitively() {
        let cs = clusters(&[inv("F1", " calle 1 ", 2.0), inv("F2", "Calle 2", 1.0), inv("F3", "CALLE 1", 3.0)]);
        assert_eq!(cs.len(), 2);
        assert_eq!(cs[0].key, "CALLE 1");
        assert_eq!(cs[0].volume, 5.0);
        assert_eq!(cs[0].invoices.len(), 2);
        assert_eq!(cs[1].key, "CALLE 2");
    }

    #[test]
    fn largest_cluster_goes_to_largest_vehicle() {
        let plan = plan_routes(
            &[inv("F1", "A", 10.0), inv("F2", "B", 40.0)],
            &[truck(1, Some(50.0)), truck(2, Some(100.0))],
        )
        .unwrap();
        assert_eq!(plan.routes.len(), 1);
        assert_eq!(plan.routes[0].vehicle_id, VehicleId(2));
        assert_eq!(plan.routes[0].usable_capacity, Some(90.0));
        let refs: Vec<_> = plan.routes[0].invoices.iter().map(|i| i.reference.as_str()).collect();
        assert_eq!(refs, vec!["F2", "F1"]);
    }

    #[test]
    fn cluster_at_exact_usable_capacity_fits() {
        let plan = plan_routes(&[inv("F1", "A", 45.0)], &[truck(1, Some(50.0))]).unwrap();
        assert!(plan.unassigned.is_empty());
        let plan = plan_routes(&[inv("F1", "A", 45.5)], &[truck(1, Some(50.0))]).unwrap();
        assert!(plan.routes.is_empty());
        assert_eq!(plan.unassigned.len(), 1);
    }

    #[test]
    fn unknown_capacity_is_unbounded_and_tried_first() {
        let plan = plan_routes(
            &[inv("F1", "A", 5_000.0), inv("F2", "B", 1.0)],
            &[truck(1, Some(100.0)), truck(2, None), truck(3, Some(0.0))],
        )
        .unwrap();
        assert_eq!(plan.routes.len(), 1);
        assert_eq!(plan.routes[0].vehicle_id, VehicleId(2));
        assert_eq!(plan.routes[0].usable_capacity, None);
        assert_eq!(plan.routes[0].invoices.len(), 2);
    }

    #[test]
    fn unavailable_vehicles_are_ignored() {
        let mut parked = truck(1, Some(100.0));
        parked.available = false;
        let err = plan_routes(&[inv("F1", "A", 1.0)], &[parked]).unwrap_err();
        assert_eq!(err, CoreError::validation("no vehicles available"));
    }

    #[test]
    fn empty_inputs_are_rejected() {
        assert_eq!(
            plan_routes(&[], &[truck(1, None)]).unwrap_err(),
            CoreError::validation("no invoices provided")
        );
        assert!(plan_routes(&[inv("F1", "A", 1.0)], &[]).is_err());
    }

    #[test]
    fn nan_volume_is_rejected() {
        assert!(matches!(
            plan_routes(&[inv("F1", "A", f64::NAN)], &[truck(1, None)]),
            Err(CoreError::Validation(_))
        ));
    }
}
