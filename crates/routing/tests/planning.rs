use std::collections::HashMap;

use proptest::prelude::*;

use milla_core::ports::VehicleRegistry;
use milla_core::{Invoice, RoutePlan, Vehicle, VehicleId};
use milla_routing::{cluster_key, commit_routes, plan_routes, SAFETY_MARGIN};
use milla_store::{Dataset, SqliteStore};

fn inv(reference: &str, address: &str, volume: f64) -> Invoice {
    Invoice { reference: reference.into(), address: address.into(), volume, load_id: None, lines: Vec::new() }
}

fn truck(id: i64, capacity: f64) -> Vehicle {
    Vehicle { id: VehicleId(id), plate: format!("TRK{id:03}"), capacity: Some(capacity), available: true }
}

// -------------------------------------------------------------------------
// Worked scenario
// -------------------------------------------------------------------------

#[test]
fn oversized_cluster_is_left_for_manual_assignment() {
    let invoices = vec![
        inv("F-A1", "Calle A", 25.0),
        inv("F-B1", "Calle B", 60.0),
        inv("F-A2", "calle a ", 15.0),
        inv("F-B2", "CALLE B", 35.0),
    ];
    let vehicles = vec![truck(30, 30.0), truck(100, 100.0), truck(50, 50.0)];

    let plan = plan_routes(&invoices, &vehicles).unwrap();

    assert_eq!(plan.vehicles_considered, 3);
    assert_eq!(plan.routes.len(), 1);
    let route = &plan.routes[0];
    assert_eq!(route.vehicle_id, VehicleId(100));
    assert_eq!(route.assigned_volume, 40.0);
    let refs: Vec<_> = route.invoices.iter().map(|i| i.reference.as_str()).collect();
    assert_eq!(refs, vec!["F-A1", "F-A2"]);

    let unassigned: Vec<_> = plan.unassigned.iter().map(|i| i.reference.as_str()).collect();
    assert_eq!(unassigned, vec!["F-B1", "F-B2"]);
    assert_eq!(plan.unassigned_volume(), 95.0);
}

#[test]
fn plan_survives_json_and_commits_to_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open(&dir.path().join("milla.db")).unwrap();
    let dataset = Dataset::from_toml(
        r#"
[[vehicles]]
id = 1
plate = "TRK001"
capacity = 10.0

[[vehicles]]
id = 2
plate = "TRK002"
"#,
    )
    .unwrap();
    store.seed(&dataset).unwrap();

    let invoices = vec![inv("F1", "X", 8.0), inv("F2", "Y", 20.0), inv("F3", "Z", 1.0)];
    let plan = plan_routes(&invoices, &store.list_available().unwrap()).unwrap();

    let json = serde_json::to_string_pretty(&plan).unwrap();
    let reread: RoutePlan = serde_json::from_str(&json).unwrap();
    assert_eq!(reread, plan);

    let ids = commit_routes(&reread, &store, Some("planner")).unwrap();
    assert_eq!(ids.len(), plan.routes.len());
    assert_eq!(store.dispatched_refs().unwrap().len(), 3);

    // committing the same plan again collides on invoice references
    assert!(commit_routes(&reread, &store, None).is_err());
    assert_eq!(store.despatch_lines().unwrap().len(), 3);
}

// -------------------------------------------------------------------------
// Properties
// -------------------------------------------------------------------------

fn arb_invoices() -> impl Strategy<Value = Vec<Invoice>> {
    prop::collection::vec((0usize..6, 1u32..400), 1..30).prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (addr, vol))| inv(&format!("F{i}"), &format!("calle {addr}"), vol as f64 / 10.0))
            .collect()
    })
}

fn arb_vehicles() -> impl Strategy<Value = Vec<Vehicle>> {
    prop::collection::vec(prop::option::of(1u32..200), 1..5).prop_map(|caps| {
        caps.into_iter()
            .enumerate()
            .map(|(i, cap)| Vehicle {
                id: VehicleId(i as i64 + 1),
                plate: format!("P{i}"),
                capacity: cap.map(|c| c as f64),
                available: true,
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn routes_never_exceed_usable_capacity(invoices in arb_invoices(), vehicles in arb_vehicles()) {
        let plan = plan_routes(&invoices, &vehicles).unwrap();
        for route in &plan.routes {
            let volume: f64 = route.invoices.iter().map(|i| i.volume).sum();
            if let Some(cap) = route.capacity {
                prop_assert!(volume <= cap * SAFETY_MARGIN + 1e-9);
            }
        }
        prop_assert_eq!(plan.assigned_invoice_count() + plan.unassigned.len(), invoices.len());
    }

    #[test]
    fn clusters_are_never_split(invoices in arb_invoices(), vehicles in arb_vehicles()) {
        let plan = plan_routes(&invoices, &vehicles).unwrap();
        let mut home: HashMap<String, Option<VehicleId>> = HashMap::new();
        let placed = plan
            .routes
            .iter()
            .flat_map(|r| r.invoices.iter().map(move |i| (i, Some(r.vehicle_id))))
            .chain(plan.unassigned.iter().map(|i| (i, None)));
        for (invoice, vehicle) in placed {
            let previous = home.entry(cluster_key(&invoice.address)).or_insert(vehicle);
            prop_assert_eq!(*previous, vehicle);
        }
    }

    #[test]
    fn planning_is_deterministic(invoices in arb_invoices(), vehicles in arb_vehicles()) {
        let first = plan_routes(&invoices, &vehicles).unwrap();
        let second = plan_routes(&invoices, &vehicles).unwrap();
        prop_assert_eq!(first, second);
    }
}
