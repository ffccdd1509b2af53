use std::collections::HashSet;

use log::debug;

use milla_core::{Invoice, InvoiceLine, Load, LoadStatus, PlanKind};

/// Address used for loads that were imported without one.
pub const UNKNOWN_ADDRESS: &str = "SIN DIRECCION";

/// Routing input: accepted Plan Normal loads not yet attached to a despatch.
///
/// `dispatched` holds invoice references already on a despatch line. A
/// reference shared by two loads is routed once, for the first load.
pub fn pending_invoices(loads: &[Load], dispatched: &HashSet<String>) -> Vec<Invoice> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for load in loads {
        if load.status != LoadStatus::ValidatedOk || load.plan != PlanKind::Normal {
            continue;
        }
        let reference = load.invoice_ref();
        if dispatched.contains(&reference) {
            continue;
        }
        if !seen.insert(reference.clone()) {
            debug!("load {}: invoice {reference} already pending from another load", load.id);
            continue;
        }

        let address = match load.address.as_deref().map(str::trim) {
            Some(a) if !a.is_empty() => a.to_string(),
            _ => UNKNOWN_ADDRESS.to_string(),
        };

        out.push(Invoice {
            reference,
            address,
            volume: load.total_volume(),
            load_id: Some(load.id),
            lines: load
                .lines
                .iter()
                .map(|l| InvoiceLine { article_code: l.article_code.clone(), quantity: l.expected_qty })
                .collect(),
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use milla_core::{LoadId, ManifestLine};

    fn load(id: i64, order_ref: Option<&str>, status: LoadStatus, plan: PlanKind) -> Load {
        Load {
            id: LoadId(id),
            load_number: format!("C-{id}"),
            plate: "TRK1".into(),
            order_ref: order_ref.map(str::to_string),
            origin: None,
            address: None,
            plan,
            status,
            lines: vec![
                ManifestLine {
                    article_code: "A".into(),
                    expected_qty: 2.0,
                    unit: String::new(),
                    volume: Some(1.5),
                    remission: None,
                },
                ManifestLine {
                    article_code: "B".into(),
                    expected_qty: 1.0,
                    unit: String::new(),
                    volume: None,
                    remission: None,
                },
            ],
        }
    }

    #[test]
    fn only_accepted_plan_normal_loads_are_routed() {
        let loads = vec![
            load(1, Some("PED-1"), LoadStatus::ValidatedOk, PlanKind::Normal),
            load(2, Some("PED-2"), LoadStatus::Pending, PlanKind::Normal),
            load(3, Some("PED-3"), LoadStatus::ValidatedWithNovelty, PlanKind::Normal),
            load(4, Some("PED-4"), LoadStatus::ValidatedOk, PlanKind::R),
        ];
        let invoices = pending_invoices(&loads, &HashSet::new());
        assert_eq!(invoices.len(), 1);
        let inv = &invoices[0];
        assert_eq!(inv.reference, "PED-1");
        assert_eq!(inv.address, UNKNOWN_ADDRESS);
        assert_eq!(inv.volume, 1.5);
        assert_eq!(inv.load_id, Some(LoadId(1)));
        assert_eq!(inv.lines.len(), 2);
    }

    #[test]
    fn dispatched_and_repeated_references_are_skipped() {
        let loads = vec![
            load(1, Some("PED-1"), LoadStatus::ValidatedOk, PlanKind::Normal),
            load(2, None, LoadStatus::ValidatedOk, PlanKind::Normal),
            load(3, Some("  "), LoadStatus::ValidatedOk, PlanKind::Normal),
            load(4, Some("PED-5"), LoadStatus::ValidatedOk, PlanKind::Normal),
            load(5, Some("PED-5"), LoadStatus::ValidatedOk, PlanKind::Normal),
        ];
        let dispatched: HashSet<String> = ["PED-1".to_string()].into();
        let refs: Vec<_> = pending_invoices(&loads, &dispatched).into_iter().map(|i| i.reference).collect();
        assert_eq!(refs, vec!["C-2", "C-3", "PED-5"]);
    }
}
