use std::fmt::Write as _;

use milla_core::{Load, Notification};

use crate::model::Discrepancy;

/// Compose the novelty message sent when a reception is closed with differences.
pub fn novelty_notification(load: &Load, operator: Option<&str>, mismatches: &[Discrepancy]) -> Notification {
    let order_ref = load.order_ref.as_deref().unwrap_or("S/N");
    let subject = format!("Novedad Recepción Carga {order_ref} - {}", load.plate);

    let mut body = format!(
        "Se ha finalizado la recepción de la carga {} con novedades.\n\n",
        load.load_number
    );
    let _ = writeln!(body, "Pedido: {order_ref}");
    let _ = writeln!(body, "Placa: {}", load.plate);
    let _ = writeln!(body, "Usuario: {}\n", operator.unwrap_or("Sistema"));
    body.push_str("Artículos con diferencia:\n");
    for d in mismatches {
        let _ = writeln!(body, "- {}", d.article);
    }

    Notification { subject, body }
}

#[cfg(test)]
mod tests {
    use super::*;
    use milla_core::{ArticleKey, LoadId, LoadStatus, PlanKind};

    #[test]
    fn message_names_order_plate_operator_and_articles() {
        let load = Load {
            id: LoadId(3),
            load_number: "C-77".into(),
            plate: "TRK900".into(),
            order_ref: Some("PED-1".into()),
            origin: None,
            address: None,
            plan: PlanKind::Normal,
            status: LoadStatus::ValidatedWithNovelty,
            lines: Vec::new(),
        };
        let mismatches = vec![Discrepancy {
            article: ArticleKey::new("sku-9"),
            message: crate::model::DISCREPANCY_MESSAGE,
        }];
        let n = novelty_notification(&load, None, &mismatches);
        assert_eq!(n.subject, "Novedad Recepción Carga PED-1 - TRK900");
        assert!(n.body.contains("carga C-77"));
        assert!(n.body.contains("Usuario: Sistema"));
        assert!(n.body.contains("- SKU-9"));
    }
}
