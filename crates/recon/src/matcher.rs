use std::collections::{BTreeMap, BTreeSet};

use milla_core::ArticleKey;

use crate::model::{Discrepancy, DISCREPANCY_MESSAGE};

/// Absolute tolerance, in base units, absorbing float rounding.
pub const QUANTITY_TOLERANCE: f64 = 0.01;

/// Compare expected vs. counted quantities over the union of article keys.
/// A key missing on one side counts as zero there.
///
/// Results are ordered by article key and never carry quantities.
pub fn blind_compare(
    expected: &BTreeMap<ArticleKey, f64>,
    counted: &BTreeMap<ArticleKey, f64>,
) -> Vec<Discrepancy> {
    let keys: BTreeSet<&ArticleKey> = expected.keys().chain(counted.keys()).collect();

    keys.into_iter()
        .filter(|key| {
            let exp = expected.get(*key).copied().unwrap_or(0.0);
            let cnt = counted.get(*key).copied().unwrap_or(0.0);
            !((exp - cnt).abs() <= QUANTITY_TOLERANCE)
        })
        .map(|key| Discrepancy {
            article: key.clone(),
            message: DISCREPANCY_MESSAGE,
        })
        .collect()
}
